mod env;
mod global_state;
mod middleware;
mod response;
mod routes;
mod utils;

pub use routes::{
    admin_routes,
    auth_routes,
    build_routes,
    champion_routes,
    comment_routes,
    favorite_routes,
    misc_routes,
    reference_routes,
    user_routes,
};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use middleware::{authenticate, require_admin};
pub use response::AppError;
pub use utils::setup_tracing;

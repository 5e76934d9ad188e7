mod admin;
mod auth;
mod builds;
mod champions;
mod comments;
mod favorites;
mod misc;
mod reference;
mod users;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use builds::build_routes;
pub use champions::champion_routes;
pub use comments::comment_routes;
pub use favorites::favorite_routes;
pub use misc::misc_routes;
pub use reference::reference_routes;
pub use users::user_routes;

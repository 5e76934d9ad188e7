mod cognito;
mod dynamodb;
mod verifier;

pub use cognito::CognitoClient;
pub use dynamodb::DynamoClient;
pub use verifier::{TokenClaims, TokenVerifier};

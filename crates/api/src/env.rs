use pocguide_common::EnvVars;

/// Server-level settings. The AWS clients validate their own variables on
/// connection; these are the ones the router itself needs.
pub struct ApiServerEnv {
    pub aws_region: String,
    pub cognito_user_pool_id: String,
    pub cognito_app_client_id: String,
    pub frontend_url: String,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Self {
        Self {
            aws_region: std::env::var("AWS_REGION").expect("AWS_REGION is not set"),
            cognito_user_pool_id: std::env::var("COGNITO_USER_POOL_ID")
                .expect("COGNITO_USER_POOL_ID is not set"),
            cognito_app_client_id: std::env::var("COGNITO_APP_CLIENT_ID")
                .expect("COGNITO_APP_CLIENT_ID is not set"),
            frontend_url: std::env::var("FRONTEND_URL").expect("FRONTEND_URL is not set"),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "AWS_REGION" => self.aws_region.clone(),
            "COGNITO_USER_POOL_ID" => self.cognito_user_pool_id.clone(),
            "COGNITO_APP_CLIENT_ID" => self.cognito_app_client_id.clone(),
            "FRONTEND_URL" => self.frontend_url.clone(),
            _ => panic!("{} is not set", key),
        }
    }
}

use std::collections::HashMap;
use std::env;

use anyhow::{anyhow, Result};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cognitoidentityprovider::types::AttributeType;
use aws_sdk_cognitoidentityprovider::Client as IdpClient;
use pocguide_common::{define_module_client, ModuleClient};

define_module_client! {
    (struct CognitoClient, "cognito")
    client_type: IdpClient,
    env: ["AWS_REGION", "COGNITO_USER_POOL_ID", "COGNITO_APP_CLIENT_ID"],
    setup: async {
        let region = env::var("AWS_REGION").expect("AWS_REGION is not set");

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        IdpClient::new(&config)
    }
}

impl CognitoClient {
    pub fn user_pool_id(&self) -> String {
        env::var("COGNITO_USER_POOL_ID").expect("COGNITO_USER_POOL_ID is not set")
    }

    pub fn app_client_id(&self) -> String {
        env::var("COGNITO_APP_CLIENT_ID").expect("COGNITO_APP_CLIENT_ID is not set")
    }

    /// Full attribute map for a user, `None` when the pool has no such user.
    pub async fn get_user_attributes(
        &self,
        username: &str,
    ) -> Result<Option<HashMap<String, String>>> {
        let result = self
            .get_client()
            .admin_get_user()
            .user_pool_id(self.user_pool_id())
            .username(username)
            .send()
            .await;

        match result {
            Ok(out) => {
                let attrs = out
                    .user_attributes()
                    .iter()
                    .map(|a| (a.name().to_string(), a.value().unwrap_or_default().to_string()))
                    .collect();
                Ok(Some(attrs))
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_user_not_found_exception())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                Err(anyhow!("AdminGetUser failed: {}", err))
            }
        }
    }

    /// Resolves the display name (`name` attribute) for each username in one
    /// concurrent batch. Unknown users fall back to their username so list
    /// rendering never fails on a stale creator reference.
    pub async fn resolve_display_names(
        &self,
        usernames: &[String],
    ) -> HashMap<String, String> {
        let lookups = usernames.iter().map(|username| async move {
            let name = match self.get_user_attributes(username).await {
                Ok(Some(attrs)) => attrs
                    .get("name")
                    .cloned()
                    .unwrap_or_else(|| username.clone()),
                Ok(None) => username.clone(),
                Err(err) => {
                    tracing::warn!("display name lookup failed for {}: {}", username, err);
                    username.clone()
                }
            };
            (username.clone(), name)
        });

        futures::future::join_all(lookups).await.into_iter().collect()
    }

    /// Looks a user up by their immutable `sub`. ListUsers is the only pool
    /// API that filters on sub, so this is a single filtered page.
    pub async fn find_by_sub(&self, sub: &str) -> Result<Option<HashMap<String, String>>> {
        let out = self
            .get_client()
            .list_users()
            .user_pool_id(self.user_pool_id())
            .filter(format!("sub = \"{}\"", sub.replace('"', "")))
            .limit(1)
            .send()
            .await
            .map_err(|e| anyhow!("ListUsers failed: {}", e))?;

        let Some(user) = out.users().first() else {
            return Ok(None);
        };

        let mut attrs: HashMap<String, String> = user
            .attributes()
            .iter()
            .map(|a| (a.name().to_string(), a.value().unwrap_or_default().to_string()))
            .collect();
        if let Some(username) = user.username() {
            attrs.insert("username".to_string(), username.to_string());
        }
        Ok(Some(attrs))
    }

    pub async fn forgot_password(&self, username: &str) -> Result<()> {
        self.get_client()
            .forgot_password()
            .client_id(self.app_client_id())
            .username(username)
            .send()
            .await
            .map_err(|e| anyhow!("ForgotPassword failed: {}", e))?;
        Ok(())
    }

    pub async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        new_password: &str,
    ) -> Result<()> {
        self.get_client()
            .confirm_forgot_password()
            .client_id(self.app_client_id())
            .username(username)
            .confirmation_code(code)
            .password(new_password)
            .send()
            .await
            .map_err(|e| anyhow!("ConfirmForgotPassword failed: {}", e))?;
        Ok(())
    }

    /// ChangePassword acts on the caller's access token, not the pool admin
    /// API, so the previous password is verified by Cognito itself.
    pub async fn change_password(
        &self,
        previous_password: &str,
        proposed_password: &str,
        access_token: &str,
    ) -> Result<()> {
        self.get_client()
            .change_password()
            .previous_password(previous_password)
            .proposed_password(proposed_password)
            .access_token(access_token)
            .send()
            .await
            .map_err(|e| anyhow!("ChangePassword failed: {}", e))?;
        Ok(())
    }

    pub async fn set_display_name(&self, username: &str, name: &str) -> Result<()> {
        let attr = AttributeType::builder()
            .name("name")
            .value(name)
            .build()
            .map_err(|e| anyhow!("invalid user attribute: {}", e))?;

        self.get_client()
            .admin_update_user_attributes()
            .user_pool_id(self.user_pool_id())
            .username(username)
            .user_attributes(attr)
            .send()
            .await
            .map_err(|e| anyhow!("AdminUpdateUserAttributes failed: {}", e))?;
        Ok(())
    }
}

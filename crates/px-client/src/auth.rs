//! Authentication endpoints. Each successful call updates the shared token so
//! later REST calls and hub connections pick it up.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{ApiClient, ApiError};

const LOGIN_KEY_PATH: &str = "/api/Auth/loginKey";
const LOGIN_APP_PATH: &str = "/api/Auth/loginApp";
const VALIDATE_PATH: &str = "/api/Auth/validate";
const LOGOUT_PATH: &str = "/api/Auth/logout";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginKeyRequest<'a> {
    user_name: &'a str,
    api_key: &'a str,
}

/// Application login (authorized partner apps).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLogin {
    pub user_name: String,
    pub password: String,
    pub device_id: String,
    pub app_id: String,
    pub verify_key: String,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateData {
    #[serde(default)]
    new_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NoData {}

#[derive(Clone)]
pub struct AuthApi {
    api: ApiClient,
}

impl AuthApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Log in with an API key. Returns the session token, which is also
    /// stored in the client context.
    pub async fn login_key(&self, user_name: &str, api_key: &str) -> Result<String, ApiError> {
        let data: LoginData =
            self.api.post_json(LOGIN_KEY_PATH, &LoginKeyRequest { user_name, api_key }).await?.into_result()?;
        let token = self.store(data.token)?;
        info!("[auth] logged in as {user_name}");
        Ok(token)
    }

    pub async fn login_app(&self, login: &AppLogin) -> Result<String, ApiError> {
        let data: LoginData = self.api.post_json(LOGIN_APP_PATH, login).await?.into_result()?;
        let token = self.store(data.token)?;
        info!("[auth] app login for {}", login.user_name);
        Ok(token)
    }

    /// Refresh the session. A token handed back by the gateway replaces the
    /// current one.
    pub async fn validate(&self) -> Result<Option<String>, ApiError> {
        let data: ValidateData = self.api.post_empty(VALIDATE_PATH).await?.into_result()?;
        if let Some(token) = data.new_token.as_deref().filter(|t| !t.is_empty()) {
            self.api.context().set_token(token);
            info!("[auth] session token renewed");
        }
        Ok(data.new_token)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let _: NoData = self.api.post_empty(LOGOUT_PATH).await?.into_result()?;
        self.api.context().clear_token();
        info!("[auth] logged out");
        Ok(())
    }

    fn store(&self, token: Option<String>) -> Result<String, ApiError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(ApiError::MissingToken)?;
        self.api.context().set_token(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use px_core::context::ClientContext;
    use serde_json::json;
    use url::Url;

    use super::*;

    fn auth(ctx: &Arc<ClientContext>) -> AuthApi {
        let base = Url::parse("https://api.test").unwrap();
        let api = ApiClient::new(base, Arc::clone(ctx), "test", Duration::from_secs(1)).unwrap();
        AuthApi::new(api)
    }

    #[test]
    fn request_bodies_use_gateway_field_names() {
        let body = serde_json::to_value(LoginKeyRequest { user_name: "trader", api_key: "k" }).unwrap();
        assert_eq!(body, json!({"userName": "trader", "apiKey": "k"}));

        let app = AppLogin {
            user_name: "u".into(),
            password: "p".into(),
            device_id: "d".into(),
            app_id: "a".into(),
            verify_key: "v".into(),
        };
        assert_eq!(
            serde_json::to_value(&app).unwrap(),
            json!({"userName": "u", "password": "p", "deviceId": "d", "appId": "a", "verifyKey": "v"})
        );
    }

    #[test]
    fn stored_token_is_shared_through_the_context() {
        let ctx = Arc::new(ClientContext::new());
        let auth = auth(&ctx);
        assert_eq!(auth.store(Some("jwt".into())).unwrap(), "jwt");
        assert_eq!(ctx.token().as_deref(), Some("jwt"));
    }

    #[test]
    fn empty_login_token_is_an_error() {
        let ctx = Arc::new(ClientContext::with_token("old"));
        let auth = auth(&ctx);
        assert!(matches!(auth.store(Some(String::new())), Err(ApiError::MissingToken)));
        assert!(matches!(auth.store(None), Err(ApiError::MissingToken)));
        assert_eq!(ctx.token().as_deref(), Some("old"));
    }

    #[test]
    fn logout_envelope_without_payload_decodes() {
        let resp: crate::api::ApiResponse<NoData> =
            serde_json::from_value(json!({"success": true, "errorCode": 0})).unwrap();
        assert!(resp.into_result().is_ok());
    }
}

//! Login API and its mock
//!
//! Returns fixed responses without any network access.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub const CORRECT_USERNAME: &str = "correct username";
pub const CORRECT_PASSWORD: &str = "correct password";
pub const USER_TOKEN: &str = "some token";
pub const AUTH_RESOURCE: &str = "my stuff";
pub const LOGIN_FAILURE: &str = "incorrect username/password";
pub const NOT_AUTHORIZED: &str = "not authorized";

/// Authorization state published by the login graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AuthStatus {
    Unauthorized,
    Authorized { token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(rename = "userToken")]
    pub user_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginError {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoginResponse {
    Success { data: LoginData },
    Failure { error: LoginError },
}

/// Backend the login graph talks to
#[async_trait]
pub trait LoginApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> LoginResponse;

    async fn protected_resource(&self, user_token: &str) -> String;
}

/// Mock API with a single valid account
pub struct MockApi {
    /// Simulated round-trip time
    latency: Duration,
    /// Usernames of every login attempt (for assertions)
    attempts: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Usernames passed to `login`, oldest first
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoginApi for MockApi {
    async fn login(&self, username: &str, password: &str) -> LoginResponse {
        self.attempts.lock().push(username.to_string());
        self.wait().await;

        if username == CORRECT_USERNAME && password == CORRECT_PASSWORD {
            LoginResponse::Success {
                data: LoginData {
                    user_token: USER_TOKEN.to_string(),
                },
            }
        } else {
            LoginResponse::Failure {
                error: LoginError {
                    message: LOGIN_FAILURE.to_string(),
                },
            }
        }
    }

    async fn protected_resource(&self, user_token: &str) -> String {
        self.wait().await;
        if user_token == USER_TOKEN {
            AUTH_RESOURCE.to_string()
        } else {
            NOT_AUTHORIZED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn correct_credentials_succeed() {
        let api = MockApi::new();
        let response = api.login(CORRECT_USERNAME, CORRECT_PASSWORD).await;
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "success", "data": {"userToken": "some token"}})
        );
        assert_eq!(api.attempts(), [CORRECT_USERNAME]);
    }

    #[tokio::test]
    async fn wrong_credentials_fail() {
        let response = MockApi::new().login("wrong", "wrong").await;
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "failure", "error": {"message": LOGIN_FAILURE}})
        );
    }

    #[tokio::test]
    async fn protected_resource_checks_token() {
        let api = MockApi::new();
        assert_eq!(api.protected_resource(USER_TOKEN).await, AUTH_RESOURCE);
        assert_eq!(api.protected_resource("stolen").await, NOT_AUTHORIZED);
    }

    #[test]
    fn auth_status_wire_format() {
        let status = AuthStatus::Authorized {
            token: "t".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"status": "authorized", "token": "t"})
        );
        assert_eq!(
            serde_json::to_value(AuthStatus::Unauthorized).unwrap(),
            json!({"status": "unauthorized"})
        );
    }
}

//! HTTP client for the account service.
//!
//! Covers registration with email verification, login, password reset, user
//! search and profile updates. Unlike the delivery path, these operations
//! are vocal: every failure is surfaced to the caller as an [`AuthError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use palaver_shared::constants::USERNAME_SIGIL;
use palaver_shared::types::{Presence, User};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status and a reason.
    #[error("{message}")]
    Rejected { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Error body the service uses for every rejection.
#[derive(Deserialize)]
struct ApiError {
    error: String,
}

/// Profile shape returned by the account service.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDto {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileDto {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            username: self.username,
            avatar: self.avatar,
            status: Presence::Online,
            last_seen: None,
        }
    }
}

/// A verified or logged-in session.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: ProfileDto,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<&'a str>,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordRequest<'a> {
    email: &'a str,
    code: &'a str,
    new_password: &'a str,
}

#[derive(Serialize)]
struct UpdateProfileRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<&'a str>,
}

pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// `base_url` is the service root, e.g. `http://localhost:3001`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Start registration; the service mails a verification code.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        username: &str,
        avatar: Option<&str>,
    ) -> Result<()> {
        validate_username(username)?;
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&RegisterRequest {
                email,
                password,
                name,
                username,
                avatar,
            })
            .send()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    /// Redeem the mailed code for a session.
    pub async fn verify(&self, email: &str, code: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.url("/api/auth/verify"))
            .json(&VerifyRequest { email, code })
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    /// Request a password-reset code by email.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/auth/forgot-password"))
            .json(&ForgotPasswordRequest { email })
            .send()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/auth/reset-password"))
            .json(&ResetPasswordRequest {
                email,
                code,
                new_password,
            })
            .send()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    /// Search registered users by name or username fragment.
    pub async fn search_users(&self, token: &str, query: &str) -> Result<Vec<ProfileDto>> {
        let response = self
            .http
            .get(self.url("/api/users/search"))
            .query(&[("q", query)])
            .bearer_auth(token)
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }

    /// Update the authenticated user's profile; returns the stored result.
    pub async fn update_profile(
        &self,
        token: &str,
        name: Option<&str>,
        username: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<ProfileDto> {
        if let Some(username) = username {
            validate_username(username)?;
        }
        let response = self
            .http
            .post(self.url("/api/users/update"))
            .bearer_auth(token)
            .json(&UpdateProfileRequest {
                name,
                username,
                avatar,
            })
            .send()
            .await?;
        Ok(expect_ok(response).await?.json().await?)
    }
}

/// Usernames carry the sigil on the wire; reject early instead of burning a
/// round trip on a request the service will refuse.
fn validate_username(username: &str) -> Result<()> {
    if username.starts_with(USERNAME_SIGIL) && username.len() > 1 {
        Ok(())
    } else {
        Err(AuthError::Rejected {
            status: 400,
            message: format!("Username must start with {USERNAME_SIGIL}"),
        })
    }
}

async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ApiError>()
        .await
        .map(|e| e.error)
        .unwrap_or_else(|_| status.to_string());
    Err(AuthError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_rejects_unsigiled_username() {
        let client = AuthClient::new("http://127.0.0.1:1");
        let result = client
            .register("a@b.c", "secret", "Alice", "alice", None)
            .await;
        match result {
            Err(AuthError::Rejected { status: 400, message }) => {
                assert!(message.contains('@'));
            }
            other => panic!("expected local rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_profile_into_user() {
        let dto: ProfileDto = serde_json::from_str(
            r#"{"id":"u1","username":"@alice","name":"Alice","avatar":null}"#,
        )
        .unwrap();
        let user = dto.into_user();
        assert_eq!(user.id, "u1");
        assert_eq!(user.username.as_deref(), Some("@alice"));
        assert_eq!(user.status, Presence::Online);
    }

    #[test]
    fn test_session_shape() {
        let session: Session = serde_json::from_str(
            r#"{"token":"jwt","user":{"id":"u1","username":"@alice","name":"Alice","avatar":"data:image/png;base64,AA"}}"#,
        )
        .unwrap();
        assert_eq!(session.token, "jwt");
        assert_eq!(session.user.id, "u1");
    }

    #[test]
    fn test_url_join() {
        let client = AuthClient::new("http://localhost:3001/");
        assert_eq!(client.url("/api/auth/login"), "http://localhost:3001/api/auth/login");
    }
}

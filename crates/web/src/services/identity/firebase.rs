//! Firebase Authentication REST client.
//!
//! Uses the Identity Toolkit `accounts:signInWithPassword` endpoint to sign
//! in and the Secure Token endpoint to refresh ID tokens.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use donor_finder_core::Email;

use super::{Identity, IdentityError, IdentityProvider};
use crate::config::FirebaseConfig;

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Firebase Authentication client.
#[derive(Clone)]
pub struct FirebaseAuthClient {
    inner: Arc<FirebaseAuthClientInner>,
}

struct FirebaseAuthClientInner {
    client: reqwest::Client,
    api_key: SecretString,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseAuthClient {
    /// Create a client sharing `client`'s connection pool and timeout.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(FirebaseAuthClientInner {
                client,
                api_key: config.api_key.clone(),
            }),
        }
    }

    /// Handle a non-success response.
    async fn handle_error_status(response: reqwest::Response) -> IdentityError {
        let status = response.status();
        match response.text().await {
            Ok(body) => match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => map_error_code(status.as_u16(), &envelope.error.message),
                Err(_) => IdentityError::Api {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("unknown").to_string(),
                },
            },
            Err(e) => IdentityError::Http(e),
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let response = self
            .inner
            .client
            .post(SIGN_IN_URL)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .json(&SignInRequest {
                email: email.as_str(),
                password: password.expose_secret(),
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_status(response).await);
        }

        let body: SignInResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        Ok(Identity {
            uid: body.local_id,
            email: Email::parse(&body.email).map_err(|e| IdentityError::Parse(e.to_string()))?,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: Utc::now() + parse_expires_in(&body.expires_in)?,
        })
    }

    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    async fn refresh(&self, identity: &Identity) -> Result<Identity, IdentityError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", identity.refresh_token.as_str()),
        ];

        let response = self
            .inner
            .client
            .post(TOKEN_URL)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_status(response).await);
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        Ok(Identity {
            uid: body.user_id,
            email: identity.email.clone(),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: Utc::now() + parse_expires_in(&body.expires_in)?,
        })
    }

    async fn sign_out(&self, identity: &Identity) -> Result<(), IdentityError> {
        // Firebase ID tokens are bearer tokens with no revocation endpoint for
        // end users; dropping them from the session ends the session.
        tracing::debug!(uid = %identity.uid, "Discarding Firebase tokens");
        Ok(())
    }
}

/// Map a Firebase Auth error code to an [`IdentityError`].
///
/// Codes may carry a suffix (`"TOO_MANY_ATTEMPTS_TRY_LATER : Access ..."`),
/// so only the leading token is matched.
fn map_error_code(status: u16, message: &str) -> IdentityError {
    let code = message
        .split([' ', ':'])
        .next()
        .unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            IdentityError::InvalidCredentials
        }
        "USER_DISABLED" => IdentityError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyAttempts,
        "INVALID_EMAIL" => IdentityError::InvalidEmail(code.to_string()),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            IdentityError::SessionExpired
        }
        _ => IdentityError::Api {
            status,
            message: code.to_string(),
        },
    }
}

fn parse_expires_in(value: &str) -> Result<Duration, IdentityError> {
    value
        .parse::<i64>()
        .map(Duration::seconds)
        .map_err(|e| IdentityError::Parse(format!("expiresIn '{value}': {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_code() {
        assert!(matches!(
            map_error_code(400, "INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            map_error_code(400, "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled"),
            IdentityError::TooManyAttempts
        ));
        assert!(matches!(
            map_error_code(400, "TOKEN_EXPIRED"),
            IdentityError::SessionExpired
        ));
        assert!(matches!(
            map_error_code(400, "OPERATION_NOT_ALLOWED"),
            IdentityError::Api { status: 400, .. }
        ));
    }

    #[test]
    fn test_parse_sign_in_response() {
        let body = r#"{
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "ZY1rJK0eYLg",
            "email": "asha@example.org",
            "displayName": "",
            "idToken": "eyJhbGciOi",
            "registered": true,
            "refreshToken": "AMf-vBx",
            "expiresIn": "3600"
        }"#;
        let parsed: SignInResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.local_id, "ZY1rJK0eYLg");
        assert_eq!(parse_expires_in(&parsed.expires_in).unwrap(), Duration::hours(1));
    }

    #[test]
    fn test_parse_refresh_response() {
        let body = r#"{
            "expires_in": "3600",
            "token_type": "Bearer",
            "refresh_token": "AMf-new",
            "id_token": "eyJnew",
            "user_id": "ZY1rJK0eYLg",
            "project_id": "1234"
        }"#;
        let parsed: RefreshResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.id_token, "eyJnew");
        assert_eq!(parsed.user_id, "ZY1rJK0eYLg");
    }

    #[test]
    fn test_parse_expires_in_rejects_garbage() {
        assert!(matches!(parse_expires_in("soon"), Err(IdentityError::Parse(_))));
    }
}

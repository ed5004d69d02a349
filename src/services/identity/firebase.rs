use async_trait::async_trait;
use serde_json::{json, Value};

use super::{AuthSession, IdentityError, IdentityProvider, VerifiedIdentity};

/// Identity Toolkit REST client (email/password and Google IdP sign-in).
pub struct FirebaseIdentity {
    api_key: String,
    base_url: String,
    request_uri: String,
    client: reqwest::Client,
}

impl FirebaseIdentity {
    pub fn new(api_key: String, base_url: String, request_uri: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_uri,
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, endpoint: &str, body: Value) -> Result<Value, IdentityError> {
        let url = format!("{}/accounts:{endpoint}", self.base_url);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::transport(format!("failed to call identity service: {e}")))?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(|e| IdentityError::transport(format!("failed to parse identity response: {e}")))?;

        if !status.is_success() {
            let code = data["error"]["message"]
                .as_str()
                .unwrap_or("UNKNOWN")
                .to_string();
            tracing::debug!(endpoint, %status, code = %code, "identity service rejected request");
            return Err(IdentityError::from_code(&code, code.clone()));
        }

        Ok(data)
    }
}

fn session_from(data: &Value) -> Result<AuthSession, IdentityError> {
    let text = |key: &str| data[key].as_str().filter(|s| !s.is_empty()).map(str::to_string);

    Ok(AuthSession {
        uid: text("localId").ok_or_else(|| IdentityError::transport("missing localId in response"))?,
        email: text("email").unwrap_or_default(),
        id_token: text("idToken").ok_or_else(|| IdentityError::transport("missing idToken in response"))?,
        display_name: text("displayName"),
        photo_url: text("photoUrl"),
        phone: text("phoneNumber"),
    })
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let data = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        session_from(&data)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let data = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        session_from(&data)
    }

    async fn sign_in_with_google(&self, google_id_token: &str) -> Result<AuthSession, IdentityError> {
        let data = self
            .call(
                "signInWithIdp",
                json!({
                    "postBody": format!("id_token={google_id_token}&providerId=google.com"),
                    "requestUri": self.request_uri,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;
        session_from(&data)
    }

    async fn verify_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let data = self.call("lookup", json!({ "idToken": id_token })).await?;
        identity_from_lookup(&data)
    }
}

fn identity_from_lookup(data: &Value) -> Result<VerifiedIdentity, IdentityError> {
    let user = &data["users"][0];
    let uid = user["localId"]
        .as_str()
        .ok_or_else(|| IdentityError::from_code("INVALID_ID_TOKEN", "no user for token"))?;

    Ok(VerifiedIdentity {
        uid: uid.to_string(),
        email: user["email"].as_str().unwrap_or_default().to_string(),
        email_verified: user["emailVerified"].as_bool().unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_full_response() {
        let data = json!({
            "localId": "uid-1",
            "email": "a@example.com",
            "idToken": "tok",
            "displayName": "Ayanda",
            "photoUrl": "",
        });
        let session = session_from(&data).unwrap();
        assert_eq!(session.uid, "uid-1");
        assert_eq!(session.id_token, "tok");
        assert_eq!(session.display_name.as_deref(), Some("Ayanda"));
        assert!(session.photo_url.is_none());
        assert!(session.phone.is_none());
    }

    #[test]
    fn test_session_requires_uid_and_token() {
        assert!(session_from(&json!({ "idToken": "tok" })).is_err());
        assert!(session_from(&json!({ "localId": "uid-1" })).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = FirebaseIdentity::new(
            "key".to_string(),
            "https://identity.example.com/v1/".to_string(),
            "http://localhost".to_string(),
        );
        assert_eq!(provider.base_url, "https://identity.example.com/v1");
    }

    #[test]
    fn test_lookup_reads_email_verified() {
        let data = json!({
            "users": [{ "localId": "uid-1", "email": "a@example.com", "emailVerified": true }]
        });
        let identity = identity_from_lookup(&data).unwrap();
        assert_eq!(identity.uid, "uid-1");
        assert!(identity.email_verified);

        let data = json!({ "users": [{ "localId": "uid-2", "email": "b@example.com" }] });
        assert!(!identity_from_lookup(&data).unwrap().email_verified);

        assert!(identity_from_lookup(&json!({ "users": [] })).is_err());
    }
}

pub mod firebase;

use async_trait::async_trait;

/// Result of a successful sign-up or sign-in against the identity service.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
    /// Whether the identity service has confirmed the caller owns `email`.
    pub email_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    SignUp,
    SignIn,
    Google,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorKind {
    EmailExists,
    InvalidEmail,
    WeakPassword,
    UserNotFound,
    WrongPassword,
    TooManyAttempts,
    InvalidToken,
    Cancelled,
    PopupBlocked,
    /// The identity service could not be reached or answered garbage.
    Transport,
    Other,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct IdentityError {
    pub kind: IdentityErrorKind,
    pub code: String,
    pub message: String,
}

impl IdentityError {
    /// Accepts both REST error codes (`EMAIL_EXISTS`, `WEAK_PASSWORD : ...`)
    /// and client SDK codes (`auth/email-already-in-use`).
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let head = code.split(':').next().unwrap_or(code).trim();
        let kind = match head {
            "EMAIL_EXISTS" | "auth/email-already-in-use" => IdentityErrorKind::EmailExists,
            "INVALID_EMAIL" | "auth/invalid-email" => IdentityErrorKind::InvalidEmail,
            "WEAK_PASSWORD" | "auth/weak-password" => IdentityErrorKind::WeakPassword,
            "EMAIL_NOT_FOUND" | "auth/user-not-found" => IdentityErrorKind::UserNotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "auth/wrong-password" => {
                IdentityErrorKind::WrongPassword
            }
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "auth/too-many-requests" => {
                IdentityErrorKind::TooManyAttempts
            }
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "auth/id-token-expired" => {
                IdentityErrorKind::InvalidToken
            }
            "auth/popup-closed-by-user" | "auth/cancelled-popup-request" => {
                IdentityErrorKind::Cancelled
            }
            "auth/popup-blocked" => IdentityErrorKind::PopupBlocked,
            _ => IdentityErrorKind::Other,
        };
        Self {
            kind,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: IdentityErrorKind::Transport,
            code: "transport".to_string(),
            message: message.into(),
        }
    }

    /// Canned text shown to the person signing in. Unmapped errors fall back
    /// to a generic prefix plus the raw message.
    pub fn user_message(&self, flow: AuthFlow) -> String {
        match (flow, self.kind) {
            (_, IdentityErrorKind::InvalidEmail) => "Invalid email address.".to_string(),
            (AuthFlow::SignUp, IdentityErrorKind::EmailExists) => {
                "This email is already registered. Please sign in instead.".to_string()
            }
            (AuthFlow::SignUp, IdentityErrorKind::WeakPassword) => {
                "Password is too weak. Please use at least 6 characters.".to_string()
            }
            (AuthFlow::SignIn, IdentityErrorKind::UserNotFound) => {
                "No account found with this email. Please sign up first.".to_string()
            }
            (AuthFlow::SignIn, IdentityErrorKind::WrongPassword) => {
                "Incorrect password. Please try again.".to_string()
            }
            (AuthFlow::SignIn, IdentityErrorKind::TooManyAttempts) => {
                "Too many failed attempts. Please try again later.".to_string()
            }
            (AuthFlow::Google, IdentityErrorKind::Cancelled) => {
                "Sign-in cancelled. Please try again.".to_string()
            }
            (AuthFlow::Google, IdentityErrorKind::PopupBlocked) => {
                "Pop-up blocked. Please allow pop-ups for this site.".to_string()
            }
            (AuthFlow::SignUp, _) => format!("Failed to sign up: {}", self.message),
            (AuthFlow::SignIn, _) => format!("Failed to sign in: {}", self.message),
            (AuthFlow::Google, _) => format!("Failed to sign in with Google: {}", self.message),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    /// Exchanges a Google-issued ID token for a session.
    async fn sign_in_with_google(&self, google_id_token: &str) -> Result<AuthSession, IdentityError>;

    async fn verify_token(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

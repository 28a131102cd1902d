use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

// -- JWT Claims --

/// Bearer token payload. `sub` carries the username, not the numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Auth --

/// Form body shared by signup, login and the token exchange.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Cards --

#[derive(Debug, Deserialize)]
pub struct CardForm {
    pub title: String,
    pub content: String,
    /// HTML checkbox value; any of `on`, `true`, `1` enables it.
    #[serde(default)]
    pub to_all: Option<String>,
}

impl CardForm {
    pub fn is_to_all(&self) -> bool {
        matches!(
            self.to_all.as_deref().map(str::trim),
            Some(v) if v.eq_ignore_ascii_case("on") || v.eq_ignore_ascii_case("true") || v == "1"
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CardResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: i64,
    pub author: AuthorSummary,
    pub to_all: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaFileResponse>>,
}

// -- Media --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFileResponse {
    pub id: i64,
    pub url: String,
    pub filename: String,
    pub file_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachQuery {
    pub media_id: i64,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleChangeResponse {
    pub message: String,
    pub user_id: i64,
    pub new_role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(to_all: Option<&str>) -> CardForm {
        CardForm {
            title: "t".into(),
            content: "c".into(),
            to_all: to_all.map(str::to_string),
        }
    }

    #[test]
    fn checkbox_values() {
        assert!(form(Some("on")).is_to_all());
        assert!(form(Some("TRUE")).is_to_all());
        assert!(form(Some("1")).is_to_all());
        assert!(!form(Some("off")).is_to_all());
        assert!(!form(None).is_to_all());
    }
}

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::api::{ApiClient, ApiError};

/// The id the profile page shows. Placeholder until there is navigation.
pub const DEFAULT_USER_ID: i64 = 1;

pub fn user_path(id: i64) -> String {
    format!("/users/{id}")
}

/// Fetches `/users/{id}` and hands back the body exactly as the server sent it.
///
/// Errors are returned untouched: no retry, no logging.
pub async fn get_user(api: &ApiClient, id: i64) -> Result<Value, ApiError> {
    api.get_json(&user_path(id)).await
}

/// Typed view of a user payload, for callers that want to rely on fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

fn default_role() -> String {
    "user".to_string()
}

impl User {
    pub fn decode(value: &Value) -> Result<Self, ApiError> {
        Ok(User::deserialize(value)?)
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    /// Reads the untyped `role` claim. Only the exact lowercase strings are
    /// recognised; any other casing, non-string or missing value yields `None`.
    pub fn from_claim(value: Option<&Value>) -> Option<Self> {
        match value {
            Some(Value::String(role)) => match role.as_str() {
                "admin" => Some(UserRole::Admin),
                "user" => Some(UserRole::User),
                _ => None,
            },
            _ => None,
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub email: String,
    pub role: Option<UserRole>,
}

impl Actor {
    pub fn new(id: i32, email: impl Into<String>, role: Option<UserRole>) -> Self {
        Self {
            id,
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(UserRole::Admin)
    }
}

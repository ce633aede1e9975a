//! Context attached to events and state writes

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifies the origin of a state write or event
///
/// A coordinator refresh creates one context and every state written as a
/// consequence of that refresh carries a child of it, so a chain of changes
/// can be traced back to a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// ULID of this context
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Context that caused this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: None,
            parent_id: None,
        }
    }

    /// Context for an action taken on behalf of a user
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::new()
        }
    }

    /// New context caused by this one
    pub fn child(&self) -> Self {
        Self {
            id: Ulid::new().to_string(),
            user_id: self.user_id.clone(),
            parent_id: Some(self.id.clone()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

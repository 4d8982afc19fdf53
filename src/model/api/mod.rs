//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are plain hex strings.
//! - Field names are camelCase.
//! - Secrets such as password hashes never appear.

use serde::{Deserialize, Serialize};

pub mod auth;
pub mod candidate;
pub mod id;
pub mod user;

/// A response consisting of a human-readable message only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

//! Entity decoding errors.

use thiserror::Error;

/// Errors from decoding wire entities.
#[derive(Debug, Error)]
pub enum EntityError {
    /// Payload did not match the entity's wire shape.
    #[error("malformed {entity}: {reason}")]
    Malformed {
        /// Entity name the decoder was expecting.
        entity: &'static str,
        /// What the decoder rejected.
        reason: String,
    },
}

impl EntityError {
    /// Wrap a serde failure with the entity name it occurred in.
    pub(crate) fn malformed(entity: &'static str, err: &serde_json::Error) -> Self {
        Self::Malformed { entity, reason: err.to_string() }
    }
}

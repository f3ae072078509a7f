//! Error type shared by every handler and collaborator contract.

use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// An administrative action was called with missing or malformed inputs.
    #[error("invalid params: {message}")]
    InvalidParams { message: String },

    /// A webhook body carried a head commit but lacked the fields needed to record it.
    #[error("invalid webhook payload: {message}")]
    InvalidPayload { message: String },

    /// A remote lookup returned no match.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// The remote answered with a non-success status.
    #[error("remote returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// A delete answered with a non-empty body; the body is the error text.
    #[error("{0}")]
    Rejected(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response that must be decoded could not be.
    #[error("decode error: {0}")]
    Decode(String),
}

impl BridgeError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_remote_text_verbatim() {
        let err = BridgeError::Rejected("user does not exist [uid: 0, name: x]".into());
        assert_eq!(err.to_string(), "user does not exist [uid: 0, name: x]");
    }

    #[test]
    fn not_found_names_kind_and_key() {
        let err = BridgeError::not_found("account", "alice");
        assert_eq!(err.to_string(), "account not found: alice");
    }
}

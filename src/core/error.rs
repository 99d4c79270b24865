//! Error types.
//!
//! Strata surfaces a small set of error conditions at the coordinator
//! boundary. Local collaborator failures are returned to the caller;
//! remote failures travel in-band as END_STREAM responses carrying an
//! error message and are not represented here.

use thiserror::Error;

/// Common Strata error conditions.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Every replica of the shard is marked down.
    ///
    /// The same message is delivered in-band as the END_STREAM error of the
    /// caller's response stream, so the text is part of the API contract.
    #[error("No servers up to query shard {shard_id}")]
    NoServersUp { shard_id: u32 },

    /// An operation that requires a local store ran on a shard without one.
    #[error("shard {shard_id} has no local store attached")]
    NoLocalStore { shard_id: u32 },

    /// The write-ahead log could not assign and persist a request.
    #[error("write-ahead log failure: {message}")]
    WalFailure { message: String },

    /// The local shard store failed to acquire or operate on a shard.
    #[error("local store failure: {message}")]
    StoreFailure { message: String },

    /// A remote replica could not accept a request.
    #[error("server {server_id} failure: {message}")]
    ServerFailure { server_id: u32, message: String },

    /// The caller dropped its response receiver mid-stream.
    #[error("response channel closed by consumer")]
    ResponseChannelClosed,

    /// A wire message could not be decoded.
    #[error("decode failure: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A wire message could not be encoded.
    #[error("encode failure: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Password hashing failed.
    #[error("password hash failure: {0}")]
    PasswordHash(String),
}

impl StrataError {
    /// Build a WAL failure from any displayable cause.
    pub fn wal(message: impl std::fmt::Display) -> Self {
        Self::WalFailure {
            message: message.to_string(),
        }
    }

    /// Build a store failure from any displayable cause.
    pub fn store(message: impl std::fmt::Display) -> Self {
        Self::StoreFailure {
            message: message.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type StrataResult<T> = Result<T, StrataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_servers_up_message_is_stable() {
        let err = StrataError::NoServersUp { shard_id: 3 };
        assert_eq!(err.to_string(), "No servers up to query shard 3");
    }

    #[test]
    fn constructor_helpers() {
        assert_eq!(
            StrataError::wal("fsync failed").to_string(),
            "write-ahead log failure: fsync failed"
        );
        assert_eq!(
            StrataError::store("shard busy").to_string(),
            "local store failure: shard busy"
        );
    }
}

//! Error types and result definitions for the tuya31 crate.
//! Includes the numeric status codes and conversion from standard IO/JSON errors.

use thiserror::Error;

/// Represents all possible errors that can occur when communicating with a Tuya device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TuyaError {
    /// No exchange has been attempted yet
    #[error("Device not initialized")]
    Uninitialized,

    /// Connect, write or read failure (including timeouts)
    #[error("Socket error: {0}")]
    Socket(String),

    /// Response header did not start with the fixed prefix
    #[error("Prefix mismatch")]
    PrefixMismatch,

    /// Response did not end with the fixed suffix
    #[error("Suffix mismatch")]
    SuffixMismatch,

    /// Declared and actual body lengths disagree, or a response body was not expected
    #[error("Length mismatch")]
    LengthMismatch,

    /// Response is not valid JSON or lacks an expected field
    #[error("Parse error: {0}")]
    Parse(String),

    /// Caller-supplied value outside the range the protocol accepts
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The blocking API could not run: no runtime, or called from inside one
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// A specialized Result type for Tuya operations.
pub type Result<T> = std::result::Result<T, TuyaError>;

impl From<std::io::Error> for TuyaError {
    fn from(err: std::io::Error) -> Self {
        TuyaError::Socket(err.to_string())
    }
}

impl From<serde_json::Error> for TuyaError {
    fn from(err: serde_json::Error) -> Self {
        TuyaError::Parse(err.to_string())
    }
}

impl TuyaError {
    pub fn code(&self) -> u32 {
        match self {
            TuyaError::Uninitialized => ERR_UNINIT,
            TuyaError::Socket(_) => ERR_SOCKET,
            TuyaError::PrefixMismatch => ERR_PREFIX,
            TuyaError::SuffixMismatch => ERR_SUFFIX,
            TuyaError::LengthMismatch => ERR_LENGTH,
            TuyaError::Parse(_) => ERR_PARSE,
            TuyaError::Argument(_) => ERR_ARGS,
            TuyaError::Runtime(_) => ERR_RUNTIME,
        }
    }

    /// Error for a numeric code; `None` for `ERR_SUCCESS`. Unknown codes map
    /// to `Uninitialized`.
    pub fn from_code(code: u32) -> Option<Self> {
        let msg = || get_error_message(code).to_string();
        let err = match code {
            ERR_SUCCESS => return None,
            ERR_SOCKET => TuyaError::Socket(msg()),
            ERR_PREFIX => TuyaError::PrefixMismatch,
            ERR_LENGTH => TuyaError::LengthMismatch,
            ERR_SUFFIX => TuyaError::SuffixMismatch,
            ERR_PARSE => TuyaError::Parse(msg()),
            ERR_ARGS => TuyaError::Argument(msg()),
            ERR_RUNTIME => TuyaError::Runtime(msg()),
            _ => TuyaError::Uninitialized,
        };
        Some(err)
    }

    /// Transport-level failures that the frame transport retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TuyaError::Socket(_)
                | TuyaError::PrefixMismatch
                | TuyaError::SuffixMismatch
                | TuyaError::LengthMismatch
        )
    }
}

define_error_codes! {
    ERR_SUCCESS = 0 => "Success",
    ERR_SOCKET = 1 => "Network Error: Unable to Connect",
    ERR_PREFIX = 2 => "Unexpected Frame Prefix from Device",
    ERR_LENGTH = 3 => "Unexpected Frame Length from Device",
    ERR_SUFFIX = 4 => "Unexpected Frame Suffix from Device",
    ERR_PARSE = 5 => "Invalid JSON Response from Device",
    ERR_ARGS = 6 => "Specified Value Out of Range",
    ERR_UNINIT = 7 => "Device Not Initialized",
    ERR_RUNTIME = 8 => "Blocking Runtime Unavailable",
}

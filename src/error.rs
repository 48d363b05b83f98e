//! Error taxonomy for record building and artifact output
//!
//! Every variant is fatal to a batch run. The only non-fatal condition, an
//! unrecognised input key, is reported through the build outcome instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Field length, range or format is wrong
    #[error("invalid {field} `{value}`: {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    /// Install-code CRC-16 trailer does not match the payload
    #[error("{field} `{value}` failed CRC check: expected {expected:#06x}, found {found:#06x}")]
    Integrity {
        field: String,
        value: String,
        expected: u16,
        found: u16,
    },

    /// Output artifact already exists
    #[error("target binary file {} already exists", path.display())]
    Collision { path: PathBuf },

    /// Unknown or missing field
    #[error("configuration error in `{field}`: {reason}")]
    Configuration { field: String, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Bad value for a known field
    pub fn validation(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Unknown or missing field
    pub fn configuration(field: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// I/O failure on `path`
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_field_and_value() {
        let err = Error::validation("mac_address", "0123", "expected 16 hex characters");
        let msg = err.to_string();
        assert!(msg.contains("mac_address"));
        assert!(msg.contains("0123"));
    }

    #[test]
    fn test_integrity_message_shows_crcs() {
        let err = Error::Integrity {
            field: "installcode".into(),
            value: "AABB".into(),
            expected: 0xB5C3,
            found: 0x0000,
        };
        assert!(err.to_string().contains("0xb5c3"));
    }
}

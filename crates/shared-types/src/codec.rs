//! # Wire Codec
//!
//! Encodes payloads placed inside a [`BusMessage`](crate::envelope::BusMessage).
//!
//! - `Bincode`: compact binary, hashes and keys as raw bytes. Default.
//! - `Json`: human-readable for debugging and interop; hashes, keys and
//!   signatures render as hex, dates as ISO-8601, parties with their names.

use crate::errors::CodecError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WireFormat {
    #[default]
    Bincode,
    Json,
}

impl WireFormat {
    /// Serialize a value.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            WireFormat::Bincode => {
                bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
            }
        }
    }

    /// Deserialize a value.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            WireFormat::Bincode => {
                bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
            }
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Bincode => f.write_str("bincode"),
            WireFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for WireFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bincode" => Ok(WireFormat::Bincode),
            "json" => Ok(WireFormat::Json),
            other => Err(CodecError::Decode(format!("unknown wire format '{other}'"))),
        }
    }
}

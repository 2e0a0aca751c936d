//! Small hex helpers used when formatting error context.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UtilsError {
    #[error("Hex decode error {0}")]
    HexError(String),
}

pub fn hex_encode<T: AsRef<[u8]>>(data: T) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn hex_decode(data: &str) -> Result<Vec<u8>, UtilsError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| UtilsError::HexError(e.to_string()))
}

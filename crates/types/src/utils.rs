//! Small hex helpers shared by every crate that logs or errors with addresses/hashes.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UtilsError {
    #[error("Hex decode error {0}")]
    HexError(String),
}

/// Encodes bytes as a `0x`-prefixed lower-case hex string.
pub fn hex_encode<T: AsRef<[u8]>>(data: T) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decodes a `0x`-prefixed (or bare) hex string into bytes.
pub fn hex_decode(data: &str) -> Result<Vec<u8>, UtilsError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| UtilsError::HexError(e.to_string()))
}

/// Left-pads `data` with zero bytes up to 32 bytes. Returns the input unchanged
/// if it is already 32 bytes or longer.
pub fn left_pad_32(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    if data.len() >= 32 {
        out.copy_from_slice(&data[data.len() - 32..]);
    } else {
        out[32 - data.len()..].copy_from_slice(data);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let encoded = hex_encode([0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(encoded, "0xdeadbeef");
        assert_eq!(hex_decode(&encoded).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn left_pad_32_pads_short_input() {
        let padded = left_pad_32(&[0x2a]);
        assert_eq!(padded[31], 0x2a);
        assert_eq!(&padded[..31], &[0u8; 31]);
    }

    #[test]
    fn left_pad_32_truncates_long_input_from_the_left() {
        let mut long = vec![0xff; 40];
        long[39] = 0x01;
        let padded = left_pad_32(&long);
        assert_eq!(padded[31], 0x01);
    }
}

//! Wraps runtime bytecode in a minimal initcode stub that returns it verbatim
//! on construction (§4.E). Constructor side effects of the source contract are
//! intentionally not replayed; constructor-set slots are mirrored through the
//! storage migration instead.

use ethers::types::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("runtime bytecode is too large to address with a PUSH2 length ({0} bytes)")]
    TooLarge(usize),
}

const PUSH1: u8 = 0x60;
const PUSH2: u8 = 0x61;
const CODECOPY: u8 = 0x39;
const RETURN: u8 = 0xf3;

/// Length in bytes of the stub emitted by [`clone_runtime_bytecode`], i.e. the
/// `CODECOPY` offset at which the appended runtime bytes begin:
/// `PUSH2 x x` (3) + `PUSH1 x` (2) + `PUSH1 0` (2) + `CODECOPY` (1) +
/// `PUSH2 x x` (3) + `PUSH1 0` (2) + `RETURN` (1) = 14.
const STUB_LEN: u8 = 14;

/// Builds initcode that `CODECOPY`s and `RETURN`s `runtime` verbatim:
/// `PUSH2 <len> PUSH1 <offset> PUSH1 0 CODECOPY PUSH2 <len> PUSH1 0 RETURN <runtime>`.
///
/// `<offset>` is the length of the stub itself, so `CODECOPY` reads starting
/// exactly where the appended runtime bytes begin.
pub fn clone_runtime_bytecode(runtime: &Bytes) -> Result<Bytes, CloneError> {
    let len = runtime.len();
    if len > u16::MAX as usize {
        return Err(CloneError::TooLarge(len));
    }
    let len_bytes = (len as u16).to_be_bytes();

    let mut stub = Vec::with_capacity(STUB_LEN as usize + len);
    stub.push(PUSH2);
    stub.extend_from_slice(&len_bytes);
    stub.push(PUSH1);
    stub.push(STUB_LEN);
    stub.push(PUSH1);
    stub.push(0);
    stub.push(CODECOPY);
    stub.push(PUSH2);
    stub.extend_from_slice(&len_bytes);
    stub.push(PUSH1);
    stub.push(0);
    stub.push(RETURN);

    debug_assert_eq!(stub.len(), STUB_LEN as usize);
    stub.extend_from_slice(runtime);

    Ok(Bytes::from(stub))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wraps_runtime_bytes_verbatim_after_the_stub() {
        let runtime = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        let initcode = clone_runtime_bytecode(&runtime).unwrap();
        let stub_len = STUB_LEN as usize;
        assert_eq!(initcode.len(), stub_len + runtime.len());
        assert_eq!(&initcode[stub_len..], runtime.as_ref());
    }

    #[test]
    fn encodes_runtime_length_as_a_big_endian_push2_operand() {
        let runtime = Bytes::from(vec![0u8; 300]);
        let initcode = clone_runtime_bytecode(&runtime).unwrap();
        assert_eq!(initcode[0], PUSH2);
        assert_eq!(u16::from_be_bytes([initcode[1], initcode[2]]), 300);
        assert_eq!(initcode[8], PUSH2);
        assert_eq!(u16::from_be_bytes([initcode[9], initcode[10]]), 300);
    }

    #[test]
    fn oversized_runtime_is_rejected() {
        let runtime = Bytes::from(vec![0u8; u16::MAX as usize + 1]);
        assert!(matches!(
            clone_runtime_bytecode(&runtime),
            Err(CloneError::TooLarge(_))
        ));
    }
}

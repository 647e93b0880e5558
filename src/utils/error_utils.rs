//! Revert data decoding for `*END` events
//!
//! A failed internal call reports its error message through the outcome
//! triple. Solidity revert payloads are decoded when recognised:
//! - `Error(string)` (selector `0x08c379a0`): the revert string
//! - `Panic(uint256)` (selector `0x4e487b71`): a description of the panic code
//!
//! Anything else falls back to the interpreter's halt or revert kind.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use revm::interpreter::InstructionResult;

/// Decode a Solidity revert payload
///
/// # Example
/// ```rust
/// use revm_soda::utils::error_utils::parse_custom_error;
///
/// let output = hex::decode("08c379a000000000000000000000000000000000000000000000000000000000000000200000000000000000000000000000000000000000000000000000000000000014496e73756666696369656e742062616c616e636500000000000000000000000000").unwrap();
/// assert_eq!(parse_custom_error(&output), Some("Insufficient balance".to_string()));
/// ```
pub fn parse_custom_error(output: &[u8]) -> Option<String> {
    let (selector, payload) = output.split_first_chunk::<4>()?;
    match selector {
        [0x08, 0xc3, 0x79, 0xa0] => match DynSolType::String.abi_decode(payload) {
            Ok(DynSolValue::String(reason)) => Some(reason),
            _ => None,
        },
        [0x4e, 0x48, 0x7b, 0x71] => match DynSolType::Uint(256).abi_decode(payload) {
            Ok(DynSolValue::Uint(code, _)) => Some(panic_reason(code.saturating_to::<u64>())),
            _ => None,
        },
        _ => None,
    }
}

fn panic_reason(code: u64) -> String {
    let reason = match code {
        0x01 => "Assertion failed",
        0x11 => "Arithmetic overflow",
        0x12 => "Division by zero",
        0x21 => "Invalid enum value",
        0x22 => "Invalid storage byte array",
        0x31 => "Pop on empty array",
        0x32 => "Array access out of bounds",
        0x41 => "Out of memory",
        0x51 => "Uninitialized function pointer",
        code => return format!("Panic: Unknown error code (0x{code:x})"),
    };
    format!("Panic: {reason}")
}

/// Error message of a frame that ended with `result`; empty on success
pub fn revert_reason(result: InstructionResult, output: &[u8]) -> String {
    if result.is_ok() {
        return String::new();
    }
    parse_custom_error(output).unwrap_or_else(|| format!("{result:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::hex::decode;

    fn panic_payload(code: u8) -> Vec<u8> {
        let mut bytes = vec![0x4e, 0x48, 0x7b, 0x71];
        bytes.extend_from_slice(&[0u8; 31]);
        bytes.push(code);
        bytes
    }

    #[test]
    fn test_parse_error_string() {
        let error_bytes = decode(
            "08c379a0\
             0000000000000000000000000000000000000000000000000000000000000020\
             0000000000000000000000000000000000000000000000000000000000000014\
             496e73756666696369656e742062616c616e636500000000000000000000000000",
        )
        .unwrap();
        assert_eq!(
            parse_custom_error(&error_bytes),
            Some("Insufficient balance".to_string())
        );

        let truncated = decode("08c379a0").unwrap();
        assert_eq!(parse_custom_error(&truncated), None);
    }

    #[test]
    fn test_parse_panic() {
        assert_eq!(
            parse_custom_error(&panic_payload(0x11)),
            Some("Panic: Arithmetic overflow".to_string())
        );
        assert_eq!(
            parse_custom_error(&panic_payload(0x32)),
            Some("Panic: Array access out of bounds".to_string())
        );
        assert_eq!(
            parse_custom_error(&panic_payload(0xff)),
            Some("Panic: Unknown error code (0xff)".to_string())
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(parse_custom_error(&[]), None);
        assert_eq!(parse_custom_error(&[0x08, 0xc3, 0x79]), None);
        assert_eq!(parse_custom_error(&[0x00, 0x00, 0x00, 0x00]), None);
        assert_eq!(parse_custom_error(&[0x4e, 0x48, 0x7b, 0x71, 0x00]), None);
    }

    #[test]
    fn test_revert_reason_falls_back_to_result_kind() {
        assert_eq!(revert_reason(InstructionResult::Return, &[]), "");
        assert_eq!(revert_reason(InstructionResult::OutOfGas, &[]), "OutOfGas");
        assert_eq!(
            revert_reason(InstructionResult::Revert, &panic_payload(0x01)),
            "Panic: Assertion failed"
        );
    }
}

//! Dispatcher selector scan
//!
//! Solidity dispatchers compare the calldata selector against `PUSH4 <selector>`
//! constants. Walking the opcode stream (skipping push payloads) and collecting
//! every PUSH4 immediate recovers the external interface without an ABI.

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{OP_PUSH1, OP_PUSH32, OP_PUSH4};

/// Unique PUSH4 immediates in first-seen order
pub fn scan_selectors(code: &[u8]) -> AppResult<Vec<[u8; 4]>> {
    if code.is_empty() {
        return Err(AppError::decode_failure("no bytecode at address"));
    }

    let mut selectors: Vec<[u8; 4]> = Vec::new();
    let mut pc = 0usize;

    while pc < code.len() {
        let op = code[pc];
        if (OP_PUSH1..=OP_PUSH32).contains(&op) {
            let width = (op - OP_PUSH1 + 1) as usize;
            let start = pc + 1;
            let end = start + width;
            if end > code.len() {
                // Truncated trailing push (metadata tail)
                break;
            }
            if op == OP_PUSH4 {
                let mut selector = [0u8; 4];
                selector.copy_from_slice(&code[start..end]);
                if !selectors.contains(&selector) {
                    selectors.push(selector);
                }
            }
            pc = end;
        } else {
            pc += 1;
        }
    }

    if selectors.is_empty() {
        return Err(AppError::decode_failure(
            "no function dispatcher found in bytecode",
        ));
    }
    Ok(selectors)
}

//! Constant-time comparison.

use subtle::ConstantTimeEq;

/// Compare two byte strings without data-dependent early exit.
///
/// Inputs of different length compare unequal immediately. Callers compare
/// fixed-length digests, so the length itself is not secret.
pub fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

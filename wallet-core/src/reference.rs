//! Transaction reference generation
//!
//! References are human-readable identifiers of the form `TXN-XXXXXXXX`,
//! where the suffix is 8 uppercase hex digits drawn from an unbiased RNG.
//! The generator keeps no registry of issued references: uniqueness is a
//! probabilistic property backed by the store's uniqueness guard, and the
//! recorder regenerates on collision.

use rand::Rng;

/// Fixed reference prefix
pub const REFERENCE_PREFIX: &str = "TXN-";

/// Number of hex digits in the reference suffix
pub const REFERENCE_SUFFIX_LEN: usize = 8;

/// Total reference length (`TXN-` + 8 hex digits)
pub const REFERENCE_LEN: usize = 12;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Generate a new transaction reference
pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(REFERENCE_LEN);
    out.push_str(REFERENCE_PREFIX);
    for _ in 0..REFERENCE_SUFFIX_LEN {
        out.push(HEX_DIGITS[rng.gen_range(0..16)] as char);
    }
    out
}

/// Check a string against the reference format
pub fn is_valid_reference(s: &str) -> bool {
    s.len() == REFERENCE_LEN
        && s.starts_with(REFERENCE_PREFIX)
        && s[REFERENCE_PREFIX.len()..]
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

use subtle::ConstantTimeEq;

/// Compare an inbound credential against the configured secret in constant time.
///
/// A missing or empty secret never matches.
pub fn verify(expected: Option<&str>, provided: &str) -> bool {
    match expected {
        Some(secret) if !secret.is_empty() => secret.as_bytes().ct_eq(provided.as_bytes()).into(),
        _ => false,
    }
}

//! Settlement proof: keyed hash over order and transaction references
//!
//! The gateway signs `order_ref|txn_ref` with the shared secret; we
//! recompute and compare in constant time. A proof that fails to decode
//! as hex is invalid, not an error.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the expected proof signature as lowercase hex
pub fn expected_signature(order_ref: &str, txn_ref: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(order_ref.as_bytes());
    mac.update(b"|");
    mac.update(txn_ref.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a provided proof signature against the expected keyed hash
pub fn verify(order_ref: &str, txn_ref: &str, secret: &str, provided: &str) -> bool {
    let provided_bytes = match hex::decode(provided) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(order_ref.as_bytes());
    mac.update(b"|");
    mac.update(txn_ref.as_bytes());

    // Constant-time comparison
    mac.verify_slice(&provided_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-gateway-secret";

    #[test]
    fn test_expected_signature_matches_verify() {
        let sig = expected_signature("order_1", "txn_1", SECRET);
        assert_eq!(sig.len(), 64);
        assert!(verify("order_1", "txn_1", SECRET, &sig));
    }

    #[test]
    fn test_tampered_refs_rejected() {
        let sig = expected_signature("order_1", "txn_1", SECRET);
        assert!(!verify("order_2", "txn_1", SECRET, &sig));
        assert!(!verify("order_1", "txn_2", SECRET, &sig));
        assert!(!verify("order_1", "txn_1", "other-secret", &sig));
    }

    #[test]
    fn test_separator_is_part_of_the_payload() {
        // "a|b" + "c" must not collide with "a" + "b|c"
        let sig = expected_signature("a|b", "c", SECRET);
        assert!(!verify("a", "b|c", SECRET, &sig));
    }

    #[test]
    fn test_non_hex_proof_is_invalid() {
        assert!(!verify("order_1", "txn_1", SECRET, "not-hex!"));
        assert!(!verify("order_1", "txn_1", SECRET, ""));
    }
}

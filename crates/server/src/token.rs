use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use exemptd_core::CustomerId;

/// Compute the download token for a (target, requester) pair.
///
/// `hex(sha256(secret || target_id || requester_id))`. Not stored and
/// never expires: validity is bound only to the two IDs and the secret
/// staying unchanged. Rotating the secret invalidates every issued link.
#[must_use]
pub fn generate_token(secret: &str, target: CustomerId, requester: CustomerId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(target.to_string().as_bytes());
    hasher.update(requester.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a presented token in constant time.
#[must_use]
pub fn is_valid_token(
    secret: &str,
    target: CustomerId,
    requester: CustomerId,
    presented: &str,
) -> bool {
    let expected = generate_token(secret, target, requester);
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

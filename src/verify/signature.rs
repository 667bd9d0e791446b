//! secp256k1 signature recovery over EIP-191 personal messages.

use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::domain::attestation::{CheckOutcome, MessageSignature};

pub const SUPPORTED_ALGORITHM: &str = "ecdsa";

const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature is not valid hex")]
    InvalidHex,
    #[error("signature must be {SIGNATURE_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("signature scalars are out of range")]
    Malformed,
    #[error("public key could not be recovered")]
    RecoveryFailed,
}

/// Hash signed by `personal_sign`: keccak256 over the prefixed message.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Ethereum-style address of a public key: last 20 bytes of keccak256 over the
/// uncompressed point without its 0x04 tag.
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Recovers the signer address from a hex `r || s || v` signature over `message`.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String, SignatureError> {
    let raw = signature_hex.trim();
    let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
        .map_err(|_| SignatureError::InvalidHex)?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(bytes.len()));
    }

    let v = bytes[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let mut recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or(SignatureError::InvalidRecoveryId(v))?;
    let mut signature =
        Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::Malformed)?;

    // High-s signatures are valid on Ethereum; flipping s flips the y parity.
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let prehash = eip191_hash(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(&prehash, &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_of(&key))
}

pub fn addresses_match(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

/// Checks that the published signature was produced by the published signing address.
pub fn verify_message_signature(signature: &MessageSignature) -> CheckOutcome {
    if !signature
        .signing_algo
        .eq_ignore_ascii_case(SUPPORTED_ALGORITHM)
    {
        return CheckOutcome::Skipped(format!(
            "unsupported signing algorithm {}",
            signature.signing_algo
        ));
    }

    match recover_address(&signature.text, &signature.signature) {
        Ok(recovered) if addresses_match(&recovered, &signature.signing_address) => {
            CheckOutcome::Passed
        }
        Ok(recovered) => CheckOutcome::Failed(format!(
            "signed by {recovered}, expected {}",
            signature.signing_address
        )),
        Err(error) => CheckOutcome::Failed(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::SigningKey;

    use super::*;

    const KNOWN_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const KNOWN_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
    const KNOWN_SIGNATURE: &str = "0xb91467e570a6466aa9e9876cbcd013baba02900b8979d43fe208a4a4f339f5fd6007e74cd82e037b800186422fc2da167c747ef045e5d18a5f5d4300f8e1a0291c";

    fn signing_key() -> SigningKey {
        let bytes = hex::decode(KNOWN_KEY).expect("key hex");
        SigningKey::from_slice(&bytes).expect("valid key")
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let prehash = eip191_hash(message.as_bytes());
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&prehash)
            .expect("signing should work");

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        hex::encode(bytes)
    }

    fn message_signature(text: &str, signature: String, address: &str) -> MessageSignature {
        MessageSignature {
            text: text.to_owned(),
            signature,
            signing_address: address.to_owned(),
            signing_algo: "ecdsa".to_owned(),
        }
    }

    #[test]
    fn derives_known_address_from_key() {
        let key = signing_key();

        assert!(addresses_match(&address_of(key.verifying_key()), KNOWN_ADDRESS));
    }

    #[test]
    fn recovers_signer_of_known_personal_sign_vector() {
        let recovered = recover_address("Some data", KNOWN_SIGNATURE).expect("should recover");

        assert!(addresses_match(&recovered, KNOWN_ADDRESS));
    }

    #[test]
    fn signature_from_known_key_verifies() {
        let text = "aaaa:bbbb";
        let signature = sign(&signing_key(), text);

        let outcome =
            verify_message_signature(&message_signature(text, signature, KNOWN_ADDRESS));

        assert_eq!(outcome, CheckOutcome::Passed);
    }

    #[test]
    fn tampered_text_does_not_verify() {
        let signature = sign(&signing_key(), "aaaa:bbbb");

        let outcome =
            verify_message_signature(&message_signature("aaaa:cccc", signature, KNOWN_ADDRESS));

        assert!(matches!(outcome, CheckOutcome::Failed(_)));
    }

    #[test]
    fn wrong_address_does_not_verify() {
        let signature = sign(&signing_key(), "aaaa:bbbb");

        let outcome = verify_message_signature(&message_signature(
            "aaaa:bbbb",
            signature,
            "0x0000000000000000000000000000000000000001",
        ));

        assert!(matches!(outcome, CheckOutcome::Failed(_)));
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert_eq!(
            recover_address("x", "zz"),
            Err(SignatureError::InvalidHex)
        );
        assert_eq!(
            recover_address("x", "0x1234"),
            Err(SignatureError::InvalidLength(2))
        );

        let mut bytes = vec![1u8; 64];
        bytes.push(40);
        assert_eq!(
            recover_address("x", &hex::encode(bytes)),
            Err(SignatureError::InvalidRecoveryId(40))
        );
    }

    #[test]
    fn unsupported_algorithm_is_skipped() {
        let mut signature = message_signature("a:b", String::new(), KNOWN_ADDRESS);
        signature.signing_algo = "ed25519".to_owned();

        assert!(matches!(
            verify_message_signature(&signature),
            CheckOutcome::Skipped(_)
        ));
    }
}

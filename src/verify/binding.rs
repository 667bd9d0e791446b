//! Ties a signature to the response the user actually saw and to the attested key.

use sha2::{Digest, Sha256};

use crate::domain::attestation::{AttestationReport, CheckOutcome, MessageSignature};

use super::signature::addresses_match;

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compares the signed response hash with the locally held message content.
pub fn check_response_binding(
    signature: &MessageSignature,
    response_content: Option<&str>,
) -> CheckOutcome {
    let Some(content) = response_content.filter(|content| !content.is_empty()) else {
        return CheckOutcome::Skipped("response content is not available locally".to_owned());
    };

    let Some((_, signed_response_hash)) = signature.signed_hashes() else {
        return CheckOutcome::Failed("signed text is not in request:response form".to_owned());
    };

    let local_hash = sha256_hex(content.as_bytes());
    if local_hash.eq_ignore_ascii_case(signed_response_hash.trim()) {
        CheckOutcome::Passed
    } else {
        CheckOutcome::Failed("signed response hash does not match the message".to_owned())
    }
}

/// Checks that the signing key is the one attested by the enclave report.
pub fn check_enclave_binding(
    signature: &MessageSignature,
    report: Option<&AttestationReport>,
) -> CheckOutcome {
    match report {
        None => CheckOutcome::Failed("attestation report is unavailable".to_owned()),
        Some(report) if addresses_match(&report.signing_address, &signature.signing_address) => {
            CheckOutcome::Passed
        }
        Some(report) => CheckOutcome::Failed(format!(
            "attested key {} differs from signer {}",
            report.signing_address, signature.signing_address
        )),
    }
}

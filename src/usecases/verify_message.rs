use crate::{
    domain::{
        attestation::{AttestationReport, CheckOutcome, MessageSignature, VerificationReport},
        message::{Message, Role},
    },
    verify::{
        binding::{check_enclave_binding, check_response_binding},
        signature::verify_message_signature,
    },
};

use super::contracts::{ChatSource, SourceError, UseCaseError};

const VERIFICATION_COMPLETED: &str = "VERIFY_COMPLETED";

pub trait AttestationSource {
    fn message_signature(
        &self,
        message_id: &str,
        model: &str,
    ) -> Result<MessageSignature, SourceError>;
    fn attestation_report(&self, model: &str) -> Result<AttestationReport, SourceError>;
}

/// Runs every local check for one assistant message. Fetch failures become failed
/// checks in the report; only an expired session aborts.
pub fn verify_message<S>(source: &S, message: &Message) -> Result<VerificationReport, UseCaseError>
where
    S: AttestationSource + ?Sized,
{
    let Some(model) = message.model.clone().filter(|_| message.role == Role::Assistant) else {
        return Err(UseCaseError::NotFound);
    };

    let signature = match source.message_signature(&message.id, &model) {
        Ok(signature) => signature,
        Err(SourceError::Unauthorized) => return Err(UseCaseError::Unauthorized),
        Err(error) => {
            return Ok(VerificationReport {
                message_id: message.id.clone(),
                model,
                signature: None,
                signature_check: CheckOutcome::Failed(fetch_failure("signature", error)),
                hash_binding: CheckOutcome::Skipped("no signature".to_owned()),
                report: None,
                enclave_binding: CheckOutcome::Skipped("no signature".to_owned()),
            })
        }
    };

    let report = match source.attestation_report(&model) {
        Ok(report) => Ok(report),
        Err(SourceError::Unauthorized) => return Err(UseCaseError::Unauthorized),
        Err(error) => Err(fetch_failure("attestation report", error)),
    };

    let content = (!message.content.is_empty()).then_some(message.content.as_str());
    let signature_check = verify_message_signature(&signature);
    let hash_binding = check_response_binding(&signature, content);
    let enclave_binding = match &report {
        Ok(report) => check_enclave_binding(&signature, Some(report)),
        Err(detail) => CheckOutcome::Failed(detail.clone()),
    };

    let report = VerificationReport {
        message_id: message.id.clone(),
        model,
        signature: Some(signature),
        signature_check,
        hash_binding,
        report: report.ok(),
        enclave_binding,
    };

    tracing::info!(
        code = VERIFICATION_COMPLETED,
        message_id = %report.message_id,
        trusted = report.is_trusted(),
        "message verification finished"
    );

    Ok(report)
}

/// Loads a stored chat and verifies one of its messages.
pub fn verify_stored_message<B>(
    backend: &B,
    chat_id: &str,
    message_id: &str,
) -> Result<VerificationReport, UseCaseError>
where
    B: ChatSource + AttestationSource + ?Sized,
{
    let chat = backend.get_chat(chat_id)?;
    let message = chat
        .history
        .get(message_id)
        .ok_or(UseCaseError::NotFound)?;

    verify_message(backend, message)
}

fn fetch_failure(what: &str, error: SourceError) -> String {
    match error {
        SourceError::NotFound => format!("{what} not published for this message"),
        SourceError::Unavailable(detail) => format!("{what} unavailable: {detail}"),
        SourceError::InvalidData(detail) => format!("{what} malformed: {detail}"),
        SourceError::Unauthorized => format!("{what} requires sign-in"),
    }
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::SigningKey;

    use super::*;
    use crate::{
        usecases::stubs::StubBackend,
        verify::{
            binding::sha256_hex,
            signature::{address_of, eip191_hash},
        },
    };

    fn signed(content: &str) -> MessageSignature {
        let key = SigningKey::from_slice(&[7u8; 32]).expect("key");
        let text = format!("{}:{}", sha256_hex(b"request"), sha256_hex(content.as_bytes()));
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&eip191_hash(text.as_bytes()))
            .expect("sign");
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);

        MessageSignature {
            text,
            signature: format!("0x{}", hex::encode(bytes)),
            signing_address: address_of(key.verifying_key()),
            signing_algo: "ecdsa".to_owned(),
        }
    }

    fn report_for(signature: &MessageSignature) -> AttestationReport {
        AttestationReport {
            model: Some("llama".to_owned()),
            signing_address: signature.signing_address.to_uppercase().replace("0X", "0x"),
            signing_algo: "ecdsa".to_owned(),
            intel_quote: Some("0400ab".to_owned()),
            nvidia_payload: None,
            raw: "{}".to_owned(),
        }
    }

    fn answer(content: &str) -> Message {
        let mut message = Message::assistant_placeholder("a1", Some("u1".into()), "llama", 1);
        message.content = content.to_owned();
        message.done = true;
        message
    }

    #[test]
    fn fully_bound_message_is_trusted() {
        let signature = signed("Hello!");
        let backend = StubBackend::default();
        backend.set_attestation(Some(signature.clone()), Some(report_for(&signature)));

        let report = verify_message(&backend, &answer("Hello!")).expect("verify");

        assert_eq!(report.signature_check, CheckOutcome::Passed);
        assert_eq!(report.hash_binding, CheckOutcome::Passed);
        assert_eq!(report.enclave_binding, CheckOutcome::Passed);
        assert!(report.is_trusted());
    }

    #[test]
    fn edited_content_breaks_hash_binding() {
        let signature = signed("Hello!");
        let backend = StubBackend::default();
        backend.set_attestation(Some(signature.clone()), Some(report_for(&signature)));

        let report = verify_message(&backend, &answer("Hello?")).expect("verify");

        assert!(matches!(report.hash_binding, CheckOutcome::Failed(_)));
        assert!(!report.is_trusted());
    }

    #[test]
    fn missing_signature_is_reported_not_fatal() {
        let backend = StubBackend::default();

        let report = verify_message(&backend, &answer("Hello!")).expect("verify");

        assert!(report.signature.is_none());
        assert!(matches!(report.signature_check, CheckOutcome::Failed(_)));
        assert!(!report.is_trusted());
    }

    #[test]
    fn missing_report_fails_enclave_binding() {
        let signature = signed("Hello!");
        let backend = StubBackend::default();
        backend.set_attestation(Some(signature), None);

        let report = verify_message(&backend, &answer("Hello!")).expect("verify");

        assert_eq!(report.signature_check, CheckOutcome::Passed);
        assert!(matches!(report.enclave_binding, CheckOutcome::Failed(_)));
    }

    #[test]
    fn user_messages_cannot_be_verified() {
        let backend = StubBackend::default();
        let message = Message::user("u1", None, "hi", 1);

        assert_eq!(
            verify_message(&backend, &message),
            Err(UseCaseError::NotFound)
        );
    }

    #[test]
    fn expired_session_aborts() {
        let backend = StubBackend::default();
        backend.fail("message_signature", SourceError::Unauthorized);

        assert_eq!(
            verify_message(&backend, &answer("x")),
            Err(UseCaseError::Unauthorized)
        );
    }
}

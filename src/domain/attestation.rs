//! Results of checking that a response was produced inside an attested enclave.

/// Signature the service publishes for a generated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSignature {
    /// Signed payload, `"{sha256(request)}:{sha256(response)}"`.
    pub text: String,
    /// 65-byte `r || s || v` signature, hex encoded.
    pub signature: String,
    pub signing_address: String,
    pub signing_algo: String,
}

impl MessageSignature {
    /// Splits the signed payload into request and response hashes.
    pub fn signed_hashes(&self) -> Option<(&str, &str)> {
        self.text.split_once(':')
    }
}

/// TEE attestation report for a model's signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationReport {
    pub model: Option<String>,
    pub signing_address: String,
    pub signing_algo: String,
    pub intel_quote: Option<String>,
    pub nvidia_payload: Option<String>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl CheckOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Passed => "✓",
            Self::Failed(_) => "✗",
            Self::Skipped(_) => "-",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed(detail) | Self::Skipped(detail) => Some(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub message_id: String,
    pub model: String,
    pub signature: Option<MessageSignature>,
    /// Recovered signer matches the published signing address.
    pub signature_check: CheckOutcome,
    /// Signed response hash matches the local message content.
    pub hash_binding: CheckOutcome,
    pub report: Option<AttestationReport>,
    /// Attested signing address matches the signer.
    pub enclave_binding: CheckOutcome,
}

impl VerificationReport {
    /// Trusted when the signature verifies and the key is bound to the attested enclave.
    /// A skipped hash binding does not count against trust, a failed one does.
    pub fn is_trusted(&self) -> bool {
        self.signature_check.is_passed()
            && self.enclave_binding.is_passed()
            && !matches!(self.hash_binding, CheckOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttestationPanelState {
    #[default]
    Hidden,
    Loading {
        message_id: String,
    },
    Ready(VerificationReport),
    Error(String),
}

impl AttestationPanelState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

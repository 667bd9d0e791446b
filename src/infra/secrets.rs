//! Scrubbing for text that may carry credentials: panic payloads and
//! server-supplied error details shown in toasts.

use std::panic;

const REDACTED: &str = "[REDACTED]";

/// Keys whose value is always hidden in `key=value` / `key:value` pairs.
const SENSITIVE_KEYS: [&str; 9] = [
    "password",
    "passwd",
    "secret",
    "token",
    "bearer",
    "authorization",
    "api_key",
    "apikey",
    "cookie",
];

/// Auth schemes whose credential follows as the next word.
const AUTH_SCHEMES: [&str; 2] = ["bearer", "basic"];

/// Prefixes of our own stable codes that may be echoed back to the user.
const TRUSTED_CODE_PREFIXES: [&str; 2] = ["AUTH_", "API_"];

const FALLBACK_CODE: &str = "AUTH_TRANSIENT";

/// Redacts credential-looking words while keeping the surrounding sentence.
///
/// `password=hunter2` becomes `password=[REDACTED]` and `Bearer <token>`
/// becomes `Bearer [REDACTED]`. A key word on its own, as in "wrong
/// password", is left alone.
pub fn redact_text(input: &str) -> String {
    let mut out = Vec::new();
    let mut hide_next = false;

    for word in input.split_whitespace() {
        let lowered = word.to_ascii_lowercase();
        let sensitive = SENSITIVE_KEYS.iter().any(|key| lowered.contains(key));

        if hide_next {
            out.push(REDACTED.to_owned());
            hide_next = false;
            continue;
        }

        match split_pair(word) {
            Some((key, _)) if sensitive => out.push(format!("{key}{REDACTED}")),
            _ if AUTH_SCHEMES.contains(&lowered.as_str()) => {
                out.push(word.to_owned());
                hide_next = true;
            }
            _ if looks_like_credential(word) => out.push(REDACTED.to_owned()),
            _ => out.push(word.to_owned()),
        }
    }

    out.join(" ")
}

/// Keeps an error code only when it looks like one of our own stable codes.
pub fn sanitize_error_code(code: &str) -> String {
    let trusted = TRUSTED_CODE_PREFIXES
        .iter()
        .any(|prefix| code.starts_with(prefix))
        && code.len() <= 64
        && code
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_');

    if trusted {
        code.to_owned()
    } else {
        FALLBACK_CODE.to_owned()
    }
}

pub fn install_panic_redaction_hook() {
    panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_owned())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-text panic payload".to_owned());

        let location = info
            .location()
            .map(|at| format!(" at {}:{}", at.file(), at.line()))
            .unwrap_or_default();

        eprintln!("vchat panic: {}{location}", redact_text(&payload));
    }));
}

/// Splits `key=value` or `key:value`, returning the key with its separator.
fn split_pair(word: &str) -> Option<(&str, &str)> {
    let at = word.find(['=', ':'])?;
    let (key, rest) = word.split_at(at + 1);
    (!rest.is_empty()).then_some((key, rest))
}

/// JWTs, `sk-` API keys and long hex strings (signatures, private keys).
fn looks_like_credential(word: &str) -> bool {
    let cleaned = word.trim_matches(|ch: char| !ch.is_ascii_alphanumeric() && ch != '-');

    if cleaned.starts_with("eyJ") || cleaned.starts_with("sk-") {
        return true;
    }

    let hex = cleaned.strip_prefix("0x").unwrap_or(cleaned);
    hex.len() >= 64 && hex.chars().all(|ch| ch.is_ascii_hexdigit())
}

use std::io;

use anyhow::Result;

use crate::{
    domain::user::{Session, User, UserRole},
    infra::{contracts::TokenStore, secrets::sanitize_error_code},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub email_attempts: usize,
    pub password_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            email_attempts: 3,
            password_attempts: 3,
        }
    }
}

#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthBackendError {
    InvalidCredentials,
    Timeout,
    Transient { code: &'static str, message: String },
}

pub trait AuthBackend {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<Session, AuthBackendError>;
}

pub trait AuthTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

pub struct StdTerminal;

impl AuthTerminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        println!("{line}");
        Ok(())
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use std::io::Write;

        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = io::stdin().read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_owned()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(password) => Ok(Some(password)),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidedAuthOutcome {
    Authenticated(User),
    ExitWithGuidance,
}

pub fn run_guided_auth(
    terminal: &mut dyn AuthTerminal,
    backend: &mut dyn AuthBackend,
    token_store: &dyn TokenStore,
    retry_policy: &RetryPolicy,
) -> Result<GuidedAuthOutcome> {
    terminal.print_line("No valid session found. Sign in to your chat account.")?;

    let Some(email) = collect_email(terminal, retry_policy.email_attempts)? else {
        return Ok(GuidedAuthOutcome::ExitWithGuidance);
    };

    let Some(session) = collect_password(
        terminal,
        backend,
        &email,
        retry_policy.password_attempts,
    )?
    else {
        return Ok(GuidedAuthOutcome::ExitWithGuidance);
    };

    if session.user.role == UserRole::Pending {
        terminal.print_line(
            "AUTH_ACCOUNT_PENDING: This account is waiting for administrator approval. Try again once it is activated.",
        )?;
        return Ok(GuidedAuthOutcome::ExitWithGuidance);
    }

    token_store.save(&session.token)?;
    terminal.print_line(&format!(
        "Signed in as {}. Session saved.",
        session.user.email
    ))?;

    Ok(GuidedAuthOutcome::Authenticated(session.user))
}

fn collect_email(terminal: &mut dyn AuthTerminal, attempts: usize) -> io::Result<Option<String>> {
    for attempt in 1..=attempts {
        terminal.print_line("Step 1/2: Enter the email address of your account.")?;
        let Some(email) = terminal.prompt_line("Email: ")? else {
            terminal.print_line("Input cancelled (EOF). Run `vchat login` to retry.")?;
            return Ok(None);
        };

        if !is_valid_email(&email) {
            terminal.print_line(&format!(
                "Invalid email address. Attempts left: {}",
                attempts.saturating_sub(attempt)
            ))?;
            continue;
        }

        return Ok(Some(email));
    }

    terminal.print_line("Email step failed too many times. Run `vchat login` to retry.")?;
    Ok(None)
}

fn collect_password(
    terminal: &mut dyn AuthTerminal,
    backend: &mut dyn AuthBackend,
    email: &str,
    attempts: usize,
) -> io::Result<Option<Session>> {
    for attempt in 1..=attempts {
        terminal.print_line("Step 2/2: Enter your password.")?;
        let Some(password) = terminal.prompt_secret("Password: ")? else {
            terminal.print_line("Input cancelled (EOF). Run `vchat login` to retry.")?;
            return Ok(None);
        };

        if password.is_empty() {
            terminal.print_line(&format!(
                "Password cannot be empty. Attempts left: {}",
                attempts.saturating_sub(attempt)
            ))?;
            continue;
        }

        match backend.sign_in(email, &password) {
            Ok(session) => return Ok(Some(session)),
            Err(err) => {
                if !handle_backend_error(terminal, err, attempt, attempts)? {
                    return Ok(None);
                }
            }
        }
    }

    terminal.print_line("Sign-in failed too many times. Run `vchat login` to retry.")?;
    Ok(None)
}

fn handle_backend_error(
    terminal: &mut dyn AuthTerminal,
    error: AuthBackendError,
    attempt: usize,
    max_attempts: usize,
) -> io::Result<bool> {
    let attempts_left = max_attempts.saturating_sub(attempt);

    match error {
        AuthBackendError::InvalidCredentials => {
            terminal.print_line(&format!(
                "AUTH_INVALID_CREDENTIALS: The email or password is incorrect. Attempts left: {attempts_left}"
            ))?;
        }
        AuthBackendError::Timeout => {
            terminal.print_line(&format!(
                "AUTH_TIMEOUT: The server did not answer in time. Check network and retry. Attempts left: {attempts_left}"
            ))?;
        }
        AuthBackendError::Transient { code, .. } => {
            let safe_code = sanitize_error_code(code);
            terminal.print_line(&format!(
                "{safe_code}: temporary sign-in issue. Please retry. Attempts left: {attempts_left}"
            ))?;
        }
    }

    Ok(attempts_left > 0)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

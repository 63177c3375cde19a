//! Email extraction from identity labels
//!
//! Labels usually read `Full Name (Comment) <local@domain.tld>`; only an
//! address in angle brackets counts.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CoreError, Result};

const EMAIL_PATTERN: &str = r"<([a-zA-Z0-9_+.\-]+)@([a-zA-Z0-9.\-]+)\.([a-zA-Z.]{2,10})>";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Extract the bracketed email address from an identity label
///
/// # Errors
///
/// Returns `NotFound` if the label carries no `<local@domain.tld>` address.
pub fn extract_email(label: &str) -> Result<String> {
    email_regex()
        .find(label)
        .map(|m| m.as_str().trim_matches(|c| c == '<' || c == '>').to_string())
        .ok_or_else(|| CoreError::NotFound(format!("no email in identity label {:?}", label)))
}

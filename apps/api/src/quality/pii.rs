//! PII presence detection and log scrubbing.
//!
//! Only presence is reported; matched content never leaves this module.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Phone candidates need at least this many digits once separators are ignored.
const MIN_PHONE_DIGITS: usize = 7;

static PII_PATTERNS: OnceLock<PiiPatternSet> = OnceLock::new();

struct PiiPatternSet {
    email: Regex,
    phone: Regex,
    location: Regex,
}

impl PiiPatternSet {
    fn new() -> Self {
        Self {
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("email regex must compile"),

            // digits with same-line separators; digit count is checked separately
            phone: Regex::new(r"\+?\(?\d[\d \t().-]{5,}\d").expect("phone regex must compile"),

            // "City, ST", "San Francisco, CA", "Toronto, Ontario"
            location: Regex::new(r"\b[A-Z][a-z]+(?:[ \t][A-Z][a-z]+)?,[ \t]?(?:[A-Z]{2}\b|[A-Z][a-z]+)")
                .expect("location regex must compile"),
        }
    }
}

fn patterns() -> &'static PiiPatternSet {
    PII_PATTERNS.get_or_init(PiiPatternSet::new)
}

fn is_phone_like(candidate: &str) -> bool {
    candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiPresence {
    pub email: bool,
    pub phone: bool,
    pub location: bool,
}

pub fn detect_pii_presence(text: &str) -> PiiPresence {
    let p = patterns();
    PiiPresence {
        email: p.email.is_match(text),
        phone: p.phone.find_iter(text).any(|m| is_phone_like(m.as_str())),
        location: p.location.is_match(text),
    }
}

/// Replaces emails and phone numbers with `[email]` / `[phone]` before text is logged.
pub fn scrub_pii(text: &str) -> String {
    let p = patterns();
    let without_email = p.email.replace_all(text, "[email]");
    p.phone
        .replace_all(&without_email, |caps: &Captures| {
            let candidate = &caps[0];
            if is_phone_like(candidate) {
                "[phone]".to_string()
            } else {
                candidate.to_string()
            }
        })
        .into_owned()
}

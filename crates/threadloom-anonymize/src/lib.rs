//! PII anonymizer: scans a UTF-8 string and substitutes ranges matching a
//! recognized PII pattern with a fixed placeholder token.
//!
//! Patterns run in a fixed priority order (`URL_AUTH` before `EMAIL` to
//! avoid partial matches, then IP, phone, path, API key, mention) and each
//! pass operates on the string as redacted by the passes before it.
//! Anonymization never fails: an input with no matches is returned
//! unchanged with an empty redaction list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One applied substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redaction {
    pub kind: PiiKind,
    pub original: String,
    pub replacement: &'static str,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PiiKind {
    UrlAuth,
    Email,
    Ipv4,
    Ipv6,
    Phone,
    FilePath,
    ApiKey,
    Mention,
}

impl PiiKind {
    fn replacement(self) -> &'static str {
        match self {
            PiiKind::UrlAuth => "[URL_REDACTED]",
            PiiKind::Email => "[EMAIL]",
            PiiKind::Ipv4 | PiiKind::Ipv6 => "[IP]",
            PiiKind::Phone => "[PHONE]",
            PiiKind::FilePath => "[PATH]",
            PiiKind::ApiKey => "[API_KEY]",
            PiiKind::Mention => "[USER]",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnonymizeResult {
    pub text: String,
    pub redactions: Vec<Redaction>,
}

impl AnonymizeResult {
    pub fn redaction_count(&self) -> usize {
        self.redactions.len()
    }
}

// URL_AUTH must run before EMAIL to avoid partial matches.
#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static URL_AUTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z][a-zA-Z0-9+.-]*://[^:\s]+:[^@\s]+@\S+").unwrap());

#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b").unwrap()
});

#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static IPV6_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b|\b(?:[0-9a-fA-F]{1,4}:){1,7}:\b|\b::(?:[0-9a-fA-F]{1,4}:){0,5}[0-9a-fA-F]{1,4}\b",
    )
    .unwrap()
});

// regex doesn't support look-around; the digit-boundary exclusion that the
// source expresses as `(?<!\d)...(?!\d)` is enforced as a post-match check
// against the surrounding bytes instead.
#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?[0-9]{1,3}[-.\s]?)?(?:\(?[0-9]{2,4}\)?[-.\s]?)[0-9]{3,4}[-.\s]?[0-9]{3,4}")
        .unwrap()
});

#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static FILE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:/(?:Users|home|root)/[A-Za-z0-9._-]+)(?:/[A-Za-z0-9._/-]*)?").unwrap()
});

#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:sk-[A-Za-z0-9]{20,}|ghp_[A-Za-z0-9]{20,}|xox[bpsar]-[A-Za-z0-9-]+|AIza[A-Za-z0-9_-]{35}|AKIA[A-Z0-9]{16})\b",
    )
    .unwrap()
});

#[allow(clippy::unwrap_used)] // pattern is a fixed literal, always valid
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@[A-Za-z0-9_]{2,32}(?:#[0-9]{4})?").unwrap());

fn patterns() -> [(PiiKind, &'static Regex); 8] {
    [
        (PiiKind::UrlAuth, &URL_AUTH_RE),
        (PiiKind::Email, &EMAIL_RE),
        (PiiKind::Ipv4, &IPV4_RE),
        (PiiKind::Ipv6, &IPV6_RE),
        (PiiKind::Phone, &PHONE_RE),
        (PiiKind::FilePath, &FILE_PATH_RE),
        (PiiKind::ApiKey, &API_KEY_RE),
        (PiiKind::Mention, &MENTION_RE),
    ]
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

fn is_loopback_ipv4(s: &str) -> bool {
    s.starts_with("127.") || s == "0.0.0.0"
}

fn boundary_is_digit(text: &str, idx: Option<usize>) -> bool {
    match idx {
        None => false,
        Some(i) => text[..i].chars().next_back().is_some_and(|c| c.is_ascii_digit()),
    }
}

fn next_boundary_is_digit(text: &str, idx: usize) -> bool {
    text[idx..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Redacts PII from `text`, applying each recognized pattern in priority
/// order over the progressively redacted string. Never fails.
pub fn anonymize(text: &str) -> AnonymizeResult {
    let mut redactions = Vec::new();
    let mut result = text.to_string();

    for (kind, pattern) in patterns() {
        let matches: Vec<_> = pattern.find_iter(&result).collect();
        if matches.is_empty() {
            continue;
        }

        for m in matches.into_iter().rev() {
            let original = m.as_str().to_string();

            if kind == PiiKind::Phone {
                let digits = digit_count(&original);
                if digits < 7 {
                    continue;
                }
                if boundary_is_digit(&result, Some(m.start())) || next_boundary_is_digit(&result, m.end()) {
                    continue;
                }
            }

            if kind == PiiKind::Ipv4 && is_loopback_ipv4(&original) {
                continue;
            }

            let replacement = kind.replacement();
            redactions.push(Redaction {
                kind,
                original,
                replacement,
                start: m.start(),
                end: m.end(),
            });
            result.replace_range(m.start()..m.end(), replacement);
        }
    }

    AnonymizeResult {
        text: result,
        redactions,
    }
}

pub fn anonymize_batch(texts: &[String]) -> Vec<AnonymizeResult> {
    texts.iter().map(|t| anonymize(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email() {
        let r = anonymize("contact me at jane.doe@example.com please");
        assert!(r.text.contains("[EMAIL]"));
        assert!(!r.text.contains("jane.doe@example.com"));
    }

    #[test]
    fn preserves_loopback_ipv4() {
        let r = anonymize("server running on 127.0.0.1 and 0.0.0.0");
        assert_eq!(r.text, "server running on 127.0.0.1 and 0.0.0.0");
        assert!(r.redactions.is_empty());
    }

    #[test]
    fn redacts_non_loopback_ipv4() {
        let r = anonymize("connect to 8.8.8.8 now");
        assert!(r.text.contains("[IP]"));
    }

    #[test]
    fn rejects_short_phone_candidates() {
        let r = anonymize("room 123-45");
        assert!(r.redactions.iter().all(|red| red.kind != PiiKind::Phone));
    }

    #[test]
    fn redacts_plausible_phone() {
        let r = anonymize("call me at 415-555-0182 ok");
        assert!(r.text.contains("[PHONE]"));
    }

    #[test]
    fn redacts_api_key() {
        let r = anonymize("key is sk-abcdefghijklmnopqrstuvwxyz1234");
        assert!(r.text.contains("[API_KEY]"));
    }

    #[test]
    fn redacts_discord_mention() {
        let r = anonymize("thanks @someone for the help");
        assert!(r.text.contains("[USER]"));
    }

    #[test]
    fn no_matches_returns_input_unchanged() {
        let r = anonymize("nothing sensitive here");
        assert_eq!(r.text, "nothing sensitive here");
        assert!(r.redactions.is_empty());
    }

    #[test]
    fn idempotent_on_second_pass() {
        let first = anonymize("email me jane@example.com or call 415-555-0182");
        let second = anonymize(&first.text);
        assert!(second.redactions.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_no_original_substring_survives(s in "[a-zA-Z0-9@. _-]{0,80}") {
            let r = anonymize(&s);
            for red in &r.redactions {
                proptest::prop_assert!(!r.text.contains(&red.original));
            }
        }
    }
}

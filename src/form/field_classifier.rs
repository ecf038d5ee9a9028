//! Field-level redaction: which individual inputs must never be stored or
//! restored, whatever the owning form looks like.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::form::form_model::{FieldElement, FieldKind, FieldValue};

/// Hidden values longer than this are candidates for the opaque-token rule.
pub const HIDDEN_TOKEN_MIN_LEN: usize = 20;

const SECURITY_DATA_ATTRS: [&str; 4] = ["csrf", "token", "security", "auth"];

/// What the rules get to see about a field.
///
/// Fields coming back from storage only carry a name and a value, so `kind`
/// and `data` are optional and rules that need them simply do not fire.
#[derive(Debug, Clone)]
pub struct FieldFacts<'a> {
    pub name: String,
    pub kind: Option<FieldKind>,
    pub value: &'a str,
    pub data: Option<&'a BTreeMap<String, String>>,
}

impl<'a> FieldFacts<'a> {
    pub fn of(el: &'a FieldElement, position: usize) -> Self {
        Self {
            name: el.resolved_name(position),
            kind: Some(el.kind()),
            value: &el.value,
            data: Some(&el.data),
        }
    }

    pub fn stored(name: &str, value: &'a FieldValue) -> Self {
        let value = match value {
            FieldValue::Text(s) => s.as_str(),
            FieldValue::Flag(_) => "",
        };
        Self {
            name: name.to_string(),
            kind: None,
            value,
            data: None,
        }
    }
}

pub struct FieldRule {
    pub name: &'static str,
    pub check: fn(&FieldFacts) -> bool,
}

/// Ordered; the first rule that fires wins.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        name: "password_kind",
        check: is_password_kind,
    },
    FieldRule {
        name: "security_name",
        check: has_security_name,
    },
    FieldRule {
        name: "opaque_hidden_token",
        check: is_opaque_hidden_token,
    },
    FieldRule {
        name: "security_data_attribute",
        check: has_security_data_attribute,
    },
];

fn security_name_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)csrf|xsrf",
            r"(?i)_token$",
            r"(?i)^authenticity_token$",
            r"(?i)session|nonce",
            r"(?i)security[_-]?token|verification[_-]?token",
            r"(?i)api[_-]?key|secret|private[_-]?key",
            r"(?i)password|passwd|pwd",
            r"(?i)\botp\b|(?:^|_)otp(?:$|_)",
            r"(?i)verification[_-]?code|verify[_-]?code|auth[_-]?code|captcha",
            r"^__",
            r"(?i)_id$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid security-name pattern"))
        .collect()
    })
}

/// Base64-like alphabet.
fn token_pattern() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"^[A-Za-z0-9+/=_-]+$").expect("valid token pattern"))
}

fn is_password_kind(facts: &FieldFacts) -> bool {
    facts.kind == Some(FieldKind::Password)
}

fn has_security_name(facts: &FieldFacts) -> bool {
    security_name_patterns()
        .iter()
        .any(|re| re.is_match(&facts.name))
}

fn is_opaque_hidden_token(facts: &FieldFacts) -> bool {
    facts.kind == Some(FieldKind::Hidden)
        && facts.value.chars().count() > HIDDEN_TOKEN_MIN_LEN
        && token_pattern().is_match(facts.value)
}

fn has_security_data_attribute(facts: &FieldFacts) -> bool {
    let Some(data) = facts.data else {
        return false;
    };

    if SECURITY_DATA_ATTRS.iter().any(|a| data.contains_key(*a)) {
        return true;
    }

    data.get("purpose")
        .map(|p| {
            let p = p.to_lowercase();
            SECURITY_DATA_ATTRS.iter().any(|a| p.contains(a))
        })
        .unwrap_or(false)
}

/// Name of the first exclusion rule that fires, if any.
pub fn classify_field(facts: &FieldFacts) -> Option<&'static str> {
    FIELD_RULES
        .iter()
        .find(|rule| (rule.check)(facts))
        .map(|rule| rule.name)
}

pub fn should_exclude(facts: &FieldFacts) -> bool {
    classify_field(facts).is_some()
}

/// Convenience for live elements.
pub fn should_exclude_element(el: &FieldElement, position: usize) -> bool {
    should_exclude(&FieldFacts::of(el, position))
}

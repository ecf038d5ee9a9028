use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::form::form_model::{FieldKind, FormElement};

/// Contextual text only counts for forms with at most this many inputs.
pub const CONTEXT_RULE_MAX_INPUTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormVerdict {
    pub authentication: bool,
    pub rule: Option<&'static str>,
}

pub struct FormRule {
    pub name: &'static str,
    pub check: fn(&FormElement) -> bool,
}

/// Priority order matters only for which rule gets reported.
pub const FORM_RULES: &[FormRule] = &[
    FormRule {
        name: "password_field",
        check: has_password_field,
    },
    FormRule {
        name: "form_attributes",
        check: attributes_mention_auth,
    },
    FormRule {
        name: "field_combination",
        check: fields_form_auth_combination,
    },
    FormRule {
        name: "button_label",
        check: buttons_mention_auth,
    },
    FormRule {
        name: "container_context",
        check: context_mentions_auth,
    },
    FormRule {
        name: "password_confirmation",
        check: has_multiple_password_fields,
    },
    FormRule {
        name: "email_registration",
        check: looks_like_email_registration,
    },
];

struct Patterns {
    attributes: Regex,
    combination: Regex,
    buttons: Regex,
    context: Regex,
    registration_fields: Regex,
}

/// Pattern literals are fixed, so a compile failure is a programming error.
fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        Patterns {
            attributes: Regex::new(
                r"(?i)log[-_ ]?in|log[-_ ]?on|sign[-_ ]?(?:in|up)|register|registration|signup|(?:^|[^a-z])auth(?:entication|enticate|orize)?(?:$|[^a-z])|create[-_]?account|new[-_]?account|rogin|touroku|kaiin|shinki",
            )
            .expect("valid form pattern"),
            combination: Regex::new(
                r"(?i)user[-_ ]?(?:name|id)?.*pass(?:word|wd)?|e-?mail.*(?:confirm|verify)|(?:confirm|verify).*e-?mail|first[-_ ]?name.*last[-_ ]?name|terms.*conditions",
            )
            .expect("valid form pattern"),
            buttons: Regex::new(
                r"(?i)\blog\s*in\b|\bsign\s*(?:in|up)\b|\bregister\b|create\s+(?:an\s+)?account|join\s+now|ログイン|サインイン|サインアップ|新規登録|会員登録|登録する",
            )
            .expect("valid form pattern"),
            context: Regex::new(
                r"(?i)sign\s*in|log\s*in|sign\s*up|create\s+(?:an\s+)?account|registration|forgot\s+(?:your\s+)?password|privacy\s+policy|terms\s+of\s+(?:service|use)|ログイン|会員登録|新規登録|プライバシーポリシー|利用規約",
            )
            .expect("valid form pattern"),
            registration_fields: Regex::new(
                r"(?i)confirm|agree|terms|consent|first[-_ ]?name|last[-_ ]?name|full[-_ ]?name|birth",
            )
            .expect("valid form pattern"),
        }
    })
}

fn has_password_field(form: &FormElement) -> bool {
    form.count_kind(FieldKind::Password) >= 1
}

fn attributes_mention_auth(form: &FormElement) -> bool {
    [&form.id, &form.class, &form.name, &form.action]
        .into_iter()
        .flatten()
        .any(|text| patterns().attributes.is_match(text))
}

/// Names, ids and placeholders of every input, space-joined.
fn field_text(form: &FormElement) -> String {
    let mut text = String::new();
    for (_, field) in form.eligible_fields() {
        for part in [&field.name, &field.id, &field.placeholder].into_iter().flatten() {
            text.push_str(part);
            text.push(' ');
        }
    }
    text
}

fn fields_form_auth_combination(form: &FormElement) -> bool {
    patterns().combination.is_match(&field_text(form))
}

fn buttons_mention_auth(form: &FormElement) -> bool {
    patterns().buttons.is_match(&form.buttons.join(" "))
}

fn context_mentions_auth(form: &FormElement) -> bool {
    form.eligible_fields().count() <= CONTEXT_RULE_MAX_INPUTS
        && form
            .container_text
            .as_deref()
            .is_some_and(|text| patterns().context.is_match(text))
}

fn has_multiple_password_fields(form: &FormElement) -> bool {
    form.count_kind(FieldKind::Password) >= 2
}

fn looks_like_email_registration(form: &FormElement) -> bool {
    let has_email = form.eligible_fields().any(|(_, f)| {
        f.kind() == FieldKind::Email
            || f.name
                .as_deref()
                .map(|n| n.to_lowercase().contains("email"))
                .unwrap_or(false)
    });

    has_email
        && form.eligible_fields().count() >= 3
        && patterns().registration_fields.is_match(&field_text(form))
}

pub fn classify_form(form: &FormElement) -> FormVerdict {
    let rule = FORM_RULES
        .iter()
        .find(|rule| (rule.check)(form))
        .map(|rule| rule.name);

    debug!(
        form_id = form.id.as_deref().unwrap_or(""),
        rule = rule.unwrap_or("none"),
        "form classified"
    );

    FormVerdict {
        authentication: rule.is_some(),
        rule,
    }
}

pub fn is_authentication_form(form: &FormElement) -> bool {
    classify_form(form).authentication
}

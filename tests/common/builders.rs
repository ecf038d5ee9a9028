use form_recall::form::form_model::{FieldElement, FormElement, PageSnapshot};

// ============================================================================
// Field builders
// ============================================================================

pub fn typed(input_type: &str, name: &str, value: &str) -> FieldElement {
    FieldElement {
        tag: "input".into(),
        r#type: Some(input_type.into()),
        name: Some(name.into()),
        value: value.into(),
        ..Default::default()
    }
}

pub fn text(name: &str, value: &str) -> FieldElement {
    typed("text", name, value)
}

pub fn email(name: &str, value: &str) -> FieldElement {
    typed("email", name, value)
}

pub fn password(name: &str, value: &str) -> FieldElement {
    typed("password", name, value)
}

pub fn hidden(name: &str, value: &str) -> FieldElement {
    typed("hidden", name, value)
}

pub fn textarea(name: &str, value: &str) -> FieldElement {
    FieldElement {
        tag: "textarea".into(),
        name: Some(name.into()),
        value: value.into(),
        ..Default::default()
    }
}

pub fn checkbox(name: &str, value: &str, checked: bool) -> FieldElement {
    FieldElement {
        checked,
        ..typed("checkbox", name, value)
    }
}

pub fn radio(name: &str, value: &str, checked: bool) -> FieldElement {
    FieldElement {
        checked,
        ..typed("radio", name, value)
    }
}

pub fn with_data(mut field: FieldElement, key: &str, value: &str) -> FieldElement {
    field.data.insert(key.into(), value.into());
    field
}

// ============================================================================
// Form / page builders
// ============================================================================

pub fn form(id: &str, fields: Vec<FieldElement>) -> FormElement {
    FormElement {
        id: Some(id.into()),
        fields,
        ..Default::default()
    }
}

pub fn login_form() -> FormElement {
    FormElement {
        id: Some("signin".into()),
        buttons: vec!["Sign In".into()],
        ..form(
            "signin",
            vec![text("username", "bob"), password("password", "hunter2")],
        )
    }
}

pub fn contact_form() -> FormElement {
    FormElement {
        buttons: vec!["Send message".into()],
        ..form(
            "contact",
            vec![
                text("name", "Ada"),
                email("email", "ada@example.com"),
                textarea("message", "Hello there"),
            ],
        )
    }
}

pub fn page(url: &str, forms: Vec<FormElement>) -> PageSnapshot {
    PageSnapshot {
        url: url.into(),
        forms,
    }
}

/// Form 0 is a login form, form 1 a contact form.
pub fn login_and_contact_page() -> PageSnapshot {
    page(
        "https://example.com/support?ref=nav",
        vec![login_form(), contact_form()],
    )
}

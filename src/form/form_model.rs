use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, Result};

/// A single input element as delivered by DOM discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldElement {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    /// `data-*` attributes, keyed without the `data-` prefix.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

fn default_tag() -> String {
    "input".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Email,
    TextArea,
    Select,
    Checkbox,
    Radio,
    Hidden,
    Password,
    File,
}

impl FieldElement {
    pub fn kind(&self) -> FieldKind {
        match self.tag.to_ascii_lowercase().as_str() {
            "textarea" => return FieldKind::TextArea,
            "select" => return FieldKind::Select,
            _ => {}
        }

        match self.r#type.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("password") => FieldKind::Password,
            Some("hidden") => FieldKind::Hidden,
            Some("checkbox") => FieldKind::Checkbox,
            Some("radio") => FieldKind::Radio,
            Some("file") => FieldKind::File,
            Some("email") => FieldKind::Email,
            // text, search, tel, url, number, date, ... and missing type
            _ => FieldKind::Text,
        }
    }

    /// Declared name, else element id, else `field_{position}`.
    pub fn resolved_name(&self, position: usize) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.id.as_deref().filter(|i| !i.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("field_{}", position))
    }
}

/// A `<form>` and everything the classifiers look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FormElement {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Visible text of the surrounding container.
    #[serde(default, rename = "containerText")]
    pub container_text: Option<String>,
    /// Button and submit labels.
    #[serde(default)]
    pub buttons: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldElement>,
}

impl FormElement {
    /// Inputs every component sees; file inputs are dropped here.
    pub fn eligible_fields(&self) -> impl Iterator<Item = (usize, &FieldElement)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind() != FieldKind::File)
    }

    pub fn count_kind(&self, kind: FieldKind) -> usize {
        self.fields.iter().filter(|f| f.kind() == kind).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub forms: Vec<FormElement>,
}

impl PageSnapshot {
    pub fn location(&self) -> Result<PageLocation> {
        PageLocation::parse(&self.url)
    }
}

/// Origin and path of the page, the stable part of every form key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageLocation {
    pub url: String,
    pub origin: String,
    pub path: String,
}

impl PageLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = url::Url::parse(raw).map_err(|source| RecallError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;

        Ok(PageLocation {
            url: raw.to_string(),
            origin: parsed.origin().ascii_serialization(),
            path: parsed.path().to_string(),
        })
    }

    pub fn record(&self, form_index: usize) -> FormRecord {
        FormRecord {
            origin: self.origin.clone(),
            path: self.path.clone(),
            form_index,
        }
    }
}

/// Identity of one form on one page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormRecord {
    pub origin: String,
    pub path: String,
    pub form_index: usize,
}

impl FormRecord {
    /// `{origin}{pathname}_form_{formIndex}`
    pub fn storage_key(&self) -> String {
        format!("{}{}_form_{}", self.origin, self.path, self.form_index)
    }
}

/// A stored value: text for text-like and radio fields, text or flag for checkboxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Flag(b) => b.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

pub type FieldMap = BTreeMap<String, FieldValue>;

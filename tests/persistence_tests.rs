mod common;

use common::builders::*;
use form_recall::form::form_model::{FieldMap, FieldValue};
use form_recall::persist::persistence::{PersistenceCoordinator, SaveOutcome, clean_fields, extract};
use form_recall::storage::entry::StoredEntry;
use form_recall::storage::store::{FormStore, MemoryStore};

const KEY: &str = "https://example.com/contact_form_0";
const URL: &str = "https://example.com/contact";

fn text_value(s: &str) -> FieldValue {
    FieldValue::Text(s.to_string())
}

fn coordinator() -> PersistenceCoordinator<MemoryStore> {
    PersistenceCoordinator::new(MemoryStore::unlimited())
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn password_never_extracted() {
    let f = form("o", vec![text("username", "bob"), password("password", "hunter2")]);
    let fields = extract(&f);

    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("username"), Some(&text_value("bob")));
}

#[test]
fn radio_group_records_checked_member() {
    let f = form(
        "o",
        vec![
            radio("plan", "free", false),
            radio("plan", "pro", true),
            radio("plan", "team", false),
        ],
    );
    let fields = extract(&f);

    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("plan"), Some(&text_value("pro")));
}

#[test]
fn excluded_radio_member_value_is_never_extracted() {
    let f = form(
        "o",
        vec![
            radio("plan", "free", false),
            with_data(radio("plan", "s3cr3t", true), "token", "1"),
        ],
    );
    assert!(!extract(&f).contains_key("plan"));
}

#[test]
fn clean_checked_member_survives_excluded_sibling() {
    let f = form(
        "o",
        vec![
            with_data(radio("plan", "internal", false), "auth", ""),
            radio("plan", "pro", true),
        ],
    );
    assert_eq!(extract(&f).get("plan"), Some(&text_value("pro")));
}

#[test]
fn unchecked_radio_group_is_absent() {
    let f = form("o", vec![radio("plan", "free", false), radio("plan", "pro", false)]);
    assert!(extract(&f).is_empty());
}

#[test]
fn checkbox_records_value_or_flag() {
    let f = form(
        "o",
        vec![
            checkbox("newsletter", "yes", true),
            checkbox("tos", "", true),
            checkbox("sms", "yes", false),
        ],
    );
    let fields = extract(&f);

    assert_eq!(fields.get("newsletter"), Some(&text_value("yes")));
    assert_eq!(fields.get("tos"), Some(&FieldValue::Flag(true)));
    assert!(!fields.contains_key("sms"));
}

#[test]
fn blank_and_security_values_are_dropped() {
    let f = form(
        "o",
        vec![
            text("company", "   "),
            hidden("csrf_token", "abc"),
            typed("file", "resume", "cv.pdf"),
            textarea("notes", "  keep my spacing "),
        ],
    );
    let fields = extract(&f);

    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("notes"), Some(&text_value("  keep my spacing ")));
}

#[test]
fn nameless_fields_use_position() {
    let mut anonymous = text("", "value");
    anonymous.name = None;
    let f = form("o", vec![text("a", "1"), anonymous]);

    assert!(extract(&f).contains_key("field_1"));
}

// ============================================================================
// Save
// ============================================================================

#[test]
fn save_writes_entry_with_url_and_count() {
    let mut p = coordinator();

    let outcome = p.save(&contact_form(), KEY, URL).unwrap();
    assert_eq!(outcome, SaveOutcome::Saved { field_count: 3 });

    let entry = p.store().get(KEY).unwrap().unwrap();
    assert_eq!(entry.url, URL);
    assert_eq!(entry.fields.get("name"), Some(&text_value("Ada")));
    assert!(entry.saved_at > 0);
}

#[test]
fn empty_extraction_is_skipped() {
    let mut p = coordinator();
    let f = form("o", vec![hidden("csrf_token", "abc"), text("q", "")]);

    assert_eq!(p.save(&f, KEY, URL).unwrap(), SaveOutcome::Skipped);
    assert!(p.store().is_empty());
}

#[test]
fn later_save_overwrites_earlier_one() {
    let mut p = coordinator();
    p.save(&form("o", vec![text("city", "Oslo")]), KEY, URL).unwrap();
    p.save(&form("o", vec![text("city", "Bergen")]), KEY, URL).unwrap();

    let entry = p.store().get(KEY).unwrap().unwrap();
    assert_eq!(entry.fields.get("city"), Some(&text_value("Bergen")));
    assert_eq!(p.store().len(), 1);
}

// ============================================================================
// Load and self-healing
// ============================================================================

fn entry_with(pairs: &[(&str, &str)]) -> StoredEntry {
    let fields: FieldMap = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), text_value(v)))
        .collect();
    StoredEntry::new(URL, fields).with_saved_at(1_700_000_000_000)
}

#[test]
fn security_only_entry_is_emptied_on_load() {
    let mut store = MemoryStore::unlimited();
    store.save(KEY, &entry_with(&[("csrf_token", "x")])).unwrap();
    let mut p = PersistenceCoordinator::new(store);

    let loaded = p.load(KEY).unwrap().unwrap();
    assert!(loaded.fields.is_empty());

    let rewritten = p.store().get(KEY).unwrap().unwrap();
    assert!(rewritten.fields.is_empty());
    assert_eq!(rewritten.saved_at, 1_700_000_000_000);
}

#[test]
fn mixed_entry_keeps_ordinary_fields() {
    let mut store = MemoryStore::unlimited();
    store
        .save(KEY, &entry_with(&[("city", "Oslo"), ("api_key", "k-123"), ("pwd", "x")]))
        .unwrap();
    let mut p = PersistenceCoordinator::new(store);

    let loaded = p.load(KEY).unwrap().unwrap();
    assert_eq!(loaded.fields.keys().collect::<Vec<_>>(), vec!["city"]);
}

#[test]
fn load_is_idempotent() {
    let mut store = MemoryStore::unlimited();
    store
        .save(KEY, &entry_with(&[("city", "Oslo"), ("session_id", "s")]))
        .unwrap();
    let mut p = PersistenceCoordinator::new(store);

    let first = p.load(KEY).unwrap();
    let second = p.load(KEY).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_key_loads_none() {
    let mut p = coordinator();
    assert_eq!(p.load("nope").unwrap(), None);
}

#[test]
fn clean_fields_drops_only_security_names() {
    let fields: FieldMap = [
        ("nonce".to_string(), text_value("n")),
        ("color".to_string(), text_value("blue")),
        ("remember".to_string(), FieldValue::Flag(true)),
    ]
    .into_iter()
    .collect();

    let cleaned = clean_fields(&fields);
    assert_eq!(cleaned.len(), 2);
    assert!(!cleaned.contains_key("nonce"));
}

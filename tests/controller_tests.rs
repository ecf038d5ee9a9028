mod common;

use std::time::{Duration, Instant};

use common::builders::*;
use form_recall::error::RecallError;
use form_recall::form::form_model::FieldValue;
use form_recall::page::controller::{BatchSave, PageController};
use form_recall::persist::persistence::SaveOutcome;
use form_recall::persist::restore::RestoreOutcome;
use form_recall::scenario::runner::ScenarioRunner;
use form_recall::scenario::scenario_model::Scenario;
use form_recall::storage::messaging::{BrokerClient, StorageBroker};
use form_recall::storage::store::{FormStore, MemoryStore, QuotaPolicy};
use form_recall::trace::logger::TraceLogger;
use form_recall::tracker::prompt::{PromptCall, PromptSignal, RecordingPrompt};
use form_recall::tracker::tracker_model::{SaveOffer, TrackerTimings};
use form_recall::{eligible_forms, preview_page};

const CONTACT_KEY: &str = "https://example.com/support_form_1";

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn controller() -> PageController<MemoryStore, RecordingPrompt> {
    PageController::new(login_and_contact_page(), MemoryStore::unlimited(), RecordingPrompt::new())
        .unwrap()
}

// ============================================================================
// Offer gating
// ============================================================================

#[test]
fn login_form_is_never_offered() {
    let start = Instant::now();
    let mut c = controller();

    c.on_input(0, start).unwrap();
    c.poll(start + ms(2000));
    c.on_submit(0, start + ms(2100)).unwrap();

    assert_eq!(c.tracker().offer(), SaveOffer::Pending);
    assert_eq!(c.tracker().prompt().show_count(), 0);
}

#[test]
fn contact_form_offered_saved_and_restored() {
    let start = Instant::now();
    let mut c = controller();

    c.on_input(1, start).unwrap();
    c.poll(start + ms(2000));
    assert_eq!(c.tracker().prompt().calls, vec![PromptCall::Show(1)]);

    let outcome = c
        .on_signal(PromptSignal::SaveForm { form_index: 1 }, start + ms(2500))
        .unwrap();
    assert_eq!(outcome, Some(SaveOutcome::Saved { field_count: 3 }));

    c.poll(start + ms(3500));
    assert_eq!(c.tracker().offer(), SaveOffer::None);

    let keys: Vec<String> = c.store().get_all().unwrap().into_keys().collect();
    assert_eq!(keys, vec![CONTACT_KEY.to_string()]);

    // next visit
    let (_, _, store) = c.into_parts();
    let mut fresh = login_and_contact_page();
    for field in &mut fresh.forms[1].fields {
        field.value.clear();
    }
    let mut next = PageController::new(fresh, store, RecordingPrompt::new()).unwrap();
    let (reports, notifications) = next.restore();

    assert_eq!(reports[0].outcome, RestoreOutcome::SkippedAuthentication);
    assert_eq!(reports[1].outcome, RestoreOutcome::Restored { applied: 3 });
    assert_eq!(notifications.len(), 6);
    assert_eq!(next.forms()[1].fields[2].value, "Hello there");
}

#[test]
fn failed_write_shows_error_and_returns_err() {
    let start = Instant::now();
    let store = MemoryStore::new(QuotaPolicy::with_quota(10));
    let mut c =
        PageController::new(login_and_contact_page(), store, RecordingPrompt::new()).unwrap();

    c.on_input(1, start).unwrap();
    c.poll(start + ms(2000));
    let result = c.on_signal(PromptSignal::SaveForm { form_index: 1 }, start + ms(2100));

    assert!(matches!(result, Err(RecallError::QuotaExceeded { .. })));
    assert_eq!(c.tracker().prompt().calls.last(), Some(&PromptCall::Error));

    c.poll(start + ms(4100));
    assert_eq!(c.tracker().prompt().calls.last(), Some(&PromptCall::Reset));
    assert_eq!(c.tracker().offer(), SaveOffer::Shown);
}

#[test]
fn invalidated_context_fails_the_save() {
    let start = Instant::now();
    let client = BrokerClient::new(StorageBroker::new(MemoryStore::unlimited()));
    client.with_transport(|broker| broker.invalidate());
    let mut c = PageController::new(login_and_contact_page(), client, RecordingPrompt::new()).unwrap();

    c.on_input(1, start).unwrap();
    c.on_submit(1, start + ms(5)).unwrap();
    let result = c.on_signal(PromptSignal::SaveForm { form_index: 1 }, start + ms(10));

    assert!(matches!(result, Err(RecallError::ContextInvalidated)));
}

#[test]
fn unknown_form_index_is_rejected() {
    let mut c = controller();
    assert!(matches!(
        c.on_input(7, Instant::now()),
        Err(RecallError::UnknownForm(7))
    ));
}

#[test]
fn invalid_page_url_is_rejected() {
    let result = PageController::new(page("not a url", vec![]), MemoryStore::unlimited(), RecordingPrompt::new());
    assert!(matches!(result, Err(RecallError::InvalidUrl { .. })));
}

// ============================================================================
// Form set changes and batch operations
// ============================================================================

#[test]
fn forms_changed_replaces_the_set() {
    let start = Instant::now();
    let mut c = controller();

    c.on_forms_changed(vec![contact_form()]);
    assert_eq!(c.forms().len(), 1);

    c.on_input(0, start).unwrap();
    c.poll(start + ms(2000));
    assert_eq!(c.tracker().prompt().calls, vec![PromptCall::Show(0)]);
    assert!(c.on_input(1, start).is_err());
}

#[test]
fn save_all_skips_authentication_forms() {
    let mut c = controller();
    let results = c.save_all();

    assert_eq!(results[0], (0, BatchSave::SkippedAuthentication));
    assert_eq!(results[1], (1, BatchSave::Saved { field_count: 3 }));
    assert_eq!(c.store().len(), 1);
}

#[test]
fn preview_lists_eligible_forms_only() {
    let page = login_and_contact_page();
    assert_eq!(eligible_forms(&page), vec![1]);

    let preview = preview_page(&page).unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0].0, CONTACT_KEY);
    assert_eq!(
        preview[0].1.get("email"),
        Some(&FieldValue::Text("ada@example.com".into()))
    );
}

// ============================================================================
// Scenario replay
// ============================================================================

const CHECKOUT_SCENARIO: &str = r#"
name: newsletter signup remembered
page:
  url: https://shop.example/checkout
  forms:
    - id: shipping
      buttons: ["Continue"]
      fields:
        - { type: text, name: street }
        - { type: radio, name: speed, value: standard, checked: true }
        - { type: radio, name: speed, value: express }
        - { type: checkbox, name: newsletter, value: "yes" }
        - { type: hidden, name: csrf_token, value: abc }
steps:
  - { action: input, form: 0, field: street, value: "1 Main St" }
  - { action: input, form: 0, field: speed, value: express }
  - { action: input, form: 0, field: newsletter, checked: true }
  - { action: wait, duration_ms: 1999 }
  - { action: wait, duration_ms: 1 }
  - action: save
  - { action: wait, duration_ms: 1000 }
"#;

#[test]
fn replay_saves_once_and_resolves() {
    let scenario: Scenario = serde_yaml::from_str(CHECKOUT_SCENARIO).unwrap();
    let (result, store) = ScenarioRunner::run(
        &scenario,
        MemoryStore::unlimited(),
        TrackerTimings::default(),
        TraceLogger::disabled(),
    )
    .unwrap();

    assert!(result.error.is_none());
    assert_eq!(result.steps_run, 7);
    assert_eq!(result.offer, SaveOffer::None);
    assert_eq!(result.saves.len(), 1);
    assert_eq!(result.saves[0].saved_fields, Some(3));
    assert_eq!(
        result.prompt_calls,
        vec![
            PromptCall::Show(0),
            PromptCall::Saving,
            PromptCall::Success,
            PromptCall::Hide
        ]
    );

    let entry = store
        .get("https://shop.example/checkout_form_0")
        .unwrap()
        .unwrap();
    assert_eq!(entry.fields.get("speed"), Some(&FieldValue::Text("express".into())));
    assert_eq!(entry.fields.get("newsletter"), Some(&FieldValue::Text("yes".into())));
    assert!(!entry.fields.contains_key("csrf_token"));

    assert_eq!(result.trace.offers_shown, 1);
    assert!(result.trace.events >= 5);
    assert!(result.trace.suppressions.is_empty());
}

#[test]
fn replay_tallies_suppressed_login_offer() {
    let yaml = r#"
name: login stays quiet
page:
  url: https://example.com/login
  forms:
    - id: signin
      buttons: ["Sign In"]
      fields:
        - { type: text, name: username }
        - { type: password, name: password }
steps:
  - { action: input, form: 0, field: username, value: bob }
  - { action: wait, duration_ms: 2000 }
"#;
    let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
    let (result, _) = ScenarioRunner::run(
        &scenario,
        MemoryStore::unlimited(),
        TrackerTimings::default(),
        TraceLogger::disabled(),
    )
    .unwrap();

    assert!(result.prompt_calls.is_empty());
    assert_eq!(result.trace.offers_shown, 0);
    assert_eq!(result.trace.suppressions.get("authentication_form"), Some(&1));
}

#[test]
fn replay_stops_at_unknown_field() {
    let yaml = r#"
name: typo
page:
  url: https://shop.example/
  forms:
    - fields: [{ type: text, name: street }]
steps:
  - { action: input, form: 0, field: stret, value: x }
  - { action: wait, duration_ms: 5000 }
"#;
    let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
    let (result, _) = ScenarioRunner::run(
        &scenario,
        MemoryStore::unlimited(),
        TrackerTimings::default(),
        TraceLogger::disabled(),
    )
    .unwrap();

    assert_eq!(result.steps_run, 1);
    assert!(result.error.unwrap().contains("stret"));
}

#[test]
fn replay_writes_jsonl_trace() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("trace.jsonl");
    let scenario: Scenario = serde_yaml::from_str(CHECKOUT_SCENARIO).unwrap();

    ScenarioRunner::run(
        &scenario,
        MemoryStore::unlimited(),
        TrackerTimings::default(),
        TraceLogger::new(trace_path.to_str().unwrap()),
    )
    .unwrap();

    let content = std::fs::read_to_string(&trace_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines.len() >= 5);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["event"], "input");
    assert_eq!(first["step"], 0);
}

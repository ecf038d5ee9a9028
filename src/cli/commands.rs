use crate::cli::config::{AppConfig, resolve_fallback_path};
use crate::error::{RecallError, Result};
use crate::form::field_classifier::{FieldFacts, classify_field};
use crate::form::form_classifier::classify_form;
use crate::form::form_model::{FieldKind, PageSnapshot};
use crate::page::controller::{BatchSave, PageController};
use crate::scenario::runner::ScenarioRunner;
use crate::scenario::scenario_model::Scenario;
use crate::storage::file_store::JsonFileStore;
use crate::storage::messaging::{BrokerClient, StorageBroker};
use crate::storage::store::{FormStore, QuotaPolicy};
use crate::storage::tiered::TieredStore;
use crate::trace::logger::TraceLogger;
use crate::tracker::prompt::RecordingPrompt;

/// The store every command talks to: page-side client, broker, quota-limited
/// file tier with an unlimited file fallback.
pub type CliStore = BrokerClient<StorageBroker<TieredStore<JsonFileStore, JsonFileStore>>>;

pub fn open_store(store_path: &str, config: &AppConfig) -> Result<CliStore> {
    let primary = JsonFileStore::open(store_path, config.storage.quota)?;
    let fallback = JsonFileStore::open(
        resolve_fallback_path(store_path, config),
        QuotaPolicy::unlimited(),
    )?;
    let tiered = TieredStore::new(primary, fallback);
    Ok(BrokerClient::new(StorageBroker::new(tiered)))
}

pub fn load_page(path: &str) -> Result<PageSnapshot> {
    let content =
        std::fs::read_to_string(path).map_err(|e| RecallError::io(format!("reading {}", path), e))?;
    serde_json::from_str(&content).map_err(|e| RecallError::json(format!("parsing {}", path), e))
}

// ============================================================================
// classify subcommand
// ============================================================================

pub fn format_classification(page: &PageSnapshot) -> String {
    let mut out = String::new();

    for (index, form) in page.forms.iter().enumerate() {
        let verdict = classify_form(form);
        let label = form
            .id
            .as_deref()
            .or(form.name.as_deref())
            .unwrap_or("<anonymous>");

        match verdict.rule {
            Some(rule) => out.push_str(&format!("[{}] {}: authentication ({})\n", index, label, rule)),
            None => out.push_str(&format!("[{}] {}: eligible\n", index, label)),
        }

        for (position, field) in form.fields.iter().enumerate() {
            let facts = FieldFacts::of(field, position);
            let status = if field.kind() == FieldKind::File {
                "ignored (file)".to_string()
            } else {
                match classify_field(&facts) {
                    Some(rule) => format!("excluded ({})", rule),
                    None => "keep".to_string(),
                }
            };
            out.push_str(&format!("    - {}: {}\n", facts.name, status));
        }
    }

    out
}

pub fn cmd_classify(page_path: &str) -> Result<()> {
    let page = load_page(page_path)?;
    print!("{}", format_classification(&page));
    Ok(())
}

// ============================================================================
// save / restore subcommands
// ============================================================================

pub fn cmd_save(page_path: &str, store_path: &str, config: &AppConfig) -> Result<()> {
    let page = load_page(page_path)?;
    let store = open_store(store_path, config)?;
    let mut controller =
        PageController::with_timings(page, store, RecordingPrompt::new(), config.timing)?;

    for (index, outcome) in controller.save_all() {
        let key = controller.storage_key(index);
        match outcome {
            BatchSave::Saved { field_count } => println!("[{}] saved {} fields to {}", index, field_count, key),
            BatchSave::Skipped => println!("[{}] nothing to save", index),
            BatchSave::SkippedAuthentication => println!("[{}] skipped (authentication form)", index),
            BatchSave::Failed { error } => eprintln!("[{}] save failed: {}", index, error),
        }
    }
    Ok(())
}

pub fn cmd_restore(
    page_path: &str,
    output: Option<&str>,
    store_path: &str,
    config: &AppConfig,
) -> Result<()> {
    let page = load_page(page_path)?;
    let url = page.url.clone();
    let store = open_store(store_path, config)?;
    let mut controller =
        PageController::with_timings(page, store, RecordingPrompt::new(), config.timing)?;

    let (reports, notifications) = controller.restore();
    for report in &reports {
        eprintln!("[{}] {:?}", report.form_index, report.outcome);
    }
    for n in &notifications {
        eprintln!("[{}] {} <- {:?}", n.form_index, n.field, n.event);
    }

    let restored = PageSnapshot {
        url,
        forms: controller.forms().to_vec(),
    };
    let json = serde_json::to_string_pretty(&restored)
        .map_err(|e| RecallError::json("serializing restored page", e))?;

    match output {
        Some(path) => {
            std::fs::write(path, &json).map_err(|e| RecallError::io(format!("writing {}", path), e))?
        }
        None => println!("{}", json),
    }
    Ok(())
}

// ============================================================================
// entries subcommand
// ============================================================================

pub fn cmd_entries_list(store_path: &str, config: &AppConfig) -> Result<()> {
    let store = open_store(store_path, config)?;
    let entries = store.get_all()?;
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| RecallError::json("serializing entries", e))?;
    println!("{}", json);
    Ok(())
}

pub fn cmd_entries_delete(key: &str, store_path: &str, config: &AppConfig) -> Result<()> {
    let mut store = open_store(store_path, config)?;
    store.delete(key)?;
    println!("deleted {}", key);
    Ok(())
}

pub fn cmd_entries_clear(store_path: &str, config: &AppConfig) -> Result<()> {
    let store = open_store(store_path, config)?;
    let removed = store.clear_all()?;
    println!("cleared {} entries", removed);
    Ok(())
}

// ============================================================================
// replay subcommand
// ============================================================================

pub fn load_scenario(path: &str) -> Result<Scenario> {
    let content =
        std::fs::read_to_string(path).map_err(|e| RecallError::io(format!("reading {}", path), e))?;
    serde_yaml::from_str(&content).map_err(|e| RecallError::yaml(format!("parsing {}", path), e))
}

/// Returns whether the scenario ran to completion.
pub fn cmd_replay(scenario_path: &str, store_path: &str, config: &AppConfig) -> Result<bool> {
    let scenario = load_scenario(scenario_path)?;
    let store = open_store(store_path, config)?;
    let (result, _) = ScenarioRunner::run(
        &scenario,
        store,
        config.timing,
        TraceLogger::from_path(config.trace.path.as_deref()),
    )?;

    let yaml = serde_yaml::to_string(&result).map_err(|e| RecallError::yaml("serializing result", e))?;
    print!("{}", yaml);
    Ok(result.error.is_none())
}

use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::Mutex,
};

use serde::Serialize;
use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Running totals over every event the tracker reported, file or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceTally {
    pub events: usize,
    pub offers_shown: usize,
    /// Suppression reason -> count (`prompt_visible`, `authentication_form`, ...)
    pub suppressions: BTreeMap<String, usize>,
}

impl TraceTally {
    fn record(&mut self, event: &TraceEvent) {
        self.events += 1;
        if event.decision.as_deref() == Some("offered") {
            self.offers_shown += 1;
        }
        if let Some(reason) = &event.suppression_reason {
            *self.suppressions.entry(reason.clone()).or_default() += 1;
        }
    }
}

/// Sink for tracker decisions: a tally always, plus one JSON line per
/// event when a trace file is configured.
pub struct TraceLogger {
    file: Option<Mutex<File>>,
    tally: Mutex<TraceTally>,
}

impl TraceLogger {
    /// Append to `path`. An unopenable file degrades to tally-only.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(Mutex::new(f)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open trace file");
                None
            }
        };

        Self {
            file,
            tally: Mutex::new(TraceTally::default()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            file: None,
            tally: Mutex::new(TraceTally::default()),
        }
    }

    /// From the optional `trace.path` config value.
    pub fn from_path(path: Option<&str>) -> Self {
        path.map_or_else(Self::disabled, Self::new)
    }

    pub fn tally(&self) -> TraceTally {
        match self.tally.lock() {
            Ok(tally) => tally.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn log(&self, event: &TraceEvent) {
        match self.tally.lock() {
            Ok(mut tally) => tally.record(event),
            Err(poisoned) => poisoned.into_inner().record(event),
        }

        let Some(file) = &self.file else {
            return;
        };

        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "failed to serialize trace event");
                return;
            }
        };

        let mut file = match file.lock() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "trace file lock poisoned");
                return;
            }
        };

        if let Err(e) = writeln!(file, "{}", json) {
            warn!(error = %e, "failed to write trace event");
        }
    }
}

impl Default for TraceLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::tracker_model::TrackerState;

    #[test]
    fn tally_counts_offers_and_suppressions() {
        let logger = TraceLogger::disabled();
        let state = TrackerState::Idle;

        logger.log(&TraceEvent::now(0, &state, "debounce_fired").with_decision("offered"));
        logger.log(
            &TraceEvent::now(1, &state, "input")
                .with_decision("ignored")
                .with_suppression("prompt_visible"),
        );
        logger.log(
            &TraceEvent::now(2, &state, "input")
                .with_decision("ignored")
                .with_suppression("prompt_visible"),
        );

        let tally = logger.tally();
        assert_eq!(tally.events, 3);
        assert_eq!(tally.offers_shown, 1);
        assert_eq!(tally.suppressions.get("prompt_visible"), Some(&2));
    }
}

//! Anomaly accounting and the optional diagnostic sink.
//!
//! Every decode step may report `(position, label, summary)` to a [`DiagnosticSink`]. Reports are
//! advisory: nothing in the decoder reads them back to make a decision.
//!
//! [`Diagnostics`] additionally counts anomalies per [`AnomalyKind`]. The first anomaly of each
//! kind is logged at `warn` level and later ones at `debug`, so a badly damaged file does not
//! flood the log.

use std::fmt;
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use log::{Level, debug, log_enabled, trace, warn};
use serde::Serialize;

use crate::utils::hexdump_around;

/// Classes of recoverable decode problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AnomalyKind {
    /// A read would have crossed the active declared boundary.
    Bounds,
    /// An unrecognized field tag, layout or family fingerprint.
    UnknownTag,
    /// Declared sizes or kinds disagree with what a reference points at.
    StructuralMismatch,
    /// A parent/child relation loops back on itself.
    Cycle,
    /// A value that is expected to be constant was not.
    Plausibility,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnomalyKind::Bounds => "bounds",
            AnomalyKind::UnknownTag => "unknown tag",
            AnomalyKind::StructuralMismatch => "structural mismatch",
            AnomalyKind::Cycle => "cycle",
            AnomalyKind::Plausibility => "plausibility",
        };
        f.write_str(name)
    }
}

pub trait DiagnosticSink: Send {
    fn record(&mut self, position: u64, label: &str, summary: &str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&mut self, _position: u64, _label: &str, _summary: &str) {}
}

/// Forwards every report to `log::trace!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceSink;

impl DiagnosticSink for TraceSink {
    fn record(&mut self, position: u64, label: &str, summary: &str) {
        trace!("{position:#x} [{label}] {summary}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticEntry {
    pub position: u64,
    pub label: String,
    pub summary: String,
}

/// Keeps every report in memory. Clones share the same storage, so keep one clone around to
/// read the entries back after handing the other to [`Diagnostics::with_sink`].
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    entries: Arc<Mutex<Vec<DiagnosticEntry>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink::default()
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&mut self, position: u64, label: &str, summary: &str) {
        let entry = DiagnosticEntry {
            position,
            label: label.to_owned(),
            summary: summary.to_owned(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[derive(Default)]
pub struct Diagnostics {
    counts: HashMap<AnomalyKind, usize>,
    sink: Option<Box<dyn DiagnosticSink>>,
    /// Entries held back for replay by [`Diagnostics::merge`] (detached workers only).
    pending: Option<Vec<DiagnosticEntry>>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("counts", &self.counts)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn with_sink(sink: Box<dyn DiagnosticSink>) -> Self {
        Diagnostics {
            counts: HashMap::new(),
            sink: Some(sink),
            pending: None,
        }
    }

    /// Number of anomalies of `kind` seen so far.
    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn emit(&mut self, position: u64, label: &str, summary: &str) {
        if let Some(sink) = self.sink.as_mut() {
            sink.record(position, label, summary);
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.push(DiagnosticEntry {
                position,
                label: label.to_owned(),
                summary: summary.to_owned(),
            });
        }
    }

    fn wants_entries(&self) -> bool {
        self.sink.is_some() || self.pending.is_some()
    }

    /// Reports an ordinary decode step. Only the sink sees it.
    pub fn note(&mut self, position: u64, label: &str, summary: impl fmt::Display) {
        if self.wants_entries() {
            self.emit(position, label, &summary.to_string());
        }
    }

    /// Reports a recoverable anomaly.
    pub fn anomaly(
        &mut self,
        kind: AnomalyKind,
        position: u64,
        label: &str,
        summary: impl fmt::Display,
    ) {
        let count = self.counts.entry(kind).or_insert(0);
        *count += 1;

        let summary = summary.to_string();
        if *count == 1 {
            warn!("{position:#x} [{label}] {kind}: {summary}");
        } else {
            debug!("{position:#x} [{label}] {kind}: {summary}");
        }

        if self.wants_entries() {
            self.emit(position, label, &format!("{kind}: {summary}"));
        }
    }

    /// Like [`Diagnostics::anomaly`], and also dumps the surrounding bytes at `debug` level.
    pub(crate) fn anomaly_in(
        &mut self,
        kind: AnomalyKind,
        data: &[u8],
        position: usize,
        label: &str,
        summary: impl fmt::Display,
    ) {
        self.anomaly(kind, position as u64, label, summary);
        if log_enabled!(Level::Debug) {
            debug!("{}", hexdump_around(data, position, 32));
        }
    }

    /// A fresh `Diagnostics` for a worker thread. If this one has a sink, the worker holds its
    /// entries back so [`Diagnostics::merge`] can replay them in order.
    pub fn detached(&self) -> Diagnostics {
        Diagnostics {
            counts: HashMap::new(),
            sink: None,
            pending: self.wants_entries().then(Vec::new),
        }
    }

    /// Folds a worker's counters into this one and replays its held-back entries.
    pub fn merge(&mut self, other: Diagnostics) {
        for (kind, n) in other.counts {
            *self.counts.entry(kind).or_insert(0) += n;
        }
        for e in other.pending.unwrap_or_default() {
            self.emit(e.position, &e.label, &e.summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_anomalies_per_kind() {
        let mut diag = Diagnostics::new();
        diag.anomaly(AnomalyKind::Bounds, 1, "field", "short");
        diag.anomaly(AnomalyKind::Bounds, 2, "field", "short");
        diag.anomaly(AnomalyKind::Cycle, 3, "style", "loop");
        diag.note(4, "field", "ok");

        assert_eq!(diag.count(AnomalyKind::Bounds), 2);
        assert_eq!(diag.count(AnomalyKind::Cycle), 1);
        assert_eq!(diag.count(AnomalyKind::UnknownTag), 0);
        assert_eq!(diag.total(), 3);
    }

    #[test]
    fn test_sink_sees_notes_and_anomalies() {
        let sink = CollectingSink::new();
        let mut diag = Diagnostics::with_sink(Box::new(sink.clone()));
        diag.note(8, "link", "decoded");
        diag.anomaly(AnomalyKind::UnknownTag, 9, "field", "tag 0x1234");

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "link");
        assert_eq!(entries[1].summary, "unknown tag: tag 0x1234");
    }

    #[test]
    fn test_merge_detached_worker() {
        let sink = CollectingSink::new();
        let mut diag = Diagnostics::with_sink(Box::new(sink.clone()));
        let mut worker = diag.detached();
        worker.anomaly(AnomalyKind::StructuralMismatch, 1, "resolver", "bad shape");
        assert!(sink.entries().is_empty());

        diag.merge(worker);

        assert_eq!(diag.count(AnomalyKind::StructuralMismatch), 1);
        assert_eq!(sink.entries().len(), 1);
        assert_eq!(sink.entries()[0].summary, "structural mismatch: bad shape");
    }
}

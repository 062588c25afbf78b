//! Materializes the run's buffers into the three consolidated artifacts.
//!
//! Each artifact is a CSV whose leading `sheet` column names the logical
//! table a row belongs to. Files are named by the local date of the
//! export; the n-th export of one run (n >= 2) gets an `_n` suffix so
//! earlier sets from the same run are never replaced.

pub mod price;
pub mod quote;
pub mod summary;
pub mod writer;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Instant;

use chrono::{DateTime, Local};
use corelib::{InstrumentId, InstrumentRegistry, Sample};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::ExportWriteError;
use crate::state::RunState;
use crate::time::date_key;

pub use price::read_price_history;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    PriceHistory,
    QuoteHistory,
    DailySummary,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::PriceHistory,
        ArtifactKind::QuoteHistory,
        ArtifactKind::DailySummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::PriceHistory => "price_history",
            ArtifactKind::QuoteHistory => "quote_history",
            ArtifactKind::DailySummary => "daily_summary",
        }
    }

    fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::PriceHistory => "PRICE_HISTORY_CONSOLIDATED",
            ArtifactKind::QuoteHistory => "QUOTE_HISTORY_CONSOLIDATED",
            ArtifactKind::DailySummary => "DAILY_SUMMARY",
        }
    }

    /// `<STEM>_<YYYYMMDD>[_n].csv`
    pub fn file_name(&self, date: &str, invocation: u32) -> String {
        if invocation > 1 {
            format!("{}_{date}_{invocation}.csv", self.stem())
        } else {
            format!("{}_{date}.csv", self.stem())
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one export produced. Artifacts with no rows are skipped, not failed.
#[derive(Debug, Default)]
pub struct ExportResult {
    pub written: Vec<(ArtifactKind, PathBuf)>,
    pub skipped: Vec<ArtifactKind>,
    pub failures: Vec<(ArtifactKind, ExportWriteError)>,
}

impl ExportResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn path(&self, kind: ArtifactKind) -> Option<&Path> {
        self.written
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.as_path())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.written.iter().map(|(_, p)| p.as_path())
    }

    /// Every artifact failed because the export never ran to completion.
    pub fn aborted(dir: &Path, reason: &str) -> Self {
        let failures = ArtifactKind::ALL
            .iter()
            .map(|kind| {
                let e = ExportWriteError::Io {
                    path: dir.to_path_buf(),
                    source: std::io::Error::other(reason.to_owned()),
                };
                (*kind, e)
            })
            .collect();
        Self {
            failures,
            ..Self::default()
        }
    }
}

pub struct Exporter {
    dir: PathBuf,
    /// Exports so far in this run. Held for the whole export, which keeps
    /// a single writer per artifact path.
    invocations: Mutex<u32>,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            invocations: Mutex::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn export(&self, state: &RunState, registry: &InstrumentRegistry) -> ExportResult {
        self.export_at(state, registry, Local::now())
    }

    /// Export named by the date of `now`.
    pub fn export_at(
        &self,
        state: &RunState,
        registry: &InstrumentRegistry,
        now: DateTime<Local>,
    ) -> ExportResult {
        let mut invocations = self.invocations.lock();
        *invocations += 1;
        let invocation = *invocations;

        let started = Instant::now();
        let date = date_key(&now);
        let snapshot = state.snapshot_all();

        let dir_error = fs::create_dir_all(&self.dir).err();
        if let Some(e) = &dir_error {
            error!(dir = %self.dir.display(), error = %e, "cannot create output directory");
        }

        let mut out = ExportResult::default();
        for kind in ArtifactKind::ALL {
            let path = self.dir.join(kind.file_name(&date, invocation));
            let written = match kind {
                ArtifactKind::PriceHistory => {
                    emit(&path, &price::rows(&snapshot, registry), dir_error.as_ref())
                }
                ArtifactKind::QuoteHistory => {
                    emit(&path, &quote::rows(&snapshot, registry), dir_error.as_ref())
                }
                ArtifactKind::DailySummary => {
                    emit(&path, &summary::rows(&snapshot, registry), dir_error.as_ref())
                }
            };

            match written {
                Ok(0) => {
                    info!(artifact = %kind, "no rows; artifact skipped");
                    out.skipped.push(kind);
                }
                Ok(rows) => {
                    info!(artifact = %kind, path = %path.display(), rows, "artifact written");
                    out.written.push((kind, path));
                }
                Err(e) => {
                    error!(artifact = %kind, error = %e, "artifact write failed");
                    out.failures.push((kind, e));
                }
            }
        }

        let counters = state.counters();
        counters.exports.fetch_add(1, Ordering::Relaxed);
        counters
            .export_failures
            .fetch_add(out.failures.len() as u64, Ordering::Relaxed);

        let elapsed = started.elapsed();
        if !out.is_complete() {
            warn!(failed = out.failures.len(), "export finished with failures");
        }
        info!(
            invocation,
            written = out.written.len(),
            skipped = out.skipped.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "export complete"
        );

        out
    }
}

fn emit<R: Serialize>(
    path: &Path,
    rows: &[R],
    dir_error: Option<&io::Error>,
) -> Result<usize, ExportWriteError> {
    if rows.is_empty() {
        return Ok(0);
    }
    if let Some(e) = dir_error {
        return Err(ExportWriteError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(e.kind(), e.to_string()),
        });
    }
    writer::write_atomic(path, rows)?;
    Ok(rows.len())
}

/// Sheet order: registry declaration order, then anything sampled but not
/// registered, by id.
pub(crate) fn sheet_order<'a>(
    snapshot: &'a BTreeMap<InstrumentId, Vec<Sample>>,
    registry: &InstrumentRegistry,
) -> Vec<&'a InstrumentId> {
    let mut ids: Vec<&InstrumentId> = registry
        .iter()
        .filter_map(|i| snapshot.get_key_value(&i.id).map(|(k, _)| k))
        .collect();

    ids.extend(snapshot.keys().filter(|id| registry.get(id).is_none()));
    ids
}

//! Persistence — the store's single JSON document, written behind.
//!
//! RULE: Only the persistence manager writes the document, and only from
//! `pump()` / `flush()` / `write_now()`. Everything else reads it once, at
//! load time.
//!
//! RULE: Write failures never escape. They are logged, the manager flips to
//! memory-only mode, and the next mutation schedules another attempt.
//!
//! Mutations call `schedule(now)`, which marks the state dirty and pushes
//! the deadline out by the debounce window. A burst of mutations inside the
//! window therefore produces one write carrying the final state.

use crate::error::{StoreError, StoreResult};
use crate::model::{
    BookedCruise, CalendarEvent, CasinoAnalytics, CasinoOffer, CasinoPerformance, Certificate, Cruise,
    FinancialsRecord, UserProfile,
};
use crate::store::StoreState;
use crate::types::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Schema tag written into every document.
pub const DOCUMENT_VERSION: u32 = 1;

// ── Sinks ──────────────────────────────────────────────────────────

/// Where the document lives. A sink reads the whole document or overwrites
/// it; it never interprets the contents.
pub trait DocumentSink: Send {
    /// The stored document, or None when nothing has been written yet.
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&mut self, document: &str) -> io::Result<()>;
    fn describe(&self) -> String;
}

/// Document on the local filesystem. Writes go to a sibling temp file and
/// are renamed over the target.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSink for FileSink {
    fn read(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, document: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, document)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
struct MemoryDocument {
    document:    Option<String>,
    writes:      usize,
    fail_writes: bool,
}

/// In-process sink. Clones share the same document, so a test can keep a
/// handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        let sink = Self::default();
        sink.lock().document = Some(document.into());
        sink
    }

    fn lock(&self) -> MutexGuard<'_, MemoryDocument> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn document(&self) -> Option<String> {
        self.lock().document.clone()
    }

    /// Make every subsequent write fail with PermissionDenied.
    pub fn set_failing(&self, failing: bool) {
        self.lock().fail_writes = failing;
    }
}

impl DocumentSink for MemorySink {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.lock().document.clone())
    }

    fn write(&mut self, document: &str) -> io::Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "memory sink is read-only"));
        }
        inner.document = Some(document.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ── Document shape ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a> {
    cruises:              &'a [Cruise],
    booked_cruises:       &'a [BookedCruise],
    casino_offers:        &'a [CasinoOffer],
    calendar_events:      &'a [CalendarEvent],
    financials:           &'a [FinancialsRecord],
    casino_analytics:     &'a [CasinoAnalytics],
    casino_performance:   &'a [CasinoPerformance],
    certificates:         &'a [Certificate],
    user_profile:         &'a UserProfile,
    last_import:          Option<Timestamp>,
    web_pricing_snapshot: &'a Option<Value>,
    version:              u32,
    saved_at:             Timestamp,
}

/// Serialize the full store state as one document.
pub fn encode_document(state: &StoreState, saved_at: Timestamp) -> StoreResult<String> {
    let doc = DocumentOut {
        cruises:              &state.cruises,
        booked_cruises:       &state.booked_cruises,
        casino_offers:        &state.casino_offers,
        calendar_events:      &state.calendar_events,
        financials:           &state.financials,
        casino_analytics:     &state.casino_analytics,
        casino_performance:   &state.casino_performance,
        certificates:         &state.certificates,
        user_profile:         &state.user_profile,
        last_import:          state.last_import,
        web_pricing_snapshot: &state.web_pricing_snapshot,
        version:              DOCUMENT_VERSION,
        saved_at,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Read one collection key leniently: absent or non-array keys yield an
/// empty collection, and elements that do not decode are skipped.
fn collection<T: DeserializeOwned>(root: &Value, key: &str) -> Vec<T> {
    let Some(items) = root.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(entity) => out.push(entity),
            Err(e) => log::warn!("persist: skipping {key}[{index}]: {e}"),
        }
    }
    out
}

/// Decode a document into store state. `fallback_profile` is kept when the
/// document carries no readable profile.
pub fn decode_document(text: &str, fallback_profile: UserProfile) -> StoreResult<StoreState> {
    let root: Value = serde_json::from_str(text)?;
    if !root.is_object() {
        return Err(StoreError::InvalidInput("persisted document is not a JSON object".into()));
    }
    let user_profile = root
        .get("userProfile")
        .and_then(|v| UserProfile::deserialize(v).ok())
        .unwrap_or(fallback_profile);
    let last_import = root
        .get("lastImport")
        .and_then(|v| Timestamp::deserialize(v).ok());
    let web_pricing_snapshot = root
        .get("webPricingSnapshot")
        .filter(|v| !v.is_null())
        .cloned();

    Ok(StoreState {
        cruises:            collection(&root, "cruises"),
        booked_cruises:     collection(&root, "bookedCruises"),
        casino_offers:      collection(&root, "casinoOffers"),
        calendar_events:    collection(&root, "calendarEvents"),
        financials:         collection(&root, "financials"),
        casino_analytics:   collection(&root, "casinoAnalytics"),
        casino_performance: collection(&root, "casinoPerformance"),
        certificates:       collection(&root, "certificates"),
        user_profile,
        last_import,
        web_pricing_snapshot,
    })
}

// ── Write-behind manager ───────────────────────────────────────────

/// Observable persistence state, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistStatus {
    pub target:           String,
    pub dirty:            bool,
    pub due_at:           Option<Timestamp>,
    pub memory_only:      bool,
    pub last_persist_at:  Option<Timestamp>,
    pub write_attempts:   u64,
    pub writes_succeeded: u64,
}

pub struct PersistenceManager {
    sink:             Box<dyn DocumentSink>,
    debounce:         chrono::Duration,
    dirty:            bool,
    due_at:           Option<Timestamp>,
    in_flight:        bool,
    loading:          bool,
    memory_only:      bool,
    last_persist_at:  Option<Timestamp>,
    write_attempts:   u64,
    writes_succeeded: u64,
}

impl PersistenceManager {
    pub fn new(sink: Box<dyn DocumentSink>, debounce: chrono::Duration) -> Self {
        Self {
            sink,
            debounce,
            dirty: false,
            due_at: None,
            in_flight: false,
            loading: false,
            memory_only: false,
            last_persist_at: None,
            write_attempts: 0,
            writes_succeeded: 0,
        }
    }

    /// Mark state dirty and (re)arm the debounce deadline. Ignored while a
    /// load is in progress.
    pub fn schedule(&mut self, now: Timestamp) {
        if self.loading {
            return;
        }
        self.dirty = true;
        self.due_at = Some(now + self.debounce);
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.dirty && !self.in_flight && self.due_at.is_some_and(|due| due <= now)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn end_load(&mut self) {
        self.loading = false;
    }

    pub fn read(&self) -> io::Result<Option<String>> {
        self.sink.read()
    }

    /// Write `document` now. Returns true on success. Failures are logged
    /// and switch the manager to memory-only mode; the dirty flag is cleared
    /// either way so a failing target is not hammered until the next
    /// mutation.
    pub fn write(&mut self, document: &str, now: Timestamp) -> bool {
        if self.in_flight || self.loading {
            return false;
        }
        self.in_flight = true;
        self.write_attempts += 1;

        let ok = match self.sink.write(document) {
            Ok(()) => {
                if self.memory_only {
                    log::info!("persist: writes to {} recovered", self.sink.describe());
                }
                self.memory_only = false;
                self.last_persist_at = Some(now);
                self.writes_succeeded += 1;
                log::debug!("persist: wrote {} bytes to {}", document.len(), self.sink.describe());
                true
            }
            Err(e) => {
                log::error!(
                    "persist: write to {} failed, continuing in memory only: {e}",
                    self.sink.describe()
                );
                self.memory_only = true;
                false
            }
        };

        self.dirty = false;
        self.due_at = None;
        self.in_flight = false;
        ok
    }

    pub fn status(&self) -> PersistStatus {
        PersistStatus {
            target:           self.sink.describe(),
            dirty:            self.dirty,
            due_at:           self.due_at,
            memory_only:      self.memory_only,
            last_persist_at:  self.last_persist_at,
            write_attempts:   self.write_attempts,
            writes_succeeded: self.writes_succeeded,
        }
    }
}

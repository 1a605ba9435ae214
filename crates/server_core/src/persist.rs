//! Durable storage for the visibility store plus runtime config.
//!
//! Writes are debounced: the first mutation after a save arms one delayed
//! save on the dedicated save worker, and everything that happens inside the
//! window rides along with it. Saves only ever read a snapshot of the store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use data_runtime::configs::self_view::SelfViewCfg;
use data_runtime::document::PersistedDocument;
use parking_lot::{Mutex, RwLock};

use crate::jobs::{ScheduledWorker, TaskHandle};
use crate::state::VisibilityStore;

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy)]
pub struct GatewayOptions {
    /// Coalescing window between the first dirtying mutation and the save.
    pub save_delay: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            save_delay: DEFAULT_SAVE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed since the last save.
    Clean,
    /// Document written with this many player entries.
    Saved(usize),
    /// Write failed; state stays dirty for the next trigger.
    Failed,
}

impl SaveOutcome {
    #[must_use]
    pub fn saved_count(self) -> usize {
        match self {
            Self::Saved(n) => n,
            Self::Clean | Self::Failed => 0,
        }
    }
}

#[derive(Default)]
struct SaveState {
    dirty: bool,
    pending: Option<TaskHandle>,
}

pub struct PersistenceGateway {
    path: PathBuf,
    store: Arc<VisibilityStore>,
    cfg: RwLock<SelfViewCfg>,
    options: GatewayOptions,
    save_state: Mutex<SaveState>,
    // snapshot + write as one step, so a later snapshot is never overwritten
    write_lock: Mutex<()>,
    writes: AtomicUsize,
    worker: ScheduledWorker,
    this: Weak<PersistenceGateway>,
}

impl PersistenceGateway {
    pub fn new(
        path: impl Into<PathBuf>,
        store: Arc<VisibilityStore>,
        options: GatewayOptions,
    ) -> std::io::Result<Arc<Self>> {
        let worker = ScheduledWorker::spawn("hide-armor-save")?;
        let path = path.into();
        Ok(Arc::new_cyclic(|this| Self {
            path,
            store,
            cfg: RwLock::new(SelfViewCfg::default()),
            options,
            save_state: Mutex::new(SaveState::default()),
            write_lock: Mutex::new(()),
            writes: AtomicUsize::new(0),
            worker,
            this: this.clone(),
        }))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Config as of the last load.
    #[must_use]
    pub fn cfg(&self) -> SelfViewCfg {
        *self.cfg.read()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.save_state.lock().dirty
    }

    /// Successful document writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Read the document into the store. Never fails: I/O and parse errors
    /// are logged and count as zero entries. Does not mark state dirty.
    pub fn load(&self) -> usize {
        if !self.path.exists() {
            self.seed();
            return 0;
        }
        let doc = match PersistedDocument::read(&self.path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(target: "persist", path = %self.path.display(), error = %e, "failed to load state");
                return 0;
            }
        };
        let resolved = doc.resolve();
        *self.cfg.write() = resolved.cfg;
        for (key, why) in &resolved.skipped {
            tracing::debug!(target: "persist", key = %key, reason = ?why, "skipped entry");
        }
        for (id, mask) in &resolved.entries {
            self.store.set_mask_silently(*id, *mask);
        }
        resolved.entries.len()
    }

    fn seed(&self) {
        if let Some(dir) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!(target: "persist", dir = %dir.display(), error = %e, "failed to create data dir");
                return;
            }
        }
        if let Err(e) = PersistedDocument::seed().write_atomic(&self.path) {
            tracing::warn!(target: "persist", path = %self.path.display(), error = %e, "failed to seed document");
        }
    }

    /// Mark state dirty and arm the debounced save if none is waiting. A save
    /// that has already started does not count: it may have cleared the flag.
    pub fn mark_dirty(&self) {
        let mut st = self.save_state.lock();
        st.dirty = true;
        if st.pending.as_ref().is_some_and(TaskHandle::is_pending) {
            return;
        }
        let this = self.this.clone();
        st.pending = Some(self.worker.schedule(self.options.save_delay, move || {
            if let Some(gw) = this.upgrade() {
                gw.save();
            }
        }));
    }

    /// Write the current snapshot if anything changed since the last save.
    pub fn save(&self) -> SaveOutcome {
        {
            let mut st = self.save_state.lock();
            if !st.dirty {
                return SaveOutcome::Clean;
            }
            st.dirty = false;
        }
        self.write_snapshot()
    }

    /// Write unconditionally, bypassing the debounce.
    pub fn flush(&self) -> SaveOutcome {
        self.save_state.lock().dirty = false;
        self.write_snapshot()
    }

    fn write_snapshot(&self) -> SaveOutcome {
        let _write = self.write_lock.lock();
        let snapshot = self.store.snapshot();
        let doc = PersistedDocument::from_entries(snapshot, &self.cfg());
        let count = doc.players.as_ref().map_or(0, std::collections::BTreeMap::len);
        match doc.write_atomic(&self.path) {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                metrics::counter!("self_view.saves_total").increment(1);
                tracing::debug!(target: "persist", players = count, "state saved");
                SaveOutcome::Saved(count)
            }
            Err(e) => {
                self.save_state.lock().dirty = true;
                metrics::counter!("self_view.save_failures_total").increment(1);
                tracing::warn!(target: "persist", path = %self.path.display(), error = %e, "failed to save state");
                SaveOutcome::Failed
            }
        }
    }

    /// Final flush, then stop the save worker.
    pub fn shutdown(&self) -> SaveOutcome {
        if let Some(pending) = self.save_state.lock().pending.take() {
            pending.cancel();
        }
        let outcome = self.flush();
        self.worker.shutdown();
        outcome
    }
}

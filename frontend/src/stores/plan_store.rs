//! Plan store.
//!
//! Local state is authoritative for the whole session: every edit lands in
//! memory synchronously and the write to the server is coalesced per row.
//! A row starts with a temporary id and is swapped to its server id in place
//! once its first create succeeds.
//!
//! Writes are sequenced per row. Each edit bumps the row's version and at
//! most one write per row is outstanding. A timer that fires while a write is
//! still in flight only marks the row for a rerun, and the completion of the
//! outstanding write then sends the latest values. A late completion can
//! therefore never leave the server holding an older edit than the last one
//! the user made.

use shared::{PlanItemFields, PlanItemRecord, ValidationError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{RemoteFailure, SyncResult};
use crate::services::{Notifier, RemoteStore};
use crate::sync::{IdMinter, PlanItemId, Reconciler, WriteCoalescer};

/// Category label given to a freshly added row
pub const NEW_ROW_CATEGORY: &str = "New expense";

/// Where a plan row stands relative to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Temporary id, never edited, not on the server
    LocalNew,
    /// Edited; a coalescing timer is armed
    PendingWrite,
    /// A create or update call is outstanding
    InFlight,
    /// Nothing outstanding; the last write succeeded
    Synced,
    /// The last write failed; the next edit will try again
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanItem {
    pub id: PlanItemId,
    pub category: String,
    pub amount: f64,
}

impl PlanItem {
    fn fields(&self) -> PlanItemFields {
        PlanItemFields {
            category: self.category.clone(),
            amount: self.amount,
        }
    }
}

/// A single field edit on a plan row
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEdit {
    Category(String),
    Amount(f64),
}

#[derive(Debug)]
struct PlanRow {
    item: PlanItem,
    state: SyncState,
    version: u64,
    in_flight: bool,
    rerun: bool,
}

impl PlanRow {
    fn local(id: PlanItemId, category: String) -> Self {
        Self {
            item: PlanItem {
                id,
                category,
                amount: 0.0,
            },
            state: SyncState::LocalNew,
            version: 0,
            in_flight: false,
            rerun: false,
        }
    }

    fn synced(record: PlanItemRecord) -> Self {
        Self {
            item: PlanItem {
                id: PlanItemId::Permanent(record.id),
                category: record.category,
                amount: record.amount,
            },
            state: SyncState::Synced,
            version: 0,
            in_flight: false,
            rerun: false,
        }
    }
}

#[derive(Debug, Default)]
struct PlanState {
    rows: Vec<PlanRow>,
    reconciler: Reconciler,
    loaded: bool,
}

impl PlanState {
    fn position(&self, id: &PlanItemId) -> Option<usize> {
        let id = self.reconciler.resolve(id);
        self.rows.iter().position(|row| row.item.id == id)
    }

    fn row(&self, id: &PlanItemId) -> Option<&PlanRow> {
        self.position(id).map(|pos| &self.rows[pos])
    }
}

/// Snapshot of a row taken when its write starts
struct WriteJob {
    id: PlanItemId,
    fields: PlanItemFields,
    version: u64,
}

enum WriteOutcome {
    Done,
    /// Newer edits arrived while the write was outstanding
    Again(PlanItemId),
    /// The row was removed while its create was outstanding; the new server
    /// record has to go
    Orphaned(String),
}

struct PlanShared<R: RemoteStore> {
    remote: Arc<R>,
    state: Mutex<PlanState>,
    coalescer: WriteCoalescer<PlanItemId>,
    minter: IdMinter,
    notifier: Notifier,
    // Running write_row calls, including orphan cleanup after the row is gone
    outstanding: AtomicUsize,
    idle: Notify,
}

impl<R: RemoteStore> PlanShared<R> {
    fn lock(&self) -> MutexGuard<'_, PlanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// (Re)arm the coalescing timer for the row at `pos`
    fn arm(self: &Arc<Self>, state: &mut PlanState, pos: usize) {
        let row = &mut state.rows[pos];
        row.version += 1;
        row.state = SyncState::PendingWrite;

        let key = row.item.id.clone();
        let weak: Weak<Self> = Arc::downgrade(self);
        let target = key.clone();
        self.coalescer.schedule(key, move || async move {
            if let Some(shared) = weak.upgrade() {
                Self::write_row(shared, target).await;
            }
        });
    }

    /// Persist a row: create while its id is temporary, update once permanent
    async fn write_row(self: Arc<Self>, id: PlanItemId) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let mut target = id;
        let mut continuing = false;
        loop {
            let Some(job) = self.begin_write(&target, continuing) else {
                break;
            };

            let outcome = match &job.id {
                PlanItemId::Temporary(_) => {
                    debug!("Creating plan row {} ({:?})", job.id, job.fields);
                    let result = self.remote.create_plan_item(&job.fields).await;
                    self.finish_create(&job, result)
                }
                PlanItemId::Permanent(server_id) => {
                    debug!("Updating plan row {} ({:?})", server_id, job.fields);
                    let result = self.remote.update_plan_item(server_id, &job.fields).await;
                    self.finish_update(&job, result)
                }
            };

            match outcome {
                WriteOutcome::Done => break,
                WriteOutcome::Again(next) => {
                    debug!("Plan row {} changed while saving, writing again", next);
                    target = next;
                    continuing = true;
                }
                WriteOutcome::Orphaned(server_id) => {
                    warn!("Plan row {} was removed while being created, deleting {}", job.id, server_id);
                    if let Err(e) = self.remote.delete_plan_item(&server_id).await {
                        self.notifier.error(format!("Failed to remove plan row: {}", e));
                    }
                    break;
                }
            }
        }
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.idle.notify_waiters();
    }

    /// `continuing` is set when this call already owns the row's in-flight slot
    fn begin_write(&self, id: &PlanItemId, continuing: bool) -> Option<WriteJob> {
        let mut state = self.lock();
        let Some(pos) = state.position(id) else {
            debug!("Plan row {} is gone, nothing to write", id);
            return None;
        };
        let row = &mut state.rows[pos];
        row.state = SyncState::InFlight;
        if row.in_flight && !continuing {
            row.rerun = true;
            return None;
        }
        row.in_flight = true;
        Some(WriteJob {
            id: row.item.id.clone(),
            fields: row.item.fields(),
            version: row.version,
        })
    }

    fn finish_create(&self, job: &WriteJob, result: Result<PlanItemRecord, RemoteFailure>) -> WriteOutcome {
        let record = match result {
            Ok(record) => record,
            Err(e) => return self.fail_write(job, e),
        };

        let mut state = self.lock();
        let Some(pos) = state.position(&job.id) else {
            return WriteOutcome::Orphaned(record.id);
        };
        let PlanState { rows, reconciler, .. } = &mut *state;
        let row = &mut rows[pos];
        if let Some(permanent) = reconciler.reconcile(&mut row.item.id, record.id) {
            // A timer armed during the create now belongs to the permanent id
            self.coalescer.rekey(&job.id, permanent);
        }
        Self::settle(row, job.version)
    }

    fn finish_update(&self, job: &WriteJob, result: Result<(), RemoteFailure>) -> WriteOutcome {
        if let Err(e) = result {
            return self.fail_write(job, e);
        }
        let mut state = self.lock();
        match state.position(&job.id) {
            Some(pos) => Self::settle(&mut state.rows[pos], job.version),
            None => WriteOutcome::Done,
        }
    }

    // On `Again` the row keeps its in-flight slot for the follow-up write
    fn settle(row: &mut PlanRow, version: u64) -> WriteOutcome {
        if row.rerun {
            row.rerun = false;
            return WriteOutcome::Again(row.item.id.clone());
        }
        row.in_flight = false;
        row.state = if row.version == version {
            SyncState::Synced
        } else {
            SyncState::PendingWrite
        };
        WriteOutcome::Done
    }

    // Local values are never rolled back; the row stays stale until the next
    // edit arms another write.
    fn fail_write(&self, job: &WriteJob, error: RemoteFailure) -> WriteOutcome {
        let mut state = self.lock();
        let Some(pos) = state.position(&job.id) else {
            return WriteOutcome::Done;
        };
        let row = &mut state.rows[pos];
        self.notifier
            .error(format!("Failed to save plan row '{}': {}", row.item.category, error));
        if row.rerun {
            row.rerun = false;
            return WriteOutcome::Again(row.item.id.clone());
        }
        row.in_flight = false;
        row.state = if row.version == job.version {
            SyncState::Stale
        } else {
            SyncState::PendingWrite
        };
        WriteOutcome::Done
    }
}

/// Store for the monthly plan rows
pub struct PlanStore<R: RemoteStore> {
    shared: Arc<PlanShared<R>>,
}

impl<R: RemoteStore> PlanStore<R> {
    pub fn new(remote: Arc<R>, debounce: Duration, notifier: Notifier) -> Self {
        Self {
            shared: Arc::new(PlanShared {
                remote,
                state: Mutex::new(PlanState::default()),
                coalescer: WriteCoalescer::new(debounce),
                minter: IdMinter::new(),
                notifier,
                outstanding: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Load the plan from the server.
    ///
    /// Only the first successful load replaces anything; afterwards local
    /// edits are the authority and later calls are no-ops. Rows added
    /// locally before the load finished are kept after the server rows.
    pub async fn refresh(&self) -> Result<(), RemoteFailure> {
        if self.is_loaded() {
            debug!("Plan already loaded, keeping local state");
            return Ok(());
        }

        match self.shared.remote.list_plan_items().await {
            Ok(records) => {
                let mut state = self.shared.lock();
                if state.loaded {
                    return Ok(());
                }
                let local = std::mem::take(&mut state.rows);
                state.rows = records.into_iter().map(PlanRow::synced).collect();
                state.rows.extend(local);
                state.loaded = true;
                info!("📋 Loaded {} plan rows", state.rows.len());
                Ok(())
            }
            Err(e) => {
                self.shared
                    .notifier
                    .error(format!("Failed to load monthly plan: {}", e));
                Err(e)
            }
        }
    }

    /// Seed one row per category when the loaded plan is empty, and arm
    /// their writes so they get persisted.
    pub fn seed_defaults(&self, categories: &[String]) -> Vec<PlanItemId> {
        let mut state = self.shared.lock();
        if !state.loaded || !state.rows.is_empty() || categories.is_empty() {
            return Vec::new();
        }
        info!("🌱 Seeding {} default plan categories", categories.len());
        categories
            .iter()
            .map(|category| {
                let id = self.shared.minter.mint();
                state.rows.push(PlanRow::local(id.clone(), category.clone()));
                let pos = state.rows.len() - 1;
                self.shared.arm(&mut state, pos);
                id
            })
            .collect()
    }

    /// Append a new row with a temporary id and zero amount. No network call.
    pub fn add_row(&self) -> PlanItemId {
        self.add_row_with_category(NEW_ROW_CATEGORY)
    }

    pub fn add_row_with_category(&self, category: impl Into<String>) -> PlanItemId {
        let id = self.shared.minter.mint();
        debug!("Added plan row {}", id);
        self.shared
            .lock()
            .rows
            .push(PlanRow::local(id.clone(), category.into()));
        id
    }

    /// Apply an edit in memory right away and (re)arm the row's write
    pub fn edit_field(&self, id: &PlanItemId, edit: PlanEdit) -> Result<(), ValidationError> {
        if let PlanEdit::Amount(amount) = &edit {
            if !amount.is_finite() {
                return Err(ValidationError::InvalidAmount(amount.to_string()));
            }
        }

        let mut state = self.shared.lock();
        let pos = state
            .position(id)
            .ok_or_else(|| ValidationError::UnknownPlanRow(id.to_string()))?;
        let item = &mut state.rows[pos].item;
        match edit {
            PlanEdit::Category(category) => item.category = category,
            PlanEdit::Amount(amount) => item.amount = amount,
        }
        self.shared.arm(&mut state, pos);
        Ok(())
    }

    /// Remove a row locally right away.
    ///
    /// A permanent row is deleted on the server as well; a temporary row was
    /// never persisted, so only its pending timer is cancelled. The local
    /// removal stands whatever the delete call returns.
    pub async fn remove_row(&self, id: &PlanItemId) -> SyncResult<()> {
        let removed = {
            let mut state = self.shared.lock();
            let pos = state
                .position(id)
                .ok_or_else(|| ValidationError::UnknownPlanRow(id.to_string()))?;
            let row = state.rows.remove(pos);
            if self.shared.coalescer.cancel(&row.item.id) {
                debug!("Dropped pending write for {}", row.item.id);
            }
            row.item
        };

        match &removed.id {
            PlanItemId::Temporary(_) => {
                debug!("Removed unsaved plan row {}", removed.id);
                Ok(())
            }
            PlanItemId::Permanent(server_id) => {
                match self.shared.remote.delete_plan_item(server_id).await {
                    Ok(()) => {
                        info!("🗑️ Deleted plan row {} ({})", server_id, removed.category);
                        Ok(())
                    }
                    Err(e) => {
                        self.shared
                            .notifier
                            .error(format!("Failed to remove plan row '{}': {}", removed.category, e));
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Fire every pending write now and wait until no write is outstanding
    pub async fn flush(&self) {
        let pending = self.shared.coalescer.take_all();
        if !pending.is_empty() {
            info!("💾 Saving {} pending plan row(s)", pending.len());
        }
        for id in pending {
            PlanShared::write_row(Arc::clone(&self.shared), id).await;
        }

        loop {
            let idle = self.shared.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.shared.outstanding.load(Ordering::SeqCst) == 0 {
                break;
            }
            idle.await;
        }
    }

    /// Cancel every live timer. Unsaved edits stay in memory only.
    pub fn shutdown(&self) {
        self.shared.coalescer.cancel_all();
    }

    pub fn items(&self) -> Vec<PlanItem> {
        self.shared
            .lock()
            .rows
            .iter()
            .map(|row| row.item.clone())
            .collect()
    }

    /// Look a row up by any id it has had
    pub fn get(&self, id: &PlanItemId) -> Option<PlanItem> {
        self.shared.lock().row(id).map(|row| row.item.clone())
    }

    pub fn sync_state(&self, id: &PlanItemId) -> Option<SyncState> {
        self.shared.lock().row(id).map(|row| row.state)
    }

    /// Number of armed coalescing timers
    pub fn pending_writes(&self) -> usize {
        self.shared.coalescer.armed_count()
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.lock().loaded
    }

    pub fn len(&self) -> usize {
        self.shared.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

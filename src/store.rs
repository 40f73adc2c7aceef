//! In-memory run registry
//!
//! Each run sits behind its own lock so that mutations of one run are
//! serialized while other runs stay available. The outer map lock is only
//! held long enough to find or insert a slot, never while a run lock is
//! being waited on.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Result, RunError};
use crate::models::{Identity, Run, RunId, RunKind, RunSnapshot};

/// `None` marks a run deleted while another caller still held its slot.
type Slot = Arc<RwLock<Option<Run>>>;

#[derive(Debug)]
pub struct RunStore {
    runs: RwLock<HashMap<RunId, Slot>>,
    next_id: AtomicU64,
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStore {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new run with zeroed amounts and return its fresh id
    pub fn create(&self, kind: RunKind, creator: Identity, players: Vec<String>) -> RunId {
        let id = RunId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let run = Run::new(id, kind, creator, players);
        self.runs.write().insert(id, Arc::new(RwLock::new(Some(run))));
        id
    }

    /// Insert a run loaded from storage, keeping its id
    ///
    /// Later `create` calls allocate ids above every inserted one.
    pub fn insert(&self, run: Run) -> Result<()> {
        let id = run.id;
        let mut runs = self.runs.write();
        if runs.contains_key(&id) {
            return Err(RunError::Conflict(format!("run {id} already exists")));
        }
        let next = id.0.checked_add(1).ok_or_else(|| {
            RunError::invalid(format!("run id {id} leaves no room for new ids"))
        })?;
        self.next_id.fetch_max(next, Ordering::SeqCst);
        runs.insert(id, Arc::new(RwLock::new(Some(run))));
        Ok(())
    }

    fn slot(&self, id: RunId) -> Result<Slot> {
        self.runs.read().get(&id).cloned().ok_or(RunError::NotFound(id))
    }

    pub fn get(&self, id: RunId) -> Result<RunSnapshot> {
        let slot = self.slot(id)?;
        let guard = slot.read();
        guard.clone().ok_or(RunError::NotFound(id))
    }

    /// Apply `mutator` to a run under its exclusive lock
    ///
    /// The mutator works on a copy; the copy is committed only if it returns
    /// `Ok`, so a failed update leaves the run untouched.
    pub fn update<T, F>(&self, id: RunId, mutator: F) -> Result<T>
    where
        F: FnOnce(&mut Run) -> Result<T>,
    {
        let slot = self.slot(id)?;
        let mut guard = slot.write();
        let mut draft = guard.as_ref().ok_or(RunError::NotFound(id))?.clone();
        let out = mutator(&mut draft)?;
        *guard = Some(draft);
        Ok(out)
    }

    /// Remove a run if `check` allows it, returning the removed run
    pub fn delete<F>(&self, id: RunId, check: F) -> Result<Run>
    where
        F: FnOnce(&Run) -> Result<()>,
    {
        let slot = self.slot(id)?;
        let mut guard = slot.write();
        check(guard.as_ref().ok_or(RunError::NotFound(id))?)?;
        let removed = guard.take().ok_or(RunError::NotFound(id))?;
        self.runs.write().remove(&id);
        Ok(removed)
    }

    /// Snapshots of all live runs, ordered by id
    pub fn list(&self) -> Vec<RunSnapshot> {
        let slots: Vec<Slot> = self.runs.read().values().cloned().collect();
        let mut runs: Vec<RunSnapshot> = slots.iter().filter_map(|s| s.read().clone()).collect();
        runs.sort_by_key(|r| r.id);
        runs
    }

    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

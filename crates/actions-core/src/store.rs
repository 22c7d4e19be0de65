//! Persistent store for pending `Action` records using redb.
//!
//! # Table design
//!
//! A single `ACTIONS` table keyed by the 16 raw bytes of the action id,
//! value = JSON-encoded [`Action`]. Per-user pending sets are small
//! (almost always 0–2 records), so selection is a full scan with an
//! in-memory filter instead of a composite-key range.
//!
//! Selection order among eligible records: preference descending, then
//! id bytes ascending. The id tie-break makes selection deterministic
//! when two records share the maximum preference.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::action::Action;
use crate::error::{ActionsError, Result};

const ACTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("actions");

fn db_err(e: impl std::fmt::Display) -> ActionsError {
    ActionsError::Store(e.to_string())
}

/// Store of pending [`Action`] records, shared across all sessions.
///
/// The only cross-session invariant it guarantees is that [`remove`]
/// is idempotent; each record is otherwise owned by the one sequencer
/// invocation currently processing it.
///
/// [`remove`]: ActionStore::remove
pub struct ActionStore {
    db: Database,
}

impl ActionStore {
    /// Open or create the redb database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(db_err)?;
        // Ensure the table exists before any reads
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(ACTIONS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    /// Insert a pending action record.
    pub fn insert(&self, action: &Action) -> Result<()> {
        let value = serde_json::to_vec(action).map_err(db_err)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(ACTIONS).map_err(db_err)?;
            table
                .insert(action.id.as_bytes().as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// All actions eligible for `user_id` under the given IdP-session
    /// scope, most important first.
    pub fn pending_for_user(
        &self,
        user_id: &str,
        idp_session: Option<&str>,
    ) -> Result<Vec<Action>> {
        let mut pending: Vec<Action> = self
            .list_all()?
            .into_iter()
            .filter(|a| a.user_id == user_id && a.eligible_for(idp_session))
            .collect();
        pending.sort_by(|a, b| {
            b.preference
                .cmp(&a.preference)
                .then_with(|| a.id.as_bytes().cmp(b.id.as_bytes()))
        });
        Ok(pending)
    }

    /// The most important eligible action for `user_id`, if any.
    pub fn next_pending(&self, user_id: &str, idp_session: Option<&str>) -> Result<Option<Action>> {
        Ok(self
            .pending_for_user(user_id, idp_session)?
            .into_iter()
            .next())
    }

    /// Remove an action by id. Idempotent: removing an id that is
    /// already gone is a no-op, so a duplicated form submission cannot
    /// crash the flow.
    pub fn remove(&self, id: Uuid) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(ACTIONS).map_err(db_err)?;
            table.remove(id.as_bytes().as_slice()).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Total number of stored records, across all users.
    pub fn count(&self) -> Result<u64> {
        Ok(self.list_all()?.len() as u64)
    }

    /// Number of stored records for one user, ignoring session scope.
    pub fn count_for_user(&self, user_id: &str) -> Result<u64> {
        Ok(self
            .list_all()?
            .iter()
            .filter(|a| a.user_id == user_id)
            .count() as u64)
    }

    fn list_all(&self) -> Result<Vec<Action>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(ACTIONS).map_err(db_err)?;
        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            let action: Action = serde_json::from_slice(v.value()).map_err(db_err)?;
            result.push(action);
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

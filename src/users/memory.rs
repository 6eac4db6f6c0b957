use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::model::{NewUserRow, UserRecord};
use super::store::{StoreError, UserStore};
use crate::auth::token::{Clock, SystemClock};

/// In-process `UserStore` with the same uniqueness rules as the Postgres
/// schema: `username` and `email` are unique among rows with no `deleted_at`.
pub struct MemoryUserStore {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<UserRecord>,
    last_id: i64,
    unavailable: bool,
    lookups: usize,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamps rows from `clock` instead of the system time.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }

    /// Number of username/email lookups served so far.
    pub fn lookups(&self) -> usize {
        self.state.lock().map(|s| s.lookups).unwrap_or(0)
    }

    /// Makes every call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        if state.unavailable {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        f(&mut state)
    }
}

impl MemoryState {
    fn live(&self) -> impl Iterator<Item = &UserRecord> {
        self.rows.iter().filter(|u| u.deleted_at.is_none())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, row: NewUserRow) -> Result<UserRecord, StoreError> {
        self.with_state(|state| {
            if state
                .live()
                .any(|u| u.username == row.username || u.email == row.email)
            {
                return Err(StoreError::UniqueViolation);
            }
            state.last_id += 1;
            let now = self.clock.now();
            let user = UserRecord {
                id: state.last_id,
                username: row.username,
                email: row.email,
                biography: row.biography,
                password_hash: row.password_hash,
                created_at: Some(now),
                updated_at: Some(now),
                deleted_at: None,
            };
            state.rows.push(user.clone());
            Ok(user)
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        self.with_state(|state| {
            Ok(state.live().find(|u| u.id == id).map(|u| UserRecord {
                id: u.id,
                username: u.username.clone(),
                email: u.email.clone(),
                ..UserRecord::default()
            }))
        })
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.with_state(|state| {
            state.lookups += 1;
            let by_username = state.live().find(|u| u.username == username);
            let found = by_username.or_else(|| state.live().find(|u| u.email == email));
            Ok(found.cloned())
        })
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, StoreError> {
        let now = self.clock.now();
        self.with_state(|state| {
            match state
                .rows
                .iter_mut()
                .find(|u| u.id == id && u.deleted_at.is_none())
            {
                Some(user) => {
                    user.deleted_at = Some(now);
                    user.updated_at = Some(now);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    async fn truncate(&self) -> Result<(), StoreError> {
        self.with_state(|state| {
            state.rows.clear();
            Ok(())
        })
    }
}

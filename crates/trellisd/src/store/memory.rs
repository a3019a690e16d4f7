//! In-process store keyed by string.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use trellis_wire::Selector;

use super::{Page, Record, Schema, Store, StoreError, check_key};
use crate::dispatch::{Args, DispatchError};

/// Records held in key order behind a lock.
#[derive(Debug)]
pub struct MemoryStore<R> {
    records: RwLock<BTreeMap<String, Arc<R>>>,
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<R: Record> MemoryStore<R> {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record built outside the protocol.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the key is taken and
    /// [`StoreError::UnaddressableKey`] when it could never be looked up.
    pub fn insert(&self, record: R) -> Result<Arc<R>, StoreError> {
        let key = record.key();
        check_key(&key)?;
        let mut records = self.write()?;
        if records.contains_key(&key) {
            return Err(StoreError::Conflict { key });
        }
        let shared = Arc::new(record);
        records.insert(key, Arc::clone(&shared));
        Ok(shared)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when a writer panicked.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    /// Returns `true` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when a writer panicked.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Arc<R>>>, StoreError> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Arc<R>>>, StoreError> {
        self.records.write().map_err(|_| StoreError::Poisoned)
    }
}

fn selected<R: Record>(record: &R, selector: Option<&Selector>) -> Result<bool, StoreError> {
    let Some(selector) = selector else {
        return Ok(true);
    };
    let attributes = record.attributes().map_err(|error| StoreError::Unreadable {
        key: record.key(),
        message: error.to_string(),
    })?;
    Ok(selector.matches(&attributes))
}

impl<R: Record> Store for MemoryStore<R> {
    type Record = R;

    fn schema(&self) -> Schema {
        R::schema()
    }

    fn key_for(&self, record: &R) -> String {
        record.key()
    }

    fn lookup(&self, key: &str) -> Result<Arc<R>, StoreError> {
        self.read()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn create(&self, args: Args) -> Result<Arc<R>, DispatchError> {
        let record = R::create(args)?;
        Ok(self.insert(record)?)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.write()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn delete_matching(&self, selector: Option<&Selector>) -> Result<usize, StoreError> {
        let mut records = self.write()?;
        let mut doomed = Vec::new();
        for (key, record) in &*records {
            if selected(record.as_ref(), selector)? {
                doomed.push(key.clone());
            }
        }
        for key in &doomed {
            records.remove(key);
        }
        Ok(doomed.len())
    }

    fn list(
        &self,
        selector: Option<&Selector>,
        limit: Option<usize>,
        after: Option<&str>,
    ) -> Result<Page<R>, StoreError> {
        let records = self.read()?;
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let mut page: Vec<(&String, &Arc<R>)> = Vec::new();
        let mut more = false;
        for entry in records.range::<str, _>((lower, Bound::Unbounded)) {
            if !selected(entry.1.as_ref(), selector)? {
                continue;
            }
            if limit.is_some_and(|limit| page.len() >= limit) {
                more = true;
                break;
            }
            page.push(entry);
        }
        let next = page
            .last()
            .filter(|_| more)
            .map(|(key, _)| (*key).clone());
        Ok(Page {
            records: page.into_iter().map(|(_, record)| Arc::clone(record)).collect(),
            next,
        })
    }
}

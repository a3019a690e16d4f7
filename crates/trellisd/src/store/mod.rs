//! Backends holding collection records.
//!
//! A [`Store`] owns every record of one collection and answers the keyed and
//! selector-filtered operations the collection handler exposes. The protocol
//! layer never locks around a store; backends serialise their own mutations.

mod memory;

use std::sync::Arc;

use thiserror::Error;
use trellis_wire::Selector;

pub use self::memory::MemoryStore;
use crate::dispatch::{Args, DispatchError, Exposed, Params};

/// Errors raised by a collection backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No record has the key.
    #[error("no record with key '{key}'")]
    NotFound { key: String },

    /// A record with the key already exists.
    #[error("a record with key '{key}' already exists")]
    Conflict { key: String },

    /// The key cannot appear as a record URL segment.
    #[error("key '{key}' cannot be addressed: keys must be non-empty, must not be '.' or '..' and must not start with '_'")]
    UnaddressableKey { key: String },

    /// A record's attributes could not be read for selector matching.
    #[error("record '{key}' is unreadable: {message}")]
    Unreadable { key: String, message: String },

    /// The backend rejected the record's contents.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// A writer panicked while holding the backend's lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

/// Refuses keys whose record URL would be private or normalised away.
///
/// # Errors
///
/// Returns [`StoreError::UnaddressableKey`] for the empty key, `.`, `..`
/// and keys beginning with `_`.
pub fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key == "." || key == ".." || key.starts_with('_') {
        return Err(StoreError::UnaddressableKey {
            key: key.to_owned(),
        });
    }
    Ok(())
}

/// What a collection advertises about its records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Arguments accepted by `new`.
    pub create: Params,
    /// Attribute names usable in `where` selectors.
    pub selectors: Vec<String>,
    /// Name of the key attribute.
    pub key: String,
}

/// One page of a listing.
#[derive(Debug)]
pub struct Page<R> {
    /// Records in key order.
    pub records: Vec<Arc<R>>,
    /// Key after which the next page starts; present only when more records
    /// match.
    pub next: Option<String>,
}

/// External backend of a collection.
pub trait Store: Send + Sync + 'static {
    /// Record type held by the backend.
    type Record: Exposed;

    /// Creation arguments, selector fields and key name.
    fn schema(&self) -> Schema;

    /// Primary key of `record`.
    fn key_for(&self, record: &Self::Record) -> String;

    /// Fetches one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown keys.
    fn lookup(&self, key: &str) -> Result<Arc<Self::Record>, StoreError>;

    /// Builds and stores a record from bound creation arguments.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] for unusable arguments and
    /// [`StoreError::Conflict`] when the key is taken.
    fn create(&self, args: Args) -> Result<Arc<Self::Record>, DispatchError>;

    /// Removes one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown keys.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every record matching `selector`; `None` matches all.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when the backend is unusable.
    fn delete_matching(&self, selector: Option<&Selector>) -> Result<usize, StoreError>;

    /// Lists matching records in key order, starting after the key `after`
    /// and returning at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] when the backend is unusable.
    fn list(
        &self,
        selector: Option<&Selector>,
        limit: Option<usize>,
        after: Option<&str>,
    ) -> Result<Page<Self::Record>, StoreError>;
}

/// A record type that can live in a [`MemoryStore`].
pub trait Record: Exposed {
    /// Collection schema of the record type.
    fn schema() -> Schema;

    /// Primary key.
    fn key(&self) -> String;

    /// Builds a record from bound creation arguments.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgument`] for unusable arguments.
    fn create(args: Args) -> Result<Self, DispatchError>;
}

#[cfg(test)]
mod tests;

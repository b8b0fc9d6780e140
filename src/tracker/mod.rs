//! Core of mindtrack.
//!  - [store::EntryStore] owns saved entries and the draft being filled in, persisting both
//!    through [storage::KeyValueStorage].
//!  - [session::TestSession] runs time perception tests, scored by [evaluator::evaluate].

pub mod canvas;
pub mod entities;
pub mod evaluator;
pub mod session;
pub mod storage;
pub mod store;

use std::path::Path;

use anyhow::Result;
use storage::FileStorage;
use store::{EntryStore, UuidGenerator};

use crate::utils::clock::DefaultClock;

/// Creates a store backed by files in `<app_dir>/store`. The store still has to be rehydrated.
pub fn create_file_store(app_dir: &Path) -> Result<EntryStore<FileStorage>> {
    let storage = FileStorage::new(app_dir.join("store"))?;
    Ok(EntryStore::new(
        storage,
        Box::new(UuidGenerator),
        Box::new(DefaultClock),
    ))
}

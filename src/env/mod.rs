//! Environment store
//!
//! `EnvStore` is the environment a child is spawned with.  It owns an independent copy of every
//! key and value it holds; nothing passed to `set` is referenced after `set` returns.  Keys are
//! unique and compared byte-for-byte.  Iteration order is unspecified.

mod fnv;
pub use fnv::fnv1a;

use crate::err::ErrorKind;
use crate::os::{Envp, inherited};
use alloc::vec::Vec;
use hashbrown::HashTable;

pub use crate::os::lookup_inherited;

#[derive(Clone, Debug, Default)]
pub struct EnvStore {
    table: HashTable<(Vec<u8>, Vec<u8>)>,
}

fn hash(key: &[u8]) -> u64 {
    fnv1a(key) as u64
}

fn rehash(entry: &(Vec<u8>, Vec<u8>)) -> u64 {
    hash(&entry.0)
}

fn copy(bytes: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(bytes.len())
        .map_err(|_| ErrorKind::OutOfMemory)?;
    owned.extend_from_slice(bytes);
    Ok(owned)
}

impl EnvStore {
    pub fn new() -> Self {
        Self {
            table: HashTable::new(),
        }
    }

    /// Copy every `KEY=VALUE` entry of `envp` into a new store
    ///
    /// If a key appears more than once, the first occurrence wins, matching `Envp::lookup`.
    /// This is the opposite of calling `set` once per entry, where the last would win.
    pub fn from_envp(envp: Envp<'_>) -> Result<Self, ErrorKind> {
        let mut store = Self::new();
        for (key, value) in envp {
            if store.get(key).is_none() {
                store.set(key, value)?;
            }
        }
        Ok(store)
    }

    /// Insert or replace `key`
    ///
    /// Replacing keeps the stored key buffer and frees the old value buffer.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ErrorKind> {
        let value = copy(value)?;
        let hash = hash(key);

        if let Some(entry) = self.table.find_mut(hash, |(k, _)| k.as_slice() == key) {
            entry.1 = value;
            return Ok(());
        }

        let key = copy(key)?;
        self.table
            .try_reserve(1, rehash)
            .map_err(|_| ErrorKind::OutOfMemory)?;
        self.table.insert_unique(hash, (key, value), rehash);
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.table
            .find(hash(key), |(k, _)| k.as_slice() == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Remove `key` and free both of its buffers; no-op if absent
    pub fn delete(&mut self, key: &[u8]) {
        if let Ok(entry) = self.table.find_entry(hash(key), |(k, _)| k.as_slice() == key) {
            let _ = entry.remove();
        }
    }

    pub fn count(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// `(key, value)` pairs in unspecified order
    ///
    /// Each call starts a fresh pass over the whole store.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.table
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// Copy the process's inherited environment into a new store
///
/// Empty if the inherited table was never installed (see `os::init_inherited`).
pub fn build_env_from_inherited() -> Result<EnvStore, ErrorKind> {
    EnvStore::from_envp(inherited())
}

//! Thread-safe in-memory [`KeyValueBackend`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{KeyValueBackend, StoreFuture, StoreKey, StoredEntry},
};

type EntryMap = Arc<RwLock<HashMap<StoreKey, StoredEntry>>>;

/// Storage backend that keeps entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend(EntryMap);
impl MemoryBackend {
	/// Number of entries across all tables (records and index pointers).
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` if no entry is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn scan_now(map: &EntryMap, table: &str) -> Vec<(StoreKey, StoredEntry)> {
		map.read()
			.iter()
			.filter(|(key, _)| key.table == table)
			.map(|(key, entry)| (key.clone(), entry.clone()))
			.collect()
	}
}
impl KeyValueBackend for MemoryBackend {
	fn put(&self, key: StoreKey, entry: StoredEntry) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key, entry);

			Ok(())
		})
	}

	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<StoredEntry>> {
		Box::pin(async move { Ok(self.0.read().get(key).cloned()) })
	}

	fn delete<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.0.write().remove(key).is_some()) })
	}

	fn scan<'a>(&'a self, table: &'a str) -> StoreFuture<'a, Vec<(StoreKey, StoredEntry)>> {
		Box::pin(async move { Ok(Self::scan_now(&self.0, table)) })
	}
}

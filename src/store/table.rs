//! [`IndexedStore`] implementation layered on any [`KeyValueBackend`].

// self
use crate::{
	_prelude::*,
	store::{
		IndexedRecord, IndexedStore, KeyValueBackend, StoreError, StoreFuture, StoreKey,
		StoredEntry,
	},
};

/// One table of indexed records inside a shared backend.
#[derive(Clone)]
pub struct TableStore {
	backend: Arc<dyn KeyValueBackend>,
	table: String,
}
impl TableStore {
	/// Binds `table` inside `backend`.
	pub fn new(backend: Arc<dyn KeyValueBackend>, table: impl Into<String>) -> Self {
		Self { backend, table: table.into() }
	}

	/// Table name.
	pub fn table(&self) -> &str {
		&self.table
	}

	async fn record(&self, primary_key: &str) -> Result<Option<IndexedRecord>, StoreError> {
		let key = StoreKey::record(&self.table, primary_key);

		match self.backend.get(&key).await? {
			Some(StoredEntry::Record(record)) => Ok(Some(record)),
			Some(StoredEntry::Pointer { .. }) => Err(StoreError::Backend {
				message: format!("Record slot {primary_key} in {} holds an index entry", self.table),
			}),
			None => Ok(None),
		}
	}

	/// Removes the pointer under `secondary_key` only while it still resolves to
	/// `primary_key`; a pointer moved to another record is left alone.
	async fn retract_index(
		&self,
		secondary_key: &str,
		primary_key: &str,
	) -> Result<(), StoreError> {
		let key = StoreKey::index(&self.table, secondary_key);

		match self.backend.get(&key).await? {
			Some(StoredEntry::Pointer { primary_key: current }) if current == primary_key => {
				self.backend.delete(&key).await?;

				Ok(())
			},
			_ => Ok(()),
		}
	}
}
impl IndexedStore for TableStore {
	fn store(&self, record: IndexedRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let previous = self.record(&record.primary_key).await?;
			let primary_key = record.primary_key.clone();
			let secondary_key = record.secondary_key.clone();

			self.backend
				.put(
					StoreKey::index(&self.table, &secondary_key),
					StoredEntry::Pointer { primary_key: primary_key.clone() },
				)
				.await?;
			self.backend
				.put(StoreKey::record(&self.table, &primary_key), StoredEntry::Record(record))
				.await?;

			match previous {
				Some(previous) if previous.secondary_key != secondary_key =>
					self.retract_index(&previous.secondary_key, &primary_key).await,
				_ => Ok(()),
			}
		})
	}

	fn find_by_key<'a>(&'a self, primary_key: &'a str) -> StoreFuture<'a, Option<IndexedRecord>> {
		Box::pin(self.record(primary_key))
	}

	fn find_by_index<'a>(
		&'a self,
		secondary_key: &'a str,
	) -> StoreFuture<'a, Option<IndexedRecord>> {
		Box::pin(async move {
			let key = StoreKey::index(&self.table, secondary_key);
			let primary_key = match self.backend.get(&key).await? {
				Some(StoredEntry::Pointer { primary_key }) => primary_key,
				Some(StoredEntry::Record(_)) =>
					return Err(StoreError::Backend {
						message: format!(
							"Index slot {secondary_key} in {} holds a record",
							self.table
						),
					}),
				None => return Ok(None),
			};
			let record = self.record(&primary_key).await?;

			Ok(record.filter(|record| record.secondary_key == secondary_key))
		})
	}

	fn delete<'a>(&'a self, primary_key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let Some(record) = self.record(primary_key).await? else {
				return Ok(());
			};

			self.backend.delete(&StoreKey::record(&self.table, primary_key)).await?;
			self.retract_index(&record.secondary_key, primary_key).await
		})
	}

	fn records(&self) -> StoreFuture<'_, Vec<IndexedRecord>> {
		Box::pin(async move {
			let entries = self.backend.scan(&self.table).await?;

			Ok(entries
				.into_iter()
				.filter_map(|(_, entry)| match entry {
					StoredEntry::Record(record) => Some(record),
					StoredEntry::Pointer { .. } => None,
				})
				.collect())
		})
	}
}
impl Debug for TableStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TableStore").field("table", &self.table).finish()
	}
}

//! Indexed key-value storage for grant and device-code records.
//!
//! A [`KeyValueBackend`] offers atomic single-entry put/get/delete plus a per-table scan.
//! [`TableStore`] layers the [`IndexedStore`] contract on top of it: every record lives under
//! its primary key and a pointer entry under its secondary key resolves back to it.
//!
//! Writes touch two entries without a transaction. `store` writes the pointer before the
//! record and `delete` removes the record before the pointer, so an interrupted or racing
//! writer can at worst leave a stale pointer behind. Lookups by secondary key verify that the
//! resolved record still carries that key, so stale pointers read as absent.

pub mod device;
pub mod file;
pub mod grant;
pub mod memory;
pub mod table;

pub use device::{DeviceCode, DeviceFlowStore};
pub use file::FileBackend;
pub use grant::{GrantStore, PersistedGrant};
pub use memory::MemoryBackend;
pub use table::TableStore;

// self
use crate::_prelude::*;

/// Boxed future returned by storage contracts.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Atomic single-entry key-value storage partitioned into tables.
pub trait KeyValueBackend
where
	Self: Send + Sync,
{
	/// Inserts or replaces one entry.
	fn put(&self, key: StoreKey, entry: StoredEntry) -> StoreFuture<'_, ()>;

	/// Reads one entry.
	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<StoredEntry>>;

	/// Removes one entry; returns `true` if it existed.
	fn delete<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool>;

	/// Lists every entry of `table` in unspecified order.
	fn scan<'a>(&'a self, table: &'a str) -> StoreFuture<'a, Vec<(StoreKey, StoredEntry)>>;
}

/// Record store with one primary key and one unique secondary index per record.
pub trait IndexedStore
where
	Self: Send + Sync,
{
	/// Creates or replaces the record under its primary key and (re)points its secondary key.
	fn store(&self, record: IndexedRecord) -> StoreFuture<'_, ()>;

	/// Looks a record up by primary key.
	fn find_by_key<'a>(&'a self, primary_key: &'a str) -> StoreFuture<'a, Option<IndexedRecord>>;

	/// Looks a record up by secondary key.
	fn find_by_index<'a>(
		&'a self,
		secondary_key: &'a str,
	) -> StoreFuture<'a, Option<IndexedRecord>>;

	/// Deletes the record and retracts its secondary index; absent records are a no-op.
	fn delete<'a>(&'a self, primary_key: &'a str) -> StoreFuture<'a, ()>;

	/// Lists every record.
	fn records(&self) -> StoreFuture<'_, Vec<IndexedRecord>>;
}

/// Error type produced by storage implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend or a payload codec.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// An update targeted a record that does not exist.
	#[error("No record is stored under {key}.")]
	Missing {
		/// Key that was looked up.
		key: String,
	},
}

/// Which kind of entry a [`StoreKey`] addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
	/// Record stored under its primary key.
	Record,
	/// Pointer stored under a secondary key.
	Index,
}

/// Unique key of one backend entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
	/// Table (partition) the entry belongs to.
	pub table: String,
	/// Entry kind.
	pub kind: EntryKind,
	/// Primary or secondary key value.
	pub key: String,
}
impl StoreKey {
	/// Key of the record stored under `primary_key`.
	pub fn record(table: &str, primary_key: &str) -> Self {
		Self { table: table.to_owned(), kind: EntryKind::Record, key: primary_key.to_owned() }
	}

	/// Key of the pointer stored under `secondary_key`.
	pub fn index(table: &str, secondary_key: &str) -> Self {
		Self { table: table.to_owned(), kind: EntryKind::Index, key: secondary_key.to_owned() }
	}
}

/// Value of one backend entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredEntry {
	/// A full record.
	Record(IndexedRecord),
	/// Secondary index entry resolving to a primary key.
	Pointer {
		/// Primary key the index resolves to.
		primary_key: String,
	},
}

/// Opaque record addressed by a primary key and one secondary key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedRecord {
	/// Unique primary key.
	pub primary_key: String,
	/// Unique secondary key.
	pub secondary_key: String,
	/// Opaque payload bytes.
	#[serde(with = "payload_base64")]
	pub payload: Vec<u8>,
}
impl IndexedRecord {
	/// Creates a record from raw payload bytes.
	pub fn new(
		primary_key: impl Into<String>,
		secondary_key: impl Into<String>,
		payload: Vec<u8>,
	) -> Self {
		Self { primary_key: primary_key.into(), secondary_key: secondary_key.into(), payload }
	}

	/// Creates a record whose payload is the JSON encoding of `value`.
	pub fn from_json<T>(
		primary_key: impl Into<String>,
		secondary_key: impl Into<String>,
		value: &T,
	) -> Result<Self, StoreError>
	where
		T: Serialize,
	{
		let payload = serde_json::to_vec(value).map_err(|e| StoreError::Serialization {
			message: format!("Failed to encode record payload: {e}"),
		})?;

		Ok(Self::new(primary_key, secondary_key, payload))
	}

	/// Decodes the JSON payload.
	pub fn decode<T>(&self) -> Result<T, StoreError>
	where
		T: DeserializeOwned,
	{
		serde_json::from_slice(&self.payload).map_err(|e| StoreError::Serialization {
			message: format!("Failed to decode payload of {}: {e}", self.primary_key),
		})
	}
}

mod payload_base64 {
	// crates.io
	use base64::{Engine, engine::general_purpose::STANDARD};
	use serde::{Deserializer, Serializer};
	// self
	use super::*;

	pub fn serialize<S>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&STANDARD.encode(payload))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let encoded = String::deserialize(deserializer)?;

		STANDARD.decode(encoded).map_err(serde::de::Error::custom)
	}
}

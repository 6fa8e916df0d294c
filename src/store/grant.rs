//! Persisted grant store (authorization codes, refresh tokens, consents).
//!
//! Records are stored under the URL-safe base64 SHA-256 digest of the grant handle and
//! indexed by the raw handle, so handles of any length and alphabet map to stable keys.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	store::{IndexedRecord, IndexedStore, KeyValueBackend, StoreError, TableStore},
};

/// Default table name for persisted grants.
pub const GRANT_TABLE: &str = "persistedgrants";

/// A grant issued by the token service and persisted between requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGrant {
	/// Opaque grant handle.
	pub key: String,
	/// Grant type (e.g., `authorization_code`, `refresh_token`).
	#[serde(rename = "type")]
	pub grant_type: String,
	/// Subject the grant belongs to.
	pub subject_id: String,
	/// Client the grant was issued to.
	pub client_id: String,
	/// Creation instant.
	pub creation_time: OffsetDateTime,
	/// Expiry instant, if any.
	pub expiration: Option<OffsetDateTime>,
	/// Serialized grant data.
	pub data: String,
}

/// Grant persistence over a [`TableStore`].
#[derive(Clone, Debug)]
pub struct GrantStore {
	table: TableStore,
}
impl GrantStore {
	/// Binds the default grant table inside `backend`.
	pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
		Self { table: TableStore::new(backend, GRANT_TABLE) }
	}

	/// Uses an explicit table.
	pub fn with_table(table: TableStore) -> Self {
		Self { table }
	}

	/// Primary key derived from a grant handle.
	pub fn primary_key(handle: &str) -> String {
		URL_SAFE_NO_PAD.encode(Sha256::digest(handle.as_bytes()))
	}

	/// Stores or replaces `grant`.
	pub async fn store(&self, grant: &PersistedGrant) -> Result<(), StoreError> {
		let record = IndexedRecord::from_json(Self::primary_key(&grant.key), &grant.key, grant)?;

		self.table.store(record).await
	}

	/// Looks a grant up by handle.
	pub async fn get(&self, key: &str) -> Result<Option<PersistedGrant>, StoreError> {
		match self.table.find_by_index(key).await? {
			Some(record) => Ok(Some(record.decode()?)),
			None => Ok(None),
		}
	}

	/// Lists every grant of `subject_id`.
	pub async fn get_all(&self, subject_id: &str) -> Result<Vec<PersistedGrant>, StoreError> {
		let mut grants = Vec::new();

		for record in self.table.records().await? {
			let grant: PersistedGrant = record.decode()?;

			if grant.subject_id == subject_id {
				grants.push(grant);
			}
		}

		Ok(grants)
	}

	/// Removes the grant with handle `key`; absent grants are a no-op.
	pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.table.delete(&Self::primary_key(key)).await
	}

	/// Removes every grant of `subject_id` issued to `client_id`, optionally restricted to
	/// `grant_type`. Returns the number of removed grants.
	pub async fn remove_all(
		&self,
		subject_id: &str,
		client_id: &str,
		grant_type: Option<&str>,
	) -> Result<usize, StoreError> {
		let mut removed = 0;

		for grant in self.get_all(subject_id).await? {
			if grant.client_id != client_id {
				continue;
			}
			if grant_type.is_some_and(|grant_type| grant.grant_type != grant_type) {
				continue;
			}

			self.remove(&grant.key).await?;

			removed += 1;
		}

		Ok(removed)
	}
}

//! Device authorization flow store.
//!
//! Records are keyed by user code (what the user types on the verification page) and indexed
//! by device code (what the polling device presents).

// self
use crate::{
	_prelude::*,
	store::{IndexedRecord, IndexedStore, KeyValueBackend, StoreError, TableStore},
};

/// Default table name for device authorizations.
pub const DEVICE_TABLE: &str = "devicecodestore";

/// State of one pending or completed device authorization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCode {
	/// Client that started the flow.
	pub client_id: String,
	/// Creation instant.
	pub creation_time: OffsetDateTime,
	/// Lifetime in seconds.
	pub lifetime: u32,
	/// Whether `openid` was requested.
	#[serde(default)]
	pub is_open_id: bool,
	/// Whether the user approved the request.
	#[serde(default)]
	pub is_authorized: bool,
	/// Scopes requested by the device.
	#[serde(default)]
	pub requested_scopes: Vec<String>,
	/// Scopes granted by the user.
	#[serde(default)]
	pub authorized_scopes: Vec<String>,
	/// Subject that approved the request.
	#[serde(default)]
	pub subject_id: Option<String>,
	/// Session of the approving user.
	#[serde(default)]
	pub session_id: Option<String>,
}
impl DeviceCode {
	/// Returns `true` once the lifetime has elapsed at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.creation_time + Duration::seconds(i64::from(self.lifetime)) <= now
	}
}

/// Device authorization persistence over a [`TableStore`].
#[derive(Clone, Debug)]
pub struct DeviceFlowStore {
	table: TableStore,
}
impl DeviceFlowStore {
	/// Binds the default device table inside `backend`.
	pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
		Self { table: TableStore::new(backend, DEVICE_TABLE) }
	}

	/// Uses an explicit table.
	pub fn with_table(table: TableStore) -> Self {
		Self { table }
	}

	/// Stores a new authorization; an existing record for `user_code` is replaced.
	pub async fn store_device_authorization(
		&self,
		device_code: &str,
		user_code: &str,
		data: &DeviceCode,
	) -> Result<(), StoreError> {
		self.table.store(IndexedRecord::from_json(user_code, device_code, data)?).await
	}

	/// Looks an authorization up by user code.
	pub async fn find_by_user_code(&self, user_code: &str) -> Result<Option<DeviceCode>, StoreError> {
		decode(self.table.find_by_key(user_code).await?)
	}

	/// Looks an authorization up by device code.
	pub async fn find_by_device_code(
		&self,
		device_code: &str,
	) -> Result<Option<DeviceCode>, StoreError> {
		decode(self.table.find_by_index(device_code).await?)
	}

	/// Replaces the data of an existing authorization, keeping its device code.
	pub async fn update_by_user_code(
		&self,
		user_code: &str,
		data: &DeviceCode,
	) -> Result<(), StoreError> {
		let existing = self
			.table
			.find_by_key(user_code)
			.await?
			.ok_or_else(|| StoreError::Missing { key: user_code.to_owned() })?;

		self.table.store(IndexedRecord::from_json(user_code, existing.secondary_key, data)?).await
	}

	/// Removes the authorization holding `device_code`; absent records are a no-op.
	pub async fn remove_by_device_code(&self, device_code: &str) -> Result<(), StoreError> {
		match self.table.find_by_index(device_code).await? {
			Some(record) => self.table.delete(&record.primary_key).await,
			None => Ok(()),
		}
	}
}

fn decode(record: Option<IndexedRecord>) -> Result<Option<DeviceCode>, StoreError> {
	record.map(|record| record.decode()).transpose()
}

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use time::macros::datetime;
// self
use directory_broker::store::{
	DeviceCode, DeviceFlowStore, GrantStore, IndexedRecord, IndexedStore, KeyValueBackend,
	MemoryBackend, PersistedGrant, StoreError, TableStore,
};

fn table() -> (MemoryBackend, TableStore) {
	let backend = MemoryBackend::default();
	let table = TableStore::new(Arc::new(backend.clone()), "records");

	(backend, table)
}

fn grant(key: &str, subject: &str, client: &str, grant_type: &str) -> PersistedGrant {
	PersistedGrant {
		key: key.into(),
		grant_type: grant_type.into(),
		subject_id: subject.into(),
		client_id: client.into(),
		creation_time: datetime!(2026-01-01 00:00 UTC),
		expiration: Some(datetime!(2026-01-02 00:00 UTC)),
		data: format!("{{\"handle\":\"{key}\"}}"),
	}
}

fn device_code(authorized: bool) -> DeviceCode {
	DeviceCode {
		client_id: "tv-app".into(),
		creation_time: datetime!(2026-01-01 00:00 UTC),
		lifetime: 300,
		is_open_id: true,
		is_authorized: authorized,
		requested_scopes: vec!["openid".into(), "profile".into()],
		authorized_scopes: if authorized { vec!["openid".into()] } else { Vec::new() },
		subject_id: authorized.then(|| "user-1".into()),
		session_id: None,
	}
}

#[tokio::test]
async fn records_resolve_by_both_keys_and_delete_is_idempotent() -> Result<()> {
	let (backend, table) = table();

	table.store(IndexedRecord::new("k1", "s1", b"payload".to_vec())).await?;

	let by_key = table.find_by_key("k1").await?.ok_or_else(|| eyre!("record by key"))?;
	let by_index = table.find_by_index("s1").await?.ok_or_else(|| eyre!("record by index"))?;

	assert_eq!(by_key, by_index);
	assert_eq!(by_key.payload, b"payload");
	assert_eq!(backend.len(), 2);

	table.delete("k1").await?;
	table.delete("k1").await?;

	assert_eq!(table.find_by_key("k1").await?, None);
	assert_eq!(table.find_by_index("s1").await?, None);
	assert!(backend.is_empty());

	Ok(())
}

#[tokio::test]
async fn restoring_a_record_retracts_its_old_index() -> Result<()> {
	let (backend, table) = table();

	table.store(IndexedRecord::new("u1", "d1", b"X".to_vec())).await?;
	table.store(IndexedRecord::new("u1", "d2", b"Y".to_vec())).await?;

	assert_eq!(table.find_by_index("d1").await?, None);
	assert_eq!(
		table.find_by_index("d2").await?.map(|record| record.payload),
		Some(b"Y".to_vec())
	);
	assert_eq!(backend.len(), 2);

	Ok(())
}

#[tokio::test]
async fn secondary_key_moves_to_the_latest_writer() -> Result<()> {
	let (_, table) = table();

	table.store(IndexedRecord::new("k1", "s1", b"first".to_vec())).await?;
	table.store(IndexedRecord::new("k2", "s1", b"second".to_vec())).await?;

	let owner = table.find_by_index("s1").await?.ok_or_else(|| eyre!("moved index"))?;

	assert_eq!(owner.primary_key, "k2");

	// The previous owner keeps its record but no longer answers for the index.
	table.delete("k1").await?;

	let owner = table.find_by_index("s1").await?.ok_or_else(|| eyre!("surviving index"))?;

	assert_eq!(owner.primary_key, "k2");

	Ok(())
}

#[tokio::test]
async fn tables_sharing_a_backend_are_isolated() -> Result<()> {
	let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::default());
	let grants = TableStore::new(backend.clone(), "grants");
	let devices = TableStore::new(backend, "devices");

	grants.store(IndexedRecord::new("k", "s", b"grant".to_vec())).await?;
	devices.store(IndexedRecord::new("k", "s", b"device".to_vec())).await?;

	assert_eq!(grants.records().await?.len(), 1);
	assert_eq!(
		devices.find_by_index("s").await?.map(|record| record.payload),
		Some(b"device".to_vec())
	);

	Ok(())
}

#[tokio::test]
async fn grant_store_filters_and_bulk_removes() -> Result<()> {
	let store = GrantStore::new(Arc::new(MemoryBackend::default()));

	store.store(&grant("code-1", "alice", "web", "authorization_code")).await?;
	store.store(&grant("refresh-1", "alice", "web", "refresh_token")).await?;
	store.store(&grant("refresh-2", "alice", "cli", "refresh_token")).await?;
	store.store(&grant("refresh-3", "bob", "web", "refresh_token")).await?;

	let fetched = store.get("code-1").await?.ok_or_else(|| eyre!("stored grant"))?;

	assert_eq!(fetched, grant("code-1", "alice", "web", "authorization_code"));
	assert_eq!(store.get_all("alice").await?.len(), 3);
	assert_eq!(store.remove_all("alice", "web", Some("refresh_token")).await?, 1);
	assert_eq!(store.remove_all("alice", "web", None).await?, 1);
	assert_eq!(store.get_all("alice").await?.len(), 1);
	assert_eq!(store.get_all("bob").await?.len(), 1);

	store.remove("refresh-3").await?;
	store.remove("refresh-3").await?;

	assert_eq!(store.get("refresh-3").await?, None);

	Ok(())
}

#[tokio::test]
async fn device_flow_lifecycle() -> Result<()> {
	let store = DeviceFlowStore::new(Arc::new(MemoryBackend::default()));

	store.store_device_authorization("device-abc", "USER-123", &device_code(false)).await?;

	assert_eq!(store.find_by_device_code("device-abc").await?, Some(device_code(false)));

	store.update_by_user_code("USER-123", &device_code(true)).await?;

	let approved =
		store.find_by_device_code("device-abc").await?.ok_or_else(|| eyre!("approved code"))?;

	assert!(approved.is_authorized);
	assert_eq!(approved.subject_id.as_deref(), Some("user-1"));
	assert_eq!(store.find_by_user_code("USER-123").await?, Some(approved));

	let missing = store.update_by_user_code("USER-999", &device_code(true)).await;

	assert_eq!(missing, Err(StoreError::Missing { key: "USER-999".into() }));

	store.remove_by_device_code("device-abc").await?;
	store.remove_by_device_code("device-abc").await?;

	assert_eq!(store.find_by_user_code("USER-123").await?, None);

	Ok(())
}

//! File-backed [`KeyValueBackend`] persisting a JSON snapshot after each mutation.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{KeyValueBackend, StoreError, StoreFuture, StoreKey, StoredEntry},
};

/// Persists every table to one JSON file, replaced atomically on each write.
///
/// A mutation becomes visible in-process only after its snapshot reached the disk.
#[derive(Clone, Debug)]
pub struct FileBackend {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<StoreKey, StoredEntry>>>,
}
impl FileBackend {
	/// Opens (or creates) a backend at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist_locked(&self, contents: &BTreeMap<StoreKey, StoredEntry>) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| backend_error("create", &tmp_path, e))?;

			file.write_all(&serialized).map_err(|e| backend_error("write", &tmp_path, e))?;
			file.sync_all().map_err(|e| backend_error("sync", &tmp_path, e))?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| backend_error("replace", &self.path, e))
	}
}
impl KeyValueBackend for FileBackend {
	fn put(&self, key: StoreKey, entry: StoredEntry) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			next.insert(key, entry);
			self.persist_locked(&next)?;

			*guard = next;

			Ok(())
		})
	}

	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<StoredEntry>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}

	fn delete<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if !guard.contains_key(key) {
				return Ok(false);
			}

			let mut next = guard.clone();

			next.remove(key);
			self.persist_locked(&next)?;

			*guard = next;

			Ok(true)
		})
	}

	fn scan<'a>(&'a self, table: &'a str) -> StoreFuture<'a, Vec<(StoreKey, StoredEntry)>> {
		Box::pin(async move {
			Ok(self
				.inner
				.read()
				.iter()
				.filter(|(key, _)| key.table == table)
				.map(|(key, entry)| (key.clone(), entry.clone()))
				.collect())
		})
	}
}

fn load_snapshot(path: &Path) -> Result<BTreeMap<StoreKey, StoredEntry>, StoreError> {
	if !path.exists() {
		return Ok(BTreeMap::new());
	}

	let bytes = fs::read(path).map_err(|e| backend_error("read", path, e))?;

	if bytes.is_empty() {
		return Ok(BTreeMap::new());
	}

	let entries: Vec<(StoreKey, StoredEntry)> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(entries.into_iter().collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend_error("create directory", parent, e))?;
	}

	Ok(())
}

fn backend_error(action: &str, path: &Path, e: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

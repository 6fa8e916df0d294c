//! Typed directory API operations built on the [`RequestPipeline`].
//!
//! Every method maps to one pipeline call; upstream rejections come back as
//! [`NormalizedError`](crate::pipeline::NormalizedError) data exactly as the pipeline returns
//! them.

pub mod application;
pub mod user;

pub use application::*;
pub use user::*;

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::ObjectId,
	error::ConfigError,
	pipeline::{ApiResult, RequestPipeline},
};

/// OData collection wrapper (`{"value": [...]}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ODataCollection<T> {
	/// Collection items.
	pub value: Vec<T>,
}

/// Directory API client for users, group membership, and application extensions.
#[derive(Clone, Debug)]
pub struct DirectoryClient {
	pipeline: RequestPipeline,
}
impl DirectoryClient {
	/// Wraps a pipeline.
	pub fn new(pipeline: RequestPipeline) -> Self {
		Self { pipeline }
	}

	/// Underlying pipeline.
	pub fn pipeline(&self) -> &RequestPipeline {
		&self.pipeline
	}

	/// Reads one user.
	pub async fn get_user(&self, object_id: &ObjectId) -> Result<ApiResult<DirectoryUser>> {
		self.pipeline.get(&format!("/users/{object_id}"), None).await
	}

	/// Finds the user owning `sign_in_name`; `Ok(Ok(None))` when nobody matches.
	pub async fn find_user_by_sign_in_name(
		&self,
		sign_in_name: &str,
	) -> Result<ApiResult<Option<DirectoryUser>>> {
		let literal = sign_in_name.replace('\'', "''");
		let literal: String = form_urlencoded::byte_serialize(literal.as_bytes()).collect();
		let query = format!("$filter=signInNames/any(x:x/value eq '{literal}')");
		let users: ApiResult<ODataCollection<DirectoryUser>> =
			self.pipeline.get("/users", Some(&query)).await?;

		Ok(users.map(|users| users.value.into_iter().next()))
	}

	/// Lists users, optionally narrowed by an OData query (`$filter=...`, `$top=...`).
	pub async fn list_users(&self, query: Option<&str>) -> Result<ApiResult<Vec<DirectoryUser>>> {
		let users: ApiResult<ODataCollection<DirectoryUser>> =
			self.pipeline.get("/users", query).await?;

		Ok(users.map(|users| users.value))
	}

	/// Object identifiers of the security groups `object_id` belongs to.
	pub async fn member_groups(&self, object_id: &ObjectId) -> Result<ApiResult<Vec<String>>> {
		let body = to_body(&serde_json::json!({ "securityEnabledOnly": true }))?;
		let groups: ApiResult<ODataCollection<String>> = self
			.pipeline
			.post(&format!("/users/{object_id}/getMemberGroups"), None, Some(body))
			.await?;

		Ok(groups.map(|groups| groups.value))
	}

	/// Creates a user.
	///
	/// Every e-mail sign-in name gains a `userName` alias and the addresses replace
	/// `otherMails`.
	pub async fn create_user(&self, mut user: DirectoryUser) -> Result<ApiResult<DirectoryUser>> {
		user.other_mails = expand_sign_in_names(&mut user.sign_in_names);

		let body = to_body(&user)?;

		self.pipeline.post("/users", None, Some(body)).await
	}

	/// Applies a partial update. Sign-in names, when present, are expanded like
	/// [`create_user`](Self::create_user) does.
	pub async fn update_user(
		&self,
		object_id: &ObjectId,
		mut patch: UserPatch,
	) -> Result<ApiResult<()>> {
		if let Some(names) = patch.sign_in_names.as_mut() {
			patch.other_mails = Some(expand_sign_in_names(names));
		}

		let body = to_body(&patch)?;

		self.pipeline.patch(&format!("/users/{object_id}"), None, Some(body)).await
	}

	/// Deletes a user; a rejection is a hard failure.
	pub async fn delete_user(&self, object_id: &ObjectId) -> Result<String> {
		self.pipeline.delete(&format!("/users/{object_id}"), None).await
	}

	/// Registers an extension property on the application `app_object_id`.
	pub async fn register_extension(
		&self,
		app_object_id: &ObjectId,
		extension: &ExtensionProperty,
	) -> Result<ApiResult<ExtensionProperty>> {
		let body = to_body(extension)?;

		self.pipeline
			.post(&format!("/applications/{app_object_id}/extensionProperties"), None, Some(body))
			.await
	}

	/// Removes an extension property; a rejection is a hard failure.
	pub async fn unregister_extension(
		&self,
		app_object_id: &ObjectId,
		extension_object_id: &ObjectId,
	) -> Result<String> {
		self.pipeline
			.delete(
				&format!("/applications/{app_object_id}/extensionProperties/{extension_object_id}"),
				None,
			)
			.await
	}

	/// Extension properties registered on `app_object_id`.
	pub async fn extensions(
		&self,
		app_object_id: &ObjectId,
	) -> Result<ApiResult<Vec<ExtensionProperty>>> {
		let extensions: ApiResult<ODataCollection<ExtensionProperty>> = self
			.pipeline
			.get(&format!("/applications/{app_object_id}/extensionProperties"), None)
			.await?;

		Ok(extensions.map(|extensions| extensions.value))
	}

	/// Lists application registrations, optionally narrowed by an OData query.
	pub async fn applications(&self, query: Option<&str>) -> Result<ApiResult<Vec<Application>>> {
		let applications: ApiResult<ODataCollection<Application>> =
			self.pipeline.get("/applications", query).await?;

		Ok(applications.map(|applications| applications.value))
	}
}

fn to_body<T>(value: &T) -> Result<String>
where
	T: ?Sized + Serialize,
{
	Ok(serde_json::to_string(value).map_err(ConfigError::from)?)
}

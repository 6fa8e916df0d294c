//! Application registrations and their directory extension properties.

// self
use crate::{_prelude::*, auth::ObjectId};

/// Application registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
	/// Object identifier of the registration (used in extension paths).
	pub object_id: ObjectId,
	/// Application (client) identifier.
	#[serde(default)]
	pub app_id: Option<String>,
	/// Display name.
	#[serde(default)]
	pub display_name: Option<String>,
	/// Fields outside the typed schema.
	#[serde(flatten)]
	pub additional_fields: BTreeMap<String, serde_json::Value>,
}

/// Custom attribute registered on an application and exposed on target objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionProperty {
	/// Object identifier assigned by the directory.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub object_id: Option<ObjectId>,
	/// Property name; the directory prefixes it with `extension_<appId>_`.
	pub name: String,
	/// Data type (e.g., `String`, `Integer`).
	pub data_type: String,
	/// Object types the property applies to (e.g., `User`).
	#[serde(default)]
	pub target_objects: Vec<String>,
	/// Fields outside the typed schema.
	#[serde(flatten)]
	pub additional_fields: BTreeMap<String, serde_json::Value>,
}
impl ExtensionProperty {
	/// String property targeting users.
	pub fn user_string(name: impl Into<String>) -> Self {
		Self {
			object_id: None,
			name: name.into(),
			data_type: "String".into(),
			target_objects: vec!["User".into()],
			additional_fields: BTreeMap::new(),
		}
	}
}

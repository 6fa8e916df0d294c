//! User entity in the reduced schema the broker reads and writes.

// self
use crate::{
	_prelude::*,
	auth::{ObjectId, TokenSecret},
};

/// Sign-in name type for e-mail addresses.
pub const SIGN_IN_EMAIL: &str = "emailAddress";
/// Sign-in name type for plain user names.
pub const SIGN_IN_USER_NAME: &str = "userName";
/// Creation type of accounts managed by the directory itself.
pub const LOCAL_ACCOUNT: &str = "LocalAccount";
/// Password policies applied to accounts created through [`DirectoryUser::local_account`].
pub const DEFAULT_PASSWORD_POLICIES: &str = "DisablePasswordExpiration,DisableStrongPassword";

/// One way a user can sign in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInName {
	/// Sign-in name type ([`SIGN_IN_EMAIL`], [`SIGN_IN_USER_NAME`]).
	#[serde(rename = "type")]
	pub kind: String,
	/// Sign-in value.
	pub value: String,
}
impl SignInName {
	/// E-mail sign-in name.
	pub fn email(value: impl Into<String>) -> Self {
		Self { kind: SIGN_IN_EMAIL.into(), value: value.into() }
	}

	/// Plain user-name sign-in name.
	pub fn user_name(value: impl Into<String>) -> Self {
		Self { kind: SIGN_IN_USER_NAME.into(), value: value.into() }
	}

	/// Returns `true` for e-mail sign-in names.
	pub fn is_email(&self) -> bool {
		self.kind == SIGN_IN_EMAIL
	}
}

/// Write-only password profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordProfile {
	/// New password.
	pub password: TokenSecret,
	/// Forces a password change at the next sign-in.
	#[serde(default)]
	pub force_change_password_next_login: bool,
}
impl PasswordProfile {
	/// Profile that sets `password` without forcing a change.
	pub fn new(password: impl Into<TokenSecret>) -> Self {
		Self { password: password.into(), force_change_password_next_login: false }
	}
}

/// Directory user.
///
/// Only the fields the broker reads are typed; everything else the directory returns is kept in
/// [`additional_fields`](Self::additional_fields) and written back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
	/// Object identifier assigned by the directory.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub object_id: Option<ObjectId>,
	/// Whether the account can sign in.
	#[serde(default = "enabled")]
	pub account_enabled: bool,
	/// Sign-in names.
	#[serde(default)]
	pub sign_in_names: Vec<SignInName>,
	/// Creation type (e.g., [`LOCAL_ACCOUNT`]).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub creation_type: Option<String>,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	/// Given name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub given_name: Option<String>,
	/// Surname.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub surname: Option<String>,
	/// Phone number as stored by the directory.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub facsimile_telephone_number: Option<String>,
	/// Mail alias.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mail_nickname: Option<String>,
	/// Additional e-mail addresses.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub other_mails: Vec<String>,
	/// Password profile; only sent on writes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password_profile: Option<PasswordProfile>,
	/// Password policies.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub password_policies: Option<String>,
	/// Fields outside the typed schema.
	#[serde(flatten)]
	pub additional_fields: BTreeMap<String, serde_json::Value>,
}
impl DirectoryUser {
	/// Local account that signs in with `user_name`.
	pub fn local_account(
		user_name: impl Into<String>,
		password: impl Into<TokenSecret>,
		display_name: Option<String>,
	) -> Self {
		let user_name = user_name.into();

		Self {
			object_id: None,
			account_enabled: true,
			sign_in_names: vec![SignInName::user_name(user_name.clone())],
			creation_type: Some(LOCAL_ACCOUNT.into()),
			display_name: Some(display_name.unwrap_or(user_name)),
			given_name: None,
			surname: None,
			facsimile_telephone_number: None,
			mail_nickname: None,
			other_mails: Vec::new(),
			password_profile: Some(PasswordProfile::new(password)),
			password_policies: Some(DEFAULT_PASSWORD_POLICIES.into()),
			additional_fields: BTreeMap::new(),
		}
	}
}

/// Partial user update; `None` fields are omitted from the request body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
	/// New display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	/// New password.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password_profile: Option<PasswordProfile>,
	/// New given name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub given_name: Option<String>,
	/// New surname.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub surname: Option<String>,
	/// New phone number.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub facsimile_telephone_number: Option<String>,
	/// Replacement sign-in names.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sign_in_names: Option<Vec<SignInName>>,
	/// Replacement additional e-mail addresses.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub other_mails: Option<Vec<String>>,
}

/// Adds a `userName` alias (`@` replaced by `_`) for every e-mail sign-in name and returns the
/// e-mail addresses so callers can mirror them into `otherMails`.
pub fn expand_sign_in_names(names: &mut Vec<SignInName>) -> Vec<String> {
	let mails: Vec<String> =
		names.iter().filter(|name| name.is_email()).map(|name| name.value.clone()).collect();

	names.extend(mails.iter().map(|mail| SignInName::user_name(mail.replace('@', "_"))));

	mails
}

fn enabled() -> bool {
	true
}

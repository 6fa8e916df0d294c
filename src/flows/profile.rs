//! Profile claims derived from directory users.

// self
use crate::{
	_prelude::*,
	auth::ObjectId,
	directory::{DirectoryClient, DirectoryUser},
	pipeline::ApiResult,
};

/// `name` claim type.
pub const CLAIM_NAME: &str = "name";
/// `family_name` claim type.
pub const CLAIM_FAMILY_NAME: &str = "family_name";
/// `given_name` claim type.
pub const CLAIM_GIVEN_NAME: &str = "given_name";
/// `phone_number` claim type.
pub const CLAIM_PHONE_NUMBER: &str = "phone_number";
/// `role` claim type.
pub const CLAIM_ROLE: &str = "role";

/// Type/value pair issued into tokens or userinfo responses.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
	/// Claim type.
	#[serde(rename = "type")]
	pub kind: String,
	/// Claim value.
	pub value: String,
}
impl Claim {
	/// Creates a claim.
	pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
		Self { kind: kind.into(), value: value.into() }
	}
}

/// Builds profile claims from the directory.
#[derive(Clone, Debug)]
pub struct ProfileEnricher {
	directory: DirectoryClient,
}
impl ProfileEnricher {
	/// Wraps a directory client.
	pub fn new(directory: DirectoryClient) -> Self {
		Self { directory }
	}

	/// Claims carried by `user`.
	///
	/// `name` and `given_name` are always present (empty when the directory has no value);
	/// `family_name` and `phone_number` only when set.
	pub fn user_claims(user: &DirectoryUser) -> Vec<Claim> {
		let mut claims = vec![Claim::new(CLAIM_NAME, user.display_name.clone().unwrap_or_default())];

		if let Some(surname) = user.surname.as_deref().filter(|s| !s.is_empty()) {
			claims.push(Claim::new(CLAIM_FAMILY_NAME, surname));
		}

		claims.push(Claim::new(CLAIM_GIVEN_NAME, user.given_name.clone().unwrap_or_default()));

		if let Some(phone) =
			user.facsimile_telephone_number.as_deref().filter(|s| !s.trim().is_empty())
		{
			claims.push(Claim::new(CLAIM_PHONE_NUMBER, phone));
		}

		claims
	}

	/// Claims of `subject` restricted to `requested` claim types.
	///
	/// Group memberships are only fetched when `role` is requested. Nothing is fetched when
	/// `requested` is empty.
	pub async fn profile_claims(
		&self,
		subject: &ObjectId,
		requested: &[&str],
	) -> Result<ApiResult<Vec<Claim>>> {
		if requested.is_empty() {
			return Ok(Ok(Vec::new()));
		}

		let user = match self.directory.get_user(subject).await? {
			Ok(user) => user,
			Err(error) => return Ok(Err(error)),
		};
		let mut claims = Self::user_claims(&user);

		if requested.contains(&CLAIM_ROLE) {
			match self.directory.member_groups(subject).await? {
				Ok(groups) =>
					claims.extend(groups.into_iter().map(|group| Claim::new(CLAIM_ROLE, group))),
				Err(error) => return Ok(Err(error)),
			}
		}

		claims.retain(|claim| requested.contains(&claim.kind.as_str()));

		Ok(Ok(claims))
	}

	/// Directory users are always considered active.
	pub fn is_active(&self, _subject: &ObjectId) -> bool {
		true
	}
}

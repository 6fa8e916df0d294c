//! Auth-domain identifiers, secrets, credentials, and the credential provider.

pub mod credential;
pub mod id;
pub mod provider;
pub mod secret;

pub use credential::*;
pub use id::*;
pub use provider::*;
pub use secret::*;

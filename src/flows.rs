//! Identity flows that consume the credential provider, the token endpoint, and the directory
//! client.

pub mod password;
pub mod profile;

pub use password::*;
pub use profile::*;

//! Credential acquisition against the identity provider.
//!
//! One call, one token: the client-credentials grant is performed once per
//! synthesis session and the resulting bearer token is dropped with the
//! session. Retry and caching, if ever wanted, belong to whatever
//! orchestrates whole sessions, not here.

mod client;
mod error;

pub use client::{Credential, IdentityClient, TokenProvider};
pub use error::{AuthError, AuthResult};

#[cfg(test)]
pub(crate) use client::MockTokenProvider;

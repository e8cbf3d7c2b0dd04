//! Request correlation: trace-id generation and outbound call metadata.

use rand::Rng;
use tonic::metadata::{Ascii, MetadataMap, MetadataValue};

use crate::core::auth::Credential;
use crate::errors::InvalidArgument;

/// Metadata key carrying the bearer token.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Metadata key carrying the client-generated correlation id. Echoed back by
/// the service in its initial response metadata.
pub const TRACE_ID_KEY: &str = "external_trace_id";

/// A client-generated correlation identifier.
///
/// Drawn uniformly from a fixed 10-digit range, so ids are unique per
/// invocation with high probability. That is all they are good for: log
/// correlation. They carry no idempotency or security meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(String);

impl TraceId {
    /// Generates a fresh trace id. No I/O, best-effort uniqueness only.
    pub fn generate() -> Self {
        let id = rand::thread_rng().gen_range(1_000_000_000u64..10_000_000_000u64);
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The metadata attached to the outbound streaming call: exactly one
/// `authorization: Bearer <token>` entry and exactly one `external_trace_id`
/// entry, in that order.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    authorization: MetadataValue<Ascii>,
    trace: MetadataValue<Ascii>,
}

impl RequestMetadata {
    /// Builds the call metadata from a credential and a trace id.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if the credential token is empty or not
    /// representable as an ASCII header value.
    pub fn new(credential: &Credential, trace_id: &TraceId) -> Result<Self, InvalidArgument> {
        let token = credential.token();
        if token.is_empty() {
            return Err(InvalidArgument("credential token is empty".to_string()));
        }

        let authorization: MetadataValue<Ascii> = format!("Bearer {token}")
            .parse()
            .map_err(|_| InvalidArgument("bearer token is not valid ASCII".to_string()))?;
        let trace: MetadataValue<Ascii> = trace_id
            .as_str()
            .parse()
            .map_err(|_| InvalidArgument("trace id is not valid ASCII".to_string()))?;

        Ok(Self {
            authorization,
            trace,
        })
    }

    /// Inserts both entries into `map`, replacing any existing values so the
    /// keys are never duplicated.
    pub fn apply(&self, map: &mut MetadataMap) {
        map.insert(AUTHORIZATION_KEY, self.authorization.clone());
        map.insert(TRACE_ID_KEY, self.trace.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_trace_id_is_numeric() {
        let id = TraceId::generate();
        assert!(id.as_str().chars().all(|c| c.is_ascii_digit()));
        assert_eq!(id.as_str().len(), 10);
    }

    #[test]
    fn test_trace_ids_do_not_collide_in_practice() {
        // Uniqueness is best-effort, not guaranteed; over a 10-digit range a
        // thousand draws colliding would indicate a broken generator.
        let ids: HashSet<String> = (0..1000)
            .map(|_| TraceId::generate().as_str().to_string())
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_metadata_contains_bearer_and_trace_entries() {
        let credential = Credential::new("tok-abc", 60);
        let trace_id = TraceId::generate();
        let metadata = RequestMetadata::new(&credential, &trace_id).unwrap();

        let mut map = MetadataMap::new();
        metadata.apply(&mut map);

        let auth: Vec<_> = map.get_all(AUTHORIZATION_KEY).iter().collect();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].to_str().unwrap(), "Bearer tok-abc");

        let trace: Vec<_> = map.get_all(TRACE_ID_KEY).iter().collect();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].to_str().unwrap(), trace_id.as_str());
    }

    #[test]
    fn test_apply_never_duplicates_keys() {
        let credential = Credential::new("tok-abc", 60);
        let trace_id = TraceId::generate();
        let metadata = RequestMetadata::new(&credential, &trace_id).unwrap();

        let mut map = MetadataMap::new();
        metadata.apply(&mut map);
        metadata.apply(&mut map);

        assert_eq!(map.get_all(AUTHORIZATION_KEY).iter().count(), 1);
        assert_eq!(map.get_all(TRACE_ID_KEY).iter().count(), 1);
    }

    #[test]
    fn test_empty_credential_rejected() {
        let credential = Credential::new("", 60);
        let result = RequestMetadata::new(&credential, &TraceId::generate());
        assert!(result.is_err());
    }

    #[test]
    fn test_non_ascii_token_rejected() {
        let credential = Credential::new("tok\u{2603}", 60);
        let result = RequestMetadata::new(&credential, &TraceId::generate());
        assert!(result.is_err());
    }
}

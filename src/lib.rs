pub mod config;
pub mod core;
pub mod delivery;
pub mod errors;
pub mod proto;

// Re-export commonly used items for convenience
pub use self::config::{Config, ConfigError, DeliveryConfig, SsoConfig};
pub use self::core::auth::{AuthError, Credential, IdentityClient, TokenProvider};
pub use self::core::pipeline::{synthesize_to_file, SynthesisOutcome};
pub use self::core::synthesis::{AssemblyError, AudioFile, ResponseMetadata, StreamFailure};
pub use self::core::trace::TraceId;
pub use self::delivery::{DeliveryError, TelegramDelivery};
pub use self::errors::{ClientError, ClientResult, InvalidArgument};

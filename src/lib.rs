#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the doorman application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod errors;
pub mod flow;
pub mod handlers;
pub mod identity;
pub mod providers;
pub mod settings;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use errors::AuthError;
pub use flow::{handle_flow, FlowOutcome, FlowRequest};
pub use identity::{AppVariant, CanonicalIdentity};
pub use providers::{AppleProvider, CallbackPayload, GoogleProvider, ProviderAdapter};
pub use settings::DoormanSettings;
pub use state::{decode_state, encode_state, FlowState};

//! Twilio webhook relay.
//!
//! This library backs the `relay-web` binary, which receives signed Twilio
//! messaging callbacks, verifies the inbound HMAC-SHA1 signature, re-signs
//! an equivalent payload once per configured destination, fans it out, and
//! acknowledges Twilio with the empty `<Response/>` TwiML document.
//!
//! ## Pipeline
//!
//! ```text
//! Twilio → normalize → verify signature → resolve destinations
//!        → re-sign + dispatch → reconcile acknowledgements → <Response/>
//! ```

pub mod config;
pub mod relay;
pub mod report;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use relay::destinations::{DestinationRule, DestinationTable};
pub use relay::dispatch::{dispatch, DispatchError, DispatchMode, DispatchResult};
pub use relay::normalize::{normalize, InboundRequest, RawEvent};
pub use relay::reconcile::{reconcile, AckEnvelope, AckStatus, Reconciliation};
pub use report::{LogReporter, NoopReporter, Reporter};
pub use web::{AppState, RelayError};

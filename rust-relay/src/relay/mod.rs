//! Core relay pipeline: normalization, routing, dispatch, reconciliation.
//!
//! All state in this module is request-scoped. There are no locks, no
//! retries and no cross-request ordering guarantees; ordering exists only
//! within a single invocation's destination list.

pub mod destinations;
pub mod dispatch;
pub mod normalize;
pub mod reconcile;

pub use destinations::{DestinationRule, DestinationTable};
pub use dispatch::{dispatch, DispatchError, DispatchMode, DispatchResult};
pub use normalize::{normalize, InboundRequest, RawEvent};
pub use reconcile::{parse_envelope, reconcile, AckEnvelope, AckStatus, Reconciliation};

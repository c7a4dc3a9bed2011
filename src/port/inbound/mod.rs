//! Inbound (driving) ports consumed by inbound adapters.
//!
//! - [`resolution`]: resolving contracts and retrying failed payouts

pub mod resolution;

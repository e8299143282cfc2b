//! Convenience re-exports for common use.

pub use crate::client::{CoupaClient, RateLimitDescription, RateLimitStatus, WithRateLimit};
pub use crate::config::CoupaConfig;
pub use crate::connector::{
    Connector, Entitlement, Grant, GrantOutcome, Resource, ResourceId, ResourceProvisioner,
    ResourceSyncer, ResourceTypeId, RevokeOutcome,
};
pub use crate::error::{CoupaError, Result};
pub use crate::pagination::{Cursor, Page};

//! Coupa as a source of identity-graph resources.
//!
//! Each resource type has a syncer that enumerates resources, their
//! entitlements and the grants on them. Groups, roles and licenses can also
//! be provisioned: a grant or revoke is reconciled against the user's
//! current state so that repeating it is a no-op.

pub mod groups;
pub mod licenses;
pub mod membership;
pub mod resource;
pub mod roles;
pub mod users;

pub use groups::GroupSyncer;
pub use licenses::LicenseSyncer;
pub use resource::{
    Entitlement, Grant, Resource, ResourceId, ResourceType, ResourceTypeId,
};
pub use roles::RoleSyncer;
pub use users::UserSyncer;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::{CoupaClient, WithRateLimit};
use crate::config::CoupaConfig;
use crate::error::Result;
use crate::pagination::{Cursor, Page};

/// Enumerates one resource type.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    fn resource_type(&self) -> &'static ResourceType;

    /// One page of resources starting at `cursor`.
    async fn list(
        &self,
        cancel: &CancellationToken,
        parent: Option<&ResourceId>,
        cursor: &Cursor,
    ) -> WithRateLimit<Page<Resource>>;

    /// Entitlements offered by `resource`. Computed locally.
    async fn entitlements(&self, resource: &Resource) -> Result<Vec<Entitlement>>;

    /// One page of grants on `resource`'s entitlements.
    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        cursor: &Cursor,
    ) -> WithRateLimit<Page<Grant>>;
}

/// Grants and revokes entitlements of one resource type.
#[async_trait]
pub trait ResourceProvisioner: ResourceSyncer {
    async fn grant(
        &self,
        cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> WithRateLimit<GrantOutcome>;

    async fn revoke(&self, cancel: &CancellationToken, grant: &Grant) -> WithRateLimit<RevokeOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "grants", rename_all = "snake_case")]
pub enum GrantOutcome {
    Granted(Vec<Grant>),
    /// The user already held the entitlement; nothing was written.
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RevokeOutcome {
    Revoked,
    /// The user did not hold the entitlement; nothing was written.
    AlreadyRevoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectorMetadata {
    pub display_name: &'static str,
    pub description: &'static str,
}

/// Entry point tying the client to the four syncers.
#[derive(Debug, Clone)]
pub struct Connector {
    client: Arc<CoupaClient>,
    users: UserSyncer,
    groups: GroupSyncer,
    roles: RoleSyncer,
    licenses: LicenseSyncer,
}

impl Connector {
    pub fn new(config: &CoupaConfig) -> Result<Self> {
        let client = CoupaClient::from_config(config)?;
        Ok(Self::from_client(Arc::new(client)))
    }

    pub fn from_client(client: Arc<CoupaClient>) -> Self {
        Self {
            users: UserSyncer::new(client.clone()),
            groups: GroupSyncer::new(client.clone()),
            roles: RoleSyncer::new(client.clone()),
            licenses: LicenseSyncer::new(client.clone()),
            client,
        }
    }

    pub fn client(&self) -> &Arc<CoupaClient> {
        &self.client
    }

    pub fn metadata(&self) -> ConnectorMetadata {
        ConnectorMetadata {
            display_name: "Coupa Connector",
            description: "Connector syncing Coupa users, groups, roles, and licenses",
        }
    }

    /// Check the credentials by acquiring both tokens.
    pub async fn validate(&self, cancel: &CancellationToken) -> Result<()> {
        self.client.ensure_initialized(cancel).await?;
        info!(base_url = %self.client.base_url(), "Coupa credentials validated");
        Ok(())
    }

    /// Syncers in sync order: users first, since every grant points at one.
    pub fn resource_syncers(&self) -> Vec<&dyn ResourceSyncer> {
        vec![&self.users, &self.groups, &self.roles, &self.licenses]
    }

    pub fn syncer(&self, resource_type: ResourceTypeId) -> &dyn ResourceSyncer {
        match resource_type {
            ResourceTypeId::User => &self.users,
            ResourceTypeId::Group => &self.groups,
            ResourceTypeId::Role => &self.roles,
            ResourceTypeId::License => &self.licenses,
        }
    }

    /// Users cannot be provisioned, only granted things.
    pub fn provisioner(&self, resource_type: ResourceTypeId) -> Option<&dyn ResourceProvisioner> {
        match resource_type {
            ResourceTypeId::User => None,
            ResourceTypeId::Group => Some(&self.groups),
            ResourceTypeId::Role => Some(&self.roles),
            ResourceTypeId::License => Some(&self.licenses),
        }
    }
}

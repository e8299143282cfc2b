use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::membership::{
    grant_membership, revoke_membership, MembershipRelation, MembershipStore, Reconciled,
};
use super::resource::{
    Entitlement, Grant, Resource, ResourceId, ResourceTraits, ResourceType, ResourceTypeId,
    ROLE_RESOURCE_TYPE,
};
use super::{GrantOutcome, ResourceProvisioner, ResourceSyncer, RevokeOutcome};
use crate::client::{CoupaClient, RateLimitDescription, Role, WithRateLimit};
use crate::error::Result;
use crate::pagination::{Cursor, Page};

pub const ROLE_MEMBERSHIP: &str = "member";

/// Syncs Coupa roles and reconciles role assignments.
#[derive(Debug, Clone)]
pub struct RoleSyncer {
    client: Arc<CoupaClient>,
}

impl RoleSyncer {
    pub fn new(client: Arc<CoupaClient>) -> Self {
        Self { client }
    }
}

struct RoleMembership<'a> {
    client: &'a CoupaClient,
}

#[async_trait]
impl MembershipStore for RoleMembership<'_> {
    fn relation(&self) -> MembershipRelation {
        MembershipRelation::Roles
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<i64>> {
        let user = self.client.user_roles(cancel, user_id, rate_limit).await?;
        Ok(user.roles.iter().map(|role| role.id).collect())
    }

    async fn write(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        ids: &[i64],
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<i64>> {
        let echo = self
            .client
            .set_user_roles(cancel, user_id, ids, rate_limit)
            .await?;
        Ok(echo.roles.iter().map(|role| role.id).collect())
    }
}

pub(crate) fn role_resource(role: &Role, parent: Option<&ResourceId>) -> Resource {
    Resource {
        id: ResourceId::new(ResourceTypeId::Role, role.id),
        display_name: role.name.clone(),
        description: Some(
            role
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("{} role in Coupa", role.name)),
        ),
        parent_resource_id: parent.cloned(),
        traits: ResourceTraits::Role,
    }
}

impl RoleSyncer {
    async fn grant_inner(
        &self,
        cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<GrantOutcome> {
        principal.id.expect_type(ResourceTypeId::User)?;
        entitlement.resource.id.expect_type(ResourceTypeId::Role)?;
        let user_id = principal.id.numeric()?;
        let role_id = entitlement.resource.id.numeric()?;

        let store = RoleMembership {
            client: &self.client,
        };
        match grant_membership(&store, cancel, user_id, role_id, rate_limit).await? {
            Reconciled::AlreadySatisfied => Ok(GrantOutcome::AlreadyExists),
            Reconciled::Applied { .. } => Ok(GrantOutcome::Granted(vec![Grant::new(
                &entitlement.resource.id,
                ROLE_MEMBERSHIP,
                principal.id.clone(),
            )])),
        }
    }

    async fn revoke_inner(
        &self,
        cancel: &CancellationToken,
        grant: &Grant,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<RevokeOutcome> {
        grant.principal.expect_type(ResourceTypeId::User)?;
        grant.entitlement.resource.expect_type(ResourceTypeId::Role)?;
        let user_id = grant.principal.numeric()?;
        let role_id = grant.entitlement.resource.numeric()?;

        let store = RoleMembership {
            client: &self.client,
        };
        match revoke_membership(&store, cancel, user_id, role_id, rate_limit).await? {
            Reconciled::AlreadySatisfied => Ok(RevokeOutcome::AlreadyRevoked),
            Reconciled::Applied { .. } => Ok(RevokeOutcome::Revoked),
        }
    }
}

#[async_trait]
impl ResourceSyncer for RoleSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &ROLE_RESOURCE_TYPE
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        parent: Option<&ResourceId>,
        cursor: &Cursor,
    ) -> WithRateLimit<Page<Resource>> {
        debug!(token = %cursor, "Starting Roles List");
        let mut rate_limit = RateLimitDescription::default();
        let result = self
            .client
            .list_roles(cancel, cursor, &mut rate_limit)
            .await
            .map(|roles| {
                let last_id = roles.last().map(|role| role.id);
                let resources = roles.iter().map(|role| role_resource(role, parent)).collect();
                Page::continuing(resources, last_id)
            });
        WithRateLimit::new(result, rate_limit)
    }

    async fn entitlements(&self, resource: &Resource) -> Result<Vec<Entitlement>> {
        resource.id.expect_type(ResourceTypeId::Role)?;
        Ok(vec![Entitlement::assignment(
            resource,
            ROLE_MEMBERSHIP,
            format!("{} Role", resource.display_name),
            format!("{} role in Coupa", resource.display_name),
        )])
    }

    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        cursor: &Cursor,
    ) -> WithRateLimit<Page<Grant>> {
        debug!(role = %resource.id.resource, token = %cursor, "Listing role grants");
        let mut rate_limit = RateLimitDescription::default();
        let result: Result<Page<Grant>> = async {
            resource.id.expect_type(ResourceTypeId::Role)?;
            let role_id = resource.id.numeric()?;
            let holders = self
                .client
                .role_grant_holders(cancel, role_id, cursor, &mut rate_limit)
                .await?;
            let last_id = holders.last().copied();
            let grants = holders
                .into_iter()
                .map(|user_id| Grant::new(&resource.id, ROLE_MEMBERSHIP, ResourceId::user(user_id)))
                .collect();
            Ok(Page::continuing(grants, last_id))
        }
        .await;
        WithRateLimit::new(result, rate_limit)
    }
}

#[async_trait]
impl ResourceProvisioner for RoleSyncer {
    async fn grant(
        &self,
        cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> WithRateLimit<GrantOutcome> {
        let mut rate_limit = RateLimitDescription::default();
        let result = self
            .grant_inner(cancel, principal, entitlement, &mut rate_limit)
            .await;
        WithRateLimit::new(result, rate_limit)
    }

    async fn revoke(&self, cancel: &CancellationToken, grant: &Grant) -> WithRateLimit<RevokeOutcome> {
        let mut rate_limit = RateLimitDescription::default();
        let result = self.revoke_inner(cancel, grant, &mut rate_limit).await;
        WithRateLimit::new(result, rate_limit)
    }
}

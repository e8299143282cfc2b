use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::membership::{
    grant_membership, revoke_membership, MembershipRelation, MembershipStore, Reconciled,
};
use super::resource::{
    Entitlement, Grant, Resource, ResourceId, ResourceTraits, ResourceType, ResourceTypeId,
    GROUP_RESOURCE_TYPE,
};
use super::{GrantOutcome, ResourceProvisioner, ResourceSyncer, RevokeOutcome};
use crate::client::{CoupaClient, Group, RateLimitDescription, WithRateLimit};
use crate::error::Result;
use crate::pagination::{Cursor, Page};

pub const GROUP_MEMBERSHIP: &str = "member";

/// Syncs Coupa user groups and reconciles group membership.
#[derive(Debug, Clone)]
pub struct GroupSyncer {
    client: Arc<CoupaClient>,
}

impl GroupSyncer {
    pub fn new(client: Arc<CoupaClient>) -> Self {
        Self { client }
    }
}

/// A user's group list on the user record.
///
/// Coupa does not reliably drop a group when the reduced list is written
/// directly, so revokes clear the list first.
struct GroupMembership<'a> {
    client: &'a CoupaClient,
}

#[async_trait]
impl MembershipStore for GroupMembership<'_> {
    fn relation(&self) -> MembershipRelation {
        MembershipRelation::Groups
    }

    fn clears_before_revoke(&self) -> bool {
        true
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<i64>> {
        let user = self.client.user_groups(cancel, user_id, rate_limit).await?;
        Ok(user.user_groups.iter().map(|group| group.id).collect())
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
            .set_user_groups(cancel, user_id, ids, rate_limit)
            .await?;
        Ok(echo.user_groups.iter().map(|group| group.id).collect())
    }
}

pub(crate) fn group_resource(group: &Group, parent: Option<&ResourceId>) -> Resource {
    Resource {
        id: ResourceId::new(ResourceTypeId::Group, group.id),
        display_name: group.name.clone(),
        description: Some(
            group
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("{} group in Coupa", group.name)),
        ),
        parent_resource_id: parent.cloned(),
        traits: ResourceTraits::Group,
    }
}

impl GroupSyncer {
    async fn grant_inner(
        &self,
        cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<GrantOutcome> {
        principal.id.expect_type(ResourceTypeId::User)?;
        entitlement.resource.id.expect_type(ResourceTypeId::Group)?;
        let user_id = principal.id.numeric()?;
        let group_id = entitlement.resource.id.numeric()?;

        let store = GroupMembership {
            client: &self.client,
        };
        match grant_membership(&store, cancel, user_id, group_id, rate_limit).await? {
            Reconciled::AlreadySatisfied => Ok(GrantOutcome::AlreadyExists),
            Reconciled::Applied { .. } => Ok(GrantOutcome::Granted(vec![Grant::new(
                &entitlement.resource.id,
                GROUP_MEMBERSHIP,
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
        grant.entitlement.resource.expect_type(ResourceTypeId::Group)?;
        let user_id = grant.principal.numeric()?;
        let group_id = grant.entitlement.resource.numeric()?;

        let store = GroupMembership {
            client: &self.client,
        };
        match revoke_membership(&store, cancel, user_id, group_id, rate_limit).await? {
            Reconciled::AlreadySatisfied => Ok(RevokeOutcome::AlreadyRevoked),
            Reconciled::Applied { .. } => Ok(RevokeOutcome::Revoked),
        }
    }
}

#[async_trait]
impl ResourceSyncer for GroupSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &GROUP_RESOURCE_TYPE
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        parent: Option<&ResourceId>,
        cursor: &Cursor,
    ) -> WithRateLimit<Page<Resource>> {
        debug!(token = %cursor, "Starting Groups List");
        let mut rate_limit = RateLimitDescription::default();
        let result = self
            .client
            .list_groups(cancel, cursor, &mut rate_limit)
            .await
            .map(|groups| {
                let last_id = groups.last().map(|group| group.id);
                let resources = groups
                    .iter()
                    .map(|group| group_resource(group, parent))
                    .collect();
                Page::continuing(resources, last_id)
            });
        WithRateLimit::new(result, rate_limit)
    }

    async fn entitlements(&self, resource: &Resource) -> Result<Vec<Entitlement>> {
        resource.id.expect_type(ResourceTypeId::Group)?;
        Ok(vec![Entitlement::assignment(
            resource,
            GROUP_MEMBERSHIP,
            format!("{} Group", resource.display_name),
            format!("{} group in Coupa", resource.display_name),
        )])
    }

    /// Members are returned in one page; the group record nests them.
    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        _cursor: &Cursor,
    ) -> WithRateLimit<Page<Grant>> {
        let mut rate_limit = RateLimitDescription::default();
        let result: Result<Page<Grant>> = async {
            resource.id.expect_type(ResourceTypeId::Group)?;
            let group_id = resource.id.numeric()?;
            let members = self
                .client
                .group_members(cancel, group_id, &mut rate_limit)
                .await?;
            let grants = members
                .into_iter()
                .map(|user_id| Grant::new(&resource.id, GROUP_MEMBERSHIP, ResourceId::user(user_id)))
                .collect();
            Ok(Page::single(grants))
        }
        .await;
        WithRateLimit::new(result, rate_limit)
    }
}

#[async_trait]
impl ResourceProvisioner for GroupSyncer {
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn group(description: Option<&str>) -> Group {
        Group {
            id: 12,
            name: "Approvers".into(),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn blank_description_falls_back_to_default() {
        let resource = group_resource(&group(Some("")), None);
        assert_eq!(resource.description.as_deref(), Some("Approvers group in Coupa"));
        assert_eq!(resource.id, ResourceId::new(ResourceTypeId::Group, 12));
    }

    #[test]
    fn group_resource_keeps_parent() {
        let parent = ResourceId::new(ResourceTypeId::Group, 1);
        let resource = group_resource(&group(Some("AP team")), Some(&parent));
        assert_eq!(resource.parent_resource_id, Some(parent));
        assert_eq!(resource.description.as_deref(), Some("AP team"));
    }
}

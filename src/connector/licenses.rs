use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::resource::{
    Entitlement, Grant, Resource, ResourceId, ResourceTraits, ResourceType, ResourceTypeId,
    LICENSE_RESOURCE_TYPE,
};
use super::{GrantOutcome, ResourceProvisioner, ResourceSyncer, RevokeOutcome};
use crate::client::license::{require_license, LICENSES};
use crate::client::{CoupaClient, License, RateLimitDescription, WithRateLimit};
use crate::error::Result;
use crate::pagination::{Cursor, Page};

pub const LICENSE_ASSIGNMENT: &str = "assigned";

/// Exposes Coupa's license flags as resources.
///
/// Flag writes are single-field updates, so there is no read-modify-write
/// here and no already-granted detection.
#[derive(Debug, Clone)]
pub struct LicenseSyncer {
    client: Arc<CoupaClient>,
}

impl LicenseSyncer {
    pub fn new(client: Arc<CoupaClient>) -> Self {
        Self { client }
    }
}

pub(crate) fn license_resource(license: &License, parent: Option<&ResourceId>) -> Resource {
    Resource {
        id: ResourceId::new(ResourceTypeId::License, license.id),
        display_name: license.name.to_string(),
        description: Some(format!("{} license in Coupa", license.name)),
        parent_resource_id: parent.cloned(),
        traits: ResourceTraits::None,
    }
}

impl LicenseSyncer {
    async fn set_flag(
        &self,
        cancel: &CancellationToken,
        principal: &ResourceId,
        license: &ResourceId,
        active: bool,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<()> {
        principal.expect_type(ResourceTypeId::User)?;
        license.expect_type(ResourceTypeId::License)?;
        let user_id = principal.numeric()?;
        let license = require_license(&license.resource)?;

        self.client
            .set_license(cancel, user_id, license.id, active, rate_limit)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceSyncer for LicenseSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &LICENSE_RESOURCE_TYPE
    }

    /// The catalog is static: every license in one page, no request made.
    async fn list(
        &self,
        _cancel: &CancellationToken,
        parent: Option<&ResourceId>,
        _cursor: &Cursor,
    ) -> WithRateLimit<Page<Resource>> {
        let resources = LICENSES
            .iter()
            .map(|license| license_resource(license, parent))
            .collect();
        WithRateLimit::new(Ok(Page::single(resources)), RateLimitDescription::default())
    }

    async fn entitlements(&self, resource: &Resource) -> Result<Vec<Entitlement>> {
        resource.id.expect_type(ResourceTypeId::License)?;
        Ok(vec![Entitlement::assignment(
            resource,
            LICENSE_ASSIGNMENT,
            format!("{} License", resource.display_name),
            format!("{} license in Coupa", resource.display_name),
        )])
    }

    async fn grants(
        &self,
        cancel: &CancellationToken,
        resource: &Resource,
        cursor: &Cursor,
    ) -> WithRateLimit<Page<Grant>> {
        debug!(license = %resource.id.resource, token = %cursor, "Listing license grants");
        let mut rate_limit = RateLimitDescription::default();
        let result: Result<Page<Grant>> = async {
            resource.id.expect_type(ResourceTypeId::License)?;
            let holders = self
                .client
                .license_grant_holders(cancel, &resource.id.resource, cursor, &mut rate_limit)
                .await?;
            let last_id = holders.last().copied();
            let grants = holders
                .into_iter()
                .map(|user_id| {
                    Grant::new(&resource.id, LICENSE_ASSIGNMENT, ResourceId::user(user_id))
                })
                .collect();
            Ok(Page::continuing(grants, last_id))
        }
        .await;
        WithRateLimit::new(result, rate_limit)
    }
}

#[async_trait]
impl ResourceProvisioner for LicenseSyncer {
    async fn grant(
        &self,
        cancel: &CancellationToken,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> WithRateLimit<GrantOutcome> {
        let mut rate_limit = RateLimitDescription::default();
        let result = self
            .set_flag(cancel, &principal.id, &entitlement.resource.id, true, &mut rate_limit)
            .await
            .map(|()| {
                GrantOutcome::Granted(vec![Grant::new(
                    &entitlement.resource.id,
                    LICENSE_ASSIGNMENT,
                    principal.id.clone(),
                )])
            });
        WithRateLimit::new(result, rate_limit)
    }

    async fn revoke(&self, cancel: &CancellationToken, grant: &Grant) -> WithRateLimit<RevokeOutcome> {
        let mut rate_limit = RateLimitDescription::default();
        let result = self
            .set_flag(
                cancel,
                &grant.principal,
                &grant.entitlement.resource,
                false,
                &mut rate_limit,
            )
            .await
            .map(|()| RevokeOutcome::Revoked);
        WithRateLimit::new(result, rate_limit)
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::resource::{
    Entitlement, Grant, Resource, ResourceId, ResourceTraits, ResourceType, UserEmail,
    UserStatus, UserTrait, USER_RESOURCE_TYPE,
};
use super::ResourceSyncer;
use crate::client::{CoupaClient, RateLimitDescription, User, WithRateLimit};
use crate::error::Result;
use crate::pagination::{Cursor, Page};

/// Lists Coupa users. Users are principals only: no entitlements, no grants.
#[derive(Debug, Clone)]
pub struct UserSyncer {
    client: Arc<CoupaClient>,
}

impl UserSyncer {
    pub fn new(client: Arc<CoupaClient>) -> Self {
        Self { client }
    }
}

pub(crate) fn user_resource(user: &User, parent: Option<&ResourceId>) -> Resource {
    let mut profile = Map::new();
    profile.insert("id".into(), json!(user.id));
    profile.insert("email".into(), json!(user.email));
    profile.insert("full_name".into(), json!(user.fullname));
    profile.insert("active".into(), json!(user.active));

    let status = if user.active {
        UserStatus::Enabled
    } else {
        UserStatus::Disabled
    };

    Resource {
        id: ResourceId::user(user.id),
        display_name: user.fullname.clone(),
        description: None,
        parent_resource_id: parent.cloned(),
        traits: ResourceTraits::User(UserTrait {
            emails: vec![UserEmail {
                address: user.email.clone(),
                is_primary: true,
            }],
            status,
            login: user.email.clone(),
            profile,
        }),
    }
}

#[async_trait]
impl ResourceSyncer for UserSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &USER_RESOURCE_TYPE
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        parent: Option<&ResourceId>,
        cursor: &Cursor,
    ) -> WithRateLimit<Page<Resource>> {
        debug!(token = %cursor, "Starting Users List");
        let mut rate_limit = RateLimitDescription::default();
        let result = self
            .client
            .list_users(cancel, cursor, &mut rate_limit)
            .await
            .map(|users| {
                let last_id = users.last().map(|user| user.id);
                let resources = users.iter().map(|user| user_resource(user, parent)).collect();
                Page::continuing(resources, last_id)
            });
        WithRateLimit::new(result, rate_limit)
    }

    async fn entitlements(&self, _resource: &Resource) -> Result<Vec<Entitlement>> {
        Ok(Vec::new())
    }

    async fn grants(
        &self,
        _cancel: &CancellationToken,
        _resource: &Resource,
        _cursor: &Cursor,
    ) -> WithRateLimit<Page<Grant>> {
        WithRateLimit::new(Ok(Page::empty()), RateLimitDescription::default())
    }
}

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::models::{
    id_refs, GrantHoldersData, Role, RolesData, SetRolesRequest, UserRoles, UserRolesData,
    UserRolesPutResponse,
};
use super::path::set_roles_path;
use super::query::{role_grants_query, roles_query, user_roles_query};
use super::users::exactly_one;
use super::{CoupaClient, RateLimitDescription};
use crate::error::Result;
use crate::pagination::Cursor;

impl CoupaClient {
    pub async fn list_roles(
        &self,
        cancel: &CancellationToken,
        cursor: &Cursor,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<Role>> {
        let data: RolesData = self.query(cancel, &roles_query(cursor), rate_limit).await?;
        Ok(data.roles)
    }

    /// Ids of users holding `role_id`, one page at a time.
    pub async fn role_grant_holders(
        &self,
        cancel: &CancellationToken,
        role_id: i64,
        cursor: &Cursor,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<i64>> {
        let data: GrantHoldersData = self
            .query(cancel, &role_grants_query(role_id, cursor), rate_limit)
            .await?;
        Ok(data.users.into_iter().map(|user| user.id).collect())
    }

    /// The complete role list of a single user.
    pub async fn user_roles(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<UserRoles> {
        let data: UserRolesData = self
            .query(cancel, &user_roles_query(user_id), rate_limit)
            .await?;
        exactly_one(user_id, data.users)
    }

    /// Replace a user's roles with `role_ids`.
    ///
    /// Coupa has no add/remove primitive for roles; the list sent here becomes
    /// the user's entire role set.
    pub async fn set_user_roles(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        role_ids: &[i64],
        rate_limit: &mut RateLimitDescription,
    ) -> Result<UserRolesPutResponse> {
        debug!(user_id, roles = ?role_ids, "Setting Coupa user roles");
        let request = SetRolesRequest {
            roles: id_refs(role_ids),
        };
        self.put(cancel, &set_roles_path(user_id), &request, rate_limit)
            .await
    }
}

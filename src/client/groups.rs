use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::models::{
    id_refs, Group, GroupMembersData, GroupsData, SetUserGroupsRequest, UserGroups,
    UserGroupsData, UserGroupsPutResponse,
};
use super::path::set_user_groups_path;
use super::query::{group_members_query, groups_query, user_groups_query};
use super::users::exactly_one;
use super::{CoupaClient, RateLimitDescription};
use crate::error::Result;
use crate::pagination::Cursor;

impl CoupaClient {
    pub async fn list_groups(
        &self,
        cancel: &CancellationToken,
        cursor: &Cursor,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<Group>> {
        let data: GroupsData = self.query(cancel, &groups_query(cursor), rate_limit).await?;
        Ok(data.user_groups)
    }

    /// Ids of every member of a group.
    ///
    /// Members are nested under the group record, so there is no cursor; an
    /// unknown group yields an empty list.
    pub async fn group_members(
        &self,
        cancel: &CancellationToken,
        group_id: i64,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<i64>> {
        let data: GroupMembersData = self
            .query(cancel, &group_members_query(group_id), rate_limit)
            .await?;
        Ok(data
            .user_groups
            .into_iter()
            .next()
            .map(|group| group.users.into_iter().map(|user| user.id).collect())
            .unwrap_or_default())
    }

    /// The complete group list of a single user.
    pub async fn user_groups(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<UserGroups> {
        let data: UserGroupsData = self
            .query(cancel, &user_groups_query(user_id), rate_limit)
            .await?;
        exactly_one(user_id, data.users)
    }

    /// Replace a user's groups with `group_ids`.
    pub async fn set_user_groups(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        group_ids: &[i64],
        rate_limit: &mut RateLimitDescription,
    ) -> Result<UserGroupsPutResponse> {
        debug!(user_id, groups = ?group_ids, "Setting Coupa user groups");
        let request = SetUserGroupsRequest {
            user_groups: id_refs(group_ids),
        };
        self.put(cancel, &set_user_groups_path(user_id), &request, rate_limit)
            .await
    }
}

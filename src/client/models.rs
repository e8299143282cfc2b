//! Wire types for Coupa GraphQL reads and REST writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a> {
    pub query: &'a str,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlEnvelope {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Group {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Role {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A Coupa module license. These are flags on the user record, not API
/// objects, so the catalog is static.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct License {
    /// Flag name on the user record.
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Object that only carries an id, used for nested references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceId {
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersData {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupsData {
    #[serde(default, rename = "userGroups")]
    pub user_groups: Vec<Group>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RolesData {
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct GroupMembers {
    pub id: i64,
    #[serde(default)]
    pub users: Vec<ResourceId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupMembersData {
    #[serde(default, rename = "userGroups")]
    pub user_groups: Vec<GroupMembers>,
}

/// Users matching a grant-holder filter (role or license).
#[derive(Debug, Default, Deserialize)]
pub struct GrantHoldersData {
    #[serde(default)]
    pub users: Vec<ResourceId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRoles {
    pub id: i64,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserRolesData {
    #[serde(default)]
    pub users: Vec<UserRoles>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserGroups {
    pub id: i64,
    #[serde(default, rename = "userGroups")]
    pub user_groups: Vec<Group>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserGroupsData {
    #[serde(default)]
    pub users: Vec<UserGroups>,
}

/// Body of `PUT /api/users/{id}` replacing a user's roles.
///
/// An empty set is sent as `null`, which is how Coupa clears the relation.
#[derive(Debug, Serialize)]
pub struct SetRolesRequest {
    pub roles: Option<Vec<ResourceId>>,
}

/// Body of `PUT /api/users/{id}` replacing a user's groups.
#[derive(Debug, Serialize)]
pub struct SetUserGroupsRequest {
    #[serde(rename = "user-groups")]
    pub user_groups: Option<Vec<ResourceId>>,
}

/// Id references for a write body, `None` when there are none.
pub fn id_refs(ids: &[i64]) -> Option<Vec<ResourceId>> {
    if ids.is_empty() {
        return None;
    }
    Some(ids.iter().copied().map(ResourceId::from).collect())
}

/// Echo of a roles write.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRolesPutResponse {
    pub id: i64,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Echo of a groups write.
#[derive(Debug, Clone, Deserialize)]
pub struct UserGroupsPutResponse {
    pub id: i64,
    #[serde(default, rename = "user-groups", alias = "user_groups")]
    pub user_groups: Vec<Group>,
}

/// Echo of a license write; every selected flag comes back.
#[derive(Debug, Clone, Deserialize)]
pub struct UserLicenseResponse {
    pub id: i64,
    #[serde(flatten)]
    pub flags: BTreeMap<String, serde_json::Value>,
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self { id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_sets_serialize_as_null() {
        let body = SetUserGroupsRequest {
            user_groups: id_refs(&[]),
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"user-groups": null}));

        let body = SetRolesRequest { roles: id_refs(&[]) };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"roles": null}));

        let body = SetRolesRequest {
            roles: id_refs(&[9, 12]),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"roles": [{"id": 9}, {"id": 12}]})
        );
    }
}

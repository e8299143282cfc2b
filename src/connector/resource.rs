//! Normalized records handed to the identity graph.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{CoupaError, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceTypeId {
    User,
    Group,
    Role,
    License,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceTraitKind {
    User,
    Group,
    Role,
}

/// Static description of a resource type.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceType {
    pub id: ResourceTypeId,
    pub display_name: &'static str,
    pub traits: &'static [ResourceTraitKind],
}

pub static USER_RESOURCE_TYPE: ResourceType = ResourceType {
    id: ResourceTypeId::User,
    display_name: "User",
    traits: &[ResourceTraitKind::User],
};

pub static GROUP_RESOURCE_TYPE: ResourceType = ResourceType {
    id: ResourceTypeId::Group,
    display_name: "Group",
    traits: &[ResourceTraitKind::Group],
};

pub static ROLE_RESOURCE_TYPE: ResourceType = ResourceType {
    id: ResourceTypeId::Role,
    display_name: "Role",
    traits: &[ResourceTraitKind::Role],
};

pub static LICENSE_RESOURCE_TYPE: ResourceType = ResourceType {
    id: ResourceTypeId::License,
    display_name: "License",
    traits: &[],
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub resource_type: ResourceTypeId,
    pub resource: String,
}

impl ResourceId {
    pub fn new(resource_type: ResourceTypeId, resource: impl ToString) -> Self {
        Self {
            resource_type,
            resource: resource.to_string(),
        }
    }

    pub fn user(id: i64) -> Self {
        Self::new(ResourceTypeId::User, id)
    }

    /// Coupa object ids are integers; licenses are the exception.
    pub fn numeric(&self) -> Result<i64> {
        self.resource.parse().map_err(|_| {
            CoupaError::InvalidArgument(format!(
                "{} id {:?} is not numeric",
                self.resource_type, self.resource
            ))
        })
    }

    pub fn expect_type(&self, expected: ResourceTypeId) -> Result<()> {
        if self.resource_type != expected {
            return Err(CoupaError::InvalidArgument(format!(
                "resource type is {}, expected {expected}",
                self.resource_type
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserEmail {
    pub address: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTrait {
    pub emails: Vec<UserEmail>,
    pub status: UserStatus,
    pub login: String,
    pub profile: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceTraits {
    User(UserTrait),
    Group,
    Role,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    pub display_name: String,
    pub description: Option<String>,
    pub parent_resource_id: Option<ResourceId>,
    pub traits: ResourceTraits,
}

impl Resource {
    /// A resource known only by id, for callers that never listed it.
    pub fn reference(id: ResourceId) -> Self {
        Self {
            display_name: id.resource.clone(),
            id,
            description: None,
            parent_resource_id: None,
            traits: ResourceTraits::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPurpose {
    Assignment,
}

/// A grantable relation on a resource, e.g. membership of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entitlement {
    pub id: String,
    pub resource: Resource,
    pub slug: String,
    pub display_name: String,
    pub description: String,
    pub purpose: EntitlementPurpose,
    pub grantable_to: Vec<ResourceTypeId>,
}

impl Entitlement {
    pub fn assignment(
        resource: &Resource,
        slug: &str,
        display_name: String,
        description: String,
    ) -> Self {
        Self {
            id: entitlement_id(&resource.id, slug),
            resource: resource.clone(),
            slug: slug.to_string(),
            display_name,
            description,
            purpose: EntitlementPurpose::Assignment,
            grantable_to: vec![ResourceTypeId::User],
        }
    }
}

/// The part of an entitlement a grant refers back to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitlementRef {
    pub id: String,
    pub resource: ResourceId,
    pub slug: String,
}

/// One principal holding one entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub entitlement: EntitlementRef,
    pub principal: ResourceId,
}

impl Grant {
    pub fn new(resource: &ResourceId, slug: &str, principal: ResourceId) -> Self {
        let entitlement = EntitlementRef {
            id: entitlement_id(resource, slug),
            resource: resource.clone(),
            slug: slug.to_string(),
        };
        Self {
            id: format!(
                "{}:{}:{}",
                entitlement.id, principal.resource_type, principal.resource
            ),
            entitlement,
            principal,
        }
    }
}

fn entitlement_id(resource: &ResourceId, slug: &str) -> String {
    format!("{}:{}:{slug}", resource.resource_type, resource.resource)
}

//! Endpoint paths.

use reqwest::Url;

use crate::error::{CoupaError, Result};

pub const API_PATH_AUTH: &str = "/oauth2/token";
pub const API_PATH_QUERY: &str = "/api/graphql";

const USERS_PATH: &str = "/api/users";

// Field selections decide which sub-fields Coupa echoes back from a PUT.
const ROLES_FIELDS: &str = r#"["id",{"roles":["id","description","name"]}]"#;
const USER_GROUPS_FIELDS: &str = r#"["id",{"user_groups":["id","name","description"]}]"#;
const LICENSE_FIELDS: &str = r#"["id","analyticsUser","aicUser","ccwUser","contractsUser","expenseUser","inventoryUser","purchasingUser","riskAssessUser","sourcingUser","spendGuardUser","supplyChainUser","travelUser","treasuryUser"]"#;

/// Join a path (optionally with a query string) onto the base URL.
///
/// Unlike [`Url::join`], any path already on the base is preserved.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let raw = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| CoupaError::Configuration(format!("invalid endpoint {raw}: {e}")))
}

pub fn set_roles_path(user_id: i64) -> String {
    format!("{USERS_PATH}/{user_id}?fields={ROLES_FIELDS}")
}

pub fn set_user_groups_path(user_id: i64) -> String {
    format!("{USERS_PATH}/{user_id}?fields={USER_GROUPS_FIELDS}")
}

pub fn set_license_path(user_id: i64) -> String {
    format!("{USERS_PATH}/{user_id}?fields={LICENSE_FIELDS}")
}

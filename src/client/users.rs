use tokio_util::sync::CancellationToken;

use super::models::{User, UsersData};
use super::query::all_users_query;
use super::{CoupaClient, RateLimitDescription};
use crate::error::{CoupaError, Result};
use crate::pagination::Cursor;

impl CoupaClient {
    /// One page of human users, ordered by id.
    pub async fn list_users(
        &self,
        cancel: &CancellationToken,
        cursor: &Cursor,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<User>> {
        let data: UsersData = self
            .query(cancel, &all_users_query(cursor), rate_limit)
            .await?;
        Ok(data.users)
    }
}

/// Pick the one record an exact `id=` filter should have returned.
pub(crate) fn exactly_one<T>(user_id: i64, mut users: Vec<T>) -> Result<T> {
    match users.len() {
        0 => Err(CoupaError::NotFound(user_id)),
        1 => Ok(users.remove(0)),
        count => Err(CoupaError::AmbiguousResult { user_id, count }),
    }
}

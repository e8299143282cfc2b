//! Read-modify-write reconciliation for list-valued user relations.
//!
//! Coupa stores a user's roles and groups as plain lists on the user record
//! and only lets a client replace the whole list. Adding or removing one
//! entry is therefore a two-phase protocol:
//!
//! 1. fetch the user's complete current list,
//! 2. plan: either the change is already in place, or compute the new list,
//! 3. write the new list and check that the echoed list has the expected size.
//!
//! The protocol is not atomic. Two callers reconciling the same user can read
//! the same list, and whichever writes last wins; the other change is lost.
//! Coupa has no compare-and-set primitive to prevent this, so callers that
//! run concurrently against one user must serialize themselves.

use async_trait::async_trait;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::RateLimitDescription;
use crate::error::{CoupaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MembershipRelation {
    Roles,
    Groups,
}

/// Result of the planning phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipPlan {
    /// Nothing to write.
    AlreadySatisfied,
    /// The complete list to write back.
    Write(Vec<i64>),
}

/// Plan adding `target` to `current`.
pub fn plan_grant(current: &[i64], target: i64) -> MembershipPlan {
    if current.contains(&target) {
        return MembershipPlan::AlreadySatisfied;
    }
    let mut desired = current.to_vec();
    desired.push(target);
    MembershipPlan::Write(desired)
}

/// Plan removing `target` from `current`, keeping the order of the rest.
pub fn plan_revoke(current: &[i64], target: i64) -> MembershipPlan {
    if !current.contains(&target) {
        return MembershipPlan::AlreadySatisfied;
    }
    let desired = current.iter().copied().filter(|id| *id != target).collect();
    MembershipPlan::Write(desired)
}

/// Check the echoed list after a write.
pub fn verify_cardinality(
    relation: MembershipRelation,
    user_id: i64,
    expected: usize,
    actual: usize,
) -> Result<()> {
    if expected != actual {
        return Err(CoupaError::Reconciliation {
            relation: match relation {
                MembershipRelation::Roles => "roles",
                MembershipRelation::Groups => "groups",
            },
            user_id,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Where a membership list is read from and written to.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    fn relation(&self) -> MembershipRelation;

    /// Whether a revoke first writes an empty list before the reduced one.
    fn clears_before_revoke(&self) -> bool {
        false
    }

    /// The user's complete current list.
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<i64>>;

    /// Replace the user's list; returns the list the server echoed back.
    async fn write(
        &self,
        cancel: &CancellationToken,
        user_id: i64,
        ids: &[i64],
        rate_limit: &mut RateLimitDescription,
    ) -> Result<Vec<i64>>;
}

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    AlreadySatisfied,
    Applied { written: Vec<i64> },
}

/// Ensure `target` is in the user's list.
pub async fn grant_membership<S>(
    store: &S,
    cancel: &CancellationToken,
    user_id: i64,
    target: i64,
    rate_limit: &mut RateLimitDescription,
) -> Result<Reconciled>
where
    S: MembershipStore + ?Sized,
{
    let relation = store.relation();
    let current = store.fetch(cancel, user_id, rate_limit).await?;

    let desired = match plan_grant(&current, target) {
        MembershipPlan::AlreadySatisfied => {
            info!(%relation, user_id, target, "membership already granted");
            return Ok(Reconciled::AlreadySatisfied);
        }
        MembershipPlan::Write(desired) => desired,
    };

    debug!(%relation, user_id, target, current = ?current, "granting membership");
    let echoed = store.write(cancel, user_id, &desired, rate_limit).await?;
    if let Err(e) = verify_cardinality(relation, user_id, desired.len(), echoed.len()) {
        warn!(%relation, user_id, echoed = ?echoed, "membership not added to user");
        return Err(e);
    }

    Ok(Reconciled::Applied { written: desired })
}

/// Ensure `target` is not in the user's list.
pub async fn revoke_membership<S>(
    store: &S,
    cancel: &CancellationToken,
    user_id: i64,
    target: i64,
    rate_limit: &mut RateLimitDescription,
) -> Result<Reconciled>
where
    S: MembershipStore + ?Sized,
{
    let relation = store.relation();
    let current = store.fetch(cancel, user_id, rate_limit).await?;

    let desired = match plan_revoke(&current, target) {
        MembershipPlan::AlreadySatisfied => {
            info!(%relation, user_id, target, "membership not found in user");
            return Ok(Reconciled::AlreadySatisfied);
        }
        MembershipPlan::Write(desired) => desired,
    };

    debug!(%relation, user_id, target, current = ?current, "revoking membership");
    if store.clears_before_revoke() {
        store.write(cancel, user_id, &[], rate_limit).await?;
    }
    let echoed = store.write(cancel, user_id, &desired, rate_limit).await?;
    if let Err(e) = verify_cardinality(relation, user_id, desired.len(), echoed.len()) {
        warn!(%relation, user_id, echoed = ?echoed, "membership was not removed");
        return Err(e);
    }

    Ok(Reconciled::Applied { written: desired })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory user lists with a write log.
    #[derive(Default)]
    struct MemoryStore {
        relation_clears: bool,
        lists: Mutex<HashMap<i64, Vec<i64>>>,
        writes: Mutex<Vec<Vec<i64>>>,
        // Echo this many entries instead of the written list.
        echo_override: Option<usize>,
    }

    impl MemoryStore {
        fn with(user_id: i64, ids: &[i64]) -> Self {
            let store = Self::default();
            store.lists.lock().unwrap().insert(user_id, ids.to_vec());
            store
        }

        fn list(&self, user_id: i64) -> Vec<i64> {
            self.lists.lock().unwrap().get(&user_id).cloned().unwrap_or_default()
        }

        fn writes(&self) -> Vec<Vec<i64>> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MembershipStore for MemoryStore {
        fn relation(&self) -> MembershipRelation {
            if self.relation_clears {
                MembershipRelation::Groups
            } else {
                MembershipRelation::Roles
            }
        }

        fn clears_before_revoke(&self) -> bool {
            self.relation_clears
        }

        async fn fetch(
            &self,
            _cancel: &CancellationToken,
            user_id: i64,
            _rate_limit: &mut RateLimitDescription,
        ) -> Result<Vec<i64>> {
            self.lists
                .lock()
                .unwrap()
                .get(&user_id)
                .cloned()
                .ok_or(CoupaError::NotFound(user_id))
        }

        async fn write(
            &self,
            _cancel: &CancellationToken,
            user_id: i64,
            ids: &[i64],
            _rate_limit: &mut RateLimitDescription,
        ) -> Result<Vec<i64>> {
            self.writes.lock().unwrap().push(ids.to_vec());
            self.lists.lock().unwrap().insert(user_id, ids.to_vec());
            Ok(match self.echo_override {
                Some(n) => vec![0; n],
                None => ids.to_vec(),
            })
        }
    }

    #[test]
    fn plans_are_idempotent() {
        assert_eq!(plan_grant(&[9], 12), MembershipPlan::Write(vec![9, 12]));
        assert_eq!(plan_grant(&[9, 12], 12), MembershipPlan::AlreadySatisfied);
        assert_eq!(plan_revoke(&[4, 12, 9], 12), MembershipPlan::Write(vec![4, 9]));
        assert_eq!(plan_revoke(&[4, 9], 12), MembershipPlan::AlreadySatisfied);
    }

    #[tokio::test]
    async fn grant_twice_writes_once() {
        let store = MemoryStore::with(5, &[9]);
        let cancel = CancellationToken::new();
        let mut rl = RateLimitDescription::default();

        let first = grant_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap();
        assert_eq!(first, Reconciled::Applied { written: vec![9, 12] });
        let second = grant_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap();
        assert_eq!(second, Reconciled::AlreadySatisfied);
        assert_eq!(store.writes(), vec![vec![9, 12]]);
    }

    #[tokio::test]
    async fn revoke_twice_writes_once() {
        let store = MemoryStore::with(5, &[9, 12]);
        let cancel = CancellationToken::new();
        let mut rl = RateLimitDescription::default();

        revoke_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap();
        let second = revoke_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap();
        assert_eq!(second, Reconciled::AlreadySatisfied);
        assert_eq!(store.writes(), vec![vec![9]]);
    }

    #[tokio::test]
    async fn grant_then_revoke_restores_set() {
        let store = MemoryStore::with(5, &[3, 1, 8]);
        let cancel = CancellationToken::new();
        let mut rl = RateLimitDescription::default();

        grant_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap();
        revoke_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap();

        let mut after = store.list(5);
        after.sort_unstable();
        assert_eq!(after, vec![1, 3, 8]);
    }

    #[tokio::test]
    async fn clearing_store_writes_empty_list_first() {
        let mut store = MemoryStore::with(5, &[12]);
        store.relation_clears = true;
        let cancel = CancellationToken::new();
        let mut rl = RateLimitDescription::default();

        revoke_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap();
        assert_eq!(store.writes(), vec![Vec::<i64>::new(), Vec::new()]);
    }

    #[tokio::test]
    async fn cardinality_mismatch_is_reconciliation_error() {
        let mut store = MemoryStore::with(5, &[9]);
        store.echo_override = Some(1);
        let cancel = CancellationToken::new();
        let mut rl = RateLimitDescription::default();

        let err = grant_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap_err();
        assert!(matches!(
            err,
            CoupaError::Reconciliation { relation: "roles", user_id: 5, expected: 2, actual: 1 }
        ));
    }

    #[tokio::test]
    async fn read_failure_aborts_before_write() {
        let store = MemoryStore::default();
        let cancel = CancellationToken::new();
        let mut rl = RateLimitDescription::default();

        let err = grant_membership(&store, &cancel, 5, 12, &mut rl).await.unwrap_err();
        assert!(matches!(err, CoupaError::NotFound(5)));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn interleaved_grants_lose_an_update() {
        // Both callers plan from the same snapshot, as two concurrent
        // reconciliations would.
        let store = MemoryStore::with(5, &[9]);
        let cancel = CancellationToken::new();
        let mut rl = RateLimitDescription::default();

        let snapshot = store.fetch(&cancel, 5, &mut rl).await.unwrap();
        let MembershipPlan::Write(first) = plan_grant(&snapshot, 12) else {
            panic!("expected a write");
        };
        let MembershipPlan::Write(second) = plan_grant(&snapshot, 13) else {
            panic!("expected a write");
        };
        store.write(&cancel, 5, &first, &mut rl).await.unwrap();
        store.write(&cancel, 5, &second, &mut rl).await.unwrap();

        assert_eq!(store.list(5), vec![9, 13]);
    }
}

//! coupa-sync: Coupa identity sync and reconciliation.
//!
//! Reads users, groups, roles and license assignments from a Coupa tenant
//! and normalizes them into identity-graph records. Group, role and license
//! grants can be provisioned and revoked; list-valued relations are
//! reconciled with a read-modify-write against the user record.
//!
//! # Quick Start
//!
//! ```no_run
//! use coupa_sync::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> coupa_sync::error::Result<()> {
//! let config = CoupaConfig::from_env()?;
//! let connector = Connector::new(&config)?;
//! let cancel = CancellationToken::new();
//!
//! connector.validate(&cancel).await?;
//! let page = connector
//!     .syncer(ResourceTypeId::User)
//!     .list(&cancel, None, &Cursor::first_page())
//!     .await
//!     .into_result()?;
//! println!("{} users, next cursor {:?}", page.items.len(), page.next_cursor);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod pagination;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;

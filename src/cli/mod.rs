//! CLI entry point for coupa-sync.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::connector::ResourceTypeId;

/// Sync and reconcile Coupa identities
#[derive(Parser, Debug)]
#[command(name = "coupa-sync", version, about = "Coupa identity sync CLI")]
pub struct Cli {
    /// TOML config file; falls back to COUPA_* environment variables
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the credentials against the tenant
    Validate,
    /// List resources of one type
    List(ListArgs),
    /// Show the entitlements of a resource
    Entitlements(ResourceArgs),
    /// List grants on a resource
    Grants(GrantsArgs),
    /// Grant a resource's entitlement to a user
    Grant(ProvisionArgs),
    /// Revoke a resource's entitlement from a user
    Revoke(ProvisionArgs),
}

/// Arguments for `coupa-sync list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Resource type (user, group, role, license)
    pub resource_type: ResourceTypeId,

    /// Resume after this cursor
    #[arg(long, default_value = "")]
    pub cursor: String,

    /// Follow cursors until the collection is exhausted
    #[arg(long)]
    pub all: bool,
}

/// A resource addressed by type and id.
#[derive(Args, Debug)]
pub struct ResourceArgs {
    pub resource_type: ResourceTypeId,
    pub id: String,
}

/// Arguments for `coupa-sync grants`.
#[derive(Args, Debug)]
pub struct GrantsArgs {
    #[command(flatten)]
    pub resource: ResourceArgs,

    #[arg(long, default_value = "")]
    pub cursor: String,
}

/// Arguments for `coupa-sync grant` and `coupa-sync revoke`.
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub resource: ResourceArgs,

    /// Coupa user id of the principal
    #[arg(long = "user")]
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_list_with_cursor() {
        let cli = Cli::try_parse_from(["coupa-sync", "list", "group", "--cursor", "42"]).unwrap();
        match cli.command {
            Commands::List(args) => {
                assert_eq!(args.resource_type, ResourceTypeId::Group);
                assert_eq!(args.cursor, "42");
                assert!(!args.all);
            }
            other => panic!("expected List, got {other:?}"),
        }
    }

    #[test]
    fn parse_grant_with_user_and_config() {
        let cli = Cli::try_parse_from([
            "coupa-sync",
            "grant",
            "role",
            "12",
            "--user",
            "5",
            "--config",
            "/tmp/coupa.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/coupa.toml")));
        match cli.command {
            Commands::Grant(args) => {
                assert_eq!(args.resource.resource_type, ResourceTypeId::Role);
                assert_eq!(args.resource.id, "12");
                assert_eq!(args.user_id, 5);
            }
            other => panic!("expected Grant, got {other:?}"),
        }
    }

    #[test]
    fn parse_unknown_resource_type_is_error() {
        assert!(Cli::try_parse_from(["coupa-sync", "list", "invoice"]).is_err());
    }

    #[test]
    fn parse_revoke_missing_user_is_error() {
        assert!(Cli::try_parse_from(["coupa-sync", "revoke", "group", "12"]).is_err());
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["coupa-sync"]).is_err());
    }
}

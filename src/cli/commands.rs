//! CLI command handlers. Every command prints one JSON document to stdout.

use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Commands, GrantsArgs, ListArgs, ProvisionArgs, ResourceArgs};
use crate::client::license::require_license;
use crate::client::{RateLimitDescription, WithRateLimit};
use crate::config::CoupaConfig;
use crate::connector::licenses::license_resource;
use crate::connector::{
    Connector, Entitlement, Grant, Resource, ResourceId, ResourceProvisioner, ResourceSyncer,
    ResourceTypeId,
};
use crate::error::{CoupaError, Result};
use crate::pagination::{stream_pages, Cursor};

/// Load config from `path` when given, else from the environment.
pub fn load_config(path: Option<&std::path::Path>) -> Result<CoupaConfig> {
    match path {
        Some(path) => CoupaConfig::load(path),
        None => CoupaConfig::from_env(),
    }
}

/// Run one parsed command against `connector`.
pub async fn run(
    connector: &Connector,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<serde_json::Value> {
    match command {
        Commands::Validate => {
            connector.validate(cancel).await?;
            to_json(&connector.metadata())
        }
        Commands::List(args) => handle_list(connector, args, cancel).await,
        Commands::Entitlements(args) => handle_entitlements(connector, args).await,
        Commands::Grants(args) => handle_grants(connector, args, cancel).await,
        Commands::Grant(args) => handle_grant(connector, args, cancel).await,
        Commands::Revoke(args) => handle_revoke(connector, args, cancel).await,
    }
}

async fn handle_list(
    connector: &Connector,
    args: ListArgs,
    cancel: &CancellationToken,
) -> Result<serde_json::Value> {
    let syncer = connector.syncer(args.resource_type);
    let start = Cursor::parse(&args.cursor)?;

    if !args.all {
        let page = unwrap_reported(syncer.list(cancel, None, &start).await)?;
        return to_json(&page);
    }

    let pages: Vec<_> = stream_pages(start, |cursor| async move {
        unwrap_reported(syncer.list(cancel, None, &cursor).await)
    })
    .try_collect()
    .await?;
    let items: Vec<Resource> = pages.into_iter().flat_map(|page| page.items).collect();
    debug!(count = items.len(), "listed every resource");
    to_json(&items)
}

async fn handle_entitlements(connector: &Connector, args: ResourceArgs) -> Result<serde_json::Value> {
    let resource = resource_from_args(&args)?;
    let entitlements = connector
        .syncer(args.resource_type)
        .entitlements(&resource)
        .await?;
    to_json(&entitlements)
}

async fn handle_grants(
    connector: &Connector,
    args: GrantsArgs,
    cancel: &CancellationToken,
) -> Result<serde_json::Value> {
    let resource = resource_from_args(&args.resource)?;
    let cursor = Cursor::parse(&args.cursor)?;
    let page = unwrap_reported(
        connector
            .syncer(args.resource.resource_type)
            .grants(cancel, &resource, &cursor)
            .await,
    )?;
    to_json(&page)
}

async fn handle_grant(
    connector: &Connector,
    args: ProvisionArgs,
    cancel: &CancellationToken,
) -> Result<serde_json::Value> {
    let provisioner = provisioner(connector, args.resource.resource_type)?;
    let entitlement = primary_entitlement(provisioner, &args.resource).await?;
    let principal = Resource::reference(ResourceId::user(args.user_id));
    let outcome = unwrap_reported(provisioner.grant(cancel, &principal, &entitlement).await)?;
    to_json(&outcome)
}

async fn handle_revoke(
    connector: &Connector,
    args: ProvisionArgs,
    cancel: &CancellationToken,
) -> Result<serde_json::Value> {
    let provisioner = provisioner(connector, args.resource.resource_type)?;
    let entitlement = primary_entitlement(provisioner, &args.resource).await?;
    let grant = Grant::new(
        &entitlement.resource.id,
        &entitlement.slug,
        ResourceId::user(args.user_id),
    );
    let outcome = unwrap_reported(provisioner.revoke(cancel, &grant).await)?;
    to_json(&outcome)
}

fn provisioner(
    connector: &Connector,
    resource_type: ResourceTypeId,
) -> Result<&dyn ResourceProvisioner> {
    connector.provisioner(resource_type).ok_or_else(|| {
        CoupaError::InvalidArgument(format!("{resource_type} resources cannot be granted"))
    })
}

/// Each provisionable resource offers exactly one entitlement.
async fn primary_entitlement(
    provisioner: &dyn ResourceProvisioner,
    args: &ResourceArgs,
) -> Result<Entitlement> {
    let resource = resource_from_args(args)?;
    provisioner
        .entitlements(&resource)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| CoupaError::InvalidArgument(format!("{} has no entitlements", args.id)))
}

fn resource_from_args(args: &ResourceArgs) -> Result<Resource> {
    match args.resource_type {
        ResourceTypeId::License => {
            let license = require_license(&args.id)?;
            Ok(license_resource(license, None))
        }
        resource_type => {
            let id = ResourceId::new(resource_type, &args.id);
            id.numeric()?;
            Ok(Resource::reference(id))
        }
    }
}

/// Surface the rate-limit state on stderr before unwrapping the result.
fn unwrap_reported<T>(response: WithRateLimit<T>) -> Result<T> {
    let (result, rate_limit) = response.into_parts();
    report_rate_limit(&rate_limit);
    result
}

fn report_rate_limit(rate_limit: &RateLimitDescription) {
    if rate_limit.is_overlimit() {
        warn!(
            remaining = ?rate_limit.remaining,
            reset_at = ?rate_limit.reset_at,
            "Coupa rate limit reached"
        );
    } else {
        debug!(status = %rate_limit.status, remaining = ?rate_limit.remaining, "rate limit");
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

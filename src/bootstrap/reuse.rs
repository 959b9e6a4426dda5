//! Reuse the principal already bound to the app, or create one for RBAC.

use super::{subscription, BootstrapRecord, PLACEHOLDER_PASSWORD};
use crate::azure::{identifier_uri, AzureCli, ServicePrincipal};
use crate::classify::{classify_error, Failure, ObjectKind};
use crate::config::Config;
use crate::{BootstrapError, Result};
use tracing::{debug, info, warn};

/// The principal part of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Principal {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub password: String,
}

/// Looks the principal up through its role assignments.
///
/// `Ok(None)` means it does not exist yet: either the lookup failed with a
/// recognized not-found message, or it succeeded with an empty list.
async fn lookup(az: &AzureCli<'_>, app_name: &str) -> Result<Option<Principal>> {
    let assignee = identifier_uri(app_name);
    let assignments = match az.role_assignments_for(&assignee).await {
        Ok(assignments) => assignments,
        Err(err) => match classify_error(ObjectKind::RoleAssignment, &err) {
            Failure::NotFound => {
                debug!(
                    "AD service principal can be created because it doesn't exist already '{}'",
                    app_name
                );
                return Ok(None);
            }
            _ => return Err(err),
        },
    };

    let Some(assignment) = assignments.into_iter().next() else {
        debug!("No role assignment found for '{}'", assignee);
        return Ok(None);
    };

    let name = assignment
        .principal_name
        .clone()
        .unwrap_or_else(|| assignee.clone());
    let display_name = name.trim_start_matches("http://").to_string();

    info!("Reusing AD service principal {} ({})", display_name, assignment.principal_id);
    Ok(Some(Principal {
        id: assignment.principal_id,
        name,
        display_name,
        password: PLACEHOLDER_PASSWORD.to_string(),
    }))
}

/// Picks the principal created for `app_name` out of a listing.
///
/// `create-for-rbac` registers `http://<app>` as a service principal name,
/// so matching on it as well as the display name rules out unrelated
/// principals that merely share a display name.
pub(crate) fn find_principal(candidates: &[ServicePrincipal], app_name: &str) -> Option<Principal> {
    let uri = identifier_uri(app_name);
    candidates
        .iter()
        .filter(|sp| sp.app_display_name() == Some(app_name))
        .filter(|sp| sp.service_principal_names.iter().any(|n| *n == uri))
        .find_map(|sp| {
            Some(Principal {
                id: sp.object_id()?.to_string(),
                name: uri.clone(),
                display_name: app_name.to_string(),
                password: PLACEHOLDER_PASSWORD.to_string(),
            })
        })
}

async fn create(az: &AzureCli<'_>, app_name: &str, role: &str) -> Result<Principal> {
    info!("Creating AD service principal '{}' with role {}", app_name, role);
    match az.create_for_rbac(app_name, role).await {
        Ok(created) => Ok(Principal {
            id: created.app_id,
            name: created.name.unwrap_or_else(|| identifier_uri(app_name)),
            display_name: created.display_name,
            password: created.password,
        }),
        Err(err) => match classify_error(ObjectKind::ServicePrincipal, &err) {
            Failure::AlreadyExists => {
                warn!("AD service principal exists for app '{}'", app_name);
                let candidates = az.service_principals(app_name).await?;
                find_principal(&candidates, app_name).ok_or_else(|| {
                    BootstrapError::NotResolved(format!(
                        "service principal for app '{}' not found in listing",
                        app_name
                    ))
                })
            }
            _ => Err(err),
        },
    }
}

/// Runs the reuse-or-create policy.
pub async fn run(az: &AzureCli<'_>, config: &Config, role: &str) -> Result<BootstrapRecord> {
    debug!("Service Principal Role -> {}", role);
    let subscription = subscription(az, config).await?;

    let app_name = config.ad_app_name.as_str();
    let principal = match lookup(az, app_name).await? {
        Some(principal) => principal,
        None => create(az, app_name, role).await?,
    };
    debug!("Azure AD sp ID -> {}", principal.id);

    Ok(BootstrapRecord {
        subscription_name: subscription.name,
        subscription_id: subscription.id,
        tenant_id: subscription.tenant_id,
        ad_sp_id: principal.id,
        ad_sp_name: principal.name,
        ad_sp_display_name: principal.display_name,
        ad_sp_password: principal.password,
        ad_app_id: None,
        role: Some(role.to_string()),
        role_assignment_id: None,
    })
}

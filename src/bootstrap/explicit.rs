//! Ensure application, service principal and `Owner` assignment explicitly.
//!
//! Each step depends on the identifier resolved by the previous one: the
//! principal is bound to the application's `appId`, and the role assignment
//! is granted to the principal's object id.

use super::{subscription, BootstrapRecord, OWNER_ROLE, PLACEHOLDER_PASSWORD};
use crate::azure::{identifier_uri, subscription_scope, Application, AzureCli, RoleAssignment};
use crate::classify::{classify_error, Failure, ObjectKind};
use crate::config::{Config, AZURE_AD_APP_PASSWORD};
use crate::{BootstrapError, Result};
use tracing::{debug, info, warn};

/// Resolved application and whether this run created it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EnsuredApp {
    app_id: String,
    created: bool,
}

fn find_application(candidates: &[Application], app_name: &str) -> Option<String> {
    let uri = identifier_uri(app_name);
    candidates
        .iter()
        .find(|app| app.display_name == app_name && app.identifier_uris.contains(&uri))
        .map(|app| app.app_id.clone())
}

async fn ensure_application(az: &AzureCli<'_>, app_name: &str, password: &str) -> Result<EnsuredApp> {
    let uri = identifier_uri(app_name);
    match az.application(&uri).await {
        Ok(app) => {
            info!("Reusing AD application {} ({})", app.display_name, app.app_id);
            return Ok(EnsuredApp {
                app_id: app.app_id,
                created: false,
            });
        }
        Err(err) => match classify_error(ObjectKind::Application, &err) {
            Failure::NotFound => debug!("AD application '{}' does not exist yet", app_name),
            _ => return Err(err),
        },
    }

    info!("Creating AD application '{}'", app_name);
    match az.create_application(app_name, &uri, password).await {
        Ok(app) => Ok(EnsuredApp {
            app_id: app.app_id,
            created: true,
        }),
        Err(err) => match classify_error(ObjectKind::Application, &err) {
            Failure::AlreadyExists => {
                warn!("AD application exists for '{}'", app_name);
                let candidates = az.applications(app_name).await?;
                let app_id = find_application(&candidates, app_name).ok_or_else(|| {
                    BootstrapError::NotResolved(format!(
                        "AD application '{}' not found in listing",
                        app_name
                    ))
                })?;
                Ok(EnsuredApp {
                    app_id,
                    created: false,
                })
            }
            _ => Err(err),
        },
    }
}

async fn ensure_service_principal(az: &AzureCli<'_>, app_name: &str, app_id: &str) -> Result<String> {
    let missing_id = || {
        BootstrapError::NotResolved(format!(
            "service principal for application {} has no object id",
            app_id
        ))
    };

    match az.service_principal(app_id).await {
        Ok(sp) => return sp.object_id().map(str::to_string).ok_or_else(missing_id),
        Err(err) => match classify_error(ObjectKind::ServicePrincipal, &err) {
            Failure::NotFound => debug!("AD service principal for {} does not exist yet", app_id),
            _ => return Err(err),
        },
    }

    info!("Creating AD service principal for application {}", app_id);
    match az.create_service_principal(app_id).await {
        Ok(sp) => sp.object_id().map(str::to_string).ok_or_else(missing_id),
        Err(err) => match classify_error(ObjectKind::ServicePrincipal, &err) {
            Failure::AlreadyExists => {
                warn!("AD service principal exists for application {}", app_id);
                let candidates = az.service_principals(app_name).await?;
                candidates
                    .iter()
                    .filter(|sp| sp.app_display_name() == Some(app_name))
                    .filter(|sp| sp.service_principal_names.iter().any(|n| n == app_id))
                    .find_map(|sp| sp.object_id().map(str::to_string))
                    .ok_or_else(|| {
                        BootstrapError::NotResolved(format!(
                            "service principal for application {} not found in listing",
                            app_id
                        ))
                    })
            }
            _ => Err(err),
        },
    }
}

fn find_assignment(candidates: Vec<RoleAssignment>, sp_id: &str, role: &str) -> Option<RoleAssignment> {
    candidates.into_iter().find(|a| {
        a.principal_id == sp_id
            && a.role_definition_name
                .as_deref()
                .map_or(true, |name| name.eq_ignore_ascii_case(role))
    })
}

async fn ensure_role_assignment(
    az: &AzureCli<'_>,
    sp_id: &str,
    role: &str,
    scope: &str,
) -> Result<RoleAssignment> {
    match az.role_assignments(sp_id, role, scope).await {
        Ok(existing) => {
            if let Some(assignment) = find_assignment(existing, sp_id, role) {
                info!("Reusing role assignment {}", assignment.id);
                return Ok(assignment);
            }
        }
        Err(err) => match classify_error(ObjectKind::RoleAssignment, &err) {
            Failure::NotFound => {}
            _ => return Err(err),
        },
    }

    info!("Assigning role {} on {} to {}", role, scope, sp_id);
    match az.create_role_assignment(sp_id, role, scope).await {
        Ok(assignment) => Ok(assignment),
        Err(err) => match classify_error(ObjectKind::RoleAssignment, &err) {
            Failure::AlreadyExists => {
                warn!("Role assignment already exists for {}", sp_id);
                let existing = az.role_assignments(sp_id, role, scope).await?;
                find_assignment(existing, sp_id, role).ok_or_else(|| {
                    BootstrapError::NotResolved(format!(
                        "role assignment {} for {} on {} not found in listing",
                        role, sp_id, scope
                    ))
                })
            }
            _ => Err(err),
        },
    }
}

/// Runs the explicit policy.
///
/// The record carries the configured application password only when the
/// application was created by this run; otherwise the stored credential
/// is unknown and the placeholder is used.
pub async fn run(az: &AzureCli<'_>, config: &Config) -> Result<BootstrapRecord> {
    let password = config.ad_app_password.as_deref().ok_or_else(|| {
        BootstrapError::MissingConfig(vec![AZURE_AD_APP_PASSWORD.to_string()])
    })?;

    let subscription = subscription(az, config).await?;
    let app_name = config.ad_app_name.as_str();

    let app = ensure_application(az, app_name, password).await?;
    debug!("Azure AD app ID -> {}", app.app_id);

    let sp_id = ensure_service_principal(az, app_name, &app.app_id).await?;
    debug!("Azure AD sp ID -> {}", sp_id);

    let scope = subscription_scope(&subscription.id);
    let assignment = ensure_role_assignment(az, &sp_id, OWNER_ROLE, &scope).await?;

    let ad_sp_password = if app.created {
        password.to_string()
    } else {
        PLACEHOLDER_PASSWORD.to_string()
    };

    Ok(BootstrapRecord {
        subscription_name: subscription.name,
        subscription_id: subscription.id,
        tenant_id: subscription.tenant_id,
        ad_sp_id: sp_id,
        ad_sp_name: identifier_uri(app_name),
        ad_sp_display_name: app_name.to_string(),
        ad_sp_password,
        ad_app_id: Some(app.app_id),
        role: Some(OWNER_ROLE.to_string()),
        role_assignment_id: Some(assignment.id),
    })
}

//! Classification of Azure CLI failure output.
//!
//! The Azure CLI has no stable machine-readable error codes, so the only way
//! to tell "does not exist" from "already exists" from a real failure is to
//! look for known phrases in what it prints. All of those phrases live in
//! the tables below. They change between CLI releases (the Graph API
//! migration in 2.37 rewrote most of them), so when bumping
//! `AZURE_CLI_VERSION`, check them first.

use crate::BootstrapError;

/// The kind of directory object a command was operating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// `az account ...`
    Subscription,
    /// `az ad app ...`
    Application,
    /// `az ad sp ...`
    ServicePrincipal,
    /// `az role assignment ...`
    RoleAssignment,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscription => write!(f, "subscription"),
            Self::Application => write!(f, "AD application"),
            Self::ServicePrincipal => write!(f, "AD service principal"),
            Self::RoleAssignment => write!(f, "role assignment"),
        }
    }
}

/// What a failed command means for the idempotent workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The object does not exist; create it.
    NotFound,
    /// The object already exists; recover its identifier by listing.
    AlreadyExists,
    /// Anything else; fatal.
    Unrecognized,
}

const GRAPH_NOT_FOUND: &[&str] = &[
    "does not exist or one of its queried reference-property objects are not present",
    "Resource not found",
];

/// `az role assignment list --assignee http://<name>` on a principal that
/// does not exist fails with a 400 on the legacy Graph endpoint, and with a
/// lookup error on newer CLIs.
const ROLE_ASSIGNMENT_NOT_FOUND: &[&str] = &[
    "Operation failed with status: 'Bad Request'. Details: 400 Client Error: Bad Request for url",
    "Cannot find user or service principal in graph database",
];

const ROLE_ASSIGNMENT_EXISTS: &[&str] = &["The role assignment already exists"];

const SERVICE_PRINCIPAL_EXISTS: &[&str] =
    &["Another object with the same value for property servicePrincipalNames already exists"];

const APPLICATION_EXISTS: &[&str] =
    &["Another object with the same value for property identifierUris already exists"];

fn signatures(kind: ObjectKind) -> (&'static [&'static str], &'static [&'static str]) {
    match kind {
        ObjectKind::Subscription => (&[], &[]),
        ObjectKind::Application => (GRAPH_NOT_FOUND, APPLICATION_EXISTS),
        ObjectKind::ServicePrincipal => (GRAPH_NOT_FOUND, SERVICE_PRINCIPAL_EXISTS),
        ObjectKind::RoleAssignment => (ROLE_ASSIGNMENT_NOT_FOUND, ROLE_ASSIGNMENT_EXISTS),
    }
}

/// Classifies raw failure text for a command on `kind`.
///
/// # Example
///
/// ```
/// use azsp_bootstrap::classify::{classify, Failure, ObjectKind};
///
/// let text = "ERROR: The role assignment already exists.";
/// assert_eq!(classify(ObjectKind::RoleAssignment, text), Failure::AlreadyExists);
/// assert_eq!(classify(ObjectKind::Application, text), Failure::Unrecognized);
/// ```
pub fn classify(kind: ObjectKind, text: &str) -> Failure {
    let (not_found, exists) = signatures(kind);

    if exists.iter().any(|sig| text.contains(sig)) {
        Failure::AlreadyExists
    } else if not_found.iter().any(|sig| text.contains(sig)) {
        Failure::NotFound
    } else {
        Failure::Unrecognized
    }
}

/// Classifies an error returned by the workflow.
///
/// Only [`BootstrapError::CommandFailed`] carries failure text; every other
/// error is [`Failure::Unrecognized`].
pub fn classify_error(kind: ObjectKind, err: &BootstrapError) -> Failure {
    err.failure_text()
        .map_or(Failure::Unrecognized, |text| classify(kind, &text))
}

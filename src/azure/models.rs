//! JSON shapes printed by the Azure CLI.
//!
//! Only the fields the workflow reads are modelled. Field names moved
//! around when the CLI switched from AAD Graph to Microsoft Graph, so a few
//! of them accept both spellings.

use serde::{Deserialize, Serialize};

/// `az account show`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `az role assignment list`, or the result of `create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub id: String,
    pub principal_id: String,
    #[serde(default)]
    pub principal_name: Option<String>,
    #[serde(default)]
    pub role_definition_name: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Output of `az ad sp create-for-rbac`. The only place a password shows up.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedServicePrincipal {
    pub app_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub tenant: Option<String>,
}

impl std::fmt::Debug for CreatedServicePrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedServicePrincipal")
            .field("app_id", &self.app_id)
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("password", &crate::process::MASK)
            .field("tenant", &self.tenant)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalProperties {
    #[serde(default)]
    pub app_display_name: Option<String>,
}

/// `az ad sp show` / `list` / `create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_display_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub service_principal_names: Vec<String>,
    #[serde(default)]
    pub additional_properties: Option<AdditionalProperties>,
}

impl ServicePrincipal {
    /// Directory object id (`objectId` on AAD Graph, `id` on Microsoft Graph).
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref().or(self.id.as_deref())
    }

    /// Display name of the owning application, wherever this CLI put it.
    pub fn app_display_name(&self) -> Option<&str> {
        self.app_display_name
            .as_deref()
            .or_else(|| {
                self.additional_properties
                    .as_ref()
                    .and_then(|p| p.app_display_name.as_deref())
            })
            .or(self.display_name.as_deref())
    }
}

/// `az ad app show` / `list` / `create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub app_id: String,
    pub display_name: String,
    #[serde(default)]
    pub identifier_uris: Vec<String>,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

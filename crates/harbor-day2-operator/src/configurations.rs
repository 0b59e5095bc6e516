//! System configuration document.

use harbor_day2_api::{ApiResult, Document, RegistryClient};
use serde_json::Value;
use tracing::info;

use crate::config::OidcSettings;

/// Sets the OIDC secret and endpoint from settings, overriding the document.
pub fn inject_oidc(document: &mut Document, oidc: &OidcSettings) {
    if let Some(secret) = &oidc.client_secret {
        document.insert("oidc_client_secret".into(), Value::String(secret.clone()));
    }
    if let Some(endpoint) = &oidc.endpoint {
        document.insert("oidc_endpoint".into(), Value::String(endpoint.clone()));
    }
}

pub async fn sync_configurations(
    client: &dyn RegistryClient,
    mut document: Document,
    oidc: &OidcSettings,
) -> ApiResult<()> {
    inject_oidc(&mut document, oidc);
    info!(keys = document.len(), "Updating Harbor configuration");
    client.update_configurations(&document).await
}

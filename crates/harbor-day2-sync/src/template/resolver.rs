use harbor_day2_api::{RegistryClient, ResourceId};
use tracing::{debug, warn};

use super::placeholder::{Placeholder, PlaceholderKind};
use crate::error::TemplateError;

/// Resolves placeholders to the ids the control API uses.
///
/// Each lookup is an exact-name listing query. The referenced entity must
/// already exist; nothing is created here.
#[derive(Clone, Copy)]
pub struct IdentifierResolver<'a> {
    client: &'a dyn RegistryClient,
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(client: &'a dyn RegistryClient) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, placeholder: &Placeholder) -> Result<ResourceId, TemplateError> {
        let kind = placeholder.kind;
        let name = placeholder.name.as_str();
        let lookup_error = |source| TemplateError::Lookup {
            kind,
            name: name.to_string(),
            source,
        };

        let ids: Vec<Option<ResourceId>> = match kind {
            PlaceholderKind::Project => self
                .client
                .list_projects(Some(name))
                .await
                .map_err(lookup_error)?
                .into_iter()
                .map(|project| project.project_id)
                .collect(),
            PlaceholderKind::Registry => self
                .client
                .list_registries(Some(name))
                .await
                .map_err(lookup_error)?
                .into_iter()
                .map(|registry| registry.id)
                .collect(),
        };

        let Some(first) = ids.first() else {
            return Err(TemplateError::Unresolved {
                kind,
                name: name.to_string(),
            });
        };
        if ids.len() > 1 {
            warn!(kind = %kind, name, matches = ids.len(), "Ambiguous reference, using the first match");
        }
        let id = first.ok_or_else(|| TemplateError::MissingId {
            kind,
            name: name.to_string(),
        })?;
        debug!(kind = %kind, name, id, "Resolved placeholder");
        Ok(id)
    }
}

use harbor_day2_api::RegistryClient;
use serde_json::Value;
use tracing::debug;

use super::context::SubstitutionContext;
use super::placeholder::{PLACEHOLDER, Placeholder, scan};
use super::resolver::IdentifierResolver;
use crate::error::TemplateError;

/// Renders placeholders in a document against live service state.
#[derive(Clone, Copy)]
pub struct TemplateRenderer<'a> {
    resolver: IdentifierResolver<'a>,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(client: &'a dyn RegistryClient) -> Self {
        Self {
            resolver: IdentifierResolver::new(client),
        }
    }

    /// Returns `document` with every placeholder replaced by its id.
    ///
    /// A document without placeholders comes back unchanged and costs no
    /// API call. Any failing placeholder fails the whole render.
    pub async fn render(&self, document: &str) -> Result<String, TemplateError> {
        let placeholders = scan(document);
        if placeholders.is_empty() {
            return Ok(document.to_string());
        }
        debug!(count = placeholders.len(), "Resolving placeholders");

        let mut context = SubstitutionContext::new();
        for placeholder in &placeholders {
            let id = self.resolver.resolve(placeholder).await?;
            context.insert(&placeholder.token(), id)?;
        }
        substitute(document, &context)
    }
}

/// Replaces every placeholder in `document` with its value from `context`.
pub fn substitute(document: &str, context: &SubstitutionContext) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(document.len());
    let mut last = 0;
    for captures in PLACEHOLDER.captures_iter(document) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(placeholder) = Placeholder::from_captures(&captures) else {
            continue;
        };
        let token = placeholder.token();
        let value = context
            .get(&token)
            .ok_or(TemplateError::Unbound { token })?;

        rendered.push_str(&document[last..whole.start()]);
        match value {
            Value::String(text) => rendered.push_str(text),
            other => rendered.push_str(&other.to_string()),
        }
        last = whole.end();
    }
    rendered.push_str(&document[last..]);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_replaces_only_placeholders() {
        let mut context = SubstitutionContext::new();
        context.insert("project:p1", 42).unwrap();
        context.insert("registry:hub.eu", 7).unwrap();

        let document = r#"{"ref": {{ project:p1 }}, "dest": {{registry:hub.eu}}, "note": "{{ other }}"}"#;
        assert_eq!(
            substitute(document, &context).unwrap(),
            r#"{"ref": 42, "dest": 7, "note": "{{ other }}"}"#
        );
    }

    #[test]
    fn test_substitute_fails_on_unbound_token() {
        let context = SubstitutionContext::new();
        let err = substitute("{{ project:p1 }}", &context).unwrap_err();
        assert!(matches!(err, TemplateError::Unbound { ref token } if token == "project:p1"));
    }
}

//! Placeholder rendering for configuration documents.
//!
//! Documents may reference live identifiers with `{{ project:NAME }}` or
//! `{{ registry:NAME }}`. Rendering scans the raw text, resolves each
//! distinct placeholder once, collects the ids in a nested
//! [`SubstitutionContext`] (dots in a token denote nesting) and substitutes
//! them back. Nothing else in the document is touched.

mod context;
mod placeholder;
mod renderer;
mod resolver;

pub use context::SubstitutionContext;
pub use placeholder::{Placeholder, PlaceholderKind, scan};
pub use renderer::{TemplateRenderer, substitute};
pub use resolver::IdentifierResolver;

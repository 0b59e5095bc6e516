use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::error::TemplateError;

/// Slot holding the value of a path that also has children. Placeholder
/// names cannot contain `@`, so it never collides with a segment.
const LEAF_KEY: &str = "@";

/// Values available to the renderer, addressed by dotted path.
///
/// `project:team.a` and `project:team.b` share the branch `project:team`.
/// `project:team` itself may be bound as well; its value then lives in the
/// branch under a reserved slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstitutionContext {
    root: Map<String, Value>,
}

impl SubstitutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` at `path`, creating intermediate objects.
    ///
    /// Binding a path a second time to a different value is an error.
    pub fn insert(&mut self, path: &str, value: impl Into<Value>) -> Result<(), TemplateError> {
        let conflict = || TemplateError::ConflictingPath {
            path: path.to_string(),
        };
        let segments: Vec<&str> = path.split('.').collect();
        let Some((leaf, branches)) = segments.split_last() else {
            return Err(conflict());
        };

        let mut node = &mut self.root;
        for segment in branches {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                let value = child.take();
                *child = Value::Object(Map::from_iter([(LEAF_KEY.to_string(), value)]));
            }
            node = match child {
                Value::Object(map) => map,
                _ => return Err(conflict()),
            };
        }

        let value = value.into();
        let slot = if matches!(node.get(*leaf), Some(Value::Object(_))) {
            match node.get_mut(*leaf) {
                Some(Value::Object(branch)) => branch.entry(LEAF_KEY),
                _ => return Err(conflict()),
            }
        } else {
            node.entry(*leaf)
        };
        match slot {
            Entry::Occupied(existing) if *existing.get() != value => Err(conflict()),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                Ok(())
            }
        }
    }

    /// Value bound at `path`, if one was inserted.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut value = self.root.get(first)?;
        for segment in segments {
            value = value.as_object()?.get(segment)?;
        }
        match value {
            Value::Object(branch) => branch.get(LEAF_KEY),
            leaf => Some(leaf),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

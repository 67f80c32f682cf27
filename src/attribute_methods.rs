//! Canonical, sorted view of an annotation type's attributes (§4.1).

use std::collections::HashMap;

use crate::provider::{Attribute, ValueKind};

/// An ordered, indexed view over one annotation type's attributes.
///
/// Attributes are sorted lexicographically by name so iteration order is
/// deterministic regardless of what order the `IntrospectionProvider`
/// happened to report them in.
#[derive(Debug, Clone)]
pub struct AttributeMethods {
    attributes: Vec<Attribute>,
    index_by_name: HashMap<String, usize>,
}

impl AttributeMethods {
    /// The canonical empty instance, returned for a null or attribute-less
    /// annotation type. Shared rather than rebuilt since it never changes.
    pub fn none() -> Self {
        Self { attributes: Vec::new(), index_by_name: HashMap::new() }
    }

    pub fn new(mut attributes: Vec<Attribute>) -> Self {
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        let index_by_name = attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name.clone(), i))
            .collect();
        Self { attributes, index_by_name }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Attribute> {
        self.index_by_name.get(name).and_then(|&i| self.attributes.get(i))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// True iff exactly one attribute exists and it is named `value`, the
    /// shape required of every repeatable container (§4.3) and the common
    /// shorthand annotation shape (`@Foo("bar")` desugars to `value = "bar"`).
    pub fn is_only_value_attribute(&self) -> bool {
        self.attributes.len() == 1 && self.attributes[0].name == "value"
    }

    /// True iff any attribute declares a default value.
    pub fn has_default_value_method(&self) -> bool {
        self.attributes.iter().any(|a| a.default_value.is_some())
    }

    /// True for class-typed or class-array-typed attributes: reading them
    /// eagerly can fail if the referenced class cannot be loaded, so callers
    /// may want to guard or defer evaluation.
    pub fn can_throw_type_not_present_exception(&self, index: usize) -> bool {
        self.attributes
            .get(index)
            .map(|a| a.kind.can_throw_type_not_present())
            .unwrap_or(false)
    }
}

impl Default for AttributeMethods {
    fn default() -> Self {
        Self::none()
    }
}

/// Convenience constructor straight from a declared kind list, mostly useful
/// in tests that don't need full [`Attribute`] metadata.
pub fn attribute(owner: &str, name: &str, kind: ValueKind) -> Attribute {
    Attribute::new(owner, name, kind)
}

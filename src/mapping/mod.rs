//! For one root annotation type, the tree of all meta-annotations with
//! precomputed alias and mirror tables: the heart of the design (§4.4).
//!
//! An [`AnnotationTypeMappings`] is built once per `(root type, filter,
//! repeatable containers)` triple and then owned by the process-wide cache
//! ([`crate::cache`]); everything in here is immutable once construction
//! succeeds.

mod build;
mod resolve;

use std::collections::BTreeMap;

use crate::attribute_methods::AttributeMethods;
use crate::provider::AttributeValue;

pub(crate) use build::build_mappings;
pub(crate) use resolve::resolve_value;

/// One annotation type reached via a specific meta-annotation path.
#[derive(Debug)]
pub struct AnnotationTypeMapping {
    pub annotation_type: String,
    /// Distance from the root (0 = the root itself).
    pub depth: usize,
    /// Index, within the owning [`AnnotationTypeMappings`], of the mapping
    /// one step closer to root (the type that carries this one as a
    /// meta-annotation). `None` only for the root.
    pub parent: Option<usize>,
    pub attributes: AttributeMethods,
    /// Values fixed at this annotation type's own declaration site (how its
    /// meta-annotation usage was written). Empty for the root mapping: the
    /// root's values come from the per-query declared instance, not from
    /// the type's own (non-existent) fixed usage.
    pub declared_values: BTreeMap<String, AttributeValue>,
    /// Equivalence classes of same-mapping attribute names that must always
    /// carry equal effective values.
    pub mirror_sets: Vec<Vec<String>>,
}

impl AnnotationTypeMapping {
    fn mirror_set_of<'a>(&'a self, name: &str) -> Option<&'a [String]> {
        self.mirror_sets.iter().find(|set| set.iter().any(|n| n == name)).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone)]
struct Edge {
    from_mapping: usize,
    from_name: String,
    explicit: bool,
}

/// The closed list of every mapping reachable from one root type, plus the
/// alias-edge table used to resolve effective values (§4.6).
#[derive(Debug)]
pub struct AnnotationTypeMappings {
    root_type: String,
    mappings: Vec<AnnotationTypeMapping>,
    /// target (mapping index, attribute name) -> candidate override sources,
    /// explicit before convention, shallowest first.
    edges_into: BTreeMap<(usize, String), Vec<Edge>>,
}

impl AnnotationTypeMappings {
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AnnotationTypeMapping> {
        self.mappings.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationTypeMapping> {
        self.mappings.iter()
    }

    /// Index of the (first, shallowest) mapping for `annotation_type`, if
    /// this type's meta-annotation closure reaches it.
    pub fn index_of(&self, annotation_type: &str) -> Option<usize> {
        self.mappings.iter().position(|m| m.annotation_type == annotation_type)
    }

    fn is_ancestor(&self, candidate: usize, of: usize) -> bool {
        let mut cursor = self.mappings[candidate].parent;
        while let Some(idx) = cursor {
            if idx == of {
                return true;
            }
            cursor = self.mappings[idx].parent;
        }
        false
    }
}

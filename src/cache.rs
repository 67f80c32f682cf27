//! Process-wide cache of constructed [`AnnotationTypeMappings`], keyed by
//! the triple that fully determines a mapping tree's shape (§5).
//!
//! Building a mapping tree walks the provider's meta-annotation graph and
//! validates every alias/mirror declaration along the way, expensive
//! enough, and purely a function of static type structure, that doing it
//! once per process (not once per query) is the whole point of this
//! module. Misconfiguration errors are cached too: a type that fails to
//! resolve stays failed, and the warning is only ever logged once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::warn;

use crate::error::Error;
use crate::filter::AnnotationFilter;
use crate::mapping::{build_mappings, AnnotationTypeMappings};
use crate::provider::IntrospectionProvider;
use crate::repeatable::RepeatableContainers;

type CacheKey = (String, u64, u64);

/// A cached build outcome. Kept as an enum (rather than `Arc<Result<...>>`)
/// so a successful build's `AnnotationTypeMappings` can be handed out as its
/// own `Arc` to callers, instead of requiring them to keep the whole cache
/// entry alive just to borrow from it.
enum CacheEntry {
    Built(Arc<AnnotationTypeMappings>),
    Failed(Error),
}
type CacheValue = Arc<CacheEntry>;

static MAPPINGS: Lazy<RwLock<HashMap<CacheKey, CacheValue>>> = Lazy::new(|| RwLock::new(HashMap::new()));

fn key(root_type: &str, filter: &dyn AnnotationFilter, containers: &RepeatableContainers) -> CacheKey {
    (root_type.to_owned(), filter.identity(), containers.identity())
}

/// Returns the cached mapping tree for `(root_type, filter, containers)`,
/// building and inserting it first if this is the first time this triple
/// has been requested.
pub fn get_or_build(
    root_type: &str,
    provider: &dyn IntrospectionProvider,
    filter: &dyn AnnotationFilter,
    containers: &RepeatableContainers,
) -> Result<Arc<AnnotationTypeMappings>, Error> {
    let cache_key = key(root_type, filter, containers);

    if let Some(hit) = MAPPINGS.read().unwrap().get(&cache_key) {
        return entry_result(hit);
    }

    let built = build_mappings(root_type, provider, filter);
    if let Err(err) = &built {
        warn!(root_type, %err, "annotation type mapping failed to build; cached as permanent failure");
    }
    let entry = Arc::new(match built {
        Ok(mappings) => CacheEntry::Built(Arc::new(mappings)),
        Err(err) => CacheEntry::Failed(err),
    });

    let mut guard = MAPPINGS.write().unwrap();
    let committed = Arc::clone(guard.entry(cache_key).or_insert(entry));
    entry_result(&committed)
}

fn entry_result(entry: &CacheEntry) -> Result<Arc<AnnotationTypeMappings>, Error> {
    match entry {
        CacheEntry::Built(mappings) => Ok(Arc::clone(mappings)),
        CacheEntry::Failed(err) => Err(err.clone()),
    }
}

/// Drops every cached mapping tree. Exposed for callers whose
/// `IntrospectionProvider` can observe a live-reloading class definition
/// (the common case, static program metadata, never needs this).
pub fn clear() {
    MAPPINGS.write().unwrap().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::NoneFilter;
    use crate::provider::{AnnotationInstance, Attribute, ElementId, MethodSelector};

    struct EmptyProvider;
    impl IntrospectionProvider for EmptyProvider {
        fn declared_annotations(&self, _: &ElementId) -> Vec<AnnotationInstance> {
            vec![]
        }
        fn meta_annotations(&self, _: &str) -> Vec<AnnotationInstance> {
            vec![]
        }
        fn attributes(&self, _: &str) -> Vec<Attribute> {
            vec![]
        }
        fn superclass(&self, _: &str) -> Option<String> {
            None
        }
        fn interfaces(&self, _: &str) -> Vec<String> {
            vec![]
        }
        fn declaring_methods_matching(&self, _: &str, _: &MethodSelector) -> Vec<ElementId> {
            vec![]
        }
        fn is_bridge(&self, _: &ElementId) -> bool {
            false
        }
        fn bridged_target(&self, _: &ElementId) -> Option<ElementId> {
            None
        }
        fn is_inherited(&self, _: &str) -> bool {
            false
        }
    }

    #[test]
    fn repeated_lookups_return_the_same_allocation() {
        clear();
        let provider = EmptyProvider;
        let containers = RepeatableContainers::none();
        let first = get_or_build("com.example.Marker", &provider, &NoneFilter, &containers).unwrap();
        let second = get_or_build("com.example.Marker", &provider, &NoneFilter, &containers).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn clear_forces_a_rebuild() {
        clear();
        let provider = EmptyProvider;
        let containers = RepeatableContainers::none();
        let first = get_or_build("com.example.Marker", &provider, &NoneFilter, &containers).unwrap();
        clear();
        let second = get_or_build("com.example.Marker", &provider, &NoneFilter, &containers).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}

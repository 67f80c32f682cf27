//! Predicate over annotation type names used to prune infrastructure
//! annotations out of meta-annotation traversal (§4.2).

/// Decides whether an annotation type should be excluded from
/// meta-annotation traversal and merged-annotation results.
///
/// `matches(type_name)` returns `true` when the type should be *hidden*.
/// [`AnnotationFilter::none`] therefore never returns `true`: "matches
/// everything" in the sense of covering every input with a uniform answer,
/// not in the sense of hiding every input; see DESIGN.md for this resolved
/// reading of an otherwise ambiguous upstream description.
pub trait AnnotationFilter: Send + Sync {
    fn matches(&self, type_name: &str) -> bool;

    /// A stable identity for this filter's hidden set, used as part of the
    /// mapping cache key (§5): two filters that hide the same types must
    /// hash the same, regardless of which `Self` allocation computed it.
    fn identity(&self) -> u64;
}

/// Filter that hides nothing. The traversal in §4.4 still stops at
/// self-references and already-visited types, but no type is pruned on
/// account of its name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneFilter;

impl AnnotationFilter for NoneFilter {
    fn matches(&self, _type_name: &str) -> bool {
        false
    }
    fn identity(&self) -> u64 {
        0
    }
}

/// Filter that hides the platform language's own annotation namespace
/// (`java.lang`, `java.lang.annotation`, `kotlin.annotation`, …) and this
/// crate's own infrastructure namespace (`merged_annotations::`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFilter;

const PLATFORM_PREFIXES: &[&str] =
    &["java.lang", "java.lang.annotation", "kotlin.annotation", "kotlin.Metadata"];
const INFRA_PREFIX: &str = "merged_annotations::";

impl AnnotationFilter for PlainFilter {
    fn matches(&self, type_name: &str) -> bool {
        PLATFORM_PREFIXES.iter().any(|p| has_prefix(type_name, p))
            || type_name.starts_with(INFRA_PREFIX)
    }
    fn identity(&self) -> u64 {
        1
    }
}

/// Filter that hides only the platform language's own namespace, not this
/// crate's infrastructure annotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformFilter;

impl AnnotationFilter for PlatformFilter {
    fn matches(&self, type_name: &str) -> bool {
        PLATFORM_PREFIXES.iter().any(|p| has_prefix(type_name, p))
    }
    fn identity(&self) -> u64 {
        2
    }
}

/// Filter over an explicit, caller-supplied list of package prefixes.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    packages: Vec<String>,
}

impl PackageFilter {
    /// Builds a filter matching any type whose dotted package prefix equals
    /// one of `packages`. Rejects a null/empty package string with
    /// [`crate::Error::EmptyPackageElement`].
    pub fn new<I, S>(packages: I) -> Result<Self, crate::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if packages.is_empty() || packages.iter().any(|p| p.is_empty()) {
            return Err(crate::Error::EmptyPackageElement);
        }
        Ok(Self { packages })
    }
}

impl AnnotationFilter for PackageFilter {
    fn matches(&self, type_name: &str) -> bool {
        self.packages.iter().any(|p| has_prefix(type_name, p))
    }
    fn identity(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        3u8.hash(&mut hasher);
        self.packages.hash(&mut hasher);
        hasher.finish()
    }
}

fn has_prefix(type_name: &str, package: &str) -> bool {
    match type_name.rfind('.') {
        Some(idx) => &type_name[..idx] == package,
        None => false,
    }
}

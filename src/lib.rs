//! Hierarchical scanning, alias resolution and merging for annotations
//! observed through a caller-supplied [`IntrospectionProvider`].
//!
//! This crate never reads byte-code or talks to a language runtime itself:
//! callers hand it a reflection capability, and it handles everything
//! downstream of that: walking the meta-annotation graph, resolving
//! `@AliasFor` mirrors and conventions, scanning class/interface/method
//! hierarchies, and merging the result into one queryable view per
//! annotation type.
//!
//! Example, given a `provider: impl IntrospectionProvider`:
//! ```no_run
//! use merged_annotations::{
//!     ElementId, MergedAnnotations, NoneFilter, RepeatableContainers, SearchStrategy,
//! };
//! # use merged_annotations::IntrospectionProvider;
//! # fn run(provider: &dyn IntrospectionProvider) -> Result<(), merged_annotations::Error> {
//! let source = ElementId::class("com.example.UserController");
//! let merged = MergedAnnotations::from(
//!     &source,
//!     SearchStrategy::Exhaustive,
//!     None,
//!     &NoneFilter,
//!     &RepeatableContainers::none(),
//!     provider,
//! )?;
//! if merged.is_present("com.example.RequestMapping") {
//!     let path = merged.get("com.example.RequestMapping").get_string("path")?;
//!     println!("mapped at {path}");
//! }
//! # Ok(())
//! # }
//! ```

mod attribute_methods;
mod cache;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod merged;
pub mod provider;
pub mod registry;
pub mod repeatable;
pub mod scanner;
pub mod synthesize;

pub use attribute_methods::AttributeMethods;
pub use cache::clear as clear_mapping_cache;
pub use error::Error;
pub use filter::{AnnotationFilter, NoneFilter, PackageFilter, PlainFilter, PlatformFilter};
pub use mapping::{AnnotationTypeMapping, AnnotationTypeMappings};
pub use merged::{AsMapOptions, MergedAnnotation, MergedAnnotations};
pub use provider::{
    AliasFor, AliasTarget, AnnotationInstance, Attribute, AttributeValue, ElementId,
    ElementKind, IntrospectionProvider, MethodSelector, ValueKind,
};
pub use registry::{AnnotationIndex, AnnotationRegistries, IndexAnswer};
pub use repeatable::RepeatableContainers;
pub use scanner::{scan, Aggregate, SearchStrategy};
pub use synthesize::{StructuralSynthesizer, Synthesized, Synthesizer};

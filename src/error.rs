//! Errors that may arise when resolving, mapping, and merging annotations.

use std::fmt;

#[derive(Debug)]
/// Errors raised while building alias mappings for an annotation type,
/// or while resolving a merged attribute value.
pub enum Error {
    // Misconfiguration (construction-time)
    /// An `AliasFor` declaration is not reciprocated by the attribute it targets.
    /// Value: `(annotation_type, attribute_a, attribute_b)`
    MissingMirroredAlias(String, String, String),
    /// An `AliasFor` declaration targets an attribute that does not exist.
    /// Value: `(target_annotation, target_attribute)`
    NonexistentAttribute(String, String),
    /// Two mirrored or aliased attributes do not share the same declared value kind.
    /// Value: `(attribute_a, attribute_b)`
    IncompatibleTypes(String, String),
    /// Two mirrored or aliased attributes have mismatched default values
    /// (one has a default and the other doesn't, or the defaults differ).
    /// Value: `(attribute_a, attribute_b)`
    InconsistentDefaults(String, String),
    /// An `AliasFor(value = X, attribute = Y)` declaration set both fields
    /// to different, non-empty values.
    /// Value: the attribute carrying the declaration.
    AmbiguousAliasDeclaration(String),
    /// An `AliasFor(annotation = M, ...)` declaration names a meta-annotation
    /// that is not actually reachable from this mapping.
    /// Value: `(attribute, meta_annotation)`
    MetaAnnotationNotPresent(String, String),
    /// A repeatable container is misconfigured: its `value` attribute is
    /// missing, not an array, or does not wrap the declared repeatable type.
    /// Value: container type name.
    ContainerMisconfigured(String),
    /// An `AliasFor` declaration targets its own attribute.
    /// Value: the attribute.
    AliasPointsToItself(String),
    /// A self-referential annotation type (`@A` on `A`) declares an alias
    /// whose target cannot be resolved within the single mapping produced
    /// for it.
    /// Value: the attribute.
    SelfReferentialMissingTarget(String),

    // Resolution-time
    /// Two attributes in the same mirror set resolved to different
    /// non-default values.
    /// Value: `(attribute_a, value_a, attribute_b, value_b)`
    MirrorConflict(String, String, String, String),
    /// An explicit alias edge and a convention-based alias edge resolved to
    /// different non-default values for the same attribute.
    /// Value: the attribute.
    ConventionConflict(String),
    /// A raw value could not be coerced to the attribute's declared kind.
    /// Value: `(attribute, expected_kind)`
    AttributeTypeMismatch(String, String),
    /// No attribute with this name exists on the requested annotation type.
    /// Value: `(annotation_type, attribute)`
    UnknownAttribute(String, String),
    /// An attribute has no default and no value was ever supplied for it.
    /// Value: `(annotation_type, attribute)`
    MissingRequiredAttribute(String, String),
    /// The `IntrospectionProvider` failed; the original cause is not
    /// `Clone`, so only its rendered message survives into the cache.
    IntrospectionFailure(String),

    // Input
    /// A required argument was null/empty where a value was expected.
    NullArgument(&'static str),
    /// `AnnotationFilter::packages` was given an empty package string.
    EmptyPackageElement,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingMirroredAlias(ty, a, b) => write!(
                f,
                "'{a}' declares @AliasFor('{b}') on '{ty}' but '{b}' does not declare it back"
            ),
            Error::NonexistentAttribute(ty, attr) => {
                write!(f, "no attribute '{attr}' on annotation type '{ty}'")
            }
            Error::IncompatibleTypes(a, b) => {
                write!(f, "attributes '{a}' and '{b}' do not share a value kind")
            }
            Error::InconsistentDefaults(a, b) => write!(
                f,
                "attributes '{a}' and '{b}' must both have no default, or identical defaults"
            ),
            Error::AmbiguousAliasDeclaration(attr) => write!(
                f,
                "'{attr}' declares @AliasFor with both 'value' and 'attribute' set to different names"
            ),
            Error::MetaAnnotationNotPresent(attr, meta) => write!(
                f,
                "'{attr}' declares @AliasFor(annotation = '{meta}') but '{meta}' is not a meta-annotation on this path"
            ),
            Error::ContainerMisconfigured(container) => write!(
                f,
                "'{container}' is not a valid repeatable container (must declare a single 'value' attribute of array-of-repeatable type)"
            ),
            Error::AliasPointsToItself(attr) => {
                write!(f, "'{attr}' declares @AliasFor pointing at itself")
            }
            Error::SelfReferentialMissingTarget(attr) => write!(
                f,
                "'{attr}' declares an alias target unreachable in its own (self-annotated) mapping"
            ),
            Error::MirrorConflict(a, va, b, vb) => write!(
                f,
                "mirror conflict: '{a}' = {va} but '{b}' = {vb}, both set to non-default values"
            ),
            Error::ConventionConflict(attr) => write!(
                f,
                "'{attr}' resolves to different values via an explicit alias and a naming convention"
            ),
            Error::AttributeTypeMismatch(attr, kind) => {
                write!(f, "'{attr}' could not be coerced to {kind}")
            }
            Error::UnknownAttribute(ty, attr) => {
                write!(f, "'{ty}' has no attribute named '{attr}'")
            }
            Error::MissingRequiredAttribute(ty, attr) => write!(
                f,
                "'{attr}' on '{ty}' has no default and no value was supplied"
            ),
            Error::IntrospectionFailure(msg) => write!(f, "introspection failure: {msg}"),
            Error::NullArgument(name) => write!(f, "argument '{name}' must not be null/empty"),
            Error::EmptyPackageElement => {
                write!(f, "package name passed to AnnotationFilter::packages was empty")
            }
        }
    }
}

/// A `Clone`-able, `Error`-returning result type is central to this crate:
/// construction-time failures are cached, so the error itself must be
/// cheap to duplicate rather than re-derived from a live exception.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::MissingMirroredAlias(a, b, c) => {
                Error::MissingMirroredAlias(a.clone(), b.clone(), c.clone())
            }
            Error::NonexistentAttribute(a, b) => {
                Error::NonexistentAttribute(a.clone(), b.clone())
            }
            Error::IncompatibleTypes(a, b) => Error::IncompatibleTypes(a.clone(), b.clone()),
            Error::InconsistentDefaults(a, b) => {
                Error::InconsistentDefaults(a.clone(), b.clone())
            }
            Error::AmbiguousAliasDeclaration(a) => Error::AmbiguousAliasDeclaration(a.clone()),
            Error::MetaAnnotationNotPresent(a, b) => {
                Error::MetaAnnotationNotPresent(a.clone(), b.clone())
            }
            Error::ContainerMisconfigured(a) => Error::ContainerMisconfigured(a.clone()),
            Error::AliasPointsToItself(a) => Error::AliasPointsToItself(a.clone()),
            Error::SelfReferentialMissingTarget(a) => {
                Error::SelfReferentialMissingTarget(a.clone())
            }
            Error::MirrorConflict(a, b, c, d) => {
                Error::MirrorConflict(a.clone(), b.clone(), c.clone(), d.clone())
            }
            Error::ConventionConflict(a) => Error::ConventionConflict(a.clone()),
            Error::AttributeTypeMismatch(a, b) => {
                Error::AttributeTypeMismatch(a.clone(), b.clone())
            }
            Error::UnknownAttribute(a, b) => Error::UnknownAttribute(a.clone(), b.clone()),
            Error::MissingRequiredAttribute(a, b) => {
                Error::MissingRequiredAttribute(a.clone(), b.clone())
            }
            Error::IntrospectionFailure(a) => Error::IntrospectionFailure(a.clone()),
            Error::NullArgument(a) => Error::NullArgument(a),
            Error::EmptyPackageElement => Error::EmptyPackageElement,
        }
    }
}

/// Converts a boxed introspection-provider failure into `Error::IntrospectionFailure`,
/// discarding the original cause's type but preserving its message.
impl From<Box<dyn std::error::Error>> for Error {
    fn from(err: Box<dyn std::error::Error>) -> Error {
        Error::IntrospectionFailure(err.to_string())
    }
}

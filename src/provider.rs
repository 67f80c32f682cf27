//! The reflection boundary this crate consumes but never implements itself.
//!
//! Everything in this module is a narrow interface or a plain data carrier:
//! actually reading byte-code, running a compiler's type checker, or walking
//! a language runtime's class loader is entirely the caller's job, handed to
//! this crate through [`IntrospectionProvider`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifies a program element that may carry annotations: a class,
/// interface, method, or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId {
    /// Fully-qualified name of the declaring type.
    pub type_name: String,
    pub kind: ElementKind,
    /// `Some(signature)` for methods/constructors, `None` for classes/interfaces.
    pub member: Option<String>,
}

impl ElementId {
    pub fn class(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), kind: ElementKind::Class, member: None }
    }

    pub fn interface(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), kind: ElementKind::Interface, member: None }
    }

    pub fn method(type_name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            kind: ElementKind::Method,
            member: Some(signature.into()),
        }
    }

    pub fn constructor(type_name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            kind: ElementKind::Constructor,
            member: Some(signature.into()),
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, ElementKind::Class | ElementKind::Interface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Class,
    Interface,
    Method,
    Constructor,
}

/// Identifies the method a superclass/supertype must declare for
/// `SearchStrategy::SuperClass`/`Exhaustive` method scanning to consider it
/// an override target of the original queried method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSelector {
    pub name: String,
    /// Opaque descriptor string (parameter/return shape); the provider owns
    /// whatever encoding makes two overriding methods compare equal.
    pub descriptor: String,
}

/// The declared kind of an attribute's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    /// A reference to a class/type, carried as its fully-qualified name.
    Class,
    /// An enum constant of the named enum type.
    Enum(String),
    /// A nested annotation of the named annotation type.
    Annotation(String),
    /// A one-dimensional array of any of the above.
    Array(Box<ValueKind>),
}

impl ValueKind {
    /// True for class-typed or class-array-typed attributes: these are the
    /// ones whose eager evaluation could fail if the referenced class isn't
    /// loadable, so callers may want to defer reading them (§4.1).
    pub fn can_throw_type_not_present(&self) -> bool {
        match self {
            ValueKind::Class => true,
            ValueKind::Array(inner) => inner.can_throw_type_not_present(),
            _ => false,
        }
    }
}

/// A realized attribute value, as read from the provider or computed during
/// merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Class(String),
    Enum { type_name: String, constant: String },
    Annotation(AnnotationInstance),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// The [`ValueKind`] this value is an instance of.
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::Bool(_) => ValueKind::Bool,
            AttributeValue::Int(_) => ValueKind::Int,
            AttributeValue::Float(_) => ValueKind::Float,
            AttributeValue::Str(_) => ValueKind::Str,
            AttributeValue::Class(_) => ValueKind::Class,
            AttributeValue::Enum { type_name, .. } => ValueKind::Enum(type_name.clone()),
            AttributeValue::Annotation(a) => ValueKind::Annotation(a.annotation_type.clone()),
            AttributeValue::Array(items) => {
                let inner = items.first().map(|v| v.kind()).unwrap_or(ValueKind::Str);
                ValueKind::Array(Box::new(inner))
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&str> {
        match self {
            AttributeValue::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<(&str, &str)> {
        match self {
            AttributeValue::Enum { type_name, constant } => Some((type_name, constant)),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationInstance> {
        match self {
            AttributeValue::Annotation(a) => Some(a),
            _ => None,
        }
    }

    /// A defensive clone of the underlying array, per §9's rule that array
    /// attributes are never handed out by reference to cached state.
    pub fn as_array(&self) -> Option<Vec<AttributeValue>> {
        match self {
            AttributeValue::Array(items) => Some(items.clone()),
            _ => None,
        }
    }
}

/// An `AliasFor` declaration attached to one attribute.
///
/// `attribute` and `value` are the same slot under two names, mirroring the
/// real annotation's `attribute()`/`value()` dual accessors: a declaration
/// may set either, but not both to different non-empty names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasFor {
    pub annotation: AliasTarget,
    /// `None` means "defaults to the declaring attribute's own name".
    pub attribute: Option<String>,
    /// Legacy alias of `attribute`. Only non-`None` when a provider reflects
    /// a raw declaration that used the `value` accessor instead.
    pub value: Option<String>,
}

impl AliasFor {
    pub fn to_self(attribute: Option<&str>) -> Self {
        Self {
            annotation: AliasTarget::SelfRef,
            attribute: attribute.map(str::to_owned),
            value: None,
        }
    }

    pub fn to_meta(annotation: impl Into<String>, attribute: Option<&str>) -> Self {
        Self {
            annotation: AliasTarget::Annotation(annotation.into()),
            attribute: attribute.map(str::to_owned),
            value: None,
        }
    }

    /// Constructs a declaration the way a provider reflecting a raw
    /// `@AliasFor(annotation = ..., value = ..., attribute = ...)` would,
    /// with both legacy fields intact for [`Self::effective_attribute`] to
    /// reconcile.
    pub fn raw(annotation: AliasTarget, value: Option<&str>, attribute: Option<&str>) -> Self {
        Self {
            annotation,
            attribute: attribute.map(str::to_owned),
            value: value.map(str::to_owned),
        }
    }

    /// Resolves `value`/`attribute` into the single target name the mapping
    /// builder should use. `Err(())` means both were set to different,
    /// non-empty names; the caller attaches the owning attribute's name to
    /// the resulting [`crate::error::Error::AmbiguousAliasDeclaration`].
    pub fn effective_attribute(&self) -> Result<Option<&str>, ()> {
        match (self.value.as_deref(), self.attribute.as_deref()) {
            (Some(v), Some(a)) if v != a => Err(()),
            (Some(v), _) => Ok(Some(v)),
            (None, a) => Ok(a),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasTarget {
    SelfRef,
    Annotation(String),
}

/// One attribute of an annotation type, as reported by the provider.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub owner: String,
    pub name: String,
    pub kind: ValueKind,
    pub default_value: Option<AttributeValue>,
    pub aliases: Vec<AliasFor>,
}

impl Attribute {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, kind: ValueKind) -> Self {
        Self { owner: owner.into(), name: name.into(), kind, default_value: None, aliases: Vec::new() }
    }

    pub fn with_default(mut self, default_value: AttributeValue) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn with_alias(mut self, alias: AliasFor) -> Self {
        self.aliases.push(alias);
        self
    }
}

/// Identity of an [`Attribute`] is `(owner, name)`, per the data model (§3).
impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}
impl Eq for Attribute {}
impl std::hash::Hash for Attribute {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.name.hash(state);
    }
}

/// A realized annotation as observed at a source element or on another
/// annotation type (when it is itself a meta-annotation). Immutable once
/// constructed: only attributes explicitly set by the caller are present,
/// never defaults, which are layered on during merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationInstance {
    pub annotation_type: String,
    values: BTreeMap<String, AttributeValue>,
}

impl AnnotationInstance {
    pub fn new(annotation_type: impl Into<String>, values: BTreeMap<String, AttributeValue>) -> Self {
        Self { annotation_type: annotation_type.into(), values }
    }

    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }

    /// The explicitly-supplied value for `name`, or `None` if the caller
    /// left it at its default (or it does not exist).
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// The single external collaborator this crate depends on: a caller-supplied
/// reflection surface. Implementers must be non-blocking and thread-safe;
/// no operation here may perform I/O.
pub trait IntrospectionProvider: Send + Sync {
    /// Annotations declared directly at `element` (no inheritance, no
    /// meta-annotation expansion), in declaration order.
    fn declared_annotations(&self, element: &ElementId) -> Vec<AnnotationInstance>;

    /// Annotations declared on `annotation_type` itself (its meta-annotations),
    /// in declaration order.
    fn meta_annotations(&self, annotation_type: &str) -> Vec<AnnotationInstance>;

    /// The attributes `annotation_type` declares, in any order,
    /// [`crate::AttributeMethods`] imposes the canonical ordering.
    fn attributes(&self, annotation_type: &str) -> Vec<Attribute>;

    fn superclass(&self, type_name: &str) -> Option<String>;

    fn interfaces(&self, type_name: &str) -> Vec<String>;

    /// Methods on `type_name` that are an override target for `selector`
    /// (used by `SuperClass`/`Exhaustive` method scanning).
    fn declaring_methods_matching(&self, type_name: &str, selector: &MethodSelector) -> Vec<ElementId>;

    fn is_bridge(&self, method: &ElementId) -> bool;

    fn bridged_target(&self, method: &ElementId) -> Option<ElementId>;

    /// Whether `annotation_type` is marked inheritable at the language level
    /// (e.g. carries `java.lang.annotation.Inherited`).
    fn is_inherited(&self, annotation_type: &str) -> bool;
}

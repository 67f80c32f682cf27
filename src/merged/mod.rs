//! The user-facing query surface: the merged view over every annotation
//! reachable from a scanned source element (§4.6).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache;
use crate::error::Error;
use crate::filter::AnnotationFilter;
use crate::mapping::{resolve_value, AnnotationTypeMappings};
use crate::provider::{AnnotationInstance, AttributeValue, ElementId, IntrospectionProvider, MethodSelector};
use crate::repeatable::RepeatableContainers;
use crate::scanner::{self, SearchStrategy};
use crate::synthesize::{StructuralSynthesizer, Synthesized, Synthesizer};

/// Options controlling [`MergedAnnotation::as_map`]'s output shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsMapOptions {
    /// Recursively map nested annotation-typed attributes too, instead of
    /// leaving them as `AttributeValue::Annotation`.
    pub annotation_to_map: bool,
    /// Replace class-typed attribute values with their fully-qualified name
    /// as a plain string, avoiding any implication that the class is loaded.
    pub class_to_string: bool,
}

/// One scanned-and-unwrapped declared annotation instance, with its fully
/// built (possibly cached) meta-annotation tree.
#[derive(Clone)]
struct DeclaredMatch {
    aggregate_index: usize,
    element: ElementId,
    mappings: Arc<AnnotationTypeMappings>,
    root_instance: AnnotationInstance,
}

/// The handle produced by scanning one source element: every declared
/// annotation reachable under a chosen strategy, each with its full
/// meta-annotation closure resolved and ready to query.
pub struct MergedAnnotations {
    source: ElementId,
    matches: Vec<DeclaredMatch>,
}

impl MergedAnnotations {
    /// Scans `source` under `strategy`, unwraps any repeatable containers
    /// encountered, and resolves (from cache, where possible) the full
    /// meta-annotation tree for every declared annotation type found.
    pub fn from(
        source: &ElementId,
        strategy: SearchStrategy,
        selector: Option<&MethodSelector>,
        filter: &dyn AnnotationFilter,
        containers: &RepeatableContainers,
        provider: &dyn IntrospectionProvider,
    ) -> Result<Self, Error> {
        let span = tracing::debug_span!("merge", type_name = %source.type_name, ?strategy);
        let _enter = span.enter();

        let aggregates = scanner::scan(source, strategy, selector, provider)?;
        let mut matches = Vec::new();

        for aggregate in &aggregates {
            for instance in &aggregate.annotations {
                if filter.matches(instance.annotation_type()) {
                    continue;
                }
                for unwrapped in unwrap_repeatable(instance, containers, provider) {
                    let mappings =
                        cache::get_or_build(unwrapped.annotation_type(), provider, filter, containers)?;
                    matches.push(DeclaredMatch {
                        aggregate_index: aggregate.index,
                        element: aggregate.element.clone(),
                        mappings,
                        root_instance: unwrapped,
                    });
                }
            }
        }

        Ok(Self { source: source.clone(), matches })
    }

    pub fn source(&self) -> &ElementId {
        &self.source
    }

    pub fn is_present(&self, annotation_type: &str) -> bool {
        self.best_candidate(annotation_type, |_| true).is_some()
    }

    pub fn get(&self, annotation_type: &str) -> MergedAnnotation {
        self.get_matching(annotation_type, |_| true)
    }

    pub fn get_matching(
        &self,
        annotation_type: &str,
        predicate: impl Fn(&MergedAnnotation) -> bool,
    ) -> MergedAnnotation {
        self.best_candidate(annotation_type, predicate)
            .unwrap_or_else(|| MergedAnnotation::missing(annotation_type))
    }

    /// All matches for `annotation_type`, in the same `(aggregate_index,
    /// depth)` order `get` uses to pick its single winner.
    pub fn stream_of(&self, annotation_type: &str) -> Vec<MergedAnnotation> {
        let mut found = self.candidates(annotation_type);
        found.sort_by_key(|candidate| (candidate.aggregate_index, candidate.depth));
        found
    }

    /// Every reachable annotation across every declared match, in the same
    /// order as [`MergedAnnotations::stream_of`].
    pub fn stream(&self) -> Vec<MergedAnnotation> {
        let mut all = Vec::new();
        for declared in &self.matches {
            for index in 0..declared.mappings.len() {
                all.push(MergedAnnotation::present(declared, index));
            }
        }
        all.sort_by_key(|candidate| (candidate.aggregate_index, candidate.depth));
        all
    }

    fn candidates(&self, annotation_type: &str) -> Vec<MergedAnnotation> {
        self.matches
            .iter()
            .filter_map(|declared| {
                declared.mappings.index_of(annotation_type).map(|idx| MergedAnnotation::present(declared, idx))
            })
            .collect()
    }

    fn best_candidate(
        &self,
        annotation_type: &str,
        predicate: impl Fn(&MergedAnnotation) -> bool,
    ) -> Option<MergedAnnotation> {
        self.candidates(annotation_type)
            .into_iter()
            .filter(predicate)
            .min_by_key(|candidate| (candidate.aggregate_index, candidate.depth))
    }
}

/// Expands `instance` into one or more instances of the repeatable type it
/// wraps, if `containers` recognizes it as a container; otherwise returns it
/// unchanged as the sole element.
fn unwrap_repeatable(
    instance: &AnnotationInstance,
    containers: &RepeatableContainers,
    provider: &dyn IntrospectionProvider,
) -> Vec<AnnotationInstance> {
    if containers.resolve(instance.annotation_type(), provider).is_none() {
        return vec![instance.clone()];
    }
    match instance.get("value") {
        Some(AttributeValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                AttributeValue::Annotation(nested) => Some(nested.clone()),
                _ => None,
            })
            .collect(),
        _ => vec![instance.clone()],
    }
}

/// One resolved annotation: either a real match against a declared instance
/// and its meta-annotation tree, or the `missing` sentinel `get`/`get_matching`
/// return when nothing satisfied the query.
#[derive(Clone)]
pub struct MergedAnnotation {
    annotation_type: String,
    present: bool,
    depth: usize,
    aggregate_index: usize,
    source: Option<ElementId>,
    mappings: Option<Arc<AnnotationTypeMappings>>,
    mapping_index: usize,
    root_instance: Option<AnnotationInstance>,
}

impl MergedAnnotation {
    fn present(declared: &DeclaredMatch, mapping_index: usize) -> Self {
        let mapping = declared.mappings.get(mapping_index).expect("index_of returned a valid index");
        Self {
            annotation_type: mapping.annotation_type.clone(),
            present: true,
            depth: mapping.depth,
            aggregate_index: declared.aggregate_index,
            source: Some(declared.element.clone()),
            mappings: Some(Arc::clone(&declared.mappings)),
            mapping_index,
            root_instance: Some(declared.root_instance.clone()),
        }
    }

    fn missing(annotation_type: &str) -> Self {
        Self {
            annotation_type: annotation_type.to_owned(),
            present: false,
            depth: 0,
            aggregate_index: 0,
            source: None,
            mappings: None,
            mapping_index: 0,
            root_instance: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn aggregate_index(&self) -> usize {
        self.aggregate_index
    }

    pub fn source(&self) -> Option<&ElementId> {
        self.source.as_ref()
    }

    fn get_value(&self, name: &str) -> Result<AttributeValue, Error> {
        if !self.present {
            return Err(Error::UnknownAttribute(self.annotation_type.clone(), name.to_owned()));
        }
        resolve_value(
            self.mappings.as_ref().expect("present implies mappings"),
            self.mapping_index,
            name,
            self.root_instance.as_ref().expect("present implies an instance"),
        )
    }

    pub fn get_default_value(&self, name: &str) -> Option<AttributeValue> {
        self.mappings.as_ref()?.get(self.mapping_index)?.attributes.get_by_name(name)?.default_value.clone()
    }

    pub fn has_default_value(&self, name: &str) -> bool {
        self.get_default_value(name).is_some()
    }

    pub fn has_non_default_value(&self, name: &str) -> Result<bool, Error> {
        let value = self.get_value(name)?;
        Ok(self.get_default_value(name).as_ref() != Some(&value))
    }

    pub fn get_string(&self, name: &str) -> Result<String, Error> {
        match self.get_value(name)? {
            AttributeValue::Str(s) => Ok(s),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "string".to_owned())),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, Error> {
        match self.get_value(name)? {
            AttributeValue::Int(i) => Ok(i),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "int".to_owned())),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f64, Error> {
        match self.get_value(name)? {
            AttributeValue::Float(f) => Ok(f),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "float".to_owned())),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, Error> {
        match self.get_value(name)? {
            AttributeValue::Bool(b) => Ok(b),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "bool".to_owned())),
        }
    }

    pub fn get_class(&self, name: &str) -> Result<String, Error> {
        match self.get_value(name)? {
            AttributeValue::Class(c) => Ok(c),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "class".to_owned())),
        }
    }

    /// An empty `constant` means the provider could resolve the enum type
    /// but not the specific constant (the annotation was compiled against an
    /// enum that has since dropped that member), propagated rather than
    /// silently ignored, per the undocumented upstream behavior this crate
    /// resolves conservatively.
    pub fn get_enum(&self, name: &str) -> Result<(String, String), Error> {
        match self.get_value(name)? {
            AttributeValue::Enum { constant, .. } if constant.is_empty() => {
                Err(Error::IntrospectionFailure(format!("enum constant for '{name}' could not be resolved")))
            }
            AttributeValue::Enum { type_name, constant } => Ok((type_name, constant)),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "enum".to_owned())),
        }
    }

    pub fn get_annotation(&self, name: &str) -> Result<AnnotationInstance, Error> {
        match self.get_value(name)? {
            AttributeValue::Annotation(a) => Ok(a),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "annotation".to_owned())),
        }
    }

    /// A defensive copy: array-typed attribute values are never handed out
    /// by reference to cached state (§9).
    pub fn get_array(&self, name: &str) -> Result<Vec<AttributeValue>, Error> {
        match self.get_value(name)? {
            AttributeValue::Array(items) => Ok(items),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "array".to_owned())),
        }
    }

    pub fn get_strings(&self, name: &str) -> Result<Vec<String>, Error> {
        self.get_array(name)?
            .into_iter()
            .map(|v| match v {
                AttributeValue::Str(s) => Ok(s),
                _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "string".to_owned())),
            })
            .collect()
    }

    /// Hands the merged view to the synthesis boundary (§4.8).
    pub fn synthesize(&self) -> Result<Synthesized, Error> {
        let map = self.as_map(AsMapOptions::default())?;
        Ok(StructuralSynthesizer.synthesize(&self.annotation_type, &map))
    }

    /// Serializes every attribute's effective value into a plain map
    /// (§4.6).
    pub fn as_map(&self, options: AsMapOptions) -> Result<BTreeMap<String, AttributeValue>, Error> {
        let mut map = BTreeMap::new();
        if !self.present {
            return Ok(map);
        }
        let mapping = self.mappings.as_ref().unwrap().get(self.mapping_index).unwrap();
        for attr in mapping.attributes.iter() {
            let mut value = self.get_value(&attr.name)?;
            value = apply_map_options(value, options);
            map.insert(attr.name.clone(), value);
        }
        Ok(map)
    }
}

fn apply_map_options(value: AttributeValue, options: AsMapOptions) -> AttributeValue {
    match value {
        AttributeValue::Class(name) if options.class_to_string => AttributeValue::Str(name),
        AttributeValue::Annotation(instance) if options.annotation_to_map => {
            let mut nested = BTreeMap::new();
            for name in instance.attribute_names() {
                if let Some(v) = instance.get(name) {
                    nested.insert(name.to_owned(), apply_map_options(v.clone(), options));
                }
            }
            AttributeValue::Annotation(AnnotationInstance::new(instance.annotation_type().to_owned(), nested))
        }
        AttributeValue::Array(items) => {
            AttributeValue::Array(items.into_iter().map(|v| apply_map_options(v, options)).collect())
        }
        other => other,
    }
}

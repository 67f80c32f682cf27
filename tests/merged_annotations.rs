//! End-to-end scenarios exercising the scan -> mapping -> merge pipeline
//! through the public API only, one test per concrete example worked
//! through by hand during design.

use std::collections::{BTreeMap, HashMap};

use merged_annotations::{
    AliasFor, AnnotationInstance, Attribute, ElementId, Error, IntrospectionProvider, MergedAnnotations,
    MethodSelector, NoneFilter, RepeatableContainers, SearchStrategy, ValueKind,
};

#[derive(Default)]
struct TestProvider {
    declared: HashMap<ElementId, Vec<AnnotationInstance>>,
    metas: HashMap<&'static str, Vec<AnnotationInstance>>,
    attrs: HashMap<&'static str, Vec<Attribute>>,
    superclasses: HashMap<&'static str, &'static str>,
    interfaces: HashMap<&'static str, Vec<&'static str>>,
    inherited: std::collections::HashSet<&'static str>,
}

impl TestProvider {
    fn declare(&mut self, element: ElementId, annotations: Vec<AnnotationInstance>) {
        self.declared.insert(element, annotations);
    }
}

impl IntrospectionProvider for TestProvider {
    fn declared_annotations(&self, element: &ElementId) -> Vec<AnnotationInstance> {
        self.declared.get(element).cloned().unwrap_or_default()
    }
    fn meta_annotations(&self, annotation_type: &str) -> Vec<AnnotationInstance> {
        self.metas.get(annotation_type).cloned().unwrap_or_default()
    }
    fn attributes(&self, annotation_type: &str) -> Vec<Attribute> {
        self.attrs.get(annotation_type).cloned().unwrap_or_default()
    }
    fn superclass(&self, type_name: &str) -> Option<String> {
        self.superclasses.get(type_name).map(|s| s.to_string())
    }
    fn interfaces(&self, type_name: &str) -> Vec<String> {
        self.interfaces.get(type_name).cloned().unwrap_or_default().into_iter().map(String::from).collect()
    }
    fn declaring_methods_matching(&self, _type_name: &str, _selector: &MethodSelector) -> Vec<ElementId> {
        vec![]
    }
    fn is_bridge(&self, _method: &ElementId) -> bool {
        false
    }
    fn bridged_target(&self, _method: &ElementId) -> Option<ElementId> {
        None
    }
    fn is_inherited(&self, annotation_type: &str) -> bool {
        self.inherited.contains(annotation_type)
    }
}

fn str_array(values: &[&str]) -> merged_annotations::AttributeValue {
    merged_annotations::AttributeValue::Array(
        values.iter().map(|v| merged_annotations::AttributeValue::Str((*v).to_owned())).collect(),
    )
}

fn array_of_str() -> ValueKind {
    ValueKind::Array(Box::new(ValueKind::Str))
}

fn instance(ty: &str, values: &[(&str, merged_annotations::AttributeValue)]) -> AnnotationInstance {
    let mut map = BTreeMap::new();
    for (k, v) in values {
        map.insert((*k).to_owned(), v.clone());
    }
    AnnotationInstance::new(ty, map)
}

/// Scenario 1: `WebMapping` cross-aliases `value`/`path`; setting one
/// resolves both.
#[test]
fn simple_alias_resolves_both_mirrored_names() {
    merged_annotations::clear_mapping_cache();
    let mut provider = TestProvider::default();
    let class = ElementId::class("com.example.C");
    provider.declare(
        class.clone(),
        vec![instance("WebMapping", &[("value", str_array(&["/x"]))])],
    );
    provider.attrs.insert(
        "WebMapping",
        vec![
            Attribute::new("WebMapping", "value", array_of_str()).with_alias(AliasFor::to_self(Some("path"))),
            Attribute::new("WebMapping", "path", array_of_str()).with_alias(AliasFor::to_self(Some("value"))),
        ],
    );

    let merged = MergedAnnotations::from(
        &class,
        SearchStrategy::Direct,
        None,
        &NoneFilter,
        &RepeatableContainers::none(),
        &provider,
    )
    .unwrap();
    let mapping = merged.get("WebMapping");
    assert_eq!(mapping.get_strings("value").unwrap(), vec!["/x"]);
    assert_eq!(mapping.get_strings("path").unwrap(), vec!["/x"]);
}

/// Scenario 2: `SpringAppConfig.locations` explicitly aliases
/// `ContextConfig.locations`, which is itself mirrored to `value`.
#[test]
fn alias_to_meta_annotation_propagates_through_its_own_mirror() {
    merged_annotations::clear_mapping_cache();
    let mut provider = TestProvider::default();
    let class = ElementId::class("com.example.K");
    provider.declare(
        class.clone(),
        vec![instance("SpringAppConfig", &[("locations", str_array(&["test.xml"]))])],
    );
    provider.attrs.insert(
        "SpringAppConfig",
        vec![Attribute::new("SpringAppConfig", "locations", array_of_str())
            .with_alias(AliasFor::to_meta("ContextConfig", Some("locations")))],
    );
    provider.metas.insert("SpringAppConfig", vec![instance("ContextConfig", &[])]);
    provider.attrs.insert(
        "ContextConfig",
        vec![
            Attribute::new("ContextConfig", "value", array_of_str())
                .with_alias(AliasFor::to_self(Some("locations"))),
            Attribute::new("ContextConfig", "locations", array_of_str())
                .with_alias(AliasFor::to_self(Some("value"))),
        ],
    );

    let merged = MergedAnnotations::from(
        &class,
        SearchStrategy::Direct,
        None,
        &NoneFilter,
        &RepeatableContainers::none(),
        &provider,
    )
    .unwrap();
    let context = merged.get("ContextConfig");
    assert!(context.is_present());
    assert_eq!(context.get_strings("value").unwrap(), vec!["test.xml"]);
    assert_eq!(context.get_strings("locations").unwrap(), vec!["test.xml"]);
}

/// Scenario 3: same shape, but the alias is implied purely by both
/// attributes sharing the name `locations`.
#[test]
fn naming_convention_resolves_without_an_explicit_alias_declaration() {
    merged_annotations::clear_mapping_cache();
    let mut provider = TestProvider::default();
    let class = ElementId::class("com.example.K");
    provider.declare(
        class.clone(),
        vec![instance(
            "ConventionBasedComposedContextConfig",
            &[("locations", str_array(&["explicitDeclaration"]))],
        )],
    );
    provider.attrs.insert(
        "ConventionBasedComposedContextConfig",
        vec![Attribute::new("ConventionBasedComposedContextConfig", "locations", array_of_str())],
    );
    provider
        .metas
        .insert("ConventionBasedComposedContextConfig", vec![instance("ContextConfig", &[])]);
    provider.attrs.insert(
        "ContextConfig",
        vec![
            Attribute::new("ContextConfig", "value", array_of_str())
                .with_alias(AliasFor::to_self(Some("locations"))),
            Attribute::new("ContextConfig", "locations", array_of_str())
                .with_alias(AliasFor::to_self(Some("value"))),
        ],
    );

    let merged = MergedAnnotations::from(
        &class,
        SearchStrategy::Direct,
        None,
        &NoneFilter,
        &RepeatableContainers::none(),
        &provider,
    )
    .unwrap();
    let context = merged.get("ContextConfig");
    assert_eq!(context.get_strings("value").unwrap(), vec!["explicitDeclaration"]);
    assert_eq!(context.get_strings("locations").unwrap(), vec!["explicitDeclaration"]);
}

/// Scenario 4: conflicting explicit values on both mirror members must
/// surface `Error::MirrorConflict`, not silently pick one.
#[test]
fn mirror_conflict_is_reported_on_every_getter() {
    merged_annotations::clear_mapping_cache();
    let mut provider = TestProvider::default();
    let method = ElementId::method("com.example.K", "doIt()");
    provider.declare(
        method.clone(),
        vec![instance(
            "WebMapping",
            &[("value", str_array(&["/enigma"])), ("path", str_array(&["/test"]))],
        )],
    );
    provider.attrs.insert(
        "WebMapping",
        vec![
            Attribute::new("WebMapping", "value", array_of_str()).with_alias(AliasFor::to_self(Some("path"))),
            Attribute::new("WebMapping", "path", array_of_str()).with_alias(AliasFor::to_self(Some("value"))),
        ],
    );

    let merged = MergedAnnotations::from(
        &method,
        SearchStrategy::Direct,
        None,
        &NoneFilter,
        &RepeatableContainers::none(),
        &provider,
    )
    .unwrap();
    let mapping = merged.get("WebMapping");
    assert!(matches!(mapping.get_strings("value"), Err(Error::MirrorConflict(..))));
    assert!(matches!(mapping.get_strings("path"), Err(Error::MirrorConflict(..))));
}

/// Scenario 5: a direct repeatable instance, a container holding two more,
/// and a meta-annotated source all stream in declaration order.
#[test]
fn repeatable_stream_covers_direct_container_and_meta_sources() {
    merged_annotations::clear_mapping_cache();
    let mut provider = TestProvider::default();
    let class = ElementId::class("com.example.K");

    provider.attrs.insert("MyRepeatable", vec![Attribute::new("MyRepeatable", "value", ValueKind::Str)]);
    provider.attrs.insert(
        "MyRepeatableContainer",
        vec![Attribute::new(
            "MyRepeatableContainer",
            "value",
            ValueKind::Array(Box::new(ValueKind::Annotation("MyRepeatable".to_owned()))),
        )],
    );
    provider.metas.insert(
        "MyRepeatableMeta1",
        vec![instance("MyRepeatable", &[("value", merged_annotations::AttributeValue::Str("meta1".to_owned()))])],
    );

    let container_values = merged_annotations::AttributeValue::Array(vec![
        merged_annotations::AttributeValue::Annotation(instance(
            "MyRepeatable",
            &[("value", merged_annotations::AttributeValue::Str("B".to_owned()))],
        )),
        merged_annotations::AttributeValue::Annotation(instance(
            "MyRepeatable",
            &[("value", merged_annotations::AttributeValue::Str("C".to_owned()))],
        )),
    ]);
    provider.declare(
        class.clone(),
        vec![
            instance("MyRepeatable", &[("value", merged_annotations::AttributeValue::Str("A".to_owned()))]),
            instance("MyRepeatableContainer", &[("value", container_values)]),
            instance("MyRepeatableMeta1", &[]),
        ],
    );

    let containers =
        RepeatableContainers::of(Some("MyRepeatableContainer"), "MyRepeatable", &provider).unwrap();
    let merged = MergedAnnotations::from(
        &class,
        SearchStrategy::Direct,
        None,
        &NoneFilter,
        &containers,
        &provider,
    )
    .unwrap();

    let values: Vec<String> =
        merged.stream_of("MyRepeatable").iter().map(|m| m.get_string("value").unwrap()).collect();
    assert_eq!(values, vec!["A", "B", "C", "meta1"]);
}

/// Scenario 6: an `Inherited`-marked annotation on an implemented interface
/// is invisible to `InheritedAnnotations` (which only climbs superclasses)
/// but visible to `Exhaustive` (which visits interfaces too).
#[test]
fn inherited_strategy_does_not_cross_interfaces_but_exhaustive_does() {
    merged_annotations::clear_mapping_cache();
    let mut provider = TestProvider::default();
    provider.interfaces.insert("com.example.C", vec!["com.example.I"]);
    provider.inherited.insert("com.example.Tracked");
    provider.declare(
        ElementId::interface("com.example.I"),
        vec![instance("com.example.Tracked", &[])],
    );
    provider.attrs.insert("com.example.Tracked", vec![]);

    let class = ElementId::class("com.example.C");

    let inherited_scan = MergedAnnotations::from(
        &class,
        SearchStrategy::InheritedAnnotations,
        None,
        &NoneFilter,
        &RepeatableContainers::none(),
        &provider,
    )
    .unwrap();
    assert!(!inherited_scan.is_present("com.example.Tracked"));

    let exhaustive_scan = MergedAnnotations::from(
        &class,
        SearchStrategy::Exhaustive,
        None,
        &NoneFilter,
        &RepeatableContainers::none(),
        &provider,
    )
    .unwrap();
    assert!(exhaustive_scan.is_present("com.example.Tracked"));
}

//! Hierarchical enumeration of declared annotations across the
//! class/interface/superclass graph (§4.5).

use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::error::Error;
use crate::provider::{AnnotationInstance, ElementId, ElementKind, IntrospectionProvider, MethodSelector};

/// Controls how far a scan reaches beyond the source element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// The source element only.
    Direct,
    /// The source, plus superclass-declared annotations the language marks
    /// inheritable. Methods are never inheritable, so this behaves like
    /// `Direct` for a method source.
    InheritedAnnotations,
    /// The source, then each superclass in turn (interfaces skipped for
    /// classes; for methods, each superclass's override target).
    SuperClass,
    /// The full breadth-first class/interface closure, with bridge-method
    /// de-duplication for method sources.
    Exhaustive,
}

/// One reflective layer's declared annotations, paired with the zero-based
/// index at which it was discovered.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub index: usize,
    pub element: ElementId,
    pub annotations: Vec<AnnotationInstance>,
}

/// Runs `strategy` from `source`, yielding aggregates in ascending,
/// dense-index order.
///
/// `selector` identifies the method being searched for when `source` is a
/// method and `strategy` is `SuperClass` or `Exhaustive` (both need it to
/// find override targets); it is ignored for class/interface sources and
/// for `Direct`/`InheritedAnnotations`.
pub fn scan(
    source: &ElementId,
    strategy: SearchStrategy,
    selector: Option<&MethodSelector>,
    provider: &dyn IntrospectionProvider,
) -> Result<Vec<Aggregate>, Error> {
    let span = tracing::debug_span!("scan", type_name = %source.type_name, ?strategy);
    let _enter = span.enter();

    if source.is_type() {
        Ok(scan_type(source, strategy, provider))
    } else {
        match strategy {
            SearchStrategy::Direct | SearchStrategy::InheritedAnnotations => {
                Ok(scan_method(source, None, strategy, provider))
            }
            SearchStrategy::SuperClass | SearchStrategy::Exhaustive => {
                let selector = selector.ok_or(Error::NullArgument("selector"))?;
                Ok(scan_method(source, Some(selector), strategy, provider))
            }
        }
    }
}

fn scan_type(
    source: &ElementId,
    strategy: SearchStrategy,
    provider: &dyn IntrospectionProvider,
) -> Vec<Aggregate> {
    let mut aggregates = Vec::new();
    aggregates.push(aggregate(0, source.clone(), provider));

    match strategy {
        SearchStrategy::Direct => {}
        SearchStrategy::InheritedAnnotations => {
            let mut current = source.type_name.clone();
            let mut index = 1;
            while let Some(superclass) = provider.superclass(&current) {
                let id = ElementId::class(superclass.clone());
                let inherited: Vec<AnnotationInstance> = provider
                    .declared_annotations(&id)
                    .into_iter()
                    .filter(|a| provider.is_inherited(a.annotation_type()))
                    .collect();
                if !inherited.is_empty() {
                    aggregates.push(Aggregate { index, element: id, annotations: inherited });
                    index += 1;
                }
                current = superclass;
            }
        }
        SearchStrategy::SuperClass => {
            let mut current = source.type_name.clone();
            let mut index = 1;
            while let Some(superclass) = provider.superclass(&current) {
                let id = ElementId::class(superclass.clone());
                aggregates.push(aggregate(index, id, provider));
                index += 1;
                current = superclass;
            }
        }
        SearchStrategy::Exhaustive => {
            aggregates = closure(source.clone(), source.kind, provider);
        }
    }
    aggregates
}

/// Breadth-first class/interface closure: the starting type, then its
/// interfaces, then its superclass and that superclass's interfaces, and so
/// on, each type visited once.
fn closure(source: ElementId, source_kind: ElementKind, provider: &dyn IntrospectionProvider) -> Vec<Aggregate> {
    let mut aggregates = Vec::new();
    let mut visited = HashSet::new();
    let mut queue: VecDeque<(String, ElementKind)> = VecDeque::new();

    visited.insert(source.type_name.clone());
    queue.push_back((source.type_name.clone(), source_kind));

    let mut index = 0;
    while let Some((type_name, kind)) = queue.pop_front() {
        let id = ElementId { type_name: type_name.clone(), kind, member: None };
        aggregates.push(aggregate(index, id, provider));
        index += 1;

        for iface in provider.interfaces(&type_name) {
            if visited.insert(iface.clone()) {
                queue.push_back((iface, ElementKind::Interface));
            }
        }
        if let Some(superclass) = provider.superclass(&type_name) {
            if visited.insert(superclass.clone()) {
                queue.push_back((superclass, ElementKind::Class));
            }
        }
    }
    aggregates
}

fn scan_method(
    source: &ElementId,
    selector: Option<&MethodSelector>,
    strategy: SearchStrategy,
    provider: &dyn IntrospectionProvider,
) -> Vec<Aggregate> {
    let mut aggregates = Vec::new();
    aggregates.push(aggregate(0, source.clone(), provider));

    match strategy {
        SearchStrategy::Direct | SearchStrategy::InheritedAnnotations => {}
        SearchStrategy::SuperClass => {
            let selector = selector.expect("selector required for SuperClass method scans");
            let mut current = source.type_name.clone();
            let mut index = 1;
            while let Some(superclass) = provider.superclass(&current) {
                for target in provider.declaring_methods_matching(&superclass, selector) {
                    aggregates.push(aggregate(index, target, provider));
                    index += 1;
                }
                current = superclass;
            }
        }
        SearchStrategy::Exhaustive => {
            let selector = selector.expect("selector required for Exhaustive method scans");
            let type_closure = closure(
                ElementId::class(source.type_name.clone()),
                ElementKind::Class,
                provider,
            );
            let mut seen_bridged: HashSet<ElementId> = HashSet::new();
            let mut index = 1;
            for layer in type_closure.into_iter().skip(1) {
                for target in provider.declaring_methods_matching(&layer.element.type_name, selector) {
                    let canonical = if provider.is_bridge(&target) {
                        provider.bridged_target(&target).unwrap_or_else(|| target.clone())
                    } else {
                        target.clone()
                    };
                    if !seen_bridged.insert(canonical.clone()) {
                        trace!(?canonical, "bridge method de-duplicated");
                        continue;
                    }
                    aggregates.push(aggregate(index, canonical, provider));
                    index += 1;
                }
            }
        }
    }
    aggregates
}

fn aggregate(index: usize, element: ElementId, provider: &dyn IntrospectionProvider) -> Aggregate {
    Aggregate { index, annotations: provider.declared_annotations(&element), element }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AnnotationInstance, Attribute};
    use std::collections::BTreeMap;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeProvider {
        declared: HashMap<ElementId, Vec<AnnotationInstance>>,
        superclasses: HashMap<&'static str, &'static str>,
        interfaces: HashMap<&'static str, Vec<&'static str>>,
        inherited: HashSet<&'static str>,
    }

    fn marker(name: &str) -> AnnotationInstance {
        AnnotationInstance::new(name, BTreeMap::new())
    }

    impl IntrospectionProvider for FakeProvider {
        fn declared_annotations(&self, element: &ElementId) -> Vec<AnnotationInstance> {
            self.declared.get(element).cloned().unwrap_or_default()
        }
        fn meta_annotations(&self, _: &str) -> Vec<AnnotationInstance> {
            vec![]
        }
        fn attributes(&self, _: &str) -> Vec<Attribute> {
            vec![]
        }
        fn superclass(&self, type_name: &str) -> Option<String> {
            self.superclasses.get(type_name).map(|s| s.to_string())
        }
        fn interfaces(&self, type_name: &str) -> Vec<String> {
            self.interfaces.get(type_name).cloned().unwrap_or_default().into_iter().map(String::from).collect()
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
        fn is_inherited(&self, annotation_type: &str) -> bool {
            self.inherited.contains(annotation_type)
        }
    }

    #[test]
    fn direct_strategy_returns_only_the_source() {
        let mut provider = FakeProvider::default();
        let id = ElementId::class("K");
        provider.declared.insert(id.clone(), vec![marker("SpringAppConfig")]);
        provider.superclasses.insert("K", "Base");
        provider.declared.insert(ElementId::class("Base"), vec![marker("Ignored")]);

        let aggregates = scan(&id, SearchStrategy::Direct, None, &provider).unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].annotations.len(), 1);
    }

    #[test]
    fn inherited_strategy_filters_by_is_inherited() {
        let mut provider = FakeProvider::default();
        provider.superclasses.insert("K", "Base");
        provider.declared.insert(
            ElementId::class("Base"),
            vec![marker("Inheritable"), marker("NotInheritable")],
        );
        provider.inherited.insert("Inheritable");

        let aggregates =
            scan(&ElementId::class("K"), SearchStrategy::InheritedAnnotations, None, &provider).unwrap();
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[1].annotations.len(), 1);
        assert_eq!(aggregates[1].annotations[0].annotation_type(), "Inheritable");
    }

    #[test]
    fn exhaustive_visits_class_then_interfaces_then_superclass() {
        let mut provider = FakeProvider::default();
        provider.interfaces.insert("K", vec!["I"]);
        provider.superclasses.insert("K", "Base");

        let aggregates =
            scan(&ElementId::class("K"), SearchStrategy::Exhaustive, None, &provider).unwrap();
        let order: Vec<_> = aggregates.iter().map(|a| a.element.type_name.as_str()).collect();
        assert_eq!(order, vec!["K", "I", "Base"]);
    }

    #[test]
    fn exhaustive_never_revisits_a_type() {
        let mut provider = FakeProvider::default();
        // Diamond: K implements I, extends Base; Base also implements I.
        provider.interfaces.insert("K", vec!["I"]);
        provider.superclasses.insert("K", "Base");
        provider.interfaces.insert("Base", vec!["I"]);

        let aggregates =
            scan(&ElementId::class("K"), SearchStrategy::Exhaustive, None, &provider).unwrap();
        assert_eq!(aggregates.len(), 3);
    }

    #[test]
    fn method_scan_requires_a_selector_for_superclass_strategy() {
        let provider = FakeProvider::default();
        let method = ElementId::method("K", "doIt()");
        let err = scan(&method, SearchStrategy::SuperClass, None, &provider).unwrap_err();
        assert!(matches!(err, Error::NullArgument("selector")));
    }
}

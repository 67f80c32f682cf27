use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use crate::attribute_methods::AttributeMethods;
use crate::error::Error;
use crate::filter::AnnotationFilter;
use crate::provider::{AliasTarget, AttributeValue, IntrospectionProvider};

use super::{AnnotationTypeMapping, AnnotationTypeMappings, Edge};

/// Builds the full [`AnnotationTypeMappings`] for `root_type`: breadth-first
/// traversal of the meta-annotation graph (never revisiting a type already
/// turned into a mapping, which is what terminates both self-cycles and
/// longer cycles), followed by two validation/linking passes: mirror sets
/// within each mapping, then alias edges between mappings.
pub(crate) fn build_mappings(
    root_type: &str,
    provider: &dyn IntrospectionProvider,
    filter: &dyn AnnotationFilter,
) -> Result<AnnotationTypeMappings, Error> {
    let span = tracing::info_span!("build_mappings", root_type);
    let _enter = span.enter();

    let mappings = traverse(root_type, provider, filter)?;
    let mut result = AnnotationTypeMappings { root_type: root_type.to_owned(), mappings, edges_into: BTreeMap::new() };

    build_mirror_sets(&mut result)?;
    build_alias_edges(&mut result, provider)?;
    build_convention_edges(&mut result);
    close_transitively(&mut result);

    debug!(mapping_count = result.len(), "mapping tree built");
    Ok(result)
}

fn traverse(
    root_type: &str,
    provider: &dyn IntrospectionProvider,
    filter: &dyn AnnotationFilter,
) -> Result<Vec<AnnotationTypeMapping>, Error> {
    let mut mappings = Vec::new();
    let mut seen = std::collections::HashSet::new();
    seen.insert(root_type.to_owned());

    mappings.push(AnnotationTypeMapping {
        annotation_type: root_type.to_owned(),
        depth: 0,
        parent: None,
        attributes: AttributeMethods::new(provider.attributes(root_type)),
        declared_values: BTreeMap::new(),
        mirror_sets: Vec::new(),
    });

    let mut queue: VecDeque<usize> = VecDeque::new();
    queue.push_back(0);

    while let Some(current) = queue.pop_front() {
        let current_type = mappings[current].annotation_type.clone();
        let current_depth = mappings[current].depth;

        for instance in provider.meta_annotations(&current_type) {
            let meta_type = instance.annotation_type().to_owned();
            if filter.matches(&meta_type) {
                trace!(meta_type, "filtered out of traversal");
                continue;
            }
            if seen.contains(&meta_type) {
                trace!(meta_type, "already visited, cycle terminated");
                continue;
            }
            seen.insert(meta_type.clone());

            let mut declared_values = BTreeMap::new();
            for name in instance.attribute_names() {
                if let Some(value) = instance.get(name) {
                    declared_values.insert(name.to_owned(), value.clone());
                }
            }

            let index = mappings.len();
            mappings.push(AnnotationTypeMapping {
                annotation_type: meta_type,
                depth: current_depth + 1,
                parent: Some(current),
                attributes: AttributeMethods::new(provider.attributes(instance.annotation_type())),
                declared_values,
                mirror_sets: Vec::new(),
            });
            queue.push_back(index);
        }
    }

    Ok(mappings)
}

/// Groups same-mapping attributes joined by `@AliasFor(self, ...)` into
/// mirror sets, validating reciprocity, type compatibility and default
/// consistency as each pair is discovered (§4.4).
fn build_mirror_sets(mappings: &mut AnnotationTypeMappings) -> Result<(), Error> {
    for mapping in mappings.mappings.iter_mut() {
        let mut groups: Vec<Vec<String>> = Vec::new();

        for attr in mapping.attributes.iter() {
            for alias in &attr.aliases {
                let AliasTarget::SelfRef = alias.annotation else { continue };
                let target_name = alias
                    .effective_attribute()
                    .map_err(|()| Error::AmbiguousAliasDeclaration(attr.name.clone()))?
                    .map(str::to_owned)
                    .unwrap_or_else(|| attr.name.clone());
                if target_name == attr.name {
                    return Err(Error::AliasPointsToItself(attr.name.clone()));
                }
                let Some(target) = mapping.attributes.get_by_name(&target_name) else {
                    return Err(Error::NonexistentAttribute(
                        mapping.annotation_type.clone(),
                        target_name,
                    ));
                };
                let reciprocated = target.aliases.iter().any(|back| {
                    matches!(&back.annotation, AliasTarget::SelfRef)
                        && back
                            .effective_attribute()
                            .ok()
                            .flatten()
                            .map(str::to_owned)
                            .unwrap_or_else(|| target.name.clone())
                            == attr.name
                });
                if !reciprocated {
                    return Err(Error::MissingMirroredAlias(
                        mapping.annotation_type.clone(),
                        attr.name.clone(),
                        target_name.clone(),
                    ));
                }
                if attr.kind != target.kind {
                    return Err(Error::IncompatibleTypes(attr.name.clone(), target.name.clone()));
                }
                if !defaults_agree(attr.default_value.as_ref(), target.default_value.as_ref()) {
                    return Err(Error::InconsistentDefaults(attr.name.clone(), target.name.clone()));
                }

                merge_into_group(&mut groups, &attr.name, &target_name);
            }
        }

        mapping.mirror_sets = groups;
    }
    Ok(())
}

fn merge_into_group(groups: &mut Vec<Vec<String>>, a: &str, b: &str) {
    let a_group = groups.iter().position(|g| g.iter().any(|n| n == a));
    let b_group = groups.iter().position(|g| g.iter().any(|n| n == b));
    match (a_group, b_group) {
        (Some(i), Some(j)) if i == j => {}
        (Some(i), Some(j)) => {
            let removed = groups.remove(j.max(i));
            groups[i.min(j)].extend(removed);
        }
        (Some(i), None) => groups[i].push(b.to_owned()),
        (None, Some(j)) => groups[j].push(a.to_owned()),
        (None, None) => groups.push(vec![a.to_owned(), b.to_owned()]),
    }
}

fn defaults_agree(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Records the explicit `@AliasFor(annotation = M, ...)` edges from every
/// mapping's attributes toward their ancestor meta-annotations.
fn build_alias_edges(
    mappings: &mut AnnotationTypeMappings,
    _provider: &dyn IntrospectionProvider,
) -> Result<(), Error> {
    let len = mappings.mappings.len();
    for source_idx in 0..len {
        let attrs: Vec<_> = mappings.mappings[source_idx].attributes.iter().cloned().collect();
        for attr in &attrs {
            for alias in &attr.aliases {
                let AliasTarget::Annotation(target_type) = &alias.annotation else { continue };
                let target_name = alias
                    .effective_attribute()
                    .map_err(|()| Error::AmbiguousAliasDeclaration(attr.name.clone()))?
                    .map(str::to_owned)
                    .unwrap_or_else(|| attr.name.clone());

                let candidate = mappings
                    .mappings
                    .iter()
                    .enumerate()
                    .find(|(idx, m)| &m.annotation_type == target_type && mappings.is_ancestor(*idx, source_idx))
                    .map(|(idx, _)| idx);

                let Some(target_idx) = candidate else {
                    return Err(if len == 1 {
                        Error::SelfReferentialMissingTarget(attr.name.clone())
                    } else {
                        Error::MetaAnnotationNotPresent(attr.name.clone(), target_type.clone())
                    });
                };

                let target_attr = mappings.mappings[target_idx]
                    .attributes
                    .get_by_name(&target_name)
                    .ok_or_else(|| Error::NonexistentAttribute(target_type.clone(), target_name.clone()))?;
                if target_attr.kind != attr.kind {
                    return Err(Error::IncompatibleTypes(attr.name.clone(), target_name.clone()));
                }
                if !defaults_agree(attr.default_value.as_ref(), target_attr.default_value.as_ref()) {
                    return Err(Error::InconsistentDefaults(attr.name.clone(), target_name.clone()));
                }

                mappings
                    .edges_into
                    .entry((target_idx, target_name))
                    .or_default()
                    .push(Edge { from_mapping: source_idx, from_name: attr.name.clone(), explicit: true });
            }
        }
    }
    Ok(())
}

/// For every attribute whose bare name coincidentally matches an ancestor
/// attribute's name, registers an implicit override edge, unless that slot
/// already has an explicit edge registered, which always takes priority.
fn build_convention_edges(mappings: &mut AnnotationTypeMappings) {
    let len = mappings.mappings.len();
    for source_idx in 0..len {
        let names: Vec<String> =
            mappings.mappings[source_idx].attributes.iter().map(|a| a.name.clone()).collect();
        for name in names {
            for target_idx in 0..len {
                if target_idx == source_idx || !mappings.is_ancestor(target_idx, source_idx) {
                    continue;
                }
                if mappings.mappings[target_idx].attributes.get_by_name(&name).is_none() {
                    continue;
                }
                let key = (target_idx, name.clone());
                let already_explicit =
                    mappings.edges_into.get(&key).map_or(false, |v| v.iter().any(|e| e.explicit));
                if already_explicit {
                    continue;
                }
                mappings
                    .edges_into
                    .entry(key)
                    .or_default()
                    .push(Edge { from_mapping: source_idx, from_name: name.clone(), explicit: false });
            }
        }
    }
}

/// Composes edges one hop further: if attribute `A` overrides attribute `B`,
/// and `B` itself overrides some deeper attribute `D`, then `A` also
/// overrides `D` directly, so resolution never needs more than one lookup
/// (§4.4's "at most one hop at query time").
fn close_transitively(mappings: &mut AnnotationTypeMappings) {
    let bound = mappings.mappings.len().max(1);
    for _ in 0..bound {
        let mut additions = Vec::new();
        for (&(target_idx, ref target_name), sources) in mappings.edges_into.iter() {
            for edge in sources {
                let further_key = (edge.from_mapping, edge.from_name.clone());
                if let Some(further_sources) = mappings.edges_into.get(&further_key) {
                    for further in further_sources {
                        additions.push((
                            (target_idx, target_name.clone()),
                            Edge {
                                from_mapping: further.from_mapping,
                                from_name: further.from_name.clone(),
                                explicit: further.explicit,
                            },
                        ));
                    }
                }
            }
        }
        if additions.is_empty() {
            break;
        }
        let mut changed = false;
        for (key, edge) in additions {
            let bucket = mappings.edges_into.entry(key).or_default();
            let dup = bucket.iter().any(|e| e.from_mapping == edge.from_mapping && e.from_name == edge.from_name);
            if !dup {
                bucket.push(edge);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

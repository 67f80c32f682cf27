use tracing::trace;

use crate::error::Error;
use crate::provider::{AnnotationInstance, AttributeValue};

use super::{AnnotationTypeMappings, Edge};

/// Resolves the effective value of one attribute on one mapping within the
/// tree, given the declared instance found at the root (§4.6, steps 1-4;
/// kind coercion for the public `get_x` accessors happens one layer up, in
/// `crate::merged`).
pub(crate) fn resolve_value(
    mappings: &AnnotationTypeMappings,
    mapping_index: usize,
    name: &str,
    root_instance: &AnnotationInstance,
) -> Result<AttributeValue, Error> {
    let mapping = mappings
        .get(mapping_index)
        .ok_or_else(|| Error::UnknownAttribute(mappings.root_type().to_owned(), name.to_owned()))?;
    let attr = mapping
        .attributes
        .get_by_name(name)
        .ok_or_else(|| Error::UnknownAttribute(mapping.annotation_type.clone(), name.to_owned()))?;

    let group: Vec<String> = match mapping.mirror_set_of(name) {
        Some(set) if set.len() > 1 => set.to_vec(),
        _ => vec![name.to_owned()],
    };

    let mut resolved: Option<(String, AttributeValue)> = None;
    for member in &group {
        if let Some(value) = slot_value(mappings, mapping_index, member, root_instance)? {
            match &resolved {
                None => resolved = Some((member.clone(), value)),
                Some((existing_name, existing_value)) if existing_value != &value => {
                    return Err(Error::MirrorConflict(
                        existing_name.clone(),
                        format!("{existing_value:?}"),
                        member.clone(),
                        format!("{value:?}"),
                    ));
                }
                _ => {}
            }
        }
    }

    if let Some((_, value)) = resolved {
        trace!(annotation_type = %mapping.annotation_type, attribute = name, "resolved from instance/override");
        return Ok(value);
    }
    if let Some(default) = &attr.default_value {
        return Ok(default.clone());
    }
    Err(Error::MissingRequiredAttribute(mapping.annotation_type.clone(), name.to_owned()))
}

/// The pre-mirror value of exactly one attribute slot: an override edge's
/// value if one applies (checking every candidate edge for a disagreement
/// first), otherwise this mapping's own instance-level value.
fn slot_value(
    mappings: &AnnotationTypeMappings,
    mapping_index: usize,
    name: &str,
    root_instance: &AnnotationInstance,
) -> Result<Option<AttributeValue>, Error> {
    if let Some(edges) = mappings.edges_into.get(&(mapping_index, name.to_owned())) {
        let candidates: Vec<(&Edge, AttributeValue)> = edges
            .iter()
            .filter_map(|edge| {
                instance_value(mappings, edge.from_mapping, &edge.from_name, root_instance)
                    .map(|v| (edge, v))
            })
            .collect();
        if !candidates.is_empty() {
            let primary = candidates.iter().find(|(e, _)| e.explicit).unwrap_or(&candidates[0]);
            for (_, value) in &candidates {
                if value != &primary.1 {
                    return Err(Error::ConventionConflict(name.to_owned()));
                }
            }
            return Ok(Some(primary.1.clone()));
        }
    }
    Ok(instance_value(mappings, mapping_index, name, root_instance))
}

/// The raw, explicitly-supplied value at one mapping's own level: the
/// per-query instance for the root, or the fixed declaration-site value for
/// a meta-annotation mapping.
fn instance_value(
    mappings: &AnnotationTypeMappings,
    mapping_index: usize,
    name: &str,
    root_instance: &AnnotationInstance,
) -> Option<AttributeValue> {
    if mapping_index == 0 {
        root_instance.get(name).cloned()
    } else {
        mappings.get(mapping_index).and_then(|m| m.declared_values.get(name).cloned())
    }
}

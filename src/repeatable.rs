//! Policy for unwrapping a "container" annotation into its repeated child
//! annotation type (§4.3).

use crate::error::Error;
use crate::provider::{AttributeValue, IntrospectionProvider, ValueKind};

const STANDARD_REPEATABLE: &str = "java.lang.annotation.Repeatable";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Rule {
    /// Resolved dynamically through the provider's standard `@Repeatable`
    /// meta-annotation.
    Standard,
    /// An explicit, caller-registered `(container, repeatable)` pair.
    Explicit { container: String, repeatable: String },
}

/// Composable policy for recognizing repeatable containers and the type
/// they repeat.
#[derive(Debug, Clone, Default)]
pub struct RepeatableContainers {
    rules: Vec<Rule>,
}

impl RepeatableContainers {
    /// Unwrapping is disabled: every annotation is treated at face value.
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Recognizes containers declared the standard way, i.e. a repeatable
    /// annotation type carrying `@Repeatable(Container.class)`.
    pub fn standard_repeatables() -> Self {
        Self { rules: vec![Rule::Standard] }
    }

    /// Registers an explicit `(container, repeatable)` pair, for callers
    /// whose repeatable annotations predate the language's `@Repeatable`
    /// feature. Validated immediately (registration-time, never lazily):
    /// the container must declare exactly one attribute, named `value`, of
    /// array-of-`repeatable` type.
    ///
    /// `container: None` means no explicit container is named; `repeatable`
    /// must then carry the standard `@Repeatable` pointer itself, naming a
    /// container whose shape matches. `Error::ContainerMisconfigured` either
    /// way it doesn't check out.
    pub fn of(
        container: Option<&str>,
        repeatable: &str,
        provider: &dyn IntrospectionProvider,
    ) -> Result<Self, Error> {
        let container = match container {
            Some(container) => {
                validate_container_shape(container, repeatable, provider)?;
                container.to_owned()
            }
            None => resolve_standard_for_repeatable(repeatable, provider)
                .ok_or_else(|| Error::ContainerMisconfigured(repeatable.to_owned()))?,
        };
        Ok(Self { rules: vec![Rule::Explicit { container, repeatable: repeatable.to_owned() }] })
    }

    /// Combines two policies; `self`'s rules are consulted first.
    pub fn and(mut self, other: Self) -> Self {
        self.rules.extend(other.rules);
        self
    }

    /// If `container_name` is a recognized repeatable container under this
    /// policy, returns the repeatable type it wraps.
    pub fn resolve(
        &self,
        container_name: &str,
        provider: &dyn IntrospectionProvider,
    ) -> Option<String> {
        for rule in &self.rules {
            match rule {
                Rule::Explicit { container, repeatable } if container == container_name => {
                    return Some(repeatable.clone());
                }
                Rule::Standard => {
                    if let Some(repeatable) = resolve_standard(container_name, provider) {
                        return Some(repeatable);
                    }
                }
                Rule::Explicit { .. } => {}
            }
        }
        None
    }

    /// A stable identity for this policy, used as part of the mapping cache
    /// key (§5): two policies built the same way must hash the same.
    pub fn identity(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        self.rules.hash(&mut hasher);
        hasher.finish()
    }
}

fn validate_container_shape(
    container: &str,
    repeatable: &str,
    provider: &dyn IntrospectionProvider,
) -> Result<(), Error> {
    let attrs = provider.attributes(container);
    if attrs.len() != 1 || attrs[0].name != "value" {
        return Err(Error::ContainerMisconfigured(container.to_owned()));
    }
    match &attrs[0].kind {
        ValueKind::Array(inner) if matches!(inner.as_ref(), ValueKind::Annotation(r) if r == repeatable) => {
            Ok(())
        }
        _ => Err(Error::ContainerMisconfigured(container.to_owned())),
    }
}

/// Structural + meta-annotation check that `container_name` is the standard
/// `@Repeatable` container for some repeatable annotation type.
fn resolve_standard(container_name: &str, provider: &dyn IntrospectionProvider) -> Option<String> {
    let attrs = provider.attributes(container_name);
    if attrs.len() != 1 || attrs[0].name != "value" {
        return None;
    }
    let ValueKind::Array(inner) = &attrs[0].kind else { return None };
    let ValueKind::Annotation(repeatable) = inner.as_ref() else { return None };

    let metas = provider.meta_annotations(repeatable);
    let confirmed = metas.iter().any(|m| {
        m.annotation_type() == STANDARD_REPEATABLE
            && matches!(m.get("value"), Some(AttributeValue::Class(c)) if c == container_name)
    });

    confirmed.then(|| repeatable.clone())
}

/// The `container: None` counterpart of [`resolve_standard`]: finds the
/// container `repeatable`'s own `@Repeatable` meta-annotation names, then
/// reuses `resolve_standard`'s shape/back-reference check to confirm that
/// container really does resolve back to `repeatable`.
fn resolve_standard_for_repeatable(
    repeatable: &str,
    provider: &dyn IntrospectionProvider,
) -> Option<String> {
    let metas = provider.meta_annotations(repeatable);
    let container = metas.iter().find_map(|m| {
        if m.annotation_type() != STANDARD_REPEATABLE {
            return None;
        }
        match m.get("value") {
            Some(AttributeValue::Class(c)) => Some(c.clone()),
            _ => None,
        }
    })?;

    match resolve_standard(&container, provider) {
        Some(resolved) if resolved == repeatable => Some(container),
        _ => None,
    }
}

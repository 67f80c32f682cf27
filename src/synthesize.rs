//! The synthesis boundary: turning a resolved set of attribute values into
//! something a caller can treat as if it were a real annotation instance,
//! without this crate ever generating code or a real proxy type (§4.8,
//! intentionally out of scope as an external collaborator).

use std::collections::BTreeMap;

use crate::error::Error;
use crate::provider::AttributeValue;

/// A structural stand-in for "the annotation instance itself", built purely
/// from resolved attribute values. Callers that need an actual
/// language-level proxy (e.g. to satisfy an API expecting a real annotation
/// object) are expected to adapt this through their own `Synthesizer`.
pub trait Synthesizer {
    fn synthesize(&self, annotation_type: &str, values: &BTreeMap<String, AttributeValue>) -> Self::Output;

    type Output;
}

/// The default, dependency-free synthesizer: a plain structural view over
/// the resolved values, with the same typed accessors a `MergedAnnotation`
/// exposes.
#[derive(Debug, Clone)]
pub struct StructuralSynthesizer;

/// The result of [`StructuralSynthesizer::synthesize`]: an immutable,
/// already-merged snapshot of one annotation instance's effective values.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    annotation_type: String,
    values: BTreeMap<String, AttributeValue>,
}

impl Synthesized {
    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }

    pub fn get(&self, name: &str) -> Result<&AttributeValue, Error> {
        self.values
            .get(name)
            .ok_or_else(|| Error::UnknownAttribute(self.annotation_type.clone(), name.to_owned()))
    }

    pub fn get_string(&self, name: &str) -> Result<&str, Error> {
        match self.get(name)? {
            AttributeValue::Str(s) => Ok(s),
            _ => Err(Error::AttributeTypeMismatch(name.to_owned(), "string".to_owned())),
        }
    }
}

impl Synthesizer for StructuralSynthesizer {
    type Output = Synthesized;

    fn synthesize(&self, annotation_type: &str, values: &BTreeMap<String, AttributeValue>) -> Synthesized {
        Synthesized { annotation_type: annotation_type.to_owned(), values: values.clone() }
    }
}

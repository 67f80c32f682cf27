//! An optional short-circuit in front of scanning: lets a caller plug in a
//! precomputed index answering "could this type possibly carry that
//! annotation" before paying for a real introspection pass (§4.7).

use crate::provider::ElementId;

/// One registry's answer for whether a given `(source, annotation_name)`
/// pair is worth introspecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAnswer {
    /// This registry has indexed `source`'s full type-closure and is certain
    /// it cannot carry `annotation_name`.
    CannotContain,
    /// This registry has no information either way.
    Unknown,
}

/// A precomputed index a caller supplies to answer [`IndexAnswer`] queries,
/// presumably cheaper than a real scan.
///
/// Implementations must, to be correct, consider the entire type-closure
/// [`crate::scanner::scan`] would visit for the strategy in use, answering
/// `CannotContain` for a source whose superclass does carry the annotation
/// is a correctness bug in the index, not in this crate.
pub trait AnnotationIndex: Send + Sync {
    fn can_skip(&self, source: &ElementId, annotation_name: &str) -> IndexAnswer;
}

/// An ordered list of [`AnnotationIndex`]es consulted to decide whether a
/// scan is worth running at all.
#[derive(Default)]
pub struct AnnotationRegistries {
    registries: Vec<Box<dyn AnnotationIndex>>,
}

impl AnnotationRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `index` to the end of the consultation order.
    pub fn register(mut self, index: Box<dyn AnnotationIndex>) -> Self {
        self.registries.push(index);
        self
    }

    /// `false` only when every registered index affirmatively answers
    /// `CannotContain`; the first `Unknown` answer short-circuits to `true`,
    /// and `true` is also the answer with zero registries registered.
    pub fn requires_introspection(&self, source: &ElementId, annotation_name: &str) -> bool {
        for index in &self.registries {
            match index.can_skip(source, annotation_name) {
                IndexAnswer::CannotContain => continue,
                IndexAnswer::Unknown => return true,
            }
        }
        self.registries.is_empty()
    }

    pub fn clear(&mut self) {
        self.registries.clear();
    }
}

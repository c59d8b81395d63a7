//! Relationship class payloads: endpoint constraints and cardinality.

use crate::key::ClassRef;

/// Permitted instance count range for a relationship endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardinalityRange {
    /// Minimum count.
    pub lower: u32,
    /// Maximum count; `None` means unbounded.
    pub upper: Option<u32>,
}

impl CardinalityRange {
    /// Create a bounded range.
    pub fn new(lower: u32, upper: u32) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    /// (0, 1) range.
    pub fn zero_one() -> Self {
        Self::new(0, 1)
    }

    /// (1, 1) range.
    pub fn one_one() -> Self {
        Self::new(1, 1)
    }

    /// (0, N) unbounded range.
    pub fn zero_many() -> Self {
        Self {
            lower: 0,
            upper: None,
        }
    }

    /// Whether the upper bound is unbounded.
    pub fn is_unbounded(&self) -> bool {
        self.upper.is_none()
    }
}

/// One endpoint of a relationship class.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipConstraint {
    /// Permitted instance count range.
    pub cardinality: CardinalityRange,
    /// Permissible endpoint classes.
    pub classes: Vec<ClassRef>,
    /// Whether subclasses of the listed classes are also permitted.
    pub polymorphic: bool,
}

impl RelationshipConstraint {
    /// Create a polymorphic constraint with the given cardinality.
    pub fn new(cardinality: CardinalityRange) -> Self {
        Self {
            cardinality,
            classes: Vec::new(),
            polymorphic: true,
        }
    }

    /// Add a permissible endpoint class.
    pub fn with_class(mut self, class: ClassRef) -> Self {
        self.classes.push(class);
        self
    }

    /// Set the polymorphic flag.
    pub fn polymorphic(mut self, polymorphic: bool) -> Self {
        self.polymorphic = polymorphic;
        self
    }
}

/// Relationship payload of a class whose kind is `Relationship`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDef {
    /// Source endpoint constraint.
    pub source: RelationshipConstraint,
    /// Target endpoint constraint.
    pub target: RelationshipConstraint,
}

impl RelationshipDef {
    /// Create a relationship payload from both endpoint constraints.
    pub fn new(source: RelationshipConstraint, target: RelationshipConstraint) -> Self {
        Self { source, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_ranges() {
        assert!(CardinalityRange::zero_many().is_unbounded());
        assert!(!CardinalityRange::zero_one().is_unbounded());
        assert_eq!(CardinalityRange::one_one().lower, 1);
    }

    #[test]
    fn test_constraint_builder() {
        let constraint = RelationshipConstraint::new(CardinalityRange::zero_many())
            .with_class(ClassRef::local("B"))
            .polymorphic(false);
        assert_eq!(constraint.classes.len(), 1);
        assert!(!constraint.polymorphic);
    }
}

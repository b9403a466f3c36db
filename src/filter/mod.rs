use std::collections::BTreeMap;
use std::fmt;
use bson::{Bson, Document};

mod constraints;
mod equivalence;
mod normalize;

#[cfg(test)]
pub(crate) mod filter_fn;

pub use constraints::{field_constraints, field_value};
pub use equivalence::{bson_equivalent, equivalent};
pub use normalize::{normalize, normalize_document};

/// A recognized operator token (a `$`-prefixed key inside a filter document).
///
/// The set is closed and known in advance. A `$`-prefixed key that is not a
/// member of this set is NOT an operator: it falls back to plain field-key
/// handling, matching the behavior of the query dialect this crate targets.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Exists,
    Regex,
    Size,
    All,
    ElemMatch,
    Type,
    Not,
    BitsAllClear,
    BitsAllSet,
    BitsAnyClear,
    BitsAnySet,
}

impl Operator {
    /// Maps a document key to its operator token, or `None` if the key is
    /// not a recognized operator (including unrecognized `$`-prefixed keys).
    pub fn parse(key: &str) -> Option<Operator> {
        match key {
            "$eq" => Some(Operator::Eq),
            "$ne" => Some(Operator::Ne),
            "$gt" => Some(Operator::Gt),
            "$gte" => Some(Operator::Gte),
            "$lt" => Some(Operator::Lt),
            "$lte" => Some(Operator::Lte),
            "$in" => Some(Operator::In),
            "$nin" => Some(Operator::Nin),
            "$exists" => Some(Operator::Exists),
            "$regex" => Some(Operator::Regex),
            "$size" => Some(Operator::Size),
            "$all" => Some(Operator::All),
            "$elemMatch" => Some(Operator::ElemMatch),
            "$type" => Some(Operator::Type),
            "$not" => Some(Operator::Not),
            "$bitsAllClear" => Some(Operator::BitsAllClear),
            "$bitsAllSet" => Some(Operator::BitsAllSet),
            "$bitsAnyClear" => Some(Operator::BitsAnyClear),
            "$bitsAnySet" => Some(Operator::BitsAnySet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::Nin => "$nin",
            Operator::Exists => "$exists",
            Operator::Regex => "$regex",
            Operator::Size => "$size",
            Operator::All => "$all",
            Operator::ElemMatch => "$elemMatch",
            Operator::Type => "$type",
            Operator::Not => "$not",
            Operator::BitsAllClear => "$bitsAllClear",
            Operator::BitsAllSet => "$bitsAllSet",
            Operator::BitsAnyClear => "$bitsAnyClear",
            Operator::BitsAnySet => "$bitsAnySet",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic constraint extracted from a filter document: the dot-joined
/// field path, the operator, and the operand value.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub path: String,
    pub operator: Operator,
    pub value: Bson,
}

impl Predicate {
    pub fn new(path: impl Into<String>, operator: Operator, value: impl Into<Bson>) -> Predicate {
        Predicate { path: path.into(), operator, value: value.into() }
    }
}

/// The accumulated operator constraints for one field path.
///
/// Keys are unique; inserting an operator that is already present replaces
/// the earlier value (later predicates win when folding in document order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorBag(BTreeMap<Operator, Bson>);

impl OperatorBag {
    pub fn new() -> OperatorBag {
        OperatorBag::default()
    }

    pub fn insert(&mut self, operator: Operator, value: Bson) {
        self.0.insert(operator, value);
    }

    pub fn get(&self, operator: Operator) -> Option<&Bson> {
        self.0.get(&operator)
    }

    pub fn contains(&self, operator: Operator) -> bool {
        self.0.contains_key(&operator)
    }

    /// Folds `other` into this bag; on a colliding operator the entry from
    /// `other` wins.
    pub fn merge(&mut self, other: OperatorBag) {
        for (operator, value) in other.0 {
            self.0.insert(operator, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Operator, &Bson)> {
        self.0.iter().map(|(operator, value)| (*operator, value))
    }
}

impl FromIterator<(Operator, Bson)> for OperatorBag {
    fn from_iter<T: IntoIterator<Item = (Operator, Bson)>>(iter: T) -> OperatorBag {
        OperatorBag(iter.into_iter().collect())
    }
}

impl IntoIterator for OperatorBag {
    type Item = (Operator, Bson);
    type IntoIter = std::collections::btree_map::IntoIter<Operator, Bson>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A filter document flattened into a conjunction of atomic predicates plus
/// the alternatives contributed by `$or` clauses.
///
/// `conjuncts` follow document visitation order (stable but semantically
/// order-irrelevant); `branches` follow `$or` array order, which IS
/// significant under [`BranchMode::First`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFilter {
    pub conjuncts: Vec<Predicate>,
    pub branches: Vec<Vec<Predicate>>,
}

impl NormalizedFilter {
    pub fn is_empty(&self) -> bool {
        self.conjuncts.is_empty() && self.branches.is_empty()
    }
}

/// Policy for folding `$or` branches into a field's constraints.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum BranchMode {
    /// Merge only the FIRST branch that mentions the field, in document
    /// order. Constraints carried by later qualifying branches are silently
    /// ignored; kept as the default for compatibility with existing call
    /// sites. Prefer [`BranchMode::All`] for new code.
    #[default]
    First,
    /// Return one merged bag per branch that mentions the field, in branch
    /// order.
    All,
}

/// The constraints a filter document places on one field path.
///
/// `Absent` is an explicit sentinel: it covers both "the field never appears"
/// and "the field appears but carries no constraint", which are deliberately
/// indistinguishable. It is a distinct variant rather than `Option::None` so
/// that it cannot collide with a legitimately absent operator inside a bag.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldConstraints {
    Absent,
    Single(OperatorBag),
    PerBranch(Vec<OperatorBag>),
}

impl FieldConstraints {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldConstraints::Absent)
    }
}

/// Result of a value lookup on one field path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    /// A bare comparable value: either a collapsed equality constraint or
    /// the operand of the requested operator.
    Value(Bson),
    Constraints(OperatorBag),
    PerBranch(Vec<OperatorBag>),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

/// Shape of the value sitting under a field key, decided once at the
/// boundary so the traversal can dispatch structurally.
#[derive(Debug)]
pub(crate) enum ValueShape<'a> {
    /// Every key is a recognized operator token. An empty document
    /// qualifies and simply yields no predicates.
    OperatorBag(&'a Document),
    /// A plain document with at least one non-operator key; its keys extend
    /// the field path.
    Nested(&'a Document),
    /// Anything else (scalars, arrays, dates, regular expressions, ...)
    /// constrains the field by implicit equality.
    Comparable(&'a Bson),
}

pub(crate) fn classify(value: &Bson) -> ValueShape<'_> {
    match value {
        Bson::Document(doc) if doc.iter().all(|(key, _)| Operator::parse(key).is_some()) => {
            ValueShape::OperatorBag(doc)
        }
        Bson::Document(doc) => ValueShape::Nested(doc),
        other => ValueShape::Comparable(other),
    }
}

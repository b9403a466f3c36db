//! Introspection over MongoDB-style filter documents.
//!
//! A raw filter is an arbitrarily nested `bson::Document` combining field
//! constraints with `$and`/`$or`/`$nor`/`$not`. This crate flattens such a
//! document into canonical atomic predicates ([`normalize_document`]),
//! answers "what does this filter require of field X?" with a well-defined
//! merge policy ([`field_constraints`], [`field_value`]), and decides
//! whether two raw documents are structurally identical ([`equivalent`]).
//! It never executes a filter against data; matching is a separate concern.
//!
//! All operations are pure, synchronous and total: malformed input degrades
//! to "no constraint" or "not equal" instead of failing.

pub mod filter;

pub use filter::{
    bson_equivalent, equivalent, field_constraints, field_value, normalize, normalize_document,
    BranchMode, FieldConstraints, FieldValue, NormalizedFilter, Operator, OperatorBag, Predicate,
};

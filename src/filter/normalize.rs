use crate::filter::{classify, NormalizedFilter, Operator, Predicate, ValueShape};
use bson::{Bson, Document};
use tracing::trace;

/// Flattens a raw filter value into a [`NormalizedFilter`].
///
/// Anything that is not a document (null, scalar, array) contributes no
/// constraint at all: the result is empty rather than an error, so callers
/// assembling filters dynamically never have to pre-validate their input.
pub fn normalize(filter: &Bson) -> NormalizedFilter {
    match filter {
        Bson::Document(doc) => normalize_document(doc),
        _ => NormalizedFilter::default(),
    }
}

/// Flattens a raw filter document into a [`NormalizedFilter`].
///
/// `$and` clauses are spliced into the surrounding conjunction, each `$or`
/// alternative becomes one branch, `$nor` is dropped (it cannot be expressed
/// as a positive constraint), and nested plain documents extend the field
/// path with a dot-joined prefix. The input is never mutated and repeated
/// calls yield identical results.
pub fn normalize_document(filter: &Document) -> NormalizedFilter {
    let result = normalize_at(filter, "");
    trace!(
        "normalized filter document: {} conjuncts, {} branches",
        result.conjuncts.len(),
        result.branches.len()
    );
    result
}

fn normalize_at(filter: &Document, base_path: &str) -> NormalizedFilter {
    let mut acc = NormalizedFilter::default();

    for (key, value) in filter.iter() {
        match key.as_str() {
            // AND is associative, so sub-results splice straight into the
            // accumulator. A non-array value contributes nothing.
            "$and" => {
                if let Bson::Array(alternatives) = value {
                    for alternative in alternatives {
                        let sub = normalize_value(alternative, base_path);
                        acc.conjuncts.extend(sub.conjuncts);
                        acc.branches.extend(sub.branches);
                    }
                }
            }
            "$or" => {
                if let Bson::Array(alternatives) = value {
                    for alternative in alternatives {
                        let sub = normalize_value(alternative, base_path);
                        if !sub.conjuncts.is_empty() {
                            acc.branches.push(sub.conjuncts);
                        }
                        // An alternative carrying its own nested $or is
                        // spliced in as additional branch groups, not
                        // cross-multiplied into disjunctive normal form.
                        acc.branches.extend(sub.branches);
                    }
                }
            }
            // NOR contributes no positive constraint.
            "$nor" => {}
            _ => {
                let path = join_path(base_path, key);
                match classify(value) {
                    ValueShape::OperatorBag(bag) => {
                        for (operator_key, operand) in bag.iter() {
                            // classify() guarantees every key parses.
                            if let Some(operator) = Operator::parse(operator_key) {
                                acc.conjuncts.push(Predicate::new(
                                    path.clone(),
                                    operator,
                                    operand.clone(),
                                ));
                            }
                        }
                    }
                    ValueShape::Nested(nested) => {
                        let sub = normalize_at(nested, &path);
                        acc.conjuncts.extend(sub.conjuncts);
                        acc.branches.extend(sub.branches);
                    }
                    ValueShape::Comparable(value) => {
                        acc.conjuncts.push(Predicate::new(path, Operator::Eq, value.clone()));
                    }
                }
            }
        }
    }

    acc
}

fn normalize_value(value: &Bson, base_path: &str) -> NormalizedFilter {
    match value {
        Bson::Document(doc) => normalize_at(doc, base_path),
        _ => NormalizedFilter::default(),
    }
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

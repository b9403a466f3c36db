use crate::filter::{
    normalize_document, BranchMode, FieldConstraints, FieldValue, NormalizedFilter, Operator,
    OperatorBag, Predicate,
};
use bson::Document;
use tracing::trace;

impl NormalizedFilter {
    /// Returns the operator constraints this filter places on `path`.
    ///
    /// Conjuncts matching the path are folded into a single bag (later
    /// predicates overwrite earlier ones for a repeated operator). Branches
    /// that never mention the path are transparent for it; when at least one
    /// branch qualifies, `mode` decides whether only the first branch or
    /// every branch is merged with the conjunct bag. On a colliding
    /// operator, the branch side wins: the conjunction and the chosen
    /// alternative are effectively ANDed for matching purposes.
    pub fn constraints(&self, path: &str, mode: BranchMode) -> FieldConstraints {
        let and_bag = fold_bag(&self.conjuncts, path);

        let branch_bags: Vec<OperatorBag> = self
            .branches
            .iter()
            .map(|branch| fold_bag(branch, path))
            .filter(|bag| !bag.is_empty())
            .collect();

        if branch_bags.is_empty() {
            return if and_bag.is_empty() {
                FieldConstraints::Absent
            } else {
                FieldConstraints::Single(and_bag)
            };
        }

        match mode {
            BranchMode::First => {
                let mut merged = and_bag;
                if let Some(first) = branch_bags.into_iter().next() {
                    merged.merge(first);
                }
                FieldConstraints::Single(merged)
            }
            BranchMode::All => FieldConstraints::PerBranch(
                branch_bags
                    .into_iter()
                    .map(|branch_bag| {
                        let mut merged = and_bag.clone();
                        merged.merge(branch_bag);
                        merged
                    })
                    .collect(),
            ),
        }
    }

    /// Looks up a value for `path`.
    ///
    /// With an `operator`, reads that operator's operand from the bag; when
    /// the constraints resolved per branch, only the FIRST branch bag is
    /// consulted. Without an operator, an equality constraint collapses back
    /// to its bare comparable value; otherwise the bag (or per-branch
    /// vector) is returned unchanged.
    pub fn value(&self, path: &str, operator: Option<Operator>, mode: BranchMode) -> FieldValue {
        match self.constraints(path, mode) {
            FieldConstraints::Absent => FieldValue::Absent,
            FieldConstraints::Single(bag) => pick(bag, operator),
            FieldConstraints::PerBranch(bags) => match operator {
                Some(operator) => match bags.first().and_then(|bag| bag.get(operator)) {
                    Some(value) => FieldValue::Value(value.clone()),
                    None => FieldValue::Absent,
                },
                None => FieldValue::PerBranch(bags),
            },
        }
    }
}

/// Normalizes `filter` and returns the constraints it places on `path`.
pub fn field_constraints(filter: &Document, path: &str, mode: BranchMode) -> FieldConstraints {
    let result = normalize_document(filter).constraints(path, mode);
    trace!("extracted constraints for '{}': absent={}", path, result.is_absent());
    result
}

/// Normalizes `filter` and looks up a value for `path`.
pub fn field_value(
    filter: &Document,
    path: &str,
    operator: Option<Operator>,
    mode: BranchMode,
) -> FieldValue {
    normalize_document(filter).value(path, operator, mode)
}

fn fold_bag(predicates: &[Predicate], path: &str) -> OperatorBag {
    let mut bag = OperatorBag::new();
    for predicate in predicates.iter().filter(|p| p.path == path) {
        bag.insert(predicate.operator, predicate.value.clone());
    }
    bag
}

fn pick(bag: OperatorBag, operator: Option<Operator>) -> FieldValue {
    match operator {
        Some(operator) => match bag.get(operator) {
            Some(value) => FieldValue::Value(value.clone()),
            None => FieldValue::Absent,
        },
        None => match bag.get(Operator::Eq) {
            Some(value) => FieldValue::Value(value.clone()),
            None => FieldValue::Constraints(bag),
        },
    }
}

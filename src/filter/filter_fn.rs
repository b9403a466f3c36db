use crate::filter::{NormalizedFilter, Operator, OperatorBag, Predicate};
use bson::Bson;

pub fn pred(path: &str, operator: Operator, value: impl Into<Bson>) -> Predicate {
    Predicate::new(path, operator, value)
}

pub fn eq_pred(path: &str, value: impl Into<Bson>) -> Predicate {
    pred(path, Operator::Eq, value)
}

pub fn bag<T, U>(entries: T) -> OperatorBag
where
    T: IntoIterator<Item = (Operator, U)>,
    U: Into<Bson>,
{
    entries
        .into_iter()
        .map(|(operator, value)| (operator, value.into()))
        .collect()
}

pub fn conjunction<T>(predicates: T) -> NormalizedFilter
where
    T: IntoIterator<Item = Predicate>,
{
    NormalizedFilter {
        conjuncts: predicates.into_iter().collect(),
        branches: Vec::new(),
    }
}

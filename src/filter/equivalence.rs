use bson::{Bson, Document};
use std::collections::BTreeMap;

/// Decides whether two RAW filter documents are structurally identical.
///
/// This answers "is this literally the same specification", not "do these
/// match the same data": two filters that are semantically equivalent after
/// normalization but differ in surface structure (different `$and` ordering,
/// nested vs. flattened forms) compare UNEQUAL. Suitable for structural
/// cache keys, not semantic dedup.
pub fn equivalent(a: &Document, b: &Document) -> bool {
    documents_equivalent(a, b)
}

/// Deep structural equality over two BSON values.
///
/// Array order is significant (`{$and: [A, B]}` differs from
/// `{$and: [B, A]}`); document key order is not. Numbers compare across the
/// Int32/Int64/Double families by numeric value, and `NaN` compares equal to
/// itself, matching the canonical document-database comparison rules.
pub fn bson_equivalent(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Null, Bson::Null) => true,
        (Bson::Double(x), Bson::Double(y)) if x.is_nan() && y.is_nan() => true,
        (Bson::Int32(x), Bson::Int32(y)) => x == y,
        (Bson::Int64(x), Bson::Int64(y)) => x == y,
        (Bson::Double(x), Bson::Double(y)) => x == y,

        // Mixed numeric families compare by numeric value.
        (Bson::Int32(x), Bson::Int64(y)) => i64::from(*x) == *y,
        (Bson::Int64(x), Bson::Int32(y)) => *x == i64::from(*y),
        (Bson::Int32(x), Bson::Double(y)) => f64::from(*x) == *y,
        (Bson::Double(x), Bson::Int32(y)) => *x == f64::from(*y),
        (Bson::Int64(x), Bson::Double(y)) => int64_equals_double(*x, *y),
        (Bson::Double(x), Bson::Int64(y)) => int64_equals_double(*y, *x),

        (Bson::Array(xs), Bson::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| bson_equivalent(x, y))
        }
        (Bson::Document(x), Bson::Document(y)) => documents_equivalent(x, y),

        // Shape mismatches are unequal, never coerced.
        (Bson::Array(_), _) | (_, Bson::Array(_)) => false,
        (Bson::Document(_), _) | (_, Bson::Document(_)) => false,

        _ => a == b,
    }
}

/// Casting an `i64` to `f64` collapses distinct values above 2^53, so the
/// comparison goes the other way: the double must be integral, inside the
/// `i64` range, and convert back to exactly `x`. `NaN` and the boundary
/// 2^63 (which a saturating cast would fold onto `i64::MAX`) both fail.
fn int64_equals_double(x: i64, y: f64) -> bool {
    y.fract() == 0.0 && y >= i64::MIN as f64 && y < i64::MAX as f64 && x == y as i64
}

fn documents_equivalent(a: &Document, b: &Document) -> bool {
    if a.len() != b.len() {
        return false;
    }
    // Compare by key set, not insertion order.
    let by_key: BTreeMap<&str, &Bson> = b.iter().map(|(key, value)| (key.as_str(), value)).collect();
    a.iter().all(|(key, value)| match by_key.get(key.as_str()) {
        Some(other) => bson_equivalent(value, other),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_identical_documents_are_equivalent() {
        assert!(equivalent(&doc! { "a": 1 }, &doc! { "a": 1 }));
        assert!(equivalent(&doc! {}, &doc! {}));
    }

    #[test]
    fn test_same_document_is_equivalent_to_itself() {
        let filter = doc! {
            "status": "A",
            "$or": [ { "qty": { "$lt": 30 } }, { "item": { "$regex": "^p" } } ]
        };
        assert!(equivalent(&filter, &filter.clone()));
    }

    #[test]
    fn test_differing_values_are_not_equivalent() {
        assert!(!equivalent(&doc! { "a": 1 }, &doc! { "a": 2 }));
    }

    #[test]
    fn test_extra_keys_are_not_equivalent() {
        assert!(!equivalent(&doc! { "a": 1 }, &doc! { "a": 1, "b": 2 }));
        assert!(!equivalent(&doc! { "a": 1, "b": 2 }, &doc! { "a": 1 }));
    }

    #[test]
    fn test_key_insertion_order_is_insignificant() {
        assert!(equivalent(&doc! { "a": 1, "b": 2 }, &doc! { "b": 2, "a": 1 }));
    }

    #[test]
    fn test_array_order_is_significant() {
        let ab = doc! { "$and": [ { "a": 1 }, { "b": 2 } ] };
        let ba = doc! { "$and": [ { "b": 2 }, { "a": 1 } ] };
        assert!(!equivalent(&ab, &ba));
    }

    #[test]
    fn test_array_length_mismatch() {
        assert!(!equivalent(&doc! { "a": [1, 2] }, &doc! { "a": [1, 2, 3] }));
    }

    #[test]
    fn test_array_vs_scalar_shape_mismatch() {
        assert!(!equivalent(&doc! { "a": [1] }, &doc! { "a": 1 }));
        assert!(!equivalent(&doc! { "a": { "b": 1 } }, &doc! { "a": 1 }));
    }

    #[test]
    fn test_nested_documents_compare_recursively() {
        let a = doc! { "size": { "h": 14, "w": 21, "uom": "cm" } };
        let b = doc! { "size": { "uom": "cm", "h": 14, "w": 21 } };
        assert!(equivalent(&a, &b));

        let c = doc! { "size": { "h": 14, "w": 21, "uom": "in" } };
        assert!(!equivalent(&a, &c));
    }

    #[test]
    fn test_mixed_numeric_families_compare_by_value() {
        assert!(bson_equivalent(&Bson::Int32(7), &Bson::Int64(7)));
        assert!(bson_equivalent(&Bson::Int64(7), &Bson::Double(7.0)));
        assert!(bson_equivalent(&Bson::Double(7.0), &Bson::Int32(7)));
        assert!(!bson_equivalent(&Bson::Int32(7), &Bson::Double(7.5)));
    }

    #[test]
    fn test_large_int64_does_not_collapse_onto_nearby_double() {
        // 2^60 + 1 rounds to 2^60 when cast to f64; the two must stay distinct.
        let above_53_bits = (1_i64 << 60) + 1;
        assert!(!bson_equivalent(
            &Bson::Int64(above_53_bits),
            &Bson::Double((1_i64 << 60) as f64)
        ));
        assert!(!bson_equivalent(
            &Bson::Double((1_i64 << 60) as f64),
            &Bson::Int64(above_53_bits)
        ));
        // i64::MAX is not representable as f64; 2^63 lands outside the range.
        assert!(!bson_equivalent(&Bson::Int64(i64::MAX), &Bson::Double(9.223372036854776e18)));

        // Exactly representable magnitudes still compare equal.
        assert!(bson_equivalent(
            &Bson::Int64(1_i64 << 60),
            &Bson::Double((1_i64 << 60) as f64)
        ));
    }

    #[test]
    fn test_nan_is_equivalent_to_nan() {
        assert!(bson_equivalent(&Bson::Double(f64::NAN), &Bson::Double(f64::NAN)));
        assert!(!bson_equivalent(&Bson::Double(f64::NAN), &Bson::Double(0.0)));
    }

    #[test]
    fn test_null_only_matches_null() {
        assert!(bson_equivalent(&Bson::Null, &Bson::Null));
        assert!(!bson_equivalent(&Bson::Null, &Bson::Int32(0)));
        assert!(!bson_equivalent(&Bson::Null, &Bson::String("".into())));
    }

    #[test]
    fn test_remaining_variants_use_exact_equality() {
        assert!(bson_equivalent(&Bson::Boolean(true), &Bson::Boolean(true)));
        assert!(!bson_equivalent(&Bson::Boolean(true), &Bson::Boolean(false)));
        assert!(!bson_equivalent(&Bson::String("1".into()), &Bson::Int32(1)));
    }
}

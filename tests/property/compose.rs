// Algebraic invariants of tuple composition.

use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::common::{load, ordered_keys};

const NAMES: [&str; 10] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
];

/// A small tuple as name->int, with names drawn from a fixed pool so keys
/// are always valid identifiers.
fn arb_tuple() -> impl Strategy<Value = BTreeMap<&'static str, i64>> {
    prop::collection::btree_map(
        prop::sample::select(&NAMES[..]),
        -1000i64..1000,
        0..6,
    )
}

fn yaml_block(name: &str, entries: &BTreeMap<&'static str, i64>) -> String {
    let mut out = format!("{}:", name);
    if entries.is_empty() {
        out.push_str(" {}\n");
        return out;
    }
    out.push('\n');
    for (key, value) in entries {
        out.push_str(&format!("  {}: {}\n", key, value));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// keys(compose(A, B)) is the union of both key sets, A's order first.
    #[test]
    fn composition_keys_are_the_union(a in arb_tuple(), b in arb_tuple()) {
        let source = format!(
            "{}{}t3: !expr t1 t2\n",
            yaml_block("t1", &a),
            yaml_block("t2", &b)
        );
        let y = load(&source);
        let t3 = y.tuple("t3").unwrap();

        let mut expected: Vec<String> = a.keys().map(|k| k.to_string()).collect();
        for key in b.keys() {
            if !a.contains_key(key) {
                expected.push(key.to_string());
            }
        }
        prop_assert_eq!(ordered_keys(&t3), expected);
    }

    /// The rightmost definition wins for shared keys; A's values survive
    /// for the rest.
    #[test]
    fn composition_overrides_rightmost(a in arb_tuple(), b in arb_tuple()) {
        let source = format!(
            "{}{}t3: !expr t1 t2\n",
            yaml_block("t1", &a),
            yaml_block("t2", &b)
        );
        let y = load(&source);
        let t3 = y.tuple("t3").unwrap();
        for (key, value) in &a {
            let expected = b.get(key).copied().unwrap_or(*value);
            prop_assert_eq!(t3.get(key).unwrap(), yamlet::Value::Int(expected));
        }
        for (key, value) in &b {
            prop_assert_eq!(t3.get(key).unwrap(), yamlet::Value::Int(*value));
        }
    }

    /// Composing with the empty tuple is an identity on either side.
    #[test]
    fn empty_tuple_is_an_identity(a in arb_tuple()) {
        let source = format!(
            "{}empty: {{}}\nleft: !expr t1 empty\nright: !expr empty t1\n",
            yaml_block("t1", &a)
        );
        let y = load(&source);
        let keys: Vec<String> = a.keys().map(|k| k.to_string()).collect();
        prop_assert_eq!(ordered_keys(&y.tuple("left").unwrap()), keys.clone());
        prop_assert_eq!(ordered_keys(&y.tuple("right").unwrap()), keys);
        for (key, value) in &a {
            prop_assert_eq!(
                y.tuple("left").unwrap().get(key).unwrap(),
                yamlet::Value::Int(*value)
            );
        }
    }

    /// Composition is associative on key sets: (A B) C == A (B C).
    #[test]
    fn composition_key_sets_associate(
        a in arb_tuple(),
        b in arb_tuple(),
        c in arb_tuple(),
    ) {
        let source = format!(
            "{}{}{}lhs: !expr (t1 t2) t3\nrhs: !expr t1 (t2 t3)\n",
            yaml_block("t1", &a),
            yaml_block("t2", &b),
            yaml_block("t3", &c)
        );
        let y = load(&source);
        prop_assert_eq!(
            ordered_keys(&y.tuple("lhs").unwrap()),
            ordered_keys(&y.tuple("rhs").unwrap())
        );
    }
}

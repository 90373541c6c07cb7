// The ConfigTuple surface: keys, items, evaluate_fully, render.

use crate::common::{load, load_with, ordered_keys};
use yamlet::{LoaderOptions, Value};

#[test]
fn keys_do_not_force_values() {
    // A key whose value would fail still shows up in keys().
    let y = load(
        "\
good: 1
bad: !expr 1 / 0
",
    );
    assert_eq!(ordered_keys(&y), vec!["good", "bad"]);
}

#[test]
fn items_force_in_order() {
    let y = load(
        "\
a: 1
b: !expr a + 1
c: !fmt '{b}c'
",
    );
    let items = y.items().unwrap();
    let rendered: Vec<(String, Value)> = items
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
            ("c".to_string(), Value::from("2c")),
        ]
    );
}

#[test]
fn evaluate_fully_forces_nested_tuples() {
    let y = load(
        "\
outer:
  inner:
    v: !expr 2 + 3
",
    );
    let value = y.evaluate_fully().unwrap();
    let outer = value.as_tuple().unwrap();
    assert_eq!(outer.keys().len(), 1);
    // Everything is forced; rendering needs no further evaluation.
    assert_eq!(y.render().unwrap(), "{outer: {inner: {v: 5}}}");
}

#[test]
fn render_uses_the_loader_style() {
    let y = load("a: text\nb: 2\n");
    assert_eq!(y.render().unwrap(), "{a: 'text', b: 2}");
}

#[test]
fn contains_does_not_force() {
    let y = load("bad: !expr 1 / 0\n");
    assert!(y.contains("bad").unwrap());
    assert!(!y.contains("good").unwrap());
}

#[test]
fn get_missing_key_is_key_not_found() {
    let y = load("a: 1\n");
    let err = y.get("zzz").unwrap_err();
    assert!(matches!(err.kind, yamlet::ErrorKind::KeyNotFound { .. }));
}

#[test]
fn explain_literal_values() {
    let y = load("a: 1\n");
    let explanation = y.explain_value("a").unwrap();
    assert!(explanation.contains("declared directly"));
}

#[test]
fn explain_computed_values_show_dependencies() {
    let y = load(
        "\
base: 2
derived: !expr base * 21
",
    );
    let _ = y.get("derived").unwrap();
    let explanation = y.explain_value("derived").unwrap();
    assert!(explanation.contains("base * 21"));
    assert!(explanation.contains("`base`"));
}

#[test]
fn stringify_style_is_per_loader() {
    let terse = load("v: !fmt '{x}'\nx: word\n");
    assert_eq!(terse.get("v").unwrap().as_str(), Some("word"));
    let diagnostic = load_with(
        LoaderOptions::new().with_stringify(yamlet::StringifyStyle::Diagnostic),
        "v: !fmt '{x}'\nx: word\n",
    );
    assert_eq!(diagnostic.get("v").unwrap().as_str(), Some("'word'"));
}

// The error taxonomy: cycles, bad syntax, bad operands.

use crate::common::{get_int, get_str, load};
use yamlet::{ErrorKind, Loader, LoaderOptions};

#[test]
fn cycles_name_the_keys_involved() {
    let y = load(
        "\
recursive:
  a: !expr b
  b: !expr a
  unrelated: fine
",
    );
    let recursive = y.tuple("recursive").unwrap();
    let err = recursive.get("a").unwrap_err();
    match &err.kind {
        ErrorKind::CycleDetected { chain } => {
            assert!(chain.contains(&"a".to_string()), "chain: {:?}", chain);
            assert!(chain.contains(&"b".to_string()), "chain: {:?}", chain);
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
    // Unrelated keys in the same tuple still force.
    assert_eq!(get_str(&recursive, "unrelated"), "fine");
    // And the failed cells were reset, so the error reproduces.
    assert!(recursive.get("b").is_err());
}

#[test]
fn self_cycle() {
    let y = load("a: !expr a\n");
    let err = y.get("a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CycleDetected { .. }));
}

#[test]
fn undefined_names_are_reported() {
    let y = load("v: !expr nonesuch\n");
    let err = y.get("v").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UndefinedName { ref name } if name == "nonesuch"));
    // The trace names the key whose forcing failed.
    assert!(err.trace.iter().any(|f| f.what.contains("`v`")));
}

#[test]
fn lex_errors_surface_at_load_time() {
    let result = Loader::new(LoaderOptions::default()).load_str("v: !expr 'oops\n", "<test>");
    // The YAML reader rejects an unterminated quoted scalar before the
    // expression lexer ever sees it.
    assert!(result.is_err());

    let result = Loader::new(LoaderOptions::default()).load_str("v: !expr a ~ b\n", "<test>");
    match result {
        Err(err) => assert!(matches!(err.kind, ErrorKind::Lex { .. })),
        Ok(_) => panic!("expected a lex error"),
    }
}

#[test]
fn parse_errors_surface_at_load_time() {
    let result = Loader::new(LoaderOptions::default()).load_str("v: !expr a +\n", "<test>");
    match result {
        Err(err) => assert!(matches!(err.kind, ErrorKind::Parse { .. })),
        Ok(_) => panic!("expected a parse error"),
    }
}

#[test]
fn unknown_tags_are_rejected() {
    let result =
        Loader::new(LoaderOptions::default()).load_str("v: !mystery payload\n", "<test>");
    match result {
        Err(err) => match err.kind {
            ErrorKind::Yaml { message } => assert!(message.contains("!mystery")),
            other => panic!("expected a YAML error, got {:?}", other),
        },
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn duplicate_keys_are_rejected() {
    let result =
        Loader::new(LoaderOptions::default()).load_str("a: 1\nb: 2\na: 3\n", "<test>");
    match result {
        Err(err) => match err.kind {
            ErrorKind::Yaml { message } => assert!(message.contains("duplicate")),
            other => panic!("expected a YAML error, got {:?}", other),
        },
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn division_by_zero() {
    let y = load("v: !expr 1 / 0\n");
    let err = y.get("v").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Arithmetic { .. }));
}

#[test]
fn index_out_of_range() {
    let y = load(
        "\
xs: [1, 2]
v: !expr xs[5]
w: !expr xs[-3]
",
    );
    let err = y.get("v").unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::IndexOutOfRange { index: 5, length: 2 }
    ));
    assert!(y.get("w").is_err());
}

#[test]
fn missing_attribute_is_key_not_found() {
    let y = load(
        "\
t:
  a: 1
v: !expr t.b
",
    );
    let err = y.get("v").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::KeyNotFound { ref key } if key == "b"));
}

#[test]
fn failed_keys_do_not_poison_the_tuple() {
    let y = load(
        "\
good: !expr 1 + 1
bad: !expr 1 / 0
also_good: !fmt 'value is {good}'
",
    );
    assert!(y.get("bad").is_err());
    assert_eq!(get_int(&y, "good"), 2);
    assert_eq!(get_str(&y, "also_good"), "value is 2");
}

#[test]
fn depth_limit_bounds_runaway_recursion() {
    let options = LoaderOptions::new().with_max_depth(64);
    let y = Loader::new(options)
        .load_str(
            "\
f: !lambda |
  x: f(x + 1)
v: !expr f(0)
",
            "<test>",
        )
        .unwrap();
    let err = y.get("v").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CycleDetected { .. }));
}

#[test]
fn import_errors_name_the_path() {
    let y = load("ext: !import does-not-exist.yaml\n");
    let err = y.get("ext").unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::Import { ref path, .. } if path == "does-not-exist.yaml"
    ));
}

#[test]
fn errors_carry_spans() {
    let y = load("v: !expr nonesuch\n");
    let err = y.get("v").unwrap_err();
    assert_eq!(err.span.file.as_ref(), "<test>");
    assert_eq!(err.span.line, 1);
}

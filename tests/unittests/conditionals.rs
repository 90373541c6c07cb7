// `cond(...)`, and `!if`/`!elif`/`!else` directive ladders.

use crate::common::{get_int, get_str, load, load_with, ordered_keys, sorted_keys};
use yamlet::{LoaderOptions, Value};

#[test]
fn cond_picks_lazily_by_composited_input() {
    let y = load(
        "\
t1:
  color: !expr cond(blocked, 'red', 'green')
t2: !composite
  - t1
  - { blocked: true }
t3: !composite
  - t1
  - { blocked: false }
",
    );
    assert_eq!(get_str(&y.tuple("t2").unwrap(), "color"), "red");
    assert_eq!(get_str(&y.tuple("t3").unwrap(), "color"), "green");
}

#[test]
fn cond_branches_compose_and_extend() {
    let y = load(
        "\
t1:
  conditionals: !expr |
    cond(blocked, {
      color: 'red'
    }, {
      color: 'green'
    }) {
      val: 'Color: {color}'
    }
t2: !composite
  - t1
  - { blocked: true }
t3: !composite
  - t1
  - { blocked: false }
",
    );
    let t2 = y.tuple("t2").unwrap().tuple("conditionals").unwrap();
    let t3 = y.tuple("t3").unwrap().tuple("conditionals").unwrap();
    assert_eq!(get_str(&t2, "color"), "red");
    assert_eq!(get_str(&t2, "val"), "Color: red");
    assert_eq!(get_str(&t3, "color"), "green");
    assert_eq!(get_str(&t3, "val"), "Color: green");
}

#[test]
fn if_ladder_at_the_top_level() {
    let y = load(
        "\
!if (1 + 1 == 2):
  a: 10
  b: { ba: 11 }
!else:
  crap: value
!if ('shark' == 'fish'):
  more-crap: values
!elif ('crab' == 'crab'):
  b: { bb: 12 }
  c: 13
!else:
  still-crap: 10
!if ('fish' == 'fish'):
  d: 14
!else:
  crapagain: 2
",
    );
    assert_eq!(ordered_keys(&y), vec!["a", "b", "c", "d"]);
    assert_eq!(get_int(&y, "a"), 10);
    let b = y.tuple("b").unwrap();
    assert_eq!(get_int(&b, "ba"), 11);
    assert_eq!(get_int(&b, "bb"), 12);
    assert_eq!(get_int(&y, "c"), 13);
    assert_eq!(get_int(&y, "d"), 14);
    assert!(!y.contains("crap").unwrap());
    assert!(!y.contains("more-crap").unwrap());
    assert!(!y.contains("crapagain").unwrap());
}

#[test]
fn buried_if_ladders() {
    let y = load(
        "\
t:
  !if (1 + 1 == 2):
    a: 10
    b: { ba: 11 }
  !else:
    crap: value
  !if (2 + 2 == 6):
    crap: value
  !else:
    b: { bb: 12 }
",
    );
    let t = y.tuple("t").unwrap();
    assert_eq!(sorted_keys(&t), vec!["a", "b"]);
    assert_eq!(get_int(&t, "a"), 10);
    let b = t.tuple("b").unwrap();
    assert_eq!(get_int(&b, "ba"), 11);
    assert_eq!(get_int(&b, "bb"), 12);
}

#[test]
fn guards_see_composited_values() {
    let y = load(
        "\
t0:
  !if animal == 'fish':
    environment: water
  !elif animal == 'dog':
    attention: pats
    toys: !expr ([favorite_toy])
  !elif animal == 'cat':
    diet: meat
  !else:
    recommendation: specialist
t1: !expr |
    t0 { animal: 'cat' }
t2: !composite
  - t0
  - animal: dog
    favorite_toy: squeaky ball
    action: !expr attention
t3: !expr |
    t0 { animal: 'fish' }
t4: !expr |
    t0 { animal: 'squirrel' }
",
    );
    let t1 = y.tuple("t1").unwrap();
    assert_eq!(get_str(&t1, "diet"), "meat");
    assert_eq!(sorted_keys(&t1), vec!["animal", "diet"]);

    let t2 = y.tuple("t2").unwrap();
    assert_eq!(get_str(&t2, "action"), "pats");
    assert_eq!(get_str(&t2, "attention"), "pats");
    assert_eq!(
        t2.get("toys").unwrap(),
        Value::from(vec![Value::from("squeaky ball")])
    );
    assert_eq!(
        sorted_keys(&t2),
        vec!["action", "animal", "attention", "favorite_toy", "toys"]
    );

    let t3 = y.tuple("t3").unwrap();
    assert_eq!(get_str(&t3, "environment"), "water");
    assert_eq!(sorted_keys(&t3), vec!["animal", "environment"]);

    let t4 = y.tuple("t4").unwrap();
    assert_eq!(get_str(&t4, "recommendation"), "specialist");
    assert_eq!(sorted_keys(&t4), vec!["animal", "recommendation"]);
}

#[test]
fn nested_if_ladders() {
    let y = load(
        "\
t1:
  !if outer == 'A':
    !if inner == 'X':
      result: 'AX'
    !elif inner == 'Y':
      result: 'AY'
    !else:
      result: 'A?'
  !elif outer == 'B':
    !if inner == 'X':
      result: 'BX'
    !else:
      result: 'B?'
  !else:
    result: Unknown
t2: !expr |
    t1 { outer: 'A', inner: 'X' }
t3: !expr |
    t1 { outer: 'B', inner: 'Y' }
t4: !expr |
    t1 { outer: 'C', inner: 'X' }
",
    );
    assert_eq!(get_str(&y.tuple("t2").unwrap(), "result"), "AX");
    assert_eq!(get_str(&y.tuple("t3").unwrap(), "result"), "B?");
    assert_eq!(get_str(&y.tuple("t4").unwrap(), "result"), "Unknown");
}

#[test]
fn platform_example_from_the_readme() {
    let source = "\
!if platform == 'Windows':
  directory_separator: \\
  executable_extension: exe
  dylib_extension: dll
!elif platform == 'Linux':
  directory_separator: /
  executable_extension: null
  dylib_extension: so
!else:
  directory_separator: /
  executable_extension: bin
  dylib_extension: dylib
";
    let windows = load_with(
        LoaderOptions::new().with_global("platform", "Windows"),
        source,
    );
    assert_eq!(get_str(&windows, "directory_separator"), "\\");
    assert_eq!(get_str(&windows, "executable_extension"), "exe");
    assert_eq!(get_str(&windows, "dylib_extension"), "dll");

    let linux = load_with(
        LoaderOptions::new().with_global("platform", "Linux"),
        source,
    );
    assert_eq!(get_str(&linux, "directory_separator"), "/");
    assert_eq!(linux.get("executable_extension").unwrap(), Value::Null);
    assert_eq!(get_str(&linux, "dylib_extension"), "so");

    let other = load_with(
        LoaderOptions::new().with_global("platform", "Who knows"),
        source,
    );
    assert_eq!(get_str(&other, "directory_separator"), "/");
    assert_eq!(get_str(&other, "executable_extension"), "bin");
    assert_eq!(get_str(&other, "dylib_extension"), "dylib");
}

#[test]
fn names_resolve_through_ladder_bodies() {
    let y = load(
        "\
val: 1337
!if 1:
  t:
    val2: !expr val
",
    );
    let t = y.tuple("t").unwrap();
    assert_eq!(get_int(&t, "val2"), 1337);
}

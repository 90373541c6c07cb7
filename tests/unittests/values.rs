// Scalar construction, operators, and name resolution basics.

use crate::common::{get_int, get_str, load, load_with};
use yamlet::{LoaderOptions, Value};

#[test]
fn plain_scalars_resolve_types() {
    let y = load(
        "\
int: 10
float: 1.5
yes: true
no: false
nothing: null
text: hello
quoted: '10'
",
    );
    assert_eq!(y.get("int").unwrap(), Value::Int(10));
    assert_eq!(y.get("float").unwrap(), Value::Float(1.5));
    assert_eq!(y.get("yes").unwrap(), Value::Bool(true));
    assert_eq!(y.get("no").unwrap(), Value::Bool(false));
    assert_eq!(y.get("nothing").unwrap(), Value::Null);
    assert_eq!(y.get("text").unwrap().as_str(), Some("hello"));
    assert_eq!(y.get("quoted").unwrap().as_str(), Some("10"));
}

#[test]
fn binary_operators() {
    let y = load(
        "\
add: !expr 10 + 89
sub: !expr 89 - 10
mul: !expr 12 * 12
div: !expr 990 / 11
rem: !expr 995 % 11
",
    );
    assert_eq!(get_int(&y, "add"), 99);
    assert_eq!(get_int(&y, "sub"), 79);
    assert_eq!(get_int(&y, "mul"), 144);
    assert_eq!(y.get("div").unwrap(), Value::Float(90.0));
    assert_eq!(get_int(&y, "rem"), 5);
}

#[test]
fn unary_operators() {
    let y = load(
        "\
neg: !expr -10
not_ten: !expr not 10
not_zero: !expr not 0
",
    );
    assert_eq!(get_int(&y, "neg"), -10);
    assert_eq!(y.get("not_ten").unwrap(), Value::Bool(false));
    assert_eq!(y.get("not_zero").unwrap(), Value::Bool(true));
}

#[test]
fn string_concatenation_from_the_readme() {
    let y = load(
        "\
key1: my common value
key2: !expr key1 + ' my extra specialized value'
",
    );
    assert_eq!(get_str(&y, "key2"), "my common value my extra specialized value");
}

#[test]
fn comparisons_and_logic() {
    let y = load(
        "\
lt: !expr 1 < 2
ge: !expr 2 >= 3
eq: !expr 'crab' == 'crab'
ne: !expr 'shark' != 'fish'
both: !expr 1 < 2 and 'a' == 'a'
either: !expr 0 or 7
",
    );
    assert_eq!(y.get("lt").unwrap(), Value::Bool(true));
    assert_eq!(y.get("ge").unwrap(), Value::Bool(false));
    assert_eq!(y.get("eq").unwrap(), Value::Bool(true));
    assert_eq!(y.get("ne").unwrap(), Value::Bool(true));
    assert_eq!(y.get("both").unwrap(), Value::Bool(true));
    // `or` returns the first truthy operand, not a boolean.
    assert_eq!(get_int(&y, "either"), 7);
}

#[test]
fn identity_operator_pinned() {
    let y = load(
        "\
int_yes: !expr 13 is 13
int_no: !expr 7 is 13
bool_yes: !expr true is true
null_yes: !expr null is null
mixed: !expr 1 is 1.0
",
    );
    assert_eq!(y.get("int_yes").unwrap(), Value::Bool(true));
    assert_eq!(y.get("int_no").unwrap(), Value::Bool(false));
    assert_eq!(y.get("bool_yes").unwrap(), Value::Bool(true));
    assert_eq!(y.get("null_yes").unwrap(), Value::Bool(true));
    // Identity does not cross numeric types.
    assert_eq!(y.get("mixed").unwrap(), Value::Bool(false));
}

#[test]
fn membership() {
    let y = load(
        "\
xs: [1, 2, 'red']
t:
  a: 1
in_list: !expr 2 in xs
not_in_list: !expr 9 in xs
in_tuple: !expr 'a' in t
not_in_tuple: !expr 'b' in t
in_string: !expr 'ell' in 'hello'
",
    );
    assert_eq!(y.get("in_list").unwrap(), Value::Bool(true));
    assert_eq!(y.get("not_in_list").unwrap(), Value::Bool(false));
    assert_eq!(y.get("in_tuple").unwrap(), Value::Bool(true));
    assert_eq!(y.get("not_in_tuple").unwrap(), Value::Bool(false));
    assert_eq!(y.get("in_string").unwrap(), Value::Bool(true));
}

#[test]
fn list_indexing_including_negative() {
    let y = load(
        "\
xs: ['a', 'b', 'c']
first: !expr xs[0]
last: !expr xs[-1]
",
    );
    assert_eq!(get_str(&y, "first"), "a");
    assert_eq!(get_str(&y, "last"), "c");
}

#[test]
fn conditional_expression() {
    let y = load(
        "\
x: 4
val: !expr 'low' if x < 10 else 'high'
",
    );
    assert_eq!(get_str(&y, "val"), "low");
}

#[test]
fn builtins() {
    let y = load(
        "\
xs: [1, 2, 3]
word: hello
n_list: !expr len(xs)
n_str: !expr len(word)
as_int: !expr int('42')
as_float: !expr float(7)
as_str: !expr str(13)
trunc: !expr int(2.9)
",
    );
    assert_eq!(get_int(&y, "n_list"), 3);
    assert_eq!(get_int(&y, "n_str"), 5);
    assert_eq!(get_int(&y, "as_int"), 42);
    assert_eq!(y.get("as_float").unwrap(), Value::Float(7.0));
    assert_eq!(get_str(&y, "as_str"), "13");
    assert_eq!(get_int(&y, "trunc"), 2);
}

#[test]
fn user_functions_shadow_builtins() {
    let options = LoaderOptions::new()
        .with_function("len", |_args| Ok(Value::Int(99)));
    let y = load_with(options, "n: !expr len('abc')\n");
    assert_eq!(get_int(&y, "n"), 99);
}

#[test]
fn globals_are_the_last_resort() {
    let options = LoaderOptions::new().with_global("region", "eu-west");
    let y = load_with(
        options,
        "\
t:
  region: local
  here: !expr region
elsewhere: !expr region
",
    );
    let t = y.tuple("t").unwrap();
    assert_eq!(get_str(&t, "here"), "local");
    assert_eq!(get_str(&y, "elsewhere"), "eu-west");
}

#[test]
fn reference_into_another_scope() {
    let y = load(
        "\
context:
  not_in_evaluating_scope: Hello, world!
  referenced: !fmt '{not_in_evaluating_scope}'
result: !expr context.referenced
",
    );
    assert_eq!(get_str(&y, "result"), "Hello, world!");
}

#[test]
fn reference_through_captured_tuple() {
    let y = load(
        "\
context:
  not_in_evaluating_scope: Hello, world!
  referenced: !fmt '{not_in_evaluating_scope}'
context2:
  inner_ref: !expr context
  referenced_2: !expr inner_ref.referenced
result: !expr context2.referenced_2
",
    );
    assert_eq!(get_str(&y, "result"), "Hello, world!");
}

#[test]
fn null_does_not_satisfy_name_lookup() {
    let y = load(
        "\
t1:
  v: value
  sub:
    v: !null
    exp: !expr v
",
    );
    let sub = y.tuple("t1").unwrap().tuple("sub").unwrap();
    assert_eq!(get_str(&sub, "exp"), "value");
}

#[test]
fn external_is_inert() {
    let y = load(
        "\
t1:
  sub:
    v: !external
    exp: !expr v
",
    );
    let sub = y.tuple("t1").unwrap().tuple("sub").unwrap();
    assert_eq!(sub.get("exp").unwrap(), Value::External);
}

#[test]
fn values_memoize_once_forced() {
    use std::cell::Cell;
    use std::rc::Rc;

    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let options = LoaderOptions::new().with_function("tick", move |_args| {
        seen.set(seen.get() + 1);
        Ok(Value::Int(seen.get() as i64))
    });
    let y = load_with(options, "v: !expr tick()\n");
    assert_eq!(get_int(&y, "v"), 1);
    assert_eq!(get_int(&y, "v"), 1);
    assert_eq!(calls.get(), 1);
}

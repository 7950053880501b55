mod common;

use common::{run_err, run_ok};
use extract::{EvalError, Value};

#[test]
fn simple_script() {
    assert_eq!(run_ok(r#""This is a test.""#), Value::string("This is a test."));
}

#[test]
fn single_call() {
    assert_eq!(run_ok(r#"(String.to_upper "test")"#), Value::string("TEST"));
}

#[test]
fn string_format() {
    assert_eq!(
        run_ok(r#"(String.format "This is a %v." "test")"#),
        Value::string("This is a test."),
    );
}

#[test]
fn defmodule_and_call() {
    let src = "
    (defmodule Test
        (def (inc v) (add v 1))
    )

    (Test.inc 2)
    ";
    assert_eq!(run_ok(src), Value::Int(3));
}

#[test]
fn indirect_function_call() {
    let src = "
    (defmodule Test
        (def (get _) (func (plus a b) (add a b)))
    )

    ((Test.get ()) 1 2)
    ";
    assert_eq!(run_ok(src), Value::Int(3));
}

#[test]
fn pattern_match_failure() {
    let src = "
    (defmodule Test
        (def (test 1) ())
    )

    (Test.test 2)
    ";
    assert_eq!(run_err(src), EvalError::PatternMatch);
}

#[test]
fn comments_are_ignored() {
    let src = "
    # A leading comment.
    (add 1 2) # And a trailing one.
    ";
    assert_eq!(run_ok(src), Value::Int(3));
}

#[test]
fn multi_variant_functions() {
    let src = "
    (defmodule Fib
        (def (at 0) 0)
        (def (at 1) 1)
        (def (at n) (add (at (sub n 1)) (at (sub n 2))))
    )

    (Fib.at 10)
    ";
    assert_eq!(run_ok(src), Value::Int(55));
}

#[test]
fn let_threads_through_the_script() {
    let src = "
    (let greeting \"hello\")
    (String.to_upper greeting)
    ";
    assert_eq!(run_ok(src), Value::string("HELLO"));
}

#[test]
fn data_lists_from_degraded_heads() {
    assert_eq!(
        run_ok("(1 2 3)"),
        Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]),
    );
}

#[test]
fn errors_are_values_not_panics() {
    assert_eq!(run_err("missing"), EvalError::Name(extract::Ident::new("missing")));
    assert_eq!(
        run_err("(Unknown.f 1)"),
        EvalError::UndefinedModule(extract::Atom::new("Unknown")),
    );
}

#[test]
fn host_modules_are_callable() {
    use extract::{eval_all, Atom, Ident};

    let env = extract::new();
    let module = env.add_module(Atom::new("Math")).expect("fresh module");
    module.declare(
        Ident::new("max"),
        Value::native("Math.max", |env, args| {
            let (_, vals) = eval_all(env, args);
            let best = vals
                .iter()
                .filter_map(Value::as_int)
                .max()
                .map(Value::Int)
                .unwrap_or_else(Value::nil);
            (env.clone(), best)
        }),
    );

    let (_, result) = extract::run_str(&env, "(Math.max 3 (add 2 6) 5)").expect("read failed");
    assert_eq!(result, Value::Int(8));
}

#[test]
fn two_envs_share_a_registry_through_clones() {
    let env = extract::new();
    let scratch = env.bind(extract::Ident::new("x"), Value::Int(1));
    extract::run_str(&scratch, "(defmodule FromClone (def (id v) v))").expect("read failed");
    let (_, result) = extract::run_str(&env, "(FromClone.id 9)").expect("read failed");
    assert_eq!(result, Value::Int(9));
}

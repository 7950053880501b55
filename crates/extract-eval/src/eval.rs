use std::sync::Arc;

use extract_core::{Env, EvalError, Func, List, Value};

/// Evaluate `expr` in `env`, applying it to `args`. `args` is the
/// argument list of the enclosing call and is empty when `expr` is not
/// in head position. Returns the possibly-extended environment and the
/// result, which may be an error value.
pub fn eval(env: &Env, expr: &Value, args: &List) -> (Env, Value) {
    match expr {
        Value::Ident(id) => match env.lookup(*id) {
            None => (env.clone(), EvalError::Name(*id).into()),
            Some(Value::Ident(bound)) if bound == *id => {
                // A binding that resolves to itself would loop forever;
                // nothing in the language can construct one on purpose.
                panic!("identifier {id} is bound to itself");
            }
            Some(bound) => eval(env, &bound, args),
        },

        Value::Ref(r) => {
            let (env, target) = eval(env, &r.module, &List::nil());
            let name = match target {
                Value::Atom(name) => name,
                Value::Error(e) => return (env, Value::Error(e)),
                other => return (env, EvalError::type_error(other, &["atom"]).into()),
            };
            let Some(module) = env.get_module(name) else {
                return (env, EvalError::UndefinedModule(name).into());
            };
            let Some(decl) = module.lookup(r.name) else {
                return (env, EvalError::Name(r.name).into());
            };
            eval(&env, &decl, args)
        }

        Value::Call(call) => {
            // An empty pair of parentheses is data, not a call.
            let Some(head) = call.items().head() else {
                return (env.clone(), Value::nil());
            };
            let (env, result) = eval(env, head, &call.items().tail());
            if args.is_empty() || result.is_error() {
                (env, result)
            } else {
                // Call-of-call: apply whatever the inner call produced.
                eval(&env, &result, args)
            }
        }

        Value::Pinned(_) => (
            env.clone(),
            EvalError::eval("pinned ident used as expression").into(),
        ),

        Value::Func(func) => call_func(env, func, args),

        Value::Native(native) => (native.func)(env, args),

        // Every other value evaluates to itself. With arguments it
        // degrades to data: the head is prepended onto the argument
        // list.
        _ => {
            if args.is_empty() {
                (env.clone(), expr.clone())
            } else {
                (env.clone(), Value::List(args.push(expr.clone())))
            }
        }
    }
}

/// Evaluate each expression in order, threading the environment
/// forward. Every result is kept, errors included; the consumer decides
/// what to do with them.
pub fn eval_all(env: &Env, exprs: &List) -> (Env, List) {
    let mut env = env.clone();
    let mut results = Vec::with_capacity(exprs.len());
    for expr in exprs {
        let (next, val) = eval(&env, expr, &List::nil());
        env = next;
        results.push(val);
    }
    (env, results.into_iter().collect())
}

/// Run a sequence of expressions like a function body: thread the
/// environment forward and stop at the first error value. Returns the
/// last result, or the empty list for an empty sequence.
pub fn run<'a>(env: &Env, exprs: impl IntoIterator<Item = &'a Value>) -> (Env, Value) {
    let mut env = env.clone();
    let mut last = Value::nil();
    for expr in exprs {
        let (next, val) = eval(&env, expr, &List::nil());
        env = next;
        if val.is_error() {
            return (env, val);
        }
        last = val;
    }
    (env, last)
}

/// Apply a user function: evaluate the arguments in the caller's env,
/// then try each variant in definition order against the captured env.
/// The function's own name is bound in the variant env so the body can
/// recurse. Function-local bindings do not leak into the caller.
fn call_func(env: &Env, func: &Arc<Func>, args: &List) -> (Env, Value) {
    let (_, eargs) = eval_all(env, args);
    let input = Value::List(eargs);

    // Release the variants lock before running the body: the body may
    // `def` more variants onto this very function.
    let matched = {
        let variants = func.variants();
        variants
            .iter()
            .find_map(|variant| {
                let fenv = variant.pattern.matches(func.env(), &input)?;
                Some((fenv, variant.body.clone()))
            })
    };

    let Some((fenv, body)) = matched else {
        return (env.clone(), EvalError::PatternMatch.into());
    };
    let fenv = fenv.bind(func.name(), Value::Func(func.clone()));
    let (_, result) = run(&fenv, &body);
    (env.clone(), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract_core::{Ident, Pattern};

    fn eval_value(env: &Env, expr: &Value) -> Value {
        eval(env, expr, &List::nil()).1
    }

    #[test]
    fn literals_evaluate_to_themselves() {
        let env = Env::new();
        assert_eq!(eval_value(&env, &Value::Int(3)), Value::Int(3));
        assert_eq!(eval_value(&env, &Value::string("s")), Value::string("s"));
        assert_eq!(eval_value(&env, &Value::atom("a")), Value::atom("a"));
        let data = Value::list([Value::Int(1), Value::Int(2)]);
        assert_eq!(eval_value(&env, &data), data);
    }

    #[test]
    fn ident_resolves_through_the_env() {
        let x = Ident::new("x");
        let env = Env::new().bind(x, Value::Int(9));
        assert_eq!(eval_value(&env, &Value::Ident(x)), Value::Int(9));
        assert_eq!(
            eval_value(&Env::new(), &Value::Ident(x)),
            EvalError::Name(x).into(),
        );
    }

    #[test]
    fn ident_chains_resolve_transitively() {
        let a = Ident::new("a");
        let b = Ident::new("b");
        let env = Env::new()
            .bind(b, Value::Int(1))
            .bind(a, Value::Ident(b));
        assert_eq!(eval_value(&env, &Value::Ident(a)), Value::Int(1));
    }

    #[test]
    #[should_panic(expected = "bound to itself")]
    fn self_referential_ident_panics() {
        let x = Ident::new("selfish");
        let env = Env::new().bind(x, Value::Ident(x));
        eval_value(&env, &Value::Ident(x));
    }

    #[test]
    fn empty_call_is_data() {
        let env = Env::new();
        assert_eq!(
            eval_value(&env, &Value::call([])),
            Value::nil(),
        );
    }

    #[test]
    fn non_callable_head_degrades_to_data() {
        let env = Env::new();
        let expr = Value::call([Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(
            eval_value(&env, &expr),
            Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]),
        );
    }

    #[test]
    fn pinned_ident_is_not_an_expression() {
        let env = Env::new();
        assert_eq!(
            eval_value(&env, &Value::Pinned(Ident::new("x"))),
            EvalError::eval("pinned ident used as expression").into(),
        );
    }

    #[test]
    fn ref_requires_a_known_module() {
        let env = Env::new();
        let expr = Value::reference(Value::atom("Nope"), Ident::new("f"));
        assert_eq!(
            eval_value(&env, &expr),
            EvalError::UndefinedModule(extract_core::Atom::new("Nope")).into(),
        );
    }

    #[test]
    fn ref_requires_an_atom_target() {
        let env = Env::new();
        let expr = Value::reference(Value::Int(1), Ident::new("f"));
        assert_eq!(
            eval_value(&env, &expr),
            EvalError::type_error(Value::Int(1), &["atom"]).into(),
        );
    }

    #[test]
    fn ref_to_missing_declaration_is_a_name_error() {
        let env = Env::new();
        env.add_module(extract_core::Atom::new("Empty")).unwrap();
        let expr = Value::reference(Value::atom("Empty"), Ident::new("f"));
        assert_eq!(
            eval_value(&env, &expr),
            EvalError::Name(Ident::new("f")).into(),
        );
    }

    #[test]
    fn run_short_circuits_on_errors() {
        let env = Env::new();
        let exprs = List::of([
            Value::Int(1),
            Value::Ident(Ident::new("missing")),
            Value::Int(2),
        ]);
        let (_, result) = run(&env, &exprs);
        assert_eq!(result, EvalError::Name(Ident::new("missing")).into());
    }

    #[test]
    fn eval_all_keeps_errors() {
        let env = Env::new();
        let exprs = List::of([
            Value::Int(1),
            Value::Ident(Ident::new("missing")),
            Value::Int(2),
        ]);
        let (_, results) = eval_all(&env, &exprs);
        assert_eq!(results.len(), 3);
        let vals: Vec<Value> = results.iter().cloned().collect();
        assert_eq!(vals[0], Value::Int(1));
        assert!(vals[1].is_error());
        assert_eq!(vals[2], Value::Int(2));
    }

    #[test]
    fn first_matching_variant_wins() {
        let env = Env::new();
        let v = Ident::new("v");
        let func = Func::new(
            env.clone(),
            Ident::new("pick"),
            Pattern::compile(&env, &Value::list([Value::ident("v")])).unwrap(),
            List::of([Value::Int(1)]),
        );
        // A later variant that would also match must never fire.
        func.add_variant(
            Pattern::compile(&env, &Value::list([Value::Ident(v)])).unwrap(),
            List::of([Value::Int(2)]),
        );

        let (_, result) = eval(
            &env,
            &Value::Func(func),
            &List::of([Value::Int(0)]),
        );
        assert_eq!(result, Value::Int(1));
    }

    #[test]
    fn unmatched_arguments_are_a_pattern_error() {
        let env = Env::new();
        let func = Func::new(
            env.clone(),
            Ident::new("only1"),
            Pattern::compile(&env, &Value::list([Value::Int(1)])).unwrap(),
            List::of([Value::nil()]),
        );
        let (_, result) = eval(&env, &Value::Func(func), &List::of([Value::Int(2)]));
        assert_eq!(result, EvalError::PatternMatch.into());
    }

    #[test]
    fn function_locals_do_not_leak() {
        let env = Env::new();
        let v = Ident::new("leaky");
        let func = Func::new(
            env.clone(),
            Ident::new("f"),
            Pattern::compile(&env, &Value::list([Value::Ident(v)])).unwrap(),
            List::of([Value::Ident(v)]),
        );
        let (env_after, result) = eval(&env, &Value::Func(func), &List::of([Value::Int(5)]));
        assert_eq!(result, Value::Int(5));
        assert_eq!(env_after.lookup(v), None);
    }
}

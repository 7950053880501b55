use extract_core::{Env, EvalError, Func, Ident, List, Pattern, Value};

use crate::eval::{eval_all, run};

/// Bind every kernel form in `env`. Kernel forms live directly in the
/// locals chain, not inside any module, so they are visible everywhere
/// and can be shadowed like any other binding.
pub fn install_kernel(env: &Env) -> Env {
    let mut env = env.clone();
    for (name, f) in [
        ("defmodule", kernel_defmodule as KernelFn),
        ("def", kernel_def),
        ("func", kernel_func),
        ("let", kernel_let),
        ("list", kernel_list),
        ("add", kernel_add),
        ("sub", kernel_sub),
    ] {
        env = env.bind(Ident::new(name), Value::native(name, f));
    }
    env
}

type KernelFn = fn(&Env, &List) -> (Env, Value);

fn kernel_defmodule(env: &Env, args: &List) -> (Env, Value) {
    let Some(head) = args.head() else {
        return (env.clone(), EvalError::arity(0, -1).into());
    };
    let name = match head {
        Value::Atom(name) => *name,
        other => {
            return (
                env.clone(),
                EvalError::type_error(other.clone(), &["atom"]).into(),
            );
        }
    };

    let Some(module) = env.add_module(name) else {
        return (
            env.clone(),
            EvalError::eval(format!("module {:?} already declared", name.as_str())).into(),
        );
    };

    let menv = env.with_current_module(module);
    let (_, result) = run(&menv, &args.tail());
    if result.is_error() {
        return (env.clone(), result);
    }
    (env.clone(), Value::Atom(name))
}

/// Shared by `def` and `func`: split the first argument into a function
/// name and a compiled argument pattern.
fn compile_func_pattern(env: &Env, head: &Value) -> Result<(Ident, Pattern), EvalError> {
    match head {
        Value::Ident(name) => Ok((*name, Pattern::empty())),
        Value::Call(call) => {
            let Some(name) = call.items().head() else {
                return Err(EvalError::eval(
                    "function pattern list must contain at least one element",
                ));
            };
            let Value::Ident(name) = name else {
                return Err(EvalError::type_error(name.clone(), &["ident"]));
            };
            let pattern = Pattern::compile(env, &Value::List(call.items().tail()))?;
            Ok((*name, pattern))
        }
        other => Err(EvalError::type_error(other.clone(), &["ident", "list"])),
    }
}

fn kernel_def(env: &Env, args: &List) -> (Env, Value) {
    if args.len() < 2 {
        return (env.clone(), EvalError::arity(args.len(), -1).into());
    }
    let Some(module) = env.current_module().cloned() else {
        return (
            env.clone(),
            EvalError::eval("def used outside of a module").into(),
        );
    };
    let Some(head) = args.head() else {
        return (env.clone(), EvalError::arity(0, -1).into());
    };

    let (name, pattern) = match compile_func_pattern(env, head) {
        Ok(compiled) => compiled,
        Err(e) => return (env.clone(), e.into()),
    };
    let body = args.tail();

    // A second `def` of the same name extends the function with another
    // variant rather than replacing it.
    match module.lookup(name) {
        Some(Value::Func(func)) => {
            func.add_variant(pattern, body);
            (env.clone(), Value::Func(func))
        }
        Some(_) => (
            env.clone(),
            EvalError::eval(format!("attempted to redeclare {:?}", name.as_str())).into(),
        ),
        None => {
            let func = Func::new(env.clone(), name, pattern, body);
            module.declare(name, Value::Func(func.clone()));
            (env.clone(), Value::Func(func))
        }
    }
}

fn kernel_func(env: &Env, args: &List) -> (Env, Value) {
    if args.len() < 2 {
        return (env.clone(), EvalError::arity(args.len(), -1).into());
    }
    let Some(head) = args.head() else {
        return (env.clone(), EvalError::arity(0, -1).into());
    };
    match compile_func_pattern(env, head) {
        Ok((name, pattern)) => {
            let func = Func::new(env.clone(), name, pattern, args.tail());
            (env.clone(), Value::Func(func))
        }
        Err(e) => (env.clone(), e.into()),
    }
}

fn kernel_let(env: &Env, args: &List) -> (Env, Value) {
    if args.len() < 2 {
        return (env.clone(), EvalError::arity(args.len(), -1).into());
    }
    let Some(Value::Ident(name)) = args.head() else {
        let head = args.head().cloned().unwrap_or_else(Value::nil);
        return (env.clone(), EvalError::type_error(head, &["ident"]).into());
    };

    let (env, val) = run(env, &args.tail());
    if val.is_error() {
        return (env, val);
    }
    (env.bind(*name, val.clone()), val)
}

fn kernel_list(env: &Env, args: &List) -> (Env, Value) {
    if args.is_empty() {
        return (env.clone(), EvalError::arity(0, -1).into());
    }
    let (_, vals) = eval_all(env, args);
    (env.clone(), Value::List(vals))
}

fn kernel_add(env: &Env, args: &List) -> (Env, Value) {
    if args.len() < 2 {
        return (env.clone(), EvalError::arity(args.len(), -1).into());
    }

    let (_, vals) = eval_all(env, args);
    let mut total: i64 = 0;
    let mut totalf: f64 = 0.0;
    let mut saw_float = false;
    for val in &vals {
        match val {
            Value::Int(n) => total = total.wrapping_add(*n),
            Value::Float(n) => {
                totalf += n;
                saw_float = true;
            }
            Value::Error(_) => return (env.clone(), val.clone()),
            other => {
                return (
                    env.clone(),
                    EvalError::type_error(other.clone(), &["int", "float"]).into(),
                );
            }
        }
    }

    // The sum is a float iff a float appeared anywhere, even a zero one.
    if saw_float {
        (env.clone(), Value::Float(total as f64 + totalf))
    } else {
        (env.clone(), Value::Int(total))
    }
}

fn kernel_sub(env: &Env, args: &List) -> (Env, Value) {
    if args.len() != 2 {
        return (env.clone(), EvalError::arity(args.len(), 2).into());
    }

    let (_, vals) = eval_all(env, args);
    let mut operands = vals.iter();
    let (Some(first), Some(second)) = (operands.next(), operands.next()) else {
        return (env.clone(), EvalError::arity(vals.len(), 2).into());
    };

    let result = match (first, second) {
        (Value::Error(_), _) => first.clone(),
        (_, Value::Error(_)) => second.clone(),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(*b)),
        (Value::Int(a), Value::Float(b)) => Value::Float(*a as f64 - b),
        (Value::Float(a), Value::Int(b)) => Value::Float(a - *b as f64),
        (Value::Float(a), Value::Float(b)) => Value::Float(a - b),
        (Value::Int(_) | Value::Float(_), other) | (other, _) => {
            EvalError::type_error(other.clone(), &["int", "float"]).into()
        }
    };
    (env.clone(), result)
}

use extract_core::{Atom, Env, EvalError, Ident, List, Value};
use extract_eval::{eval, eval_all};

pub fn register(env: &Env) {
    let Some(module) = env.add_module(Atom::new("String")) else {
        return;
    };

    module.declare(
        Ident::new("to_upper"),
        Value::native("String.to_upper", |env, args| {
            map_string(env, args, str::to_uppercase)
        }),
    );
    module.declare(
        Ident::new("to_lower"),
        Value::native("String.to_lower", |env, args| {
            map_string(env, args, str::to_lowercase)
        }),
    );
    module.declare(
        Ident::new("format"),
        Value::native("String.format", format),
    );
}

/// Evaluate a single string argument and apply `f` to it.
fn map_string(env: &Env, args: &List, f: impl Fn(&str) -> String) -> (Env, Value) {
    if args.len() != 1 {
        return (env.clone(), EvalError::arity(args.len(), 1).into());
    }
    let Some(expr) = args.head() else {
        return (env.clone(), EvalError::arity(0, 1).into());
    };

    let (_, val) = eval(env, expr, &List::nil());
    let result = match val {
        Value::Str(s) => Value::string(f(&s)),
        Value::Error(_) => val,
        other => EvalError::type_error(other, &["string"]).into(),
    };
    (env.clone(), result)
}

/// Printf-style formatting driven by the format string. `%v` and `%s`
/// render any value, `%d` wants an integer, `%f` a number, `%%` is a
/// literal percent sign.
fn format(env: &Env, args: &List) -> (Env, Value) {
    let Some(expr) = args.head() else {
        return (env.clone(), EvalError::arity(0, -1).into());
    };

    let (_, fmt) = eval(env, expr, &List::nil());
    let fmt = match fmt {
        Value::Str(s) => s,
        Value::Error(_) => return (env.clone(), fmt),
        other => {
            return (
                env.clone(),
                EvalError::type_error(other, &["string"]).into(),
            );
        }
    };

    let (_, verbs) = eval_all(env, &args.tail());
    for verb in &verbs {
        if verb.is_error() {
            return (env.clone(), verb.clone());
        }
    }

    let result = match apply_verbs(&fmt, &verbs, args.len()) {
        Ok(s) => Value::string(s),
        Err(e) => e.into(),
    };
    (env.clone(), result)
}

fn apply_verbs(fmt: &str, verbs: &List, num_args: usize) -> Result<String, EvalError> {
    let mut out = String::with_capacity(fmt.len());
    let mut rest = verbs.clone();
    let mut chars = fmt.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let verb = chars
            .next()
            .ok_or_else(|| EvalError::eval("format string ends inside a verb"))?;
        if verb == '%' {
            out.push('%');
            continue;
        }

        let Some(arg) = rest.head().cloned() else {
            return Err(EvalError::arity(num_args, -1));
        };
        rest = rest.tail();

        match verb {
            // Strings render bare; everything else uses its printed form.
            'v' | 's' => match &arg {
                Value::Str(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            },
            'd' => match arg {
                Value::Int(n) => out.push_str(&n.to_string()),
                other => return Err(EvalError::type_error(other, &["int"])),
            },
            'f' => match arg {
                Value::Float(n) => out.push_str(&n.to_string()),
                Value::Int(n) => out.push_str(&(n as f64).to_string()),
                other => return Err(EvalError::type_error(other, &["float", "int"])),
            },
            verb => return Err(EvalError::eval(format!("unknown format verb %{verb}"))),
        }
    }
    Ok(out)
}

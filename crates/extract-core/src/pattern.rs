use crate::env::Env;
use crate::error::EvalError;
use crate::list::List;
use crate::value::{Ident, Value};

/// A compiled pattern: a tree of matchers produced once per `def`/`func`
/// variant and reused on every call.
#[derive(Debug, Clone)]
pub struct Pattern {
    root: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// The input must equal this value. Covers literals and pinned
    /// identifiers, whose value is captured at compile time.
    Literal(Value),
    /// Bind the input to this name in the match environment.
    Bind(Ident),
    /// The input must be a list of exactly this arity; children match
    /// positionally.
    Sequence(Vec<Matcher>),
}

impl Pattern {
    /// Compile `format` against `env`. The env is only consulted for
    /// pinned identifiers, which are resolved now rather than at match
    /// time.
    pub fn compile(env: &Env, format: &Value) -> Result<Pattern, EvalError> {
        Ok(Pattern {
            root: compile(env, format)?,
        })
    }

    /// A pattern matching only an empty argument list.
    pub fn empty() -> Pattern {
        Pattern {
            root: Matcher::Sequence(Vec::new()),
        }
    }

    /// Match `val` against the pattern, extending `env` with one binding
    /// per bind matcher. Returns the extended env on success.
    pub fn matches(&self, env: &Env, val: &Value) -> Option<Env> {
        self.root.matches(env, val)
    }
}

fn compile(env: &Env, format: &Value) -> Result<Matcher, EvalError> {
    match format {
        Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::Atom(_) => {
            Ok(Matcher::Literal(format.clone()))
        }
        Value::Ident(id) => Ok(Matcher::Bind(*id)),
        Value::Pinned(id) => match env.lookup(*id) {
            Some(val) => Ok(Matcher::Literal(val)),
            None => Err(EvalError::Name(*id)),
        },
        Value::Call(call) => compile_sequence(env, call.items()),
        Value::List(list) => compile_sequence(env, list),
        other => Err(EvalError::eval(format!(
            "unexpected type {} in pattern",
            other.type_name(),
        ))),
    }
}

fn compile_sequence(env: &Env, items: &List) -> Result<Matcher, EvalError> {
    let mut matchers = Vec::with_capacity(items.len());
    for item in items {
        matchers.push(compile(env, item)?);
    }
    Ok(Matcher::Sequence(matchers))
}

impl Matcher {
    fn matches(&self, env: &Env, val: &Value) -> Option<Env> {
        match self {
            Matcher::Literal(lit) => (lit == val).then(|| env.clone()),
            Matcher::Bind(id) => Some(env.bind(*id, val.clone())),
            Matcher::Sequence(matchers) => {
                let Value::List(list) = val else { return None };
                if list.len() != matchers.len() {
                    return None;
                }
                let mut env = env.clone();
                for (matcher, item) in matchers.iter().zip(list) {
                    env = matcher.matches(&env, item)?;
                }
                Some(env)
            }
        }
    }
}

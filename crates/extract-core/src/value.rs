use std::fmt;
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard};

use lasso::{Spur, ThreadedRodeo};

use crate::env::Env;
use crate::error::EvalError;
use crate::list::List;
use crate::pattern::Pattern;

// ── String interning ──────────────────────────────────────────────

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Intern a string, returning a Spur key. The pool is process-wide and
/// append-only.
pub fn intern(s: &str) -> Spur {
    INTERNER.get_or_intern(s)
}

/// Resolve a Spur key back to its string.
pub fn resolve(spur: Spur) -> &'static str {
    INTERNER.resolve(&spur)
}

/// An interned atom. Two atoms made from equal strings share the same
/// intern handle, so equality and hashing are O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom(Spur);

impl Atom {
    pub fn new(name: &str) -> Self {
        Atom(intern(name))
    }

    pub fn as_str(&self) -> &'static str {
        resolve(self.0)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.as_str();
        if is_ident_shaped(name) {
            write!(f, ":{name}")
        } else {
            write!(f, ":\"{}\"", EscapeString(name))
        }
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({})", self.as_str())
    }
}

/// An interned identifier name. Same interning discipline as [`Atom`]
/// but a distinct type: an identifier names a binding, an atom is data.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident(Spur);

impl Ident {
    pub fn new(name: &str) -> Self {
        Ident(intern(name))
    }

    pub fn as_str(&self) -> &'static str {
        resolve(self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({})", self.as_str())
    }
}

/// True if `name` scans back as a single identifier token.
fn is_ident_shaped(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let mut rest = chars.peekable();
    while let Some(c) = rest.next() {
        match c {
            '_' => {}
            '?' | '!' => return rest.peek().is_none(),
            c if c.is_ascii_alphanumeric() => {}
            _ => return false,
        }
    }
    true
}

// ── The value universe ────────────────────────────────────────────

/// The core Value type for all Extract data. Expressions produced by the
/// parser and results produced by the evaluator are both made of these.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(Arc<String>),
    Atom(Atom),
    Ident(Ident),
    /// A data list. Evaluates to itself.
    List(List),
    /// A list tagged "apply the head to the tail".
    Call(Call),
    /// A module reference, `module.name`.
    Ref(Arc<Ref>),
    /// A pinned identifier, `\name`. Only legal inside patterns.
    Pinned(Ident),
    /// A user-defined multi-variant function.
    Func(Arc<Func>),
    /// A host callback.
    Native(Arc<NativeFn>),
    /// A first-class error. Evaluation returns these instead of unwinding.
    Error(EvalError),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::Str(Arc::new(s.into()))
    }

    pub fn atom(name: &str) -> Value {
        Value::Atom(Atom::new(name))
    }

    pub fn ident(name: &str) -> Value {
        Value::Ident(Ident::new(name))
    }

    /// The empty list.
    pub fn nil() -> Value {
        Value::List(List::nil())
    }

    pub fn list(vals: impl IntoIterator<Item = Value>) -> Value {
        Value::List(vals.into_iter().collect())
    }

    pub fn call(vals: impl IntoIterator<Item = Value>) -> Value {
        Value::Call(Call(vals.into_iter().collect()))
    }

    pub fn reference(module: Value, name: Ident) -> Value {
        Value::Ref(Arc::new(Ref { module, name }))
    }

    pub fn native(
        name: impl Into<String>,
        f: impl Fn(&Env, &List) -> (Env, Value) + Send + Sync + 'static,
    ) -> Value {
        Value::Native(Arc::new(NativeFn::new(name, f)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Atom(_) => "atom",
            Value::Ident(_) => "ident",
            Value::List(_) => "list",
            Value::Call(_) => "call",
            Value::Ref(_) => "ref",
            Value::Pinned(_) => "pinned ident",
            Value::Func(_) => "function",
            Value::Native(_) => "native function",
            Value::Error(_) => "error",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<Atom> {
        match self {
            Value::Atom(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<Ident> {
        match self {
            Value::Ident(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&EvalError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Ident(a), Value::Ident(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Call(a), Value::Call(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a.module == b.module && a.name == b.name,
            (Value::Pinned(a), Value::Pinned(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<EvalError> for Value {
    fn from(e: EvalError) -> Value {
        Value::Error(e)
    }
}

// ── Display ───────────────────────────────────────────────────────

/// Wraps a string so that Display re-applies the scanner's escapes.
struct EscapeString<'a>(&'a str);

impl fmt::Display for EscapeString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                c => fmt::Write::write_char(f, c)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{n:.1}")
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Str(s) => write!(f, "\"{}\"", EscapeString(s)),
            Value::Atom(a) => write!(f, "{a}"),
            Value::Ident(id) => write!(f, "{id}"),
            Value::List(list) => write!(f, "{list}"),
            Value::Call(call) => write!(f, "{}", call.items()),
            Value::Ref(r) => write!(f, "{}.{}", r.module, r.name),
            Value::Pinned(id) => write!(f, "\\{id}"),
            Value::Func(func) => write!(f, "{func:?}"),
            Value::Native(native) => write!(f, "{native:?}"),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}

// ── Calls and refs ────────────────────────────────────────────────

/// A list tagged as a call expression. The parser produces one for every
/// parenthesized form; plain data lists only arise at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Call(pub List);

impl Call {
    pub fn items(&self) -> &List {
        &self.0
    }
}

/// A module reference expression. `module` is the expression to the left
/// of the dot and must evaluate to an atom naming a registered module.
#[derive(Debug, Clone)]
pub struct Ref {
    pub module: Value,
    pub name: Ident,
}

// ── Functions ─────────────────────────────────────────────────────

/// One (pattern, body) clause of a user function.
pub struct FuncVariant {
    pub pattern: Pattern,
    pub body: List,
}

/// A user-defined function: a name, the environment captured at
/// definition time, and an ordered list of variants tried in source
/// order at call time. `def` appends variants after construction, so the
/// list sits behind a lock; calls only ever read it.
pub struct Func {
    name: Ident,
    env: Env,
    variants: RwLock<Vec<FuncVariant>>,
}

impl Func {
    pub fn new(env: Env, name: Ident, pattern: Pattern, body: List) -> Arc<Func> {
        Arc::new(Func {
            name,
            env,
            variants: RwLock::new(vec![FuncVariant { pattern, body }]),
        })
    }

    pub fn name(&self) -> Ident {
        self.name
    }

    /// The environment the function closes over.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn variants(&self) -> RwLockReadGuard<'_, Vec<FuncVariant>> {
        self.variants.read().unwrap()
    }

    pub fn add_variant(&self, pattern: Pattern, body: List) {
        self.variants
            .write()
            .unwrap()
            .push(FuncVariant { pattern, body });
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<func {}>", self.name)
    }
}

/// A host callback. Receives the caller's environment and the
/// UNEVALUATED argument list and decides for itself what to evaluate.
pub struct NativeFn {
    pub name: String,
    pub func: Box<dyn Fn(&Env, &List) -> (Env, Value) + Send + Sync>,
}

impl NativeFn {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&Env, &List) -> (Env, Value) + Send + Sync + 'static,
    ) -> Self {
        NativeFn {
            name: name.into(),
            func: Box::new(f),
        }
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native-fn {}>", self.name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(v: impl Hash) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn atom_interning() {
        let a = Atom::new("example");
        let b = Atom::new("example");
        let c = Atom::new("other");
        assert_eq!(a, b);
        assert_eq!(hash_of(a), hash_of(b));
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "example");
    }

    #[test]
    fn atom_and_ident_are_distinct() {
        assert_ne!(Value::atom("x"), Value::ident("x"));
    }

    #[test]
    fn equality() {
        assert_eq!(Value::Int(42), Value::Int(42));
        assert_ne!(Value::Int(42), Value::Int(43));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::string("a"), Value::string("a"));
        assert_eq!(
            Value::list([Value::Int(1), Value::Int(2)]),
            Value::list([Value::Int(1), Value::Int(2)]),
        );
        assert_ne!(
            Value::list([Value::Int(1)]),
            Value::list([Value::Int(1), Value::Int(2)]),
        );
    }

    #[test]
    fn display_round_trips_literal_syntax() {
        assert_eq!(Value::Int(30).to_string(), "30");
        assert_eq!(Value::Float(1.2).to_string(), "1.2");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::string("a \"b\"\n").to_string(), "\"a \\\"b\\\"\\n\"");
        assert_eq!(Value::atom("test2").to_string(), ":test2");
        assert_eq!(Value::atom("with space").to_string(), ":\"with space\"");
        assert_eq!(Value::ident("push").to_string(), "push");
        assert_eq!(Value::Pinned(Ident::new("x")).to_string(), "\\x");
        assert_eq!(
            Value::reference(Value::atom("IO"), Ident::new("println")).to_string(),
            ":IO.println",
        );
        assert_eq!(
            Value::call([Value::ident("add"), Value::Int(1), Value::Int(2)]).to_string(),
            "(add 1 2)",
        );
    }

    #[test]
    fn ident_shape() {
        assert!(is_ident_shaped("foo"));
        assert!(is_ident_shaped("_foo9"));
        assert!(is_ident_shaped("empty?"));
        assert!(is_ident_shaped("Test3"));
        assert!(!is_ident_shaped(""));
        assert!(!is_ident_shaped("9lives"));
        assert!(!is_ident_shaped("has space"));
        assert!(!is_ident_shaped("mid?dle"));
    }
}

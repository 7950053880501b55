//! Extract — a dynamically typed, Lisp-shaped scripting language.
//!
//! This crate is the embedding surface: construct a base environment
//! with [`new`], parse source text with [`parse`], and evaluate the
//! resulting expressions with [`run`].
//!
//! ```
//! let env = extract::new();
//! let exprs = extract::parse(r#"(String.to_upper "test")"#).unwrap();
//! let (_, result) = extract::run(&env, &exprs);
//! assert_eq!(result, extract::Value::string("TEST"));
//! ```
//!
//! Evaluation errors are first-class values: `run` returns a
//! [`Value::Error`] rather than an `Err`, and only the reader reports
//! failures through `Result`.

pub use extract_core::{
    Atom, Call, Env, EvalError, Func, Ident, List, Module, NativeFn, Pattern, ReadError, Ref,
    Value,
};
pub use extract_eval::{eval, eval_all, run};
pub use extract_reader::{parse, Parser, Scanner};

/// Construct a base environment: the kernel forms bound in the locals
/// chain and the standard library registered as modules.
pub fn new() -> Env {
    let env = extract_eval::install_kernel(&Env::new());
    extract_stdlib::register_stdlib(&env);
    env
}

/// Parse and run `src` in one step. Reader errors come back as `Err`;
/// evaluation errors are ordinary error values in the result.
pub fn run_str(env: &Env, src: &str) -> Result<(Env, Value), ReadError> {
    let exprs = parse(src)?;
    Ok(run(env, &exprs))
}

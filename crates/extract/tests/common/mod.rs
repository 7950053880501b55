use extract::{EvalError, Value};

/// Run a script in a fresh base environment and return its result,
/// failing the test on reader errors.
pub fn run_script(src: &str) -> Value {
    let env = extract::new();
    let (_, result) = extract::run_str(&env, src)
        .unwrap_or_else(|e| panic!("failed to read `{src}`: {e}"));
    result
}

/// Run a script and expect a successful (non-error) result.
pub fn run_ok(src: &str) -> Value {
    let result = run_script(src);
    if let Value::Error(e) = &result {
        panic!("script `{src}` returned an error: {e}");
    }
    result
}

/// Run a script and expect an error value.
#[allow(dead_code)]
pub fn run_err(src: &str) -> EvalError {
    match run_script(src) {
        Value::Error(e) => e,
        other => panic!("script `{src}` should have errored, got {other}"),
    }
}

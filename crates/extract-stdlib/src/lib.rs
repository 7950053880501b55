mod string;

use extract_core::Env;

/// Register every standard-library module with the env's registry.
pub fn register_stdlib(env: &Env) {
    string::register(env);
}

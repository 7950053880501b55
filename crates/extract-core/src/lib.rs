pub mod env;
pub mod error;
pub mod list;
pub mod pattern;
pub mod value;

pub use env::{Env, Module, ModuleRegistry};
pub use error::{EvalError, ReadError};
pub use lasso::Spur;
pub use list::List;
pub use pattern::Pattern;
pub use value::{intern, resolve, Atom, Call, Func, FuncVariant, Ident, NativeFn, Ref, Value};

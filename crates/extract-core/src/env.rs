use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::value::{Atom, Ident, Value};

/// The lexical environment: a handle on the shared module registry, an
/// optional current module, and a persistent chain of local bindings.
/// `bind` never mutates; it returns a new Env sharing the old chain as
/// its tail, so captured environments stay valid forever.
#[derive(Clone)]
pub struct Env {
    registry: Arc<ModuleRegistry>,
    current_module: Option<Arc<Module>>,
    locals: Locals,
}

impl Env {
    /// An environment with a fresh, empty module registry.
    pub fn new() -> Env {
        Env {
            registry: Arc::new(ModuleRegistry::default()),
            current_module: None,
            locals: Locals::default(),
        }
    }

    /// Return a new Env with `name` bound to `val`. The binding shadows
    /// any earlier binding of the same name.
    pub fn bind(&self, name: Ident, val: Value) -> Env {
        let mut env = self.clone();
        env.locals = env.locals.push(Binding::Local(name, val));
        env
    }

    /// Scan the locals chain from the most recent binding outward. When
    /// the scan crosses the current-module boundary, the module's
    /// declarations are consulted in place, so module-level names are in
    /// scope inside module code without shadowing later locals.
    pub fn lookup(&self, name: Ident) -> Option<Value> {
        let mut node = self.locals.node.as_deref();
        while let Some(n) = node {
            match &n.binding {
                Binding::Local(id, val) if *id == name => return Some(val.clone()),
                Binding::Local(..) => {}
                Binding::ModuleBoundary => {
                    if let Some(m) = &self.current_module {
                        if let Some(val) = m.lookup(name) {
                            return Some(val);
                        }
                    }
                }
            }
            node = n.next.node.as_deref();
        }
        None
    }

    /// Return a new Env with `module` installed as the current module
    /// and a boundary marker pushed onto the locals chain.
    pub fn with_current_module(&self, module: Arc<Module>) -> Env {
        let mut env = self.clone();
        env.current_module = Some(module);
        env.locals = env.locals.push(Binding::ModuleBoundary);
        env
    }

    pub fn current_module(&self) -> Option<&Arc<Module>> {
        self.current_module.as_ref()
    }

    /// Declare a new module. Returns `None` if a module with that name
    /// already exists; the caller turns that into a redeclaration error.
    pub fn add_module(&self, name: Atom) -> Option<Arc<Module>> {
        self.registry.add(name)
    }

    pub fn get_module(&self, name: Atom) -> Option<Arc<Module>> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Every binding visible from this Env, innermost first, with the
    /// current module's declarations interpolated at the boundary.
    pub fn bindings(&self) -> impl Iterator<Item = (Ident, Value)> + '_ {
        let mut out = Vec::new();
        let mut node = self.locals.node.as_deref();
        while let Some(n) = node {
            match &n.binding {
                Binding::Local(id, val) => out.push((*id, val.clone())),
                Binding::ModuleBoundary => {
                    if let Some(m) = &self.current_module {
                        out.extend(m.decls());
                    }
                }
            }
            node = n.next.node.as_deref();
        }
        out.into_iter()
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field(
                "current_module",
                &self.current_module.as_ref().map(|m| m.name()),
            )
            .field("locals", &self.locals.node.as_deref().map_or(0, |n| n.len))
            .finish()
    }
}

enum Binding {
    Local(Ident, Value),
    /// Marks where the current module's declarations join the scan.
    ModuleBoundary,
}

#[derive(Clone, Default)]
struct Locals {
    node: Option<Arc<LocalNode>>,
}

struct LocalNode {
    binding: Binding,
    next: Locals,
    len: usize,
}

impl Locals {
    fn push(&self, binding: Binding) -> Locals {
        Locals {
            node: Some(Arc::new(LocalNode {
                binding,
                next: self.clone(),
                len: self.node.as_deref().map_or(0, |n| n.len) + 1,
            })),
        }
    }
}

/// The shared module registry. May be read and written from several
/// evaluator instances at once; `add` is an atomic load-or-store.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: DashMap<Atom, Arc<Module>>,
}

impl ModuleRegistry {
    pub fn add(&self, name: Atom) -> Option<Arc<Module>> {
        match self.modules.entry(name) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let module = Arc::new(Module::new(name));
                slot.insert(module.clone());
                Some(module)
            }
        }
    }

    pub fn get(&self, name: Atom) -> Option<Arc<Module>> {
        self.modules.get(&name).map(|m| m.value().clone())
    }
}

/// A named table of declarations. Declarations are written while the
/// module is being defined and only read afterwards.
pub struct Module {
    name: Atom,
    decls: DashMap<Ident, Value>,
}

impl Module {
    fn new(name: Atom) -> Module {
        Module {
            name,
            decls: DashMap::new(),
        }
    }

    pub fn name(&self) -> Atom {
        self.name
    }

    pub fn lookup(&self, name: Ident) -> Option<Value> {
        self.decls.get(&name).map(|v| v.value().clone())
    }

    pub fn declare(&self, name: Ident, val: Value) {
        self.decls.insert(name, val);
    }

    /// Snapshot of the declaration table.
    pub fn decls(&self) -> Vec<(Ident, Value)> {
        self.decls
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<module {}>", self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_lookup() {
        let env = Env::new();
        let x = Ident::new("x");
        let bound = env.bind(x, Value::Int(42));
        assert_eq!(bound.lookup(x), Some(Value::Int(42)));
        assert_eq!(env.lookup(x), None);
    }

    #[test]
    fn innermost_binding_wins() {
        let x = Ident::new("x");
        let env = Env::new().bind(x, Value::Int(1)).bind(x, Value::Int(2));
        assert_eq!(env.lookup(x), Some(Value::Int(2)));
    }

    #[test]
    fn module_registry_rejects_duplicates() {
        let env = Env::new();
        let name = Atom::new("Dup");
        assert!(env.add_module(name).is_some());
        assert!(env.add_module(name).is_none());
        assert!(env.get_module(name).is_some());
        assert!(env.get_module(Atom::new("Missing")).is_none());
    }

    #[test]
    fn registry_is_shared_across_binds() {
        let env = Env::new();
        let bound = env.bind(Ident::new("x"), Value::Int(1));
        let name = Atom::new("Shared");
        bound.add_module(name);
        assert!(env.get_module(name).is_some());
    }

    #[test]
    fn module_decls_visible_past_boundary() {
        let env = Env::new();
        let module = env.add_module(Atom::new("M")).unwrap();
        let decl = Ident::new("declared");
        module.declare(decl, Value::Int(7));

        let menv = env.with_current_module(module);
        assert_eq!(menv.lookup(decl), Some(Value::Int(7)));

        // Locals pushed after the boundary shadow module declarations.
        let shadowed = menv.bind(decl, Value::Int(8));
        assert_eq!(shadowed.lookup(decl), Some(Value::Int(8)));

        // The boundary-free original still sees nothing.
        assert_eq!(env.lookup(decl), None);
    }

    #[test]
    fn bindings_iterates_innermost_first() {
        let x = Ident::new("x");
        let y = Ident::new("y");
        let env = Env::new().bind(x, Value::Int(1)).bind(y, Value::Int(2));
        let names: Vec<Ident> = env.bindings().map(|(id, _)| id).collect();
        assert_eq!(names, [y, x]);
    }
}

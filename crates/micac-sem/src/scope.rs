//! Scope tree for name resolution.
//!
//! Scopes live in an arena; `parent` is an index, not a back-pointer.
//! Scope ids are the arena indices, so they are unique per compile and
//! reset with every new tree. Variables and functions share one namespace
//! within a scope.

use micac_par::{Storage, Ty};
use micac_util::{Idx, IndexVec, Symbol};
use rustc_hash::FxHashMap;

/// Scope id, unique within one compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl Idx for ScopeId {
    fn from_usize(idx: usize) -> Self {
        ScopeId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Function parameter signature.
#[derive(Debug, Clone)]
pub struct ParamSig {
    pub ty: Ty,
    pub name: Symbol,
}

/// What a name is bound to.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Variable {
        ty: Ty,
        storage: Storage,
        scope_id: u32,
    },
    Function {
        return_ty: Ty,
        params: Vec<ParamSig>,
    },
}

/// A single scope.
#[derive(Debug)]
pub struct ScopeData {
    pub bindings: FxHashMap<Symbol, SymbolKind>,
    pub parent: Option<ScopeId>,
}

/// Scope tree rooted at the global scope.
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, ScopeData>,
    current: ScopeId,
}

impl ScopeTree {
    /// Create a new tree with only the global scope.
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(ScopeData {
            bindings: FxHashMap::default(),
            parent: None,
        });
        Self {
            scopes,
            current: root,
        }
    }

    /// Enter a new child scope, returning its id.
    pub fn enter(&mut self) -> ScopeId {
        let child = self.scopes.push(ScopeData {
            bindings: FxHashMap::default(),
            parent: Some(self.current),
        });
        self.current = child;
        child
    }

    /// Exit to the parent scope.
    pub fn exit(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Id of the current scope.
    pub fn current_id(&self) -> ScopeId {
        self.current
    }

    /// Storage class for a variable defined here: the global scope backs
    /// variables with `.data` symbols, every other scope with stack slots.
    pub fn current_storage(&self) -> Storage {
        if self.scopes[self.current].parent.is_none() {
            Storage::Global
        } else {
            Storage::Local
        }
    }

    /// True in the global scope.
    pub fn at_global_scope(&self) -> bool {
        self.scopes[self.current].parent.is_none()
    }

    /// Binding for `name` in the current scope only, if any.
    pub fn bound_in_current(&self, name: Symbol) -> Option<&SymbolKind> {
        self.scopes[self.current].bindings.get(&name)
    }

    /// Bind `name` in the current scope. Returns `false` when the name is
    /// already taken here.
    pub fn bind(&mut self, name: Symbol, kind: SymbolKind) -> bool {
        let bindings = &mut self.scopes[self.current].bindings;
        if bindings.contains_key(&name) {
            return false;
        }
        bindings.insert(name, kind);
        true
    }

    /// Resolve a variable through the scope chain.
    pub fn resolve_variable(&self, name: Symbol) -> Option<(Ty, Storage, u32)> {
        let mut scope = self.current;
        loop {
            match self.scopes[scope].bindings.get(&name) {
                Some(SymbolKind::Variable {
                    ty,
                    storage,
                    scope_id,
                }) => return Some((*ty, *storage, *scope_id)),
                _ => match self.scopes[scope].parent {
                    Some(parent) => scope = parent,
                    None => return None,
                },
            }
        }
    }

    /// Resolve a function through the scope chain.
    pub fn resolve_function(&self, name: Symbol) -> Option<(Ty, &[ParamSig])> {
        let mut scope = self.current;
        loop {
            match self.scopes[scope].bindings.get(&name) {
                Some(SymbolKind::Function { return_ty, params }) => {
                    return Some((*return_ty, params))
                }
                _ => match self.scopes[scope].parent {
                    Some(parent) => scope = parent,
                    None => return None,
                },
            }
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(ty: Ty, storage: Storage, scope_id: u32) -> SymbolKind {
        SymbolKind::Variable {
            ty,
            storage,
            scope_id,
        }
    }

    #[test]
    fn test_scope_ids_are_sequential() {
        let mut tree = ScopeTree::new();
        assert_eq!(tree.current_id(), ScopeId(0));
        assert_eq!(tree.enter(), ScopeId(1));
        assert_eq!(tree.enter(), ScopeId(2));
        tree.exit();
        tree.exit();
        // Sibling scope gets a fresh id, not a recycled one.
        assert_eq!(tree.enter(), ScopeId(3));
    }

    #[test]
    fn test_resolution_walks_parents() {
        let mut tree = ScopeTree::new();
        let x = Symbol::intern("x");
        assert!(tree.bind(x, var(Ty::Int, Storage::Global, 0)));
        tree.enter();
        tree.enter();
        let (ty, storage, scope_id) = tree.resolve_variable(x).unwrap();
        assert_eq!(ty, Ty::Int);
        assert_eq!(storage, Storage::Global);
        assert_eq!(scope_id, 0);
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut tree = ScopeTree::new();
        let x = Symbol::intern("x");
        tree.bind(x, var(Ty::Int, Storage::Global, 0));
        let inner = tree.enter();
        tree.bind(x, var(Ty::Bool, Storage::Local, inner.0));
        let (ty, storage, scope_id) = tree.resolve_variable(x).unwrap();
        assert_eq!(ty, Ty::Bool);
        assert_eq!(storage, Storage::Local);
        assert_eq!(scope_id, inner.0);
    }

    #[test]
    fn test_same_scope_collision() {
        let mut tree = ScopeTree::new();
        let x = Symbol::intern("x");
        assert!(tree.bind(x, var(Ty::Int, Storage::Global, 0)));
        assert!(!tree.bind(x, var(Ty::Int, Storage::Global, 0)));
    }

    #[test]
    fn test_storage_class_by_depth() {
        let mut tree = ScopeTree::new();
        assert_eq!(tree.current_storage(), Storage::Global);
        tree.enter();
        assert_eq!(tree.current_storage(), Storage::Local);
    }

    #[test]
    fn test_exit_after_sibling_does_not_see_bindings() {
        let mut tree = ScopeTree::new();
        let x = Symbol::intern("x");
        tree.enter();
        tree.bind(x, var(Ty::Int, Storage::Local, 1));
        tree.exit();
        tree.enter();
        assert!(tree.resolve_variable(x).is_none());
    }
}

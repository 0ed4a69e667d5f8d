//! Objects and lexical scopes.

use std::collections::HashMap;

use crate::define_entity;
use crate::entity::PrimaryMap;
use crate::sema::types::TypeId;
use crate::syntax::ast::NodeId;
use crate::syntax::token::Pos;

define_entity!(ObjId);
define_entity!(ScopeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    Var,
    Const,
    TypeName,
    Func,
    Label,
    Package,
    Builtin,
    Nil,
}

/// One declared entity. Identity (the `ObjId`) is what the rewriter's
/// safety checks compare; everything else is bookkeeping.
#[derive(Debug, Clone)]
pub struct Obj {
    pub name: String,
    pub kind: ObjKind,
    /// Declaration position; `Pos::NONE` for predeclared objects.
    pub pos: Pos,
    pub ty: TypeId,
    /// The identifier node that declared this object, when there is one.
    pub node: Option<NodeId>,
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    names: HashMap<String, ObjId>,
    /// Non-block scopes (universe, package, file) skip the
    /// declared-before-use position check during lookup.
    pub is_block: bool,
}

#[derive(Debug, Default)]
pub struct Scopes {
    arena: PrimaryMap<ScopeId, Scope>,
}

impl Scopes {
    pub fn new() -> Scopes {
        Scopes {
            arena: PrimaryMap::new(),
        }
    }

    pub fn push(&mut self, parent: Option<ScopeId>, is_block: bool) -> ScopeId {
        self.arena.push(Scope {
            parent,
            names: HashMap::new(),
            is_block,
        })
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }

    /// Declare `obj` as `name`; returns the previous object if the name
    /// was already bound in this scope.
    pub fn declare(&mut self, scope: ScopeId, name: &str, obj: ObjId) -> Option<ObjId> {
        self.arena[scope].names.insert(name.to_string(), obj)
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<ObjId> {
        self.arena[scope].names.get(name).copied()
    }

    /// Walk the scope chain outward. `at` filters candidates: block-scope
    /// objects must be declared before the lookup position.
    pub fn lookup_at(
        &self,
        objs: &PrimaryMap<ObjId, Obj>,
        mut scope: ScopeId,
        name: &str,
        pos: Pos,
    ) -> Option<ObjId> {
        loop {
            let s = &self.arena[scope];
            if let Some(&obj) = s.names.get(name) {
                if !s.is_block || objs[obj].pos < pos {
                    return Some(obj);
                }
            }
            scope = s.parent?;
        }
    }
}

//! Best-effort name resolution and type inference for one package.
//!
//! The checker exists to answer the four questions the rewrite passes ask:
//! which object an identifier resolves to (and whether it still resolves to
//! the same one somewhere else), whether an address-of operand's receiver
//! is a pointer or slice, whether an initializer's type defaults to the
//! declared type, and whether an expression is a `(*T)(nil)` or `T{}`
//! initializer. Everything it cannot see — imported types, untracked
//! signatures — degrades to `Unknown`, never to a wrong answer.
//!
//! Unresolved local identifiers and redeclarations are recorded as checker
//! errors; the package still gets full scope information, but passes that
//! need trustworthy object identity refuse to run.

use std::collections::HashMap;

use crate::entity::PrimaryMap;
use crate::sema::object::{Obj, ObjId, ObjKind, ScopeId, Scopes};
use crate::sema::types::{BasicKind, TypeArena, TypeId, TypeKind};
use crate::syntax::ast::{AssignTok, Ast, DeclTok, File, LitKind, NodeId, NodeKind, UnOp};
use crate::syntax::token::{FileSet, Pos};

/// Resolution and inference results for one package, one iteration.
#[derive(Debug)]
pub struct TypeInfo {
    pub objs: PrimaryMap<ObjId, Obj>,
    pub scopes: Scopes,
    pub types: TypeArena,
    /// Identifier node → object it declares.
    pub defs: HashMap<NodeId, ObjId>,
    /// Identifier node → object it refers to.
    pub uses: HashMap<NodeId, ObjId>,
    /// Node → scope it opens.
    pub node_scope: HashMap<NodeId, ScopeId>,
    pub expr_types: HashMap<NodeId, TypeId>,
    pub universe: ScopeId,
    pub package: ScopeId,
    pub errors: Vec<String>,
    nil_obj: Option<ObjId>,
}

impl TypeInfo {
    /// The object an identifier resolves to, definition or use.
    pub fn obj_of(&self, ident: NodeId) -> Option<ObjId> {
        self.uses.get(&ident).or_else(|| self.defs.get(&ident)).copied()
    }

    pub fn type_of(&self, expr: NodeId) -> Option<TypeId> {
        self.expr_types.get(&expr).copied()
    }

    /// True when `id` is the predeclared `nil`.
    pub fn is_nil(&self, ident: NodeId) -> bool {
        match self.uses.get(&ident) {
            Some(&obj) => Some(obj) == self.nil_obj,
            None => false,
        }
    }

    /// The object visible under `name` at `pos` inside `fn_decl`, found by
    /// walking into the deepest scope-bearing node containing `pos` and
    /// then outward through the scope chain.
    pub fn lookup_at_pos(
        &self,
        ast: &Ast,
        fn_decl: NodeId,
        pos: Pos,
        name: &str,
    ) -> Option<ObjId> {
        let (ty_node, body) = match ast.kind(fn_decl) {
            NodeKind::FuncDecl {
                ty,
                body: Some(body),
                ..
            } => (*ty, *body),
            _ => return None,
        };
        let mut scope = *self.node_scope.get(&ty_node)?;
        let mut stack = vec![body];
        while let Some(z) = stack.pop() {
            let span = ast.span(z);
            if pos < span.start || span.end <= pos {
                continue;
            }
            if let Some(&s) = self.node_scope.get(&z) {
                scope = s;
            }
            stack.extend(ast.children(z));
        }
        self.scopes.lookup_at(&self.objs, scope, name, pos)
    }

    /// The untyped-constant kind of `x` considered by itself, if it is an
    /// untyped constant expression.
    pub fn untyped_kind(&self, ast: &Ast, x: NodeId) -> Option<BasicKind> {
        use BasicKind::*;
        match ast.kind(x) {
            NodeKind::BasicLit { lit, .. } => Some(match lit {
                LitKind::Int => UntypedInt,
                LitKind::Float => UntypedFloat,
                LitKind::Rune => UntypedRune,
                LitKind::Str => UntypedStr,
            }),
            NodeKind::Ident { .. } => {
                let obj = self.obj_of(x)?;
                let o = &self.objs[obj];
                if o.kind != ObjKind::Const {
                    return None;
                }
                match self.types.basic_kind(o.ty) {
                    Some(k) if k.is_untyped() => Some(k),
                    _ => None,
                }
            }
            NodeKind::Paren { x } => self.untyped_kind(ast, *x),
            NodeKind::Unary { op, x } => {
                let k = self.untyped_kind(ast, *x)?;
                match op {
                    UnOp::Neg | UnOp::Pos | UnOp::BitNot => Some(k),
                    UnOp::Not if k == UntypedBool => Some(UntypedBool),
                    _ => None,
                }
            }
            NodeKind::Binary { op, x, y } => {
                use crate::syntax::ast::BinOp::*;
                let kx = self.untyped_kind(ast, *x)?;
                match op {
                    Eql | Neq | Lss | Leq | Gtr | Geq => {
                        self.untyped_kind(ast, *y)?;
                        Some(UntypedBool)
                    }
                    LAnd | LOr => {
                        let ky = self.untyped_kind(ast, *y)?;
                        if kx == UntypedBool && ky == UntypedBool {
                            Some(UntypedBool)
                        } else {
                            None
                        }
                    }
                    Shl | Shr => Some(kx),
                    _ => {
                        let ky = self.untyped_kind(ast, *y)?;
                        Some(wider_untyped(kx, ky)?)
                    }
                }
            }
            _ => None,
        }
    }

    /// Does `x`, considered by itself, already have the type `var_ty`?
    /// Answers the "can `=` become `:=` without changing the type" question.
    pub fn defaults_to(&self, ast: &Ast, x: NodeId, var_ty: TypeId) -> bool {
        if let Some(xt) = self.type_of(x) {
            if self.types.identical(xt, var_ty) {
                return true;
            }
        }
        if let Some(k) = self.untyped_kind(ast, x) {
            if let TypeKind::Basic(vb) = self.types.kind(var_ty) {
                return k.default_kind() == Some(*vb);
            }
        }
        false
    }
}

fn wider_untyped(a: BasicKind, b: BasicKind) -> Option<BasicKind> {
    use BasicKind::*;
    let rank = |k: BasicKind| match k {
        UntypedInt => Some(0),
        UntypedRune => Some(1),
        UntypedFloat => Some(2),
        UntypedComplex => Some(3),
        _ => None,
    };
    let (ra, rb) = (rank(a)?, rank(b)?);
    Some(if ra >= rb { a } else { b })
}

pub fn check(fset: &FileSet, ast: &Ast, files: &[File]) -> TypeInfo {
    let mut checker = Checker::new(fset, ast);
    checker.run(files);
    checker.info
}

struct Checker<'a> {
    fset: &'a FileSet,
    ast: &'a Ast,
    info: TypeInfo,
    /// Per-function label tables; a stack because function literals nest.
    labels: Vec<HashMap<String, ObjId>>,
    basic_cache: HashMap<&'static str, TypeId>,
}

impl<'a> Checker<'a> {
    fn new(fset: &'a FileSet, ast: &'a Ast) -> Checker<'a> {
        let mut scopes = Scopes::new();
        let universe = scopes.push(None, false);
        let package = scopes.push(Some(universe), false);
        Checker {
            fset,
            ast,
            info: TypeInfo {
                objs: PrimaryMap::new(),
                scopes,
                types: TypeArena::new(),
                defs: HashMap::new(),
                uses: HashMap::new(),
                node_scope: HashMap::new(),
                expr_types: HashMap::new(),
                universe,
                package,
                errors: Vec::new(),
                nil_obj: None,
            },
            labels: Vec::new(),
            basic_cache: HashMap::new(),
        }
    }

    fn error_at(&mut self, pos: Pos, msg: impl Into<String>) {
        let p = self.fset.position(pos);
        self.info
            .errors
            .push(format!("{}:{}: {}", p.file.display(), p.line, msg.into()));
    }

    fn basic(&mut self, kind: BasicKind) -> TypeId {
        let key = match kind {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::Str => "string",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedComplex => "untyped complex",
            BasicKind::UntypedStr => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        };
        if let Some(&id) = self.basic_cache.get(key) {
            return id;
        }
        let id = self.info.types.alloc(TypeKind::Basic(kind));
        self.basic_cache.insert(key, id);
        id
    }

    fn new_obj(&mut self, name: &str, kind: ObjKind, pos: Pos, ty: TypeId, node: Option<NodeId>) -> ObjId {
        self.info.objs.push(Obj {
            name: name.to_string(),
            kind,
            pos,
            ty,
            node,
        })
    }

    fn declare_universe(&mut self) {
        use BasicKind::*;
        let types = [
            ("bool", Bool),
            ("int", Int),
            ("int8", Int8),
            ("int16", Int16),
            ("int32", Int32),
            ("int64", Int64),
            ("uint", Uint),
            ("uint8", Uint8),
            ("uint16", Uint16),
            ("uint32", Uint32),
            ("uint64", Uint64),
            ("uintptr", Uintptr),
            ("float32", Float32),
            ("float64", Float64),
            ("complex64", Complex64),
            ("complex128", Complex128),
            ("string", Str),
            ("byte", Uint8),
            ("rune", Int32),
        ];
        for (name, kind) in types {
            let ty = self.basic(kind);
            let obj = self.new_obj(name, ObjKind::TypeName, Pos::NONE, ty, None);
            self.info.scopes.declare(self.info.universe, name, obj);
        }
        let err_ty = self.info.types.alloc(TypeKind::Interface);
        let err_obj = self.new_obj("error", ObjKind::TypeName, Pos::NONE, err_ty, None);
        self.info.scopes.declare(self.info.universe, "error", err_obj);

        let ub = self.basic(UntypedBool);
        for name in ["true", "false"] {
            let obj = self.new_obj(name, ObjKind::Const, Pos::NONE, ub, None);
            self.info.scopes.declare(self.info.universe, name, obj);
        }
        let ui = self.basic(UntypedInt);
        let iota = self.new_obj("iota", ObjKind::Const, Pos::NONE, ui, None);
        self.info.scopes.declare(self.info.universe, "iota", iota);

        let un = self.basic(UntypedNil);
        let nil = self.new_obj("nil", ObjKind::Nil, Pos::NONE, un, None);
        self.info.scopes.declare(self.info.universe, "nil", nil);
        self.info.nil_obj = Some(nil);

        let fn_ty = self.info.types.alloc(TypeKind::Func);
        for name in [
            "len", "cap", "append", "copy", "make", "new", "delete", "panic", "print",
            "println", "recover", "close", "complex", "real", "imag",
        ] {
            let obj = self.new_obj(name, ObjKind::Builtin, Pos::NONE, fn_ty, None);
            self.info.scopes.declare(self.info.universe, name, obj);
        }
    }

    fn run(&mut self, files: &[File]) {
        self.declare_universe();

        // Phase 1: package-level names. Type declarations first so every
        // named type exists before any type expression resolves.
        let mut type_specs = Vec::new();
        let mut value_decls = Vec::new();
        for file in files {
            for &decl in &file.decls {
                match self.ast.kind(decl) {
                    NodeKind::GenDecl {
                        tok: DeclTok::TypeDecl,
                        specs,
                    } => {
                        for &spec in specs {
                            if let NodeKind::TypeSpec { name, .. } = self.ast.kind(spec) {
                                let named = self.info.types.next_key();
                                let unknown = self.info.types.unknown();
                                let obj = self.new_obj(
                                    self.ast.ident_name(*name),
                                    ObjKind::TypeName,
                                    self.ast.pos(*name),
                                    named,
                                    Some(*name),
                                );
                                let allocated = self.info.types.alloc(TypeKind::Named {
                                    obj,
                                    underlying: unknown,
                                });
                                debug_assert_eq!(named, allocated);
                                self.declare_pkg(*name, obj);
                                type_specs.push((spec, named));
                            }
                        }
                    }
                    NodeKind::GenDecl {
                        tok: tok @ (DeclTok::Var | DeclTok::Const),
                        specs,
                    } => {
                        for &spec in specs {
                            value_decls.push((*tok, spec));
                        }
                    }
                    NodeKind::FuncDecl { recv, name, .. } => {
                        if recv.is_none() {
                            let fn_ty = self.info.types.alloc(TypeKind::Func);
                            let obj = self.new_obj(
                                self.ast.ident_name(*name),
                                ObjKind::Func,
                                self.ast.pos(*name),
                                fn_ty,
                                Some(*name),
                            );
                            self.declare_pkg(*name, obj);
                        }
                    }
                    _ => {}
                }
            }
        }

        // Phase 2: fill in named-type underlyings.
        for &(spec, named) in &type_specs {
            if let NodeKind::TypeSpec { ty, .. } = self.ast.kind(spec) {
                let underlying = self.resolve_type(*ty, self.info.package);
                let obj = match self.info.types.kind(named) {
                    TypeKind::Named { obj, .. } => *obj,
                    _ => continue,
                };
                self.info.types.set_kind(named, TypeKind::Named { obj, underlying });
            }
        }

        // Phase 3: package-level vars and consts. Names first (package
        // scope allows forward references), initializers after.
        for &(tok, spec) in &value_decls {
            self.declare_package_values(tok, spec);
        }
        for &(tok, spec) in &value_decls {
            if let NodeKind::ValueSpec { names, values, .. } = self.ast.kind(spec).clone() {
                let mut value_tys = Vec::new();
                for &v in &values {
                    value_tys.push(self.expr(v, self.info.package));
                }
                // Patch inferred types for `var a = expr` forms; consts
                // stay untyped.
                if names.len() == values.len() {
                    for (i, &name) in names.iter().enumerate() {
                        if let Some(&obj) = self.info.defs.get(&name) {
                            if self.info.types.is_unknown(self.info.objs[obj].ty) {
                                let mut t = value_tys[i];
                                if tok == DeclTok::Var {
                                    if let Some(d) = self
                                        .info
                                        .types
                                        .basic_kind(t)
                                        .and_then(|k| k.default_kind())
                                    {
                                        t = self.basic(d);
                                    }
                                }
                                self.info.objs[obj].ty = t;
                            }
                        }
                    }
                }
            }
        }

        // Phase 4: imports and function bodies, per file.
        for file in files {
            let file_scope = self.info.scopes.push(Some(self.info.package), false);
            for &decl in &file.decls {
                if let NodeKind::GenDecl {
                    tok: DeclTok::Import,
                    specs,
                } = self.ast.kind(decl)
                {
                    for &spec in specs {
                        if let NodeKind::ImportSpec { name, path } = self.ast.kind(spec) {
                            let local = match name {
                                Some(n) => self.ast.ident_name(*n).to_string(),
                                None => import_base_name(match self.ast.kind(*path) {
                                    NodeKind::BasicLit { value, .. } => value,
                                    _ => "",
                                }),
                            };
                            if local == "." || local == "_" {
                                continue;
                            }
                            let unknown = self.info.types.unknown();
                            let obj = self.new_obj(
                                &local,
                                ObjKind::Package,
                                self.ast.pos(spec),
                                unknown,
                                None,
                            );
                            self.info.scopes.declare(file_scope, &local, obj);
                        }
                    }
                }
            }
            for &decl in &file.decls {
                if let NodeKind::FuncDecl { body: Some(_), .. } = self.ast.kind(decl) {
                    self.check_func(decl, file_scope);
                }
            }
        }
    }

    fn declare_package_values(&mut self, tok: DeclTok, spec: NodeId) {
        if let NodeKind::ValueSpec { names, ty, .. } = self.ast.kind(spec).clone() {
            let declared_ty = ty.map(|t| self.resolve_type(t, self.info.package));
            let kind = if tok == DeclTok::Const {
                ObjKind::Const
            } else {
                ObjKind::Var
            };
            for name in names {
                let t = declared_ty.unwrap_or_else(|| self.info.types.unknown());
                let obj = self.new_obj(
                    self.ast.ident_name(name),
                    kind,
                    self.ast.pos(name),
                    t,
                    Some(name),
                );
                self.declare_pkg(name, obj);
            }
        }
    }

    fn declare_pkg(&mut self, name_node: NodeId, obj: ObjId) {
        let name = self.ast.ident_name(name_node).to_string();
        self.info.defs.insert(name_node, obj);
        if name == "_" {
            return;
        }
        if self
            .info
            .scopes
            .declare(self.info.package, &name, obj)
            .is_some()
        {
            let pos = self.ast.pos(name_node);
            self.error_at(pos, format!("{name} redeclared in this package"));
        }
    }

    // ── Functions and statements ───────────────────────────────────

    fn check_func(&mut self, decl: NodeId, file_scope: ScopeId) {
        let (recv, ty, body) = match self.ast.kind(decl) {
            NodeKind::FuncDecl {
                recv,
                ty,
                body: Some(body),
                ..
            } => (*recv, *ty, *body),
            _ => return,
        };
        let scope = self.info.scopes.push(Some(file_scope), true);
        self.info.node_scope.insert(ty, scope);

        if let Some(recv) = recv {
            self.declare_field_names(recv, scope);
        }
        if let NodeKind::FuncType { params, results } = self.ast.kind(ty) {
            for &f in params.clone().iter() {
                self.declare_field_names(f, scope);
            }
            for &f in results.clone().iter() {
                self.declare_field_names(f, scope);
            }
        }

        // Labels have function scope; collect them up front so forward
        // jumps resolve.
        let mut labels = HashMap::new();
        self.collect_labels(body, &mut labels);
        self.labels.push(labels);
        self.block_stmts(body, scope);
        self.labels.pop();
    }

    fn declare_field_names(&mut self, field: NodeId, scope: ScopeId) {
        if let NodeKind::Field { names, ty } = self.ast.kind(field) {
            let names = names.clone();
            let ty = *ty;
            let t = match ty {
                Some(ty) => self.resolve_type(ty, scope),
                None => self.info.types.unknown(),
            };
            for name in names {
                let text = self.ast.ident_name(name).to_string();
                if text == "_" {
                    continue;
                }
                let obj = self.new_obj(&text, ObjKind::Var, self.ast.pos(name), t, Some(name));
                self.info.defs.insert(name, obj);
                self.info.scopes.declare(scope, &text, obj);
            }
        }
    }

    fn collect_labels(&mut self, root: NodeId, labels: &mut HashMap<String, ObjId>) {
        let mut stack = vec![root];
        let mut found = Vec::new();
        while let Some(x) = stack.pop() {
            if let NodeKind::FuncLit { .. } = self.ast.kind(x) {
                continue;
            }
            if let NodeKind::Labeled { label, .. } = self.ast.kind(x) {
                found.push(*label);
            }
            stack.extend(self.ast.children(x));
        }
        for label in found {
            let name = self.ast.ident_name(label).to_string();
            let unknown = self.info.types.unknown();
            let obj = self.new_obj(&name, ObjKind::Label, self.ast.pos(label), unknown, Some(label));
            self.info.defs.insert(label, obj);
            labels.insert(name, obj);
        }
    }

    /// Resolve the statements of a `Block` node, giving it its own scope.
    fn block_stmts(&mut self, block: NodeId, parent: ScopeId) {
        let scope = self.info.scopes.push(Some(parent), true);
        self.info.node_scope.insert(block, scope);
        if let NodeKind::Block { stmts } = self.ast.kind(block) {
            for &s in stmts.clone().iter() {
                self.stmt(s, scope);
            }
        }
    }

    fn stmt(&mut self, x: NodeId, scope: ScopeId) {
        match self.ast.kind(x).clone() {
            NodeKind::DeclStmt { decl } => self.local_decl(decl, scope),
            NodeKind::Empty { .. } => {}
            // The label object itself was collected up front.
            NodeKind::Labeled { stmt, .. } => self.stmt(stmt, scope),
            NodeKind::ExprStmt { x } => {
                self.expr(x, scope);
            }
            NodeKind::Send { chan, value } => {
                self.expr(chan, scope);
                self.expr(value, scope);
            }
            NodeKind::IncDec { x, .. } => {
                self.expr(x, scope);
            }
            NodeKind::Assign { lhs, tok, rhs, .. } => {
                for &r in &rhs {
                    self.expr(r, scope);
                }
                if tok == AssignTok::Define {
                    let single = lhs.len() == 1 && rhs.len() == 1;
                    for &l in &lhs {
                        self.define_ident(l, scope, if single { Some(rhs[0]) } else { None });
                    }
                } else {
                    for &l in &lhs {
                        self.expr(l, scope);
                    }
                }
            }
            NodeKind::GoStmt { call } | NodeKind::DeferStmt { call } => {
                self.expr(call, scope);
            }
            NodeKind::Return { results } => {
                for &r in &results {
                    self.expr(r, scope);
                }
            }
            NodeKind::Branch { label, .. } => {
                if let Some(label) = label {
                    let name = self.ast.ident_name(label).to_string();
                    let obj = self.labels.last().and_then(|m| m.get(&name)).copied();
                    match obj {
                        Some(obj) => {
                            self.info.uses.insert(label, obj);
                        }
                        None => {
                            let pos = self.ast.pos(label);
                            self.error_at(pos, format!("label {name} not defined"));
                        }
                    }
                }
            }
            NodeKind::Block { .. } => self.block_stmts(x, scope),
            NodeKind::If {
                init,
                cond,
                body,
                els,
            } => {
                let s = self.info.scopes.push(Some(scope), true);
                self.info.node_scope.insert(x, s);
                if let Some(init) = init {
                    self.stmt(init, s);
                }
                self.expr(cond, s);
                self.block_stmts(body, s);
                if let Some(els) = els {
                    self.stmt(els, s);
                }
            }
            NodeKind::For {
                init,
                cond,
                post,
                body,
            } => {
                let s = self.info.scopes.push(Some(scope), true);
                self.info.node_scope.insert(x, s);
                if let Some(init) = init {
                    self.stmt(init, s);
                }
                if let Some(cond) = cond {
                    self.expr(cond, s);
                }
                if let Some(post) = post {
                    self.stmt(post, s);
                }
                self.block_stmts(body, s);
            }
            NodeKind::RangeFor {
                key,
                value,
                tok,
                x: subject,
                body,
            } => {
                let s = self.info.scopes.push(Some(scope), true);
                self.info.node_scope.insert(x, s);
                let st = self.expr(subject, s);
                let (kt, vt) = self.range_types(st);
                match tok {
                    Some(AssignTok::Define) => {
                        if let Some(key) = key {
                            self.define_ident_typed(key, s, kt);
                        }
                        if let Some(value) = value {
                            self.define_ident_typed(value, s, vt);
                        }
                    }
                    _ => {
                        if let Some(key) = key {
                            self.expr(key, s);
                        }
                        if let Some(value) = value {
                            self.expr(value, s);
                        }
                    }
                }
                self.block_stmts(body, s);
            }
            NodeKind::Switch { init, tag, cases } => {
                let s = self.info.scopes.push(Some(scope), true);
                self.info.node_scope.insert(x, s);
                if let Some(init) = init {
                    self.stmt(init, s);
                }
                if let Some(tag) = tag {
                    self.expr(tag, s);
                }
                for &case in &cases {
                    if let NodeKind::Case { values, body, .. } = self.ast.kind(case).clone() {
                        for &v in &values {
                            self.expr(v, s);
                        }
                        let cs = self.info.scopes.push(Some(s), true);
                        self.info.node_scope.insert(case, cs);
                        for &b in &body {
                            self.stmt(b, cs);
                        }
                    }
                }
            }
            NodeKind::TypeSwitch { init, assign, cases } => {
                let s = self.info.scopes.push(Some(scope), true);
                self.info.node_scope.insert(x, s);
                if let Some(init) = init {
                    self.stmt(init, s);
                }
                // `x := y.(type)` — resolve y; declare x per clause.
                let mut bind: Option<NodeId> = None;
                match self.ast.kind(assign).clone() {
                    NodeKind::Assign { lhs, rhs, .. } => {
                        if let Some(&r) = rhs.first() {
                            if let NodeKind::TypeAssert { x: subj, .. } = self.ast.kind(r) {
                                self.expr(*subj, s);
                            }
                        }
                        bind = lhs.first().copied();
                    }
                    NodeKind::ExprStmt { x: e } => {
                        if let NodeKind::TypeAssert { x: subj, .. } = self.ast.kind(e) {
                            self.expr(*subj, s);
                        }
                    }
                    _ => {}
                }
                for &case in &cases {
                    if let NodeKind::Case { values, body, .. } = self.ast.kind(case).clone() {
                        let mut clause_ty = self.info.types.unknown();
                        for &v in &values {
                            let t = self.resolve_type_or_nil(v, s);
                            if values.len() == 1 {
                                clause_ty = t;
                            }
                        }
                        let cs = self.info.scopes.push(Some(s), true);
                        self.info.node_scope.insert(case, cs);
                        if let Some(bind) = bind {
                            let name = self.ast.ident_name(bind).to_string();
                            if name != "_" {
                                let obj = self.new_obj(
                                    &name,
                                    ObjKind::Var,
                                    self.ast.pos(bind),
                                    clause_ty,
                                    Some(bind),
                                );
                                self.info.defs.entry(bind).or_insert(obj);
                                self.info.scopes.declare(cs, &name, obj);
                            }
                        }
                        for &b in &body {
                            self.stmt(b, cs);
                        }
                    }
                }
            }
            NodeKind::Select { cases } => {
                for &case in &cases {
                    if let NodeKind::Comm { comm, body, .. } = self.ast.kind(case).clone() {
                        let cs = self.info.scopes.push(Some(scope), true);
                        self.info.node_scope.insert(case, cs);
                        if let Some(comm) = comm {
                            self.stmt(comm, cs);
                        }
                        for &b in &body {
                            self.stmt(b, cs);
                        }
                    }
                }
            }
            _ => {
                // Anything else in statement position is an expression.
                if self.ast.is_expr(x) {
                    self.expr(x, scope);
                }
            }
        }
    }

    fn local_decl(&mut self, decl: NodeId, scope: ScopeId) {
        match self.ast.kind(decl).clone() {
            NodeKind::GenDecl {
                tok: tok @ (DeclTok::Var | DeclTok::Const),
                specs,
            } => {
                for spec in specs {
                    self.value_spec(tok, spec, scope);
                }
            }
            NodeKind::GenDecl {
                tok: DeclTok::TypeDecl,
                specs,
            } => {
                for spec in specs {
                    if let NodeKind::TypeSpec { name, ty } = self.ast.kind(spec).clone() {
                        let named = self.info.types.next_key();
                        let unknown = self.info.types.unknown();
                        let obj = self.new_obj(
                            self.ast.ident_name(name),
                            ObjKind::TypeName,
                            self.ast.pos(name),
                            named,
                            Some(name),
                        );
                        self.info.types.alloc(TypeKind::Named {
                            obj,
                            underlying: unknown,
                        });
                        self.info.defs.insert(name, obj);
                        let text = self.ast.ident_name(name).to_string();
                        if text != "_" {
                            self.info.scopes.declare(scope, &text, obj);
                        }
                        let underlying = self.resolve_type(ty, scope);
                        self.info.types.set_kind(named, TypeKind::Named { obj, underlying });
                    }
                }
            }
            _ => {}
        }
    }

    fn value_spec(&mut self, tok: DeclTok, spec: NodeId, scope: ScopeId) {
        if let NodeKind::ValueSpec { names, ty, values } = self.ast.kind(spec).clone() {
            let declared_ty = ty.map(|t| self.resolve_type(t, scope));
            let mut value_tys = Vec::new();
            for &v in &values {
                value_tys.push(self.expr(v, scope));
            }
            for (i, &name) in names.iter().enumerate() {
                let text = self.ast.ident_name(name).to_string();
                let mut t = declared_ty.unwrap_or_else(|| {
                    if names.len() == values.len() {
                        value_tys[i]
                    } else {
                        self.info.types.unknown()
                    }
                });
                if declared_ty.is_none() && tok == DeclTok::Var {
                    // `var x = 3` materializes the untyped constant;
                    // a const stays untyped.
                    if let Some(d) = self.info.types.basic_kind(t).and_then(|k| k.default_kind()) {
                        t = self.basic(d);
                    }
                }
                let kind = if tok == DeclTok::Const {
                    ObjKind::Const
                } else {
                    ObjKind::Var
                };
                let obj = self.new_obj(&text, kind, self.ast.pos(name), t, Some(name));
                self.info.defs.insert(name, obj);
                if text != "_" && self.info.scopes.declare(scope, &text, obj).is_some() {
                    let pos = self.ast.pos(name);
                    self.error_at(pos, format!("{text} redeclared in this block"));
                }
            }
        }
    }

    fn define_ident(&mut self, ident: NodeId, scope: ScopeId, rhs: Option<NodeId>) {
        if !matches!(self.ast.kind(ident), NodeKind::Ident { .. }) {
            // `a.b := ...` is invalid; resolve for the uses map and move on.
            self.expr(ident, scope);
            return;
        }
        let name = self.ast.ident_name(ident).to_string();
        if name == "_" {
            return;
        }
        // Redeclaration in the same scope is a use of the existing object.
        if let Some(existing) = self.info.scopes.lookup_local(scope, &name) {
            self.info.uses.insert(ident, existing);
            return;
        }
        let mut t = self.info.types.unknown();
        if let Some(rhs) = rhs {
            t = self.info.type_of(rhs).unwrap_or(t);
            if let Some(k) = self.info.types.basic_kind(t) {
                if let Some(d) = k.default_kind() {
                    t = self.basic(d);
                }
            }
        }
        self.define_ident_typed_with(ident, scope, t);
    }

    fn define_ident_typed(&mut self, ident: NodeId, scope: ScopeId, ty: TypeId) {
        if !matches!(self.ast.kind(ident), NodeKind::Ident { .. }) {
            self.expr(ident, scope);
            return;
        }
        let name = self.ast.ident_name(ident).to_string();
        if name == "_" {
            return;
        }
        if let Some(existing) = self.info.scopes.lookup_local(scope, &name) {
            self.info.uses.insert(ident, existing);
            return;
        }
        self.define_ident_typed_with(ident, scope, ty);
    }

    fn define_ident_typed_with(&mut self, ident: NodeId, scope: ScopeId, ty: TypeId) {
        let name = self.ast.ident_name(ident).to_string();
        let obj = self.new_obj(&name, ObjKind::Var, self.ast.pos(ident), ty, Some(ident));
        self.info.defs.insert(ident, obj);
        self.info.scopes.declare(scope, &name, obj);
    }

    fn range_types(&mut self, subject: TypeId) -> (TypeId, TypeId) {
        let unknown = self.info.types.unknown();
        let int = self.basic(BasicKind::Int);
        match self.info.types.kind(self.info.types.underlying(subject)).clone() {
            TypeKind::Slice { elem } | TypeKind::Array { elem, .. } => (int, elem),
            TypeKind::Pointer { elem } => {
                match self.info.types.kind(self.info.types.underlying(elem)).clone() {
                    TypeKind::Array { elem, .. } => (int, elem),
                    _ => (unknown, unknown),
                }
            }
            TypeKind::Map { key, value } => (key, value),
            TypeKind::Basic(BasicKind::Str) => (int, self.basic(BasicKind::Int32)),
            TypeKind::Chan { elem } => (elem, unknown),
            _ => (unknown, unknown),
        }
    }

    // ── Expressions ────────────────────────────────────────────────

    fn expr(&mut self, x: NodeId, scope: ScopeId) -> TypeId {
        let t = self.expr_inner(x, scope);
        self.info.expr_types.insert(x, t);
        t
    }

    fn expr_inner(&mut self, x: NodeId, scope: ScopeId) -> TypeId {
        let unknown = self.info.types.unknown();
        match self.ast.kind(x).clone() {
            NodeKind::Ident { name } => {
                if name == "_" {
                    return unknown;
                }
                let pos = self.ast.pos(x);
                match self
                    .info
                    .scopes
                    .lookup_at(&self.info.objs, scope, &name, pos)
                {
                    Some(obj) => {
                        self.info.uses.insert(x, obj);
                        self.info.objs[obj].ty
                    }
                    None => {
                        self.error_at(pos, format!("undefined: {name}"));
                        unknown
                    }
                }
            }
            NodeKind::BasicLit { lit, .. } => match lit {
                LitKind::Int => self.basic(BasicKind::UntypedInt),
                LitKind::Float => self.basic(BasicKind::UntypedFloat),
                LitKind::Rune => self.basic(BasicKind::UntypedRune),
                LitKind::Str => self.basic(BasicKind::UntypedStr),
            },
            NodeKind::CompositeLit { ty, elts } => {
                let t = match ty {
                    Some(ty) => self.resolve_type(ty, scope),
                    None => unknown,
                };
                let under = self.info.types.underlying(t);
                let skip_ident_keys = matches!(
                    self.info.types.kind(under),
                    TypeKind::Struct { .. } | TypeKind::Unknown
                );
                for &elt in &elts {
                    match self.ast.kind(elt).clone() {
                        NodeKind::KeyValue { key, value } => {
                            let key_is_ident =
                                matches!(self.ast.kind(key), NodeKind::Ident { .. });
                            if !(skip_ident_keys && key_is_ident) {
                                self.expr(key, scope);
                            }
                            self.expr(value, scope);
                        }
                        _ => {
                            self.expr(elt, scope);
                        }
                    }
                }
                t
            }
            NodeKind::FuncLit { ty, body } => {
                let scope2 = self.info.scopes.push(Some(scope), true);
                self.info.node_scope.insert(ty, scope2);
                if let NodeKind::FuncType { params, results } = self.ast.kind(ty).clone() {
                    for f in params {
                        self.declare_field_names(f, scope2);
                    }
                    for f in results {
                        self.declare_field_names(f, scope2);
                    }
                }
                let mut labels = HashMap::new();
                self.collect_labels(body, &mut labels);
                self.labels.push(labels);
                self.block_stmts(body, scope2);
                self.labels.pop();
                self.info.types.alloc(TypeKind::Func)
            }
            NodeKind::Paren { x: inner } => self.expr(inner, scope),
            NodeKind::Selector { x: recv, sel } => {
                let rt = self.expr(recv, scope);
                // Qualified identifier through a package name.
                if let Some(&obj) = self.info.uses.get(&recv) {
                    if self.info.objs[obj].kind == ObjKind::Package {
                        return unknown;
                    }
                }
                self.field_type(rt, self.ast.ident_name(sel))
            }
            NodeKind::Index { x: recv, index } => {
                let rt = self.expr(recv, scope);
                self.expr(index, scope);
                match self.info.types.kind(self.info.types.underlying(rt)).clone() {
                    TypeKind::Slice { elem } | TypeKind::Array { elem, .. } => elem,
                    TypeKind::Map { value, .. } => value,
                    TypeKind::Basic(BasicKind::Str) => self.basic(BasicKind::Uint8),
                    TypeKind::Pointer { elem } => {
                        match self.info.types.kind(self.info.types.underlying(elem)).clone() {
                            TypeKind::Array { elem, .. } => elem,
                            _ => unknown,
                        }
                    }
                    _ => unknown,
                }
            }
            NodeKind::SliceExpr { x: recv, low, high, max } => {
                let rt = self.expr(recv, scope);
                for part in [low, high, max].into_iter().flatten() {
                    self.expr(part, scope);
                }
                match self.info.types.kind(self.info.types.underlying(rt)).clone() {
                    TypeKind::Array { elem, .. } => self.info.types.alloc(TypeKind::Slice { elem }),
                    _ => rt,
                }
            }
            NodeKind::TypeAssert { x: recv, ty } => {
                self.expr(recv, scope);
                match ty {
                    Some(ty) => self.resolve_type(ty, scope),
                    None => unknown,
                }
            }
            NodeKind::Call { fun, args, .. } => {
                let fun_unparen = self.unparen(fun);
                // A conversion if the callee denotes a type.
                if let Some(t) = self.type_denoted(fun_unparen, scope) {
                    self.info.expr_types.insert(fun, t);
                    for &a in &args {
                        self.expr(a, scope);
                    }
                    return t;
                }
                self.expr(fun, scope);
                let mut arg_tys = Vec::new();
                for &a in &args {
                    arg_tys.push(self.expr(a, scope));
                }
                // Builtin results matter for initializer typing.
                if let NodeKind::Ident { name } = self.ast.kind(fun_unparen) {
                    if let Some(&obj) = self.info.uses.get(&fun_unparen) {
                        if self.info.objs[obj].kind == ObjKind::Builtin {
                            return match name.as_str() {
                                "len" | "cap" | "copy" => self.basic(BasicKind::Int),
                                "append" => arg_tys.first().copied().unwrap_or(unknown),
                                "make" => args
                                    .first()
                                    .map(|&a| self.resolve_type(a, scope))
                                    .unwrap_or(unknown),
                                "new" => {
                                    let elem = args
                                        .first()
                                        .map(|&a| self.resolve_type(a, scope))
                                        .unwrap_or(unknown);
                                    self.info.types.alloc(TypeKind::Pointer { elem })
                                }
                                "complex" => self.basic(BasicKind::Complex128),
                                "real" | "imag" => self.basic(BasicKind::Float64),
                                _ => unknown,
                            };
                        }
                    }
                }
                unknown
            }
            NodeKind::Star { x: inner } => {
                // Either a dereference or a pointer-type expression.
                if let Some(t) = self.type_denoted(inner, scope) {
                    return self.info.types.alloc(TypeKind::Pointer { elem: t });
                }
                let it = self.expr(inner, scope);
                match self.info.types.kind(self.info.types.underlying(it)).clone() {
                    TypeKind::Pointer { elem } => elem,
                    _ => unknown,
                }
            }
            NodeKind::Unary { op, x: inner } => {
                let it = self.expr(inner, scope);
                match op {
                    UnOp::Addr => self.info.types.alloc(TypeKind::Pointer { elem: it }),
                    UnOp::Recv => {
                        match self.info.types.kind(self.info.types.underlying(it)).clone() {
                            TypeKind::Chan { elem } => elem,
                            _ => unknown,
                        }
                    }
                    UnOp::Not => it,
                    UnOp::Neg | UnOp::Pos | UnOp::BitNot => it,
                }
            }
            NodeKind::Binary { op, x: lhs, y: rhs } => {
                use crate::syntax::ast::BinOp::*;
                let lt = self.expr(lhs, scope);
                let rt = self.expr(rhs, scope);
                match op {
                    Eql | Neq | Lss | Leq | Gtr | Geq | LAnd | LOr => {
                        let lb = self.info.types.basic_kind(lt);
                        let rb = self.info.types.basic_kind(rt);
                        let both_untyped = lb.map(|k| k.is_untyped()).unwrap_or(false)
                            && rb.map(|k| k.is_untyped()).unwrap_or(false);
                        if both_untyped {
                            self.basic(BasicKind::UntypedBool)
                        } else {
                            self.basic(BasicKind::Bool)
                        }
                    }
                    Shl | Shr => lt,
                    _ => {
                        let lb = self.info.types.basic_kind(lt);
                        if lb.map(|k| k.is_untyped()).unwrap_or(false) {
                            rt
                        } else if self.info.types.is_unknown(lt) {
                            rt
                        } else {
                            lt
                        }
                    }
                }
            }
            // Type expressions in operand position (conversions like
            // `[]byte(s)` route their callee here via `Call`).
            NodeKind::ArrayType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. }
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. }
            | NodeKind::FuncType { .. } => self.resolve_type(x, scope),
            NodeKind::KeyValue { key, value } => {
                self.expr(key, scope);
                self.expr(value, scope)
            }
            _ => unknown,
        }
    }

    fn unparen(&self, mut x: NodeId) -> NodeId {
        while let NodeKind::Paren { x: inner } = self.ast.kind(x) {
            x = *inner;
        }
        x
    }

    /// If `x` (an expression node) denotes a type, resolve and return it.
    /// Identifier lookups go through the uses map so the identity is shared
    /// with ordinary resolution.
    fn type_denoted(&mut self, x: NodeId, scope: ScopeId) -> Option<TypeId> {
        match self.ast.kind(x).clone() {
            NodeKind::Ident { name } => {
                if name == "_" {
                    return None;
                }
                let pos = self.ast.pos(x);
                let obj = self
                    .info
                    .scopes
                    .lookup_at(&self.info.objs, scope, &name, pos)?;
                if self.info.objs[obj].kind == ObjKind::TypeName {
                    self.info.uses.insert(x, obj);
                    let t = self.info.objs[obj].ty;
                    self.info.expr_types.insert(x, t);
                    Some(t)
                } else {
                    None
                }
            }
            NodeKind::Paren { x: inner } => {
                let t = self.type_denoted(inner, scope)?;
                self.info.expr_types.insert(x, t);
                Some(t)
            }
            NodeKind::Star { x: inner } => {
                let elem = self.type_denoted(inner, scope)?;
                let t = self.info.types.alloc(TypeKind::Pointer { elem });
                self.info.expr_types.insert(x, t);
                Some(t)
            }
            NodeKind::ArrayType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. }
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. }
            | NodeKind::FuncType { .. } => {
                let t = self.resolve_type(x, scope);
                self.info.expr_types.insert(x, t);
                Some(t)
            }
            _ => None,
        }
    }

    fn field_type(&mut self, recv: TypeId, name: &str) -> TypeId {
        let unknown = self.info.types.unknown();
        let mut t = self.info.types.underlying(recv);
        if let TypeKind::Pointer { elem } = self.info.types.kind(t) {
            t = self.info.types.underlying(*elem);
        }
        if let TypeKind::Struct { fields } = self.info.types.kind(t) {
            for (fname, fty) in fields {
                if fname == name {
                    return *fty;
                }
            }
        }
        unknown
    }

    // ── Type expressions ───────────────────────────────────────────

    /// Resolve a node in type position. For a type-switch case value,
    /// `nil` is also legal; `resolve_type_or_nil` tolerates it.
    fn resolve_type(&mut self, x: NodeId, scope: ScopeId) -> TypeId {
        let unknown = self.info.types.unknown();
        let t = match self.ast.kind(x).clone() {
            NodeKind::Ident { name } => {
                if name == "_" {
                    unknown
                } else {
                    let pos = self.ast.pos(x);
                    match self
                        .info
                        .scopes
                        .lookup_at(&self.info.objs, scope, &name, pos)
                    {
                        Some(obj) => {
                            self.info.uses.insert(x, obj);
                            if self.info.objs[obj].kind == ObjKind::TypeName {
                                self.info.objs[obj].ty
                            } else {
                                unknown
                            }
                        }
                        None => {
                            self.error_at(pos, format!("undefined: {name}"));
                            unknown
                        }
                    }
                }
            }
            NodeKind::Selector { x: recv, .. } => {
                // Qualified type from another package: opaque.
                self.expr(recv, scope);
                unknown
            }
            NodeKind::Paren { x: inner } => self.resolve_type(inner, scope),
            NodeKind::Star { x: inner } => {
                let elem = self.resolve_type(inner, scope);
                self.info.types.alloc(TypeKind::Pointer { elem })
            }
            NodeKind::ArrayType { len, elt } => {
                let elem = self.resolve_type(elt, scope);
                match len {
                    None => self.info.types.alloc(TypeKind::Slice { elem }),
                    Some(len_expr) => {
                        self.expr(len_expr, scope);
                        let n = self.const_int(len_expr);
                        self.info.types.alloc(TypeKind::Array { len: n, elem })
                    }
                }
            }
            NodeKind::MapType { key, value } => {
                let k = self.resolve_type(key, scope);
                let v = self.resolve_type(value, scope);
                self.info.types.alloc(TypeKind::Map { key: k, value: v })
            }
            NodeKind::ChanType { value, .. } => {
                let elem = self.resolve_type(value, scope);
                self.info.types.alloc(TypeKind::Chan { elem })
            }
            NodeKind::StructType { fields } => {
                let mut out = Vec::new();
                for field in fields {
                    if let NodeKind::Field { names, ty } = self.ast.kind(field).clone() {
                        let ft = match ty {
                            Some(ty) => self.resolve_type(ty, scope),
                            None => unknown,
                        };
                        if names.is_empty() {
                            // Embedded field: named by its base type name.
                            if let Some(ty) = ty {
                                if let Some(name) = self.embedded_name(ty) {
                                    out.push((name, ft));
                                }
                            }
                        } else {
                            for name in names {
                                out.push((self.ast.ident_name(name).to_string(), ft));
                            }
                        }
                    }
                }
                self.info.types.alloc(TypeKind::Struct { fields: out })
            }
            NodeKind::InterfaceType { .. } => self.info.types.alloc(TypeKind::Interface),
            NodeKind::FuncType { .. } => self.info.types.alloc(TypeKind::Func),
            _ => unknown,
        };
        self.info.expr_types.insert(x, t);
        t
    }

    fn resolve_type_or_nil(&mut self, x: NodeId, scope: ScopeId) -> TypeId {
        if let NodeKind::Ident { name } = self.ast.kind(x) {
            if name == "nil" {
                return self.expr(x, scope);
            }
        }
        self.resolve_type(x, scope)
    }

    fn embedded_name(&self, mut ty: NodeId) -> Option<String> {
        loop {
            match self.ast.kind(ty) {
                NodeKind::Star { x } => ty = *x,
                NodeKind::Selector { sel, .. } => ty = *sel,
                NodeKind::Ident { name } => return Some(name.clone()),
                _ => return None,
            }
        }
    }

    fn const_int(&self, x: NodeId) -> Option<u64> {
        match self.ast.kind(x) {
            NodeKind::BasicLit {
                lit: LitKind::Int,
                value,
            } => {
                let v = value.replace('_', "");
                if let Some(hex) = v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
                    u64::from_str_radix(hex, 16).ok()
                } else {
                    v.parse().ok()
                }
            }
            NodeKind::Paren { x } => self.const_int(*x),
            _ => None,
        }
    }
}

fn import_base_name(path_lit: &str) -> String {
    let trimmed = path_lit.trim_matches(|c| c == '"' || c == '`');
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_file;
    use std::path::Path;

    fn check_src(src: &str) -> (crate::syntax::FileSet, Ast, Vec<File>, TypeInfo) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let file = parse_file(&mut fset, &mut ast, Path::new("t.go"), src.to_string()).unwrap();
        let files = vec![file];
        let info = check(&fset, &ast, &files);
        (fset, ast, files, info)
    }

    fn find_idents(ast: &Ast, root: NodeId, name: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        ast.walk(root, &mut |x| {
            if let NodeKind::Ident { name: n } = ast.kind(x) {
                if n == name {
                    out.push(x);
                }
            }
            true
        });
        out
    }

    fn body_of(ast: &Ast, files: &[File], fn_name: &str) -> NodeId {
        for f in files {
            for &d in &f.decls {
                if let NodeKind::FuncDecl { name, body: Some(b), .. } = ast.kind(d) {
                    if ast.ident_name(*name) == fn_name {
                        return *b;
                    }
                }
            }
        }
        panic!("function {fn_name} not found");
    }

    #[test]
    fn shadowing_resolves_to_distinct_objects() {
        let src = "package p\n\nfunc f() {\n\tvar i int\n\t_ = i\n\t{\n\t\tvar i string\n\t\t_ = i\n\t}\n}\n";
        let (_, ast, files, info) = check_src(src);
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let body = body_of(&ast, &files, "f");
        let ids = find_idents(&ast, body, "i");
        assert_eq!(ids.len(), 4);
        let outer = info.defs[&ids[0]];
        let inner = info.defs[&ids[2]];
        assert_ne!(outer, inner);
        assert_eq!(info.uses[&ids[1]], outer);
        assert_eq!(info.uses[&ids[3]], inner);
    }

    #[test]
    fn declared_before_use_prefers_outer() {
        // The use of x in the inner var's initializer sees the outer x.
        let src = "package p\n\nfunc f() {\n\tvar x int\n\t_ = x\n\t{\n\t\tvar y = x\n\t\t_ = y\n\t\tvar x string\n\t\t_ = x\n\t}\n}\n";
        let (_, ast, files, info) = check_src(src);
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let body = body_of(&ast, &files, "f");
        let ids = find_idents(&ast, body, "x");
        // decl, use, init-use (outer), decl (inner), use (inner)
        assert_eq!(ids.len(), 5);
        let outer = info.defs[&ids[0]];
        let inner = info.defs[&ids[3]];
        assert_eq!(info.uses[&ids[2]], outer);
        assert_eq!(info.uses[&ids[4]], inner);
    }

    #[test]
    fn struct_field_types_resolve() {
        let src = "package p\n\ntype T struct {\n\tPtr   *T\n\tSlice []int\n}\n\nfunc f(t T) {\n\t_ = t.Slice\n}\n";
        let (_, ast, files, info) = check_src(src);
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let body = body_of(&ast, &files, "f");
        let mut sel = None;
        ast.walk(body, &mut |x| {
            if matches!(ast.kind(x), NodeKind::Selector { .. }) {
                sel = Some(x);
            }
            true
        });
        let t = info.type_of(sel.unwrap()).unwrap();
        assert!(matches!(info.types.kind(t), TypeKind::Slice { .. }));
    }

    #[test]
    fn conversion_is_typed() {
        let src = "package p\n\ntype M int\n\nfunc f() {\n\tx := M(3)\n\t_ = x\n}\n";
        let (_, ast, files, info) = check_src(src);
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let body = body_of(&ast, &files, "f");
        let ids = find_idents(&ast, body, "x");
        let obj = info.defs[&ids[0]];
        let ty = info.objs[obj].ty;
        assert!(matches!(info.types.kind(ty), TypeKind::Named { .. }));
    }

    #[test]
    fn untyped_literal_defaults() {
        let src = "package p\n\nfunc f() {\n\tvar i int\n\tvar s string\n\ti = 0\n\ts = \"x\"\n\t_ = i\n\t_ = s\n}\n";
        let (_, ast, files, info) = check_src(src);
        assert!(info.errors.is_empty(), "{:?}", info.errors);
        let body = body_of(&ast, &files, "f");
        let ids = find_idents(&ast, body, "i");
        let i_ty = info.objs[info.defs[&ids[0]]].ty;
        // Find the literal 0.
        let mut zero = None;
        ast.walk(body, &mut |x| {
            if let NodeKind::BasicLit { lit: LitKind::Int, value } = ast.kind(x) {
                if value == "0" {
                    zero = Some(x);
                }
            }
            true
        });
        assert!(info.defaults_to(&ast, zero.unwrap(), i_ty));
    }

    #[test]
    fn unresolved_identifier_sets_error() {
        let src = "package p\n\nfunc f() {\n\tundefinedThing()\n}\n";
        let (_, _, _, info) = check_src(src);
        assert!(!info.errors.is_empty());
    }

    #[test]
    fn imported_names_resolve_without_error() {
        let src = "package p\n\nimport \"fmt\"\n\nfunc f() {\n\tfmt.Println(1)\n}\n";
        let (_, _, _, info) = check_src(src);
        assert!(info.errors.is_empty(), "{:?}", info.errors);
    }

    #[test]
    fn lookup_at_pos_sees_block_scoping() {
        let src = "package p\n\nfunc f() {\n\tvar i int\n\t_ = i\n\t{\n\t\tvar i string\n\t\t_ = i\n\t}\n}\n";
        let (fset, ast, files, info) = check_src(src);
        let mut fn_decl = None;
        for &d in &files[0].decls {
            if matches!(ast.kind(d), NodeKind::FuncDecl { .. }) {
                fn_decl = Some(d);
            }
        }
        let fn_decl = fn_decl.unwrap();
        let body = body_of(&ast, &files, "f");
        let ids = find_idents(&ast, body, "i");
        let outer = info.defs[&ids[0]];
        let inner = info.defs[&ids[2]];
        // At the position of each use, lookup resolves to the right object.
        let at_outer = info
            .lookup_at_pos(&ast, fn_decl, ast.pos(ids[1]), "i")
            .unwrap();
        let at_inner = info
            .lookup_at_pos(&ast, fn_decl, ast.pos(ids[3]), "i")
            .unwrap();
        assert_eq!(at_outer, outer);
        assert_eq!(at_inner, inner);
        let _ = fset;
    }
}

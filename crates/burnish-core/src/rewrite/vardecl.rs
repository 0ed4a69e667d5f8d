//! Variable declaration placement.
//!
//! Moves `var` declarations as close as possible to their uses, merging a
//! declaration into its first assignment (`=` becomes `:=`) when that
//! preserves the variable's type, and splitting disjoint uses of one
//! variable into independent declarations.
//!
//! The analysis is per variable: build a CFG filtered to the nodes that
//! touch the variable, run reaching definitions over it, merge definitions
//! that can reach the same use, then push each merged definition's
//! tentative declaration point up through a fixpoint of placement
//! constraints — never into a loop, never across a backward jump's target,
//! never somewhere a forward jump would skip, never into syntax that
//! cannot host a declaration, and never where it would shadow an outer
//! definition that is still in use.
//!
//! Without liveness information every constraint errs upward; a rewrite
//! that cannot be proven safe leaves the declaration where it is.

use std::collections::{HashMap, HashSet};

use petgraph::unionfind::UnionFind;

use crate::analysis::block::{self, BlockId, BlockTree};
use crate::analysis::cfg::{self, Computation, Graph};
use crate::edit::EditBuffer;
use crate::rewrite::{for_each_func, Context, Package, Pass};
use crate::sema::object::ObjId;
use crate::sema::types::TypeKind;
use crate::syntax::ast::{AssignTok, Ast, DeclTok, NodeId, NodeKind, UnOp};
use crate::syntax::token::Pos;

pub struct VarDecl;

impl Pass for VarDecl {
    fn name(&self) -> &'static str {
        "var-decl"
    }

    fn run(&self, ctxt: &mut Context, pkg: &mut Package) {
        for_each_func(ctxt, pkg, rewrite_func);
    }
}

/// Where a definition's declaration will materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitSite {
    /// Keep the original declaration.
    Decl,
    /// Merge into this assignment: `=` becomes `:=`.
    Assign(NodeId),
    /// Copy the declaration line to just before this position.
    Empty(Pos),
}

impl InitSite {
    fn pos(self, ast: &Ast, decl: NodeId) -> Pos {
        match self {
            InitSite::Decl => ast.pos(decl),
            InitSite::Assign(x) => ast.pos(x),
            InitSite::Empty(p) => p,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Def {
    block: Option<BlockId>,
    start: Pos,
    end: Pos,
    init: Option<InitSite>,
}

struct Var {
    obj: ObjId,
    decl: NodeId,
    defs: Vec<Def>,
}

fn rewrite_func(_ctxt: &mut Context, pkg: &Package, edit: &mut EditBuffer, fn_decl: NodeId) {
    let ast = &pkg.ast;
    let body = match ast.kind(fn_decl) {
        NodeKind::FuncDecl { body: Some(b), .. } => *b,
        _ => return,
    };
    let vars = analyze_func(pkg, edit, body);

    for v in &vars {
        let spec = single_spec(ast, v.decl);
        let Some(spec) = spec else { continue };
        let (names, spec_ty) = match ast.kind(spec) {
            NodeKind::ValueSpec { names, ty, .. } => (names.clone(), *ty),
            _ => continue,
        };
        if names.len() > 1 {
            // TODO: handle declarations with multiple variables
            continue;
        }
        let decl_file = pkg.fset.file_of(ast.pos(v.decl));
        if decl_file.line_of(ast.pos(v.decl)) != decl_file.line_of(ast.end(v.decl)) {
            // Spans lines; moving or duplicating it would garble comments.
            continue;
        }
        let mut keep_decl = false;
        for d in &v.defs {
            match d.init {
                Some(InitSite::Decl) => keep_decl = true,
                Some(InitSite::Empty(p)) => {
                    edit.copy_line(ast.pos(v.decl), ast.end(v.decl), p);
                }
                Some(InitSite::Assign(a)) => {
                    let (tok_pos, rhs0) = match ast.kind(a) {
                        NodeKind::Assign { tok_pos, rhs, .. } => (*tok_pos, rhs[0]),
                        _ => continue,
                    };
                    edit.insert(tok_pos, ":");
                    let var_ty = pkg.info.objs[v.obj].ty;
                    if !pkg.info.defaults_to(ast, rhs0, var_ty) {
                        // `:=` would infer a different type; convert.
                        let Some(spec_ty) = spec_ty else { continue };
                        let mut typ = edit
                            .text_at(ast.pos(spec_ty), ast.end(spec_ty))
                            .to_string();
                        if typ.contains(' ')
                            || typ == "interface{}"
                            || typ == "struct{}"
                            || typ.starts_with('*')
                        {
                            typ = format!("({typ})");
                        }
                        edit.insert(ast.pos(rhs0), format!("{typ}("));
                        edit.insert(ast.end(rhs0), ")");
                    }
                }
                None => panic!("vardecl: definition with no init site"),
            }
        }
        if !keep_decl {
            edit.delete_line(ast.pos(v.decl), ast.end(v.decl));
        }
    }

    if edit.num_edits() == 0 {
        init_to_decl(pkg, edit, body);
    }
}

fn single_spec(ast: &Ast, decl_stmt: NodeId) -> Option<NodeId> {
    if let NodeKind::DeclStmt { decl } = ast.kind(decl_stmt) {
        if let NodeKind::GenDecl { specs, .. } = ast.kind(*decl) {
            if specs.len() == 1 {
                return Some(specs[0]);
            }
        }
    }
    None
}

// ── Analysis ───────────────────────────────────────────────────────

fn analyze_func(pkg: &Package, edit: &EditBuffer, body: NodeId) -> Vec<Var> {
    let ast = &pkg.ast;

    // Candidates: single-spec `var` declarations with no initializer.
    // Variables shared with closures are off limits: without escape
    // analysis, a closure may observe the variable at any time.
    let mut in_closure: HashSet<ObjId> = HashSet::new();
    let mut objs: Vec<ObjId> = Vec::new();
    let mut vardecl: HashMap<ObjId, NodeId> = HashMap::new();
    ast.walk(body, &mut |x| {
        match ast.kind(x) {
            NodeKind::DeclStmt { decl } => {
                if let NodeKind::GenDecl {
                    tok: DeclTok::Var,
                    specs,
                } = ast.kind(*decl)
                {
                    if specs.len() == 1 {
                        if let NodeKind::ValueSpec { names, values, .. } = ast.kind(specs[0]) {
                            if values.is_empty() {
                                for &id in names {
                                    if let Some(&obj) = pkg.info.defs.get(&id) {
                                        objs.push(obj);
                                        vardecl.insert(obj, x);
                                    }
                                }
                            }
                        }
                    }
                }
                true
            }
            NodeKind::FuncLit { .. } => {
                ast.walk(x, &mut |y| {
                    if matches!(ast.kind(y), NodeKind::Ident { .. }) {
                        if let Some(obj) = pkg.info.obj_of(y) {
                            in_closure.insert(obj);
                        }
                    }
                    true
                });
                false
            }
            _ => true,
        }
    });

    let tree = block::build(ast, body);
    let mut vars = Vec::new();

    for &obj in &objs {
        if in_closure.contains(&obj) {
            continue;
        }
        let decl_stmt = vardecl[&obj];

        // Flow graph of the nodes that touch this variable.
        let g = cfg::build(ast, body, &|x| need_for_obj(pkg, obj, x));

        // Reaching definitions.
        let mut m = IdentMatcher::new(pkg, &g, obj);
        g.dataflow(&mut m);

        // Merge definitions that reach a use together.
        let mut def_nodes: Vec<NodeId> = Vec::new();
        let mut def_index: HashMap<NodeId, usize> = HashMap::new();
        for x in &m.list {
            for &d in &m.out[x].list {
                def_index.entry(d).or_insert_with(|| {
                    def_nodes.push(d);
                    def_nodes.len() - 1
                });
            }
        }
        let mut uf: UnionFind<usize> = UnionFind::new(def_nodes.len());
        for x in &m.list {
            let ds = &m.out[x].list;
            if ds.len() > 1 {
                for &d in &ds[1..] {
                    uf.union(def_index[&ds[0]], def_index[&d]);
                }
            }
        }

        // One tentative Def per equivalence class.
        let mut defs: Vec<Option<Def>> = Vec::new();
        let mut classdef: HashMap<usize, usize> = HashMap::new();
        for i in 0..def_nodes.len() {
            let root = uf.find(i);
            classdef.entry(root).or_insert_with(|| {
                defs.push(Some(Def::default()));
                defs.len() - 1
            });
        }

        // Use → candidate definition.
        let mut id_to_def: HashMap<NodeId, usize> = HashMap::new();
        for &x in &m.list {
            if matches!(ast.kind(x), NodeKind::Ident { .. }) {
                let ds = &m.out[&x].list;
                if !ds.is_empty() {
                    id_to_def.insert(x, classdef[&uf.find(def_index[&ds[0]])]);
                }
            }
        }

        // Extent and enclosing block of each class.
        for &x in &m.list {
            // The zero initialization of an uninitialized declaration can
            // move forward; skip it here so it does not pin the class.
            if let NodeKind::DeclStmt { decl } = ast.kind(x) {
                if let NodeKind::GenDecl { specs, .. } = ast.kind(*decl) {
                    if specs.len() == 1 {
                        if let NodeKind::ValueSpec { values, .. } = ast.kind(specs[0]) {
                            if values.is_empty() {
                                continue;
                            }
                        }
                    }
                }
            }
            for &dn in &m.out[&x].list {
                let di = classdef[&uf.find(def_index[&dn])];
                let d = defs[di].as_mut().unwrap();
                let bx = tree.map[&x];
                match d.block {
                    None => d.block = Some(bx),
                    Some(db) => {
                        // Hoist into the block containing both.
                        let mut bx = bx;
                        let mut db = db;
                        while tree.block(bx).depth > tree.block(db).depth {
                            bx = tree.block(bx).parent.unwrap();
                        }
                        while tree.block(db).depth > tree.block(bx).depth {
                            d.start = ast.pos(tree.block(db).root.unwrap());
                            db = tree.block(db).parent.unwrap();
                        }
                        while db != bx {
                            d.start = ast.pos(tree.block(db).root.unwrap());
                            db = tree.block(db).parent.unwrap();
                            bx = tree.block(bx).parent.unwrap();
                        }
                        d.block = Some(db);
                    }
                }
                let pos = ast.pos(x);
                if d.start.is_none() || pos < d.start {
                    d.start = pos;
                }
                if ast.end(x) > d.end {
                    d.end = ast.end(x);
                }
            }
        }

        apply_constraints(
            pkg, edit, &tree, obj, decl_stmt, &mut defs, &mut id_to_def,
        );

        // Report.
        let mut v = Var {
            obj,
            decl: decl_stmt,
            defs: Vec::new(),
        };
        for d in defs.into_iter().flatten() {
            if d.block.is_some() {
                v.defs.push(d);
            }
        }
        if v.defs.len() == 1 && v.defs[0].init == Some(InitSite::Decl) {
            // No change suggested.
            continue;
        }
        vars.push(v);
    }

    vars
}

/// The placement-constraint fixpoint (spec steps: loops, jump barriers,
/// syntax eligibility, shadowing, one-per-block, init-site selection).
fn apply_constraints(
    pkg: &Package,
    edit: &EditBuffer,
    tree: &BlockTree,
    obj: ObjId,
    decl_stmt: NodeId,
    defs: &mut Vec<Option<Def>>,
    id_to_def: &mut HashMap<NodeId, usize>,
) {
    let ast = &pkg.ast;
    let orig_depth = tree.block(tree.map[&decl_stmt]).depth;

    loop {
        let mut changed = false;

        for di in 0..defs.len() {
            if defs[di].is_none() {
                continue;
            }

            // Never move a declaration into a loop: without liveness
            // information the variable may be live on entry.
            {
                let d = defs[di].as_mut().unwrap();
                if let Some(db) = d.block {
                    let mut b = db;
                    while tree.block(b).depth > orig_depth {
                        let root = tree.block(b).root.expect("non-root block without root");
                        if matches!(
                            ast.kind(root),
                            NodeKind::For { .. } | NodeKind::RangeFor { .. }
                        ) {
                            while d.block != Some(b) {
                                let cur = d.block.unwrap();
                                let cur_root =
                                    tree.block(cur).root.expect("non-root block without root");
                                d.start = ast.pos(cur_root);
                                d.end = ast.end(cur_root);
                                d.block = tree.block(cur).parent;
                                changed = true;
                            }
                        }
                        match tree.block(b).parent {
                            Some(p) => b = p,
                            None => break,
                        }
                    }
                }
            }

            // Jump barriers.
            {
                let d = defs[di].as_mut().unwrap();
                for (labelname, glist) in &tree.goto_uses {
                    let Some(&label) = tree.label.get(labelname) else {
                        continue;
                    };
                    for &g in glist {
                        // A declaration between a backward goto's target
                        // and the goto could be skipped and then read.
                        if ast.pos(decl_stmt) < ast.pos(label)
                            && ast.pos(label) < d.start
                            && d.start < ast.pos(g)
                        {
                            while let Some(db) = d.block {
                                let root =
                                    tree.block(db).root.expect("non-root block without root");
                                if ast.pos(label) < ast.pos(root) {
                                    d.block = tree.block(db).parent;
                                } else {
                                    break;
                                }
                            }
                            d.start = ast.pos(label);
                            changed = true;
                        }

                        // A forward goto may not jump over a declaration
                        // in the same block.
                        if ast.pos(g) < d.start
                            && d.start <= ast.pos(label)
                            && tree.map.get(&label).copied() == d.block
                        {
                            d.start = ast.pos(g);
                            changed = true;
                        }
                    }
                }
            }

            // Syntax eligibility of the chosen block's root.
            {
                let d = defs[di].as_mut().unwrap();
                if let Some(db) = d.block {
                    let root = tree.block(db).root.expect("non-root block without root");
                    if !can_declare(pkg, root, obj) {
                        d.start = ast.pos(root);
                        d.block = tree.block(db).parent;
                        changed = true;
                    }
                }
            }

            // Shadowing guard: if an outer definition still has a use
            // inside this block past our start, fold into it.
            let (d_block, d_start) = {
                let d = defs[di].as_ref().unwrap();
                (d.block, d.start)
            };
            if let Some(db) = d_block {
                let d_depth = tree.block(db).depth;
                let root_end = ast.end(tree.block(db).root.expect("non-root block without root"));
                let mut merge_into = None;
                for (&x, &xdef) in id_to_def.iter() {
                    if xdef != di
                        && defs[xdef].is_some()
                        && defs[xdef]
                            .as_ref()
                            .unwrap()
                            .block
                            .map(|b| tree.block(b).depth < d_depth)
                            .unwrap_or(false)
                        && d_start <= ast.pos(x)
                        && ast.pos(x) < root_end
                    {
                        merge_into = Some(xdef);
                        break;
                    }
                }
                if let Some(xdef) = merge_into {
                    for v in id_to_def.values_mut() {
                        if *v == di {
                            *v = xdef;
                        }
                    }
                    defs[di] = None;
                    changed = true;
                }
            }
        }

        // One definition per block.
        let mut blockdef: HashMap<BlockId, usize> = HashMap::new();
        for di in 0..defs.len() {
            let Some(d) = defs[di].clone() else { continue };
            let Some(b) = d.block else { continue };
            match blockdef.get(&b) {
                None => {
                    blockdef.insert(b, di);
                }
                Some(&dd) => {
                    let target = defs[dd].as_mut().unwrap();
                    if d.start < target.start {
                        target.start = d.start;
                    }
                    if d.end > target.end {
                        target.end = d.end;
                    }
                    for v in id_to_def.values_mut() {
                        if *v == di {
                            *v = dd;
                        }
                    }
                    defs[di] = None;
                    changed = true;
                }
            }
        }

        if changed {
            continue;
        }

        // Pick the init site. Eligibility was established above.
        for di in 0..defs.len() {
            let Some(d) = defs[di].as_mut() else { continue };
            let Some(db) = d.block else { continue };
            let root = tree.block(db).root.expect("non-root block without root");
            let init = match ast.kind(root) {
                NodeKind::Block { .. } | NodeKind::Case { .. } | NodeKind::Comm { .. } => {
                    let list = ast.block_list(root).unwrap().to_vec();
                    place_init(pkg, edit, d.start, obj, decl_stmt, &list)
                }
                NodeKind::If { init: Some(init), .. }
                | NodeKind::For { init: Some(init), .. }
                | NodeKind::Switch { init: Some(init), .. }
                | NodeKind::TypeSwitch { init: Some(init), .. } => {
                    InitSite::Assign(ast.unlabel(*init))
                }
                _ => panic!("unexpected declaration block root"),
            };
            d.init = Some(init);
            let ipos = init.pos(ast, decl_stmt);
            if ipos < d.start {
                d.start = ipos;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }
}

/// Find the first statement whose extent reaches `start` and decide how
/// the declaration lands there.
fn place_init(
    pkg: &Package,
    edit: &EditBuffer,
    start: Pos,
    obj: ObjId,
    decl: NodeId,
    list: &[NodeId],
) -> InitSite {
    let ast = &pkg.ast;
    let mut decl_pos: Option<usize> = None;
    let mut i = 0;
    while i < list.len() && edit.end_of(ast, list[i]) < start {
        if ast.unlabel(list[i]) == decl {
            decl_pos = Some(i);
        }
        i += 1;
    }
    if i >= list.len() {
        panic!("vardecl: start position beyond statement list");
    }

    let head = ast.unlabel(list[i]);
    if matches!(ast.kind(head), NodeKind::Assign { .. }) && can_declare(pkg, head, obj) {
        return InitSite::Assign(head);
    }

    // The declaration can stay put if only simple statements separate it
    // from the first use.
    if let Some(dp) = decl_pos {
        if all_simple(ast, &list[dp..i]) {
            return InitSite::Decl;
        }
    }
    for j in i + 1..list.len() {
        if ast.unlabel(list[j]) == decl {
            if all_simple(ast, &list[i..j]) {
                return InitSite::Decl;
            }
            break;
        }
    }

    // Otherwise a fresh declaration line goes right before the first use,
    // inside any labels that start before it.
    let mut x = list[i];
    loop {
        match ast.kind(x) {
            NodeKind::Labeled { stmt, .. } if ast.pos(*stmt) <= start => x = *stmt,
            _ => break,
        }
    }
    InitSite::Empty(ast.pos(x))
}

/// Statements a declaration may safely move across: no control flow.
fn all_simple(ast: &Ast, list: &[NodeId]) -> bool {
    list.iter().all(|&x| {
        matches!(
            ast.kind(ast.unlabel(x)),
            NodeKind::DeclStmt { .. }
                | NodeKind::Assign { .. }
                | NodeKind::ExprStmt { .. }
                | NodeKind::Empty { .. }
                | NodeKind::IncDec { .. }
        )
    })
}

/// Can a declaration of `obj` be introduced at `x`? Block-like nodes can
/// always host one; `if`/`for`/`switch` only through an init assignment of
/// exactly this variable whose right side does not read it; `range` never
/// (the range variable's type may not match and there is nowhere to put a
/// conversion).
fn can_declare(pkg: &Package, x: NodeId, obj: ObjId) -> bool {
    let ast = &pkg.ast;
    match ast.kind(x) {
        NodeKind::Block { .. } | NodeKind::Case { .. } | NodeKind::Comm { .. } => true,
        NodeKind::If { init, .. }
        | NodeKind::Switch { init, .. }
        | NodeKind::TypeSwitch { init, .. }
        | NodeKind::For { init, .. } => match init {
            Some(init) => can_declare(pkg, ast.unlabel(*init), obj),
            None => false,
        },
        NodeKind::RangeFor { .. } => false,
        NodeKind::Assign { lhs, tok, rhs, .. } => {
            if *tok != AssignTok::Assign || lhs.len() != 1 {
                return false;
            }
            if !is_ident_obj(pkg, unparen(ast, lhs[0]), obj) {
                return false;
            }
            // The variable on the right side would refer to the outer
            // declaration after the rewrite.
            let mut on_rhs = false;
            for &y in rhs {
                ast.walk(y, &mut |z| {
                    if is_ident_obj(pkg, z, obj) {
                        on_rhs = true;
                    }
                    !on_rhs
                });
            }
            !on_rhs
        }
        _ => false,
    }
}

fn is_ident_obj(pkg: &Package, x: NodeId, obj: ObjId) -> bool {
    matches!(pkg.ast.kind(x), NodeKind::Ident { .. }) && pkg.info.obj_of(x) == Some(obj)
}

fn unparen(ast: &Ast, mut x: NodeId) -> NodeId {
    while let NodeKind::Paren { x: inner } = ast.kind(x) {
        x = *inner;
    }
    x
}

/// Is `x` a node the per-variable CFG should keep: a reference to the
/// variable, an address-of that bottoms out at it, its declaration, a
/// plain assignment to it, or an inc/dec of it.
fn need_for_obj(pkg: &Package, obj: ObjId, x: NodeId) -> bool {
    let ast = &pkg.ast;
    match ast.kind(x) {
        NodeKind::Ident { .. } => pkg.info.obj_of(x) == Some(obj),
        NodeKind::Unary {
            op: UnOp::Addr,
            x: operand,
        } => addr_of_walk(pkg, *operand) == Some(obj),
        NodeKind::DeclStmt { decl } => {
            if let NodeKind::GenDecl {
                tok: DeclTok::Var,
                specs,
            } = ast.kind(*decl)
            {
                for &spec in specs {
                    if let NodeKind::ValueSpec { names, .. } = ast.kind(spec) {
                        for &id in names {
                            if pkg.info.defs.get(&id) == Some(&obj) {
                                return true;
                            }
                        }
                    }
                }
            }
            false
        }
        NodeKind::Assign { lhs, tok, .. } => {
            if *tok != AssignTok::Assign {
                return false;
            }
            lhs.iter()
                .any(|&l| is_ident_obj(pkg, unparen(ast, l), obj))
        }
        NodeKind::IncDec { x: operand, .. } => is_ident_obj(pkg, unparen(ast, *operand), obj),
        _ => false,
    }
}

/// Walk down from an `&` operand to see whether the address taken is the
/// variable's own storage. A selection through a pointer or an index into
/// a pointer or slice reaches someone else's storage and stops the walk;
/// unknown receiver types keep drilling, matching the assumption that a
/// value type is being traversed.
fn addr_of_walk(pkg: &Package, operand: NodeId) -> Option<ObjId> {
    let ast = &pkg.ast;
    let types = &pkg.info.types;
    let mut y = operand;
    loop {
        match ast.kind(y) {
            NodeKind::Paren { x } => y = *x,
            NodeKind::Selector { x: recv, .. } => {
                if let Some(t) = pkg.info.type_of(*recv) {
                    if matches!(types.kind(types.underlying(t)), TypeKind::Pointer { .. }) {
                        break;
                    }
                }
                y = *recv;
            }
            NodeKind::Index { x: recv, .. } => {
                if let Some(t) = pkg.info.type_of(*recv) {
                    if matches!(
                        types.kind(types.underlying(t)),
                        TypeKind::Pointer { .. } | TypeKind::Slice { .. }
                    ) {
                        break;
                    }
                }
                y = *recv;
            }
            _ => break,
        }
    }
    match ast.kind(y) {
        NodeKind::Ident { .. } => pkg.info.obj_of(y),
        _ => None,
    }
}

// ── Reaching definitions ───────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct DefSet {
    list: Vec<NodeId>,
    addr_taken: bool,
}

fn merge_defs(l1: &[NodeId], l2: &[NodeId]) -> Vec<NodeId> {
    if l1.is_empty() {
        return l2.to_vec();
    }
    if l2.is_empty() {
        return l1.to_vec();
    }
    let mut out = Vec::with_capacity(l1.len() + l2.len());
    let mut seen = HashSet::new();
    for &x in l1.iter().chain(l2) {
        if seen.insert(x) {
            out.push(x);
        }
    }
    out
}

struct IdentMatcher<'a> {
    pkg: &'a Package,
    obj: ObjId,
    start: NodeId,
    end: NodeId,
    in_: HashMap<NodeId, DefSet>,
    out: HashMap<NodeId, DefSet>,
    /// Interesting nodes in first-transfer order.
    list: Vec<NodeId>,
}

impl<'a> IdentMatcher<'a> {
    fn new(pkg: &'a Package, g: &Graph, obj: ObjId) -> IdentMatcher<'a> {
        IdentMatcher {
            pkg,
            obj,
            start: g.start,
            end: g.end,
            in_: HashMap::new(),
            out: HashMap::new(),
            list: Vec::new(),
        }
    }

    fn in_of(&self, x: NodeId) -> DefSet {
        self.in_.get(&x).cloned().unwrap_or_default()
    }
}

impl Computation for IdentMatcher<'_> {
    fn init(&mut self, start: NodeId) {
        self.in_.insert(start, DefSet::default());
    }

    fn transfer(&mut self, x: NodeId) {
        if x == self.start || x == self.end {
            let dset = self.in_of(x);
            self.out.insert(x, dset);
            return;
        }
        if !need_for_obj(self.pkg, self.obj, x) {
            let dset = self.in_of(x);
            self.out.insert(x, dset);
            return;
        }
        if !self.out.contains_key(&x) {
            self.list.push(x);
        }

        let ast = &self.pkg.ast;
        let din = self.in_of(x);
        let dout = match ast.kind(x) {
            NodeKind::Ident { .. } => {
                // First use after the bare declaration: the use itself
                // becomes the definition the class forms around.
                if din.list.len() == 1
                    && matches!(ast.kind(din.list[0]), NodeKind::DeclStmt { .. })
                {
                    DefSet {
                        list: vec![x],
                        addr_taken: false,
                    }
                } else {
                    din
                }
            }
            NodeKind::DeclStmt { .. } => DefSet {
                list: vec![x],
                addr_taken: false,
            },
            NodeKind::Unary { .. } => DefSet {
                list: din.list,
                addr_taken: true,
            },
            NodeKind::Assign { .. } => {
                if din.addr_taken {
                    DefSet {
                        list: merge_defs(&din.list, &[x]),
                        addr_taken: true,
                    }
                } else {
                    DefSet {
                        list: vec![x],
                        addr_taken: false,
                    }
                }
            }
            NodeKind::IncDec { .. } => DefSet {
                list: merge_defs(&din.list, &[x]),
                addr_taken: din.addr_taken,
            },
            _ => din,
        };
        self.out.insert(x, dout);
    }

    fn join(&mut self, x: NodeId, y: NodeId) -> bool {
        let dx = self.in_of(x);
        let dy = self.out.get(&y).cloned().unwrap_or_default();
        let new = merge_defs(&dx.list, &dy.list);
        if new.len() > dx.list.len() || (!dx.addr_taken && dy.addr_taken) {
            self.in_.insert(
                x,
                DefSet {
                    list: new,
                    addr_taken: dx.addr_taken || dy.addr_taken,
                },
            );
            return true;
        }
        false
    }
}

// ── Initializer normalization ──────────────────────────────────────

/// Rewrite `x := (*T)(nil)` and `x := T{}` (struct or array `T`) to
/// `var x *T` / `var x T`. Runs only when the placement pass proper made
/// no edits in this file.
fn init_to_decl(pkg: &Package, edit: &mut EditBuffer, body: NodeId) {
    let ast = &pkg.ast;
    ast.walk(body, &mut |x| {
        let Some(list) = ast.block_list(x) else {
            return true;
        };
        for &stmt in list {
            let NodeKind::Assign { lhs, tok, rhs, .. } = ast.kind(stmt) else {
                continue;
            };
            if *tok != AssignTok::Define || lhs.len() != 1 {
                continue;
            }
            let NodeKind::Ident { name } = ast.kind(lhs[0]) else {
                continue;
            };
            let typ = is_nil_ptr(pkg, edit, rhs[0])
                .or_else(|| is_struct_or_array_literal(pkg, edit, rhs[0]));
            if let Some(typ) = typ {
                edit.replace(ast.pos(stmt), ast.end(stmt), format!("var {name} {typ}"));
            }
        }
        true
    });
}

fn is_nil_ptr(pkg: &Package, edit: &EditBuffer, x: NodeId) -> Option<String> {
    let ast = &pkg.ast;
    let NodeKind::Call { fun, args, .. } = ast.kind(x) else {
        return None;
    };
    if args.len() != 1 {
        return None;
    }
    let arg = unparen(ast, args[0]);
    if !pkg.info.is_nil(arg) {
        return None;
    }
    let f = unparen(ast, *fun);
    if !denotes_type(pkg, f) {
        return None;
    }
    Some(edit.text_at(ast.pos(f), ast.end(f)).to_string())
}

fn is_struct_or_array_literal(pkg: &Package, edit: &EditBuffer, x: NodeId) -> Option<String> {
    let ast = &pkg.ast;
    let NodeKind::CompositeLit { ty: Some(ty), elts } = ast.kind(x) else {
        return None;
    };
    if !elts.is_empty() {
        return None;
    }
    let t = pkg.info.type_of(x)?;
    let under = pkg.info.types.underlying(t);
    match pkg.info.types.kind(under) {
        TypeKind::Struct { .. } | TypeKind::Array { .. } => {
            Some(edit.text_at(ast.pos(*ty), ast.end(*ty)).to_string())
        }
        _ => None,
    }
}

/// Does the expression structurally denote a type?
fn denotes_type(pkg: &Package, x: NodeId) -> bool {
    let ast = &pkg.ast;
    match ast.kind(x) {
        NodeKind::Ident { .. } => pkg
            .info
            .obj_of(x)
            .map(|obj| pkg.info.objs[obj].kind == crate::sema::object::ObjKind::TypeName)
            .unwrap_or(false),
        NodeKind::Paren { x } | NodeKind::Star { x } => denotes_type(pkg, *x),
        NodeKind::ArrayType { .. }
        | NodeKind::MapType { .. }
        | NodeKind::ChanType { .. }
        | NodeKind::StructType { .. }
        | NodeKind::InterfaceType { .. }
        | NodeKind::FuncType { .. } => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{run_source, package_from_source};

    /// All `&` expressions in the package, in source order.
    fn addr_exprs(pkg: &Package) -> Vec<NodeId> {
        let ast = &pkg.ast;
        let mut out = Vec::new();
        for file in &pkg.files {
            for &decl in &file.decls {
                ast.walk(decl, &mut |x| {
                    if let NodeKind::Unary {
                        op: UnOp::Addr,
                        x: operand,
                    } = ast.kind(x)
                    {
                        out.push(*operand);
                    }
                    true
                });
            }
        }
        out
    }

    #[test]
    fn addr_walk_distinguishes_value_and_pointer_paths() {
        let src = "\
package p

type T struct {
	X     int
	Array [4]int
	Slice []int
	Ptr   *T
}

func f() {
	var t T
	_ = &t.X
	_ = &t.Array
	_ = &t.Slice[0]
	_ = &t.Ptr.X
	_ = &(((t).Array)[0])
}
";
        let pkg = package_from_source(src);
        assert!(pkg.types_err.is_none(), "{:?}", pkg.types_err);
        let addrs = addr_exprs(&pkg);
        assert_eq!(addrs.len(), 5);
        // &t.X and &t.Array reach t's own storage.
        assert!(addr_of_walk(&pkg, addrs[0]).is_some());
        assert!(addr_of_walk(&pkg, addrs[1]).is_some());
        // &t.Slice[0] indexes through a slice: someone else's storage.
        assert!(addr_of_walk(&pkg, addrs[2]).is_none());
        // &t.Ptr.X selects through a pointer.
        assert!(addr_of_walk(&pkg, addrs[3]).is_none());
        // Parenthesized array indexing still reaches t.
        assert!(addr_of_walk(&pkg, addrs[4]).is_some());
    }

    #[test]
    fn define_initializer_is_not_an_eligible_site() {
        // `j := 0` cannot also declare i, so the declaration stays put.
        let src = "\
package p

func f() {
	var i int
	for j := 0; j < 3; j++ {
		i = j
		use(i)
	}
}

func use(x interface{}) {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert_eq!(out, src);
    }

    #[test]
    fn rhs_reference_blocks_merge() {
        // `i = i + 1` reads the variable; turning it into := would change
        // which i the right side means.
        let src = "\
package p

func f() {
	var i int
	i = i + 1
	use(i)
}

func use(x interface{}) {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert_eq!(out, src);
    }

    #[test]
    fn multi_name_declarations_are_declined() {
        let src = "\
package p

func f() {
	var i, j int
	i = 1
	j = 2
	use(i)
	use(j)
}

func use(x interface{}) {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert_eq!(out, src);
    }

    #[test]
    fn closure_captured_variables_stay() {
        let src = "\
package p

func f() {
	var i int
	g := func() {
		i = 1
	}
	g()
	use(i)
}

func use(x interface{}) {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert_eq!(out, src);
    }

    #[test]
    fn declaration_merges_into_first_assignment() {
        let src = "\
package p

func f() {
	var s string
	g()
	s = \"hello\"
	use(s)
}

func g() {}

func use(x interface{}) {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert!(out.contains("s := \"hello\""), "{out}");
        assert!(!out.contains("var s string"), "{out}");
    }
}

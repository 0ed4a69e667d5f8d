//! Reduced control-flow graphs over the AST.
//!
//! The builder works in reverse: `follow(x, out)` computes the successor
//! list for `x` given the successors `out` that would apply after it, so a
//! statement sequence reduces right to left and loops tie their back-edges
//! by passing the header as its own successor. Logical operators are
//! short-circuited structurally — `a && b` turns into two successor edges
//! out of `a` — but their operands are never constant-folded away: a path
//! that is statically dead still stays in the graph, so no rewrite can
//! rely on folding to delete code that must keep compiling.
//!
//! After construction, trimming drops every node the caller's `interesting`
//! predicate rejects, splicing its successors into its predecessors.
//! Labeled statements that are goto targets are kept regardless, because
//! jump edges land on them.
//!
//! The two sentinels `start` and `end` are ids just past the AST arena:
//! unique, stable, and never equal to a real node.

use std::collections::{HashMap, HashSet};

use crate::entity::EntityRef;
use crate::syntax::ast::{Ast, BinOp, BranchTok, NodeId, NodeKind, UnOp};
use crate::syntax::token::FileSet;

pub struct Graph {
    pub start: NodeId,
    pub end: NodeId,
    /// Node → ordered, duplicate-free successor list.
    pub follow: HashMap<NodeId, Vec<NodeId>>,
}

/// A forward dataflow computation driven by [`Graph::dataflow`].
pub trait Computation {
    /// Seed the entry state.
    fn init(&mut self, start: NodeId);
    /// Compute `out[x]` from `in[x]`.
    fn transfer(&mut self, x: NodeId);
    /// Fold `out[y]` into `in[x]`; report whether `in[x]` grew.
    fn join(&mut self, x: NodeId, y: NodeId) -> bool;
}

impl Graph {
    /// Work-list forward fixpoint. A successor is re-queued when joining
    /// into it grew its in-state, or when it has never been transferred —
    /// the first visit is itself a change from the implicit bottom state.
    /// Terminates for any monotone computation over a finite-height
    /// lattice; no visit order is promised beyond round-based fairness.
    pub fn dataflow(&self, compute: &mut dyn Computation) {
        compute.init(self.start);
        let mut transferred = HashSet::new();
        let mut workq = vec![self.start];
        let mut nextq = Vec::new();
        while !workq.is_empty() {
            for &x in &workq {
                compute.transfer(x);
                transferred.insert(x);
                if let Some(succs) = self.follow.get(&x) {
                    for &y in succs {
                        if compute.join(y, x) || !transferred.contains(&y) {
                            nextq.push(y);
                        }
                    }
                }
            }
            std::mem::swap(&mut workq, &mut nextq);
            nextq.clear();
        }
    }

    /// All nodes reachable from `start`, in depth-first order.
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.start];
        while let Some(x) = stack.pop() {
            if !seen.insert(x) {
                continue;
            }
            order.push(x);
            if let Some(succs) = self.follow.get(&x) {
                for &y in succs.iter().rev() {
                    stack.push(y);
                }
            }
        }
        order
    }

    /// Render the reachable subgraph for debugging and tests.
    pub fn dump(&self, ast: &Ast, fset: &FileSet) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for x in self.reachable() {
            let _ = write!(out, "{}:", self.label(ast, fset, x));
            if let Some(succs) = self.follow.get(&x) {
                for &y in succs {
                    let _ = write!(out, " {}", self.label(ast, fset, y));
                }
            }
            let _ = writeln!(out);
        }
        out
    }

    fn label(&self, ast: &Ast, fset: &FileSet, x: NodeId) -> String {
        if x == self.start {
            return "_start_".to_string();
        }
        if x == self.end {
            return "_end_".to_string();
        }
        let pos = fset.position(ast.pos(x));
        match ast.kind(x) {
            NodeKind::Ident { name } => format!("{name}@{}", pos.line),
            NodeKind::Assign { .. } => format!("assign@{}", pos.line),
            NodeKind::IncDec { .. } => format!("incdec@{}", pos.line),
            NodeKind::Labeled { label, .. } => {
                format!("{}:@{}", ast.ident_name(*label), pos.line)
            }
            _ => format!("node@{}", pos.line),
        }
    }
}

/// Build the CFG of `body`, keeping only nodes `interesting` accepts
/// (plus goto-target labels, which jump edges need).
pub fn build(ast: &Ast, body: NodeId, interesting: &dyn Fn(NodeId) -> bool) -> Graph {
    let start = NodeId::new(ast.len() as u32);
    let end = NodeId::new(ast.len() as u32 + 1);
    let mut b = Builder {
        ast,
        interesting,
        follow: HashMap::new(),
        end,
        need: HashSet::new(),
        trimmed: HashSet::new(),
        followed: HashSet::new(),
        brk: Vec::new(),
        cont: Vec::new(),
        fall: Vec::new(),
        brk_label: HashMap::new(),
        cont_label: HashMap::new(),
        goto_label: HashMap::new(),
        is_goto_target: HashSet::new(),
        stmt_label: HashMap::new(),
    };

    b.scan_goto(body);
    let f = b.follow(Some(body), vec![end]);
    let trimmed = b.trim_list(&f);
    b.follow.insert(start, trimmed);
    Graph {
        start,
        end,
        follow: b.follow,
    }
}

struct Builder<'a> {
    ast: &'a Ast,
    interesting: &'a dyn Fn(NodeId) -> bool,
    follow: HashMap<NodeId, Vec<NodeId>>,
    end: NodeId,
    need: HashSet<NodeId>,
    trimmed: HashSet<NodeId>,
    followed: HashSet<NodeId>,
    brk: Vec<NodeId>,
    cont: Vec<NodeId>,
    fall: Vec<NodeId>,
    brk_label: HashMap<String, Vec<NodeId>>,
    cont_label: HashMap<String, Vec<NodeId>>,
    goto_label: HashMap<String, NodeId>,
    is_goto_target: HashSet<String>,
    stmt_label: HashMap<NodeId, String>,
}

fn mergef(l1: Vec<NodeId>, l2: Vec<NodeId>) -> Vec<NodeId> {
    if l1.is_empty() {
        return l2;
    }
    if l2.is_empty() {
        return l1;
    }
    let mut out = Vec::with_capacity(l1.len() + l2.len());
    let mut seen = HashSet::new();
    for x in l1 {
        if seen.insert(x) {
            out.push(x);
        }
    }
    for x in l2 {
        if seen.insert(x) {
            out.push(x);
        }
    }
    out
}

impl<'a> Builder<'a> {
    fn scan_goto(&mut self, x: NodeId) {
        match self.ast.kind(x) {
            NodeKind::Labeled { label, .. } => {
                self.goto_label
                    .insert(self.ast.ident_name(*label).to_string(), x);
            }
            NodeKind::Branch {
                tok: BranchTok::Goto,
                label: Some(label),
            } => {
                self.is_goto_target
                    .insert(self.ast.ident_name(*label).to_string());
            }
            _ => {}
        }
        for c in self.ast.children(x) {
            self.scan_goto(c);
        }
    }

    fn trim_list(&mut self, list: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &x in list {
            out = mergef(out, self.trim(x));
        }
        out
    }

    fn trim(&mut self, x: NodeId) -> Vec<NodeId> {
        if !self.trimmed.contains(&x) {
            self.trimmed.insert(x);
            let fol = self.follow.get(&x).cloned().unwrap_or_default();
            // Publish a self-edge while recursing so cycles terminate.
            self.follow.insert(x, vec![x]);
            let t = self.trim_list(&fol);
            self.follow.insert(x, t);
        }
        if !self.need.contains(&x) && !self.follow[&x].is_empty() {
            return self.follow[&x].clone();
        }
        vec![x]
    }

    fn follow_cond(&mut self, cond: NodeId, btrue: Vec<NodeId>, bfalse: Vec<NodeId>) -> Vec<NodeId> {
        // Deliberately no constant folding: folding the condition could
        // delete code that the rewritten source still has to compile.
        match self.ast.kind(cond).clone() {
            NodeKind::Binary {
                op: BinOp::LAnd,
                x,
                y,
            } => {
                let inner = self.follow_cond(y, btrue, bfalse.clone());
                self.follow_cond(x, inner, bfalse)
            }
            NodeKind::Binary {
                op: BinOp::LOr,
                x,
                y,
            } => {
                let inner = self.follow_cond(y, btrue.clone(), bfalse);
                self.follow_cond(x, btrue, inner)
            }
            NodeKind::Unary { op: UnOp::Not, x } => self.follow_cond(x, bfalse, btrue),
            NodeKind::Paren { x } => self.follow_cond(x, btrue, bfalse),
            _ => {
                let merged = mergef(btrue, bfalse);
                self.follow(Some(cond), merged)
            }
        }
    }

    fn add_node(&mut self, x: NodeId, out: Vec<NodeId>) -> Vec<NodeId> {
        self.follow.insert(x, out.clone());
        if !self.need.contains(&x) && !(self.interesting)(x) {
            return out;
        }
        self.need.insert(x);
        vec![x]
    }

    fn previsit(&mut self, x: NodeId, mut out: Vec<NodeId>) -> Vec<NodeId> {
        let list = self.ast.children(x);
        for &c in list.iter().rev() {
            out = self.follow(Some(c), out);
        }
        self.add_node(x, out)
    }

    fn postvisit(&mut self, x: NodeId, out: Vec<NodeId>) -> Vec<NodeId> {
        let mut out = self.add_node(x, out);
        let list = self.ast.children(x);
        for &c in list.iter().rev() {
            out = self.follow(Some(c), out);
        }
        out
    }

    fn follow_list(&mut self, list: &[NodeId], mut out: Vec<NodeId>) -> Vec<NodeId> {
        for &x in list.iter().rev() {
            out = self.follow(Some(x), out);
        }
        out
    }

    fn follow(&mut self, x: Option<NodeId>, out: Vec<NodeId>) -> Vec<NodeId> {
        let x = match x {
            Some(x) => x,
            None => return out,
        };
        if !self.ast.is_expr(x) && !self.ast.is_stmt(x) {
            return out;
        }

        if !self.followed.insert(x) {
            panic!("flow: node already followed");
        }

        if self.ast.is_expr(x) {
            if let NodeKind::Binary { op, x: bx, y: by } = self.ast.kind(x) {
                let (op, bx, by) = (*op, *bx, *by);
                match op {
                    BinOp::LAnd => {
                        let inner = self.follow(Some(by), out.clone());
                        return self.follow_cond(bx, inner, out);
                    }
                    BinOp::LOr => {
                        let inner = self.follow(Some(by), out.clone());
                        return self.follow_cond(bx, out, inner);
                    }
                    _ => {}
                }
            }
            return self.postvisit(x, out);
        }

        match self.ast.kind(x).clone() {
            NodeKind::Branch { tok, label } => match tok {
                BranchTok::Break => match label {
                    Some(l) => self
                        .brk_label
                        .get(self.ast.ident_name(l))
                        .cloned()
                        .unwrap_or_default(),
                    None => self.brk.clone(),
                },
                BranchTok::Continue => match label {
                    Some(l) => self
                        .cont_label
                        .get(self.ast.ident_name(l))
                        .cloned()
                        .unwrap_or_default(),
                    None => self.cont.clone(),
                },
                BranchTok::Goto => match label
                    .and_then(|l| self.goto_label.get(self.ast.ident_name(l)))
                {
                    Some(&target) => vec![target],
                    None => Vec::new(),
                },
                BranchTok::Fallthrough => self.fall.clone(),
            },

            NodeKind::Labeled { label, stmt, .. } => {
                let name = self.ast.ident_name(label).to_string();
                self.stmt_label.insert(stmt, name.clone());
                let out = self.follow(Some(stmt), out);
                if self.is_goto_target.contains(&name) {
                    self.add_node(x, out)
                } else {
                    out
                }
            }

            NodeKind::For {
                init,
                cond,
                post,
                body,
            } => {
                let old_brk = std::mem::replace(&mut self.brk, out.clone());
                let old_cont = std::mem::take(&mut self.cont);
                // The post statement leads back to the loop header; `x`
                // stands in for it until add_node fills its follow.
                self.cont = self.follow(post, vec![x]);
                if let Some(label) = self.stmt_label.get(&x).cloned() {
                    self.brk_label.insert(label.clone(), self.brk.clone());
                    self.cont_label.insert(label, self.cont.clone());
                }
                let bin = self.follow(Some(body), self.cont.clone());
                let cond_out = if cond.is_none() {
                    bin
                } else {
                    mergef(bin, out)
                };
                self.brk = old_brk;
                self.cont = old_cont;
                let inner = self.follow(cond, cond_out);
                let inner = self.add_node(x, inner);
                self.follow(init, inner)
            }

            NodeKind::If {
                cond, body, els, ..
            } => {
                let btrue = self.follow(Some(body), out.clone());
                let bfalse = self.follow(els, out);
                self.follow_cond(cond, btrue, bfalse)
            }

            NodeKind::RangeFor {
                key,
                value,
                x: subject,
                body,
                ..
            } => {
                let old_brk = std::mem::replace(&mut self.brk, out.clone());
                let old_cont = std::mem::replace(&mut self.cont, vec![x]);
                if let Some(label) = self.stmt_label.get(&x).cloned() {
                    self.brk_label.insert(label.clone(), self.brk.clone());
                    self.cont_label.insert(label, self.cont.clone());
                }
                let inner = self.follow(Some(body), self.cont.clone());
                let inner = self.follow(value, inner);
                let inner = self.follow(key, inner);
                let out = self.add_node(x, mergef(inner, out));
                self.brk = old_brk;
                self.cont = old_cont;
                self.follow(Some(subject), out)
            }

            NodeKind::Return { results } => {
                let end = self.end;
                self.follow_list(&results, vec![end])
            }

            NodeKind::Select { cases } => {
                let old_brk = std::mem::replace(&mut self.brk, out.clone());
                if let Some(label) = self.stmt_label.get(&x).cloned() {
                    self.brk_label.insert(label, self.brk.clone());
                }
                let mut all_cas_out = Vec::new();
                for &case in &cases {
                    if let NodeKind::Comm { comm, body, .. } = self.ast.kind(case).clone() {
                        let mut cas_out = self.follow_list(&body, out.clone());
                        // Receive targets are assigned when the case fires.
                        if let Some(comm) = comm {
                            if let NodeKind::Assign { lhs, .. } = self.ast.kind(comm).clone() {
                                for &l in lhs.iter().rev() {
                                    cas_out = self.follow(Some(l), cas_out);
                                }
                            }
                        }
                        all_cas_out = mergef(all_cas_out, cas_out);
                    }
                }
                // Every communication operand is evaluated up front.
                let mut out = all_cas_out;
                for &case in cases.iter().rev() {
                    if let NodeKind::Comm {
                        comm: Some(comm), ..
                    } = self.ast.kind(case).clone()
                    {
                        match self.ast.kind(comm).clone() {
                            NodeKind::Send { chan, value } => {
                                out = self.follow(Some(value), out);
                                out = self.follow(Some(chan), out);
                            }
                            NodeKind::Assign { rhs, .. } => {
                                out = self.follow(rhs.first().copied(), out);
                            }
                            NodeKind::ExprStmt { x } => {
                                out = self.follow(Some(x), out);
                            }
                            _ => {}
                        }
                    }
                }
                self.brk = old_brk;
                out
            }

            NodeKind::Switch { init, tag, cases } => {
                let old_brk = std::mem::replace(&mut self.brk, out.clone());
                let old_fall = std::mem::take(&mut self.fall);
                if let Some(label) = self.stmt_label.get(&x).cloned() {
                    self.brk_label.insert(label, self.brk.clone());
                }

                // The default clause runs after every case test fails; find
                // it first so the case-test chain can end there. A default
                // body ending in fallthrough continues at the next clause,
                // whose body is not followed yet, so the clause node itself
                // stands in and is pinned into the graph below.
                let mut need_fall: Option<NodeId> = None;
                let mut next_case = out.clone();
                for i in (0..cases.len()).rev() {
                    let case = cases[i];
                    if let NodeKind::Case { values, body, .. } = self.ast.kind(case).clone() {
                        if values.is_empty() {
                            if let Some(&last) = body.last() {
                                if is_fallthrough(self.ast, last) && i + 1 < cases.len() {
                                    need_fall = Some(cases[i + 1]);
                                    self.fall = vec![cases[i + 1]];
                                }
                            }
                            next_case = self.follow_list(&body, out.clone());
                        }
                    }
                }

                for i in (0..cases.len()).rev() {
                    let case = cases[i];
                    if let NodeKind::Case { values, body, .. } = self.ast.kind(case).clone() {
                        if values.is_empty() {
                            continue;
                        }
                        let mut cas_out = self.follow_list(&body, out.clone());
                        if Some(case) == need_fall {
                            cas_out = self.add_node(case, cas_out);
                        }
                        self.fall = cas_out.clone();
                        for &v in values.iter().rev() {
                            let merged = mergef(next_case, cas_out.clone());
                            next_case = self.follow(Some(v), merged);
                        }
                    }
                }

                self.brk = old_brk;
                self.fall = old_fall;
                let head = self.follow(tag, next_case);
                self.follow(init, head)
            }

            NodeKind::TypeSwitch {
                init,
                assign,
                cases,
            } => {
                // Simpler than a value switch: no fallthrough, and the case
                // values are types, not executable expressions.
                let old_brk = std::mem::replace(&mut self.brk, out.clone());
                if let Some(label) = self.stmt_label.get(&x).cloned() {
                    self.brk_label.insert(label, self.brk.clone());
                }
                let mut all_cas_out = Vec::new();
                let mut default_out = out.clone();
                for i in (0..cases.len()).rev() {
                    let case = cases[i];
                    if let NodeKind::Case { values, body, .. } = self.ast.kind(case).clone() {
                        if values.is_empty() {
                            default_out = Vec::new();
                        }
                        let cas_out = self.follow_list(&body, out.clone());
                        all_cas_out = mergef(all_cas_out, cas_out);
                    }
                }
                self.brk = old_brk;
                let head = self.follow(Some(assign), mergef(all_cas_out, default_out));
                self.follow(init, head)
            }

            // Declaration initializers are evaluated in flow; the names
            // they bind are not uses, so only the value expressions are
            // followed.
            NodeKind::DeclStmt { decl } => {
                let mut values = Vec::new();
                if let NodeKind::GenDecl { specs, .. } = self.ast.kind(decl) {
                    for &spec in specs {
                        if let NodeKind::ValueSpec { values: vs, .. } = self.ast.kind(spec) {
                            values.extend_from_slice(vs);
                        }
                    }
                }
                let mut out = out;
                for &v in values.iter().rev() {
                    out = self.follow(Some(v), out);
                }
                self.add_node(x, out)
            }

            _ => self.previsit(x, out),
        }
    }
}

fn is_fallthrough(ast: &Ast, x: NodeId) -> bool {
    matches!(
        ast.kind(ast.unlabel(x)),
        NodeKind::Branch {
            tok: BranchTok::Fallthrough,
            ..
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_file;
    use crate::syntax::{Ast, FileSet};
    use std::path::Path;

    fn build_for(src: &str) -> (FileSet, Ast, Graph) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let file =
            parse_file(&mut fset, &mut ast, Path::new("t.go"), src.to_string()).unwrap();
        let mut body = None;
        for &d in &file.decls {
            if let NodeKind::FuncDecl { body: Some(b), .. } = ast.kind(d) {
                body = Some(*b);
            }
        }
        let graph = {
            let ast_ref = &ast;
            build(ast_ref, body.unwrap(), &|x| {
                matches!(
                    ast_ref.kind(x),
                    NodeKind::Ident { .. } | NodeKind::Assign { .. }
                )
            })
        };
        (fset, ast, graph)
    }

    fn ident_nodes(ast: &Ast, g: &Graph, name: &str) -> Vec<NodeId> {
        g.reachable()
            .into_iter()
            .filter(|&x| {
                x != g.start
                    && x != g.end
                    && matches!(ast.kind(x), NodeKind::Ident { name: n } if n == name)
            })
            .collect()
    }

    /// Transitive reachability from `from` (excluding the zero-length path).
    fn reaches(g: &Graph, from: NodeId, to: NodeId) -> bool {
        let mut seen = std::collections::HashSet::new();
        let mut stack: Vec<NodeId> = g.follow.get(&from).cloned().unwrap_or_default();
        while let Some(x) = stack.pop() {
            if x == to {
                return true;
            }
            if seen.insert(x) {
                stack.extend(g.follow.get(&x).cloned().unwrap_or_default());
            }
        }
        false
    }

    #[test]
    fn straight_line_order() {
        let (_, ast, g) = build_for("package p\n\nfunc f() {\n\ta()\n\tb()\n}\n");
        let a = ident_nodes(&ast, &g, "a")[0];
        let b = ident_nodes(&ast, &g, "b")[0];
        assert!(reaches(&g, g.start, a));
        assert!(reaches(&g, a, b));
        assert!(!reaches(&g, b, a));
        assert!(reaches(&g, b, g.end));
    }

    #[test]
    fn if_else_both_reach_end() {
        let (_, ast, g) =
            build_for("package p\n\nfunc f() {\n\tif c {\n\t\ta()\n\t} else {\n\t\tb()\n\t}\n}\n");
        let c = ident_nodes(&ast, &g, "c")[0];
        let a = ident_nodes(&ast, &g, "a")[0];
        let b = ident_nodes(&ast, &g, "b")[0];
        assert!(g.follow[&c].contains(&a));
        assert!(g.follow[&c].contains(&b));
        assert!(reaches(&g, a, g.end));
        assert!(reaches(&g, b, g.end));
    }

    #[test]
    fn short_circuit_and() {
        let (_, ast, g) = build_for(
            "package p\n\nfunc f() {\n\tif a && b {\n\t\tt()\n\t} else {\n\t\te()\n\t}\n}\n",
        );
        let a = ident_nodes(&ast, &g, "a")[0];
        let b = ident_nodes(&ast, &g, "b")[0];
        let t = ident_nodes(&ast, &g, "t")[0];
        let e = ident_nodes(&ast, &g, "e")[0];
        // a falls to b on true and straight to the else branch on false.
        assert!(g.follow[&a].contains(&b));
        assert!(g.follow[&a].contains(&e));
        assert!(!g.follow[&a].contains(&t));
        assert!(g.follow[&b].contains(&t));
        assert!(g.follow[&b].contains(&e));
    }

    #[test]
    fn for_loop_has_back_edge() {
        let (_, ast, g) = build_for(
            "package p\n\nfunc f() {\n\tfor i = 0; i < 10; i++ {\n\t\tuse(i)\n\t}\n\tafter()\n}\n",
        );
        let is = ident_nodes(&ast, &g, "i");
        assert!(!is.is_empty());
        // Some i-node inside the loop reaches itself (the back edge).
        assert!(is.iter().any(|&i| reaches(&g, i, i)));
        let after = ident_nodes(&ast, &g, "after")[0];
        assert!(reaches(&g, g.start, after));
    }

    #[test]
    fn infinite_loop_does_not_reach_end() {
        let (_, _, g) = build_for("package p\n\nfunc f() {\n\tfor {\n\t\tspin()\n\t}\n}\n");
        assert!(!reaches(&g, g.start, g.end));
    }

    #[test]
    fn break_escapes_loop() {
        let (_, ast, g) = build_for(
            "package p\n\nfunc f() {\n\tfor {\n\t\tif c {\n\t\t\tbreak\n\t\t}\n\t\tspin()\n\t}\n\tafter()\n}\n",
        );
        let after = ident_nodes(&ast, &g, "after")[0];
        let c = ident_nodes(&ast, &g, "c")[0];
        assert!(g.follow[&c].contains(&after));
        assert!(reaches(&g, g.start, after));
    }

    #[test]
    fn goto_edges_land_on_labels() {
        let (_, ast, g) = build_for(
            "package p\n\nfunc f() {\n\ta()\n\tgoto L\n\tdead()\nL:\n\tz()\n}\n",
        );
        let a = ident_nodes(&ast, &g, "a")[0];
        let z = ident_nodes(&ast, &g, "z")[0];
        assert!(reaches(&g, a, z));
        // The statement after the goto is unreachable.
        assert!(ident_nodes(&ast, &g, "dead").is_empty());
    }

    #[test]
    fn switch_fallthrough_chains_clauses() {
        let (_, ast, g) = build_for(
            "package p\n\nfunc f(x int) {\n\tswitch x {\n\tcase 1:\n\t\ta()\n\t\tfallthrough\n\tcase 2:\n\t\tb()\n\t}\n}\n",
        );
        let a = ident_nodes(&ast, &g, "a")[0];
        let b = ident_nodes(&ast, &g, "b")[0];
        assert!(reaches(&g, a, b));
    }

    #[test]
    fn select_branches_join() {
        let (_, ast, g) = build_for(
            "package p\n\nfunc f(ch chan int) {\n\tselect {\n\tcase v := <-ch:\n\t\tuse(v)\n\tdefault:\n\t\tother()\n\t}\n\tafter()\n}\n",
        );
        let after = ident_nodes(&ast, &g, "after")[0];
        let usen = ident_nodes(&ast, &g, "use")[0];
        let other = ident_nodes(&ast, &g, "other")[0];
        assert!(reaches(&g, usen, after));
        assert!(reaches(&g, other, after));
    }

    #[test]
    fn no_duplicate_successors() {
        let (_, _, g) = build_for(
            "package p\n\nfunc f() {\n\tif a || b || c {\n\t\tt()\n\t}\n\tu()\n}\n",
        );
        for (_, succs) in &g.follow {
            let set: std::collections::HashSet<_> = succs.iter().collect();
            assert_eq!(set.len(), succs.len(), "duplicate successor");
        }
    }
}

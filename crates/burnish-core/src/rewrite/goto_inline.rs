//! Goto inlining.
//!
//! A goto whose target block is reachable only through that goto (or whose
//! target is a lone return) can be replaced by a copy of the target code,
//! after which the original target is deleted. The target block is the run
//! of statements from the label through the first terminating statement,
//! or up to the next goto target — in which case the copy ends with a
//! synthesized jump there. A target that falls off the end of the
//! function's top-level list gets a synthesized return.
//!
//! Moving code is only safe when every identifier in it still resolves to
//! the same object at the destination, so the pass declines entirely when
//! type information is unavailable, and declines per-goto when any
//! identifier would change meaning.
//!
//! At most one label is rewritten per invocation: the moved code may
//! itself contain gotos, and those need fresh positions before they can be
//! considered.

use std::collections::HashSet;

use crate::analysis::block::{self, BlockTree};
use crate::edit::EditBuffer;
use crate::rewrite::{
    for_each_func, is_goto_target, is_terminating_stmt, Context, Package, Pass,
};
use crate::sema::object::{ObjId, ObjKind};
use crate::syntax::ast::{NodeId, NodeKind};
use crate::syntax::token::Pos;

pub struct GotoInline;

impl Pass for GotoInline {
    fn name(&self) -> &'static str {
        "goto-inline"
    }

    fn run(&self, ctxt: &mut Context, pkg: &mut Package) {
        for_each_func(ctxt, pkg, rewrite_func);
    }
}

struct TargetBlock {
    comment: Pos,
    start: Pos,
    end_label: Pos,
    end: Pos,
    code: String,
    need_return: bool,
    need_goto: Option<String>,
    short: bool,
    dead: bool,
    objs: Vec<ObjId>,
}

fn rewrite_func(_ctxt: &mut Context, pkg: &Package, edit: &mut EditBuffer, fn_decl: NodeId) {
    if pkg.types_err.is_some() {
        // Without scoping information, code moves cannot be shown safe.
        tracing::debug!(
            "{}: cannot inline gotos without type information",
            pkg.import_path
        );
        return;
    }
    let body = match pkg.ast.kind(fn_decl) {
        NodeKind::FuncDecl { body: Some(b), .. } => *b,
        _ => return,
    };
    let tree = block::build(&pkg.ast, body);
    let ast = &pkg.ast;

    // Deterministic order: labels by position of their definition.
    let mut labels: Vec<&String> = tree.goto_uses.keys().collect();
    labels.sort_by_key(|name| tree.label.get(*name).map(|&l| ast.pos(l)));

    for labelname in labels {
        let gotos = &tree.goto_uses[labelname];
        let Some(target) = find_target_block(pkg, edit, fn_decl, body, &tree, labelname) else {
            continue;
        };
        if !((gotos.len() == 1 && target.dead) || target.short) {
            continue;
        }
        let mut num_replaced = 0;
        for &g in gotos {
            if !objs_match(
                pkg,
                fn_decl,
                ast.pos(g),
                &target.objs,
                target.start,
                target.end,
            ) {
                // Needed identifiers mean something else here.
                continue;
            }
            let mut code = format!(
                "{}{}",
                edit.text_at(target.comment, target.start),
                target.code
            );
            if target.need_return {
                if code.trim().is_empty() {
                    code = "return".to_string();
                } else {
                    code.push_str("; return");
                }
            }
            if let Some(next) = &target.need_goto {
                if code.trim().is_empty() {
                    code = format!("goto {next}");
                } else {
                    code.push_str("; goto ");
                    code.push_str(next);
                }
            }
            edit.replace(ast.pos(g), ast.end(g), code);
            num_replaced += 1;
        }
        if num_replaced == gotos.len() {
            if gotos.len() == 1 && target.dead {
                edit.delete(target.comment, target.end);
            } else {
                edit.delete_line(target.start, target.end_label);
            }
        }
        // The moved code may itself contain gotos to inline; those need
        // recomputed positions, so stop after the first change.
        if num_replaced > 0 {
            return;
        }
    }
}

fn find_target_block(
    pkg: &Package,
    edit: &EditBuffer,
    fn_decl: NodeId,
    body: NodeId,
    tree: &BlockTree,
    labelname: &str,
) -> Option<TargetBlock> {
    let ast = &pkg.ast;
    let &lstmt = tree.label.get(labelname)?;
    let lblock = *tree.map.get(&lstmt)?;
    let root = tree.block(lblock).root?;
    let list = ast.block_list(root)?.to_vec();

    let colon = match ast.kind(lstmt) {
        NodeKind::Labeled { colon, .. } => *colon,
        _ => return None,
    };

    let ulstmt = ast.unlabel(lstmt);
    let i = list.iter().position(|&s| ast.unlabel(s) == ulstmt)?;

    // Extent of the target block.
    let mut need_return = false;
    let mut need_goto = None;
    let mut end = i;
    loop {
        if end >= list.len() {
            // List ended without a terminating statement. Unless this is
            // the top-level block, the code cannot be hoisted.
            if root != body {
                return None;
            }
            need_return = true;
            break;
        }
        if end > i && is_goto_target(ast, tree, list[end]) {
            if let NodeKind::Labeled { label, .. } = ast.kind(list[end]) {
                need_goto = Some(ast.ident_name(*label).to_string());
            }
            break;
        }
        if is_terminating_stmt(ast, tree, list[end]) {
            end += 1;
            break;
        }
        end += 1;
    }
    if end <= i {
        return None;
    }

    let start = ast.pos(lstmt);
    let endp = edit.end_of(ast, list[end - 1]);
    let inner = ast.unlabel(list[i]);
    let mut target = TargetBlock {
        comment: edit.before_comments(start),
        start,
        end_label: colon.offset(1),
        end: endp,
        code: edit.text_at(colon.offset(1), endp).trim().to_string(),
        need_return,
        need_goto,
        short: end == i + 1
            && (matches!(ast.kind(inner), NodeKind::Return { .. })
                || matches!(ast.kind(inner), NodeKind::Empty { .. }) && need_return),
        dead: i > 0 && is_terminating_stmt(ast, tree, list[i - 1]),
        objs: gather_objs(pkg, fn_decl, &list[i..end]),
    };
    if target.need_return {
        // The synthesized bare return reads any named results.
        add_named_results(pkg, fn_decl, &mut target.objs);
    }
    Some(target)
}

/// Every object the target code refers to, excluding labels and field
/// selectors. A bare return also reads the function's named results.
fn gather_objs(pkg: &Package, fn_decl: NodeId, stmts: &[NodeId]) -> Vec<ObjId> {
    let ast = &pkg.ast;
    let mut seen = HashSet::new();
    let mut objs = Vec::new();
    let mut ignore: HashSet<NodeId> = HashSet::new();
    for &stmt in stmts {
        ast.walk(stmt, &mut |x| {
            match ast.kind(x) {
                NodeKind::Selector { sel, .. } => {
                    ignore.insert(*sel);
                }
                NodeKind::Ident { .. } => {
                    if !ignore.contains(&x) {
                        if let Some(&obj) = pkg.info.uses.get(&x) {
                            if pkg.info.objs[obj].kind != ObjKind::Label && seen.insert(obj) {
                                objs.push(obj);
                            }
                        }
                    }
                }
                NodeKind::Return { results } if results.is_empty() => {
                    let mut named = Vec::new();
                    add_named_results_into(pkg, fn_decl, &mut named);
                    for obj in named {
                        if seen.insert(obj) {
                            objs.push(obj);
                        }
                    }
                }
                _ => {}
            }
            true
        });
    }
    objs
}

fn add_named_results(pkg: &Package, fn_decl: NodeId, objs: &mut Vec<ObjId>) {
    let mut named = Vec::new();
    add_named_results_into(pkg, fn_decl, &mut named);
    for obj in named {
        if !objs.contains(&obj) {
            objs.push(obj);
        }
    }
}

fn add_named_results_into(pkg: &Package, fn_decl: NodeId, out: &mut Vec<ObjId>) {
    let ast = &pkg.ast;
    let ty = match ast.kind(fn_decl) {
        NodeKind::FuncDecl { ty, .. } => *ty,
        _ => return,
    };
    if let NodeKind::FuncType { results, .. } = ast.kind(ty) {
        for &field in results {
            if let NodeKind::Field { names, .. } = ast.kind(field) {
                for &name in names {
                    if let Some(&obj) = pkg.info.defs.get(&name) {
                        out.push(obj);
                    }
                }
            }
        }
    }
}

/// At `pos`, does every gathered object still resolve to itself? Objects
/// declared inside the moved range travel with the code and always match.
fn objs_match(
    pkg: &Package,
    fn_decl: NodeId,
    pos: Pos,
    objs: &[ObjId],
    start: Pos,
    end: Pos,
) -> bool {
    for &obj in objs {
        let o = &pkg.info.objs[obj];
        if start < o.pos && o.pos < end {
            continue;
        }
        if pkg.info.lookup_at_pos(&pkg.ast, fn_decl, pos, &o.name) != Some(obj) {
            tracing::debug!("goto inline: {} resolves differently at target", o.name);
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::rewrite::run_source;

    #[test]
    fn lone_goto_to_dead_block_inlines() {
        let src = "\
package p

var c bool

func f() {
	if c {
		goto Fail
	}
	return
Fail:
	cleanup()
	panic(\"failed\")
}

func cleanup() {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert!(!out.contains("goto"), "{out}");
        assert!(!out.contains("Fail:"), "{out}");
        assert!(out.contains("cleanup()"), "{out}");
    }

    #[test]
    fn two_gotos_to_long_dead_block_stay() {
        // Inlining a multi-statement block at two sites would duplicate
        // code; only a single goto may absorb a dead target.
        let src = "\
package p

var a bool
var b bool

func f() {
	if a {
		goto Fail
	}
	if b {
		goto Fail
	}
	return
Fail:
	cleanup()
	panic(\"failed\")
}

func cleanup() {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert_eq!(out, src);
    }

    #[test]
    fn shadowed_identifier_blocks_inlining() {
        let src = "\
package p

var c bool

func f() {
	n := 1
	if c {
		var n string
		_ = n
		goto Out
	}
	return
Out:
	use(n)
	return
}

func use(x interface{}) {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert_eq!(out, src);
    }

    #[test]
    fn live_target_with_one_goto_stays() {
        // The target is reachable by falling through, so replacing the
        // goto would duplicate live code.
        let src = "\
package p

var c bool

func f() {
	if c {
		goto Tail
	}
	step()
Tail:
	finish()
	done()
}

func step() {}

func finish() {}

func done() {}
";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert_eq!(out, src);
    }
}

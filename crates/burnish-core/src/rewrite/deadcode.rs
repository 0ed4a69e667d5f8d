//! Unreachable-statement removal.
//!
//! Inside every statement list, a statement that cannot fall through
//! (a return or a jump) makes everything after it unreachable — up to,
//! but not including, the next statement some goto can still land on.

use crate::analysis::block;
use crate::edit::EditBuffer;
use crate::rewrite::{for_each_func, is_goto_target, Context, Package, Pass};
use crate::syntax::ast::{NodeId, NodeKind};

pub struct DeadCode;

impl Pass for DeadCode {
    fn name(&self) -> &'static str {
        "dead-code"
    }

    fn run(&self, ctxt: &mut Context, pkg: &mut Package) {
        for_each_func(ctxt, pkg, rewrite_func);
    }
}

fn rewrite_func(_ctxt: &mut Context, pkg: &Package, edit: &mut EditBuffer, fn_decl: NodeId) {
    let body = match pkg.ast.kind(fn_decl) {
        NodeKind::FuncDecl { body: Some(b), .. } => *b,
        _ => return,
    };
    let tree = block::build(&pkg.ast, body);
    let ast = &pkg.ast;

    ast.walk(body, &mut |x| {
        let Some(list) = ast.block_list(x) else {
            return true;
        };
        let mut i = 0;
        while i < list.len() {
            if !falls_through(ast, list[i]) {
                // Keep the next goto target: it is still reachable.
                let mut end = i + 1;
                while end < list.len() && !is_goto_target(ast, &tree, list[end]) {
                    end += 1;
                }
                if end > i + 1 {
                    edit.delete(ast.end(list[i]), ast.end(list[end - 1]));
                    i = end - 1;
                }
            }
            i += 1;
        }
        true
    });
}

/// Conservative: only returns and jumps are treated as not falling
/// through here. A terminating if/for/switch after them keeps its code;
/// the classifier in the goto-inlining pass is the one that needs the
/// full rules.
fn falls_through(ast: &crate::syntax::ast::Ast, x: NodeId) -> bool {
    !matches!(
        ast.kind(x),
        NodeKind::Return { .. } | NodeKind::Branch { .. }
    )
}

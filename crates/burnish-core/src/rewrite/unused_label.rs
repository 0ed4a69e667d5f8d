//! Unused-label removal: a label no goto, break, or continue names is
//! deleted, leaving the underlying statement in place.

use crate::analysis::block;
use crate::edit::EditBuffer;
use crate::rewrite::{for_each_func, Context, Package, Pass};
use crate::syntax::ast::{NodeId, NodeKind};

pub struct UnusedLabel;

impl Pass for UnusedLabel {
    fn name(&self) -> &'static str {
        "unused-label"
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
        match ast.kind(x) {
            NodeKind::Labeled { label, colon, .. } => {
                let name = ast.ident_name(*label);
                let uses =
                    tree.goto_count(name) + tree.break_count(name) + tree.continue_count(name);
                if uses == 0 {
                    edit.delete_line(ast.pos(x), colon.offset(1));
                }
                true
            }
            _ => !ast.is_expr(x),
        }
    });
}

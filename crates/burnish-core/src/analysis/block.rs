//! The lexical block tree.
//!
//! Walks a function body once and records, for every AST node, the
//! innermost enclosing block, plus name-indexed tables of label
//! definitions and the jumps that refer to them. Block ids are dense and
//! assigned in pre-order; id 0 is the synthetic root.

use std::collections::HashMap;

use crate::define_entity;
use crate::entity::PrimaryMap;
use crate::syntax::ast::{Ast, BranchTok, NodeId, NodeKind};
use crate::syntax::token::FileSet;

define_entity!(BlockId);

#[derive(Debug)]
pub struct Block {
    pub depth: u32,
    pub parent: Option<BlockId>,
    pub children: Vec<BlockId>,
    /// The AST node that opened this block; `None` for the root.
    pub root: Option<NodeId>,
}

#[derive(Debug)]
pub struct BlockTree {
    blocks: PrimaryMap<BlockId, Block>,
    pub start: BlockId,
    /// AST node → innermost enclosing block.
    pub map: HashMap<NodeId, BlockId>,
    /// Label name → labeled statement defining it.
    pub label: HashMap<String, NodeId>,
    /// Label name → goto statements naming it, in source order.
    pub goto_uses: HashMap<String, Vec<NodeId>>,
    /// Label name → labeled `break` statements naming it.
    pub break_uses: HashMap<String, Vec<NodeId>>,
    /// Label name → labeled `continue` statements naming it.
    pub continue_uses: HashMap<String, Vec<NodeId>>,
}

impl BlockTree {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn goto_count(&self, label: &str) -> usize {
        self.goto_uses.get(label).map(|v| v.len()).unwrap_or(0)
    }

    pub fn break_count(&self, label: &str) -> usize {
        self.break_uses.get(label).map(|v| v.len()).unwrap_or(0)
    }

    pub fn continue_count(&self, label: &str) -> usize {
        self.continue_uses.get(label).map(|v| v.len()).unwrap_or(0)
    }

    /// Render the tree for golden comparisons.
    pub fn dump(&self, ast: &Ast, fset: &FileSet) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        // Pre-order, children in insertion order.
        fn visit(tree: &BlockTree, ast: &Ast, fset: &FileSet, id: BlockId, out: &mut String) {
            let b = tree.block(id);
            let _ = write!(out, "{}: depth={}", id_index(id), b.depth);
            if let Some(parent) = b.parent {
                let _ = write!(out, " parent={}", id_index(parent));
            }
            if !b.children.is_empty() {
                let _ = write!(out, " child=");
                for (i, c) in b.children.iter().enumerate() {
                    if i > 0 {
                        let _ = write!(out, ",");
                    }
                    let _ = write!(out, "{}", id_index(*c));
                }
            }
            if let Some(root) = b.root {
                let pos = fset.position(ast.pos(root));
                let _ = write!(
                    out,
                    " root={} {}:{}",
                    node_kind_name(ast.kind(root)),
                    pos.file.display(),
                    pos.line
                );
            }
            let _ = writeln!(out);
            for &c in &b.children {
                visit(tree, ast, fset, c, out);
            }
        }
        fn id_index(id: BlockId) -> u32 {
            use crate::entity::EntityRef;
            id.index()
        }
        fn node_kind_name(kind: &NodeKind) -> &'static str {
            match kind {
                NodeKind::Block { .. } => "block",
                NodeKind::If { .. } => "if",
                NodeKind::For { .. } => "for",
                NodeKind::RangeFor { .. } => "range",
                NodeKind::Switch { .. } => "switch",
                NodeKind::TypeSwitch { .. } => "typeswitch",
                NodeKind::Case { .. } => "case",
                NodeKind::Comm { .. } => "comm",
                _ => "node",
            }
        }
        visit(self, ast, fset, self.start, &mut out);
        out
    }
}

/// Does this node open a lexical block?
fn opens_block(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Block { .. }
            | NodeKind::If { .. }
            | NodeKind::For { .. }
            | NodeKind::RangeFor { .. }
            | NodeKind::Switch { .. }
            | NodeKind::TypeSwitch { .. }
            | NodeKind::Case { .. }
            | NodeKind::Comm { .. }
    )
}

pub fn build(ast: &Ast, body: NodeId) -> BlockTree {
    let mut blocks = PrimaryMap::new();
    let start = blocks.push(Block {
        depth: 0,
        parent: None,
        children: Vec::new(),
        root: None,
    });
    let mut tree = BlockTree {
        blocks,
        start,
        map: HashMap::new(),
        label: HashMap::new(),
        goto_uses: HashMap::new(),
        break_uses: HashMap::new(),
        continue_uses: HashMap::new(),
    };
    visit(ast, &mut tree, body, start);
    tree
}

fn visit(ast: &Ast, tree: &mut BlockTree, x: NodeId, current: BlockId) {
    tree.map.insert(x, current);

    match ast.kind(x) {
        NodeKind::Labeled { label, .. } => {
            tree.label.insert(ast.ident_name(*label).to_string(), x);
        }
        NodeKind::Branch { tok, label } => {
            if let Some(label) = label {
                let name = ast.ident_name(*label).to_string();
                match tok {
                    BranchTok::Goto => tree.goto_uses.entry(name).or_default().push(x),
                    BranchTok::Break => tree.break_uses.entry(name).or_default().push(x),
                    BranchTok::Continue => tree.continue_uses.entry(name).or_default().push(x),
                    BranchTok::Fallthrough => {}
                }
            } else if *tok == BranchTok::Goto {
                // A goto always carries a label; tolerate the parse anyway.
            }
        }
        _ => {}
    }

    let next = if opens_block(ast.kind(x)) {
        let depth = tree.blocks[current].depth + 1;
        let child = tree.blocks.push(Block {
            depth,
            parent: Some(current),
            children: Vec::new(),
            root: Some(x),
        });
        tree.blocks[current].children.push(child);
        child
    } else {
        current
    };

    for c in ast.children(x) {
        visit(ast, tree, c, next);
    }
}

/// Innermost common ancestor of two blocks.
pub fn common_block(tree: &BlockTree, mut x: BlockId, mut y: BlockId) -> BlockId {
    while tree.block(x).depth > tree.block(y).depth {
        x = tree.block(x).parent.unwrap();
    }
    while tree.block(y).depth > tree.block(x).depth {
        y = tree.block(y).parent.unwrap();
    }
    while x != y {
        x = tree.block(x).parent.unwrap();
        y = tree.block(y).parent.unwrap();
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_file;
    use crate::syntax::{Ast, FileSet};
    use std::path::Path;

    fn build_for(src: &str) -> (FileSet, Ast, BlockTree, NodeId) {
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
        let body = body.unwrap();
        let tree = build(&ast, body);
        (fset, ast, tree, body)
    }

    #[test]
    fn nesting_and_ids_are_preorder() {
        let src = "package p\n\nfunc f() {\n\tif a {\n\t\tx()\n\t}\n\tfor {\n\t\ty()\n\t}\n}\n";
        let (fset, ast, tree, _) = build_for(src);
        let dump = tree.dump(&ast, &fset);
        // Root, body block, if (+its body block), for (+its body block).
        let expected = "\
0: depth=0 child=1
1: depth=1 parent=0 child=2,4 root=block t.go:3
2: depth=2 parent=1 child=3 root=if t.go:4
3: depth=3 parent=2 root=block t.go:4
4: depth=2 parent=1 child=5 root=for t.go:7
5: depth=3 parent=4 root=block t.go:7
";
        assert_eq!(dump, expected);
    }

    #[test]
    fn every_node_maps_into_its_block_span() {
        let src = "package p\n\nfunc f() {\n\tvar i int\n\tfor i = 0; i < 3; i++ {\n\t\tuse(i)\n\t}\n}\n";
        let (_, ast, tree, body) = build_for(src);
        let mut checked = 0;
        ast.walk(body, &mut |x| {
            let b = tree.map.get(&x).copied().expect("node not mapped");
            if let Some(root) = tree.block(b).root {
                let span = ast.span(root);
                assert!(span.contains(ast.pos(x)) || ast.pos(x) == span.start);
            }
            checked += 1;
            true
        });
        assert!(checked > 10);
    }

    #[test]
    fn jump_tables_record_uses() {
        let src = "package p\n\nfunc f() {\nLoop:\n\tfor {\n\t\tif a {\n\t\t\tcontinue Loop\n\t\t}\n\t\tif b {\n\t\t\tbreak Loop\n\t\t}\n\t\tgoto Out\n\t}\nOut:\n\treturn\n}\n";
        let (_, _, tree, _) = build_for(src);
        assert_eq!(tree.goto_count("Out"), 1);
        assert_eq!(tree.break_count("Loop"), 1);
        assert_eq!(tree.continue_count("Loop"), 1);
        assert!(tree.label.contains_key("Loop"));
        assert!(tree.label.contains_key("Out"));
        assert_eq!(tree.goto_count("Loop"), 0);
    }

    #[test]
    fn case_clauses_open_blocks() {
        let src = "package p\n\nfunc f(x int) {\n\tswitch x {\n\tcase 1:\n\t\ta()\n\tdefault:\n\t\tb()\n\t}\n}\n";
        let (_, ast, tree, body) = build_for(src);
        let mut case_blocks = 0;
        ast.walk(body, &mut |x| {
            if matches!(ast.kind(x), NodeKind::Case { .. }) {
                let b = tree.map[&x];
                // The case clause node itself maps to the switch's block;
                // its body statements map to the clause block.
                let children: Vec<_> = ast.children(x);
                for c in children {
                    if ast.is_stmt(c) {
                        assert_ne!(tree.map[&c], b);
                    }
                }
                case_blocks += 1;
            }
            true
        });
        assert_eq!(case_blocks, 2);
    }
}

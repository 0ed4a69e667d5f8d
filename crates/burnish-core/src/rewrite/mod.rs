//! The rewrite driver: package model, pass pipeline, fixpoint loop, and
//! the AST helpers every pass shares.
//!
//! Each driver iteration parses all files, runs the checker, then runs the
//! passes in order. A pass that changes any file restarts the loop so the
//! next pass sees fresh positions and fresh type information. The loop
//! stops on the first clean round. Analyses never survive an iteration;
//! there is no persistent state beyond the source text itself.

pub mod deadcode;
pub mod goto_inline;
pub mod unused_label;
pub mod vardecl;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::analysis::block::BlockTree;
use crate::edit::EditBuffer;
use crate::format::format_source;
use crate::sema::check::{check, TypeInfo};
use crate::syntax::ast::{Ast, BranchTok, File, NodeId, NodeKind};
use crate::syntax::parser::parse_file;
use crate::syntax::token::FileSet;

/// Oscillation backstop for the outer fixpoint; a healthy run needs a
/// handful of iterations.
const MAX_ITERATIONS: usize = 64;

/// Shared run state: the aggregate error flag.
#[derive(Debug, Default)]
pub struct Context {
    pub errors: bool,
}

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    pub fn error(&mut self, msg: impl AsRef<str>) {
        tracing::error!("{}", msg.as_ref());
        self.errors = true;
    }
}

/// One package being rewritten. Syntax, positions, and type information
/// are rebuilt from the current text at the start of every iteration.
pub struct Package {
    pub import_path: String,
    pub filenames: Vec<PathBuf>,
    pub fset: FileSet,
    pub ast: Ast,
    pub files: Vec<File>,
    pub info: TypeInfo,
    /// First checker error, if any. Passes that need trustworthy object
    /// identity decline to run while this is set.
    pub types_err: Option<String>,
    old_src: HashMap<PathBuf, String>,
    new_src: HashMap<PathBuf, String>,
    clean: bool,
}

impl Package {
    fn new(import_path: &str) -> Package {
        Package {
            import_path: import_path.to_string(),
            filenames: Vec::new(),
            fset: FileSet::new(),
            ast: Ast::new(),
            files: Vec::new(),
            info: check(&FileSet::new(), &Ast::new(), &[]),
            types_err: None,
            old_src: HashMap::new(),
            new_src: HashMap::new(),
            clean: true,
        }
    }

    /// Current text of a file: the latest rewrite, or the original.
    pub fn src(&self, name: &Path) -> &str {
        match self.new_src.get(name) {
            Some(text) => text,
            None => &self.old_src[name],
        }
    }

    pub fn orig_src(&self, name: &Path) -> &str {
        &self.old_src[name]
    }

    pub fn modified(&self, name: &Path) -> bool {
        self.new_src.contains_key(name)
    }

    /// Store a rewritten file, canonically formatted.
    pub fn rewrite(&mut self, name: &Path, content: String) {
        self.new_src
            .insert(name.to_path_buf(), format_source(&content));
        self.clean = false;
    }
}

/// A rewrite pass. Passes run per package; they report problems through
/// the context and decline silently when a rewrite cannot be proven safe.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, ctxt: &mut Context, pkg: &mut Package);
}

/// An ordered sequence of passes plus the driver loop.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline { passes: Vec::new() }
    }

    pub fn add(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Rewrite an ad-hoc package made of the given files.
    pub fn run_files(&self, ctxt: &mut Context, files: &[PathBuf]) -> Option<Package> {
        let mut pkg = Package::new(".");
        pkg.filenames = files.to_vec();
        for name in files {
            match std::fs::read_to_string(name) {
                Ok(src) => {
                    pkg.old_src.insert(name.clone(), src);
                }
                Err(err) => {
                    ctxt.error(format!("{}: {}", name.display(), err));
                    return None;
                }
            }
        }
        self.run(ctxt, &mut pkg);
        Some(pkg)
    }

    /// Rewrite the package at `path`: a directory, or a path under
    /// `$GOPATH/src`.
    pub fn run_package(&self, ctxt: &mut Context, path: &str) -> Option<Package> {
        let dir = match resolve_package_dir(path) {
            Some(dir) => dir,
            None => {
                ctxt.error(format!("{path}: package not found"));
                return None;
            }
        };
        let mut filenames = Vec::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                ctxt.error(format!("{path}: {err}"));
                return None;
            }
        };
        for entry in entries.flatten() {
            let p = entry.path();
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.ends_with(".go") && !name.ends_with("_test.go") {
                filenames.push(p);
            }
        }
        filenames.sort();
        if filenames.is_empty() {
            ctxt.error(format!("{path}: no source files"));
            return None;
        }

        let mut pkg = Package::new(path);
        pkg.filenames = filenames.clone();
        for name in &filenames {
            match std::fs::read_to_string(name) {
                Ok(src) => {
                    pkg.old_src.insert(name.clone(), src);
                }
                Err(err) => {
                    ctxt.error(format!("{path}: {err}"));
                    return None;
                }
            }
        }
        self.run(ctxt, &mut pkg);
        Some(pkg)
    }

    fn run(&self, ctxt: &mut Context, pkg: &mut Package) {
        'outer: for iteration in 0..MAX_ITERATIONS {
            let mut fset = FileSet::new();
            let mut ast = Ast::new();
            let mut files = Vec::new();
            for name in pkg.filenames.clone() {
                let src = pkg.src(&name).to_string();
                match parse_file(&mut fset, &mut ast, &name, src) {
                    Ok(file) => files.push(file),
                    Err(err) => {
                        if iteration > 0 {
                            // The rewriter itself produced bad source.
                            ctxt.error(format!(
                                "{}: error parsing rewritten file: {}",
                                pkg.import_path, err
                            ));
                            for name in &pkg.filenames {
                                if pkg.modified(name) {
                                    ctxt.error(format!(
                                        "{} <<<\n{}\n>>>",
                                        name.display(),
                                        pkg.src(name)
                                    ));
                                }
                            }
                        } else {
                            ctxt.error(format!("{}: {}", pkg.import_path, err));
                        }
                        return;
                    }
                }
            }
            let info = check(&fset, &ast, &files);
            pkg.types_err = info.errors.first().cloned();
            if let Some(err) = &pkg.types_err {
                tracing::debug!("{}: type information incomplete: {}", pkg.import_path, err);
            }
            pkg.fset = fset;
            pkg.ast = ast;
            pkg.files = files;
            pkg.info = info;

            for pass in &self.passes {
                pkg.clean = true;
                tracing::debug!(
                    "iteration {}: running {}",
                    iteration,
                    pass.name()
                );
                pass.run(ctxt, pkg);
                if !pkg.clean {
                    continue 'outer;
                }
            }
            return;
        }
        ctxt.error(format!(
            "{}: rewrite loop did not reach a fixpoint after {} iterations",
            pkg.import_path, MAX_ITERATIONS
        ));
    }
}

fn resolve_package_dir(path: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(path);
    if direct.is_dir() {
        return Some(direct);
    }
    if let Ok(gopath) = std::env::var("GOPATH") {
        for root in gopath.split(':') {
            let candidate = Path::new(root).join("src").join(path);
            if candidate.is_dir() {
                return Some(candidate);
            }
        }
    }
    None
}

/// The standard pass order: unreachable code first, then jump inlining,
/// then declaration placement, then label cleanup.
pub fn default_pipeline() -> Pipeline {
    let mut p = Pipeline::new();
    p.add(Box::new(deadcode::DeadCode));
    p.add(Box::new(goto_inline::GotoInline));
    p.add(Box::new(vardecl::VarDecl));
    p.add(Box::new(unused_label::UnusedLabel));
    p
}

/// Run `f` once per function declaration with a body, per file, giving it
/// the file's edit buffer. Files containing `//line` directives are
/// generated; they are skipped entirely.
pub fn for_each_func(
    ctxt: &mut Context,
    pkg: &mut Package,
    f: impl Fn(&mut Context, &Package, &mut EditBuffer, NodeId),
) {
    let mut rewrites = Vec::new();
    for (i, name) in pkg.filenames.iter().enumerate() {
        let src = pkg.src(name).to_string();
        if src.contains("\n//line ") {
            continue;
        }
        let base = pkg.fset.file(i).base;
        let mut edit = EditBuffer::new(base, src.clone());
        for &decl in &pkg.files[i].decls {
            if let NodeKind::FuncDecl { body: Some(_), .. } = pkg.ast.kind(decl) {
                f(ctxt, pkg, &mut edit, decl);
            }
        }
        if edit.num_edits() > 0 {
            let new = edit.apply();
            if new != src {
                rewrites.push((name.clone(), new));
            }
        }
    }
    for (name, new) in rewrites {
        pkg.rewrite(&name, new);
    }
}

// ── Shared statement helpers ───────────────────────────────────────

/// Is `x` (possibly under labels) the target of some goto?
pub fn is_goto_target(ast: &Ast, tree: &BlockTree, mut x: NodeId) -> bool {
    loop {
        match ast.kind(x) {
            NodeKind::Labeled { label, stmt, .. } => {
                if tree.goto_count(ast.ident_name(*label)) > 0 {
                    return true;
                }
                x = *stmt;
            }
            _ => return false,
        }
    }
}

/// Whether control never falls out the bottom of `x` into the statement
/// after it. Follows the language's terminating-statement rules, extended
/// with `break`, `continue`, and `goto` so it is usable mid-function.
pub fn is_terminating_stmt(ast: &Ast, tree: &BlockTree, x: NodeId) -> bool {
    let mut label = String::new();
    let mut x = x;
    while let NodeKind::Labeled { label: l, stmt, .. } = ast.kind(x) {
        label = ast.ident_name(*l).to_string();
        x = *stmt;
    }

    match ast.kind(x) {
        NodeKind::Return { .. } => true,
        NodeKind::Branch { tok, .. } => {
            matches!(tok, BranchTok::Break | BranchTok::Continue | BranchTok::Goto)
        }
        NodeKind::If { body, els, .. } => match els {
            Some(els) => {
                is_terminating_stmt(ast, tree, *body) && is_terminating_stmt(ast, tree, *els)
            }
            None => false,
        },
        NodeKind::For { cond, body, .. } => {
            cond.is_none()
                && (label.is_empty() || tree.break_count(&label) == 0)
                && !has_break(ast, *body)
        }
        NodeKind::Switch { cases, .. } | NodeKind::TypeSwitch { cases, .. } => {
            if !label.is_empty() && tree.break_count(&label) > 0 {
                return false;
            }
            if cases.iter().any(|&c| has_break(ast, c)) {
                return false;
            }
            let mut has_default = false;
            for &case in cases {
                if let NodeKind::Case { values, body, .. } = ast.kind(case) {
                    if values.is_empty() {
                        has_default = true;
                    }
                    let Some(&last) = body.last() else {
                        return false;
                    };
                    if !is_terminating_stmt(ast, tree, last) && !is_fallthrough(ast, last) {
                        return false;
                    }
                }
            }
            has_default
        }
        NodeKind::Select { cases } => {
            if !label.is_empty() && tree.break_count(&label) > 0 {
                return false;
            }
            if cases.iter().any(|&c| has_break(ast, c)) {
                return false;
            }
            for &case in cases {
                if let NodeKind::Comm { body, .. } = ast.kind(case) {
                    let Some(&last) = body.last() else {
                        return false;
                    };
                    if !is_terminating_stmt(ast, tree, last) && !is_fallthrough(ast, last) {
                        return false;
                    }
                }
            }
            true
        }
        _ => false,
    }
}

pub fn is_fallthrough(ast: &Ast, x: NodeId) -> bool {
    matches!(
        ast.kind(x),
        NodeKind::Branch {
            tok: BranchTok::Fallthrough,
            ..
        }
    )
}

/// Does the subtree contain an unlabeled `break` that would escape the
/// enclosing loop/switch/select? Nested loops, switches, and selects
/// capture their own breaks; expressions cannot contain statements we
/// care about.
pub fn has_break(ast: &Ast, x: NodeId) -> bool {
    fn walk(ast: &Ast, x: NodeId, found: &mut bool) {
        if *found {
            return;
        }
        match ast.kind(x) {
            NodeKind::For { .. }
            | NodeKind::RangeFor { .. }
            | NodeKind::Select { .. }
            | NodeKind::Switch { .. }
            | NodeKind::TypeSwitch { .. } => return,
            NodeKind::Branch {
                tok: BranchTok::Break,
                label: None,
            } => {
                *found = true;
                return;
            }
            _ => {
                if ast.is_expr(x) {
                    return;
                }
            }
        }
        for c in ast.children(x) {
            walk(ast, c, found);
        }
    }
    let mut found = false;
    // Walk the children directly: the node itself may be the loop or
    // switch body being asked about.
    match ast.kind(x) {
        NodeKind::Block { .. } | NodeKind::Case { .. } | NodeKind::Comm { .. } => {
            for c in ast.children(x) {
                walk(ast, c, &mut found);
            }
        }
        _ => walk(ast, x, &mut found),
    }
    found
}

/// Build a checked, single-file package from in-memory source.
#[cfg(test)]
pub(crate) fn package_from_source(src: &str) -> Package {
    let name = PathBuf::from("test.go");
    let mut pkg = Package::new("test");
    pkg.filenames = vec![name.clone()];
    pkg.old_src.insert(name.clone(), src.to_string());

    let mut fset = FileSet::new();
    let mut ast = Ast::new();
    let file = parse_file(&mut fset, &mut ast, &name, src.to_string()).expect("parse");
    let files = vec![file];
    let info = check(&fset, &ast, &files);
    pkg.types_err = info.errors.first().cloned();
    pkg.fset = fset;
    pkg.ast = ast;
    pkg.files = files;
    pkg.info = info;
    pkg
}

/// Run the default pipeline over in-memory source; returns the package
/// and the final text.
#[cfg(test)]
pub(crate) fn run_source(src: &str) -> (Context, Package, String) {
    let name = PathBuf::from("test.go");
    let mut pkg = Package::new("test");
    pkg.filenames = vec![name.clone()];
    pkg.old_src.insert(name.clone(), src.to_string());

    let pipeline = default_pipeline();
    let mut ctxt = Context::new();
    pipeline.run(&mut ctxt, &mut pkg);
    let out = pkg.src(&name).to_string();
    (ctxt, pkg, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::block;
    use std::path::Path;

    fn setup(src: &str) -> (Ast, BlockTree, Vec<NodeId>) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let file = parse_file(&mut fset, &mut ast, Path::new("t.go"), src.to_string()).unwrap();
        let mut body = None;
        for &d in &file.decls {
            if let NodeKind::FuncDecl { body: Some(b), .. } = ast.kind(d) {
                body = Some(*b);
            }
        }
        let body = body.unwrap();
        let tree = block::build(&ast, body);
        let stmts = ast.block_list(body).unwrap().to_vec();
        (ast, tree, stmts)
    }

    #[test]
    fn return_and_jumps_terminate() {
        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f() {\n\treturn\n\tgoto L\nL:\n\tbreak\n\tcontinue\n\tx()\n}\n",
        );
        assert!(is_terminating_stmt(&ast, &tree, stmts[0]));
        assert!(is_terminating_stmt(&ast, &tree, stmts[1]));
        assert!(is_terminating_stmt(&ast, &tree, stmts[3]));
        assert!(!is_terminating_stmt(&ast, &tree, stmts[4]));
    }

    #[test]
    fn if_needs_both_branches() {
        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f() {\n\tif a {\n\t\treturn\n\t}\n\tif b {\n\t\treturn\n\t} else {\n\t\treturn\n\t}\n}\n",
        );
        assert!(!is_terminating_stmt(&ast, &tree, stmts[0]));
        assert!(is_terminating_stmt(&ast, &tree, stmts[1]));
    }

    #[test]
    fn bare_for_terminates_unless_it_breaks() {
        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f() {\n\tfor {\n\t\tspin()\n\t}\n}\n",
        );
        assert!(is_terminating_stmt(&ast, &tree, stmts[0]));

        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f() {\n\tfor {\n\t\tif c {\n\t\t\tbreak\n\t\t}\n\t}\n\tx()\n}\n",
        );
        assert!(!is_terminating_stmt(&ast, &tree, stmts[0]));

        // A break inside a nested loop does not escape.
        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f() {\n\tfor {\n\t\tfor {\n\t\t\tbreak\n\t\t}\n\t}\n}\n",
        );
        assert!(is_terminating_stmt(&ast, &tree, stmts[0]));
    }

    #[test]
    fn labeled_break_defeats_labeled_loop() {
        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f() {\nLoop:\n\tfor {\n\t\tfor {\n\t\t\tbreak Loop\n\t\t}\n\t}\n}\n",
        );
        assert!(!is_terminating_stmt(&ast, &tree, stmts[0]));
    }

    #[test]
    fn switch_needs_default_and_terminating_arms() {
        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f(x int) {\n\tswitch x {\n\tcase 1:\n\t\treturn\n\tdefault:\n\t\treturn\n\t}\n\tswitch x {\n\tcase 1:\n\t\treturn\n\t}\n\tswitch x {\n\tcase 1:\n\t\tfallthrough\n\tdefault:\n\t\treturn\n\t}\n}\n",
        );
        assert!(is_terminating_stmt(&ast, &tree, stmts[0]));
        assert!(!is_terminating_stmt(&ast, &tree, stmts[1])); // no default
        assert!(is_terminating_stmt(&ast, &tree, stmts[2])); // fallthrough ok
    }

    #[test]
    fn goto_target_detection() {
        let (ast, tree, stmts) = setup(
            "package p\n\nfunc f() {\n\tgoto L\nL:\n\tx()\nM:\n\ty()\n}\n",
        );
        assert!(is_goto_target(&ast, &tree, stmts[1]));
        assert!(!is_goto_target(&ast, &tree, stmts[2]));
    }

    #[test]
    fn driver_is_a_fixpoint_on_clean_input() {
        let src = "package p\n\nfunc f(x int) int {\n\tfor i := 0; i < x; i++ {\n\t\tx += i\n\t}\n\treturn x\n}\n";
        let (ctxt, pkg, out) = run_source(src);
        assert!(!ctxt.errors);
        assert!(!pkg.modified(Path::new("test.go")));
        assert_eq!(out, src);
    }

    #[test]
    fn driver_chains_passes_across_iterations() {
        // Dead code exposes a goto target for inlining; the label then
        // disappears with its target.
        let src = "package p\n\nvar c bool\n\nfunc f() {\n\tif c {\n\t\tgoto L\n\t}\n\treturn\n\tx()\nL:\n\ty()\n}\n\nfunc x() {}\n\nfunc y() {}\n";
        let (ctxt, _, out) = run_source(src);
        assert!(!ctxt.errors);
        assert!(!out.contains("x()\n\ty()"), "dead call not removed:\n{out}");
        assert!(!out.contains("goto"), "goto not inlined:\n{out}");
        assert!(!out.contains("L:"), "label not removed:\n{out}");
        assert!(out.contains("y(); return"), "target not inlined:\n{out}");
    }

    #[test]
    fn generated_files_are_skipped() {
        let src = "package p\n\n//line foo.y:10\nfunc f() {\n\treturn\n\tx()\n}\n\nfunc x() {}\n";
        let (ctxt, pkg, out) = run_source(src);
        assert!(!ctxt.errors);
        assert!(!pkg.modified(Path::new("test.go")));
        assert_eq!(out, src);
    }
}

//! Recursive-descent parser for the dialect.
//!
//! Parses one file at a time into the shared [`Ast`] arena. The grammar is
//! the block-structured imperative subset that mechanically translated code
//! uses; anything outside it is a parse error that aborts the package.
//!
//! The one piece of real delicacy is the composite-literal ambiguity in
//! `if`/`for`/`switch` headers: a `{` after the header expression opens the
//! statement body, not a literal, unless the expression sits inside
//! parentheses or brackets. `no_lit_depth` tracks that.

use std::path::Path;

use crate::error::{Error, Result};
use crate::syntax::ast::{
    AssignTok, Ast, BinOp, BranchTok, ChanDir, DeclTok, File, LitKind, NodeId, NodeKind, UnOp,
};
use crate::syntax::lexer::Lexer;
use crate::syntax::token::{FileSet, Pos, Span, TokKind, Token};

/// Parse `text` as one source file, appending nodes into `ast`.
/// Registers the file in `fset` and returns its parsed form.
pub fn parse_file(fset: &mut FileSet, ast: &mut Ast, name: &Path, text: String) -> Result<File> {
    let index = fset.add_file(name, text);
    let file = fset.file(index);
    let mut lexer = Lexer::new(&file.text, file.base);
    let mut toks = Vec::new();
    loop {
        let tok = lexer.next_token();
        let done = tok.kind == TokKind::Eof;
        toks.push(tok);
        if done {
            break;
        }
    }
    if let Some((pos, msg)) = lexer.take_error() {
        return Err(parse_error(fset, pos, msg));
    }

    let mut p = Parser {
        ast,
        toks,
        i: 0,
        err: None,
        no_lit_depth: 0,
    };
    match p.file() {
        Ok(file) => Ok(file),
        Err(()) => {
            let (pos, msg) = p.err.unwrap();
            Err(parse_error(fset, pos, msg))
        }
    }
}

fn parse_error(fset: &FileSet, pos: Pos, message: String) -> Error {
    let position = fset.position(pos);
    Error::Parse {
        file: position.file.display().to_string(),
        line: position.line,
        message,
    }
}

type PResult<T> = std::result::Result<T, ()>;

struct Parser<'a> {
    ast: &'a mut Ast,
    toks: Vec<Token>,
    i: usize,
    err: Option<(Pos, String)>,
    /// > 0 while composite literals are disallowed after a bare identifier
    /// (inside an `if`/`for`/`switch` header, outside parens).
    no_lit_depth: u32,
}

impl<'a> Parser<'a> {
    fn tok(&self) -> &Token {
        &self.toks[self.i]
    }

    fn kind(&self) -> TokKind {
        self.toks[self.i].kind
    }

    fn peek_kind(&self, n: usize) -> TokKind {
        self.toks
            .get(self.i + n)
            .map(|t| t.kind)
            .unwrap_or(TokKind::Eof)
    }

    fn pos(&self) -> Pos {
        self.toks[self.i].pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.toks[self.i].clone();
        if self.i + 1 < self.toks.len() {
            self.i += 1;
        }
        tok
    }

    fn at(&self, kind: TokKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: TokKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn fail<T>(&mut self, msg: impl Into<String>) -> PResult<T> {
        if self.err.is_none() {
            self.err = Some((self.pos(), msg.into()));
        }
        Err(())
    }

    fn expect(&mut self, kind: TokKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            self.fail(format!("expected {:?}, found {:?}", kind, self.kind()))
        }
    }

    /// Consume a statement terminator: `;` (written or inserted) or let a
    /// closing token stand in for it.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.kind() {
            TokKind::Semi => {
                self.advance();
                Ok(())
            }
            TokKind::RBrace | TokKind::RParen | TokKind::Eof => Ok(()),
            _ => self.fail(format!("expected ';', found {:?}", self.kind())),
        }
    }

    fn alloc(&mut self, kind: NodeKind, start: Pos, end: Pos) -> NodeId {
        self.ast.alloc(kind, Span::new(start, end))
    }

    fn end_of(&self, id: NodeId) -> Pos {
        self.ast.end(id)
    }

    // ── File structure ─────────────────────────────────────────────

    fn file(&mut self) -> PResult<File> {
        self.expect(TokKind::Package)?;
        let name = self.expect(TokKind::Ident)?;
        self.expect_semi()?;

        let mut decls = Vec::new();
        while !self.at(TokKind::Eof) {
            match self.kind() {
                TokKind::Import => {
                    let d = self.gen_decl(DeclTok::Import)?;
                    decls.push(d);
                    self.expect_semi()?;
                }
                TokKind::Func => {
                    let d = self.func_decl()?;
                    decls.push(d);
                    self.expect_semi()?;
                }
                TokKind::Var => {
                    let d = self.gen_decl(DeclTok::Var)?;
                    decls.push(d);
                    self.expect_semi()?;
                }
                TokKind::Const => {
                    let d = self.gen_decl(DeclTok::Const)?;
                    decls.push(d);
                    self.expect_semi()?;
                }
                TokKind::Type => {
                    let d = self.gen_decl(DeclTok::TypeDecl)?;
                    decls.push(d);
                    self.expect_semi()?;
                }
                _ => return self.fail("expected declaration"),
            }
        }
        Ok(File {
            package: name.text,
            decls,
        })
    }

    fn func_decl(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        self.expect(TokKind::Func)?;

        let mut recv = None;
        if self.at(TokKind::LParen) {
            let fields = self.param_list()?;
            if fields.len() != 1 {
                return self.fail("method receiver must be a single field");
            }
            recv = Some(fields[0]);
        }

        let name = self.ident()?;
        let ty = self.func_type_tail(start)?;
        let mut body = None;
        let mut end = self.end_of(ty);
        if self.at(TokKind::LBrace) {
            let b = self.block()?;
            end = self.end_of(b);
            body = Some(b);
        }
        Ok(self.alloc(
            NodeKind::FuncDecl {
                recv,
                name,
                ty,
                body,
            },
            start,
            end,
        ))
    }

    /// Parameters and results, starting at `(`. `start` is the position the
    /// resulting `FuncType` node should span from.
    fn func_type_tail(&mut self, start: Pos) -> PResult<NodeId> {
        let params = self.param_list()?;
        let mut results = Vec::new();
        let mut end = self.toks[self.i - 1].end;
        if self.at(TokKind::LParen) {
            results = self.param_list()?;
            end = self.toks[self.i - 1].end;
        } else if self.starts_type() {
            let ty = self.type_expr()?;
            end = self.end_of(ty);
            let field = self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    ty: Some(ty),
                },
                self.ast.pos(ty),
                end,
            );
            results = vec![field];
        }
        Ok(self.alloc(NodeKind::FuncType { params, results }, start, end))
    }

    /// `( group , group , ... )` where a group is `a, b Type`, `Type`, or
    /// `...Type` in final position.
    fn param_list(&mut self) -> PResult<Vec<NodeId>> {
        self.expect(TokKind::LParen)?;
        let saved_no_lit = self.no_lit_depth;
        self.no_lit_depth = 0;
        let mut items: Vec<(NodeId, Option<NodeId>)> = Vec::new();
        let mut any_named = false;
        while !self.at(TokKind::RParen) {
            if self.at(TokKind::Ellipsis) {
                let start = self.pos();
                self.advance();
                let ty = self.type_expr()?;
                let end = self.end_of(ty);
                // Variadic marker folds into the element type's field.
                let field = self.alloc(
                    NodeKind::Field {
                        names: Vec::new(),
                        ty: Some(ty),
                    },
                    start,
                    end,
                );
                items.push((field, None));
                break;
            }
            let expr = self.expr()?;
            let ty = if self.at(TokKind::Comma) || self.at(TokKind::RParen) {
                None
            } else if self.at(TokKind::Ellipsis) {
                self.advance();
                let t = self.type_expr()?;
                any_named = true;
                Some(t)
            } else {
                any_named = true;
                Some(self.type_expr()?)
            };
            items.push((expr, ty));
            if !self.eat(TokKind::Comma) {
                break;
            }
        }
        self.expect(TokKind::RParen)?;
        self.no_lit_depth = saved_no_lit;

        let mut fields = Vec::new();
        if any_named {
            // Items without a type are names for the next typed item.
            let mut names = Vec::new();
            for (expr, ty) in items {
                names.push(expr);
                if let Some(ty) = ty {
                    let start = self.ast.pos(names[0]);
                    let end = self.end_of(ty);
                    let field = self.alloc(
                        NodeKind::Field {
                            names: std::mem::take(&mut names),
                            ty: Some(ty),
                        },
                        start,
                        end,
                    );
                    fields.push(field);
                }
            }
            if !names.is_empty() {
                return self.fail("mixed named and unnamed parameters");
            }
        } else {
            for (expr, _) in items {
                let span = self.ast.span(expr);
                let field = self.alloc(
                    NodeKind::Field {
                        names: Vec::new(),
                        ty: Some(expr),
                    },
                    span.start,
                    span.end,
                );
                fields.push(field);
            }
        }
        Ok(fields)
    }

    fn ident(&mut self) -> PResult<NodeId> {
        let tok = self.expect(TokKind::Ident)?;
        Ok(self.alloc(NodeKind::Ident { name: tok.text }, tok.pos, tok.end))
    }

    // ── Declarations ───────────────────────────────────────────────

    fn gen_decl(&mut self, tok: DeclTok) -> PResult<NodeId> {
        let start = self.pos();
        self.advance(); // var / const / type / import
        let mut specs = Vec::new();
        let end;
        if self.eat(TokKind::LParen) {
            while !self.at(TokKind::RParen) {
                specs.push(self.spec(tok)?);
                self.expect_semi()?;
            }
            let rparen = self.expect(TokKind::RParen)?;
            end = rparen.end;
        } else {
            let spec = self.spec(tok)?;
            end = self.end_of(spec);
            specs.push(spec);
        }
        Ok(self.alloc(NodeKind::GenDecl { tok, specs }, start, end))
    }

    fn spec(&mut self, tok: DeclTok) -> PResult<NodeId> {
        match tok {
            DeclTok::Import => {
                let start = self.pos();
                let mut name = None;
                if self.at(TokKind::Ident) || self.at(TokKind::Period) {
                    if self.at(TokKind::Period) {
                        let t = self.advance();
                        name = Some(self.alloc(
                            NodeKind::Ident {
                                name: ".".to_string(),
                            },
                            t.pos,
                            t.end,
                        ));
                    } else {
                        name = Some(self.ident()?);
                    }
                }
                let path_tok = self.expect(TokKind::Str)?;
                let end = path_tok.end;
                let path = self.alloc(
                    NodeKind::BasicLit {
                        lit: LitKind::Str,
                        value: path_tok.text,
                    },
                    path_tok.pos,
                    path_tok.end,
                );
                Ok(self.alloc(NodeKind::ImportSpec { name, path }, start, end))
            }
            DeclTok::TypeDecl => {
                let name = self.ident()?;
                self.eat(TokKind::Assign); // type alias form
                let ty = self.type_expr()?;
                let start = self.ast.pos(name);
                let end = self.end_of(ty);
                Ok(self.alloc(NodeKind::TypeSpec { name, ty }, start, end))
            }
            DeclTok::Var | DeclTok::Const => {
                let mut names = vec![self.ident()?];
                while self.eat(TokKind::Comma) {
                    names.push(self.ident()?);
                }
                let mut ty = None;
                if self.starts_type() {
                    ty = Some(self.type_expr()?);
                }
                let mut values = Vec::new();
                if self.eat(TokKind::Assign) {
                    values.push(self.expr()?);
                    while self.eat(TokKind::Comma) {
                        values.push(self.expr()?);
                    }
                }
                let start = self.ast.pos(names[0]);
                let end = values
                    .last()
                    .or(ty.as_ref())
                    .or(names.last())
                    .map(|&id| self.end_of(id))
                    .unwrap();
                Ok(self.alloc(NodeKind::ValueSpec { names, ty, values }, start, end))
            }
        }
    }

    // ── Types ──────────────────────────────────────────────────────

    fn starts_type(&self) -> bool {
        matches!(
            self.kind(),
            TokKind::Ident
                | TokKind::Mul
                | TokKind::LBrack
                | TokKind::Map
                | TokKind::Chan
                | TokKind::Arrow
                | TokKind::Struct
                | TokKind::Interface
                | TokKind::Func
                | TokKind::LParen
        )
    }

    fn type_expr(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        match self.kind() {
            TokKind::Ident => {
                let mut x = self.ident()?;
                if self.at(TokKind::Period) {
                    self.advance();
                    let sel = self.ident()?;
                    let end = self.end_of(sel);
                    x = self.alloc(NodeKind::Selector { x, sel }, start, end);
                }
                Ok(x)
            }
            TokKind::Mul => {
                self.advance();
                let elem = self.type_expr()?;
                let end = self.end_of(elem);
                Ok(self.alloc(NodeKind::Star { x: elem }, start, end))
            }
            TokKind::LBrack => {
                self.advance();
                let len = if self.at(TokKind::RBrack) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokKind::RBrack)?;
                let elt = self.type_expr()?;
                let end = self.end_of(elt);
                Ok(self.alloc(NodeKind::ArrayType { len, elt }, start, end))
            }
            TokKind::Map => {
                self.advance();
                self.expect(TokKind::LBrack)?;
                let key = self.type_expr()?;
                self.expect(TokKind::RBrack)?;
                let value = self.type_expr()?;
                let end = self.end_of(value);
                Ok(self.alloc(NodeKind::MapType { key, value }, start, end))
            }
            TokKind::Chan => {
                self.advance();
                let dir = if self.eat(TokKind::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let value = self.type_expr()?;
                let end = self.end_of(value);
                Ok(self.alloc(NodeKind::ChanType { dir, value }, start, end))
            }
            TokKind::Arrow => {
                self.advance();
                self.expect(TokKind::Chan)?;
                let value = self.type_expr()?;
                let end = self.end_of(value);
                Ok(self.alloc(
                    NodeKind::ChanType {
                        dir: ChanDir::Recv,
                        value,
                    },
                    start,
                    end,
                ))
            }
            TokKind::Struct => {
                self.advance();
                self.expect(TokKind::LBrace)?;
                let mut fields = Vec::new();
                while !self.at(TokKind::RBrace) {
                    fields.push(self.struct_field()?);
                    self.expect_semi()?;
                }
                let rbrace = self.expect(TokKind::RBrace)?;
                Ok(self.alloc(NodeKind::StructType { fields }, start, rbrace.end))
            }
            TokKind::Interface => {
                self.advance();
                self.expect(TokKind::LBrace)?;
                let mut methods = Vec::new();
                while !self.at(TokKind::RBrace) {
                    methods.push(self.interface_member()?);
                    self.expect_semi()?;
                }
                let rbrace = self.expect(TokKind::RBrace)?;
                Ok(self.alloc(NodeKind::InterfaceType { methods }, start, rbrace.end))
            }
            TokKind::Func => {
                self.advance();
                self.func_type_tail(start)
            }
            TokKind::LParen => {
                self.advance();
                let inner = self.type_expr()?;
                let rparen = self.expect(TokKind::RParen)?;
                Ok(self.alloc(NodeKind::Paren { x: inner }, start, rparen.end))
            }
            _ => self.fail("expected type"),
        }
    }

    fn struct_field(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        // Embedded field: `*T`, or `T` / `pkg.T` directly followed by a
        // terminator or a tag.
        let terminator = |k: TokKind| matches!(k, TokKind::Semi | TokKind::RBrace | TokKind::Str);
        let embedded = self.at(TokKind::Mul)
            || (self.at(TokKind::Ident) && terminator(self.peek_kind(1)))
            || (self.at(TokKind::Ident)
                && self.peek_kind(1) == TokKind::Period
                && self.peek_kind(2) == TokKind::Ident
                && terminator(self.peek_kind(3)));
        if embedded {
            let ty = self.type_expr()?;
            if self.at(TokKind::Str) {
                self.advance(); // field tag
            }
            let end = self.toks[self.i - 1].end;
            return Ok(self.alloc(
                NodeKind::Field {
                    names: Vec::new(),
                    ty: Some(ty),
                },
                start,
                end,
            ));
        }
        let mut names = vec![self.ident()?];
        while self.eat(TokKind::Comma) {
            names.push(self.ident()?);
        }
        let ty = self.type_expr()?;
        if self.at(TokKind::Str) {
            self.advance(); // field tag
        }
        let end = self.toks[self.i - 1].end;
        Ok(self.alloc(
            NodeKind::Field {
                names,
                ty: Some(ty),
            },
            start,
            end,
        ))
    }

    fn interface_member(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        if self.at(TokKind::Ident) && self.peek_kind(1) == TokKind::LParen {
            let name = self.ident()?;
            let ty = self.func_type_tail(start)?;
            let end = self.end_of(ty);
            return Ok(self.alloc(
                NodeKind::Field {
                    names: vec![name],
                    ty: Some(ty),
                },
                start,
                end,
            ));
        }
        let ty = self.type_expr()?;
        let end = self.end_of(ty);
        Ok(self.alloc(
            NodeKind::Field {
                names: Vec::new(),
                ty: Some(ty),
            },
            start,
            end,
        ))
    }

    // ── Expressions ────────────────────────────────────────────────

    fn expr(&mut self) -> PResult<NodeId> {
        self.binary_expr(0)
    }

    fn binary_expr(&mut self, min_prec: u8) -> PResult<NodeId> {
        let mut x = self.unary_expr()?;
        loop {
            let op = match self.kind() {
                TokKind::LOr => BinOp::LOr,
                TokKind::LAnd => BinOp::LAnd,
                TokKind::Eql => BinOp::Eql,
                TokKind::Neq => BinOp::Neq,
                TokKind::Lss => BinOp::Lss,
                TokKind::Leq => BinOp::Leq,
                TokKind::Gtr => BinOp::Gtr,
                TokKind::Geq => BinOp::Geq,
                TokKind::Add => BinOp::Add,
                TokKind::Sub => BinOp::Sub,
                TokKind::Or => BinOp::Or,
                TokKind::Xor => BinOp::Xor,
                TokKind::Mul => BinOp::Mul,
                TokKind::Quo => BinOp::Quo,
                TokKind::Rem => BinOp::Rem,
                TokKind::Shl => BinOp::Shl,
                TokKind::Shr => BinOp::Shr,
                TokKind::And => BinOp::And,
                TokKind::AndNot => BinOp::AndNot,
                _ => break,
            };
            let prec = op.precedence();
            if prec <= min_prec {
                break;
            }
            self.advance();
            let y = self.binary_expr(prec)?;
            let start = self.ast.pos(x);
            let end = self.end_of(y);
            x = self.alloc(NodeKind::Binary { op, x, y }, start, end);
        }
        Ok(x)
    }

    fn unary_expr(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        let op = match self.kind() {
            TokKind::And => Some(UnOp::Addr),
            TokKind::Not => Some(UnOp::Not),
            TokKind::Sub => Some(UnOp::Neg),
            TokKind::Add => Some(UnOp::Pos),
            TokKind::Xor => Some(UnOp::BitNot),
            TokKind::Arrow => {
                // `<-chan T` is a type, handled in operand position.
                if self.peek_kind(1) == TokKind::Chan {
                    None
                } else {
                    Some(UnOp::Recv)
                }
            }
            TokKind::Mul => {
                self.advance();
                let x = self.unary_expr()?;
                let end = self.end_of(x);
                return Ok(self.alloc(NodeKind::Star { x }, start, end));
            }
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let x = self.unary_expr()?;
            let end = self.end_of(x);
            return Ok(self.alloc(NodeKind::Unary { op, x }, start, end));
        }
        self.primary_expr()
    }

    fn primary_expr(&mut self) -> PResult<NodeId> {
        let mut x = self.operand()?;
        loop {
            match self.kind() {
                TokKind::Period => {
                    self.advance();
                    if self.eat(TokKind::LParen) {
                        // Type assertion: x.(T) or x.(type).
                        let ty = if self.at(TokKind::Type) {
                            self.advance();
                            None
                        } else {
                            Some(self.type_expr()?)
                        };
                        let rparen = self.expect(TokKind::RParen)?;
                        let start = self.ast.pos(x);
                        x = self.alloc(NodeKind::TypeAssert { x, ty }, start, rparen.end);
                    } else {
                        let sel = self.ident()?;
                        let start = self.ast.pos(x);
                        let end = self.end_of(sel);
                        x = self.alloc(NodeKind::Selector { x, sel }, start, end);
                    }
                }
                TokKind::LParen => {
                    self.advance();
                    let saved = self.no_lit_depth;
                    self.no_lit_depth = 0;
                    let mut args = Vec::new();
                    let mut ellipsis = false;
                    while !self.at(TokKind::RParen) {
                        args.push(self.expr()?);
                        if self.eat(TokKind::Ellipsis) {
                            ellipsis = true;
                        }
                        if !self.eat(TokKind::Comma) {
                            break;
                        }
                    }
                    let rparen = self.expect(TokKind::RParen)?;
                    self.no_lit_depth = saved;
                    let start = self.ast.pos(x);
                    x = self.alloc(
                        NodeKind::Call {
                            fun: x,
                            args,
                            ellipsis,
                        },
                        start,
                        rparen.end,
                    );
                }
                TokKind::LBrack => {
                    self.advance();
                    let saved = self.no_lit_depth;
                    self.no_lit_depth = 0;
                    let low = if self.at(TokKind::Colon) {
                        None
                    } else {
                        Some(self.expr()?)
                    };
                    if self.eat(TokKind::Colon) {
                        let high = if self.at(TokKind::RBrack) || self.at(TokKind::Colon) {
                            None
                        } else {
                            Some(self.expr()?)
                        };
                        let max = if self.eat(TokKind::Colon) {
                            Some(self.expr()?)
                        } else {
                            None
                        };
                        let rbrack = self.expect(TokKind::RBrack)?;
                        self.no_lit_depth = saved;
                        let start = self.ast.pos(x);
                        x = self.alloc(
                            NodeKind::SliceExpr { x, low, high, max },
                            start,
                            rbrack.end,
                        );
                    } else {
                        let rbrack = self.expect(TokKind::RBrack)?;
                        self.no_lit_depth = saved;
                        let start = self.ast.pos(x);
                        x = self.alloc(
                            NodeKind::Index {
                                x,
                                index: low.unwrap(),
                            },
                            start,
                            rbrack.end,
                        );
                    }
                }
                TokKind::LBrace => {
                    // Composite literal: only after a type-shaped operand,
                    // and not at the top level of a statement header.
                    if self.no_lit_depth > 0 || !self.type_shaped(x) {
                        break;
                    }
                    let lit = self.composite_lit_body(Some(x))?;
                    x = lit;
                }
                _ => break,
            }
        }
        Ok(x)
    }

    /// Could `x` name a type in front of a composite literal?
    fn type_shaped(&self, x: NodeId) -> bool {
        match self.ast.kind(x) {
            NodeKind::Ident { .. } => true,
            NodeKind::Selector { x, .. } => matches!(self.ast.kind(*x), NodeKind::Ident { .. }),
            NodeKind::ArrayType { .. } | NodeKind::MapType { .. } | NodeKind::StructType { .. } => {
                true
            }
            _ => false,
        }
    }

    fn composite_lit_body(&mut self, ty: Option<NodeId>) -> PResult<NodeId> {
        let start = ty.map(|t| self.ast.pos(t)).unwrap_or_else(|| self.pos());
        self.expect(TokKind::LBrace)?;
        let saved = self.no_lit_depth;
        self.no_lit_depth = 0;
        let mut elts = Vec::new();
        while !self.at(TokKind::RBrace) {
            let elt = if self.at(TokKind::LBrace) {
                // Nested literal with elided element type.
                self.composite_lit_body(None)?
            } else {
                self.expr()?
            };
            let elt = if self.eat(TokKind::Colon) {
                let value = if self.at(TokKind::LBrace) {
                    self.composite_lit_body(None)?
                } else {
                    self.expr()?
                };
                let kstart = self.ast.pos(elt);
                let kend = self.end_of(value);
                self.alloc(NodeKind::KeyValue { key: elt, value }, kstart, kend)
            } else {
                elt
            };
            elts.push(elt);
            if !self.eat(TokKind::Comma) {
                self.eat(TokKind::Semi);
            }
        }
        let rbrace = self.expect(TokKind::RBrace)?;
        self.no_lit_depth = saved;
        Ok(self.alloc(NodeKind::CompositeLit { ty, elts }, start, rbrace.end))
    }

    fn operand(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        match self.kind() {
            TokKind::Ident => self.ident(),
            TokKind::Int => self.basic_lit(LitKind::Int),
            TokKind::Float => self.basic_lit(LitKind::Float),
            TokKind::Rune => self.basic_lit(LitKind::Rune),
            TokKind::Str => self.basic_lit(LitKind::Str),
            TokKind::LParen => {
                self.advance();
                let saved = self.no_lit_depth;
                self.no_lit_depth = 0;
                let x = self.expr()?;
                let rparen = self.expect(TokKind::RParen)?;
                self.no_lit_depth = saved;
                Ok(self.alloc(NodeKind::Paren { x }, start, rparen.end))
            }
            TokKind::Func => {
                self.advance();
                let ty = self.func_type_tail(start)?;
                if self.at(TokKind::LBrace) {
                    let saved = self.no_lit_depth;
                    self.no_lit_depth = 0;
                    let body = self.block()?;
                    self.no_lit_depth = saved;
                    let end = self.end_of(body);
                    return Ok(self.alloc(NodeKind::FuncLit { ty, body }, start, end));
                }
                Ok(ty)
            }
            TokKind::LBrack | TokKind::Map | TokKind::Struct | TokKind::Chan | TokKind::Arrow
            | TokKind::Interface | TokKind::Mul => self.type_expr(),
            _ => self.fail(format!("expected operand, found {:?}", self.kind())),
        }
    }

    fn basic_lit(&mut self, lit: LitKind) -> PResult<NodeId> {
        let tok = self.advance();
        Ok(self.alloc(
            NodeKind::BasicLit {
                lit,
                value: tok.text,
            },
            tok.pos,
            tok.end,
        ))
    }

    // ── Statements ─────────────────────────────────────────────────

    fn block(&mut self) -> PResult<NodeId> {
        let lbrace = self.expect(TokKind::LBrace)?;
        let saved = self.no_lit_depth;
        self.no_lit_depth = 0;
        let mut stmts = Vec::new();
        while !self.at(TokKind::RBrace) && !self.at(TokKind::Eof) {
            let s = self.stmt()?;
            stmts.push(s);
            self.expect_semi()?;
        }
        let rbrace = self.expect(TokKind::RBrace)?;
        self.no_lit_depth = saved;
        Ok(self.alloc(NodeKind::Block { stmts }, lbrace.pos, rbrace.end))
    }

    fn stmt(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        match self.kind() {
            TokKind::Var => {
                let decl = self.gen_decl(DeclTok::Var)?;
                let span = self.ast.span(decl);
                Ok(self.alloc(NodeKind::DeclStmt { decl }, span.start, span.end))
            }
            TokKind::Const => {
                let decl = self.gen_decl(DeclTok::Const)?;
                let span = self.ast.span(decl);
                Ok(self.alloc(NodeKind::DeclStmt { decl }, span.start, span.end))
            }
            TokKind::Type => {
                let decl = self.gen_decl(DeclTok::TypeDecl)?;
                let span = self.ast.span(decl);
                Ok(self.alloc(NodeKind::DeclStmt { decl }, span.start, span.end))
            }
            TokKind::Semi => {
                let tok = self.tok().clone();
                if !tok.implicit {
                    // Explicit `;`: an empty statement. Do not consume it
                    // here; the caller's expect_semi takes it.
                    return Ok(self.alloc(
                        NodeKind::Empty {
                            semicolon: tok.pos,
                            implicit: false,
                        },
                        tok.pos,
                        tok.end,
                    ));
                }
                self.fail("unexpected newline")
            }
            TokKind::LBrace => self.block(),
            TokKind::If => self.if_stmt(),
            TokKind::For => self.for_stmt(),
            TokKind::Switch => self.switch_stmt(),
            TokKind::Select => self.select_stmt(),
            TokKind::Return => {
                self.advance();
                let mut results = Vec::new();
                let mut end = self.toks[self.i - 1].end;
                if !self.at(TokKind::Semi) && !self.at(TokKind::RBrace) {
                    results.push(self.expr()?);
                    while self.eat(TokKind::Comma) {
                        results.push(self.expr()?);
                    }
                    end = self.end_of(*results.last().unwrap());
                }
                Ok(self.alloc(NodeKind::Return { results }, start, end))
            }
            TokKind::Break | TokKind::Continue | TokKind::Goto | TokKind::Fallthrough => {
                let tok = match self.kind() {
                    TokKind::Break => BranchTok::Break,
                    TokKind::Continue => BranchTok::Continue,
                    TokKind::Goto => BranchTok::Goto,
                    _ => BranchTok::Fallthrough,
                };
                let kw = self.advance();
                let mut end = kw.end;
                let mut label = None;
                if tok != BranchTok::Fallthrough && self.at(TokKind::Ident) {
                    let l = self.ident()?;
                    end = self.end_of(l);
                    label = Some(l);
                }
                Ok(self.alloc(NodeKind::Branch { tok, label }, start, end))
            }
            TokKind::Go => {
                self.advance();
                let call = self.expr()?;
                let end = self.end_of(call);
                Ok(self.alloc(NodeKind::GoStmt { call }, start, end))
            }
            TokKind::Defer => {
                self.advance();
                let call = self.expr()?;
                let end = self.end_of(call);
                Ok(self.alloc(NodeKind::DeferStmt { call }, start, end))
            }
            TokKind::Ident if self.peek_kind(1) == TokKind::Colon => self.labeled_stmt(),
            _ => self.simple_stmt(),
        }
    }

    fn labeled_stmt(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        let label = self.ident()?;
        let colon_tok = self.expect(TokKind::Colon)?;
        let colon = colon_tok.pos;

        // A label directly in front of a closing brace or case boundary
        // labels an implicit empty statement.
        let stmt = match self.kind() {
            TokKind::RBrace | TokKind::Case | TokKind::Default | TokKind::Eof => self.alloc(
                NodeKind::Empty {
                    semicolon: colon_tok.end,
                    implicit: true,
                },
                colon_tok.end,
                colon_tok.end,
            ),
            _ => self.stmt()?,
        };
        let end = self.end_of(stmt).max(colon_tok.end);
        Ok(self.alloc(NodeKind::Labeled { label, colon, stmt }, start, end))
    }

    /// Assignment, send, inc/dec, or expression statement.
    fn simple_stmt(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        let mut lhs = vec![self.expr()?];
        while self.eat(TokKind::Comma) {
            lhs.push(self.expr()?);
        }

        let assign = match self.kind() {
            TokKind::Assign => Some(AssignTok::Assign),
            TokKind::Define => Some(AssignTok::Define),
            TokKind::AddAssign
            | TokKind::SubAssign
            | TokKind::MulAssign
            | TokKind::QuoAssign
            | TokKind::RemAssign
            | TokKind::AndAssign
            | TokKind::OrAssign
            | TokKind::XorAssign
            | TokKind::ShlAssign
            | TokKind::ShrAssign
            | TokKind::AndNotAssign => Some(AssignTok::Compound),
            _ => None,
        };
        if let Some(tok) = assign {
            let op = self.advance();
            let mut rhs = vec![self.expr()?];
            while self.eat(TokKind::Comma) {
                rhs.push(self.expr()?);
            }
            let end = self.end_of(*rhs.last().unwrap());
            return Ok(self.alloc(
                NodeKind::Assign {
                    lhs,
                    tok,
                    tok_pos: op.pos,
                    rhs,
                },
                start,
                end,
            ));
        }

        if lhs.len() > 1 {
            return self.fail("expected assignment after expression list");
        }
        let x = lhs.pop().unwrap();

        match self.kind() {
            TokKind::Arrow => {
                self.advance();
                let value = self.expr()?;
                let end = self.end_of(value);
                Ok(self.alloc(NodeKind::Send { chan: x, value }, start, end))
            }
            TokKind::Inc | TokKind::Dec => {
                let tok = self.advance();
                Ok(self.alloc(
                    NodeKind::IncDec {
                        x,
                        inc: tok.kind == TokKind::Inc,
                    },
                    start,
                    tok.end,
                ))
            }
            _ => {
                let end = self.end_of(x);
                Ok(self.alloc(NodeKind::ExprStmt { x }, start, end))
            }
        }
    }

    fn if_stmt(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        self.expect(TokKind::If)?;
        self.no_lit_depth += 1;
        let first = self.simple_stmt()?;
        let (init, cond) = if self.at(TokKind::Semi) {
            self.advance();
            let cond = self.expr()?;
            (Some(first), cond)
        } else {
            (None, self.expr_of_stmt(first)?)
        };
        self.no_lit_depth -= 1;
        let body = self.block()?;
        let mut end = self.end_of(body);
        let mut els = None;
        if self.eat(TokKind::Else) {
            let e = if self.at(TokKind::If) {
                self.if_stmt()?
            } else {
                self.block()?
            };
            end = self.end_of(e);
            els = Some(e);
        }
        Ok(self.alloc(
            NodeKind::If {
                init,
                cond,
                body,
                els,
            },
            start,
            end,
        ))
    }

    /// Unwrap an expression statement parsed while looking for a header
    /// condition.
    fn expr_of_stmt(&mut self, stmt: NodeId) -> PResult<NodeId> {
        match self.ast.kind(stmt) {
            NodeKind::ExprStmt { x } => Ok(*x),
            _ => self.fail("expected expression in statement header"),
        }
    }

    fn for_stmt(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        self.expect(TokKind::For)?;
        self.no_lit_depth += 1;

        if self.at(TokKind::LBrace) {
            // for { ... }
            self.no_lit_depth -= 1;
            let body = self.block()?;
            let end = self.end_of(body);
            return Ok(self.alloc(
                NodeKind::For {
                    init: None,
                    cond: None,
                    post: None,
                    body,
                },
                start,
                end,
            ));
        }

        if self.eat(TokKind::Range) {
            // for range x { ... }
            let x = self.expr()?;
            self.no_lit_depth -= 1;
            let body = self.block()?;
            let end = self.end_of(body);
            return Ok(self.alloc(
                NodeKind::RangeFor {
                    key: None,
                    value: None,
                    tok: None,
                    x,
                    body,
                },
                start,
                end,
            ));
        }

        if self.at(TokKind::Semi) {
            // for ; cond; post { ... }
            self.advance();
            let cond = if self.at(TokKind::Semi) {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect(TokKind::Semi)?;
            let post = if self.at(TokKind::LBrace) {
                None
            } else {
                Some(self.simple_stmt()?)
            };
            self.no_lit_depth -= 1;
            let body = self.block()?;
            let end = self.end_of(body);
            return Ok(self.alloc(
                NodeKind::For {
                    init: None,
                    cond,
                    post,
                    body,
                },
                start,
                end,
            ));
        }

        // Parse the first clause, watching for `lhs := range x`.
        let mut lhs = vec![self.expr()?];
        while self.eat(TokKind::Comma) {
            lhs.push(self.expr()?);
        }
        let assign_tok = match self.kind() {
            TokKind::Assign => Some(AssignTok::Assign),
            TokKind::Define => Some(AssignTok::Define),
            _ => None,
        };
        if let Some(tok) = assign_tok {
            if self.peek_kind(1) == TokKind::Range {
                self.advance(); // = or :=
                self.advance(); // range
                let x = self.expr()?;
                if lhs.len() > 2 {
                    return self.fail("too many variables in range clause");
                }
                let key = Some(lhs[0]);
                let value = lhs.get(1).copied();
                self.no_lit_depth -= 1;
                let body = self.block()?;
                let end = self.end_of(body);
                return Ok(self.alloc(
                    NodeKind::RangeFor {
                        key,
                        value,
                        tok: Some(tok),
                        x,
                        body,
                    },
                    start,
                    end,
                ));
            }
        }
        let first = self.finish_simple_stmt(lhs)?;

        if self.at(TokKind::Semi) {
            // for init; cond; post { ... }
            self.advance();
            let cond = if self.at(TokKind::Semi) {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect(TokKind::Semi)?;
            let post = if self.at(TokKind::LBrace) {
                None
            } else {
                Some(self.simple_stmt()?)
            };
            self.no_lit_depth -= 1;
            let body = self.block()?;
            let end = self.end_of(body);
            return Ok(self.alloc(
                NodeKind::For {
                    init: Some(first),
                    cond,
                    post,
                    body,
                },
                start,
                end,
            ));
        }

        // for cond { ... }
        let cond = self.expr_of_stmt(first)?;
        self.no_lit_depth -= 1;
        let body = self.block()?;
        let end = self.end_of(body);
        Ok(self.alloc(
            NodeKind::For {
                init: None,
                cond: Some(cond),
                post: None,
                body,
            },
            start,
            end,
        ))
    }

    /// Complete a simple statement whose expression list was already parsed
    /// (used by the `for` header after the range check).
    fn finish_simple_stmt(&mut self, mut lhs: Vec<NodeId>) -> PResult<NodeId> {
        let start = self.ast.pos(lhs[0]);
        let assign = match self.kind() {
            TokKind::Assign => Some(AssignTok::Assign),
            TokKind::Define => Some(AssignTok::Define),
            TokKind::AddAssign
            | TokKind::SubAssign
            | TokKind::MulAssign
            | TokKind::QuoAssign
            | TokKind::RemAssign
            | TokKind::AndAssign
            | TokKind::OrAssign
            | TokKind::XorAssign
            | TokKind::ShlAssign
            | TokKind::ShrAssign
            | TokKind::AndNotAssign => Some(AssignTok::Compound),
            _ => None,
        };
        if let Some(tok) = assign {
            let op = self.advance();
            let mut rhs = vec![self.expr()?];
            while self.eat(TokKind::Comma) {
                rhs.push(self.expr()?);
            }
            let end = self.end_of(*rhs.last().unwrap());
            return Ok(self.alloc(
                NodeKind::Assign {
                    lhs,
                    tok,
                    tok_pos: op.pos,
                    rhs,
                },
                start,
                end,
            ));
        }
        if lhs.len() > 1 {
            return self.fail("expected assignment after expression list");
        }
        let x = lhs.pop().unwrap();
        match self.kind() {
            TokKind::Arrow => {
                self.advance();
                let value = self.expr()?;
                let end = self.end_of(value);
                Ok(self.alloc(NodeKind::Send { chan: x, value }, start, end))
            }
            TokKind::Inc | TokKind::Dec => {
                let tok = self.advance();
                Ok(self.alloc(
                    NodeKind::IncDec {
                        x,
                        inc: tok.kind == TokKind::Inc,
                    },
                    start,
                    tok.end,
                ))
            }
            _ => {
                let end = self.end_of(x);
                Ok(self.alloc(NodeKind::ExprStmt { x }, start, end))
            }
        }
    }

    fn switch_stmt(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        self.expect(TokKind::Switch)?;
        self.no_lit_depth += 1;

        let mut init = None;
        let mut subject = None;
        if !self.at(TokKind::LBrace) {
            let first = self.simple_stmt()?;
            if self.at(TokKind::Semi) {
                self.advance();
                init = Some(first);
                if !self.at(TokKind::LBrace) {
                    subject = Some(self.simple_stmt()?);
                }
            } else {
                subject = Some(first);
            }
        }
        self.no_lit_depth -= 1;

        // Type switch if the subject is `x := y.(type)` or `y.(type)`.
        let is_type_switch = subject
            .map(|s| self.is_type_switch_guard(s))
            .unwrap_or(false);

        self.expect(TokKind::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(TokKind::RBrace) && !self.at(TokKind::Eof) {
            cases.push(self.case_clause()?);
        }
        let rbrace = self.expect(TokKind::RBrace)?;

        if is_type_switch {
            Ok(self.alloc(
                NodeKind::TypeSwitch {
                    init,
                    assign: subject.unwrap(),
                    cases,
                },
                start,
                rbrace.end,
            ))
        } else {
            let tag = match subject {
                Some(s) => Some(self.expr_of_stmt(s)?),
                None => None,
            };
            Ok(self.alloc(NodeKind::Switch { init, tag, cases }, start, rbrace.end))
        }
    }

    fn is_type_switch_guard(&self, stmt: NodeId) -> bool {
        let is_type_assert = |x: NodeId| {
            matches!(
                self.ast.kind(x),
                NodeKind::TypeAssert { ty: None, .. }
            )
        };
        match self.ast.kind(stmt) {
            NodeKind::ExprStmt { x } => is_type_assert(*x),
            NodeKind::Assign { tok, rhs, .. } => {
                *tok == AssignTok::Define && rhs.len() == 1 && is_type_assert(rhs[0])
            }
            _ => false,
        }
    }

    fn case_clause(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        let mut values = Vec::new();
        if self.eat(TokKind::Case) {
            values.push(self.expr()?);
            while self.eat(TokKind::Comma) {
                values.push(self.expr()?);
            }
        } else {
            self.expect(TokKind::Default)?;
        }
        let colon_tok = self.expect(TokKind::Colon)?;
        let mut body = Vec::new();
        while !matches!(self.kind(), TokKind::Case | TokKind::Default | TokKind::RBrace | TokKind::Eof)
        {
            let s = self.stmt()?;
            body.push(s);
            self.expect_semi()?;
        }
        let end = body
            .last()
            .map(|&s| self.end_of(s))
            .unwrap_or(colon_tok.end);
        Ok(self.alloc(
            NodeKind::Case {
                values,
                colon: colon_tok.pos,
                body,
            },
            start,
            end,
        ))
    }

    fn select_stmt(&mut self) -> PResult<NodeId> {
        let start = self.pos();
        self.expect(TokKind::Select)?;
        self.expect(TokKind::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(TokKind::RBrace) && !self.at(TokKind::Eof) {
            let cstart = self.pos();
            let comm = if self.eat(TokKind::Case) {
                Some(self.simple_stmt()?)
            } else {
                self.expect(TokKind::Default)?;
                None
            };
            let colon_tok = self.expect(TokKind::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.kind(),
                TokKind::Case | TokKind::Default | TokKind::RBrace | TokKind::Eof
            ) {
                let s = self.stmt()?;
                body.push(s);
                self.expect_semi()?;
            }
            let end = body
                .last()
                .map(|&s| self.end_of(s))
                .unwrap_or(colon_tok.end);
            cases.push(self.alloc(
                NodeKind::Comm {
                    comm,
                    colon: colon_tok.pos,
                    body,
                },
                cstart,
                end,
            ));
        }
        let rbrace = self.expect(TokKind::RBrace)?;
        Ok(self.alloc(NodeKind::Select { cases }, start, rbrace.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> (FileSet, Ast, File) {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let file = parse_file(&mut fset, &mut ast, Path::new("test.go"), src.to_string())
            .expect("parse failed");
        (fset, ast, file)
    }

    fn fn_body(ast: &Ast, file: &File) -> NodeId {
        for &d in &file.decls {
            if let NodeKind::FuncDecl { body: Some(b), .. } = ast.kind(d) {
                return *b;
            }
        }
        panic!("no function body");
    }

    #[test]
    fn basic_function() {
        let (_, ast, file) = parse_one("package p\n\nfunc f(x int) int {\n\treturn x + 1\n}\n");
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(ast.kind(stmts[0]), NodeKind::Return { results } if results.len() == 1));
    }

    #[test]
    fn labeled_goto() {
        let (_, ast, file) = parse_one(
            "package p\n\nfunc f() {\n\tgoto L\nL:\n\treturn\n}\n",
        );
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(
            ast.kind(stmts[0]),
            NodeKind::Branch {
                tok: BranchTok::Goto,
                label: Some(_)
            }
        ));
        assert!(matches!(ast.kind(stmts[1]), NodeKind::Labeled { .. }));
    }

    #[test]
    fn labeled_empty_statement() {
        let (_, ast, file) = parse_one("package p\n\nfunc f() {\nL:\n}\n");
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        assert_eq!(stmts.len(), 1);
        match ast.kind(stmts[0]) {
            NodeKind::Labeled { stmt, .. } => {
                assert!(matches!(
                    ast.kind(*stmt),
                    NodeKind::Empty { implicit: true, .. }
                ));
            }
            k => panic!("expected labeled statement, got {k:?}"),
        }
    }

    #[test]
    fn for_clause_forms() {
        let src = "package p\n\nfunc f() {\n\tfor {\n\t}\n\tfor x < 10 {\n\t}\n\tfor i = 0; i < 10; i++ {\n\t}\n\tfor k, v := range m {\n\t\t_ = k\n\t\t_ = v\n\t}\n}\n";
        let (_, ast, file) = parse_one(src);
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        assert!(matches!(
            ast.kind(stmts[0]),
            NodeKind::For {
                init: None,
                cond: None,
                post: None,
                ..
            }
        ));
        assert!(matches!(
            ast.kind(stmts[1]),
            NodeKind::For {
                init: None,
                cond: Some(_),
                post: None,
                ..
            }
        ));
        assert!(matches!(
            ast.kind(stmts[2]),
            NodeKind::For {
                init: Some(_),
                cond: Some(_),
                post: Some(_),
                ..
            }
        ));
        assert!(matches!(
            ast.kind(stmts[3]),
            NodeKind::RangeFor {
                key: Some(_),
                value: Some(_),
                tok: Some(AssignTok::Define),
                ..
            }
        ));
    }

    #[test]
    fn switch_forms() {
        let src = "package p\n\nfunc f(x interface{}) {\n\tswitch x := x.(type) {\n\tcase int:\n\t\t_ = x\n\tdefault:\n\t}\n\tswitch n := 1; n {\n\tcase 1, 2:\n\tdefault:\n\t}\n}\n";
        let (_, ast, file) = parse_one(src);
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        assert!(matches!(ast.kind(stmts[0]), NodeKind::TypeSwitch { .. }));
        match ast.kind(stmts[1]) {
            NodeKind::Switch { init, tag, cases } => {
                assert!(init.is_some());
                assert!(tag.is_some());
                assert_eq!(cases.len(), 2);
            }
            k => panic!("expected switch, got {k:?}"),
        }
    }

    #[test]
    fn select_comm_clauses() {
        let src = "package p\n\nfunc f(ch chan int) {\n\tselect {\n\tcase v := <-ch:\n\t\t_ = v\n\tcase ch <- 1:\n\tdefault:\n\t}\n}\n";
        let (_, ast, file) = parse_one(src);
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        match ast.kind(stmts[0]) {
            NodeKind::Select { cases } => assert_eq!(cases.len(), 3),
            k => panic!("expected select, got {k:?}"),
        }
    }

    #[test]
    fn composite_literal_not_in_header() {
        // `T{}` must not be mistaken for a body in an if header...
        let src = "package p\n\nfunc f() {\n\tif x == (T{}) {\n\t\treturn\n\t}\n\tv := T{A: 1}\n\t_ = v\n}\n";
        let (_, ast, file) = parse_one(src);
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        assert!(matches!(ast.kind(stmts[0]), NodeKind::If { .. }));
        assert!(matches!(
            ast.kind(stmts[1]),
            NodeKind::Assign {
                tok: AssignTok::Define,
                ..
            }
        ));
    }

    #[test]
    fn multi_value_assignment() {
        let (_, ast, file) =
            parse_one("package p\n\nfunc f() {\n\ta, b = g()\n}\n");
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        match ast.kind(stmts[0]) {
            NodeKind::Assign { lhs, tok, rhs, .. } => {
                assert_eq!(lhs.len(), 2);
                assert_eq!(*tok, AssignTok::Assign);
                assert_eq!(rhs.len(), 1);
            }
            k => panic!("expected assignment, got {k:?}"),
        }
    }

    #[test]
    fn address_of_selector_chain() {
        let (_, ast, file) =
            parse_one("package p\n\nfunc f() {\n\t_ = (&(((i)[0]).X))\n}\n");
        let body = fn_body(&ast, &file);
        let stmts = ast.block_list(body).unwrap();
        assert!(matches!(ast.kind(stmts[0]), NodeKind::Assign { .. }));
    }

    #[test]
    fn var_decl_groups() {
        let src = "package p\n\nvar (\n\ta int\n\tb, c string\n)\n\nfunc f() {\n\tvar x int\n\t_ = x\n}\n";
        let (_, ast, file) = parse_one(src);
        match ast.kind(file.decls[0]) {
            NodeKind::GenDecl { tok, specs } => {
                assert_eq!(*tok, DeclTok::Var);
                assert_eq!(specs.len(), 2);
            }
            k => panic!("expected var group, got {k:?}"),
        }
    }

    #[test]
    fn struct_type_decl() {
        let src = "package p\n\ntype T struct {\n\tX     int\n\tSlice []int\n\tPtr   *T\n}\n";
        let (_, ast, file) = parse_one(src);
        match ast.kind(file.decls[0]) {
            NodeKind::GenDecl { specs, .. } => match ast.kind(specs[0]) {
                NodeKind::TypeSpec { ty, .. } => {
                    assert!(matches!(ast.kind(*ty), NodeKind::StructType { fields } if fields.len() == 3));
                }
                k => panic!("expected type spec, got {k:?}"),
            },
            k => panic!("expected type decl, got {k:?}"),
        }
    }

    #[test]
    fn parse_error_reports_line() {
        let mut fset = FileSet::new();
        let mut ast = Ast::new();
        let err = parse_file(
            &mut fset,
            &mut ast,
            Path::new("bad.go"),
            "package p\n\nfunc f() {\n\tif {\n}\n".to_string(),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad.go"), "{msg}");
    }
}

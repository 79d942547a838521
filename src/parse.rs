//! Shared parser state (SPEC_FULL §4.2/§4.3): the lexer, current/lookahead
//! token, the symbol table, AST arena, and data/function bookkeeping that
//! both the expression and statement grammars need. Grounded on `cc.c`'s
//! single global compiler state, reshaped per the Design Notes into one
//! owned context value instead of process globals.

use crate::ast::{Arena, NodeId};
use crate::error::{CcError, CcResult, SourceLoc};
use crate::host::HostCatalog;
use crate::lexer::{Lexer, Token};
use crate::segment::DataSegment;
use crate::symtab::Symtab;
use crate::token::Kind;
use crate::types::{ArrayBounds, Ty};
use std::collections::HashMap;

pub struct FunctionDef {
    pub name: String,
    pub sym: usize,
    pub params: Vec<(String, Ty)>,
    pub ret: Ty,
    pub body: Option<NodeId>,
    pub locals_size: i32,
}

pub struct Parser<'src> {
    pub lexer: Lexer<'src>,
    pub symtab: Symtab,
    pub arena: Arena,
    pub data: DataSegment,
    pub host: HostCatalog,
    pub defines: HashMap<String, i32>,
    pub cur: Token,
    lookahead: Option<Token>,
    pub functions: Vec<FunctionDef>,
    /// Resolved type of each expression node, computed as it is built.
    /// Side-channel to the arena so codegen can pick int/float op variants
    /// without re-deriving types from scratch.
    pub node_types: HashMap<NodeId, Ty>,
    /// Remaining (not-yet-consumed) array dimensions for a node that is a
    /// decayed pointer to a row of a multi-dimensional array, keyed by the
    /// node computing that row's address. Consulted by `finish_index` so
    /// each `[...]` in `a[i][j]` lowers to a flat offset instead of treating
    /// every subscript as single-pointer-level arithmetic.
    pub array_bounds: HashMap<NodeId, ArrayBounds>,
    /// Per-aggregate-type-id member list: (name, type, byte offset).
    pub struct_members: HashMap<u32, Vec<(String, Ty, i32)>>,
    pub struct_sizes: HashMap<u32, i32>,
    pub struct_names: HashMap<String, u32>,
    pub next_type_id: u32,
    /// Next free bp-relative local-variable offset within the function
    /// currently being parsed (locals grow downward from -1).
    pub local_offset: i32,
}

impl<'src> Parser<'src> {
    pub fn new(src: &'src str, data_bound: usize) -> CcResult<Self> {
        let mut symtab = Symtab::new();
        let mut lexer = Lexer::new(src, &mut symtab);
        let mut defines = HashMap::new();
        crate::host::seed_defines(&mut symtab, &mut defines);
        let cur = lexer.next(&mut symtab, &mut defines)?;
        Ok(Parser {
            lexer,
            symtab,
            arena: Arena::new(),
            data: DataSegment::new(data_bound),
            host: HostCatalog::standard(),
            defines,
            cur,
            lookahead: None,
            functions: Vec::new(),
            node_types: HashMap::new(),
            array_bounds: HashMap::new(),
            struct_members: HashMap::new(),
            struct_sizes: HashMap::new(),
            struct_names: HashMap::new(),
            next_type_id: crate::types::FIRST_AGGREGATE,
            local_offset: 0,
        })
    }

    pub fn node_ty(&self, id: NodeId) -> Ty {
        self.node_types.get(&id).copied().unwrap_or(Ty::INT)
    }

    pub fn set_node_ty(&mut self, id: NodeId, ty: Ty) {
        self.node_types.insert(id, ty);
    }

    pub fn loc(&self) -> SourceLoc {
        SourceLoc { line: self.cur.line, text: String::new() }
    }

    pub fn err_syntax(&self, msg: impl Into<String>) -> CcError {
        CcError::syntax(self.loc(), msg)
    }

    pub fn err_semantic(&self, msg: impl Into<String>) -> CcError {
        CcError::semantic(self.loc(), msg)
    }

    pub fn advance(&mut self) -> CcResult<()> {
        self.cur = match self.lookahead.take() {
            Some(tok) => tok,
            None => self.lexer.next(&mut self.symtab, &mut self.defines)?,
        };
        Ok(())
    }

    /// One-token lookahead, used to distinguish a cast `(int)x` from a
    /// parenthesized expression without backtracking.
    pub fn peek_kind(&mut self) -> CcResult<Kind> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next(&mut self.symtab, &mut self.defines)?);
        }
        Ok(self.lookahead.as_ref().unwrap().kind)
    }

    pub fn at(&self, kind: Kind) -> bool {
        self.cur.kind == kind
    }

    pub fn eat(&mut self, kind: Kind) -> CcResult<bool> {
        if self.at(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn expect(&mut self, kind: Kind) -> CcResult<Token> {
        if !self.at(kind) {
            return Err(self.err_syntax(format!("expected {:?}, found {:?}", kind, self.cur.kind)));
        }
        let tok = self.cur.clone();
        self.advance()?;
        Ok(tok)
    }

    pub fn push(&mut self, node: crate::ast::Node) -> NodeId {
        self.arena.push(node)
    }
}

//! Statement and declaration parser (SPEC_FULL §4.3), grounded on `cc.c`'s
//! `stmt()`/`gdecl()`. Builds the same AST arena the expression parser
//! writes into; global declarations, function definitions, and the full
//! statement grammar (control flow, `goto`/labels, `switch`) all live here.

use crate::ast::Node;
use crate::ast::NodeId;
use crate::error::CcResult;
use crate::parse::{FunctionDef, Parser};
use crate::symtab::{Class, SymValue};
use crate::token::Kind;
use crate::types::{ArrayBounds, Ty};

impl<'src> Parser<'src> {
    /// Parses the whole translation unit: a sequence of global
    /// declarations and function definitions, terminated by EOF.
    pub fn compile_unit(&mut self) -> CcResult<()> {
        while !self.at(Kind::Eof) {
            self.global_decl()?;
        }
        Ok(())
    }

    fn global_decl(&mut self) -> CcResult<()> {
        if self.eat(Kind::Enum)? {
            return self.enum_decl();
        }
        let base = self.parse_decl_base_type()?;
        loop {
            let mut ty = base;
            while self.eat(Kind::Mul)? {
                ty = ty.pointer_to();
            }
            let name_tok = self.expect(Kind::Id)?;
            let name = name_tok.text.clone();
            let sym = name_tok.sym.unwrap();

            if self.at(Kind::LParen) {
                self.function_decl(sym, name, ty)?;
                return Ok(());
            }

            let bounds = self.parse_array_dims()?;
            self.declare_global(sym, name, ty, bounds)?;

            if !self.eat(Kind::Comma)? {
                break;
            }
        }
        self.expect(Kind::Semicolon)?;
        Ok(())
    }

    /// `int`/`char`/`float`/`struct ... { ... }`/`union ... { ... }`.
    fn parse_decl_base_type(&mut self) -> CcResult<Ty> {
        match self.cur.kind {
            Kind::Int => {
                self.advance()?;
                Ok(Ty::INT)
            }
            Kind::Char => {
                self.advance()?;
                Ok(Ty::CHAR)
            }
            Kind::Float => {
                self.advance()?;
                Ok(Ty::FLOAT)
            }
            Kind::Struct | Kind::Union => self.struct_or_union_type(),
            other => Err(self.err_syntax(format!("expected a declaration, found {:?}", other))),
        }
    }

    fn struct_or_union_type(&mut self) -> CcResult<Ty> {
        self.advance()?; // 'struct' | 'union'
        let name = if self.at(Kind::Id) {
            let tok = self.expect(Kind::Id)?;
            Some(tok.text)
        } else {
            None
        };

        if self.eat(Kind::LBrace)? {
            let type_id = self.next_type_id;
            self.next_type_id += 1;
            if let Some(n) = &name {
                self.struct_names.insert(n.clone(), type_id);
            }
            let mut members = Vec::new();
            let mut offset = 0i32;
            while !self.at(Kind::RBrace) {
                let member_base = self.parse_decl_base_type()?;
                loop {
                    let mut mty = member_base;
                    while self.eat(Kind::Mul)? {
                        mty = mty.pointer_to();
                    }
                    let tok = self.expect(Kind::Id)?;
                    members.push((tok.text, mty, offset));
                    offset += self.member_size(mty) as i32;
                    if !self.eat(Kind::Comma)? {
                        break;
                    }
                }
                self.expect(Kind::Semicolon)?;
            }
            self.expect(Kind::RBrace)?;
            self.struct_sizes.insert(type_id, offset.max(4));
            self.struct_members.insert(type_id, members);
            return Ok(Ty::new(0, type_id, 0));
        }

        let type_id = name
            .as_ref()
            .and_then(|n| self.struct_names.get(n).copied())
            .ok_or_else(|| self.err_semantic("undeclared struct/union"))?;
        Ok(Ty::new(0, type_id, 0))
    }

    fn member_size(&self, ty: Ty) -> u32 {
        if ty.is_pointer() || ty.is_float() || ty.is_int() {
            4
        } else if ty.is_char() {
            1
        } else {
            *self.struct_sizes.get(&ty.base()).unwrap_or(&4) as u32
        }
    }

    fn enum_decl(&mut self) -> CcResult<()> {
        if self.at(Kind::Id) {
            self.advance()?; // optional enum tag
        }
        self.expect(Kind::LBrace)?;
        let mut next_value = 0i32;
        while !self.at(Kind::RBrace) {
            let tok = self.expect(Kind::Id)?;
            let sym = tok.sym.unwrap();
            if self.eat(Kind::Assign)? {
                let v = self.expect_const_int()?;
                next_value = v;
            }
            let s = self.symtab.get_mut(sym);
            s.class = Class::EnumConst;
            s.value = SymValue::Int(next_value);
            next_value += 1;
            if !self.eat(Kind::Comma)? {
                break;
            }
        }
        self.expect(Kind::RBrace)?;
        self.expect(Kind::Semicolon)?;
        Ok(())
    }

    fn expect_const_int(&mut self) -> CcResult<i32> {
        let negative = self.eat(Kind::Sub)?;
        let tok = self.expect(Kind::Num)?;
        Ok(if negative { -tok.ival } else { tok.ival })
    }

    /// Parses zero or more `[N]` array dimensions (up to 3), honoring the
    /// bounds in SPEC_FULL §3/§8.
    fn parse_array_dims(&mut self) -> CcResult<Option<ArrayBounds>> {
        if !self.at(Kind::Bracket) {
            return Ok(None);
        }
        let mut dims = Vec::new();
        while self.eat(Kind::Bracket)? {
            let n = self.expect_const_int()?;
            self.expect(Kind::RBracket)?;
            dims.push(n as u32);
        }
        let bounds = match dims.as_slice() {
            [a] => ArrayBounds::new_1d(*a),
            [a, b] => ArrayBounds::new_2d(*a, *b),
            [a, b, c] => ArrayBounds::new_3d(*a, *b, *c),
            _ => None,
        };
        bounds.ok_or_else(|| self.err_semantic("array bounds out of range")).map(Some)
    }

    fn declare_global(&mut self, sym: usize, _name: String, ty: Ty, bounds: Option<ArrayBounds>) -> CcResult<()> {
        let elems = bounds.map(|b| b.element_count()).unwrap_or(1);
        let elem_size = self.member_size(ty);
        let addr = self.data.alloc((elems * elem_size) as usize, true)?;

        if self.eat(Kind::Assign)? {
            self.parse_global_initializer(addr, ty, bounds)?;
        }

        let s = self.symtab.get_mut(sym);
        s.class = Class::Global;
        s.ty = match bounds {
            Some(b) => ty.with_rank(b.rank()),
            None => ty,
        };
        s.value = SymValue::Addr(addr as i32);
        s.etype = bounds.map(|b| b.encode());
        Ok(())
    }

    fn parse_global_initializer(&mut self, base_addr: usize, ty: Ty, bounds: Option<ArrayBounds>) -> CcResult<()> {
        match bounds {
            None => self.write_scalar_initializer(base_addr, ty),
            Some(b) => self.write_array_initializer(base_addr, ty, b),
        }
    }

    /// Writes a (possibly nested) `{ ... }` initializer for an array of the
    /// given bounds, recursing one dimension at a time (SPEC_FULL §4.3).
    /// A `char[]` dimension may be filled by a single string literal
    /// instead of a brace list, at any nesting level.
    fn write_array_initializer(&mut self, base_addr: usize, ty: Ty, bounds: ArrayBounds) -> CcResult<()> {
        let elem_size = self.member_size(ty) as usize;
        let inner = bounds.inner_extents();

        if ty.is_char() && inner.is_empty() && self.at(Kind::Num) && !self.cur.text.is_empty() {
            return self.write_char_string_initializer(base_addr, bounds.element_count() as usize);
        }

        self.expect(Kind::LBrace)?;
        let row_elems: u32 = inner.iter().product::<u32>().max(1);
        let row_bytes = elem_size * row_elems as usize;
        let outer_extent = bounds.outer_extent();
        let mut idx = 0usize;
        while !self.at(Kind::RBrace) && (idx as u32) < outer_extent {
            let addr = base_addr + idx * row_bytes;
            match inner.as_slice() {
                [] => self.write_scalar_initializer(addr, ty)?,
                [e1] => self.write_array_initializer(addr, ty, ArrayBounds::D1 { extent: *e1 })?,
                [e1, e2] => self.write_array_initializer(addr, ty, ArrayBounds::D2 { e0: *e1, e1: *e2 })?,
                _ => unreachable!("arrays are capped at rank 3"),
            }
            idx += 1;
            if !self.eat(Kind::Comma)? {
                break;
            }
        }
        self.expect(Kind::RBrace)?;
        Ok(())
    }

    /// Writes a string-literal initializer for a `char[capacity]` dimension,
    /// zero-filling any remainder and warning (but not erroring) if the
    /// literal is longer than the declared extent (SPEC_FULL §4.3).
    fn write_char_string_initializer(&mut self, addr: usize, capacity: usize) -> CcResult<()> {
        let text = self.cur.text.clone();
        let line = self.cur.line;
        self.advance()?;
        let mut bytes = text.into_bytes();
        if bytes.len() > capacity {
            eprintln!("{}: warning: initializer string truncated to fit char[{}]", line, capacity);
            bytes.truncate(capacity);
        }
        self.data.write_bytes(addr, &bytes);
        for i in bytes.len()..capacity {
            self.data.write_u8(addr + i, 0);
        }
        Ok(())
    }

    fn write_scalar_initializer(&mut self, addr: usize, ty: Ty) -> CcResult<()> {
        if self.at(Kind::Num) && !self.cur.text.is_empty() {
            // string initializer for a char[] declarator
            let text = self.cur.text.clone();
            self.advance()?;
            let bytes = text.into_bytes();
            let n = bytes.len();
            self.data.write_bytes(addr, &bytes);
            self.data.write_u8(addr + n, 0);
            return Ok(());
        }
        let negative = self.eat(Kind::Sub)?;
        if ty.is_float() {
            let tok = self.expect(Kind::NumF)?;
            let v = if negative { -tok.fval } else { tok.fval };
            self.data.write_f32(addr, v);
        } else if self.at(Kind::NumF) {
            let tok = self.expect(Kind::NumF)?;
            let v = if negative { -tok.fval } else { tok.fval };
            self.data.write_i32(addr, v as i32);
        } else {
            let tok = self.expect(Kind::Num)?;
            let v = if negative { -tok.ival } else { tok.ival };
            self.data.write_i32(addr, v);
        }
        Ok(())
    }

    fn function_decl(&mut self, sym: usize, name: String, ret: Ty) -> CcResult<()> {
        self.advance()?; // '('
        self.local_offset = 0;
        let mark = self.symtab.shadow_mark();

        let mut params = Vec::new();
        if !self.at(Kind::RParen) {
            loop {
                let base = self.parse_decl_base_type()?;
                let mut pty = base;
                while self.eat(Kind::Mul)? {
                    pty = pty.pointer_to();
                }
                let tok = self.expect(Kind::Id)?;
                let psym = tok.sym.unwrap();
                self.symtab.shadow(psym);
                let offset = 2 + params.len() as i32;
                let s = self.symtab.get_mut(psym);
                s.class = Class::Param;
                s.ty = pty;
                s.value = SymValue::Addr(offset);
                params.push((tok.text, pty));
                if !self.eat(Kind::Comma)? {
                    break;
                }
            }
        }
        self.expect(Kind::RParen)?;

        if params.len() as u32 > crate::types::FuncSig::MAX_PARAMS {
            return Err(self.err_semantic("too many parameters"));
        }

        let func_idx = if let SymValue::Index(i) = self.symtab.get(sym).value {
            if self.functions[i].body.is_some() {
                return Err(self.err_semantic(format!("redefinition of function '{}'", name)));
            }
            i
        } else {
            let i = self.functions.len();
            self.functions.push(FunctionDef { name: name.clone(), sym, params: params.clone(), ret, body: None, locals_size: 0 });
            let s = self.symtab.get_mut(sym);
            s.class = Class::Function;
            s.ty = ret;
            s.value = SymValue::Index(i);
            i
        };

        if self.eat(Kind::Semicolon)? {
            self.symtab.restore_to(mark);
            return Ok(()); // prototype only
        }

        let body = self.block()?;
        self.symtab.restore_to(mark);
        let locals_size = -self.local_offset;
        self.functions[func_idx].body = Some(body);
        self.functions[func_idx].locals_size = locals_size;
        Ok(())
    }

    fn block(&mut self) -> CcResult<NodeId> {
        self.expect(Kind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(Kind::RBrace) {
            stmts.push(self.stmt_or_local_decl()?);
        }
        self.expect(Kind::RBrace)?;
        Ok(self.push(Node::Begin(stmts)))
    }

    fn stmt_or_local_decl(&mut self) -> CcResult<NodeId> {
        match self.cur.kind {
            Kind::Int | Kind::Char | Kind::Float | Kind::Struct | Kind::Union => self.local_decl(),
            _ => self.stmt(),
        }
    }

    fn local_decl(&mut self) -> CcResult<NodeId> {
        let base = self.parse_decl_base_type()?;
        let mut decls = Vec::new();
        loop {
            let mut ty = base;
            while self.eat(Kind::Mul)? {
                ty = ty.pointer_to();
            }
            let tok = self.expect(Kind::Id)?;
            let sym = tok.sym.unwrap();
            let bounds = self.parse_array_dims()?;
            // Stack slots are word-granular regardless of element type, so a
            // local's footprint is just its element count.
            let slots = bounds.map(|b| b.element_count()).unwrap_or(1) as i32;
            self.local_offset -= slots;
            let offset = self.local_offset;
            self.symtab.shadow(sym);
            let s = self.symtab.get_mut(sym);
            s.class = Class::Local;
            s.ty = match bounds {
                Some(b) => ty.with_rank(b.rank()),
                None => ty,
            };
            s.value = SymValue::Addr(offset);
            s.etype = bounds.map(|b| b.encode());

            let init = if self.eat(Kind::Assign)? { Some(self.expr()?) } else { None };
            if let Some(rhs) = init {
                let addr_node = self.push(Node::Loc { offset });
                self.set_node_ty(addr_node, ty);
                let rhs = self.coerce_for_local(rhs, ty)?;
                let assign = self.push(Node::Assign { lhs: addr_node, rhs });
                self.set_node_ty(assign, ty);
                decls.push(self.push(Node::ExprStmt(assign)));
            }
            if !self.eat(Kind::Comma)? {
                break;
            }
        }
        self.expect(Kind::Semicolon)?;
        Ok(self.push(Node::Begin(decls)))
    }

    fn coerce_for_local(&mut self, rhs: NodeId, ty: Ty) -> CcResult<NodeId> {
        if self.node_ty(rhs).is_float() == ty.is_float() {
            return Ok(rhs);
        }
        let to_float = ty.is_float();
        let id = self.push(Node::CastF { to_float, expr: rhs });
        self.set_node_ty(id, ty);
        Ok(id)
    }

    pub fn stmt(&mut self) -> CcResult<NodeId> {
        match self.cur.kind {
            Kind::LBrace => self.block(),
            Kind::If => self.if_stmt(),
            Kind::While => self.while_stmt(),
            Kind::DoWhile => self.do_while_stmt(),
            Kind::For => self.for_stmt(),
            Kind::Switch => self.switch_stmt(),
            Kind::Case => self.case_stmt(),
            Kind::Default => self.default_stmt(),
            Kind::Break => {
                self.advance()?;
                self.expect(Kind::Semicolon)?;
                Ok(self.push(Node::Break))
            }
            Kind::Continue => {
                self.advance()?;
                self.expect(Kind::Semicolon)?;
                Ok(self.push(Node::Continue))
            }
            Kind::Goto => {
                self.advance()?;
                let tok = self.expect(Kind::Id)?;
                self.expect(Kind::Semicolon)?;
                Ok(self.push(Node::Goto { label: tok.text }))
            }
            Kind::Return => {
                self.advance()?;
                let value = if self.at(Kind::Semicolon) { None } else { Some(self.expr()?) };
                self.expect(Kind::Semicolon)?;
                Ok(self.push(Node::Return(value)))
            }
            Kind::Semicolon => {
                self.advance()?;
                Ok(self.push(Node::Begin(Vec::new())))
            }
            Kind::Id => self.label_or_expr_stmt(),
            _ => {
                let e = self.expr()?;
                self.expect(Kind::Semicolon)?;
                Ok(self.push(Node::ExprStmt(e)))
            }
        }
    }

    /// An identifier statement is either `label:` or the start of an
    /// expression statement; distinguished with one token of lookahead.
    fn label_or_expr_stmt(&mut self) -> CcResult<NodeId> {
        if self.peek_kind()? == Kind::Colon {
            let tok = self.expect(Kind::Id)?;
            self.advance()?; // ':'
            let body = self.stmt()?;
            return Ok(self.push(Node::Label { name: tok.text, body }));
        }
        let e = self.expr()?;
        self.expect(Kind::Semicolon)?;
        Ok(self.push(Node::ExprStmt(e)))
    }

    fn if_stmt(&mut self) -> CcResult<NodeId> {
        self.advance()?;
        self.expect(Kind::LParen)?;
        let cond = self.expr()?;
        self.expect(Kind::RParen)?;
        let then_branch = self.stmt()?;
        let else_branch = if self.eat(Kind::Else)? { Some(self.stmt()?) } else { None };
        Ok(self.push(Node::If { cond, then_branch, else_branch }))
    }

    fn while_stmt(&mut self) -> CcResult<NodeId> {
        self.advance()?;
        self.expect(Kind::LParen)?;
        let cond = self.expr()?;
        self.expect(Kind::RParen)?;
        let body = self.stmt()?;
        Ok(self.push(Node::While { cond, body }))
    }

    fn do_while_stmt(&mut self) -> CcResult<NodeId> {
        self.advance()?;
        let body = self.stmt()?;
        self.expect(Kind::While)?;
        self.expect(Kind::LParen)?;
        let cond = self.expr()?;
        self.expect(Kind::RParen)?;
        self.expect(Kind::Semicolon)?;
        Ok(self.push(Node::DoWhile { cond, body }))
    }

    fn for_stmt(&mut self) -> CcResult<NodeId> {
        self.advance()?;
        self.expect(Kind::LParen)?;
        let init = if self.at(Kind::Semicolon) { None } else { Some(self.expr()?) };
        self.expect(Kind::Semicolon)?;
        let cond = if self.at(Kind::Semicolon) { None } else { Some(self.expr()?) };
        self.expect(Kind::Semicolon)?;
        let step = if self.at(Kind::RParen) { None } else { Some(self.expr()?) };
        self.expect(Kind::RParen)?;
        let body = self.stmt()?;
        Ok(self.push(Node::For { init, cond, step, body }))
    }

    fn switch_stmt(&mut self) -> CcResult<NodeId> {
        self.advance()?;
        self.expect(Kind::LParen)?;
        let cond = self.expr()?;
        self.expect(Kind::RParen)?;
        let body = self.stmt()?;
        Ok(self.push(Node::Switch { cond, body }))
    }

    fn case_stmt(&mut self) -> CcResult<NodeId> {
        self.advance()?;
        let value = self.expect_const_int()?;
        self.expect(Kind::Colon)?;
        let body = self.stmt()?;
        Ok(self.push(Node::Case { value, body }))
    }

    fn default_stmt(&mut self) -> CcResult<NodeId> {
        self.advance()?;
        self.expect(Kind::Colon)?;
        let body = self.stmt()?;
        Ok(self.push(Node::Default { body }))
    }
}

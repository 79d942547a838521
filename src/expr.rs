//! Pratt-style expression parser (SPEC_FULL §4.2), grounded on `cc.c`'s
//! `expr()`. Builds AST nodes bottom-up, folding constants, scaling pointer
//! arithmetic, and resolving casts and multi-dimensional subscripting as it
//! goes, rather than as a separate pass.

use crate::ast::{CallTarget, Node, NodeId};
use crate::error::CcResult;
use crate::symtab::{Class, SymValue};
use crate::token::Kind;
use crate::types::{ArrayBounds, Ty};
use crate::value::Value;

use crate::parse::Parser;

impl<'src> Parser<'src> {
    pub fn expr(&mut self) -> CcResult<NodeId> {
        self.assignment()
    }

    fn assignment(&mut self) -> CcResult<NodeId> {
        let lhs = self.ternary()?;
        if self.at(Kind::Assign) {
            self.advance()?;
            let rhs = self.assignment()?;
            return self.build_assign(lhs, rhs);
        }
        if let Some(base_op) = self.cur.kind.assign_base_op() {
            self.advance()?;
            let rhs = self.assignment()?;
            let folded_op = self.resolve_binary(base_op, lhs, rhs)?;
            return self.build_assign(lhs, folded_op);
        }
        Ok(lhs)
    }

    fn build_assign(&mut self, lhs: NodeId, rhs: NodeId) -> CcResult<NodeId> {
        let lhs_ty = self.node_ty(lhs);
        let rhs = self.coerce(rhs, lhs_ty)?;
        let id = self.push(Node::Assign { lhs, rhs });
        self.set_node_ty(id, lhs_ty);
        Ok(id)
    }

    fn ternary(&mut self) -> CcResult<NodeId> {
        let cond = self.logical_or()?;
        if self.eat(Kind::Question)? {
            let then_branch = self.expr()?;
            self.expect(Kind::Colon)?;
            let else_branch = self.ternary()?;
            let ty = self.node_ty(then_branch);
            let id = self.push(Node::Cond { cond, then_branch, else_branch: Some(else_branch) });
            self.set_node_ty(id, ty);
            Ok(id)
        } else {
            Ok(cond)
        }
    }

    fn logical_or(&mut self) -> CcResult<NodeId> {
        let mut lhs = self.logical_and()?;
        while self.eat(Kind::Lor)? {
            let rhs = self.logical_and()?;
            lhs = self.push(Node::Logical { op: Kind::Lor, lhs, rhs });
            self.set_node_ty(lhs, Ty::INT);
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> CcResult<NodeId> {
        let mut lhs = self.bitwise_or()?;
        while self.eat(Kind::Lan)? {
            let rhs = self.bitwise_or()?;
            lhs = self.push(Node::Logical { op: Kind::Lan, lhs, rhs });
            self.set_node_ty(lhs, Ty::INT);
        }
        Ok(lhs)
    }

    fn bitwise_or(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::Or, &[Kind::Or], Self::bitwise_xor)
    }
    fn bitwise_xor(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::Xor, &[Kind::Xor], Self::bitwise_and)
    }
    fn bitwise_and(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::And, &[Kind::And], Self::equality)
    }
    fn equality(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::Eq, &[Kind::Eq, Kind::Ne], Self::relational)
    }
    fn relational(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::Ge, &[Kind::Ge, Kind::Lt, Kind::Gt, Kind::Le], Self::shift)
    }
    fn shift(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::Shl, &[Kind::Shl, Kind::Shr], Self::additive)
    }
    fn additive(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::Add, &[Kind::Add, Kind::Sub], Self::multiplicative)
    }
    fn multiplicative(&mut self) -> CcResult<NodeId> {
        self.binary_level(Kind::Mul, &[Kind::Mul, Kind::Div, Kind::Mod], Self::unary)
    }

    fn binary_level(
        &mut self,
        _tag: Kind,
        ops: &[Kind],
        mut next: impl FnMut(&mut Self) -> CcResult<NodeId>,
    ) -> CcResult<NodeId> {
        let mut lhs = next(self)?;
        loop {
            let op = ops.iter().copied().find(|&k| self.cur.kind == k);
            match op {
                Some(op) => {
                    self.advance()?;
                    let rhs = next(self)?;
                    lhs = self.resolve_binary(op, lhs, rhs)?;
                }
                None => break,
            }
        }
        Ok(lhs)
    }

    /// Builds a binary node, folding constants, scaling pointer arithmetic,
    /// and promoting int<->float operand pairs (SPEC_FULL §4.2).
    fn resolve_binary(&mut self, op: Kind, lhs: NodeId, rhs: NodeId) -> CcResult<NodeId> {
        let lty = self.node_ty(lhs);
        let rty = self.node_ty(rhs);

        // pointer +/- int scaling
        if matches!(op, Kind::Add | Kind::Sub) && (lty.is_pointer() || rty.is_pointer()) {
            return self.resolve_pointer_arith(op, lhs, rhs, lty, rty);
        }

        if let (Some(a), Some(b)) = (self.const_value(lhs), self.const_value(rhs)) {
            let folded = self.fold(op, a, b);
            let id = match folded {
                Value::Int(i) => self.push(Node::Num(i)),
                Value::Float(f) => self.push(Node::NumF(f)),
            };
            self.set_node_ty(id, if folded.is_float() { Ty::FLOAT } else { Ty::INT });
            return Ok(id);
        }

        let is_float = lty.is_float() || rty.is_float();
        let actual_op = if is_float { op.float_variant() } else { op };
        let id = self.push(Node::Binary { op: actual_op, lhs, rhs });
        let result_ty = if matches!(op, Kind::Eq | Kind::Ne | Kind::Ge | Kind::Lt | Kind::Gt | Kind::Le) {
            Ty::INT
        } else if is_float {
            Ty::FLOAT
        } else {
            Ty::INT
        };
        self.set_node_ty(id, result_ty);
        Ok(id)
    }

    fn resolve_pointer_arith(&mut self, op: Kind, lhs: NodeId, rhs: NodeId, lty: Ty, rty: Ty) -> CcResult<NodeId> {
        if lty.is_pointer() && rty.is_pointer() {
            // ptr - ptr: divide by element size.
            let elem = lty.dereferenced().unwrap();
            let size = self.sizeof_ty(elem) as i32;
            let diff = self.push(Node::Binary { op: Kind::Sub, lhs, rhs });
            self.set_node_ty(diff, Ty::INT);
            let size_node = self.push(Node::Num(size));
            let id = self.push(Node::Binary { op: Kind::Div, lhs: diff, rhs: size_node });
            self.set_node_ty(id, Ty::INT);
            return Ok(id);
        }
        let (ptr, ptr_ty, idx) = if lty.is_pointer() { (lhs, lty, rhs) } else { (rhs, rty, lhs) };
        let elem = ptr_ty.dereferenced().unwrap();
        let size = self.sizeof_ty(elem) as i32;
        let size_node = self.push(Node::Num(size));
        let scaled = self.push(Node::Binary { op: Kind::Mul, lhs: idx, rhs: size_node });
        self.set_node_ty(scaled, Ty::INT);
        let (a, b) = if lty.is_pointer() { (ptr, scaled) } else { (scaled, ptr) };
        let id = self.push(Node::Binary { op, lhs: a, rhs: b });
        self.set_node_ty(id, ptr_ty);
        Ok(id)
    }

    fn const_value(&self, id: NodeId) -> Option<Value> {
        match self.arena.get(id) {
            Node::Num(i) => Some(Value::Int(*i)),
            Node::NumF(f) => Some(Value::Float(*f)),
            _ => None,
        }
    }

    fn fold(&self, op: Kind, a: Value, b: Value) -> Value {
        use Kind::*;
        match op {
            Add => a.add(b),
            Sub => a.sub(b),
            Mul => a.mul(b),
            Div => a.div(b),
            Mod => a.rem(b),
            Or => a.bitwise(b, |x, y| x | y),
            Xor => a.bitwise(b, |x, y| x ^ y),
            And => a.bitwise(b, |x, y| x & y),
            Shl => Value::Int(a.as_i32().wrapping_shl(b.as_i32() as u32)),
            Shr => Value::Int(a.as_i32().wrapping_shr(b.as_i32() as u32)),
            Eq => a.compare(b, |x, y| x == y, |x, y| x == y),
            Ne => a.compare(b, |x, y| x != y, |x, y| x != y),
            Ge => a.compare(b, |x, y| x >= y, |x, y| x >= y),
            Lt => a.compare(b, |x, y| x < y, |x, y| x < y),
            Gt => a.compare(b, |x, y| x > y, |x, y| x > y),
            Le => a.compare(b, |x, y| x <= y, |x, y| x <= y),
            _ => a,
        }
    }

    fn sizeof_ty(&self, ty: Ty) -> u32 {
        if ty.is_pointer() {
            4
        } else if ty.is_float() || ty.is_int() {
            4
        } else if ty.is_char() {
            1
        } else if ty.is_aggregate() {
            *self.struct_sizes.get(&ty.base()).unwrap_or(&4) as u32
        } else {
            4
        }
    }

    /// `sizeof(identifier)` (SPEC_FULL §4.2): element size times the
    /// declared element count for an array, or just the element size for a
    /// scalar.
    fn sizeof_identifier(&mut self) -> CcResult<i32> {
        let sym = self.cur.sym.expect("Id token always carries a symbol index");
        self.advance()?;
        let symbol = self.symtab.get(sym).clone();
        let elem_size = self.sizeof_ty(symbol.ty) as i32;
        let count = symbol
            .etype
            .and_then(|etype| ArrayBounds::decode(etype, symbol.ty.rank()))
            .map(|b| b.element_count() as i32)
            .unwrap_or(1);
        Ok(elem_size * count)
    }

    fn unary(&mut self) -> CcResult<NodeId> {
        match self.cur.kind {
            Kind::Sub => {
                self.advance()?;
                let e = self.unary()?;
                if let Some(v) = self.const_value(e) {
                    let negated = v.negate_float_bits();
                    let id = match negated {
                        Value::Int(i) => self.push(Node::Num(i)),
                        Value::Float(f) => self.push(Node::NumF(f)),
                    };
                    self.set_node_ty(id, self.node_ty(e));
                    return Ok(id);
                }
                let ty = self.node_ty(e);
                let id = self.push(Node::Unary { op: Kind::Sub, expr: e });
                self.set_node_ty(id, ty);
                Ok(id)
            }
            Kind::Not | Kind::Tilde => {
                let op = self.cur.kind;
                self.advance()?;
                let e = self.unary()?;
                let id = self.push(Node::Unary { op, expr: e });
                self.set_node_ty(id, Ty::INT);
                Ok(id)
            }
            Kind::Mul => {
                // pointer dereference
                self.advance()?;
                let e = self.unary()?;
                let ety = self.node_ty(e);
                let pointee = ety.dereferenced().ok_or_else(|| self.err_semantic("dereference of non-pointer"))?;
                let id = self.push(Node::Load { ty: pointee, addr: e });
                self.set_node_ty(id, pointee);
                Ok(id)
            }
            Kind::And => {
                // address-of: strip the Load wrapper from its operand.
                self.advance()?;
                let e = self.unary()?;
                match self.arena.get(e).clone() {
                    Node::Load { addr, ty } => {
                        self.set_node_ty(addr, ty.pointer_to());
                        Ok(addr)
                    }
                    _ => Err(self.err_semantic("address-of requires an lvalue")),
                }
            }
            Kind::Inc | Kind::Dec => {
                let op = self.cur.kind;
                self.advance()?;
                let target = self.unary()?;
                self.build_incdec(op, target, false)
            }
            Kind::Sizeof => {
                self.advance()?;
                self.expect(Kind::LParen)?;
                let size = if self.at(Kind::Id) {
                    self.sizeof_identifier()?
                } else {
                    let (ty, _bounds) = self.parse_type_name()?;
                    self.sizeof_ty(ty) as i32
                };
                self.expect(Kind::RParen)?;
                let id = self.push(Node::Num(size));
                self.set_node_ty(id, Ty::INT);
                Ok(id)
            }
            Kind::LParen if self.is_cast_ahead() => {
                self.advance()?;
                let (ty, _) = self.parse_type_name()?;
                self.expect(Kind::RParen)?;
                let e = self.unary()?;
                let ety = self.node_ty(e);
                let to_float = ty.is_float();
                if let Some(v) = self.const_value(e) {
                    let folded = if to_float { Value::Float(v.as_f32()) } else { Value::Int(v.as_i32()) };
                    let id = match folded {
                        Value::Int(i) => self.push(Node::Num(i)),
                        Value::Float(f) => self.push(Node::NumF(f)),
                    };
                    self.set_node_ty(id, ty);
                    return Ok(id);
                }
                if ety.is_float() == to_float {
                    self.set_node_ty(e, ty);
                    return Ok(e);
                }
                let id = self.push(Node::CastF { to_float, expr: e });
                self.set_node_ty(id, ty);
                Ok(id)
            }
            _ => self.postfix(),
        }
    }

    fn build_incdec(&mut self, op: Kind, target: NodeId, postfix: bool) -> CcResult<NodeId> {
        let (addr, ty) = match self.arena.get(target).clone() {
            Node::Load { addr, ty } => (addr, ty),
            _ => return Err(self.err_semantic("++/-- requires an lvalue")),
        };
        let step = if ty.is_pointer() { self.sizeof_ty(ty.dereferenced().unwrap()) as i32 } else { 1 };
        let id = self.push(Node::IncDec { op, addr, ty, step, postfix });
        self.set_node_ty(id, ty);
        Ok(id)
    }

    /// `(` followed directly by a type keyword marks a cast, not a
    /// parenthesized expression.
    fn is_cast_ahead(&mut self) -> bool {
        matches!(
            self.peek_kind(),
            Ok(Kind::Int) | Ok(Kind::Char) | Ok(Kind::Float) | Ok(Kind::Struct) | Ok(Kind::Union)
        )
    }

    fn postfix(&mut self) -> CcResult<NodeId> {
        let mut node = self.primary()?;
        loop {
            match self.cur.kind {
                Kind::Bracket => {
                    self.advance()?;
                    let index = self.expr()?;
                    self.expect(Kind::RBracket)?;
                    node = self.finish_index(node, index)?;
                }
                Kind::Inc | Kind::Dec => {
                    let op = self.cur.kind;
                    self.advance()?;
                    node = self.build_incdec(op, node, true)?;
                }
                Kind::Dot | Kind::Arrow => {
                    let arrow = self.cur.kind == Kind::Arrow;
                    self.advance()?;
                    node = self.finish_member(node, arrow)?;
                }
                _ => break,
            }
        }
        Ok(node)
    }

    /// Struct `.`/`->` member access (SPEC_FULL §4.2): resolves the member
    /// by name in the aggregate's member list and adds its byte offset.
    fn finish_member(&mut self, base: NodeId, arrow: bool) -> CcResult<NodeId> {
        let name_tok = self.expect(Kind::Id)?;
        let base_ty = self.node_ty(base);
        let struct_ty = if arrow {
            base_ty.dereferenced().ok_or_else(|| self.err_semantic("-> requires a pointer"))?
        } else {
            base_ty
        };
        let members = self
            .struct_members
            .get(&struct_ty.base())
            .ok_or_else(|| self.err_semantic("not a struct or union"))?;
        let (_, member_ty, offset) = members
            .iter()
            .find(|(n, _, _)| *n == name_tok.text)
            .cloned()
            .ok_or_else(|| self.err_semantic(format!("no member '{}'", name_tok.text)))?;

        let base_addr = if arrow {
            // base is already a Load of the pointer; reuse its address expression's value.
            base
        } else {
            match self.arena.get(base).clone() {
                Node::Load { addr, .. } => addr,
                other_base => {
                    let _ = other_base;
                    base
                }
            }
        };
        let addr = if offset == 0 {
            base_addr
        } else {
            let off_node = self.push(Node::Num(offset));
            let id = self.push(Node::Binary { op: Kind::Add, lhs: base_addr, rhs: off_node });
            self.set_node_ty(id, struct_ty.pointer_to());
            id
        };
        self.set_node_ty(addr, member_ty.pointer_to());
        let id = self.push(Node::Load { ty: member_ty, addr });
        self.set_node_ty(id, member_ty);
        Ok(id)
    }

    fn finish_index(&mut self, base: NodeId, index: NodeId) -> CcResult<NodeId> {
        let base_ty = self.node_ty(base);
        if let Some(bounds) = self.array_bounds.get(&base).copied() {
            return self.finish_array_index(base, index, base_ty, bounds);
        }
        let addr = self.resolve_pointer_arith(Kind::Add, base, index, base_ty, self.node_ty(index))?;
        let pointee = base_ty.dereferenced().ok_or_else(|| self.err_semantic("subscript of non-array"))?;
        let id = self.push(Node::Load { ty: pointee, addr });
        self.set_node_ty(id, pointee);
        Ok(id)
    }

    /// Lowers one level of an N-D subscript (SPEC_FULL §4.2:
    /// `sum_i idx_i * product_{j>i}(bound_j+1)`): scales `index` by the
    /// byte size of one row of the remaining inner dimensions, adds it to
    /// `base`, then either loads the scalar (innermost dimension) or decays
    /// to a pointer to the next row and records its remaining bounds so a
    /// following `[...]` keeps unwinding instead of re-deriving them.
    fn finish_array_index(&mut self, base: NodeId, index: NodeId, base_ty: Ty, bounds: ArrayBounds) -> CcResult<NodeId> {
        let elem_ty = base_ty.dereferenced().ok_or_else(|| self.err_semantic("subscript of non-array"))?;
        let elem_size = self.sizeof_ty(elem_ty) as i32;
        let inner = bounds.inner_extents();
        let stride_elems: u32 = inner.iter().product::<u32>().max(1);
        let byte_stride = elem_size * stride_elems as i32;

        let stride_node = self.push(Node::Num(byte_stride));
        let scaled = self.push(Node::Binary { op: Kind::Mul, lhs: index, rhs: stride_node });
        self.set_node_ty(scaled, Ty::INT);
        let addr = self.push(Node::Binary { op: Kind::Add, lhs: base, rhs: scaled });
        self.set_node_ty(addr, elem_ty.pointer_to());

        if bounds.rank() == 1 {
            let id = self.push(Node::Load { ty: elem_ty, addr });
            self.set_node_ty(id, elem_ty);
            return Ok(id);
        }
        let next_bounds = match bounds {
            ArrayBounds::D2 { e1, .. } => ArrayBounds::D1 { extent: e1 },
            ArrayBounds::D3 { e1, e2, .. } => ArrayBounds::D2 { e0: e1, e1: e2 },
            ArrayBounds::D1 { .. } => unreachable!("rank 1 handled above"),
        };
        self.array_bounds.insert(addr, next_bounds);
        Ok(addr)
    }

    fn primary(&mut self) -> CcResult<NodeId> {
        match self.cur.kind {
            Kind::Num => {
                let v = self.cur.ival;
                let is_string = !self.cur.text.is_empty();
                if is_string {
                    let text = self.cur.text.clone();
                    self.advance()?;
                    let mut bytes = text.into_bytes();
                    bytes.push(0);
                    let addr = self.data.alloc(bytes.len(), true).map_err(|e| e)?;
                    self.data.write_bytes(addr, &bytes);
                    let id = self.push(Node::Num(addr as i32));
                    self.set_node_ty(id, Ty::CHAR.pointer_to());
                    return Ok(id);
                }
                self.advance()?;
                let id = self.push(Node::Num(v));
                self.set_node_ty(id, Ty::INT);
                Ok(id)
            }
            Kind::NumF => {
                let v = self.cur.fval;
                self.advance()?;
                let id = self.push(Node::NumF(v));
                self.set_node_ty(id, Ty::FLOAT);
                Ok(id)
            }
            Kind::LParen => {
                self.advance()?;
                let e = self.expr()?;
                self.expect(Kind::RParen)?;
                Ok(e)
            }
            Kind::Id => self.primary_ident(),
            other => Err(self.err_syntax(format!("unexpected token {:?} in expression", other))),
        }
    }

    fn primary_ident(&mut self) -> CcResult<NodeId> {
        let sym = self.cur.sym.expect("Id token always carries a symbol index");
        self.advance()?;

        if self.at(Kind::LParen) {
            return self.call_by_symbol(sym);
        }

        let symbol = self.symtab.get(sym).clone();
        match symbol.class {
            Class::EnumConst => {
                let v = match symbol.value {
                    SymValue::Int(i) => i,
                    _ => 0,
                };
                let id = self.push(Node::Num(v));
                self.set_node_ty(id, Ty::INT);
                Ok(id)
            }
            Class::Global => {
                let addr = match symbol.value {
                    SymValue::Addr(a) => a,
                    _ => 0,
                };
                let addr_node = self.push(Node::Glo { addr });
                self.set_node_ty(addr_node, symbol.ty);
                if let Some(etype) = symbol.etype {
                    // arrays decay to a pointer to their first element,
                    // remembering the remaining bounds for `[...]` to consume.
                    self.set_node_ty(addr_node, symbol.ty.pointer_to());
                    if let Some(bounds) = ArrayBounds::decode(etype, symbol.ty.rank()) {
                        self.array_bounds.insert(addr_node, bounds);
                    }
                    return Ok(addr_node);
                }
                let id = self.push(Node::Load { ty: symbol.ty, addr: addr_node });
                self.set_node_ty(id, symbol.ty);
                Ok(id)
            }
            Class::Local | Class::Param => {
                let offset = match symbol.value {
                    SymValue::Addr(a) => a,
                    _ => 0,
                };
                let addr_node = self.push(Node::Loc { offset });
                self.set_node_ty(addr_node, symbol.ty);
                if let Some(etype) = symbol.etype {
                    self.set_node_ty(addr_node, symbol.ty.pointer_to());
                    if let Some(bounds) = ArrayBounds::decode(etype, symbol.ty.rank()) {
                        self.array_bounds.insert(addr_node, bounds);
                    }
                    return Ok(addr_node);
                }
                let id = self.push(Node::Load { ty: symbol.ty, addr: addr_node });
                self.set_node_ty(id, symbol.ty);
                Ok(id)
            }
            _ => Err(self.err_semantic(format!("'{}' is not a variable", symbol.name))),
        }
    }

    fn call_by_symbol(&mut self, sym: usize) -> CcResult<NodeId> {
        self.advance()?; // '('
        let mut args = Vec::new();
        if !self.at(Kind::RParen) {
            loop {
                args.push(self.expr()?);
                if !self.eat(Kind::Comma)? {
                    break;
                }
            }
        }
        self.expect(Kind::RParen)?;

        let symbol = self.symtab.get(sym).clone();
        match symbol.class {
            Class::Syscall => {
                let host_idx = match symbol.value {
                    SymValue::Index(i) => i,
                    _ => return Err(self.err_semantic("malformed syscall symbol")),
                };
                let returns_float = self.host.get(host_idx).returns_float;
                let id = self.push(Node::Call { callee: CallTarget::Syscall { host_idx }, args });
                self.set_node_ty(id, if returns_float { Ty::FLOAT } else { Ty::INT });
                Ok(id)
            }
            Class::Function => {
                let func_idx = match symbol.value {
                    SymValue::Index(i) => i,
                    _ => return Err(self.err_semantic("call to undeclared function")),
                };
                let ret = self.functions[func_idx].ret;
                let id = self.push(Node::Call { callee: CallTarget::Function { sym: func_idx }, args });
                self.set_node_ty(id, ret);
                Ok(id)
            }
            _ => {
                if let Some(host_idx) = self.host.lookup(&symbol.name) {
                    let returns_float = self.host.get(host_idx).returns_float;
                    let s = self.symtab.get_mut(sym);
                    s.class = Class::Syscall;
                    s.value = SymValue::Index(host_idx);
                    let id = self.push(Node::Call { callee: CallTarget::Syscall { host_idx }, args });
                    self.set_node_ty(id, if returns_float { Ty::FLOAT } else { Ty::INT });
                    Ok(id)
                } else {
                    Err(self.err_semantic(format!("call to undeclared function '{}'", symbol.name)))
                }
            }
        }
    }

    /// Coerces `id` to `target` via an implicit `CastF` when crossing the
    /// int/float boundary (e.g. assigning an int expression to a float lvalue).
    fn coerce(&mut self, id: NodeId, target: Ty) -> CcResult<NodeId> {
        let current = self.node_ty(id);
        if current.is_float() == target.is_float() {
            return Ok(id);
        }
        if let Some(v) = self.const_value(id) {
            let folded = if target.is_float() { Value::Float(v.as_f32()) } else { Value::Int(v.as_i32()) };
            let out = match folded {
                Value::Int(i) => self.push(Node::Num(i)),
                Value::Float(f) => self.push(Node::NumF(f)),
            };
            self.set_node_ty(out, target);
            return Ok(out);
        }
        let to_float = target.is_float();
        let out = self.push(Node::CastF { to_float, expr: id });
        self.set_node_ty(out, target);
        Ok(out)
    }

    /// Parses a type name used by `sizeof` and casts: base keyword plus any
    /// number of `*`.
    pub fn parse_type_name(&mut self) -> CcResult<(Ty, u32)> {
        let base = match self.cur.kind {
            Kind::Char => Ty::CHAR,
            Kind::Int => Ty::INT,
            Kind::Float => Ty::FLOAT,
            other => return Err(self.err_syntax(format!("expected a type, found {:?}", other))),
        };
        self.advance()?;
        let mut ty = base;
        let mut levels = 0;
        while self.eat(Kind::Mul)? {
            ty = ty.pointer_to();
            levels += 1;
        }
        Ok((ty, levels))
    }
}

//! AST to bytecode lowering (SPEC_FULL §4.4), grounded on `cc.c`'s direct
//! code-emission style but restructured as a two-pass walk over the
//! pre-built AST: a first pass emits every function's body with
//! placeholder jump targets for anything not yet known (forward calls,
//! `goto`, `switch`/`case`, loop exits), a second pass patches them all
//! once every label's final address is on record.

use std::collections::HashMap;

use crate::ast::{Arena, CallTarget, Node, NodeId};
use crate::bytecode::Op;
use crate::error::{CcError, CcResult, SourceLoc};
use crate::parse::{FunctionDef, Parser};
use crate::token::Kind;
use crate::types::Ty;

pub struct Program {
    pub code: Vec<Op>,
    pub entry: usize,
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum LabelKey {
    Function(usize),
    UserLabel(String),
    Case(NodeId),
    Default(NodeId),
    Synthetic(u64),
}

enum ContinueTarget {
    Addr(usize),
    Label(LabelKey),
}

struct Frame {
    continue_target: Option<ContinueTarget>,
    break_label: LabelKey,
}

struct Codegen {
    code: Vec<Op>,
    labels: HashMap<LabelKey, usize>,
    pending: Vec<(usize, LabelKey)>,
    frames: Vec<Frame>,
    next_synth: u64,
    locals_size: i32,
    temp_count: i32,
}

fn load_op(ty: Ty) -> Op {
    if ty.is_char() {
        Op::Lc
    } else if ty.is_float() {
        Op::Lf
    } else {
        Op::Li
    }
}

fn store_op(ty: Ty) -> Op {
    if ty.is_char() {
        Op::Sc
    } else if ty.is_float() {
        Op::Sf
    } else {
        Op::Si
    }
}

fn push_op(ty: Ty) -> Op {
    if ty.is_float() {
        Op::PshF
    } else {
        Op::Psh
    }
}

fn binop(op: Kind) -> Op {
    use Kind::*;
    match op {
        Or => Op::Or,
        Xor => Op::Xor,
        And => Op::And,
        Eq => Op::Eq,
        Ne => Op::Ne,
        Ge => Op::Ge,
        Lt => Op::Lt,
        Gt => Op::Gt,
        Le => Op::Le,
        Shl => Op::Shl,
        Shr => Op::Shr,
        Add => Op::Add,
        Sub => Op::Sub,
        Mul => Op::Mul,
        Div => Op::Div,
        Mod => Op::Mod,
        AddF => Op::AddF,
        SubF => Op::SubF,
        MulF => Op::MulF,
        DivF => Op::DivF,
        EqF => Op::EqF,
        NeF => Op::NeF,
        GeF => Op::GeF,
        LtF => Op::LtF,
        GtF => Op::GtF,
        LeF => Op::LeF,
        other => unreachable!("{:?} is not a binary opcode", other),
    }
}

impl Codegen {
    fn new() -> Self {
        Codegen {
            code: Vec::new(),
            labels: HashMap::new(),
            pending: Vec::new(),
            frames: Vec::new(),
            next_synth: 0,
            locals_size: 0,
            temp_count: 0,
        }
    }

    fn emit(&mut self, op: Op) -> usize {
        self.code.push(op);
        self.code.len() - 1
    }

    fn emit_pending(&mut self, ctor: fn(usize) -> Op, key: LabelKey) {
        let idx = self.emit(ctor(0));
        self.pending.push((idx, key));
    }

    fn define(&mut self, key: LabelKey) {
        self.labels.insert(key, self.code.len());
    }

    fn fresh(&mut self) -> LabelKey {
        self.next_synth += 1;
        LabelKey::Synthetic(self.next_synth)
    }

    /// Allocates a codegen-private stack slot below the parser's locals,
    /// used to stash an address or an intermediate value across a
    /// multi-step operation (`++`/`--`, `switch`) that a single
    /// accumulator and a push-only stack can't otherwise hold onto.
    fn alloc_temp(&mut self) -> i32 {
        self.temp_count += 1;
        -(self.locals_size + self.temp_count)
    }

    fn resolve(mut self) -> CcResult<Vec<Op>> {
        let pending = std::mem::take(&mut self.pending);
        for (idx, key) in pending {
            let addr = *self.labels.get(&key).ok_or_else(|| {
                let msg = match &key {
                    LabelKey::UserLabel(name) => format!("undefined label '{}'", name),
                    _ => "internal codegen error: unresolved jump target".to_string(),
                };
                CcError::semantic(SourceLoc { line: 0, text: String::new() }, msg)
            })?;
            match &mut self.code[idx] {
                Op::Jmp(t) | Op::Jsr(t) | Op::Bz(t) | Op::Bnz(t) => *t = addr,
                other => unreachable!("patched a non-jump opcode {:?}", other),
            }
        }
        Ok(self.code)
    }

    fn gen_function(&mut self, idx: usize, func: &FunctionDef, arena: &Arena, p: &Parser) -> CcResult<()> {
        self.define(LabelKey::Function(idx));
        let ent_idx = self.emit(Op::Ent(0));
        self.locals_size = func.locals_size;
        self.temp_count = 0;
        self.gen_stmt(func.body.expect("only defined functions are codegen'd"), arena, p)?;
        self.emit(Op::Imm(0));
        self.emit(Op::Lev);
        self.code[ent_idx] = Op::Ent(self.locals_size + self.temp_count);
        Ok(())
    }

    fn gen_stmt(&mut self, id: NodeId, arena: &Arena, p: &Parser) -> CcResult<()> {
        match arena.get(id) {
            Node::Begin(stmts) => {
                for s in stmts.clone() {
                    self.gen_stmt(s, arena, p)?;
                }
                Ok(())
            }
            Node::ExprStmt(e) => {
                self.gen_expr(*e, arena, p)?;
                Ok(())
            }
            Node::If { cond, then_branch, else_branch } => {
                let (cond, then_branch, else_branch) = (*cond, *then_branch, *else_branch);
                self.gen_expr(cond, arena, p)?;
                let else_label = self.fresh();
                self.emit_pending(Op::Bz, else_label.clone());
                self.gen_stmt(then_branch, arena, p)?;
                match else_branch {
                    Some(eb) => {
                        let end_label = self.fresh();
                        self.emit_pending(Op::Jmp, end_label.clone());
                        self.define(else_label);
                        self.gen_stmt(eb, arena, p)?;
                        self.define(end_label);
                    }
                    None => self.define(else_label),
                }
                Ok(())
            }
            Node::While { cond, body } => {
                let (cond, body) = (*cond, *body);
                let top_addr = self.code.len();
                self.gen_expr(cond, arena, p)?;
                let end_label = self.fresh();
                self.emit_pending(Op::Bz, end_label.clone());
                self.frames.push(Frame { continue_target: Some(ContinueTarget::Addr(top_addr)), break_label: end_label.clone() });
                self.gen_stmt(body, arena, p)?;
                self.frames.pop();
                self.emit(Op::Jmp(top_addr));
                self.define(end_label);
                Ok(())
            }
            Node::DoWhile { cond, body } => {
                let (cond, body) = (*cond, *body);
                let top_addr = self.code.len();
                let continue_label = self.fresh();
                let break_label = self.fresh();
                self.frames.push(Frame {
                    continue_target: Some(ContinueTarget::Label(continue_label.clone())),
                    break_label: break_label.clone(),
                });
                self.gen_stmt(body, arena, p)?;
                self.frames.pop();
                self.define(continue_label);
                self.gen_expr(cond, arena, p)?;
                self.emit(Op::Bnz(top_addr));
                self.define(break_label);
                Ok(())
            }
            Node::For { init, cond, step, body } => {
                let (init, cond, step, body) = (*init, *cond, *step, *body);
                if let Some(i) = init {
                    self.gen_expr(i, arena, p)?;
                }
                let top_addr = self.code.len();
                let end_label = self.fresh();
                if let Some(c) = cond {
                    self.gen_expr(c, arena, p)?;
                    self.emit_pending(Op::Bz, end_label.clone());
                }
                let continue_label = self.fresh();
                self.frames.push(Frame {
                    continue_target: Some(ContinueTarget::Label(continue_label.clone())),
                    break_label: end_label.clone(),
                });
                self.gen_stmt(body, arena, p)?;
                self.frames.pop();
                self.define(continue_label);
                if let Some(s) = step {
                    self.gen_expr(s, arena, p)?;
                }
                self.emit(Op::Jmp(top_addr));
                self.define(end_label);
                Ok(())
            }
            Node::Switch { cond, body } => self.gen_switch(*cond, *body, arena, p),
            Node::Case { body, .. } => self.gen_stmt(*body, arena, p),
            Node::Default { body } => self.gen_stmt(*body, arena, p),
            Node::Break => {
                let label = self
                    .frames
                    .last()
                    .map(|f| f.break_label.clone())
                    .ok_or_else(|| CcError::semantic(p.loc(), "'break' outside loop or switch"))?;
                self.emit_pending(Op::Jmp, label);
                Ok(())
            }
            Node::Continue => {
                let target = self
                    .frames
                    .iter()
                    .rev()
                    .find_map(|f| f.continue_target.as_ref())
                    .ok_or_else(|| CcError::semantic(p.loc(), "'continue' outside loop"))?;
                match target {
                    ContinueTarget::Addr(a) => {
                        let a = *a;
                        self.emit(Op::Jmp(a));
                    }
                    ContinueTarget::Label(k) => {
                        let k = k.clone();
                        self.emit_pending(Op::Jmp, k);
                    }
                }
                Ok(())
            }
            Node::Goto { label } => {
                let key = LabelKey::UserLabel(label.clone());
                self.emit_pending(Op::Jmp, key);
                Ok(())
            }
            Node::Label { name, body } => {
                self.define(LabelKey::UserLabel(name.clone()));
                self.gen_stmt(*body, arena, p)
            }
            Node::Return(value) => {
                match value {
                    Some(v) => self.gen_expr(*v, arena, p)?,
                    None => {
                        self.emit(Op::Imm(0));
                    }
                };
                self.emit(Op::Lev);
                Ok(())
            }
            Node::Enter { frame_size, body } => {
                let (frame_size, body) = (*frame_size, *body);
                self.emit(Op::Ent(frame_size));
                self.gen_stmt(body, arena, p)?;
                self.emit(Op::Lev);
                Ok(())
            }
            other => Err(CcError::semantic(p.loc(), format!("{:?} is not a statement", other))),
        }
    }

    /// Cascading `==` comparisons against a cached switch value, each case
    /// jumping into the body at its own label; body statements still run
    /// in their natural sequence so fall-through works.
    fn gen_switch(&mut self, cond: NodeId, body: NodeId, arena: &Arena, p: &Parser) -> CcResult<()> {
        let acc_temp = self.alloc_temp();
        self.emit(Op::Lea(acc_temp));
        self.emit(Op::Psh);
        self.gen_expr(cond, arena, p)?;
        self.emit(Op::Si);

        let stmts: Vec<NodeId> = match arena.get(body) {
            Node::Begin(v) => v.clone(),
            _ => vec![body],
        };

        let end_label = self.fresh();
        let mut default_key = None;
        for &s in &stmts {
            match arena.get(s) {
                Node::Case { value, .. } => {
                    let value = *value;
                    self.emit(Op::Lea(acc_temp));
                    self.emit(Op::Li);
                    self.emit(Op::Psh);
                    self.emit(Op::Imm(value));
                    self.emit(Op::Eq);
                    self.emit_pending(Op::Bnz, LabelKey::Case(s));
                }
                Node::Default { .. } => default_key = Some(LabelKey::Default(s)),
                _ => {}
            }
        }
        match default_key.clone() {
            Some(k) => self.emit_pending(Op::Jmp, k),
            None => self.emit_pending(Op::Jmp, end_label.clone()),
        }

        self.frames.push(Frame { continue_target: None, break_label: end_label.clone() });
        for &s in &stmts {
            match arena.get(s) {
                Node::Case { body: case_body, .. } => {
                    self.define(LabelKey::Case(s));
                    self.gen_stmt(*case_body, arena, p)?;
                }
                Node::Default { body: def_body } => {
                    self.define(LabelKey::Default(s));
                    self.gen_stmt(*def_body, arena, p)?;
                }
                _ => self.gen_stmt(s, arena, p)?,
            }
        }
        self.frames.pop();
        self.define(end_label);
        Ok(())
    }

    fn gen_expr(&mut self, id: NodeId, arena: &Arena, p: &Parser) -> CcResult<()> {
        match arena.get(id).clone() {
            Node::Num(n) => {
                self.emit(Op::Imm(n));
            }
            Node::NumF(f) => {
                self.emit(Op::ImmF(f));
            }
            Node::Loc { offset } => {
                self.emit(Op::Lea(offset));
            }
            Node::Glo { addr } => {
                self.emit(Op::Imm(addr));
            }
            Node::Load { ty, addr } => {
                self.gen_expr(addr, arena, p)?;
                self.emit(load_op(ty));
            }
            Node::CastF { to_float, expr } => {
                self.gen_expr(expr, arena, p)?;
                self.emit(if to_float { Op::Itof } else { Op::Ftoi });
            }
            Node::Unary { op, expr } => self.gen_unary(op, expr, arena, p)?,
            Node::Binary { op, lhs, rhs } => {
                self.gen_expr(lhs, arena, p)?;
                self.emit(push_op(p.node_ty(lhs)));
                self.gen_expr(rhs, arena, p)?;
                self.emit(binop(op));
            }
            Node::Assign { lhs, rhs } => {
                let (ty, addr) = match arena.get(lhs) {
                    Node::Load { ty, addr } => (*ty, *addr),
                    _ => return Err(CcError::semantic(p.loc(), "assignment target is not an lvalue")),
                };
                self.gen_expr(addr, arena, p)?;
                self.emit(Op::Psh);
                self.gen_expr(rhs, arena, p)?;
                self.emit(store_op(ty));
            }
            Node::Cond { cond, then_branch, else_branch } => {
                self.gen_expr(cond, arena, p)?;
                let else_label = self.fresh();
                self.emit_pending(Op::Bz, else_label.clone());
                self.gen_expr(then_branch, arena, p)?;
                let end_label = self.fresh();
                self.emit_pending(Op::Jmp, end_label.clone());
                self.define(else_label);
                if let Some(eb) = else_branch {
                    self.gen_expr(eb, arena, p)?;
                }
                self.define(end_label);
            }
            Node::Logical { op: Kind::Lor, lhs, rhs } => {
                self.gen_expr(lhs, arena, p)?;
                let short_true = self.fresh();
                self.emit_pending(Op::Bnz, short_true.clone());
                self.gen_expr(rhs, arena, p)?;
                self.emit(Op::Psh);
                self.emit(Op::Imm(0));
                self.emit(Op::Ne);
                let end = self.fresh();
                self.emit_pending(Op::Jmp, end.clone());
                self.define(short_true);
                self.emit(Op::Imm(1));
                self.define(end);
            }
            Node::Logical { op: Kind::Lan, lhs, rhs } => {
                self.gen_expr(lhs, arena, p)?;
                let short_false = self.fresh();
                self.emit_pending(Op::Bz, short_false.clone());
                self.gen_expr(rhs, arena, p)?;
                self.emit(Op::Psh);
                self.emit(Op::Imm(0));
                self.emit(Op::Ne);
                let end = self.fresh();
                self.emit_pending(Op::Jmp, end.clone());
                self.define(short_false);
                self.emit(Op::Imm(0));
                self.define(end);
            }
            Node::Logical { op, .. } => {
                return Err(CcError::semantic(p.loc(), format!("{:?} is not a logical operator", op)));
            }
            Node::IncDec { op, addr, ty, step, postfix } => self.gen_incdec(op, addr, ty, step, postfix, arena, p)?,
            Node::Call { callee, args } => self.gen_call(callee, &args, arena, p)?,
            other => return Err(CcError::semantic(p.loc(), format!("{:?} is not an expression", other))),
        }
        Ok(())
    }

    fn gen_unary(&mut self, op: Kind, expr: NodeId, arena: &Arena, p: &Parser) -> CcResult<()> {
        match op {
            Kind::Sub => {
                let is_float = p.node_ty(expr).is_float();
                self.emit(if is_float { Op::ImmF(0.0) } else { Op::Imm(0) });
                self.emit(Op::Psh);
                self.gen_expr(expr, arena, p)?;
                self.emit(if is_float { Op::SubF } else { Op::Sub });
            }
            Kind::Not => {
                self.gen_expr(expr, arena, p)?;
                self.emit(Op::Psh);
                self.emit(Op::Imm(0));
                self.emit(Op::Eq);
            }
            Kind::Tilde => {
                self.gen_expr(expr, arena, p)?;
                self.emit(Op::Psh);
                self.emit(Op::Imm(-1));
                self.emit(Op::Xor);
            }
            other => return Err(CcError::semantic(p.loc(), format!("{:?} is not a unary operator", other))),
        }
        Ok(())
    }

    /// `++`/`--`, pre- or postfix. A direct stack dup isn't available, so
    /// the target address and (for postfix) the prior value are cached in
    /// codegen-private temps rather than juggled on the operand stack.
    fn gen_incdec(&mut self, op: Kind, addr: NodeId, ty: Ty, step: i32, postfix: bool, arena: &Arena, p: &Parser) -> CcResult<()> {
        let addr_temp = self.alloc_temp();
        let old_temp = self.alloc_temp();
        let bin = if op == Kind::Inc { Op::Add } else { Op::Sub };

        self.emit(Op::Lea(addr_temp));
        self.emit(Op::Psh);
        self.gen_expr(addr, arena, p)?;
        self.emit(Op::Si); // addr_temp := A; acc == A

        self.emit(Op::Lea(old_temp));
        self.emit(Op::Psh);
        self.emit(Op::Lea(addr_temp));
        self.emit(Op::Li);
        self.emit(load_op(ty));
        self.emit(store_op(ty)); // old_temp := *A

        self.emit(Op::Lea(addr_temp));
        self.emit(Op::Li);
        self.emit(Op::Psh); // stack = [A]
        self.emit(Op::Lea(old_temp));
        self.emit(load_op(ty));
        self.emit(Op::Psh); // stack = [A, old]
        self.emit(Op::Imm(step));
        self.emit(bin); // stack = [A], acc = new
        self.emit(store_op(ty)); // *A := new; acc stays new

        if postfix {
            self.emit(Op::Lea(old_temp));
            self.emit(load_op(ty));
        }
        Ok(())
    }

    fn gen_call(&mut self, callee: CallTarget, args: &[NodeId], arena: &Arena, p: &Parser) -> CcResult<()> {
        match callee {
            CallTarget::Function { sym: func_idx } => {
                for &a in args.iter().rev() {
                    self.gen_expr(a, arena, p)?;
                    self.emit(push_op(p.node_ty(a)));
                }
                self.emit_pending(Op::Jsr, LabelKey::Function(func_idx));
                if !args.is_empty() {
                    self.emit(Op::Adj(args.len() as i32));
                }
            }
            CallTarget::Syscall { host_idx } => {
                let mut float_mask = 0u32;
                for (i, &a) in args.iter().enumerate() {
                    if p.node_ty(a).is_float() {
                        float_mask |= 1 << i;
                    }
                    self.gen_expr(a, arena, p)?;
                    self.emit(push_op(p.node_ty(a)));
                }
                self.emit(Op::SyscArgs((args.len() as u32) | (float_mask << 10)));
                self.emit(Op::Sysc(host_idx));
                if !args.is_empty() {
                    self.emit(Op::Adj(args.len() as i32));
                }
            }
        }
        Ok(())
    }
}

/// Lowers every defined function into one flat instruction stream and
/// appends a `Jsr main; Exit` trampoline as the program's real entry point.
///
/// `entry_args`, when given, is `(argc, argv_ptr)` as already-resolved data
/// segment values; they're pushed ahead of the `Jsr` (in the same
/// reversed-push convention every other call uses) only if `main` actually
/// declares that many parameters, so a parameterless `main` is untouched.
pub fn generate(p: &Parser, entry_args: Option<(i32, i32)>) -> CcResult<Program> {
    let mut cg = Codegen::new();
    for (idx, func) in p.functions.iter().enumerate() {
        if func.body.is_some() {
            cg.gen_function(idx, func, &p.arena, p)?;
        }
    }

    let main_idx = p
        .functions
        .iter()
        .position(|f| f.name == "main" && f.body.is_some())
        .ok_or_else(|| CcError::semantic(SourceLoc { line: 0, text: String::new() }, "no 'main' function defined"))?;

    let entry = cg.code.len();
    let nparams = p.functions[main_idx].params.len();
    let pushed = match (entry_args, nparams) {
        (Some((argc, argv)), n) if n >= 2 => {
            cg.emit(Op::Imm(argv));
            cg.emit(Op::Psh);
            cg.emit(Op::Imm(argc));
            cg.emit(Op::Psh);
            2
        }
        (Some((argc, _)), 1) => {
            cg.emit(Op::Imm(argc));
            cg.emit(Op::Psh);
            1
        }
        _ => 0,
    };
    cg.emit_pending(Op::Jsr, LabelKey::Function(main_idx));
    if pushed > 0 {
        cg.emit(Op::Adj(pushed));
    }
    cg.emit(Op::Exit);

    let code = cg.resolve()?;
    Ok(Program { code, entry })
}

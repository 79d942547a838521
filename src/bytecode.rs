//! Bytecode instruction set (SPEC_FULL §4.5, opcodes grounded on
//! `examples/original_source/src/cc_ops.h`). Resolved per §9.1's open
//! question to a plain tagged-union `Op`, not a packed 16-bit word stream:
//! codegen, the VM, and the disassembler all work over one `Vec<Op>`
//! instead of re-deriving operand widths from an opcode byte.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    /// Load an immediate int into the accumulator.
    Imm(i32),
    /// Load an immediate float (bit pattern) into the accumulator.
    ImmF(f32),
    /// `bp + off` into the accumulator (address-of a local/parameter).
    Lea(i32),
    Jmp(usize),
    Jsr(usize),
    Bz(usize),
    Bnz(usize),
    /// Reserve `n` stack words for locals.
    Ent(i32),
    /// Pop `n` stack words (argument cleanup after a call).
    Adj(i32),
    Lev,
    Psh,
    PshF,
    Lc,
    Li,
    Lf,
    Sc,
    Si,
    Sf,
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Ge,
    Lt,
    Gt,
    Le,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    AddF,
    SubF,
    MulF,
    DivF,
    Ftoi,
    Itof,
    EqF,
    NeF,
    GeF,
    LtF,
    GtF,
    LeF,
    /// Carries `argcount | (float_mask << 10)` immediately before `Sysc`.
    SyscArgs(u32),
    Sysc(usize),
    Exit,
}

impl Op {
    /// Mnemonic text used by the disassembler (`-s`) and instruction tracer
    /// (`-t`/`-ti`).
    pub fn mnemonic(&self) -> &'static str {
        use Op::*;
        match self {
            Imm(_) => "IMM",
            ImmF(_) => "IMMF",
            Lea(_) => "LEA",
            Jmp(_) => "JMP",
            Jsr(_) => "JSR",
            Bz(_) => "BZ",
            Bnz(_) => "BNZ",
            Ent(_) => "ENT",
            Adj(_) => "ADJ",
            Lev => "LEV",
            Psh => "PSH",
            PshF => "PSHF",
            Lc => "LC",
            Li => "LI",
            Lf => "LF",
            Sc => "SC",
            Si => "SI",
            Sf => "SF",
            Or => "OR",
            Xor => "XOR",
            And => "AND",
            Eq => "EQ",
            Ne => "NE",
            Ge => "GE",
            Lt => "LT",
            Gt => "GT",
            Le => "LE",
            Shl => "SHL",
            Shr => "SHR",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Div => "DIV",
            Mod => "MOD",
            AddF => "ADDF",
            SubF => "SUBF",
            MulF => "MULF",
            DivF => "DIVF",
            Ftoi => "FTOI",
            Itof => "ITOF",
            EqF => "EQF",
            NeF => "NEF",
            GeF => "GEF",
            LtF => "LTF",
            GtF => "GTF",
            LeF => "LEF",
            SyscArgs(_) => "IMM",
            Sysc(_) => "SYSC",
            Exit => "EXIT",
        }
    }

    /// One-line disassembly for a single instruction at `addr`, matching the
    /// `ADDR:MNEMONIC OPERAND` shape the teacher's `ASMStream` device prints.
    pub fn disasm(&self, addr: usize) -> String {
        use Op::*;
        let operand = match self {
            Imm(n) => format!(" {}", n),
            ImmF(x) => format!(" {}", x),
            Lea(n) | Ent(n) | Adj(n) => format!(" {}", n),
            Jmp(t) | Jsr(t) | Bz(t) | Bnz(t) => format!(" <{:04}>", t),
            SyscArgs(bits) => format!(" {}", bits),
            Sysc(idx) => format!(" #{}", idx),
            _ => String::new(),
        };
        format!("{:04}: {}{}", addr, self.mnemonic(), operand)
    }
}

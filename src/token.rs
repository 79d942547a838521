//! Token and AST-node kinds, in the exact precedence order the original
//! grammar relies on: `Assign` is the lowest-precedence operator a Pratt
//! climb will fold, `Bracket` the highest. Node kinds that are never
//! operators (statements, declarations) are listed first.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Kind {
    // structural / statement kinds
    Func,
    Syscall,
    Main,
    Glo,
    Par,
    Loc,
    Keyword,
    Id,
    Load,
    Enter,
    Num,
    NumF,
    Begin,

    // declaration keywords
    Enum,
    Char,
    Int,
    Float,
    Struct,
    Union,
    Sizeof,

    // statement keywords
    Return,
    Goto,
    Break,
    Continue,
    If,
    DoWhile,
    While,
    For,
    Switch,
    Case,
    Default,
    Else,
    Label,

    // operators, lowest precedence first
    Assign,
    OrAssign,
    XorAssign,
    AndAssign,
    ShlAssign,
    ShrAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    Cond,
    Lor,
    Lan,
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
    EqF,
    NeF,
    GeF,
    LtF,
    GtF,
    LeF,
    CastF,
    Inc,
    Dec,
    Dot,
    Arrow,
    Bracket,

    // lexer-only punctuation that never survives into the AST
    LParen,
    RParen,
    LBrace,
    RBrace,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Question,
    Not,
    Tilde,
    Eof,
}

impl Kind {
    /// Binary operator precedence, climbing from `Assign` (lowest) to
    /// `Bracket` (highest). Non-operator kinds return `None`.
    pub fn precedence(self) -> Option<u8> {
        use Kind::*;
        let p = match self {
            Assign | OrAssign | XorAssign | AndAssign | ShlAssign | ShrAssign | AddAssign
            | SubAssign | MulAssign | DivAssign | ModAssign => 1,
            Cond => 2,
            Lor => 3,
            Lan => 4,
            Or => 5,
            Xor => 6,
            And => 7,
            Eq | Ne => 8,
            Ge | Lt | Gt | Le => 9,
            Shl | Shr => 10,
            Add | Sub => 11,
            Mul | Div | Mod => 12,
            Inc | Dec | Dot | Arrow | Bracket => 13,
            _ => return None,
        };
        Some(p)
    }

    pub fn is_assign(self) -> bool {
        matches!(
            self,
            Kind::Assign
                | Kind::OrAssign
                | Kind::XorAssign
                | Kind::AndAssign
                | Kind::ShlAssign
                | Kind::ShrAssign
                | Kind::AddAssign
                | Kind::SubAssign
                | Kind::MulAssign
                | Kind::DivAssign
                | Kind::ModAssign
        )
    }

    /// The plain binary op a compound assignment expands to (`+=` -> `Add`).
    pub fn assign_base_op(self) -> Option<Kind> {
        use Kind::*;
        Some(match self {
            OrAssign => Or,
            XorAssign => Xor,
            AndAssign => And,
            ShlAssign => Shl,
            ShrAssign => Shr,
            AddAssign => Add,
            SubAssign => Sub,
            MulAssign => Mul,
            DivAssign => Div,
            ModAssign => Mod,
            _ => return None,
        })
    }

    /// The float-flavoured counterpart of an int arithmetic/compare op.
    pub fn float_variant(self) -> Kind {
        use Kind::*;
        match self {
            Add => AddF,
            Sub => SubF,
            Mul => MulF,
            Div => DivF,
            Eq => EqF,
            Ne => NeF,
            Ge => GeF,
            Lt => LtF,
            Gt => GtF,
            Le => LeF,
            other => other,
        }
    }
}

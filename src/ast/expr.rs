// Xn AST Expressions

use crate::error::Span;
use std::fmt;

/// One arm of a `match` expression
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    pub pattern: Expr,
    pub body: Vec<super::Stmt>,
}

/// Expressions in xn
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer {
        value: i64,
        span: Span,
    },
    Float {
        value: f64,
        span: Span,
    },
    Str {
        value: String,
        span: Span,
    },
    /// `"a${expr}b"` — literal and expression parts, concatenated in order
    Interpolated {
        parts: Vec<Expr>,
        span: Span,
    },
    Boolean {
        value: bool,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
    HashLit {
        pairs: Vec<(Expr, Expr)>,
        span: Span,
    },
    Prefix {
        operator: String,
        right: Box<Expr>,
        span: Span,
    },
    Infix {
        operator: String,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Postfix {
        operator: String,
        left: Box<Expr>,
        span: Span,
    },
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        member: String,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Function {
        params: Vec<String>,
        body: Vec<super::Stmt>,
        span: Span,
    },
    Match {
        value: Box<Expr>,
        cases: Vec<MatchCase>,
        span: Span,
    },
    Try {
        block: Vec<super::Stmt>,
        catch_param: Option<String>,
        catch_block: Vec<super::Stmt>,
        span: Span,
    },
    Pipe {
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Integer { span, .. }
            | Expr::Float { span, .. }
            | Expr::Str { span, .. }
            | Expr::Interpolated { span, .. }
            | Expr::Boolean { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Array { span, .. }
            | Expr::HashLit { span, .. }
            | Expr::Prefix { span, .. }
            | Expr::Infix { span, .. }
            | Expr::Postfix { span, .. }
            | Expr::Index { span, .. }
            | Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::Function { span, .. }
            | Expr::Match { span, .. }
            | Expr::Try { span, .. }
            | Expr::Pipe { span, .. } => *span,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer { value, .. } => write!(f, "{}", value),
            Expr::Float { value, .. } => write!(f, "{}", value),
            Expr::Str { value, .. } => write!(f, "\"{}\"", value),
            Expr::Interpolated { parts, .. } => {
                write!(f, "interp(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Expr::Boolean { value, .. } => write!(f, "{}", value),
            Expr::Identifier { name, .. } => write!(f, "{}", name),
            Expr::Array { elements, .. } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Expr::HashLit { pairs, .. } => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Expr::Prefix {
                operator, right, ..
            } => write!(f, "({}{})", operator, right),
            Expr::Infix {
                operator,
                left,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator, right),
            Expr::Postfix { operator, left, .. } => write!(f, "({}{})", left, operator),
            Expr::Index { left, index, .. } => write!(f, "({}[{}])", left, index),
            Expr::Member { object, member, .. } => write!(f, "({}.{})", object, member),
            Expr::Call { callee, args, .. } => {
                write!(f, "{}(", callee)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            Expr::Function { params, .. } => write!(f, "fn({})", params.join(", ")),
            Expr::Match { value, cases, .. } => {
                write!(f, "match {} {{ {} cases }}", value, cases.len())
            }
            Expr::Try { .. } => write!(f, "try {{...}} catch {{...}}"),
            Expr::Pipe { left, right, .. } => write!(f, "({} |> {})", left, right),
        }
    }
}

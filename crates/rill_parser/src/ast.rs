use std::fmt::{self, Display};
use std::rc::Rc;

use crate::location::SrcLoc;
use crate::token::TokenKind;

/// A parsed source unit: the sequence of top-level statements.
#[derive(Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new() -> Program {
        Program {
            statements: Vec::new(),
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Program::new()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self
            .statements
            .iter()
            .map(|stmt| stmt.to_string())
            .collect::<Vec<String>>()
            .join(" ");

        write!(f, "{}", s)
    }
}

#[derive(Debug, PartialEq)]
pub enum Statement {
    Block(Block),
    Let {
        loc: SrcLoc,
        /// The name being bound
        name: String,
        /// The initializer expression
        value: Expression,
    },
    Function {
        loc: SrcLoc,
        name: String,
        value: FunctionLiteral,
    },
    Return {
        loc: SrcLoc,
        value: Option<Expression>,
    },
    If(Box<IfStatement>),
    Loop(Box<LoopStatement>),
    Jump {
        loc: SrcLoc,
        is_break: bool,
    },
    Expression {
        expression: Expression,
    },
}

impl Statement {
    pub fn loc(&self) -> &SrcLoc {
        use Statement::*;

        match self {
            Block(block) => &block.loc,
            Let { loc, .. } => loc,
            Function { loc, .. } => loc,
            Return { loc, .. } => loc,
            If(if_stmt) => &if_stmt.loc,
            Loop(loop_stmt) => &loop_stmt.loc,
            Jump { loc, .. } => loc,
            Expression { expression } => expression.loc(),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Statement::*;

        match self {
            Block(block) => write!(f, "{}", block),
            Let { name, value, .. } => write!(f, "let {} = {};", name, value),
            Function { name, value, .. } => {
                write!(f, "fn {}({}) {}", name, join(&value.parameters), value.body)
            }
            Return { value: Some(v), .. } => write!(f, "return {};", v),
            Return { value: None, .. } => write!(f, "return;"),
            If(if_stmt) => write!(f, "{}", if_stmt),
            Loop(loop_stmt) => write!(f, "{}", loop_stmt),
            Jump { is_break: true, .. } => write!(f, "break;"),
            Jump { is_break: false, .. } => write!(f, "continue;"),
            Expression { expression } => write!(f, "{};", expression),
        }
    }
}

/// A braced statement sequence. Blocks open a new scope when evaluated.
#[derive(Debug, PartialEq)]
pub struct Block {
    pub loc: SrcLoc,
    pub statements: Vec<Statement>,
}

impl Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for stmt in &self.statements {
            write!(f, "{} ", stmt)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, PartialEq)]
pub struct IfStatement {
    pub loc: SrcLoc,
    pub condition: Expression,
    pub then: Block,
    /// Either another `If` (for `else if`) or a `Block`, never anything else
    pub alt: Option<Statement>,
}

impl Display for IfStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {} {}", self.condition, self.then)?;

        if let Some(alt) = &self.alt {
            write!(f, " else {}", alt)?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub struct LoopStatement {
    pub loc: SrcLoc,
    /// An absent condition loops forever
    pub condition: Option<Expression>,
    pub body: Block,
}

impl Display for LoopStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(cond) => write!(f, "loop {} {}", cond, self.body),
            None => write!(f, "loop {}", self.body),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    Integer { loc: SrcLoc, value: i64 },
    Float { loc: SrcLoc, value: f64 },
    Str { loc: SrcLoc, value: String },
    Boolean { loc: SrcLoc, value: bool },
    Null { loc: SrcLoc },

    Prefix(Box<PrefixExpression>),
    Infix(Box<InfixExpression>),
    Assign(Box<AssignExpression>),
    Call(Box<CallExpression>),
    Index(Box<IndexExpression>),
    Function(Box<FunctionLiteral>),
    Array(Box<ArrayLiteral>),
    Map(Box<MapLiteral>),
}

impl Expression {
    pub fn loc(&self) -> &SrcLoc {
        use Expression::*;

        match self {
            Identifier(ident) => &ident.loc,
            Integer { loc, .. } => loc,
            Float { loc, .. } => loc,
            Str { loc, .. } => loc,
            Boolean { loc, .. } => loc,
            Null { loc } => loc,
            Prefix(prefix) => &prefix.loc,
            Infix(infix) => &infix.loc,
            Assign(assign) => &assign.loc,
            Call(call) => &call.loc,
            Index(index) => &index.loc,
            Function(func) => &func.loc,
            Array(arr) => &arr.loc,
            Map(map) => &map.loc,
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Expression::*;

        match self {
            Identifier(ident) => write!(f, "{}", ident),
            Integer { value, .. } => write!(f, "{}", value),
            Float { value, .. } => {
                // keep a decimal point so the printed form stays a float
                if value.fract() == 0.0 {
                    write!(f, "{:.1}", value)
                } else {
                    write!(f, "{}", value)
                }
            }
            Str { value, .. } => write!(f, "\"{}\"", escape(value)),
            Boolean { value, .. } => write!(f, "{}", value),
            Null { .. } => write!(f, "null"),

            Prefix(prefix) => write!(f, "{}", prefix),
            Infix(infix) => write!(f, "{}", infix),
            Assign(assign) => write!(f, "{}", assign),
            Call(call) => write!(f, "{}", call),
            Index(index) => write!(f, "{}", index),
            Function(func) => write!(f, "{}", func),
            Array(arr) => write!(f, "{}", arr),
            Map(map) => write!(f, "{}", map),
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, PartialEq, Clone)]
pub struct Identifier {
    pub loc: SrcLoc,
    pub name: String,
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, PartialEq)]
pub struct PrefixExpression {
    pub loc: SrcLoc,
    pub operator: TokenKind,
    pub right: Expression,
}

impl Display for PrefixExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}{})", self.operator, self.right)
    }
}

#[derive(Debug, PartialEq)]
pub struct InfixExpression {
    pub loc: SrcLoc,
    pub operator: TokenKind,
    pub left: Expression,
    pub right: Expression,
}

impl Display for InfixExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.operator, self.right)
    }
}

/// `left = right` where `left` is an identifier or an index expression;
/// the parser rejects anything else as an assignment target.
#[derive(Debug, PartialEq)]
pub struct AssignExpression {
    pub loc: SrcLoc,
    pub left: Expression,
    pub right: Expression,
}

impl Display for AssignExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} = {})", self.left, self.right)
    }
}

#[derive(Debug, PartialEq)]
pub struct CallExpression {
    pub loc: SrcLoc,
    pub callee: Expression,
    pub arguments: Vec<Expression>,
}

impl Display for CallExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.callee, join(&self.arguments))
    }
}

#[derive(Debug, PartialEq)]
pub struct IndexExpression {
    pub loc: SrcLoc,
    pub left: Expression,
    pub index: Expression,
}

impl Display for IndexExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}[{}])", self.left, self.index)
    }
}

/// `fn (params) { body }`. The body is shared behind an `Rc` so closures
/// can hold onto it without cloning the tree.
#[derive(Debug, PartialEq)]
pub struct FunctionLiteral {
    pub loc: SrcLoc,
    pub parameters: Vec<Identifier>,
    pub body: Rc<Block>,
}

impl Display for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn({}) {}", join(&self.parameters), self.body)
    }
}

#[derive(Debug, PartialEq)]
pub struct ArrayLiteral {
    pub loc: SrcLoc,
    pub elements: Vec<Expression>,
}

impl Display for ArrayLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", join(&self.elements))
    }
}

#[derive(Debug, PartialEq)]
pub struct MapEntry {
    pub key: Expression,
    pub value: Expression,
}

impl Display for MapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// `{k: v, ...}` with entries kept in source order.
#[derive(Debug, PartialEq)]
pub struct MapLiteral {
    pub loc: SrcLoc,
    pub entries: Vec<MapEntry>,
}

impl Display for MapLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", join(&self.entries))
    }
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::ast::{Expression, Identifier, Program, Statement};
    use crate::location::SrcLoc;

    fn loc() -> SrcLoc {
        SrcLoc::new(Rc::from("ast_test"), 1, 1)
    }

    #[test]
    fn display_program() {
        let program = Program {
            statements: vec![
                Statement::Let {
                    loc: loc(),
                    name: "myVar".to_string(),
                    value: Expression::Identifier(Identifier {
                        loc: loc(),
                        name: "anotherVar".to_string(),
                    }),
                },
                Statement::Return {
                    loc: loc(),
                    value: Some(Expression::Integer {
                        loc: loc(),
                        value: 5,
                    }),
                },
            ],
        };

        assert_eq!(program.to_string(), "let myVar = anotherVar; return 5;");
    }

    #[test]
    fn display_float_keeps_decimal_point() {
        let expr = Expression::Float {
            loc: loc(),
            value: 5.0,
        };
        assert_eq!(expr.to_string(), "5.0");

        let expr = Expression::Float {
            loc: loc(),
            value: 0.25,
        };
        assert_eq!(expr.to_string(), "0.25");
    }

    #[test]
    fn display_string_escapes() {
        let expr = Expression::Str {
            loc: loc(),
            value: "a\"b\nc".to_string(),
        };
        assert_eq!(expr.to_string(), "\"a\\\"b\\nc\"");
    }
}

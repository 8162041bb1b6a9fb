use std::fmt::Display;
use std::rc::Rc;

use crate::ast::{
    ArrayLiteral, AssignExpression, Block, CallExpression, Expression, FunctionLiteral, Identifier,
    IfStatement, IndexExpression, InfixExpression, LoopStatement, MapEntry, MapLiteral,
    PrefixExpression, Program, Statement,
};
use crate::lexer::Lexer;
use crate::location::SrcLoc;
use crate::token::{Token, TokenKind};

#[derive(Debug, PartialEq)]
pub struct ParseError {
    pub loc: SrcLoc,
    pub kind: ParseErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ParseErrorKind {
    /// The next token was not the one the grammar requires
    Expected { expected: String, got: String },
    /// A token that cannot start an expression showed up in expression
    /// position
    NoPrefixParser(String),
    /// The left side of `=` is not an identifier or index expression
    InvalidAssignTarget,
    /// A numeric literal that does not fit its type
    InvalidNumber { word: String, as_type: &'static str },
    /// An error token produced by the lexer
    Lex(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ParseErrorKind::*;

        write!(f, "{} ", self.loc)?;
        match &self.kind {
            Expected { expected, got } => {
                write!(
                    f,
                    "expected next token to be \"{}\", got \"{}\" instead",
                    expected, got
                )
            }
            NoPrefixParser(token) => {
                write!(f, "no prefix parse function for \"{}\" found", token)
            }
            InvalidAssignTarget => write!(f, "invalid assignment target"),
            InvalidNumber { word, as_type } => {
                write!(f, "could not parse \"{}\" as {}", word, as_type)
            }
            Lex(message) => write!(f, "{}", message),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

type PrefixFn = fn(&mut Parser) -> ParseResult<Expression>;
type InfixFn = fn(&mut Parser, Expression) -> ParseResult<Expression>;

/// Binding power, lowest to highest. Each infix token owns one level; the
/// Pratt loop keeps consuming while the next token binds tighter than the
/// minimum it was called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assign,
    Equals,
    Compare,
    Sum,
    Product,
    Prefix,
    Postfix,
    Dot,
}

/// One row of the dispatch table: how a token parses in prefix position,
/// how it parses in infix position, and how tightly it binds.
struct Rule {
    prefix: Option<PrefixFn>,
    infix: Option<InfixFn>,
    precedence: Precedence,
}

impl Default for Rule {
    fn default() -> Rule {
        Rule {
            prefix: None,
            infix: None,
            precedence: Precedence::None,
        }
    }
}

fn rule(kind: TokenKind) -> Rule {
    use TokenKind::*;

    match kind {
        LParen => Rule {
            prefix: Some(Parser::parse_grouped_expression),
            infix: Some(Parser::parse_call_expression),
            precedence: Precedence::Postfix,
        },
        LBracket => Rule {
            prefix: Some(Parser::parse_array_literal),
            infix: Some(Parser::parse_index_expression),
            precedence: Precedence::Postfix,
        },
        LBrace => Rule {
            prefix: Some(Parser::parse_map_literal),
            ..Rule::default()
        },

        Ident => Rule {
            prefix: Some(Parser::parse_identifier_expression),
            ..Rule::default()
        },
        Int => Rule {
            prefix: Some(Parser::parse_integer_literal),
            ..Rule::default()
        },
        Float => Rule {
            prefix: Some(Parser::parse_float_literal),
            ..Rule::default()
        },
        Str => Rule {
            prefix: Some(Parser::parse_string_literal),
            ..Rule::default()
        },
        True | False => Rule {
            prefix: Some(Parser::parse_bool_literal),
            ..Rule::default()
        },
        Null => Rule {
            prefix: Some(Parser::parse_null_literal),
            ..Rule::default()
        },
        Fn => Rule {
            prefix: Some(Parser::parse_function_literal),
            ..Rule::default()
        },

        Bang => Rule {
            prefix: Some(Parser::parse_prefix_expression),
            ..Rule::default()
        },
        Minus => Rule {
            prefix: Some(Parser::parse_prefix_expression),
            infix: Some(Parser::parse_infix_expression),
            precedence: Precedence::Sum,
        },
        Plus => Rule {
            infix: Some(Parser::parse_infix_expression),
            precedence: Precedence::Sum,
            ..Rule::default()
        },
        Star | Slash => Rule {
            infix: Some(Parser::parse_infix_expression),
            precedence: Precedence::Product,
            ..Rule::default()
        },
        Eq | NotEq => Rule {
            infix: Some(Parser::parse_infix_expression),
            precedence: Precedence::Equals,
            ..Rule::default()
        },
        LessThan | GreaterThan | LessEq | GreaterEq => Rule {
            infix: Some(Parser::parse_infix_expression),
            precedence: Precedence::Compare,
            ..Rule::default()
        },
        Assign => Rule {
            infix: Some(Parser::parse_assign_expression),
            precedence: Precedence::Assign,
            ..Rule::default()
        },
        Dot => Rule {
            infix: Some(Parser::parse_dot_expression),
            precedence: Precedence::Dot,
            ..Rule::default()
        },

        _ => Rule::default(),
    }
}

pub struct Parser {
    lexer: Lexer,

    curr: Token,
    next: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Parser {
        // Fetch the first two tokens to set curr and next
        let curr = lexer.next_token();
        let next = lexer.next_token();

        Parser { lexer, curr, next }
    }

    /// Parse the whole input. The program holds every statement that parsed
    /// cleanly; diagnostics accumulate in the error list, one per failed
    /// statement (the parser resynchronizes at the next `;`).
    pub fn parse_program(&mut self) -> (Program, Vec<ParseError>) {
        let mut program = Program::new();
        let mut errors: Vec<ParseError> = Vec::new();

        while self.curr.kind != TokenKind::Eof {
            if self.curr.kind == TokenKind::Err {
                errors.push(self.lex_error());
                self.next_token();
                continue;
            }

            match self.parse_statement() {
                Ok(statement) => program.statements.push(statement),
                Err(error) => {
                    errors.push(error);
                    self.synchronize();
                }
            }

            self.next_token();
        }

        (program, errors)
    }

    /// Skip ahead to the next statement boundary after an error.
    fn synchronize(&mut self) {
        while self.curr.kind != TokenKind::Semicolon && self.curr.kind != TokenKind::Eof {
            self.next_token();
        }
    }

    fn lex_error(&self) -> ParseError {
        ParseError {
            loc: self.curr.loc.clone(),
            kind: ParseErrorKind::Lex(self.curr.word.clone()),
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.curr.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::If => {
                let if_stmt = self.parse_if_statement()?;
                Ok(Statement::If(Box::new(if_stmt)))
            }
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Loop => self.parse_loop_statement(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_statement(),
            // `fn (` begins a function literal, not a function statement
            TokenKind::Fn if self.next.kind != TokenKind::LParen => {
                self.parse_function_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        let loc = self.curr.loc.clone();

        let name = self.expect_peek_identifier()?;
        self.expect_peek(TokenKind::Assign)?;

        // Move onto the first token of the initializer
        self.next_token();
        let value = self.parse_expression(Precedence::None)?;

        self.expect_peek(TokenKind::Semicolon)?;

        Ok(Statement::Let { loc, name, value })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let loc = self.curr.loc.clone();

        let value = if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
            None
        } else {
            self.next_token();
            let value = self.parse_expression(Precedence::None)?;
            self.expect_peek(TokenKind::Semicolon)?;
            Some(value)
        };

        Ok(Statement::Return { loc, value })
    }

    fn parse_if_statement(&mut self) -> ParseResult<IfStatement> {
        let loc = self.curr.loc.clone();

        // No parentheses required around the condition
        self.next_token();
        let condition = self.parse_expression(Precedence::None)?;

        self.expect_peek(TokenKind::LBrace)?;
        let then = self.parse_block()?;

        let alt = if self.peek_is(TokenKind::Else) {
            self.next_token();

            if self.peek_is(TokenKind::If) {
                // `else if` chains as a nested if statement
                self.next_token();
                let nested = self.parse_if_statement()?;
                Some(Statement::If(Box::new(nested)))
            } else {
                self.expect_peek(TokenKind::LBrace)?;
                Some(Statement::Block(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(IfStatement {
            loc,
            condition,
            then,
            alt,
        })
    }

    fn parse_loop_statement(&mut self) -> ParseResult<Statement> {
        let loc = self.curr.loc.clone();

        // An absent condition means `loop { ... }` runs until a jump
        let condition = if self.peek_is(TokenKind::LBrace) {
            None
        } else {
            self.next_token();
            Some(self.parse_expression(Precedence::None)?)
        };

        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block()?;

        Ok(Statement::Loop(Box::new(LoopStatement {
            loc,
            condition,
            body,
        })))
    }

    fn parse_jump_statement(&mut self) -> ParseResult<Statement> {
        let loc = self.curr.loc.clone();
        let is_break = self.curr.kind == TokenKind::Break;

        self.expect_peek(TokenKind::Semicolon)?;

        Ok(Statement::Jump { loc, is_break })
    }

    fn parse_function_statement(&mut self) -> ParseResult<Statement> {
        let loc = self.curr.loc.clone();

        let name = self.expect_peek_identifier()?;

        self.expect_peek(TokenKind::LParen)?;
        let parameters = self.parse_function_parameters()?;

        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block()?;

        Ok(Statement::Function {
            loc: loc.clone(),
            name,
            value: FunctionLiteral {
                loc,
                parameters,
                body: Rc::new(body),
            },
        })
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let expression = self.parse_expression(Precedence::None)?;

        // Strict semicolon policy: an expression statement ends with `;`
        // unless its last token was `}` (function and map literals)
        if self.curr.kind == TokenKind::RBrace {
            if self.peek_is(TokenKind::Semicolon) {
                self.next_token();
            }
        } else {
            self.expect_peek(TokenKind::Semicolon)?;
        }

        Ok(Statement::Expression { expression })
    }

    /// Parse a braced statement list. The caller has already positioned the
    /// parser on the opening `{`; on success the closing `}` is the current
    /// token.
    fn parse_block(&mut self) -> ParseResult<Block> {
        let loc = self.curr.loc.clone();
        let mut statements = Vec::new();

        self.next_token();

        while self.curr.kind != TokenKind::RBrace && self.curr.kind != TokenKind::Eof {
            if self.curr.kind == TokenKind::Err {
                return Err(self.lex_error());
            }

            statements.push(self.parse_statement()?);
            self.next_token();
        }

        if self.curr.kind != TokenKind::RBrace {
            return Err(ParseError {
                loc: self.curr.loc.clone(),
                kind: ParseErrorKind::Expected {
                    expected: "}".to_string(),
                    got: self.curr.word.clone(),
                },
            });
        }

        Ok(Block { loc, statements })
    }

    /// The Pratt loop: dispatch the current token's prefix rule, then keep
    /// folding infix rules while the next token binds tighter than the
    /// minimum precedence.
    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        if self.curr.kind == TokenKind::Err {
            return Err(self.lex_error());
        }

        let prefix = rule(self.curr.kind).prefix.ok_or_else(|| ParseError {
            loc: self.curr.loc.clone(),
            kind: ParseErrorKind::NoPrefixParser(self.curr.kind.to_string()),
        })?;

        let mut left = prefix(self)?;

        while !self.peek_is(TokenKind::Semicolon) && precedence < rule(self.next.kind).precedence {
            let infix = match rule(self.next.kind).infix {
                Some(infix) => infix,
                None => return Ok(left),
            };

            self.next_token();
            left = infix(self, left)?;
        }

        Ok(left)
    }

    fn parse_identifier_expression(parser: &mut Parser) -> ParseResult<Expression> {
        Ok(Expression::Identifier(Identifier {
            loc: parser.curr.loc.clone(),
            name: parser.curr.word.clone(),
        }))
    }

    fn parse_integer_literal(parser: &mut Parser) -> ParseResult<Expression> {
        let value = parser
            .curr
            .word
            .parse::<i64>()
            .map_err(|_| ParseError {
                loc: parser.curr.loc.clone(),
                kind: ParseErrorKind::InvalidNumber {
                    word: parser.curr.word.clone(),
                    as_type: "integer",
                },
            })?;

        Ok(Expression::Integer {
            loc: parser.curr.loc.clone(),
            value,
        })
    }

    fn parse_float_literal(parser: &mut Parser) -> ParseResult<Expression> {
        let value = parser
            .curr
            .word
            .parse::<f64>()
            .map_err(|_| ParseError {
                loc: parser.curr.loc.clone(),
                kind: ParseErrorKind::InvalidNumber {
                    word: parser.curr.word.clone(),
                    as_type: "float",
                },
            })?;

        Ok(Expression::Float {
            loc: parser.curr.loc.clone(),
            value,
        })
    }

    fn parse_string_literal(parser: &mut Parser) -> ParseResult<Expression> {
        Ok(Expression::Str {
            loc: parser.curr.loc.clone(),
            value: parser.curr.word.clone(),
        })
    }

    fn parse_bool_literal(parser: &mut Parser) -> ParseResult<Expression> {
        Ok(Expression::Boolean {
            loc: parser.curr.loc.clone(),
            value: parser.curr.kind == TokenKind::True,
        })
    }

    fn parse_null_literal(parser: &mut Parser) -> ParseResult<Expression> {
        Ok(Expression::Null {
            loc: parser.curr.loc.clone(),
        })
    }

    fn parse_grouped_expression(parser: &mut Parser) -> ParseResult<Expression> {
        parser.next_token();

        let expr = parser.parse_expression(Precedence::None)?;
        parser.expect_peek(TokenKind::RParen)?;

        Ok(expr)
    }

    fn parse_prefix_expression(parser: &mut Parser) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();
        let operator = parser.curr.kind;

        parser.next_token();
        let right = parser.parse_expression(Precedence::Prefix)?;

        Ok(Expression::Prefix(Box::new(PrefixExpression {
            loc,
            operator,
            right,
        })))
    }

    fn parse_infix_expression(parser: &mut Parser, left: Expression) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();
        let operator = parser.curr.kind;
        let precedence = rule(operator).precedence;

        parser.next_token();
        let right = parser.parse_expression(precedence)?;

        Ok(Expression::Infix(Box::new(InfixExpression {
            loc,
            operator,
            left,
            right,
        })))
    }

    fn parse_assign_expression(parser: &mut Parser, left: Expression) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();

        if !matches!(left, Expression::Identifier(_) | Expression::Index(_)) {
            return Err(ParseError {
                loc,
                kind: ParseErrorKind::InvalidAssignTarget,
            });
        }

        // Right-associative: parse the right side one level below Assign so
        // `x = y = z` nests as `x = (y = z)`
        parser.next_token();
        let right = parser.parse_expression(Precedence::None)?;

        Ok(Expression::Assign(Box::new(AssignExpression {
            loc,
            left,
            right,
        })))
    }

    fn parse_dot_expression(parser: &mut Parser, left: Expression) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();

        parser.expect_peek(TokenKind::Ident)?;
        let right = Expression::Identifier(Identifier {
            loc: parser.curr.loc.clone(),
            name: parser.curr.word.clone(),
        });

        Ok(Expression::Infix(Box::new(InfixExpression {
            loc,
            operator: TokenKind::Dot,
            left,
            right,
        })))
    }

    fn parse_call_expression(parser: &mut Parser, left: Expression) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();
        let arguments = parser.parse_expression_list(TokenKind::RParen)?;

        Ok(Expression::Call(Box::new(CallExpression {
            loc,
            callee: left,
            arguments,
        })))
    }

    fn parse_index_expression(parser: &mut Parser, left: Expression) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();

        parser.next_token();
        let index = parser.parse_expression(Precedence::None)?;
        parser.expect_peek(TokenKind::RBracket)?;

        Ok(Expression::Index(Box::new(IndexExpression {
            loc,
            left,
            index,
        })))
    }

    fn parse_function_literal(parser: &mut Parser) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();

        parser.expect_peek(TokenKind::LParen)?;
        let parameters = parser.parse_function_parameters()?;

        parser.expect_peek(TokenKind::LBrace)?;
        let body = parser.parse_block()?;

        Ok(Expression::Function(Box::new(FunctionLiteral {
            loc,
            parameters,
            body: Rc::new(body),
        })))
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<Identifier>> {
        let mut identifiers = Vec::new();

        // Parentheses close immediately: no parameters
        if self.peek_is(TokenKind::RParen) {
            self.next_token();
            return Ok(identifiers);
        }

        self.next_token();
        identifiers.push(self.parse_parameter()?);

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            identifiers.push(self.parse_parameter()?);
        }

        self.expect_peek(TokenKind::RParen)?;

        Ok(identifiers)
    }

    fn parse_parameter(&mut self) -> ParseResult<Identifier> {
        if self.curr.kind != TokenKind::Ident {
            return Err(ParseError {
                loc: self.curr.loc.clone(),
                kind: ParseErrorKind::Expected {
                    expected: "identifier".to_string(),
                    got: self.curr.word.clone(),
                },
            });
        }

        Ok(Identifier {
            loc: self.curr.loc.clone(),
            name: self.curr.word.clone(),
        })
    }

    fn parse_array_literal(parser: &mut Parser) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();
        let elements = parser.parse_expression_list(TokenKind::RBracket)?;

        Ok(Expression::Array(Box::new(ArrayLiteral { loc, elements })))
    }

    fn parse_map_literal(parser: &mut Parser) -> ParseResult<Expression> {
        let loc = parser.curr.loc.clone();
        let mut entries = Vec::new();

        if parser.peek_is(TokenKind::RBrace) {
            parser.next_token();
            return Ok(Expression::Map(Box::new(MapLiteral { loc, entries })));
        }

        loop {
            parser.next_token();
            let key = parser.parse_expression(Precedence::None)?;

            parser.expect_peek(TokenKind::Colon)?;

            parser.next_token();
            let value = parser.parse_expression(Precedence::None)?;

            entries.push(MapEntry { key, value });

            if parser.peek_is(TokenKind::Comma) {
                parser.next_token();
            } else {
                break;
            }
        }

        parser.expect_peek(TokenKind::RBrace)?;

        Ok(Expression::Map(Box::new(MapLiteral { loc, entries })))
    }

    /// Comma-separated expressions up to (and consuming) the `end` token.
    /// Used for call arguments and array literals; no trailing comma.
    fn parse_expression_list(&mut self, end: TokenKind) -> ParseResult<Vec<Expression>> {
        let mut list = Vec::new();

        if self.peek_is(end) {
            self.next_token();
            return Ok(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::None)?);

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::None)?);
        }

        self.expect_peek(end)?;

        Ok(list)
    }

    fn next_token(&mut self) {
        self.curr = std::mem::replace(&mut self.next, self.lexer.next_token());
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    fn expect_peek(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.peek_is(kind) {
            self.next_token();
            Ok(())
        } else {
            Err(ParseError {
                loc: self.next.loc.clone(),
                kind: ParseErrorKind::Expected {
                    expected: kind.to_string(),
                    got: self.next.word.clone(),
                },
            })
        }
    }

    fn expect_peek_identifier(&mut self) -> ParseResult<String> {
        if self.next.kind != TokenKind::Ident {
            return Err(ParseError {
                loc: self.next.loc.clone(),
                kind: ParseErrorKind::Expected {
                    expected: "identifier".to_string(),
                    got: self.next.word.clone(),
                },
            });
        }

        self.next_token();
        Ok(self.curr.word.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Expression, Program, Statement};
    use crate::lexer::Lexer;
    use crate::parser::{ParseError, ParseErrorKind, Parser};

    fn parse(input: &str) -> (Program, Vec<ParseError>) {
        let lexer = Lexer::new("parser_test", input);
        let mut parser = Parser::new(lexer);
        parser.parse_program()
    }

    fn setup(input: &str, stmt_count: usize) -> Program {
        let (program, errors) = parse(input);

        if !errors.is_empty() {
            for error in &errors {
                println!("parser error: {}", error);
            }
            panic!("parser had {} error(s) for {:?}", errors.len(), input);
        }

        if stmt_count != 0 && program.statements.len() != stmt_count {
            panic!(
                "expected {} statement(s) for {:?} but got {:?}",
                stmt_count, input, program.statements
            );
        }

        program
    }

    fn unwrap_expression(program: &Program) -> &Expression {
        match program.statements.first().unwrap() {
            Statement::Expression { expression } => expression,
            stmt => panic!("{:?} isn't an expression statement", stmt),
        }
    }

    #[test]
    fn let_statement() {
        let tests = vec![
            ("let x = 5;", "let x = 5;"),
            ("let y = true;", "let y = true;"),
            ("let foobar = y;", "let foobar = y;"),
            ("let half = 0.5;", "let half = 0.5;"),
            ("let s = \"hi\";", "let s = \"hi\";"),
            ("let xs = [1, 2];", "let xs = [1, 2];"),
        ];

        for (input, expected) in tests {
            let program = setup(input, 1);
            assert_eq!(program.to_string(), expected);
        }
    }

    #[test]
    fn let_statement_structure() {
        let program = setup("let x = 5;", 1);

        match &program.statements[0] {
            Statement::Let { name, value, .. } => {
                assert_eq!(name, "x");
                assert!(matches!(value, Expression::Integer { value: 5, .. }));
            }
            stmt => panic!("expected let statement but got {}", stmt),
        }
    }

    #[test]
    fn return_statement() {
        let program = setup("return 5; return;", 2);

        match &program.statements[0] {
            Statement::Return { value: Some(v), .. } => {
                assert!(matches!(v, Expression::Integer { value: 5, .. }))
            }
            stmt => panic!("expected return statement with value but got {}", stmt),
        }

        match &program.statements[1] {
            Statement::Return { value: None, .. } => {}
            stmt => panic!("expected bare return statement but got {}", stmt),
        }
    }

    #[test]
    fn if_statement() {
        let program = setup("if x < y { x; }", 1);

        match &program.statements[0] {
            Statement::If(if_stmt) => {
                assert_eq!(if_stmt.condition.to_string(), "(x < y)");
                assert_eq!(if_stmt.then.statements.len(), 1);
                assert!(if_stmt.alt.is_none());
            }
            stmt => panic!("expected if statement but got {}", stmt),
        }
    }

    #[test]
    fn if_else_statement() {
        let program = setup("if x < y { x; } else { y; }", 1);

        match &program.statements[0] {
            Statement::If(if_stmt) => {
                assert!(matches!(if_stmt.alt, Some(Statement::Block(_))));
            }
            stmt => panic!("expected if statement but got {}", stmt),
        }
    }

    #[test]
    fn if_else_if_else_statement() {
        let program = setup("if x < y { x; } else if x > y { y; } else { z; }", 1);

        match &program.statements[0] {
            Statement::If(if_stmt) => match &if_stmt.alt {
                Some(Statement::If(else_if)) => {
                    assert_eq!(else_if.condition.to_string(), "(x > y)");
                    assert!(matches!(else_if.alt, Some(Statement::Block(_))));
                }
                alt => panic!("expected else-if statement but got {:?}", alt),
            },
            stmt => panic!("expected if statement but got {}", stmt),
        }
    }

    #[test]
    fn loop_statement() {
        let program = setup("loop x < 1 { true; }", 1);

        match &program.statements[0] {
            Statement::Loop(loop_stmt) => {
                assert_eq!(
                    loop_stmt.condition.as_ref().unwrap().to_string(),
                    "(x < 1)"
                );
                assert_eq!(loop_stmt.body.statements.len(), 1);
            }
            stmt => panic!("expected loop statement but got {}", stmt),
        }
    }

    #[test]
    fn loop_statement_without_condition() {
        let program = setup("loop { true; }", 1);

        match &program.statements[0] {
            Statement::Loop(loop_stmt) => {
                assert!(loop_stmt.condition.is_none());
                assert_eq!(loop_stmt.body.statements.len(), 1);
            }
            stmt => panic!("expected loop statement but got {}", stmt),
        }
    }

    #[test]
    fn jump_statements() {
        let program = setup("break; continue;", 2);

        assert!(matches!(
            program.statements[0],
            Statement::Jump { is_break: true, .. }
        ));
        assert!(matches!(
            program.statements[1],
            Statement::Jump {
                is_break: false,
                ..
            }
        ));
    }

    #[test]
    fn function_statement() {
        let program = setup("fn add(x, y) { return x + y; }", 1);

        match &program.statements[0] {
            Statement::Function { name, value, .. } => {
                assert_eq!(name, "add");
                let params: Vec<&str> =
                    value.parameters.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(params, vec!["x", "y"]);
                assert_eq!(value.body.statements.len(), 1);
            }
            stmt => panic!("expected function statement but got {}", stmt),
        }
    }

    #[test]
    fn function_literal_expression() {
        // `fn (` starts a literal, even in statement position
        let program = setup("fn(x) { x; };", 1);

        match unwrap_expression(&program) {
            Expression::Function(func) => {
                assert_eq!(func.parameters.len(), 1);
                assert_eq!(func.parameters[0].name, "x");
            }
            expr => panic!("expected function literal but got {}", expr),
        }
    }

    #[test]
    fn function_parameters() {
        let tests = vec![
            ("fn() {};", vec![]),
            ("fn(x) {};", vec!["x"]),
            ("fn(x, y, z) {};", vec!["x", "y", "z"]),
        ];

        for (input, expected) in tests {
            let program = setup(input, 1);

            match unwrap_expression(&program) {
                Expression::Function(func) => {
                    let params: Vec<&str> =
                        func.parameters.iter().map(|p| p.name.as_str()).collect();
                    assert_eq!(params, expected);
                }
                expr => panic!("expected function literal but got {}", expr),
            }
        }
    }

    #[test]
    fn assign_expression() {
        let program = setup("x = 1; a[0] = 2;", 2);

        match &program.statements[0] {
            Statement::Expression { expression } => {
                assert_eq!(expression.to_string(), "(x = 1)");
            }
            stmt => panic!("expected expression statement but got {}", stmt),
        }

        match &program.statements[1] {
            Statement::Expression {
                expression: Expression::Assign(assign),
            } => {
                assert!(matches!(assign.left, Expression::Index(_)));
                assert_eq!(assign.to_string(), "((a[0]) = 2)");
            }
            stmt => panic!("expected index assignment but got {}", stmt),
        }
    }

    #[test]
    fn assign_is_right_associative() {
        let program = setup("x = y = z;", 1);
        assert_eq!(program.to_string(), "(x = (y = z));");
    }

    #[test]
    fn invalid_assign_target() {
        let (_, errors) = parse("a + b = c;");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::InvalidAssignTarget);
    }

    #[test]
    fn call_expression() {
        let program = setup("add(1, 2 * 3, 4 + 5);", 1);

        match unwrap_expression(&program) {
            Expression::Call(call) => {
                assert_eq!(call.callee.to_string(), "add");
                assert_eq!(call.arguments.len(), 3);
                assert_eq!(call.arguments[1].to_string(), "(2 * 3)");
            }
            expr => panic!("expected call expression but got {}", expr),
        }
    }

    #[test]
    fn index_expression() {
        let program = setup("myArray[1 + 1];", 1);

        match unwrap_expression(&program) {
            Expression::Index(index) => {
                assert_eq!(index.left.to_string(), "myArray");
                assert_eq!(index.index.to_string(), "(1 + 1)");
            }
            expr => panic!("expected index expression but got {}", expr),
        }
    }

    #[test]
    fn array_literal() {
        let program = setup("[1, 2 * 2, 3 + 3];", 1);

        match unwrap_expression(&program) {
            Expression::Array(arr) => {
                assert_eq!(arr.elements.len(), 3);
                assert_eq!(arr.elements[1].to_string(), "(2 * 2)");
            }
            expr => panic!("expected array literal but got {}", expr),
        }
    }

    #[test]
    fn map_literal() {
        let program = setup("let m = {\"one\": 1, 2: \"two\", true: null};", 1);

        match &program.statements[0] {
            Statement::Let {
                value: Expression::Map(map),
                ..
            } => {
                assert_eq!(map.entries.len(), 3);
                // entries keep source order
                assert_eq!(map.entries[0].key.to_string(), "\"one\"");
                assert_eq!(map.entries[1].key.to_string(), "2");
                assert_eq!(map.entries[2].value.to_string(), "null");
            }
            stmt => panic!("expected map literal but got {}", stmt),
        }
    }

    #[test]
    fn empty_map_literal() {
        let program = setup("let m = {};", 1);

        match &program.statements[0] {
            Statement::Let {
                value: Expression::Map(map),
                ..
            } => assert!(map.entries.is_empty()),
            stmt => panic!("expected map literal but got {}", stmt),
        }
    }

    #[test]
    fn operator_precedence() {
        #[rustfmt::skip]
        let tests = vec![
            ("-a * b;", "((-a) * b);"),
            ("!-a;", "(!(-a));"),
            ("a + b + c;", "((a + b) + c);"),
            ("a + b - c;", "((a + b) - c);"),
            ("a * b * c;", "((a * b) * c);"),
            ("a * b / c;", "((a * b) / c);"),
            ("a + b / c;", "(a + (b / c));"),
            ("a + b * c + d / e - f;", "(((a + (b * c)) + (d / e)) - f);"),
            ("3 + 4; -5 * 5;", "(3 + 4); ((-5) * 5);"),
            ("5 > 4 == 3 < 4;", "((5 > 4) == (3 < 4));"),
            ("5 < 4 != 3 > 4;", "((5 < 4) != (3 > 4));"),
            ("3 + 4 * 5 == 3 * 1 + 4 * 5;", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)));"),
            ("3 >= 4 == 3 <= 4;", "((3 >= 4) == (3 <= 4));"),
            ("true;", "true;"),
            ("3 > 5 == false;", "((3 > 5) == false);"),
            ("1 + (2 + 3) + 4;", "((1 + (2 + 3)) + 4);"),
            ("(5 + 5) * 2;", "((5 + 5) * 2);"),
            ("2 / (5 + 5);", "(2 / (5 + 5));"),
            ("-(5 + 5);", "(-(5 + 5));"),
            ("!(true == true);", "(!(true == true));"),
            ("a + add(b * c) + d;", "((a + add((b * c))) + d);"),
            ("add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8));", "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)));"),
            ("a * [1, 2, 3, 4][b * c] * d;", "((a * ([1, 2, 3, 4][(b * c)])) * d);"),
            ("add(a * b[2], b[1], 2 * [1, 2][1]);", "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])));"),
            ("x.y == a.b;", "((x . y) == (a . b));"),
            ("io.println(1 + 2);", "(io . println)((1 + 2));"),
            ("x = y = z;", "(x = (y = z));"),
        ];

        for (input, expected) in tests {
            let program = setup(input, 0);
            assert_eq!(program.to_string(), expected, "for input {:?}", input);
        }
    }

    #[test]
    fn printed_form_reparses() {
        let input = "\
            let xs = [1, 2.5, \"three\"]; \
            fn twice(f, v) { return f(f(v)); } \
            let m = {\"k\": [1], 2: fn(x) { x; }}; \
            loop i < 3 { if i == 1 { break; } else { i = i + 1; } } \
            io.println(xs[0] + m.len);";

        let first = setup(input, 0).to_string();
        let second = setup(&first, 0).to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_semicolon_is_an_error() {
        let (_, errors) = parse("let x = 5");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::Expected {
                expected: ";".to_string(),
                got: "eof".to_string(),
            }
        );
    }

    #[test]
    fn expression_statement_semicolon_policy() {
        // fine: the expression ends with `}`
        setup("fn() {}", 1);
        // fine: explicit semicolon
        setup("1 + 2;", 1);

        let (_, errors) = parse("1 + 2");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unterminated_block() {
        let (_, errors) = parse("{ 5; ");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::Expected {
                expected: "}".to_string(),
                got: "eof".to_string(),
            }
        );
    }

    #[test]
    fn no_prefix_parser() {
        let (_, errors) = parse("let x = * 5;");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "parser_test:1:9: no prefix parse function for \"*\" found"
        );
    }

    #[test]
    fn lexer_errors_surface_as_parse_errors() {
        let (_, errors) = parse("let x = 1; @");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::Lex("unknown token '@'".to_string()));
        assert_eq!((errors[0].loc.line, errors[0].loc.col), (1, 12));
    }

    #[test]
    fn recovers_at_statement_boundaries() {
        let (program, errors) = parse("let = 1; let y = 2; let = 3; let z = 4;");

        // both bad statements reported, both good ones kept
        assert_eq!(errors.len(), 2);
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.to_string(), "let y = 2; let z = 4;");
    }

    #[test]
    fn error_location_points_at_offender() {
        let (_, errors) = parse("let x 5;");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "parser_test:1:7: expected next token to be \"=\", got \"5\" instead"
        );
    }

    #[test]
    fn keeps_dispatching_after_if() {
        let program = setup("if a { b; } c + d;", 2);
        assert_eq!(program.to_string(), "if a { b; } (c + d);");
    }

    #[test]
    fn integer_literal_overflow() {
        let (_, errors) = parse("let x = 92233720368547758079;");

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].kind,
            ParseErrorKind::InvalidNumber { as_type: "integer", .. }
        ));
    }

    #[test]
    fn module_access_requires_identifier() {
        let (_, errors) = parse("io.5;");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::Expected {
                expected: "identifier".to_string(),
                got: "5".to_string(),
            }
        );
    }
}

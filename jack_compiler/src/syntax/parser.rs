//! Recursive-descent parser with single-token lookahead
//!
//! Each grammar rule is one method returning its AST node. Tokens are pulled
//! from the [`TokenStream`] only as the grammar consumes them, so a lexical
//! error is reported at the point the parser reaches it.

use crate::config::compile_time::syntax::*;
use crate::grammar::ast::nodes::*;
use crate::grammar::keywords::Keyword;
use crate::syntax::error::{SyntaxError, SyntaxResult};
use crate::tokens::{Symbol, Token, TokenKind, TokenStream};
use crate::utils::Span;
use crate::{log_debug, log_error};

pub struct JackParser {
    tokens: TokenStream,
    parse_depth: usize,
}

impl JackParser {
    pub fn new(tokens: TokenStream) -> Self {
        Self {
            tokens,
            parse_depth: 0,
        }
    }

    pub fn from_source(source: &str) -> SyntaxResult<Self> {
        Ok(Self::new(TokenStream::from_source(source)?))
    }

    /// Parse one class and require that nothing follows it
    pub fn parse_program(&mut self) -> SyntaxResult<ClassDecl> {
        let class = self.parse_class()?;

        if let Some(token) = self.tokens.peek() {
            let err = SyntaxError::TrailingInput {
                found: token.raw.clone(),
                span: token.span,
            };
            return Err(self.report(err));
        }

        Ok(class)
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    // === DECLARATIONS ===

    /// `class Name { ClassVarDecl* SubroutineDecl* }`
    pub fn parse_class(&mut self) -> SyntaxResult<ClassDecl> {
        let start = self.expect_keyword(Keyword::Class)?;
        let (name, _) = self.expect_identifier()?;
        self.expect_symbol(Symbol::LeftBrace)?;

        let mut class_vars = Vec::new();
        while self.check_keyword(Keyword::Static) || self.check_keyword(Keyword::Field) {
            class_vars.push(self.parse_class_var_decl()?);
        }

        let mut subroutines = Vec::new();
        while self.peek_subroutine_kind().is_some() {
            subroutines.push(self.parse_subroutine()?);
        }

        if !self.tokens.check_symbol(Symbol::RightBrace) {
            return Err(self.unexpected("'constructor', 'function', 'method' or '}'"));
        }
        let end = self.expect_symbol(Symbol::RightBrace)?;

        log_debug!("Parsed class",
            "class" => name.as_str(),
            "class_vars" => class_vars.len(),
            "subroutines" => subroutines.len()
        );

        Ok(ClassDecl {
            name,
            class_vars,
            subroutines,
            span: start.merge(end),
        })
    }

    fn parse_class_var_decl(&mut self) -> SyntaxResult<ClassVarDecl> {
        let token = self.advance()?;
        let kind = match token.as_keyword() {
            Some(Keyword::Static) => ClassVarKind::Static,
            _ => ClassVarKind::Field,
        };

        let var_type = self.parse_type()?;
        let names = self.parse_name_list()?;
        let end = self.expect_symbol(Symbol::Semicolon)?;

        Ok(ClassVarDecl {
            kind,
            var_type,
            names,
            span: token.span.merge(end),
        })
    }

    fn parse_subroutine(&mut self) -> SyntaxResult<SubroutineDecl> {
        let token = self.advance()?;
        let kind = token
            .as_keyword()
            .and_then(SubroutineKind::from_keyword)
            .unwrap_or(SubroutineKind::Function);

        let return_type = if self.check_keyword(Keyword::Void) {
            self.advance()?;
            None
        } else {
            Some(self.parse_type()?)
        };
        let (name, _) = self.expect_identifier()?;

        self.expect_symbol(Symbol::LeftParen)?;
        let parameters = self.parse_parameter_list()?;
        self.expect_symbol(Symbol::RightParen)?;

        self.expect_symbol(Symbol::LeftBrace)?;
        let mut locals = Vec::new();
        while self.check_keyword(Keyword::Var) {
            locals.push(self.parse_var_decl()?);
        }
        let body = self.parse_statements()?;
        let end = self.expect_symbol(Symbol::RightBrace)?;

        log_debug!("Parsed subroutine",
            "name" => name.as_str(),
            "kind" => kind,
            "statements" => body.len()
        );

        Ok(SubroutineDecl {
            kind,
            return_type,
            name,
            parameters,
            locals,
            body,
            span: token.span.merge(end),
        })
    }

    fn parse_parameter_list(&mut self) -> SyntaxResult<Vec<Parameter>> {
        let mut parameters = Vec::new();
        if self.tokens.check_symbol(Symbol::RightParen) {
            return Ok(parameters);
        }

        loop {
            let start = self.tokens.current_span();
            let var_type = self.parse_type()?;
            let (name, end) = self.expect_identifier()?;
            parameters.push(Parameter {
                var_type,
                name,
                span: start.merge(end),
            });

            if !self.eat_symbol(Symbol::Comma)? {
                return Ok(parameters);
            }
        }
    }

    fn parse_var_decl(&mut self) -> SyntaxResult<VarDecl> {
        let start = self.expect_keyword(Keyword::Var)?;
        let var_type = self.parse_type()?;
        let names = self.parse_name_list()?;
        let end = self.expect_symbol(Symbol::Semicolon)?;

        Ok(VarDecl {
            var_type,
            names,
            span: start.merge(end),
        })
    }

    fn parse_name_list(&mut self) -> SyntaxResult<Vec<Identifier>> {
        let mut names = vec![self.expect_identifier()?.0];
        while self.eat_symbol(Symbol::Comma)? {
            names.push(self.expect_identifier()?.0);
        }
        Ok(names)
    }

    /// `int | char | boolean | ClassName`
    fn parse_type(&mut self) -> SyntaxResult<TypeName> {
        let type_name = match self.tokens.peek().map(|t| &t.kind) {
            Some(TokenKind::Keyword(kw)) => TypeName::from_keyword(*kw),
            Some(TokenKind::Identifier(name)) => Some(TypeName::Class(name.clone())),
            _ => None,
        };

        match type_name {
            Some(type_name) => {
                self.advance()?;
                Ok(type_name)
            }
            None => Err(self.unexpected("type")),
        }
    }

    // === STATEMENTS ===

    /// Statements up to the first lookahead that does not start one
    fn parse_statements(&mut self) -> SyntaxResult<Vec<Statement>> {
        self.nested(|parser| {
            let mut statements = Vec::new();
            while parser
                .tokens
                .peek()
                .and_then(Token::as_keyword)
                .is_some_and(Keyword::starts_statement)
            {
                statements.push(parser.parse_statement()?);
            }
            Ok(statements)
        })
    }

    fn parse_statement(&mut self) -> SyntaxResult<Statement> {
        match self.tokens.peek().and_then(Token::as_keyword) {
            Some(Keyword::Let) => self.parse_let(),
            Some(Keyword::If) => self.parse_if(),
            Some(Keyword::While) => self.parse_while(),
            Some(Keyword::Do) => self.parse_do(),
            Some(Keyword::Return) => self.parse_return(),
            _ => Err(self.unexpected("statement")),
        }
    }

    fn parse_let(&mut self) -> SyntaxResult<Statement> {
        let start = self.expect_keyword(Keyword::Let)?;
        let (target, _) = self.expect_identifier()?;

        let index = if self.eat_symbol(Symbol::LeftBracket)? {
            let index = self.parse_expression()?;
            self.expect_symbol(Symbol::RightBracket)?;
            Some(index)
        } else {
            None
        };

        self.expect_symbol(Symbol::Equals)?;
        let value = self.parse_expression()?;
        let end = self.expect_symbol(Symbol::Semicolon)?;

        Ok(Statement::Let {
            target,
            index,
            value,
            span: start.merge(end),
        })
    }

    fn parse_if(&mut self) -> SyntaxResult<Statement> {
        let start = self.expect_keyword(Keyword::If)?;
        let condition = self.parse_condition()?;
        let (consequent, mut end) = self.parse_block()?;

        let alternate = if self.check_keyword(Keyword::Else) {
            self.advance()?;
            let (alternate, else_end) = self.parse_block()?;
            end = else_end;
            Some(alternate)
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            consequent,
            alternate,
            span: start.merge(end),
        })
    }

    fn parse_while(&mut self) -> SyntaxResult<Statement> {
        let start = self.expect_keyword(Keyword::While)?;
        let condition = self.parse_condition()?;
        let (body, end) = self.parse_block()?;

        Ok(Statement::While {
            condition,
            body,
            span: start.merge(end),
        })
    }

    fn parse_do(&mut self) -> SyntaxResult<Statement> {
        let start = self.expect_keyword(Keyword::Do)?;
        let (name, name_span) = self.expect_identifier()?;
        let call = self.parse_call_rest(name, name_span)?;
        let end = self.expect_symbol(Symbol::Semicolon)?;

        Ok(Statement::Do {
            call,
            span: start.merge(end),
        })
    }

    fn parse_return(&mut self) -> SyntaxResult<Statement> {
        let start = self.expect_keyword(Keyword::Return)?;
        let value = if self.tokens.check_symbol(Symbol::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let end = self.expect_symbol(Symbol::Semicolon)?;

        Ok(Statement::Return {
            value,
            span: start.merge(end),
        })
    }

    /// `( expression )`
    fn parse_condition(&mut self) -> SyntaxResult<Expression> {
        self.expect_symbol(Symbol::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect_symbol(Symbol::RightParen)?;
        Ok(condition)
    }

    /// `{ statements }`, returning the closing brace span
    fn parse_block(&mut self) -> SyntaxResult<(Vec<Statement>, Span)> {
        self.expect_symbol(Symbol::LeftBrace)?;
        let statements = self.parse_statements()?;
        let end = self.expect_symbol(Symbol::RightBrace)?;
        Ok((statements, end))
    }

    // === EXPRESSIONS ===

    pub fn parse_expression(&mut self) -> SyntaxResult<Expression> {
        self.nested(|parser| parser.parse_binary(BinaryOp::LOWEST_PRECEDENCE))
    }

    /// One precedence level: operands from the next level up, folded left
    fn parse_binary(&mut self, level: u8) -> SyntaxResult<Expression> {
        if level > BinaryOp::HIGHEST_PRECEDENCE {
            return self.parse_term();
        }

        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = self.peek_binary_op().filter(|op| op.precedence() == level) {
            self.advance()?;
            let right = self.parse_binary(level + 1)?;
            left = Expression::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> SyntaxResult<Expression> {
        let Some(kind) = self.tokens.peek().map(|t| t.kind.clone()) else {
            return Err(self.unexpected("expression"));
        };

        match kind {
            TokenKind::IntegerLiteral(value) => {
                let token = self.advance()?;
                Ok(Expression::new(ExpressionKind::IntegerConstant(value), token.span))
            }
            TokenKind::StringLiteral(value) => {
                let token = self.advance()?;
                Ok(Expression::new(ExpressionKind::StringConstant(value), token.span))
            }
            TokenKind::Keyword(kw) if kw.is_keyword_constant() => {
                let token = self.advance()?;
                let kind = match kw {
                    Keyword::True => ExpressionKind::BooleanConstant(true),
                    Keyword::False => ExpressionKind::BooleanConstant(false),
                    Keyword::Null => ExpressionKind::Null,
                    _ => ExpressionKind::This,
                };
                Ok(Expression::new(kind, token.span))
            }
            TokenKind::Symbol(Symbol::LeftParen) => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect_symbol(Symbol::RightParen)?;
                Ok(inner)
            }
            TokenKind::Symbol(symbol @ (Symbol::Minus | Symbol::Not)) => {
                let op = if symbol == Symbol::Minus {
                    UnaryOp::Negate
                } else {
                    UnaryOp::Not
                };
                let token = self.advance()?;
                let operand = self.nested(|parser| parser.parse_term())?;
                let span = token.span.merge(operand.span);
                Ok(Expression::new(
                    ExpressionKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::Identifier(name) => {
                let token = self.advance()?;
                self.parse_identifier_term(name, token.span)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Variable, `name[index]` or a call, decided by the token after the name
    fn parse_identifier_term(&mut self, name: Identifier, start: Span) -> SyntaxResult<Expression> {
        if self.eat_symbol(Symbol::LeftBracket)? {
            let index = self.parse_expression()?;
            let end = self.expect_symbol(Symbol::RightBracket)?;
            return Ok(Expression::new(
                ExpressionKind::ArrayMember {
                    array: name,
                    index: Box::new(index),
                },
                start.merge(end),
            ));
        }

        if self.tokens.check_symbol(Symbol::LeftParen) || self.tokens.check_symbol(Symbol::Dot) {
            let call = self.parse_call_rest(name, start)?;
            let span = call.span;
            return Ok(Expression::new(ExpressionKind::Call(call), span));
        }

        Ok(Expression::new(ExpressionKind::Variable(name), start))
    }

    /// Rest of `name(args)` or `receiver.name(args)` after the first identifier
    fn parse_call_rest(&mut self, first: Identifier, start: Span) -> SyntaxResult<SubroutineCall> {
        let (receiver, name) = if self.eat_symbol(Symbol::Dot)? {
            (Some(first), self.expect_identifier()?.0)
        } else {
            (None, first)
        };

        self.expect_symbol(Symbol::LeftParen)?;
        let arguments = self.parse_expression_list()?;
        let end = self.expect_symbol(Symbol::RightParen)?;

        Ok(SubroutineCall {
            receiver,
            name,
            arguments,
            span: start.merge(end),
        })
    }

    fn parse_expression_list(&mut self) -> SyntaxResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.tokens.check_symbol(Symbol::RightParen) {
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_expression()?);
            if !self.eat_symbol(Symbol::Comma)? {
                return Ok(arguments);
            }
        }
    }

    // === TOKEN HELPERS ===

    fn advance(&mut self) -> SyntaxResult<Token> {
        match self.tokens.advance()? {
            Some(token) => Ok(token),
            None => Err(self.unexpected("token")),
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.tokens.check_keyword(keyword)
    }

    fn peek_subroutine_kind(&self) -> Option<SubroutineKind> {
        self.tokens
            .peek()
            .and_then(Token::as_keyword)
            .and_then(SubroutineKind::from_keyword)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        self.tokens
            .peek()
            .and_then(Token::as_symbol)
            .and_then(BinaryOp::from_symbol)
    }

    fn eat_symbol(&mut self, symbol: Symbol) -> SyntaxResult<bool> {
        if self.tokens.check_symbol(symbol) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> SyntaxResult<Span> {
        if self.check_keyword(keyword) {
            return Ok(self.advance()?.span);
        }
        Err(self.unexpected(&format!("keyword '{}'", keyword)))
    }

    fn expect_symbol(&mut self, symbol: Symbol) -> SyntaxResult<Span> {
        if self.tokens.check_symbol(symbol) {
            return Ok(self.advance()?.span);
        }
        Err(self.unexpected(&format!("symbol '{}'", symbol)))
    }

    fn expect_identifier(&mut self) -> SyntaxResult<(Identifier, Span)> {
        if let Some(name) = self.tokens.peek().and_then(Token::as_identifier) {
            let name = name.to_string();
            let span = self.advance()?.span;
            return Ok((name, span));
        }
        Err(self.unexpected("identifier"))
    }

    /// Run a nested rule under the depth limit
    fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> SyntaxResult<T>) -> SyntaxResult<T> {
        self.parse_depth += 1;
        if self.parse_depth > MAX_PARSE_DEPTH {
            let err = SyntaxError::MaxRecursionDepth {
                span: self.tokens.current_span(),
            };
            return Err(self.report(err));
        }

        let result = rule(self);
        self.parse_depth -= 1;
        result
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let err = match self.tokens.peek() {
            Some(token) => SyntaxError::unexpected_token(expected, &token.raw, token.span),
            None => SyntaxError::unexpected_end_of_input(expected, self.tokens.end_position()),
        };
        self.report(err)
    }

    fn report(&self, err: SyntaxError) -> SyntaxError {
        match err.span() {
            Some(span) => log_error!(err.error_code(), &err.to_string(), span = span),
            None => log_error!(err.error_code(), &err.to_string()),
        }
        err
    }
}

/// Parser over a complete source text
pub fn create_parser(source: &str) -> SyntaxResult<JackParser> {
    JackParser::from_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse_expr(source: &str) -> Expression {
        let mut parser = JackParser::from_source(source).unwrap();
        parser.parse_expression().unwrap()
    }

    /// Fully parenthesised rendering to check tree shape
    fn shape(expr: &Expression) -> String {
        match &expr.kind {
            ExpressionKind::IntegerConstant(v) => v.to_string(),
            ExpressionKind::Variable(name) => name.clone(),
            ExpressionKind::Binary { op, left, right } => {
                format!("({} {} {})", shape(left), op.symbol(), shape(right))
            }
            ExpressionKind::Unary { op, operand } => match op {
                UnaryOp::Negate => format!("-{}", shape(operand)),
                UnaryOp::Not => format!("~{}", shape(operand)),
            },
            ExpressionKind::ArrayMember { array, index } => format!("{}[{}]", array, shape(index)),
            ExpressionKind::Call(call) => format!(
                "{}{}()",
                call.receiver.as_deref().map(|r| format!("{}.", r)).unwrap_or_default(),
                call.name
            ),
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn test_precedence_levels() {
        assert_eq!(shape(&parse_expr("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&parse_expr("1 - 2 - 3")), "((1 - 2) - 3)");
        assert_eq!(
            shape(&parse_expr("a < b & c = d | e")),
            "(((a < b) & (c = d)) | e)"
        );
        assert_eq!(shape(&parse_expr("a <= b + 1")), "(a <= (b + 1))");
        assert_eq!(shape(&parse_expr("(1 + 2) * 3")), "((1 + 2) * 3)");
    }

    #[test]
    fn test_unary_binds_to_primary() {
        assert_eq!(shape(&parse_expr("-x * y")), "(-x * y)");
        assert_eq!(shape(&parse_expr("~(a & b)")), "~(a & b)");
        assert_eq!(shape(&parse_expr("a - -b")), "(a - -b)");
    }

    #[test]
    fn test_identifier_terms() {
        assert_eq!(shape(&parse_expr("arr[i + 1]")), "arr[(i + 1)]");
        assert_eq!(shape(&parse_expr("Math.max(a, b)")), "Math.max()");
        assert_eq!(shape(&parse_expr("size()")), "size()");
    }

    #[test]
    fn test_call_receiver_variant() {
        let expr = parse_expr("game.run(1, \"go\")");
        assert_matches!(&expr.kind, ExpressionKind::Call(call) => {
            assert_eq!(call.receiver.as_deref(), Some("game"));
            assert_eq!(call.arguments.len(), 2);
        });

        let expr = parse_expr("draw()");
        assert_matches!(&expr.kind, ExpressionKind::Call(SubroutineCall { receiver: None, .. }));
    }

    #[test]
    fn test_parse_class() {
        let source = r#"
            class Point {
                field int x, y;
                static int count;

                constructor Point new(int ax, int ay) {
                    let x = ax;
                    let y = ay;
                    return this;
                }

                method int getX() { return x; }

                function void main() {
                    var Point p;
                    var Array a, b;
                    let p = Point.new(1, 2);
                    if (p.getX() > 0) { do Output.printInt(p.getX()); } else { let a[0] = null; }
                    while (~(count = 3)) { let count = count + 1; }
                    return;
                }
            }
        "#;

        let mut parser = JackParser::from_source(source).unwrap();
        let class = parser.parse_program().unwrap();

        assert_eq!(class.name, "Point");
        assert_eq!(class.field_count(), 2);
        assert_eq!(class.static_count(), 1);
        assert_eq!(class.subroutines.len(), 3);

        let new = &class.subroutines[0];
        assert_eq!(new.kind, SubroutineKind::Constructor);
        assert_eq!(new.return_type, Some(TypeName::Class("Point".into())));
        assert_eq!(new.parameters.len(), 2);

        let main = class.subroutine("main").unwrap();
        assert_eq!(main.return_type, None);
        assert_eq!(main.local_count(), 3);
        assert_eq!(main.body.len(), 4);
        assert_matches!(&main.body[1], Statement::If { alternate: Some(alt), .. } if alt.len() == 1);
        assert_matches!(&main.body[3], Statement::Return { value: None, .. });
    }

    #[test]
    fn test_missing_semicolon_names_expected() {
        let mut parser =
            JackParser::from_source("class A { function void f() { return } }").unwrap();
        let err = parser.parse_program().unwrap_err();
        assert_matches!(&err, SyntaxError::UnexpectedToken { expected, found, .. }
            if found == "}" && expected == "expression");

        let mut parser =
            JackParser::from_source("class A { function void f() { let x = 1 } }").unwrap();
        let err = parser.parse_program().unwrap_err();
        assert_matches!(&err, SyntaxError::UnexpectedToken { expected, span, .. }
            if expected == "symbol ';'" && span.start.column == 41);
    }

    #[test]
    fn test_end_of_input_and_trailing_tokens() {
        let mut parser = JackParser::from_source("class A {").unwrap();
        assert_matches!(
            parser.parse_program(),
            Err(SyntaxError::UnexpectedEndOfInput { .. })
        );

        let mut parser = JackParser::from_source("class A { } class B { }").unwrap();
        assert_matches!(
            parser.parse_program(),
            Err(SyntaxError::TrailingInput { found, .. }) if found == "class"
        );
    }

    #[test]
    fn test_lexical_error_surfaces_through_parser() {
        let mut parser = JackParser::from_source("class A { field int x; ` }").unwrap();
        assert_matches!(
            parser.parse_program(),
            Err(SyntaxError::Lexical(crate::lexical::LexerError::UnrecognizedInput { .. }))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let depth = MAX_PARSE_DEPTH + 5;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let mut parser = JackParser::from_source(&source).unwrap();
        assert_matches!(
            parser.parse_expression(),
            Err(SyntaxError::MaxRecursionDepth { .. })
        );
    }

    #[test]
    fn test_statement_list_stops_at_non_statement() {
        let mut parser =
            JackParser::from_source("class A { function void f() { return; var int x; } }")
                .unwrap();
        let err = parser.parse_program().unwrap_err();
        assert_matches!(err, SyntaxError::UnexpectedToken { found, .. } if found == "var");
    }
}

//! Recursive-descent parser for the TypeScript/JavaScript statement and
//! expression subset the checker reasons about.
//!
//! Type syntax is recognized only well enough to skip it: annotations,
//! generic arguments, type aliases, interfaces and ambient declarations
//! leave no nodes behind (or an `OpaqueStatement`). Automatic semicolon
//! insertion is approximated by making `;` optional and consulting the
//! lexer's `newline_before` flag where a statement could otherwise run on.

use crate::ast::{DeclarationKind, NodeId, NodeKind, Span, SyntaxTree, TreeBuilder};
use crate::error::ParseError;
use crate::lexer::{lex, Spanned, Token};

/// Parse a whole file into an arena tree.
pub fn parse(file_name: &str, src: &str) -> Result<SyntaxTree, ParseError> {
    let tokens = lex(src, file_name)?;
    let mut parser = Parser::new(&tokens, file_name);
    let mut statements = Vec::new();
    while !parser.at(&Token::Eof) {
        statements.push(parser.parse_statement()?);
    }
    let root = parser
        .builder
        .alloc(NodeKind::SourceFile, Span::new(0, src.len()), statements);
    Ok(parser.builder.finish(file_name, src, root))
}

const ASSIGNMENT_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

const PARAMETER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "readonly", "abstract", "override", "declare",
    "async", "accessor", "get", "set",
];

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    filename: String,
    builder: TreeBuilder,
    /// Inside a `for (...)` head, where `in` belongs to the loop.
    no_in: bool,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], filename: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.to_owned(),
            builder: TreeBuilder::new(),
            no_in: false,
        }
    }

    // ── Token cursor ─────────────────────────────────────────────────

    fn token_at(&self, index: usize) -> &Spanned {
        &self.tokens[index.min(self.tokens.len() - 1)]
    }

    fn cur(&self) -> &Spanned {
        self.token_at(self.pos)
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_at(&self, n: usize) -> &Token {
        &self.token_at(self.pos + n).token
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.err(format!("expected {}, got {:?}", what, self.peek())))
        }
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn is_word_at(&self, n: usize, w: &str) -> bool {
        matches!(self.peek_at(n), Token::Word(x) if x == w)
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.is_word(w) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Token::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.is_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', got {:?}", op, self.peek())))
        }
    }

    fn take_word(&mut self) -> Result<String, ParseError> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("expected identifier, got {:?}", self.peek())))
        }
    }

    fn eat_semi(&mut self) {
        self.eat(&Token::Semi);
    }

    fn start(&self) -> usize {
        self.cur().span.start
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        let cur = self.cur();
        ParseError::parse(&self.filename, cur.line, cur.span.start, msg)
    }

    /// Allocate a node spanning from `start` to the end of the last
    /// consumed token.
    fn node(&mut self, kind: NodeKind, start: usize, children: Vec<NodeId>) -> NodeId {
        let span = Span::new(start, self.prev_end().max(start));
        self.builder.alloc(kind, span, children)
    }

    fn allow_in<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    // ── Skipping type syntax ─────────────────────────────────────────

    /// Skip from an opening `(`, `[` or `{` through its matching closer.
    fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                Token::Eof => return Err(self.err("unbalanced brackets at end of input")),
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a `<...>` type argument or parameter list.
    fn skip_angle(&mut self) -> Result<(), ParseError> {
        let mut depth = 0i32;
        loop {
            match self.peek() {
                Token::Op("<") => depth += 1,
                Token::Op(">") => depth -= 1,
                Token::Op(">>") => depth -= 2,
                Token::Op(">>>") => depth -= 3,
                Token::LParen | Token::LBracket | Token::LBrace => {
                    self.skip_balanced()?;
                    continue;
                }
                Token::Eof => return Err(self.err("unterminated type arguments")),
                _ => {}
            }
            self.advance();
            if depth <= 0 {
                return Ok(());
            }
        }
    }

    /// Skip a type expression until `stop` holds at nesting depth zero.
    /// The first token is always consumed so the caller makes progress.
    fn skip_type(&mut self, stop: fn(&Self) -> bool) -> Result<(), ParseError> {
        let mut angle = 0i32;
        let mut first = true;
        loop {
            if self.at(&Token::Eof) {
                return Ok(());
            }
            if !first && angle <= 0 && stop(self) {
                return Ok(());
            }
            first = false;
            match self.peek() {
                Token::LParen | Token::LBracket | Token::LBrace => {
                    self.skip_balanced()?;
                    continue;
                }
                Token::RParen | Token::RBracket | Token::RBrace | Token::Semi => return Ok(()),
                Token::Op("<") => angle += 1,
                Token::Op(">") => angle -= 1,
                Token::Op(">>") => angle -= 2,
                Token::Op(">>>") => angle -= 3,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_decorator(&mut self) -> Result<(), ParseError> {
        self.advance(); // @
        self.take_word()?;
        while self.eat(&Token::Dot) {
            self.take_word()?;
        }
        if self.at(&Token::LParen) {
            self.skip_balanced()?;
        }
        Ok(())
    }

    /// Skip an ambient or type-level statement, ending at `;`, after a
    /// braced body, or at a line break that cannot continue a type.
    fn skip_opaque_statement(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.advance();
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Semi => {
                    self.advance();
                    break;
                }
                Token::LParen | Token::LBracket | Token::LBrace => {
                    let was_brace = self.at(&Token::LBrace);
                    self.skip_balanced()?;
                    if was_brace && (self.cur().newline_before || self.at(&Token::RBrace)) {
                        self.eat_semi();
                        break;
                    }
                }
                Token::RBrace => break,
                _ => {
                    if self.cur().newline_before && !continues_type(self) {
                        break;
                    }
                    self.advance();
                }
            }
        }
        Ok(self.node(NodeKind::OpaqueStatement, start, vec![]))
    }

    fn skip_import(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.advance(); // import
        loop {
            match self.peek() {
                Token::Str(_) => {
                    self.advance();
                    if self.at(&Token::RParen) {
                        self.advance();
                    }
                    break;
                }
                Token::LBrace => self.skip_balanced()?,
                Token::Semi | Token::Eof => break,
                _ => self.advance(),
            }
        }
        if (self.is_word("with") || self.is_word("assert")) && !self.cur().newline_before {
            self.advance();
            if self.at(&Token::LBrace) {
                self.skip_balanced()?;
            }
        }
        self.eat_semi();
        Ok(self.node(NodeKind::OpaqueStatement, start, vec![]))
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let word = match self.peek().clone() {
            Token::LBrace => return self.parse_block(),
            Token::Semi => {
                self.advance();
                return Ok(self.node(NodeKind::EmptyStatement, start, vec![]));
            }
            Token::Op("@") => {
                self.skip_decorator()?;
                return self.parse_statement();
            }
            Token::Word(w) => w,
            _ => return self.parse_expression_statement(),
        };

        match word.as_str() {
            "const" if self.is_word_at(1, "enum") => self.skip_opaque_statement(start),
            "const" | "let" | "var" if self.starts_declaration() => {
                let list = self.parse_declaration_list()?;
                self.eat_semi();
                Ok(self.node(NodeKind::VariableStatement, start, vec![list]))
            }
            "export" => self.parse_export(),
            "import" if !matches!(self.peek_at(1), Token::LParen | Token::Dot) => {
                self.skip_import(start)
            }
            "type" if self.type_alias_ahead() => self.skip_opaque_statement(start),
            "interface" | "enum" if matches!(self.peek_at(1), Token::Word(_)) => {
                self.skip_opaque_statement(start)
            }
            "declare" | "namespace" | "module"
                if matches!(self.peek_at(1), Token::Word(_) | Token::Str(_))
                    && !self.token_at(self.pos + 1).newline_before =>
            {
                self.skip_opaque_statement(start)
            }
            "function" => self.parse_function(start, false),
            "async"
                if self.is_word_at(1, "function")
                    && !self.token_at(self.pos + 1).newline_before =>
            {
                self.advance();
                self.parse_function(start, true)
            }
            "class" => self.parse_class(),
            "abstract" if self.is_word_at(1, "class") => {
                self.advance();
                self.parse_class()
            }
            "return" => self.parse_return(),
            "if" => self.parse_if(),
            "for" => self.parse_for(),
            "while" => {
                self.advance();
                let condition = self.parse_condition()?;
                let body = self.parse_statement()?;
                Ok(self.node(NodeKind::WhileStatement, start, vec![condition, body]))
            }
            "do" => {
                self.advance();
                let body = self.parse_statement()?;
                if !self.eat_word("while") {
                    return Err(self.err(format!("expected 'while', got {:?}", self.peek())));
                }
                let condition = self.parse_condition()?;
                self.eat_semi();
                Ok(self.node(NodeKind::DoStatement, start, vec![body, condition]))
            }
            "switch" => self.parse_switch(),
            "try" => self.parse_try(),
            "throw" => {
                self.advance();
                let value = self.parse_expression()?;
                self.eat_semi();
                Ok(self.node(NodeKind::ThrowStatement, start, vec![value]))
            }
            "break" | "continue" => {
                self.advance();
                if matches!(self.peek(), Token::Word(_)) && !self.cur().newline_before {
                    self.advance();
                }
                self.eat_semi();
                Ok(self.node(NodeKind::JumpStatement, start, vec![]))
            }
            _ if self.peek_at(1) == &Token::Colon => {
                self.advance();
                self.advance();
                let body = self.parse_statement()?;
                Ok(self.node(NodeKind::LabeledStatement, start, vec![body]))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn starts_declaration(&self) -> bool {
        if self.is_word("let") {
            matches!(
                self.peek_at(1),
                Token::Word(_) | Token::LBracket | Token::LBrace
            )
        } else {
            true
        }
    }

    fn type_alias_ahead(&self) -> bool {
        matches!(self.peek_at(1), Token::Word(_))
            && matches!(self.peek_at(2), Token::Op("=") | Token::Op("<"))
    }

    fn parse_expression_statement(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let expression = self.parse_expression()?;
        self.eat_semi();
        Ok(self.node(NodeKind::ExpressionStatement, start, vec![expression]))
    }

    fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(Token::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.at(&Token::RBrace) {
            if self.at(&Token::Eof) {
                return Err(self.err("expected '}', got end of input"));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        Ok(self.node(NodeKind::Block, start, statements))
    }

    fn parse_condition(&mut self) -> Result<NodeId, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let condition = self.allow_in(|p| p.parse_expression())?;
        self.expect(Token::RParen, "')'")?;
        Ok(condition)
    }

    fn parse_declaration_list(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let kind = match self.take_word()?.as_str() {
            "const" => DeclarationKind::Const,
            "let" => DeclarationKind::Let,
            _ => DeclarationKind::Var,
        };
        let mut declarations = vec![self.parse_declaration()?];
        while self.eat(&Token::Comma) {
            declarations.push(self.parse_declaration()?);
        }
        Ok(self.node(
            NodeKind::VariableDeclarationList { kind },
            start,
            declarations,
        ))
    }

    fn parse_declaration(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let name = self.parse_binding_target()?;
        self.eat_op("!");
        if self.eat(&Token::Colon) {
            self.skip_type(stop_declaration_type)?;
        }
        let initializer = if self.eat_op("=") {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        let mut children = vec![name];
        children.extend(initializer);
        Ok(self.node(
            NodeKind::VariableDeclaration { name, initializer },
            start,
            children,
        ))
    }

    fn parse_export(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // export
        let inner_start = self.start();
        let child = match self.peek().clone() {
            Token::Word(w) if w == "const" && self.is_word_at(1, "enum") => {
                self.skip_opaque_statement(inner_start)?
            }
            Token::Word(w) if matches!(w.as_str(), "const" | "let" | "var") => {
                let list = self.parse_declaration_list()?;
                self.eat_semi();
                list
            }
            Token::Word(w) if w == "default" => {
                self.advance();
                if self.is_word("function")
                    || self.is_word("class")
                    || self.is_word("abstract")
                    || (self.is_word("async") && self.is_word_at(1, "function"))
                {
                    self.parse_statement()?
                } else {
                    let value = self.parse_assignment()?;
                    self.eat_semi();
                    value
                }
            }
            Token::Word(w) if matches!(w.as_str(), "function" | "class" | "async" | "abstract") => {
                self.parse_statement()?
            }
            Token::Word(w) if w == "type" && self.at_word_then_brace() => {
                self.skip_export_list(inner_start)?
            }
            Token::Word(_) => self.skip_opaque_statement(inner_start)?,
            Token::LBrace | Token::Op("*") => self.skip_export_list(inner_start)?,
            Token::Op("=") => {
                self.advance();
                let value = self.parse_assignment()?;
                self.eat_semi();
                value
            }
            other => {
                return Err(self.err(format!("unexpected {:?} after 'export'", other)));
            }
        };
        Ok(self.node(NodeKind::ExportDeclaration, start, vec![child]))
    }

    fn at_word_then_brace(&self) -> bool {
        self.peek_at(1) == &Token::LBrace
    }

    /// `export { a, b as c } from "x";`, `export * as ns from "x";`
    fn skip_export_list(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.eat_word("type");
        if self.at(&Token::LBrace) {
            self.skip_balanced()?;
        } else {
            self.advance(); // *
            if self.eat_word("as") {
                self.take_word()?;
            }
        }
        if self.eat_word("from") {
            match self.peek() {
                Token::Str(_) => self.advance(),
                other => return Err(self.err(format!("expected module path, got {:?}", other))),
            }
        }
        self.eat_semi();
        Ok(self.node(NodeKind::OpaqueStatement, start, vec![]))
    }

    fn parse_function(&mut self, start: usize, is_async: bool) -> Result<NodeId, ParseError> {
        self.advance(); // function
        self.eat_op("*");
        let name = match self.peek().clone() {
            Token::Word(w) => {
                self.advance();
                Some(w)
            }
            _ => None,
        };
        self.finish_function(start, name, is_async)
    }

    /// Generic parameters, parameter list, return type and body.
    fn finish_function(
        &mut self,
        start: usize,
        name: Option<String>,
        is_async: bool,
    ) -> Result<NodeId, ParseError> {
        if self.is_op("<") {
            self.skip_angle()?;
        }
        let mut children = self.parse_parameters()?;
        if self.eat(&Token::Colon) {
            self.skip_type(stop_return_type)?;
        }
        let body = if self.at(&Token::LBrace) {
            Some(self.parse_block()?)
        } else {
            self.eat_semi();
            None
        };
        children.extend(body);
        Ok(self.node(
            NodeKind::Function {
                name,
                is_async,
                body,
            },
            start,
            children,
        ))
    }

    fn parse_parameters(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut parameters = Vec::new();
        while !self.at(&Token::RParen) {
            let start = self.start();
            while self.is_op("@") {
                self.skip_decorator()?;
            }
            while matches!(self.peek(), Token::Word(w) if PARAMETER_MODIFIERS.contains(&w.as_str()))
                && matches!(
                    self.peek_at(1),
                    Token::Word(_) | Token::LBracket | Token::LBrace
                )
            {
                self.advance();
            }
            self.eat_op("...");
            let name = self.parse_binding_target()?;
            self.eat_op("?");
            if self.eat(&Token::Colon) {
                self.skip_type(stop_parameter_type)?;
            }
            let mut children = vec![name];
            if self.eat_op("=") {
                children.push(self.allow_in(|p| p.parse_assignment())?);
            }
            parameters.push(self.node(NodeKind::Parameter, start, children));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(parameters)
    }

    fn parse_class(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // class
        let name = match self.peek().clone() {
            Token::Word(w) if w != "extends" && w != "implements" => {
                self.advance();
                Some(w)
            }
            _ => None,
        };
        if self.is_op("<") {
            self.skip_angle()?;
        }
        let mut children = Vec::new();
        if self.eat_word("extends") {
            children.push(self.parse_call_member()?);
            if self.is_op("<") {
                self.skip_angle()?;
            }
        }
        if self.eat_word("implements") {
            while !self.at(&Token::LBrace) && !self.at(&Token::Eof) {
                if self.is_op("<") {
                    self.skip_angle()?;
                } else {
                    self.advance();
                }
            }
        }
        self.expect(Token::LBrace, "'{'")?;
        while !self.at(&Token::RBrace) {
            if self.at(&Token::Eof) {
                return Err(self.err("expected '}' to close class body"));
            }
            if self.eat(&Token::Semi) {
                continue;
            }
            children.push(self.parse_class_member()?);
        }
        self.advance();
        Ok(self.node(NodeKind::ClassDeclaration { name }, start, children))
    }

    fn parse_class_member(&mut self) -> Result<NodeId, ParseError> {
        while self.is_op("@") {
            self.skip_decorator()?;
        }
        let start = self.start();
        if self.is_word("static") && self.peek_at(1) == &Token::LBrace {
            self.advance();
            return self.parse_block();
        }
        let mut is_async = false;
        while matches!(self.peek(), Token::Word(w) if MEMBER_MODIFIERS.contains(&w.as_str()))
            && matches!(
                self.peek_at(1),
                Token::Word(_) | Token::Str(_) | Token::Num(_) | Token::LBracket | Token::Op("#")
                    | Token::Op("*")
            )
        {
            if self.is_word("async") {
                is_async = true;
            }
            self.advance();
        }
        self.eat_op("*");
        let name = self.parse_member_name()?;
        self.eat_op("?");
        self.eat_op("!");
        if self.is_op("<") || self.at(&Token::LParen) {
            return self.finish_function(start, name, is_async);
        }
        if self.eat(&Token::Colon) {
            self.skip_type(stop_property_type)?;
        }
        let mut children = Vec::new();
        if self.eat_op("=") {
            children.push(self.parse_assignment()?);
        }
        self.eat_semi();
        Ok(self.node(NodeKind::PropertyDeclaration, start, children))
    }

    fn parse_member_name(&mut self) -> Result<Option<String>, ParseError> {
        match self.peek().clone() {
            Token::LBracket => {
                self.skip_balanced()?;
                Ok(None)
            }
            Token::Op("#") => {
                self.advance();
                Ok(Some(format!("#{}", self.take_word()?)))
            }
            Token::Word(w) | Token::Str(w) | Token::Num(w) => {
                self.advance();
                Ok(Some(w))
            }
            other => Err(self.err(format!("expected member name, got {:?}", other))),
        }
    }

    fn parse_return(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // return
        let expression = if matches!(self.peek(), Token::Semi | Token::RBrace | Token::Eof)
            || self.cur().newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.eat_semi();
        let children = expression.into_iter().collect();
        Ok(self.node(NodeKind::ReturnStatement { expression }, start, children))
    }

    fn parse_if(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // if
        let condition = self.parse_condition()?;
        let mut children = vec![condition, self.parse_statement()?];
        if self.eat_word("else") {
            children.push(self.parse_statement()?);
        }
        Ok(self.node(NodeKind::IfStatement, start, children))
    }

    fn parse_for(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // for
        let is_await = self.eat_word("await");
        self.expect(Token::LParen, "'('")?;

        self.no_in = true;
        let head = if self.at(&Token::Semi) {
            Ok(None)
        } else if (self.is_word("const") || self.is_word("let") || self.is_word("var"))
            && self.starts_declaration()
        {
            self.parse_declaration_list().map(Some)
        } else {
            self.parse_expression().map(Some)
        };
        self.no_in = false;
        let head = head?;

        if self.eat_word("of") {
            let head = head.ok_or_else(|| self.err("missing for..of binding"))?;
            let iterable = self.allow_in(|p| p.parse_assignment())?;
            self.expect(Token::RParen, "')'")?;
            let body = self.parse_statement()?;
            return Ok(self.node(
                NodeKind::ForOfStatement { is_await },
                start,
                vec![head, iterable, body],
            ));
        }
        if self.eat_word("in") {
            let head = head.ok_or_else(|| self.err("missing for..in binding"))?;
            let object = self.allow_in(|p| p.parse_expression())?;
            self.expect(Token::RParen, "')'")?;
            let body = self.parse_statement()?;
            return Ok(self.node(NodeKind::ForInStatement, start, vec![head, object, body]));
        }

        self.expect(Token::Semi, "';'")?;
        let mut children: Vec<NodeId> = head.into_iter().collect();
        if !self.at(&Token::Semi) {
            children.push(self.allow_in(|p| p.parse_expression())?);
        }
        self.expect(Token::Semi, "';'")?;
        if !self.at(&Token::RParen) {
            children.push(self.allow_in(|p| p.parse_expression())?);
        }
        self.expect(Token::RParen, "')'")?;
        children.push(self.parse_statement()?);
        Ok(self.node(NodeKind::ForStatement, start, children))
    }

    fn parse_switch(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // switch
        let mut children = vec![self.parse_condition()?];
        self.expect(Token::LBrace, "'{'")?;
        while !self.at(&Token::RBrace) {
            let clause_start = self.start();
            let mut clause = Vec::new();
            if self.eat_word("case") {
                clause.push(self.parse_expression()?);
            } else if !self.eat_word("default") {
                return Err(self.err(format!("expected 'case' or 'default', got {:?}", self.peek())));
            }
            self.expect(Token::Colon, "':'")?;
            while !self.is_word("case") && !self.is_word("default") && !self.at(&Token::RBrace) {
                if self.at(&Token::Eof) {
                    return Err(self.err("expected '}' to close switch"));
                }
                clause.push(self.parse_statement()?);
            }
            children.push(self.node(NodeKind::CaseClause, clause_start, clause));
        }
        self.advance();
        Ok(self.node(NodeKind::SwitchStatement, start, children))
    }

    fn parse_try(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // try
        let mut children = vec![self.parse_block()?];
        if self.is_word("catch") {
            let catch_start = self.start();
            self.advance();
            let mut clause = Vec::new();
            if self.eat(&Token::LParen) {
                clause.push(self.parse_binding_target()?);
                if self.eat(&Token::Colon) {
                    self.skip_type(stop_parameter_type)?;
                }
                self.expect(Token::RParen, "')'")?;
            }
            clause.push(self.parse_block()?);
            children.push(self.node(NodeKind::CatchClause, catch_start, clause));
        }
        if self.eat_word("finally") {
            children.push(self.parse_block()?);
        }
        Ok(self.node(NodeKind::TryStatement, start, children))
    }

    // ── Binding patterns ─────────────────────────────────────────────

    fn parse_binding_target(&mut self) -> Result<NodeId, ParseError> {
        match self.peek() {
            Token::LBracket => self.parse_array_binding(),
            Token::LBrace => self.parse_object_binding(),
            Token::Word(_) => self.parse_identifier(),
            other => Err(self.err(format!("expected binding name, got {:?}", other))),
        }
    }

    fn parse_identifier(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let text = self.take_word()?;
        Ok(self.node(NodeKind::Identifier { text }, start, vec![]))
    }

    fn parse_array_binding(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(Token::LBracket, "'['")?;
        let mut elements = Vec::new();
        loop {
            if self.at(&Token::RBracket) {
                break;
            }
            if self.at(&Token::Comma) {
                let at = self.start();
                elements.push(self.builder.alloc(
                    NodeKind::OmittedExpression,
                    Span::new(at, at),
                    vec![],
                ));
                self.advance();
                continue;
            }
            elements.push(self.parse_binding_element()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBracket, "']'")?;
        Ok(self.node(
            NodeKind::ArrayBindingPattern {
                elements: elements.clone(),
            },
            start,
            elements,
        ))
    }

    fn parse_binding_element(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let rest = self.eat_op("...");
        let name = self.parse_binding_target()?;
        let mut children = vec![name];
        if self.eat_op("=") {
            children.push(self.allow_in(|p| p.parse_assignment())?);
        }
        Ok(self.node(NodeKind::BindingElement { rest, name }, start, children))
    }

    fn parse_object_binding(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect(Token::LBrace, "'{'")?;
        let mut elements = Vec::new();
        while !self.at(&Token::RBrace) {
            let element_start = self.start();
            let rest = self.eat_op("...");
            let name = if rest {
                self.parse_binding_target()?
            } else if self.at(&Token::LBracket) {
                self.skip_balanced()?;
                self.expect(Token::Colon, "':'")?;
                self.parse_binding_target()?
            } else if self.peek_at(1) == &Token::Colon {
                match self.peek() {
                    Token::Word(_) | Token::Str(_) | Token::Num(_) => self.advance(),
                    other => return Err(self.err(format!("expected property name, got {:?}", other))),
                }
                self.advance(); // :
                self.parse_binding_target()?
            } else {
                self.parse_identifier()?
            };
            let mut children = vec![name];
            if self.eat_op("=") {
                children.push(self.allow_in(|p| p.parse_assignment())?);
            }
            elements.push(self.node(
                NodeKind::BindingElement { rest, name },
                element_start,
                children,
            ));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "'}'")?;
        Ok(self.node(
            NodeKind::ObjectBindingPattern {
                elements: elements.clone(),
            },
            start,
            elements,
        ))
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn parse_expression(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let first = self.parse_assignment()?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            items.push(self.parse_assignment()?);
        }
        Ok(self.node(
            NodeKind::Binary {
                operator: ",".into(),
            },
            start,
            items,
        ))
    }

    fn parse_assignment(&mut self) -> Result<NodeId, ParseError> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        let start = self.start();
        if self.is_word("yield") {
            self.advance();
            self.eat_op("*");
            let mut children = Vec::new();
            if !self.cur().newline_before && starts_expression(self.peek()) {
                children.push(self.parse_assignment()?);
            }
            return Ok(self.node(
                NodeKind::PrefixUnary {
                    operator: "yield".into(),
                },
                start,
                children,
            ));
        }
        let target = self.parse_conditional()?;
        if let Token::Op(op) = self.peek() {
            if ASSIGNMENT_OPS.contains(op) {
                let operator = op.to_string();
                self.advance();
                let value = self.parse_assignment()?;
                return Ok(self.node(NodeKind::Binary { operator }, start, vec![target, value]));
            }
        }
        Ok(target)
    }

    /// True when the tokens at `index` begin an arrow function head:
    /// `x =>`, `(...) =>` or `(...): T =>`.
    fn arrow_ahead(&self, index: usize) -> bool {
        match &self.token_at(index).token {
            Token::Word(_) => self.token_at(index + 1).token == Token::Op("=>"),
            Token::Op("<") => match self.angle_end(index) {
                Some(end) => {
                    self.token_at(end + 1).token == Token::LParen && self.arrow_ahead(end + 1)
                }
                None => false,
            },
            Token::LParen => {
                let mut depth = 0usize;
                let mut i = index;
                loop {
                    match &self.token_at(i).token {
                        Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                        Token::RParen | Token::RBracket | Token::RBrace => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        Token::Eof => return false,
                        _ => {}
                    }
                    i += 1;
                }
                match &self.token_at(i + 1).token {
                    Token::Op("=>") => true,
                    Token::Colon => self.return_type_then_arrow(i + 2),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Index of the `>` closing the type parameter list opened at `index`.
    fn angle_end(&self, index: usize) -> Option<usize> {
        let mut depth = 0i32;
        let mut i = index;
        loop {
            match &self.token_at(i).token {
                Token::Op("<") => depth += 1,
                Token::Op(">") => depth -= 1,
                Token::Op(">>") => depth -= 2,
                Token::Semi | Token::Eof => return None,
                _ => {}
            }
            if depth <= 0 {
                return Some(i);
            }
            i += 1;
        }
    }

    fn return_type_then_arrow(&self, mut i: usize) -> bool {
        let mut depth = 0i32;
        loop {
            match &self.token_at(i).token {
                Token::Op("=>") if depth == 0 => return true,
                Token::LParen | Token::LBracket | Token::LBrace | Token::Op("<") => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace | Token::Op(">") => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                Token::Op(">>") => depth -= 2,
                Token::Semi | Token::Comma | Token::Op("=") | Token::Eof if depth == 0 => {
                    return false
                }
                Token::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn try_parse_arrow(&mut self) -> Result<Option<NodeId>, ParseError> {
        let start = self.start();
        let is_async = self.is_word("async")
            && !self.token_at(self.pos + 1).newline_before
            && self.arrow_ahead(self.pos + 1);
        if !is_async && !self.arrow_ahead(self.pos) {
            return Ok(None);
        }
        if is_async {
            self.advance();
        }
        if self.is_op("<") {
            self.skip_angle()?;
        }
        let mut children = if matches!(self.peek(), Token::Word(_)) {
            let param_start = self.start();
            let name = self.parse_identifier()?;
            vec![self.node(NodeKind::Parameter, param_start, vec![name])]
        } else {
            self.parse_parameters()?
        };
        if self.eat(&Token::Colon) {
            self.skip_type(stop_arrow_return_type)?;
        }
        self.expect_op("=>")?;
        let body = if self.at(&Token::LBrace) {
            self.parse_block()?
        } else {
            self.allow_in(|p| p.parse_assignment())?
        };
        children.push(body);
        Ok(Some(self.node(
            NodeKind::ArrowFunction { is_async, body },
            start,
            children,
        )))
    }

    fn parse_conditional(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let test = self.parse_binary(0)?;
        if !self.eat_op("?") {
            return Ok(test);
        }
        let consequent = self.allow_in(|p| p.parse_assignment())?;
        self.expect(Token::Colon, "':'")?;
        let alternate = self.parse_assignment()?;
        Ok(self.node(
            NodeKind::Conditional,
            start,
            vec![test, consequent, alternate],
        ))
    }

    fn binary_precedence(&self) -> Option<(u8, String)> {
        let prec = match self.peek() {
            Token::Op(op) => match *op {
                "??" => 1,
                "||" => 2,
                "&&" => 3,
                "|" => 4,
                "^" => 5,
                "&" => 6,
                "==" | "!=" | "===" | "!==" => 7,
                "<" | ">" | "<=" | ">=" => 8,
                "<<" | ">>" | ">>>" => 9,
                "+" | "-" => 10,
                "*" | "/" | "%" => 11,
                "**" => 12,
                _ => return None,
            },
            Token::Word(w) if w == "instanceof" => 8,
            Token::Word(w) if w == "in" && !self.no_in => 8,
            Token::Word(w) if (w == "as" || w == "satisfies") && !self.cur().newline_before => 8,
            _ => return None,
        };
        let text = match self.peek() {
            Token::Op(op) => op.to_string(),
            Token::Word(w) => w.clone(),
            _ => return None,
        };
        Some((prec, text))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut left = self.parse_unary()?;
        while let Some((prec, operator)) = self.binary_precedence() {
            if prec < min_prec {
                break;
            }
            self.advance();
            if operator == "as" || operator == "satisfies" {
                self.skip_type(stop_assertion_type)?;
                left = self.node(NodeKind::TypeAssertion { expression: left }, start, vec![left]);
                continue;
            }
            let right = self.parse_binary(prec + 1)?;
            left = self.node(NodeKind::Binary { operator }, start, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        match self.peek().clone() {
            Token::Op(op) if matches!(op, "!" | "-" | "+" | "~" | "++" | "--") => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(self.node(
                    NodeKind::PrefixUnary {
                        operator: op.to_string(),
                    },
                    start,
                    vec![operand],
                ))
            }
            Token::Op("<") => {
                self.skip_angle()?;
                let expression = self.parse_unary()?;
                Ok(self.node(NodeKind::TypeAssertion { expression }, start, vec![expression]))
            }
            Token::Word(w) if matches!(w.as_str(), "typeof" | "void" | "delete") => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(self.node(NodeKind::PrefixUnary { operator: w }, start, vec![operand]))
            }
            Token::Word(w) if w == "await" && starts_expression(self.peek_at(1)) => {
                self.advance();
                let expression = self.parse_unary()?;
                Ok(self.node(NodeKind::AwaitExpression { expression }, start, vec![expression]))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let operand = self.parse_call_member()?;
        if (self.is_op("++") || self.is_op("--")) && !self.cur().newline_before {
            let operator = if self.is_op("++") { "++" } else { "--" };
            self.advance();
            return Ok(self.node(
                NodeKind::PostfixUnary {
                    operator: operator.into(),
                },
                start,
                vec![operand],
            ));
        }
        Ok(operand)
    }

    fn parse_call_member(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut expr = if self.is_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            match self.peek().clone() {
                Token::Dot => {
                    self.advance();
                    let name = self.take_property_name()?;
                    expr = self.node(NodeKind::PropertyAccess { object: expr, name }, start, vec![expr]);
                }
                Token::Op("?.") => {
                    self.advance();
                    match self.peek() {
                        Token::LParen => expr = self.finish_call(start, expr)?,
                        Token::LBracket => expr = self.finish_element_access(start, expr)?,
                        _ => {
                            let name = self.take_property_name()?;
                            expr = self.node(
                                NodeKind::PropertyAccess { object: expr, name },
                                start,
                                vec![expr],
                            );
                        }
                    }
                }
                Token::LBracket => expr = self.finish_element_access(start, expr)?,
                Token::LParen => expr = self.finish_call(start, expr)?,
                Token::Op("!") if !self.cur().newline_before => {
                    self.advance();
                    expr = self.node(NodeKind::TypeAssertion { expression: expr }, start, vec![expr]);
                }
                Token::Op("<") if self.generic_call_ahead() => {
                    self.skip_angle()?;
                }
                Token::Template(_) => {
                    self.advance();
                    expr = self.node(
                        NodeKind::CallExpression {
                            callee: expr,
                            arguments: Vec::new(),
                        },
                        start,
                        vec![expr],
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn take_property_name(&mut self) -> Result<String, ParseError> {
        if self.eat_op("#") {
            return Ok(format!("#{}", self.take_word()?));
        }
        self.take_word()
    }

    fn finish_call(&mut self, start: usize, callee: NodeId) -> Result<NodeId, ParseError> {
        let arguments = self.parse_arguments()?;
        let mut children = vec![callee];
        children.extend(arguments.iter().copied());
        Ok(self.node(
            NodeKind::CallExpression { callee, arguments },
            start,
            children,
        ))
    }

    fn finish_element_access(&mut self, start: usize, object: NodeId) -> Result<NodeId, ParseError> {
        self.advance(); // [
        let index = self.allow_in(|p| p.parse_expression())?;
        self.expect(Token::RBracket, "']'")?;
        Ok(self.node(NodeKind::ElementAccess, start, vec![object, index]))
    }

    fn parse_arguments(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let arguments = self.allow_in(|p| {
            let mut arguments = Vec::new();
            while !p.at(&Token::RParen) {
                let start = p.start();
                if p.eat_op("...") {
                    let inner = p.parse_assignment()?;
                    arguments.push(p.node(NodeKind::SpreadElement, start, vec![inner]));
                } else {
                    arguments.push(p.parse_assignment()?);
                }
                if !p.eat(&Token::Comma) {
                    break;
                }
            }
            Ok(arguments)
        })?;
        self.expect(Token::RParen, "')'")?;
        Ok(arguments)
    }

    /// `f<T>(...)`: a `<` whose balanced `>` is directly followed by `(`.
    fn generic_call_ahead(&self) -> bool {
        let mut depth = 0i32;
        let mut i = self.pos;
        loop {
            match &self.token_at(i).token {
                Token::Op("<") => depth += 1,
                Token::Op(">") => depth -= 1,
                Token::Op(">>") => depth -= 2,
                Token::Word(_)
                | Token::Dot
                | Token::Comma
                | Token::Str(_)
                | Token::Num(_)
                | Token::LBracket
                | Token::RBracket
                | Token::LBrace
                | Token::RBrace
                | Token::LParen
                | Token::RParen
                | Token::Colon
                | Token::Semi
                | Token::Op("|")
                | Token::Op("&")
                | Token::Op("?")
                | Token::Op("=>") => {}
                _ => return false,
            }
            if depth <= 0 {
                return matches!(
                    self.token_at(i + 1).token,
                    Token::LParen | Token::Template(_)
                );
            }
            i += 1;
        }
    }

    fn parse_new(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // new
        if self.eat(&Token::Dot) {
            self.take_word()?;
            return Ok(self.node(NodeKind::Literal, start, vec![]));
        }
        let callee_start = self.start();
        let mut callee = if self.is_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        while self.eat(&Token::Dot) {
            let name = self.take_property_name()?;
            callee = self.node(
                NodeKind::PropertyAccess {
                    object: callee,
                    name,
                },
                callee_start,
                vec![callee],
            );
        }
        if self.is_op("<") {
            self.skip_angle()?;
        }
        let mut children = vec![callee];
        if self.at(&Token::LParen) {
            children.extend(self.parse_arguments()?);
        }
        Ok(self.node(NodeKind::NewExpression, start, children))
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        match self.peek().clone() {
            Token::Word(w) => match w.as_str() {
                "function" => self.parse_function(start, false),
                "async" if self.is_word_at(1, "function") => {
                    self.advance();
                    self.parse_function(start, true)
                }
                "class" => self.parse_class(),
                "true" | "false" | "null" | "this" | "super" => {
                    self.advance();
                    Ok(self.node(NodeKind::Literal, start, vec![]))
                }
                _ => self.parse_identifier(),
            },
            Token::Num(_) | Token::Str(_) | Token::Template(_) | Token::Regex(_) => {
                self.advance();
                Ok(self.node(NodeKind::Literal, start, vec![]))
            }
            Token::LParen => {
                self.advance();
                let expression = self.allow_in(|p| p.parse_expression())?;
                self.expect(Token::RParen, "')'")?;
                Ok(self.node(
                    NodeKind::Parenthesized { expression },
                    start,
                    vec![expression],
                ))
            }
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            other => Err(self.err(format!("unexpected token {:?}", other))),
        }
    }

    fn parse_array_literal(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // [
        let elements = self.allow_in(|p| {
            let mut elements = Vec::new();
            loop {
                if p.at(&Token::RBracket) {
                    break;
                }
                if p.at(&Token::Comma) {
                    let at = p.start();
                    elements.push(p.builder.alloc(
                        NodeKind::OmittedExpression,
                        Span::new(at, at),
                        vec![],
                    ));
                    p.advance();
                    continue;
                }
                let element_start = p.start();
                if p.eat_op("...") {
                    let inner = p.parse_assignment()?;
                    elements.push(p.node(NodeKind::SpreadElement, element_start, vec![inner]));
                } else {
                    elements.push(p.parse_assignment()?);
                }
                if !p.eat(&Token::Comma) {
                    break;
                }
            }
            Ok(elements)
        })?;
        self.expect(Token::RBracket, "']'")?;
        Ok(self.node(NodeKind::ArrayLiteral, start, elements))
    }

    fn parse_object_literal(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // {
        let properties = self.allow_in(|p| {
            let mut properties = Vec::new();
            while !p.at(&Token::RBrace) {
                properties.push(p.parse_object_member()?);
                if !p.eat(&Token::Comma) {
                    break;
                }
            }
            Ok(properties)
        })?;
        self.expect(Token::RBrace, "'}'")?;
        Ok(self.node(NodeKind::ObjectLiteral, start, properties))
    }

    fn parse_object_member(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        if self.eat_op("...") {
            let inner = self.parse_assignment()?;
            return Ok(self.node(NodeKind::SpreadElement, start, vec![inner]));
        }
        let mut is_async = false;
        while matches!(self.peek(), Token::Word(w) if matches!(w.as_str(), "async" | "get" | "set"))
            && matches!(
                self.peek_at(1),
                Token::Word(_) | Token::Str(_) | Token::Num(_) | Token::LBracket | Token::Op("*")
            )
        {
            if self.is_word("async") {
                is_async = true;
            }
            self.advance();
        }
        self.eat_op("*");

        let mut children = Vec::new();
        let key = match self.peek().clone() {
            Token::LBracket => {
                self.advance();
                children.push(self.parse_assignment()?);
                self.expect(Token::RBracket, "']'")?;
                None
            }
            Token::Word(w) | Token::Str(w) | Token::Num(w) => {
                self.advance();
                Some(w)
            }
            other => return Err(self.err(format!("expected property name, got {:?}", other))),
        };

        if self.at(&Token::LParen) || self.is_op("<") {
            return self.finish_function(start, key, is_async);
        }
        if self.eat(&Token::Colon) {
            children.push(self.parse_assignment()?);
            return Ok(self.node(NodeKind::PropertyAssignment, start, children));
        }
        // Shorthand `{ a }`, or `{ a = 1 }` in a destructuring assignment.
        let text = key.ok_or_else(|| self.err("computed property needs a value"))?;
        let shorthand = self.node(NodeKind::Identifier { text }, start, vec![]);
        children.push(shorthand);
        if self.eat_op("=") {
            children.push(self.parse_assignment()?);
        }
        Ok(self.node(NodeKind::PropertyAssignment, start, children))
    }
}

fn starts_expression(token: &Token) -> bool {
    !matches!(
        token,
        Token::RParen
            | Token::RBracket
            | Token::RBrace
            | Token::Comma
            | Token::Semi
            | Token::Colon
            | Token::Dot
            | Token::Eof
    ) && !matches!(token, Token::Op(op) if !matches!(*op, "!" | "-" | "+" | "~" | "++" | "--" | "<" | "..."))
}

/// A token on a new line that still belongs to the current type.
fn continues_type(p: &Parser<'_>) -> bool {
    let prev = if p.pos == 0 {
        None
    } else {
        Some(&p.tokens[p.pos - 1].token)
    };
    matches!(p.peek(), Token::Op("|") | Token::Op("&") | Token::Op("=>"))
        || matches!(
            prev,
            Some(Token::Op("|"))
                | Some(Token::Op("&"))
                | Some(Token::Op("="))
                | Some(Token::Op("=>"))
                | Some(Token::Op("<"))
                | Some(Token::Colon)
                | Some(Token::Comma)
                | Some(Token::Op("?"))
        )
}

fn stop_declaration_type(p: &Parser<'_>) -> bool {
    matches!(p.peek(), Token::Op("=") | Token::Comma)
        || p.is_word("of")
        || p.is_word("in")
        || (p.cur().newline_before && !continues_type(p))
}

fn stop_parameter_type(p: &Parser<'_>) -> bool {
    matches!(p.peek(), Token::Op("=") | Token::Comma)
}

fn stop_return_type(p: &Parser<'_>) -> bool {
    matches!(p.peek(), Token::LBrace) || (p.cur().newline_before && !continues_type(p))
}

fn stop_arrow_return_type(p: &Parser<'_>) -> bool {
    matches!(p.peek(), Token::Op("=>"))
}

fn stop_property_type(p: &Parser<'_>) -> bool {
    matches!(p.peek(), Token::Op("="))
        || (p.cur().newline_before && !continues_type(p))
}

fn stop_assertion_type(p: &Parser<'_>) -> bool {
    if p.cur().newline_before && !continues_type(p) {
        return true;
    }
    !matches!(
        p.peek(),
        Token::Word(_)
            | Token::Dot
            | Token::Str(_)
            | Token::Num(_)
            | Token::LBracket
            | Token::Op("|")
            | Token::Op("&")
            | Token::Op("<")
            | Token::Op(">")
            | Token::Op(">>")
    ) || p.is_word("in")
        || p.is_word("of")
        || p.is_word("instanceof")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> SyntaxTree {
        parse("test.ts", src).unwrap_or_else(|e| panic!("parse failed: {}", e))
    }

    /// Every declaration in the file with its binding-pattern text.
    fn declarations(tree: &SyntaxTree) -> Vec<String> {
        tree.descendants(tree.root())
            .filter_map(|id| match tree.kind(id) {
                NodeKind::VariableDeclaration { name, .. } => Some(tree.text_of(*name).to_string()),
                _ => None,
            })
            .collect()
    }

    fn first_declaration(tree: &SyntaxTree) -> NodeId {
        tree.descendants(tree.root())
            .find(|&id| matches!(tree.kind(id), NodeKind::VariableDeclaration { .. }))
            .expect("a declaration")
    }

    #[test]
    fn parses_array_pattern_with_omitted_slot() {
        let tree = parse_ok("const [user, ,] = tryCatch(parse(json));");
        let decl = first_declaration(&tree);
        let NodeKind::VariableDeclaration { name, initializer } = tree.kind(decl).clone() else {
            unreachable!()
        };
        assert_eq!(tree.text_of(name), "[user, ,]");
        let NodeKind::ArrayBindingPattern { elements } = tree.kind(name) else {
            panic!("expected array pattern");
        };
        assert_eq!(elements.len(), 2);
        assert!(matches!(tree.kind(elements[1]), NodeKind::OmittedExpression));
        let init = initializer.unwrap();
        assert_eq!(tree.text_of(init), "tryCatch(parse(json))");
        let NodeKind::CallExpression { callee, arguments } = tree.kind(init) else {
            panic!("expected call");
        };
        assert_eq!(tree.callee_path(*callee).as_deref(), Some("tryCatch"));
        assert_eq!(arguments.len(), 1);
    }

    #[test]
    fn trailing_comma_does_not_add_an_element() {
        let tree = parse_ok("const [a,] = f(); const [, b] = f(); const [c, d,] = f();");
        let lens: Vec<usize> = tree
            .descendants(tree.root())
            .filter_map(|id| match tree.kind(id) {
                NodeKind::ArrayBindingPattern { elements } => Some(elements.len()),
                _ => None,
            })
            .collect();
        assert_eq!(lens, vec![1, 2, 2]);
    }

    #[test]
    fn declaration_span_starts_at_binding_name() {
        let src = "  const   [a, b]: [number, Error] = f();";
        let tree = parse_ok(src);
        let decl = first_declaration(&tree);
        assert_eq!(tree.text_of(decl), "[a, b]: [number, Error] = f()");
        assert_eq!(declarations(&tree), vec!["[a, b]"]);
    }

    #[test]
    fn multiple_declarators_share_one_list() {
        let tree = parse_ok("const foo = \"bar\",\n  [result] = tryCatch(() => null);");
        assert_eq!(declarations(&tree), vec!["foo", "[result]"]);
        let stmt = tree.children(tree.root())[0];
        assert!(matches!(tree.kind(stmt), NodeKind::VariableStatement));
    }

    #[test]
    fn loop_heads_hold_declaration_lists() {
        let tree = parse_ok(
            "for (let i = 0; i < n; i++) {}\n\
             for (const [k, v] of entries) {}\n\
             for await (const x of stream) {}\n\
             for (const key in obj) {}",
        );
        let parents: Vec<&NodeKind> = tree
            .descendants(tree.root())
            .filter(|&id| matches!(tree.kind(id), NodeKind::VariableDeclarationList { .. }))
            .map(|id| tree.kind(tree.parent(id).unwrap()))
            .collect();
        assert!(matches!(parents[0], NodeKind::ForStatement));
        assert!(matches!(parents[1], NodeKind::ForOfStatement { is_await: false }));
        assert!(matches!(parents[2], NodeKind::ForOfStatement { is_await: true }));
        assert!(matches!(parents[3], NodeKind::ForInStatement));
    }

    #[test]
    fn exported_declaration_list_hangs_off_export() {
        let tree = parse_ok("export const [a] = tryCatch(x);");
        let list = tree
            .descendants(tree.root())
            .find(|&id| matches!(tree.kind(id), NodeKind::VariableDeclarationList { .. }))
            .unwrap();
        assert!(matches!(
            tree.kind(tree.parent(list).unwrap()),
            NodeKind::ExportDeclaration
        ));
    }

    #[test]
    fn await_of_call_and_arrow_functions() {
        let tree = parse_ok(
            "const wrapped = async () => tryCatch(fetchMe);\n\
             const [me] = await wrapped();",
        );
        let decls: Vec<NodeId> = tree
            .descendants(tree.root())
            .filter(|&id| matches!(tree.kind(id), NodeKind::VariableDeclaration { .. }))
            .collect();
        let NodeKind::VariableDeclaration { initializer, .. } = tree.kind(decls[0]) else {
            unreachable!()
        };
        assert!(matches!(
            tree.kind(initializer.unwrap()),
            NodeKind::ArrowFunction { is_async: true, .. }
        ));
        let NodeKind::VariableDeclaration { initializer, .. } = tree.kind(decls[1]) else {
            unreachable!()
        };
        let NodeKind::AwaitExpression { expression } = tree.kind(initializer.unwrap()) else {
            panic!("expected await");
        };
        assert!(matches!(tree.kind(*expression), NodeKind::CallExpression { .. }));
    }

    #[test]
    fn skips_type_level_syntax() {
        let src = r#"
import { tryCatch } from "@scope/try-catch";
import type { User } from "./user";
type Result<T> = [T, null] | [null, Error];
interface Props {
  id: number;
}
declare const env: { mode: string };
async function fetchUser(id: number): Promise<Result<User>> {
  const [user, error] = await tryCatch<User>(api.get(`/users/${id}`));
  return user as unknown as Result<User>;
}
const xs = <T,>(x: T): T[] => [x];
"#;
        let tree = parse_ok(src);
        assert_eq!(declarations(&tree), vec!["[user, error]", "xs"]);
        let funcs: Vec<(Option<String>, bool)> = tree
            .descendants(tree.root())
            .filter_map(|id| match tree.kind(id) {
                NodeKind::Function { name, is_async, .. } => Some((name.clone(), *is_async)),
                _ => None,
            })
            .collect();
        assert_eq!(funcs, vec![(Some("fetchUser".to_string()), true)]);
        let opaque = tree
            .children(tree.root())
            .iter()
            .filter(|&&id| matches!(tree.kind(id), NodeKind::OpaqueStatement))
            .count();
        assert_eq!(opaque, 5);
    }

    #[test]
    fn class_members_and_control_flow_are_walked() {
        let src = r#"
class Repo extends Base {
  private cache = new Map<string, User>();
  async load(id: string) {
    try {
      const [row] = await tryCatch(db.query(id));
    } catch (e) {
      throw e;
    } finally {
      done();
    }
  }
}
switch (mode) {
  case "a": { const [x] = tryCatch(a); break; }
  default: while (busy) { const y = 1; }
}
"#;
        let tree = parse_ok(src);
        assert_eq!(declarations(&tree), vec!["[row]", "[x]", "y"]);
    }

    #[test]
    fn object_patterns_and_literals() {
        let tree = parse_ok(
            "const { data, error: err = null, ...rest } = tryCatch(load);\n\
             const cfg = { a: 1, b, async run() { return 1; }, [key]: v, ...more };",
        );
        let decl = first_declaration(&tree);
        let NodeKind::VariableDeclaration { name, .. } = tree.kind(decl) else {
            unreachable!()
        };
        assert!(matches!(tree.kind(*name), NodeKind::ObjectBindingPattern { elements } if elements.len() == 3));
    }

    #[test]
    fn parse_error_reports_location() {
        let err = parse("broken.ts", "const [a = ;").unwrap_err();
        assert_eq!(err.file, "broken.ts");
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unexpected token"), "{}", err.message);
    }
}

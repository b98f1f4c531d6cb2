//! Lenient Java parser producing a [`SyntaxTree`].
//!
//! The parser is a hand-written recursive descent over the tokens from
//! [`tokenize`]. It never fails and never drops text: constructs it does not
//! understand are kept as opaque tokens and reported as [`ParseDiagnostic`]s.
//!
//! Only the structure the reference index needs is modelled precisely:
//! declarations (classes, fields, methods, parameters, locals), blocks and
//! statements for scoping, and the name-bearing parts of expressions
//! (references, calls, `new`, lambdas, `this`). Operator precedence is not
//! modelled; operands and operators of an expression are siblings.
//!
//! ## Tree Shapes
//!
//! ```text
//! ClassDeclaration  := ModifierList keyword Identifier? TypeRef* ClassBody
//! ClassBody         := "{" (EnumConstant ",")* member* "}"
//! FieldDeclaration  := ModifierList TypeRef Declarator ("," Declarator)* ";"
//! MethodDeclaration := ModifierList TypeRef? Identifier ParameterList ... (Block | ";")
//! reference         := ReferenceExpression(Identifier)
//!                    | ReferenceExpression(qualifier "." Identifier)
//! call              := MethodCall(ReferenceExpression ArgumentList)
//! ```
//!
//! Anonymous class bodies are `ClassDeclaration` nodes without an `Identifier`.
//! `this(..)` and `super(..)` are calls whose reference expression is the
//! keyword alone.

use thisify_core::patch::Span;
use thisify_core::syntax::{Checkpoint, NodeKind, OtherKind, SyntaxTree, TreeBuilder, TreeError};
use tracing::debug;

use crate::tokenizer::{tokenize, Token, TokenKind};

/// A recoverable problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub message: String,
    pub span: Span,
}

/// Result of parsing one file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub tree: SyntaxTree,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Parse Java source text into a lossless syntax tree.
pub fn parse_java(source: &str) -> Result<ParsedFile, TreeError> {
    let parsed = Parser::new(source).parse()?;
    debug!(
        nodes = parsed.tree.node_count(),
        diagnostics = parsed.diagnostics.len(),
        "parsed java source"
    );
    Ok(parsed)
}

const MODIFIER_KEYWORDS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "abstract",
    "final",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
];

const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// Operators that may appear between or around operands.
const EXPRESSION_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", "==", "!=", "<", ">", "<=", "&&",
    "||", "+", "-", "*", "/", "%", "&", "|", "^", "<<", "!", "~", "++", "--",
];

fn node_kind(kind: TokenKind) -> NodeKind {
    match kind {
        TokenKind::Ident => NodeKind::Identifier,
        TokenKind::Keyword => NodeKind::Other(OtherKind::Keyword),
        TokenKind::Literal => NodeKind::Other(OtherKind::Literal),
        TokenKind::Punct => NodeKind::Other(OtherKind::Punct),
        TokenKind::Whitespace => NodeKind::Other(OtherKind::Whitespace),
        TokenKind::LineComment | TokenKind::BlockComment => NodeKind::Other(OtherKind::Comment),
        TokenKind::Unknown => NodeKind::Other(OtherKind::Error),
    }
}

fn is_primitive(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Keyword && PRIMITIVE_TYPES.contains(&token.text)
}

fn is_ident(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Ident
}

struct Parser<'s> {
    tokens: Vec<Token<'s>>,
    offsets: Vec<usize>,
    len: usize,
    pos: usize,
    builder: TreeBuilder,
    diagnostics: Vec<ParseDiagnostic>,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        let tokens = tokenize(source);
        let mut offsets = Vec::with_capacity(tokens.len());
        let mut offset = 0;
        for token in &tokens {
            offsets.push(offset);
            offset += token.text.len();
        }
        Parser {
            tokens,
            offsets,
            len: source.len(),
            pos: 0,
            builder: TreeBuilder::new(),
            diagnostics: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<ParsedFile, TreeError> {
        self.builder.start_node(NodeKind::File);
        while !self.at_eof() {
            if self.at("package") || self.at("import") {
                self.parse_header_declaration();
            } else if self.at(";") {
                self.bump();
            } else if self.at_type_decl_start() {
                self.parse_type_declaration();
            } else {
                self.recover_top_level();
            }
        }
        self.eat_trivia();
        self.builder.finish_node();
        let tree = self.builder.finish()?;
        Ok(ParsedFile {
            tree,
            diagnostics: self.diagnostics,
        })
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn parse_header_declaration(&mut self) {
        self.start(NodeKind::Other(OtherKind::Statement));
        while !self.at_eof() && !self.at(";") {
            self.bump();
        }
        self.expect(";", "expected `;` after package or import declaration");
        self.builder.finish_node();
    }

    fn parse_type_declaration(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_modifiers();
        self.parse_type_declaration_rest(checkpoint);
    }

    fn parse_type_declaration_rest(&mut self, checkpoint: Checkpoint) {
        self.builder
            .start_node_at(checkpoint, NodeKind::ClassDeclaration);
        let is_enum = self.at("enum");
        if self.at("@") {
            self.bump(); // @
        }
        self.bump(); // class / interface / enum / record
        if self.at_ident() {
            self.bump();
        } else {
            self.error_here("expected type name");
        }
        if self.at("<") {
            self.parse_type_parameters();
        }
        if self.at("(") {
            // Record header.
            self.parse_parameter_list();
        }
        while !self.at_eof() && !self.at("{") && !self.at(";") && !self.at("}") {
            if self.at_type_start() {
                self.parse_type();
            } else {
                self.bump();
            }
        }
        if self.at("{") {
            self.parse_class_body(is_enum);
        } else {
            self.error_here("expected class body");
        }
        self.builder.finish_node();
    }

    fn parse_class_body(&mut self, is_enum: bool) {
        self.start(NodeKind::Other(OtherKind::ClassBody));
        self.expect("{", "expected `{`");
        if is_enum {
            self.parse_enum_constants();
        }
        while !self.at_eof() && !self.at("}") {
            self.parse_class_member();
        }
        self.expect("}", "expected `}`");
        self.builder.finish_node();
    }

    fn parse_enum_constants(&mut self) {
        loop {
            while self.at("@") {
                self.parse_annotation();
            }
            let at_constant = self.at_ident()
                && ["(", "{", ",", ";", "}"]
                    .iter()
                    .any(|follow| self.nth_is(1, follow));
            if !at_constant {
                break;
            }
            self.start(NodeKind::Other(OtherKind::EnumConstant));
            self.bump();
            if self.at("(") {
                self.parse_argument_list();
            }
            if self.at("{") {
                self.start(NodeKind::ClassDeclaration);
                self.parse_class_body(false);
                self.builder.finish_node();
            }
            self.builder.finish_node();
            if self.at(",") {
                self.bump();
                continue;
            }
            break;
        }
        if self.at(";") {
            self.bump();
        }
    }

    fn parse_class_member(&mut self) {
        if self.at(";") {
            self.bump();
            return;
        }

        let checkpoint = self.checkpoint();
        self.parse_modifiers();

        // Initializer blocks.
        if self.at("{") {
            self.builder
                .start_node_at(checkpoint, NodeKind::Other(OtherKind::Initializer));
            self.parse_block();
            self.builder.finish_node();
            return;
        }

        // Nested types.
        if self.at_nested_type_keyword() {
            self.parse_type_declaration_rest(checkpoint);
            return;
        }

        let generic = self.at("<");
        if generic {
            self.parse_type_parameters();
        }

        // Constructor: Ident '('
        if self.at_ident() && self.nth_is(1, "(") {
            self.builder
                .start_node_at(checkpoint, NodeKind::MethodDeclaration);
            self.bump(); // name
            self.parse_parameter_list();
            self.parse_method_rest();
            self.builder.finish_node();
            return;
        }

        // Compact record constructor: Ident '{'
        if !generic && self.at_ident() && self.nth_is(1, "{") {
            self.builder
                .start_node_at(checkpoint, NodeKind::MethodDeclaration);
            self.bump();
            self.parse_block();
            self.builder.finish_node();
            return;
        }

        if self.at_type_start() {
            self.parse_type();
            if self.at_ident() && self.nth_is(1, "(") {
                self.builder
                    .start_node_at(checkpoint, NodeKind::MethodDeclaration);
                self.bump(); // name
                self.parse_parameter_list();
                self.parse_method_rest();
                self.builder.finish_node();
                return;
            }
            if self.at_ident() {
                self.builder
                    .start_node_at(checkpoint, NodeKind::FieldDeclaration);
                self.parse_declarators();
                self.expect(";", "expected `;` after field declaration");
                self.builder.finish_node();
                return;
            }
        }

        self.builder
            .start_node_at(checkpoint, NodeKind::Other(OtherKind::Error));
        self.error_here("unexpected token in class body");
        self.recover_to_member_boundary();
        self.builder.finish_node();
    }

    fn parse_method_rest(&mut self) {
        while self.at("[") && self.nth_is(1, "]") {
            self.bump();
            self.bump();
        }
        if self.at("throws") {
            self.bump();
            self.parse_type();
            while self.at(",") {
                self.bump();
                self.parse_type();
            }
        }
        if self.at("default") {
            // Annotation element default value.
            self.bump();
            self.parse_variable_initializer();
        }
        if self.at("{") {
            self.parse_block();
        } else {
            self.expect(";", "expected `;` or method body");
        }
    }

    fn parse_modifiers(&mut self) {
        self.start(NodeKind::ModifierList);
        loop {
            if self.at("@") && !self.nth_is(1, "interface") {
                self.parse_annotation();
                continue;
            }
            let is_modifier = self.current().is_some_and(|t| {
                (t.kind == TokenKind::Keyword && MODIFIER_KEYWORDS.contains(&t.text))
                    || (t.kind == TokenKind::Ident && t.text == "sealed")
            });
            if !is_modifier {
                break;
            }
            // `default:` / `default ->` only occur in switches, never here.
            self.bump();
        }
        self.builder.finish_node();
    }

    fn parse_annotation(&mut self) {
        self.start(NodeKind::Other(OtherKind::Annotation));
        self.expect("@", "expected `@`");
        self.expect_ident("expected annotation name");
        while self.at(".") && self.nth(1).is_some_and(|t| is_ident(&t)) {
            self.bump();
            self.bump();
        }
        if self.at("(") {
            self.parse_argument_list();
        }
        self.builder.finish_node();
    }

    fn parse_parameter_list(&mut self) {
        self.start(NodeKind::Other(OtherKind::ParameterList));
        self.expect("(", "expected `(`");
        while !self.at_eof() && !self.at(")") {
            self.start(NodeKind::Other(OtherKind::Parameter));
            self.parse_modifiers();
            if self.at_type_start() {
                self.parse_type();
            } else {
                self.error_here("expected parameter type");
            }
            if self.at("...") {
                self.bump();
            }
            if self.at_ident() || self.at("this") {
                self.bump();
            } else {
                self.error_here("expected parameter name");
            }
            while self.at("[") && self.nth_is(1, "]") {
                self.bump();
                self.bump();
            }
            self.builder.finish_node();

            if self.at(",") {
                self.bump();
                continue;
            }
            if !self.at(")") && !self.at_eof() && !self.at("{") && !self.at(";") {
                self.error_here("unexpected token in parameter list");
                self.bump();
                continue;
            }
            break;
        }
        self.expect(")", "expected `)`");
        self.builder.finish_node();
    }

    fn parse_declarators(&mut self) {
        loop {
            self.start(NodeKind::Other(OtherKind::Declarator));
            self.expect_ident("expected variable name");
            while self.at("[") && self.nth_is(1, "]") {
                self.bump();
                self.bump();
            }
            if self.at("=") {
                self.bump();
                self.parse_variable_initializer();
            }
            self.builder.finish_node();
            if self.at(",") {
                self.bump();
                continue;
            }
            break;
        }
    }

    fn parse_variable_initializer(&mut self) {
        if self.at("{") {
            self.parse_array_initializer();
        } else {
            self.parse_expression();
        }
    }

    fn parse_array_initializer(&mut self) {
        self.start(NodeKind::Other(OtherKind::ArrayInitializer));
        self.expect("{", "expected `{`");
        while !self.at_eof() && !self.at("}") {
            let before = self.pos;
            self.parse_variable_initializer();
            if self.at(",") {
                self.bump();
                continue;
            }
            if !self.at("}") && self.pos == before {
                self.error_here("unexpected token in array initializer");
                self.bump();
            }
        }
        self.expect("}", "expected `}`");
        self.builder.finish_node();
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn parse_type(&mut self) {
        self.start(NodeKind::Other(OtherKind::TypeRef));
        while self.at("@") {
            self.parse_annotation();
        }
        if self.current().is_some_and(|t| is_primitive(&t)) {
            self.bump();
        } else if self.at_ident() {
            self.bump();
            loop {
                if self.at("<") {
                    self.parse_type_arguments();
                } else if self.at(".") && self.nth(1).is_some_and(|t| is_ident(&t)) {
                    self.bump();
                    self.bump();
                } else {
                    break;
                }
            }
        } else {
            self.error_here("expected type");
        }
        while self.at("[") && self.nth_is(1, "]") {
            self.bump();
            self.bump();
        }
        self.builder.finish_node();
    }

    fn parse_type_arguments(&mut self) {
        self.expect("<", "expected `<`");
        loop {
            if self.at_eof() || self.at(">") {
                break;
            }
            if [";", "{", "}", ")", "(", "="].iter().any(|t| self.at(t)) {
                break;
            }
            if ["?", "extends", "super", "&", ","].iter().any(|t| self.at(t)) {
                self.bump();
                continue;
            }
            if self.at("@") {
                self.parse_annotation();
                continue;
            }
            if self.at_type_start() {
                self.parse_type();
                continue;
            }
            self.error_here("unexpected token in type arguments");
            self.bump();
        }
        self.expect(">", "expected `>`");
    }

    fn parse_type_parameters(&mut self) {
        self.start(NodeKind::Other(OtherKind::TypeRef));
        self.parse_type_arguments();
        self.builder.finish_node();
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_block(&mut self) {
        self.start(NodeKind::Other(OtherKind::Block));
        self.expect("{", "expected `{`");
        while !self.at_eof() && !self.at("}") {
            self.parse_statement();
        }
        self.expect("}", "expected `}`");
        self.builder.finish_node();
    }

    fn parse_statement(&mut self) {
        if self.at("{") {
            self.parse_block();
            return;
        }
        if self.at(";") {
            self.bump();
            return;
        }
        if self.at_local_type_decl_start() {
            self.parse_type_declaration();
            return;
        }

        let checkpoint = self.checkpoint();

        // Labeled statement.
        if self.at_ident() && self.nth_is(1, ":") {
            self.builder
                .start_node_at(checkpoint, NodeKind::Other(OtherKind::Statement));
            self.bump();
            self.bump();
            self.parse_statement();
            self.builder.finish_node();
            return;
        }

        if self.at_yield_statement() {
            self.builder
                .start_node_at(checkpoint, NodeKind::Other(OtherKind::Statement));
            self.bump();
            self.parse_expression();
            self.expect(";", "expected `;` after yield");
            self.builder.finish_node();
            return;
        }

        let keyword = match self.current() {
            Some(token) if token.kind == TokenKind::Keyword => token.text,
            _ => "",
        };

        match keyword {
            "if" | "while" | "for" | "do" | "switch" | "synchronized" | "try" | "return"
            | "throw" | "break" | "continue" | "assert" => {
                self.builder
                    .start_node_at(checkpoint, NodeKind::Other(OtherKind::Statement));
                self.parse_keyword_statement(keyword);
                self.builder.finish_node();
            }
            _ if self.at_local_var_decl_start() => {
                self.parse_local_variable(true);
            }
            _ => {
                self.builder
                    .start_node_at(checkpoint, NodeKind::Other(OtherKind::Statement));
                let before = self.pos;
                self.parse_expression();
                if self.pos == before {
                    self.error_here("expected statement");
                    self.bump();
                } else {
                    self.expect(";", "expected `;` after expression");
                }
                self.builder.finish_node();
            }
        }
    }

    fn parse_keyword_statement(&mut self, keyword: &str) {
        match keyword {
            "if" => {
                self.bump();
                self.parse_parenthesized();
                self.parse_statement();
                if self.at("else") {
                    self.bump();
                    self.parse_statement();
                }
            }
            "while" => {
                self.bump();
                self.parse_parenthesized();
                self.parse_statement();
            }
            "do" => {
                self.bump();
                self.parse_statement();
                self.expect("while", "expected `while` after `do` body");
                self.parse_parenthesized();
                self.expect(";", "expected `;` after do-while");
            }
            "for" => {
                self.bump();
                self.parse_for_header();
                self.parse_statement();
            }
            "switch" => self.parse_switch(),
            "synchronized" => {
                self.bump();
                self.parse_parenthesized();
                self.parse_block();
            }
            "try" => self.parse_try(),
            "return" | "throw" => {
                self.bump();
                if !self.at(";") {
                    self.parse_expression();
                }
                self.expect(";", "expected `;`");
            }
            "break" | "continue" => {
                self.bump();
                if self.at_ident() {
                    // Label, not a reference.
                    self.bump();
                }
                self.expect(";", "expected `;`");
            }
            "assert" => {
                self.bump();
                self.parse_expression();
                if self.at(":") {
                    self.bump();
                    self.parse_expression();
                }
                self.expect(";", "expected `;` after assert");
            }
            _ => self.bump(),
        }
    }

    fn parse_parenthesized(&mut self) {
        self.expect("(", "expected `(`");
        self.parse_expression();
        self.expect(")", "expected `)`");
    }

    fn parse_for_header(&mut self) {
        self.expect("(", "expected `(` after for");
        if self.at_local_var_decl_start() {
            self.parse_local_variable(false);
        } else if !self.at(";") {
            self.parse_expression_list();
        }
        if self.at(":") {
            self.bump();
            self.parse_expression();
        } else {
            self.expect(";", "expected `;` in for header");
            if !self.at(";") {
                self.parse_expression();
            }
            self.expect(";", "expected `;` in for header");
            if !self.at(")") {
                self.parse_expression_list();
            }
        }
        self.expect(")", "expected `)` after for header");
    }

    fn parse_expression_list(&mut self) {
        self.parse_expression();
        while self.at(",") {
            self.bump();
            self.parse_expression();
        }
    }

    fn parse_switch(&mut self) {
        self.expect("switch", "expected `switch`");
        self.parse_parenthesized();
        self.start(NodeKind::Other(OtherKind::Block));
        self.expect("{", "expected `{` after switch");
        while !self.at_eof() && !self.at("}") {
            if self.at("case") || self.at("default") {
                self.bump();
                self.parse_switch_label_rest();
            } else {
                self.parse_statement();
            }
        }
        self.expect("}", "expected `}` after switch block");
        self.builder.finish_node();
    }

    fn parse_switch_label_rest(&mut self) {
        loop {
            if self.at_eof() || self.at(":") || self.at("->") || self.at("}") {
                break;
            }
            let before = self.pos;
            self.parse_expression();
            if self.at(",") {
                self.bump();
                continue;
            }
            if self.pos == before {
                self.bump();
            }
        }
        if self.at("->") {
            self.bump();
            if self.at("{") {
                self.parse_block();
            } else if self.at("throw") {
                self.parse_statement();
            } else {
                self.parse_expression();
                self.expect(";", "expected `;` after switch rule");
            }
        } else {
            self.expect(":", "expected `:` after switch label");
        }
    }

    fn parse_try(&mut self) {
        self.bump(); // try
        if self.at("(") {
            self.bump();
            while !self.at_eof() && !self.at(")") {
                let before = self.pos;
                if self.at_local_var_decl_start() {
                    self.parse_local_variable(false);
                } else {
                    self.parse_expression();
                }
                if self.at(";") {
                    self.bump();
                    continue;
                }
                if self.pos == before {
                    self.error_here("unexpected token in resource specification");
                    self.bump();
                }
            }
            self.expect(")", "expected `)` after resources");
        }
        self.parse_block();
        while self.at("catch") {
            self.start(NodeKind::Other(OtherKind::Statement));
            self.bump();
            self.start(NodeKind::Other(OtherKind::ParameterList));
            self.expect("(", "expected `(` after catch");
            self.start(NodeKind::Other(OtherKind::Parameter));
            self.parse_modifiers();
            self.parse_type();
            while self.at("|") {
                self.bump();
                self.parse_type();
            }
            self.expect_ident("expected exception parameter name");
            self.builder.finish_node();
            self.expect(")", "expected `)`");
            self.builder.finish_node();
            self.parse_block();
            self.builder.finish_node();
        }
        if self.at("finally") {
            self.bump();
            self.parse_block();
        }
    }

    fn parse_local_variable(&mut self, with_semicolon: bool) {
        self.start(NodeKind::Other(OtherKind::LocalVariable));
        self.parse_modifiers();
        self.parse_type();
        self.parse_declarators();
        if with_semicolon {
            self.expect(";", "expected `;` after local variable declaration");
        }
        self.builder.finish_node();
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression(&mut self) {
        let mut open_conditionals = 0usize;
        loop {
            if self.at_operand_start() {
                self.parse_operand();
            } else if self.at_expression_operator() {
                self.bump();
            } else if self.at("?") {
                open_conditionals += 1;
                self.bump();
            } else if self.at(":") && open_conditionals > 0 {
                open_conditionals -= 1;
                self.bump();
            } else if self.at("instanceof") {
                self.bump();
                if self.at("final") {
                    self.bump();
                }
                self.parse_type();
                if self.at_ident() {
                    // Pattern binding.
                    self.start(NodeKind::Other(OtherKind::LocalVariable));
                    self.start(NodeKind::Other(OtherKind::Declarator));
                    self.bump();
                    self.builder.finish_node();
                    self.builder.finish_node();
                }
            } else {
                break;
            }
        }
    }

    fn parse_operand(&mut self) {
        let checkpoint = self.checkpoint();
        let Some(token) = self.current() else {
            return;
        };

        match token.kind {
            TokenKind::Ident => {
                if self.nth_is(1, "->") {
                    self.builder
                        .start_node_at(checkpoint, NodeKind::Other(OtherKind::Lambda));
                    self.start(NodeKind::Other(OtherKind::Parameter));
                    self.bump();
                    self.builder.finish_node();
                    self.bump(); // ->
                    self.parse_lambda_body();
                    self.builder.finish_node();
                    return;
                }
                self.builder
                    .start_node_at(checkpoint, NodeKind::ReferenceExpression);
                self.bump();
                self.builder.finish_node();
            }
            TokenKind::Literal => self.bump(),
            TokenKind::Punct if token.text == "(" => {
                if self.is_lambda_paren() {
                    self.builder
                        .start_node_at(checkpoint, NodeKind::Other(OtherKind::Lambda));
                    self.parse_lambda_parameters();
                    self.expect("->", "expected `->` in lambda");
                    self.parse_lambda_body();
                    self.builder.finish_node();
                    return;
                }
                self.bump();
                self.parse_expression();
                self.expect(")", "expected `)`");
            }
            TokenKind::Keyword => match token.text {
                "this" | "super" => {
                    if self.nth_is(1, "(") {
                        self.builder
                            .start_node_at(checkpoint, NodeKind::ReferenceExpression);
                        self.bump();
                        self.builder.finish_node();
                    } else {
                        self.bump();
                    }
                }
                "new" => {
                    self.builder
                        .start_node_at(checkpoint, NodeKind::Other(OtherKind::NewExpression));
                    self.parse_new_rest();
                    self.builder.finish_node();
                }
                "switch" => self.parse_switch(),
                _ if is_primitive(&token) => {
                    self.bump();
                    while self.at("[") && self.nth_is(1, "]") {
                        self.bump();
                        self.bump();
                    }
                }
                _ => return,
            },
            _ => return,
        }

        self.parse_postfix(checkpoint);
    }

    fn parse_postfix(&mut self, checkpoint: Checkpoint) {
        loop {
            if self.at(".") {
                let Some(next) = self.nth(1) else {
                    break;
                };
                if is_ident(&next) {
                    self.builder
                        .start_node_at(checkpoint, NodeKind::ReferenceExpression);
                    self.bump();
                    self.bump();
                    self.builder.finish_node();
                } else if next.is("this") {
                    self.builder
                        .start_node_at(checkpoint, NodeKind::Other(OtherKind::QualifiedThis));
                    self.bump();
                    self.bump();
                    self.builder.finish_node();
                } else if next.is("new") {
                    self.builder
                        .start_node_at(checkpoint, NodeKind::Other(OtherKind::NewExpression));
                    self.bump(); // .
                    self.parse_new_rest();
                    self.builder.finish_node();
                } else if next.is("<") {
                    self.builder
                        .start_node_at(checkpoint, NodeKind::ReferenceExpression);
                    self.bump();
                    self.parse_type_parameters();
                    self.expect_ident("expected method name");
                    self.builder.finish_node();
                } else if next.is("class") || next.is("super") {
                    self.bump();
                    self.bump();
                } else {
                    break;
                }
            } else if self.at("(") {
                self.builder
                    .start_node_at(checkpoint, NodeKind::Other(OtherKind::MethodCall));
                self.parse_argument_list();
                self.builder.finish_node();
            } else if self.at("[") {
                self.bump();
                if !self.at("]") {
                    self.parse_expression();
                }
                self.expect("]", "expected `]`");
            } else if self.at("::") {
                self.builder
                    .start_node_at(checkpoint, NodeKind::ReferenceExpression);
                self.bump();
                if self.at_ident() || self.at("new") {
                    self.bump();
                } else {
                    self.error_here("expected method reference name");
                }
                self.builder.finish_node();
            } else {
                break;
            }
        }
    }

    fn parse_new_rest(&mut self) {
        self.expect("new", "expected `new`");
        if self.at("<") {
            self.parse_type_parameters();
        }
        self.parse_type();
        while self.at("[") {
            self.bump();
            if !self.at("]") {
                self.parse_expression();
            }
            self.expect("]", "expected `]`");
        }
        if self.at("{") {
            self.parse_array_initializer();
            return;
        }
        if self.at("(") {
            self.parse_argument_list();
        }
        if self.at("{") {
            self.start(NodeKind::ClassDeclaration);
            self.parse_class_body(false);
            self.builder.finish_node();
        }
    }

    fn parse_argument_list(&mut self) {
        self.start(NodeKind::Other(OtherKind::ArgumentList));
        self.expect("(", "expected `(`");
        while !self.at_eof() && !self.at(")") {
            let before = self.pos;
            if self.at("{") {
                self.parse_array_initializer();
            } else {
                self.parse_expression();
            }
            if self.at(",") {
                self.bump();
                continue;
            }
            if !self.at(")") && self.pos == before {
                if self.at(";") || self.at("}") {
                    break;
                }
                self.error_here("unexpected token in argument list");
                self.bump();
            }
        }
        self.expect(")", "expected `)`");
        self.builder.finish_node();
    }

    fn parse_lambda_parameters(&mut self) {
        self.start(NodeKind::Other(OtherKind::ParameterList));
        self.expect("(", "expected `(`");
        while !self.at_eof() && !self.at(")") {
            self.start(NodeKind::Other(OtherKind::Parameter));
            let untyped = self.at_ident() && (self.nth_is(1, ",") || self.nth_is(1, ")"));
            if untyped {
                self.bump();
            } else {
                self.parse_modifiers();
                self.parse_type();
                if self.at("...") {
                    self.bump();
                }
                self.expect_ident("expected lambda parameter name");
            }
            self.builder.finish_node();
            if self.at(",") {
                self.bump();
                continue;
            }
            if !self.at(")") && !self.at_eof() {
                self.error_here("unexpected token in lambda parameters");
                self.bump();
                continue;
            }
            break;
        }
        self.expect(")", "expected `)`");
        self.builder.finish_node();
    }

    fn parse_lambda_body(&mut self) {
        if self.at("{") {
            self.parse_block();
        } else {
            self.parse_expression();
        }
    }

    // ========================================================================
    // Lookahead
    // ========================================================================

    fn at_type_decl_start(&self) -> bool {
        let Some(token) = self.current() else {
            return false;
        };
        (token.kind == TokenKind::Keyword
            && (MODIFIER_KEYWORDS.contains(&token.text)
                || matches!(token.text, "class" | "interface" | "enum")))
            || token.is("@")
            || self.at_record_keyword()
            || (token.kind == TokenKind::Ident && token.text == "sealed")
    }

    fn at_record_keyword(&self) -> bool {
        self.current()
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text == "record")
            && self.nth(1).is_some_and(|t| is_ident(&t))
            && (self.nth_is(2, "(") || self.nth_is(2, "<"))
    }

    fn at_nested_type_keyword(&self) -> bool {
        self.at("class")
            || self.at("interface")
            || self.at("enum")
            || (self.at("@") && self.nth_is(1, "interface"))
            || self.at_record_keyword()
    }

    fn at_local_type_decl_start(&self) -> bool {
        let mut n = 0;
        while let Some(token) = self.nth(n) {
            if token.is("final") || token.is("abstract") || token.is("static") || token.is("strictfp")
            {
                n += 1;
                continue;
            }
            if token.is("@") && !self.nth_is(n + 1, "interface") {
                // Annotations on local classes are rare; only allow `@Name`.
                n += 2;
                continue;
            }
            return token.is("class")
                || token.is("interface")
                || token.is("enum")
                || (token.kind == TokenKind::Ident
                    && token.text == "record"
                    && self.nth(n + 1).is_some_and(|t| is_ident(&t))
                    && self.nth_is(n + 2, "("));
        }
        false
    }

    fn at_yield_statement(&self) -> bool {
        let is_yield = self
            .current()
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text == "yield");
        is_yield
            && !["=", ".", "[", "++", "--", ";", "->", ":", "("]
                .iter()
                .any(|t| self.nth_is(1, t))
            && !self.nth(1).is_some_and(|t| is_ident(&t) && self.nth_is(2, "="))
    }

    fn at_type_start(&self) -> bool {
        self.current()
            .is_some_and(|t| is_ident(&t) || is_primitive(&t))
            || self.at("@")
    }

    fn at_operand_start(&self) -> bool {
        let Some(token) = self.current() else {
            return false;
        };
        match token.kind {
            TokenKind::Ident | TokenKind::Literal => true,
            TokenKind::Keyword => {
                matches!(token.text, "this" | "super" | "new" | "switch") || is_primitive(&token)
            }
            TokenKind::Punct => token.text == "(",
            _ => false,
        }
    }

    fn at_expression_operator(&self) -> bool {
        self.current()
            .is_some_and(|t| t.kind == TokenKind::Punct && EXPRESSION_OPERATORS.contains(&t.text))
    }

    fn is_lambda_paren(&self) -> bool {
        let Some(start) = self.nth_index(0) else {
            return false;
        };
        let Some(close) = self.matching_paren(start) else {
            return false;
        };
        let next = self.skip_trivia(close + 1);
        self.tokens.get(next).is_some_and(|t| t.is("->"))
    }

    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(open) {
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
        }
        None
    }

    fn at_local_var_decl_start(&self) -> bool {
        let Some(mut i) = self.nth_index(0) else {
            return false;
        };

        // Local variable modifiers: `final` and annotations.
        loop {
            match self.tokens.get(i) {
                Some(t) if t.is("final") => i = self.skip_trivia(i + 1),
                Some(t) if t.is("@") => {
                    i = self.skip_trivia(i + 1);
                    i = self.skip_qualified_name(i);
                    i = self.skip_trivia(i);
                    if self.tokens.get(i).is_some_and(|t| t.is("(")) {
                        match self.matching_paren(i) {
                            Some(close) => i = self.skip_trivia(close + 1),
                            None => return false,
                        }
                    }
                }
                _ => break,
            }
        }

        let Some(first) = self.tokens.get(i).copied() else {
            return false;
        };

        if first.kind == TokenKind::Ident && first.text == "var" {
            let j = self.skip_trivia(i + 1);
            return self.tokens.get(j).is_some_and(is_ident);
        }

        if is_primitive(&first) {
            i += 1;
        } else if is_ident(&first) {
            i = self.skip_qualified_name(i);
            let j = self.skip_trivia(i);
            if self.tokens.get(j).is_some_and(|t| t.is("<")) {
                match self.skip_type_arguments(j) {
                    Some(end) => i = end,
                    None => return false,
                }
                // Nested type after generic outer: `Outer<T>.Inner`.
                let dot = self.skip_trivia(i);
                if self.tokens.get(dot).is_some_and(|t| t.is(".")) {
                    i = self.skip_qualified_name(self.skip_trivia(dot + 1));
                }
            }
        } else {
            return false;
        }

        // Array dims: `[]`*
        loop {
            let j = self.skip_trivia(i);
            if !self.tokens.get(j).is_some_and(|t| t.is("[")) {
                i = j;
                break;
            }
            let after = self.skip_trivia(j + 1);
            if !self.tokens.get(after).is_some_and(|t| t.is("]")) {
                i = j;
                break;
            }
            i = after + 1;
        }

        i = self.skip_trivia(i);
        self.tokens.get(i).is_some_and(is_ident)
    }

    fn skip_qualified_name(&self, mut i: usize) -> usize {
        if !self.tokens.get(i).is_some_and(is_ident) {
            return i;
        }
        i += 1;
        loop {
            let dot = self.skip_trivia(i);
            if !self.tokens.get(dot).is_some_and(|t| t.is(".")) {
                return i;
            }
            let segment = self.skip_trivia(dot + 1);
            if !self.tokens.get(segment).is_some_and(is_ident) {
                return i;
            }
            i = segment + 1;
        }
    }

    fn skip_type_arguments(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, token) in self.tokens.iter().enumerate().skip(open) {
            if token.kind.is_trivia() {
                continue;
            }
            match token.text {
                "<" => depth += 1,
                ">" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(idx + 1);
                    }
                }
                "," | "." | "?" | "&" | "[" | "]" | "@" | "extends" | "super" => {}
                _ if is_ident(token) || is_primitive(token) => {}
                _ => return None,
            }
        }
        None
    }

    // ========================================================================
    // Token plumbing
    // ========================================================================

    fn skip_trivia(&self, mut idx: usize) -> usize {
        while self.tokens.get(idx).is_some_and(|t| t.kind.is_trivia()) {
            idx += 1;
        }
        idx
    }

    fn nth_index(&self, n: usize) -> Option<usize> {
        let mut remaining = n;
        let mut idx = self.skip_trivia(self.pos);
        while idx < self.tokens.len() {
            if remaining == 0 {
                return Some(idx);
            }
            remaining -= 1;
            idx = self.skip_trivia(idx + 1);
        }
        None
    }

    fn nth(&self, n: usize) -> Option<Token<'s>> {
        self.nth_index(n).map(|idx| self.tokens[idx])
    }

    fn current(&self) -> Option<Token<'s>> {
        self.nth(0)
    }

    fn at(&self, text: &str) -> bool {
        self.current().is_some_and(|t| t.is(text))
    }

    fn nth_is(&self, n: usize, text: &str) -> bool {
        self.nth(n).is_some_and(|t| t.is(text))
    }

    fn at_ident(&self) -> bool {
        self.current().is_some_and(|t| is_ident(&t))
    }

    fn at_eof(&self) -> bool {
        self.nth_index(0).is_none()
    }

    fn eat_trivia(&mut self) {
        while let Some(token) = self.tokens.get(self.pos).copied() {
            if !token.kind.is_trivia() {
                break;
            }
            self.builder.token(node_kind(token.kind), token.text);
            self.pos += 1;
        }
    }

    fn bump(&mut self) {
        self.eat_trivia();
        if let Some(token) = self.tokens.get(self.pos).copied() {
            self.builder.token(node_kind(token.kind), token.text);
            self.pos += 1;
        }
    }

    fn start(&mut self, kind: NodeKind) {
        self.eat_trivia();
        self.builder.start_node(kind);
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.eat_trivia();
        self.builder.checkpoint()
    }

    fn expect(&mut self, text: &str, message: &str) -> bool {
        if self.at(text) {
            self.bump();
            true
        } else {
            self.error_here(message);
            false
        }
    }

    fn expect_ident(&mut self, message: &str) {
        if self.at_ident() {
            self.bump();
        } else {
            self.error_here(message);
        }
    }

    fn error_here(&mut self, message: &str) {
        let span = match self.nth_index(0) {
            Some(idx) => Span::at(self.offsets[idx], self.tokens[idx].text.len()),
            None => Span::new(self.len, self.len),
        };
        debug!(%span, message, "parse diagnostic");
        self.diagnostics.push(ParseDiagnostic {
            message: message.to_string(),
            span,
        });
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    fn recover_top_level(&mut self) {
        self.start(NodeKind::Other(OtherKind::Error));
        self.error_here("unexpected token at top level");
        self.bump();
        while !self.at_eof() && !self.at_type_decl_start() && !self.at("import") {
            self.bump();
        }
        self.builder.finish_node();
    }

    fn recover_to_member_boundary(&mut self) {
        // Always make progress, but never swallow the body's closing brace.
        if !self.at("}") {
            self.bump();
        }
        while !self.at_eof() {
            if self.at(";") {
                self.bump();
                break;
            }
            if self.at("}") || self.at_type_decl_start() {
                break;
            }
            if self.at("{") {
                self.parse_block();
                break;
            }
            self.bump();
        }
    }
}

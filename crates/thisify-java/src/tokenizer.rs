//! Lossless Java tokenizer.
//!
//! [`tokenize`] splits source text into [`Token`]s whose texts concatenate
//! back to the input exactly. Anything the grammar below does not recognise
//! becomes a one-character [`TokenKind::Unknown`] token, so tokenizing never
//! fails.
//!
//! ## Grammar
//!
//! ```text
//! token       := whitespace | comment | literal | word | operator | unknown
//! comment     := "//" ... EOL | "/*" ... "*/"
//! literal     := text-block | string | char | number
//! word        := ident-start ident-part*      (keyword, literal word or identifier)
//! ```
//!
//! `>` is always emitted on its own so that nested generic arguments such as
//! `List<List<String>>` close one level per token.

use winnow::combinator::{alt, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, none_of, one_of, rest, take, take_till, take_until, take_while};
use winnow::ModalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    Ident,
    Keyword,
    /// Numbers, strings, chars, text blocks, `true`, `false` and `null`.
    Literal,
    Punct,
    Unknown,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
}

impl<'s> Token<'s> {
    pub fn new(kind: TokenKind, text: &'s str) -> Self {
        Token { kind, text }
    }

    /// Whether this is the punctuation or keyword `text`.
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Punct | TokenKind::Keyword) && self.text == text
    }
}

const KEYWORDS: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "try",
    "void",
    "volatile",
    "while",
];

const LITERAL_WORDS: &[&str] = &["true", "false", "null"];

/// Multi-character operators, longest first. None of them start with `>`.
const OPERATORS: &[&str] = &[
    "<<=", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=", "+=", "-=", "*=", "/=",
    "&=", "|=", "^=", "%=", "<<",
];

const PUNCT_CHARS: &[char] = &[
    '(', ')', '{', '}', '[', ']', ';', ',', '.', '@', '=', '>', '<', '!', '~', '?', ':', '+', '-',
    '*', '/', '&', '|', '^', '%',
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Split `source` into tokens. Concatenating the token texts yields `source`.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut input = source;
    let mut tokens = Vec::new();
    while !input.is_empty() {
        match next_token(&mut input) {
            Ok(token) => tokens.push(token),
            Err(_) => {
                // `unknown` accepts any char, so this only guards against a
                // parser that fails without consuming.
                let len = input.chars().next().map_or(input.len(), char::len_utf8);
                let (text, remaining) = input.split_at(len);
                tokens.push(Token::new(TokenKind::Unknown, text));
                input = remaining;
            }
        }
    }
    tokens
}

// ============================================================================
// Token parsers using winnow
// ============================================================================

fn next_token<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    alt((
        whitespace,
        line_comment,
        block_comment,
        text_block,
        string_literal,
        char_literal,
        number,
        word,
        operator,
        unknown,
    ))
    .parse_next(input)
}

fn whitespace<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    take_while(1.., char::is_whitespace)
        .map(|text| Token::new(TokenKind::Whitespace, text))
        .parse_next(input)
}

fn line_comment<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    ("//", take_till(0.., |c| c == '\n'))
        .take()
        .map(|text| Token::new(TokenKind::LineComment, text))
        .parse_next(input)
}

fn block_comment<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    // An unterminated comment runs to the end of the file.
    ("/*", alt(((take_until(0.., "*/"), "*/").void(), rest.void())))
        .take()
        .map(|text| Token::new(TokenKind::BlockComment, text))
        .parse_next(input)
}

fn text_block<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    ("\"\"\"", take_until(0.., "\"\"\""), "\"\"\"")
        .take()
        .map(|text| Token::new(TokenKind::Literal, text))
        .parse_next(input)
}

fn string_literal<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    quoted('"')
        .map(|text| Token::new(TokenKind::Literal, text))
        .parse_next(input)
}

fn char_literal<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    quoted('\'')
        .map(|text| Token::new(TokenKind::Literal, text))
        .parse_next(input)
}

fn quoted<'s>(quote: char) -> impl Parser<&'s str, &'s str, ErrMode<ContextError>> {
    move |input: &mut &'s str| {
        (
            quote,
            repeat::<_, _, (), _, _>(
                0..,
                alt((('\\', any).void(), none_of([quote, '\\', '\n']).void())),
            ),
            quote,
        )
            .take()
            .parse_next(input)
    }
}

fn number<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    (
        one_of(|c: char| c.is_ascii_digit()),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    )
        .take()
        .map(|text| Token::new(TokenKind::Literal, text))
        .parse_next(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn word<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    (one_of(is_ident_start), take_while(0.., is_ident_part))
        .take()
        .map(|text: &str| {
            let kind = if is_keyword(text) {
                TokenKind::Keyword
            } else if LITERAL_WORDS.contains(&text) {
                TokenKind::Literal
            } else {
                TokenKind::Ident
            };
            Token::new(kind, text)
        })
        .parse_next(input)
}

fn operator<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    if let Some(op) = OPERATORS.iter().find(|op| input.starts_with(**op)) {
        let text = take(op.len()).parse_next(input)?;
        return Ok(Token::new(TokenKind::Punct, text));
    }
    one_of(PUNCT_CHARS)
        .take()
        .map(|text| Token::new(TokenKind::Punct, text))
        .parse_next(input)
}

fn unknown<'s>(input: &mut &'s str) -> ModalResult<Token<'s>> {
    any.take()
        .map(|text| Token::new(TokenKind::Unknown, text))
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn tokenizing_is_lossless() {
        let source = "class Foo {\n  /* c */ int bar = 0x1F; // tail\n  String s = \"a\\\"b\";\n}\n";
        let joined: String = tokenize(source).iter().map(|t| t.text).collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn classifies_words() {
        assert_eq!(
            kinds_and_texts("this.bar = null;"),
            vec![
                (TokenKind::Keyword, "this"),
                (TokenKind::Punct, "."),
                (TokenKind::Ident, "bar"),
                (TokenKind::Punct, "="),
                (TokenKind::Literal, "null"),
                (TokenKind::Punct, ";"),
            ]
        );
    }

    #[test]
    fn greater_than_is_never_merged() {
        let texts: Vec<&str> = kinds_and_texts("List<List<String>> x; a >>= 1")
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        assert_eq!(
            texts,
            vec!["List", "<", "List", "<", "String", ">", ">", "x", ";", "a", ">", ">", "=", "1"]
        );
    }

    #[test]
    fn operators_prefer_longest_match() {
        let texts: Vec<&str> = kinds_and_texts("x -> y :: z ... a <<= b")
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        assert_eq!(
            texts,
            vec!["x", "->", "y", "::", "z", "...", "a", "<<=", "b"]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            kinds_and_texts("'\\n' 1.5e3f \"\"\"\n  text \"block\"\n\"\"\""),
            vec![
                (TokenKind::Literal, "'\\n'"),
                (TokenKind::Literal, "1.5e3f"),
                (TokenKind::Literal, "\"\"\"\n  text \"block\"\n\"\"\""),
            ]
        );
    }

    #[test]
    fn unterminated_constructs_stay_lossless() {
        for source in ["/* open", "\"open", "'", "#!", "a \u{00e9}t\u{00e9} b"] {
            let joined: String = tokenize(source).iter().map(|t| t.text).collect();
            assert_eq!(joined, source);
        }
    }

    #[test]
    fn unicode_identifiers() {
        assert_eq!(
            kinds_and_texts("int \u{00e9}t\u{00e9};"),
            vec![
                (TokenKind::Keyword, "int"),
                (TokenKind::Ident, "\u{00e9}t\u{00e9}"),
                (TokenKind::Punct, ";"),
            ]
        );
    }
}

use crate::ast::Span;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords, distinguished in the parser
    Word(String),
    /// Quoted string literal (raw content between the quotes)
    Str(String),
    /// Numeric literal, kept as written
    Num(String),
    /// Backtick template literal, kept as written
    Template(String),
    /// Regular expression literal including slashes and flags
    Regex(String),
    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semi,
    Colon,
    Dot,
    /// Every other operator, longest match first (`===`, `=>`, `?.`, `...`)
    Op(&'static str),
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
    pub line: u32,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

const OPERATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "+", "-", "*", "/", "%", "<", ">", "!", "~", "&", "|", "^",
    "?", "=", "@", "#",
];

pub fn lex(src: &str, filename: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line: u32 = 1;
    let mut newline_before = false;

    while pos < bytes.len() {
        let c = bytes[pos];

        // Line comment
        if c == b'/' && bytes.get(pos + 1) == Some(&b'/') {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        // Block comment
        if c == b'/' && bytes.get(pos + 1) == Some(&b'*') {
            let open = pos;
            pos += 2;
            loop {
                if pos >= bytes.len() {
                    return Err(ParseError::lex(
                        filename,
                        line,
                        open,
                        "unterminated block comment",
                    ));
                }
                if bytes[pos] == b'\n' {
                    line += 1;
                    newline_before = true;
                }
                if bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/') {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            continue;
        }

        // Whitespace
        if c.is_ascii_whitespace() {
            if c == b'\n' {
                line += 1;
                newline_before = true;
            }
            pos += 1;
            continue;
        }

        let start = pos;
        let tok_line = line;

        let token = if c == b'/' && regex_allowed(tokens.last()) {
            pos += 1;
            let mut in_class = false;
            loop {
                match bytes.get(pos) {
                    None | Some(b'\n') => {
                        return Err(ParseError::lex(
                            filename,
                            tok_line,
                            start,
                            "unterminated regular expression",
                        ));
                    }
                    Some(b'\\') => pos += 2,
                    Some(b'[') => {
                        in_class = true;
                        pos += 1;
                    }
                    Some(b']') => {
                        in_class = false;
                        pos += 1;
                    }
                    Some(b'/') if !in_class => {
                        pos += 1;
                        break;
                    }
                    Some(_) => pos += 1,
                }
            }
            while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                pos += 1;
            }
            Token::Regex(src[start..pos].to_owned())
        } else if c == b'"' || c == b'\'' || c == b'`' {
            pos += 1;
            loop {
                if pos >= bytes.len() {
                    return Err(ParseError::lex(
                        filename,
                        tok_line,
                        start,
                        "unterminated string literal",
                    ));
                }
                let sc = bytes[pos];
                if sc == b'\\' {
                    pos += 2;
                    continue;
                }
                if sc == b'\n' {
                    if c != b'`' {
                        return Err(ParseError::lex(
                            filename,
                            tok_line,
                            start,
                            "unterminated string literal",
                        ));
                    }
                    line += 1;
                }
                pos += 1;
                if sc == c {
                    break;
                }
            }
            let raw = src[start + 1..pos - 1].to_owned();
            if c == b'`' {
                Token::Template(raw)
            } else {
                Token::Str(raw)
            }
        } else if c.is_ascii_digit()
            || (c == b'.' && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit()))
        {
            while pos < bytes.len()
                && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'.' || bytes[pos] == b'_')
            {
                pos += 1;
            }
            Token::Num(src[start..pos].to_owned())
        } else if is_ident_start(c) {
            while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                pos += 1;
            }
            Token::Word(src[start..pos].to_owned())
        } else {
            match c {
                b'{' => single(&mut pos, Token::LBrace),
                b'}' => single(&mut pos, Token::RBrace),
                b'[' => single(&mut pos, Token::LBracket),
                b']' => single(&mut pos, Token::RBracket),
                b'(' => single(&mut pos, Token::LParen),
                b')' => single(&mut pos, Token::RParen),
                b',' => single(&mut pos, Token::Comma),
                b';' => single(&mut pos, Token::Semi),
                b':' => single(&mut pos, Token::Colon),
                b'.' if !src[pos..].starts_with("...") => single(&mut pos, Token::Dot),
                _ => {
                    let rest = &src[pos..];
                    match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                        Some(op) => {
                            pos += op.len();
                            Token::Op(op)
                        }
                        None => {
                            let ch = rest.chars().next().unwrap_or('?');
                            return Err(ParseError::lex(
                                filename,
                                tok_line,
                                start,
                                format!("unexpected character '{}'", ch),
                            ));
                        }
                    }
                }
            }
        };

        tokens.push(Spanned {
            token,
            span: Span::new(start, pos),
            line: tok_line,
            newline_before,
        });
        newline_before = false;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        span: Span::new(bytes.len(), bytes.len()),
        line,
        newline_before: true,
    });
    Ok(tokens)
}

/// A `/` starts a regular expression unless the previous token ends an
/// operand.
fn regex_allowed(prev: Option<&Spanned>) -> bool {
    match prev.map(|s| &s.token) {
        None => true,
        Some(Token::Word(w)) => matches!(
            w.as_str(),
            "return"
                | "typeof"
                | "case"
                | "do"
                | "else"
                | "in"
                | "of"
                | "new"
                | "delete"
                | "void"
                | "throw"
                | "instanceof"
                | "yield"
                | "await"
        ),
        Some(Token::Num(_))
        | Some(Token::Str(_))
        | Some(Token::Template(_))
        | Some(Token::Regex(_))
        | Some(Token::RParen)
        | Some(Token::RBracket) => false,
        Some(Token::Op(op)) => !matches!(*op, "++" | "--"),
        Some(_) => true,
    }
}

fn single(pos: &mut usize, token: Token) -> Token {
    *pos += 1;
    token
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80
}

fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        lex(src, "t.ts")
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn lexes_destructuring_declaration() {
        assert_eq!(
            kinds("const [a, ,] = f();"),
            vec![
                Token::Word("const".into()),
                Token::LBracket,
                Token::Word("a".into()),
                Token::Comma,
                Token::Comma,
                Token::RBracket,
                Token::Op("="),
                Token::Word("f".into()),
                Token::LParen,
                Token::RParen,
                Token::Semi,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("a === b => ...c?.d"),
            vec![
                Token::Word("a".into()),
                Token::Op("==="),
                Token::Word("b".into()),
                Token::Op("=>"),
                Token::Op("..."),
                Token::Word("c".into()),
                Token::Op("?."),
                Token::Word("d".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn spans_skip_comments_and_track_newlines() {
        let toks = lex("// lead\n  /* x */ foo\nbar", "t.ts").unwrap();
        assert_eq!(toks[0].token, Token::Word("foo".into()));
        assert_eq!(toks[0].span, Span::new(18, 21));
        assert_eq!(toks[0].line, 2);
        assert!(toks[0].newline_before);
        assert!(toks[1].newline_before);
        assert_eq!(toks[1].line, 3);
    }

    #[test]
    fn strings_keep_raw_content() {
        assert_eq!(
            kinds(r#"'{"id":1}' `t ${x}`"#),
            vec![
                Token::Str(r#"{"id":1}"#.into()),
                Token::Template("t ${x}".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex("const a = 'oops", "bad.ts").unwrap_err();
        assert_eq!(err.file, "bad.ts");
        assert_eq!(err.offset, 10);
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn regex_after_operator_division_after_operand() {
        assert_eq!(
            kinds("s.replace(/a\\/[/]b/g, x) / 2"),
            vec![
                Token::Word("s".into()),
                Token::Dot,
                Token::Word("replace".into()),
                Token::LParen,
                Token::Regex("/a\\/[/]b/g".into()),
                Token::Comma,
                Token::Word("x".into()),
                Token::RParen,
                Token::Op("/"),
                Token::Num("2".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = lex("/* never closed", "bad.ts").unwrap_err();
        assert!(err.message.contains("unterminated block comment"));
    }
}

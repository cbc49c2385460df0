use std::fmt;

// ── Diagnostic ────────────────────────────────────────────────────────────

/// Compiler diagnostic in the `0:<line>: error: <message>` driver format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Diagnostic {
    /// 1-based source line.
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(line: u32, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0:{}: error: {}", self.line, self.message)
    }
}

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    /// Numeric literal, kept as written (suffix included).
    Number(String),
    Punct(char),
    /// A preprocessor line without the leading `#`.
    Directive(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) | TokenKind::Number(s) => write!(f, "'{s}'"),
            TokenKind::Punct(c) => write!(f, "'{c}'"),
            TokenKind::Directive(d) => write!(f, "'#{d}'"),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

const PUNCTUATION: &str = "()[]{};,.+-*/%<>=!&|^~?:";

// ── Lexer ─────────────────────────────────────────────────────────────────

pub(crate) struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: u32,
    /// Only whitespace seen since the last newline.
    line_start: bool,
}

impl<'s> Lexer<'s> {
    pub(crate) fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1, line_start: true }
    }

    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.line_start = true;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), Diagnostic> {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            if self.rest().starts_with("//") {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.advance();
                }
            } else if self.rest().starts_with("/*") {
                let opened_at = self.line;
                self.advance();
                self.advance();
                loop {
                    if self.rest().starts_with("*/") {
                        self.advance();
                        self.advance();
                        break;
                    }
                    if self.advance().is_none() {
                        return Err(Diagnostic::new(opened_at, "unterminated comment"));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, Diagnostic> {
        self.skip_whitespace_and_comments()?;

        let line = self.line;
        let Some(ch) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, line });
        };

        let at_line_start = self.line_start;
        self.line_start = false;

        let kind = match ch {
            '#' if at_line_start => self.lex_directive(),
            '.' if matches!(self.peek_second(), Some(c) if c.is_ascii_digit()) => self.lex_number()?,
            c if c.is_ascii_digit() => self.lex_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_ident(),
            c if PUNCTUATION.contains(c) => {
                self.advance();
                TokenKind::Punct(c)
            }
            other => {
                return Err(Diagnostic::new(line, format!("syntax error, unexpected character {other:?}")));
            }
        };

        Ok(Token { kind, line })
    }

    // Directives run to the end of the line; a trailing backslash continues it.
    fn lex_directive(&mut self) -> TokenKind {
        self.advance(); // consume `#`
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            if c == '\\' && self.peek_second() == Some('\n') {
                self.advance();
                self.advance();
                text.push(' ');
                continue;
            }
            text.push(c);
            self.advance();
        }
        TokenKind::Directive(text.trim().to_string())
    }

    fn lex_number(&mut self) -> Result<TokenKind, Diagnostic> {
        let start = self.pos;
        let line = self.line;

        if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.advance();
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
        } else {
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
            if self.peek() == Some('.') {
                self.advance();
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    return Err(Diagnostic::new(line, "invalid floating point exponent"));
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        if self.rest().starts_with("lf") || self.rest().starts_with("LF") {
            self.advance();
            self.advance();
        } else if matches!(self.peek(), Some('f' | 'F' | 'u' | 'U')) {
            self.advance();
        }

        let text = &self.src[start..self.pos];
        if matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            return Err(Diagnostic::new(line, format!("invalid literal starting with '{text}'")));
        }

        Ok(TokenKind::Number(text.to_string()))
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        TokenKind::Ident(self.src[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Ident(s.to_string())
    }

    fn number(s: &str) -> TokenKind {
        TokenKind::Number(s.to_string())
    }

    #[test]
    fn declaration_tokens() {
        assert_eq!(
            kinds("uniform vec4 color;"),
            vec![ident("uniform"), ident("vec4"), ident("color"), TokenKind::Punct(';'), TokenKind::Eof]
        );
    }

    #[test]
    fn float_literal_forms() {
        assert_eq!(
            kinds("1.0f .5 2e-3 7u 3.0lf"),
            vec![number("1.0f"), number(".5"), number("2e-3"), number("7u"), number("3.0lf"), TokenKind::Eof]
        );
    }

    #[test]
    fn member_access_after_identifier_is_punct() {
        assert_eq!(
            kinds("aPos.x"),
            vec![ident("aPos"), TokenKind::Punct('.'), ident("x"), TokenKind::Eof]
        );
    }

    #[test]
    fn directive_runs_to_end_of_line() {
        let toks = Lexer::new("  #version 330 core\nvoid").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Directive("version 330 core".into()));
        assert_eq!(toks[1].kind, ident("void"));
        assert_eq!(toks[1].line, 2);
    }

    #[test]
    fn directive_continuation_joins_lines() {
        let toks = Lexer::new("#define A \\\n 1\nx").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Directive("define A   1".into()));
        assert_eq!(toks[1].line, 3);
    }

    #[test]
    fn comments_are_skipped_and_lines_counted() {
        let toks = Lexer::new("// one\n/* two\nthree */ x").tokenize().unwrap();
        assert_eq!(toks[0].kind, ident("x"));
        assert_eq!(toks[0].line, 3);
    }

    #[test]
    fn hash_inside_a_line_is_rejected() {
        let err = Lexer::new("x # y").tokenize().unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn stray_character_is_rejected() {
        let err = Lexer::new("void main() {\n  x = @;\n}").tokenize().unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.to_string(), "0:2: error: syntax error, unexpected character '@'");
    }

    #[test]
    fn unterminated_comment_reports_opening_line() {
        let err = Lexer::new("x\n/* never closed").tokenize().unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn literal_glued_to_identifier_is_rejected() {
        assert!(Lexer::new("1.0x").tokenize().is_err());
        assert!(Lexer::new("2e").tokenize().is_err());
    }
}

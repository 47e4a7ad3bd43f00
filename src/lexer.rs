use phf::phf_map;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::intern::Interner;
use crate::token::{Pos, Span, Token, TokenKind, MARK_CLOSE, MARK_OPEN};

pub type ScanResult<T> = Result<T, Diagnostic>;

/// Reserved words. `and`/`or` share token kinds with `&&`/`||` so the
/// parser handles one spelling; `not` stays distinct from `!` only in the
/// token stream, never in the AST.
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "expose" => TokenKind::Expose,
    "dec" => TokenKind::Dec,
    "fn" => TokenKind::Fn,
    "memo" => TokenKind::Memo,
    "return" => TokenKind::Return,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "elif" => TokenKind::Elif,
    "while" => TokenKind::While,
    "for" => TokenKind::For,
    "in" => TokenKind::In,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "as" => TokenKind::As,
    "async" => TokenKind::Async,
    "await" => TokenKind::Await,
    "try" => TokenKind::Try,
    "catch" => TokenKind::Catch,
    "finally" => TokenKind::Finally,
    "throw" => TokenKind::Throw,
    "print" => TokenKind::Print,
    "dep" => TokenKind::Dep,
    "arg" => TokenKind::Arg,
    "env" => TokenKind::Env,
    "secret" => TokenKind::Secret,
    "is" => TokenKind::Is,
    "enum" => TokenKind::Enum,
    "js" => TokenKind::Js,
    "shell" => TokenKind::Shell,
    "test" => TokenKind::Test,
    "describe" => TokenKind::Describe,
    "expect" => TokenKind::Expect,
    "assert" => TokenKind::Assert,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "null" => TokenKind::Null,
    "and" => TokenKind::AndAnd,
    "or" => TokenKind::OrOr,
    "not" => TokenKind::Not,
};

const REGEX_FLAGS: &str = "gimsuy";

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Hand-written scanner with three context-sensitive modes: string
/// interpolation capture, raw shell capture, and regex-vs-division
/// decided by one-token lookbehind.
pub struct Lexer<'s, 'i> {
    src: &'s str,
    pos: usize,
    line: u32,
    column: u32,
    interner: &'i mut Interner,
    tokens: Vec<Token>,
}

impl<'s, 'i> Lexer<'s, 'i> {
    pub fn new(src: &'s str, interner: &'i mut Interner) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            column: 1,
            interner,
            tokens: Vec::new(),
        }
    }

    /// Scan the whole source. Fails fast: the first error aborts the
    /// token stream.
    pub fn tokenize(mut self) -> ScanResult<Vec<Token>> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => self.newline(),
                '/' => self.slash()?,
                '"' | '\'' => self.string(c)?,
                '`' => self.backtick()?,
                _ if c.is_ascii_digit() => self.number()?,
                _ if is_ident_start(c) => self.identifier()?,
                _ => self.operator()?,
            }
        }
        let end = Span::new(self.src.len(), self.src.len());
        let pos = self.here();
        self.push(TokenKind::Eof, "", end, pos);
        Ok(self.tokens)
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn push(&mut self, kind: TokenKind, lexeme: &str, span: Span, pos: Pos) {
        let lexeme = self.interner.intern(lexeme);
        self.tokens.push(Token::new(kind, lexeme, span, pos));
    }

    fn error(&self, pos: Pos, span: Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Scan, pos, message).with_span(span)
    }

    // ------------------------------------------------------------------
    // Token producers
    // ------------------------------------------------------------------

    /// Runs of newlines collapse into one NEWLINE token, and the stream
    /// never starts with one.
    fn newline(&mut self) {
        let pos = self.here();
        let start = self.pos;
        self.bump();
        let follows_token = self
            .tokens
            .last()
            .map(|t| t.kind != TokenKind::Newline)
            .unwrap_or(false);
        if follows_token {
            self.push(TokenKind::Newline, "\n", Span::new(start, start + 1), pos);
        }
    }

    fn slash(&mut self) -> ScanResult<()> {
        match self.peek_at(1) {
            Some('/') => {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                Ok(())
            }
            Some('*') => self.block_comment(),
            _ => {
                let regex_ok = self
                    .tokens
                    .last()
                    .map(|t| !t.kind.ends_operand())
                    .unwrap_or(true);
                if regex_ok {
                    self.regex()
                } else {
                    let pos = self.here();
                    let start = self.pos;
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        self.push(TokenKind::SlashEq, "/=", Span::new(start, self.pos), pos);
                    } else {
                        self.push(TokenKind::Slash, "/", Span::new(start, self.pos), pos);
                    }
                    Ok(())
                }
            }
        }
    }

    /// Block comments do not nest.
    fn block_comment(&mut self) -> ScanResult<()> {
        let pos = self.here();
        let start = self.pos;
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek() == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    return Err(self.error(
                        pos,
                        Span::new(start, self.pos),
                        "unterminated block comment",
                    ))
                }
            }
        }
    }

    fn regex(&mut self) -> ScanResult<()> {
        let pos = self.here();
        let start = self.pos;
        self.bump();
        let mut pattern = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error(
                        pos,
                        Span::new(start, self.pos),
                        "unterminated regex literal",
                    ))
                }
                Some('\\') => {
                    pattern.push(self.bump().unwrap());
                    match self.peek() {
                        None | Some('\n') => {
                            return Err(self.error(
                                pos,
                                Span::new(start, self.pos),
                                "unterminated regex literal",
                            ))
                        }
                        Some(_) => pattern.push(self.bump().unwrap()),
                    }
                }
                Some('/') => {
                    self.bump();
                    break;
                }
                Some(_) => pattern.push(self.bump().unwrap()),
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if REGEX_FLAGS.contains(c) {
                flags.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = TokenKind::Regex {
            pattern: self.interner.intern(&pattern),
            flags: self.interner.intern(&flags),
        };
        let lexeme = self.src[start..self.pos].to_string();
        self.push(kind, &lexeme, Span::new(start, self.pos), pos);
        Ok(())
    }

    /// `"…"` / `'…'` with escapes. A `${…}` span flips the literal into a
    /// template-string token whose value frames the raw expression text
    /// between sentinel marks.
    fn string(&mut self, quote: char) -> ScanResult<()> {
        let pos = self.here();
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        let mut interpolated = false;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error(pos, Span::new(start, self.pos), "unterminated string"))
                }
                Some('\\') => {
                    self.bump();
                    let escaped = match self.bump() {
                        None => {
                            return Err(self.error(
                                pos,
                                Span::new(start, self.pos),
                                "unterminated string",
                            ))
                        }
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        // \\ \" \' \` \$ and anything else: the char itself
                        Some(other) => other,
                    };
                    value.push(escaped);
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    interpolated = true;
                    self.bump();
                    self.bump();
                    value.push(MARK_OPEN);
                    let mut depth = 1usize;
                    loop {
                        match self.bump() {
                            None => {
                                return Err(self.error(
                                    pos,
                                    Span::new(start, self.pos),
                                    "unterminated interpolation",
                                ))
                            }
                            Some('{') => {
                                depth += 1;
                                value.push('{');
                            }
                            Some('}') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                                value.push('}');
                            }
                            Some(c) => value.push(c),
                        }
                    }
                    value.push(MARK_CLOSE);
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some(_) => value.push(self.bump().unwrap()),
            }
        }
        let kind = if interpolated {
            TokenKind::TemplateStr(self.interner.intern(&value))
        } else {
            TokenKind::Str(self.interner.intern(&value))
        };
        let lexeme = self.src[start..self.pos].to_string();
        self.push(kind, &lexeme, Span::new(start, self.pos), pos);
        Ok(())
    }

    /// Backtick literals pass through verbatim, delimiters included; the
    /// emitter re-emits them untouched.
    fn backtick(&mut self) -> ScanResult<()> {
        let pos = self.here();
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                None => {
                    return Err(self.error(pos, Span::new(start, self.pos), "unterminated string"))
                }
                Some('`') => break,
                Some(_) => {}
            }
        }
        let raw = self.src[start..self.pos].to_string();
        let kind = TokenKind::Backtick(self.interner.intern(&raw));
        self.push(kind, &raw, Span::new(start, self.pos), pos);
        Ok(())
    }

    /// The raw textual form is preserved: `0xFF` stays `0xFF` all the way
    /// through emission.
    fn number(&mut self) -> ScanResult<()> {
        let pos = self.here();
        let start = self.pos;
        let radix = if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('b') | Some('B') => Some(2),
                Some('o') | Some('O') => Some(8),
                _ => None,
            }
        } else {
            None
        };

        if let Some(radix) = radix {
            self.bump();
            self.bump();
            let mut digits = 0;
            while let Some(c) = self.peek() {
                if c.is_digit(radix) {
                    digits += 1;
                    self.bump();
                } else {
                    break;
                }
            }
            if digits == 0 {
                return Err(self.error(pos, Span::new(start, self.pos), "malformed numeric literal"));
            }
        } else {
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.bump();
            }
            // Fraction only when a digit follows the dot, so `0..5` stays a range.
            if self.peek() == Some('.')
                && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
            {
                self.bump();
                while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    self.bump();
                }
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                let exponent_ok = match self.peek_at(1) {
                    Some('+') | Some('-') => self
                        .peek_at(2)
                        .map(|c| c.is_ascii_digit())
                        .unwrap_or(false),
                    Some(c) => c.is_ascii_digit(),
                    None => false,
                };
                if exponent_ok {
                    self.bump();
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.bump();
                    }
                    while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        self.bump();
                    }
                }
            }
        }

        let raw = self.src[start..self.pos].to_string();
        let kind = TokenKind::Number(self.interner.intern(&raw));
        self.push(kind, &raw, Span::new(start, self.pos), pos);
        Ok(())
    }

    fn identifier(&mut self) -> ScanResult<()> {
        let pos = self.here();
        let start = self.pos;
        while self.peek().map(is_ident_continue).unwrap_or(false) {
            self.bump();
        }
        let text = self.src[start..self.pos].to_string();
        let span = Span::new(start, self.pos);
        match KEYWORDS.get(text.as_str()) {
            Some(&kind) => {
                self.push(kind, &text, span, pos);
                if kind == TokenKind::Shell {
                    self.shell_tail()?;
                }
            }
            None => {
                let sym = self.interner.intern(&text);
                self.push(TokenKind::Identifier(sym), &text, span, pos);
            }
        }
        Ok(())
    }

    /// Raw-capture mode entered right after the `shell` keyword: an
    /// optional `(id, id)` input group is tokenized normally, then the
    /// braced body is captured verbatim with brace-depth tracking.
    fn shell_tail(&mut self) -> ScanResult<()> {
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r')) {
            self.bump();
        }

        if self.peek() == Some('(') {
            let pos = self.here();
            let start = self.pos;
            self.bump();
            self.push(TokenKind::LParen, "(", Span::new(start, self.pos), pos);
            loop {
                while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r') | Some('\n')) {
                    self.bump();
                }
                let pos = self.here();
                let start = self.pos;
                match self.peek() {
                    Some(')') => {
                        self.bump();
                        self.push(TokenKind::RParen, ")", Span::new(start, self.pos), pos);
                        break;
                    }
                    Some(',') => {
                        self.bump();
                        self.push(TokenKind::Comma, ",", Span::new(start, self.pos), pos);
                    }
                    Some(c) if is_ident_start(c) => {
                        while self.peek().map(is_ident_continue).unwrap_or(false) {
                            self.bump();
                        }
                        let text = self.src[start..self.pos].to_string();
                        let sym = self.interner.intern(&text);
                        self.push(
                            TokenKind::Identifier(sym),
                            &text,
                            Span::new(start, self.pos),
                            pos,
                        );
                    }
                    _ => {
                        return Err(self.error(
                            pos,
                            Span::new(start, self.pos + 1),
                            "expected identifier in shell input list",
                        ))
                    }
                }
            }
        }

        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r') | Some('\n')) {
            self.bump();
        }

        let pos = self.here();
        let start = self.pos;
        if self.peek() != Some('{') {
            return Err(self.error(
                pos,
                Span::new(start, start + 1),
                "expected '{' after shell",
            ));
        }
        self.bump();
        self.push(TokenKind::LBrace, "{", Span::new(start, self.pos), pos);

        let body_start = self.pos;
        let body_pos = self.here();
        let mut depth = 1usize;
        let body_end;
        loop {
            let before = self.pos;
            match self.bump() {
                None => {
                    return Err(self.error(
                        body_pos,
                        Span::new(body_start, self.pos),
                        "unterminated shell block",
                    ))
                }
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        body_end = before;
                        break;
                    }
                }
                Some(_) => {}
            }
        }

        let text = self.src[body_start..body_end].trim().to_string();
        let sym = self.interner.intern(&text);
        self.push(
            TokenKind::ShellContent(sym),
            &text,
            Span::new(body_start, body_end),
            body_pos,
        );
        let close_pos = Pos::new(self.line, self.column.saturating_sub(1).max(1));
        self.push(
            TokenKind::RBrace,
            "}",
            Span::new(body_end, body_end + 1),
            close_pos,
        );
        Ok(())
    }

    fn operator(&mut self) -> ScanResult<()> {
        let pos = self.here();
        let start = self.pos;
        let c = self.bump().unwrap();
        let mut two = |lexer: &mut Self, next: char, yes: TokenKind, yes_text: &str, no: TokenKind, no_text: &str| {
            if lexer.peek() == Some(next) {
                lexer.bump();
                lexer.push(yes, yes_text, Span::new(start, lexer.pos), pos);
            } else {
                lexer.push(no, no_text, Span::new(start, lexer.pos), pos);
            }
        };

        match c {
            '+' => two(self, '=', TokenKind::PlusEq, "+=", TokenKind::Plus, "+"),
            '%' => self.push(TokenKind::Percent, "%", Span::new(start, self.pos), pos),
            '?' => self.push(TokenKind::Question, "?", Span::new(start, self.pos), pos),
            ';' => self.push(TokenKind::Semicolon, ";", Span::new(start, self.pos), pos),
            ',' => self.push(TokenKind::Comma, ",", Span::new(start, self.pos), pos),
            '(' => self.push(TokenKind::LParen, "(", Span::new(start, self.pos), pos),
            ')' => self.push(TokenKind::RParen, ")", Span::new(start, self.pos), pos),
            '{' => self.push(TokenKind::LBrace, "{", Span::new(start, self.pos), pos),
            '}' => self.push(TokenKind::RBrace, "}", Span::new(start, self.pos), pos),
            '[' => self.push(TokenKind::LBracket, "[", Span::new(start, self.pos), pos),
            ']' => self.push(TokenKind::RBracket, "]", Span::new(start, self.pos), pos),
            '-' => match self.peek() {
                Some('>') => {
                    self.bump();
                    self.push(TokenKind::Arrow, "->", Span::new(start, self.pos), pos);
                }
                Some('=') => {
                    self.bump();
                    self.push(TokenKind::MinusEq, "-=", Span::new(start, self.pos), pos);
                }
                _ => self.push(TokenKind::Minus, "-", Span::new(start, self.pos), pos),
            },
            '*' => match self.peek() {
                Some('*') => {
                    self.bump();
                    self.push(TokenKind::StarStar, "**", Span::new(start, self.pos), pos);
                }
                Some('=') => {
                    self.bump();
                    self.push(TokenKind::StarEq, "*=", Span::new(start, self.pos), pos);
                }
                _ => self.push(TokenKind::Star, "*", Span::new(start, self.pos), pos),
            },
            '=' => match self.peek() {
                Some('=') => {
                    self.bump();
                    self.push(TokenKind::EqEq, "==", Span::new(start, self.pos), pos);
                }
                Some('>') => {
                    self.bump();
                    self.push(TokenKind::FatArrow, "=>", Span::new(start, self.pos), pos);
                }
                _ => self.push(TokenKind::Eq, "=", Span::new(start, self.pos), pos),
            },
            '!' => two(self, '=', TokenKind::NotEq, "!=", TokenKind::Bang, "!"),
            '<' => match self.peek() {
                Some('=') => {
                    self.bump();
                    self.push(TokenKind::LtEq, "<=", Span::new(start, self.pos), pos);
                }
                Some('<') => {
                    self.bump();
                    self.push(TokenKind::Shl, "<<", Span::new(start, self.pos), pos);
                }
                _ => self.push(TokenKind::Lt, "<", Span::new(start, self.pos), pos),
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.bump();
                    self.push(TokenKind::GtEq, ">=", Span::new(start, self.pos), pos);
                }
                Some('>') => {
                    self.bump();
                    self.push(TokenKind::Shr, ">>", Span::new(start, self.pos), pos);
                }
                _ => self.push(TokenKind::Gt, ">", Span::new(start, self.pos), pos),
            },
            '&' => {
                if self.peek() == Some('&') {
                    self.bump();
                    self.push(TokenKind::AndAnd, "&&", Span::new(start, self.pos), pos);
                } else {
                    return Err(self.error(
                        pos,
                        Span::new(start, self.pos),
                        "disallowed bitwise operator '&'; use the bitwise module",
                    ));
                }
            }
            '|' => two(self, '|', TokenKind::OrOr, "||", TokenKind::Bar, "|"),
            '~' => two(self, '>', TokenKind::PipeArrow, "~>", TokenKind::Tilde, "~"),
            '^' => {
                return Err(self.error(
                    pos,
                    Span::new(start, self.pos),
                    "disallowed bitwise operator '^'; use the bitwise module",
                ))
            }
            ':' => two(self, ':', TokenKind::ColonColon, "::", TokenKind::Colon, ":"),
            '.' => {
                if self.peek() == Some('.') {
                    self.bump();
                    if self.peek() == Some('.') {
                        self.bump();
                        self.push(TokenKind::Ellipsis, "...", Span::new(start, self.pos), pos);
                    } else {
                        self.push(TokenKind::DotDot, "..", Span::new(start, self.pos), pos);
                    }
                } else {
                    self.push(TokenKind::Dot, ".", Span::new(start, self.pos), pos);
                }
            }
            other => {
                return Err(self.error(
                    pos,
                    Span::new(start, self.pos),
                    format!("disallowed character '{}'", other),
                ))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MARK_CLOSE;

    fn scan(source: &str) -> Vec<Token> {
        let mut interner = Interner::new();
        Lexer::new(source, &mut interner)
            .tokenize()
            .expect("scan should succeed")
    }

    fn scan_kinds(source: &str) -> Vec<TokenKind> {
        scan(source).into_iter().map(|t| t.kind).collect()
    }

    fn scan_err(source: &str) -> Diagnostic {
        let mut interner = Interner::new();
        Lexer::new(source, &mut interner)
            .tokenize()
            .expect_err("scan should fail")
    }

    #[test]
    fn keywords_and_identifiers() {
        let mut interner = Interner::new();
        let tokens = Lexer::new("dec total = 1", &mut interner).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Dec);
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(_)));
        assert_eq!(tokens[2].kind, TokenKind::Eq);
        assert!(matches!(tokens[3].kind, TokenKind::Number(_)));
        assert_eq!(tokens[4].kind, TokenKind::Eof);
    }

    #[test]
    fn word_operators_share_kinds_with_symbols() {
        let kinds = scan_kinds("a and b or not c");
        assert!(kinds.contains(&TokenKind::AndAnd));
        assert!(kinds.contains(&TokenKind::OrOr));
        assert!(kinds.contains(&TokenKind::Not));
    }

    #[test]
    fn numeric_radix_is_preserved_in_raw_form() {
        let mut interner = Interner::new();
        let tokens = Lexer::new("0xFF 0b1010 0o17 1.5e-3 42", &mut interner)
            .tokenize()
            .unwrap();
        let raws: Vec<&str> = tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Number(sym) => Some(interner.resolve(sym)),
                _ => None,
            })
            .collect();
        assert_eq!(raws, vec!["0xFF", "0b1010", "0o17", "1.5e-3", "42"]);
    }

    #[test]
    fn range_after_integer_is_not_a_fraction() {
        let kinds = scan_kinds("0..5");
        assert!(matches!(kinds[0], TokenKind::Number(_)));
        assert_eq!(kinds[1], TokenKind::DotDot);
        assert!(matches!(kinds[2], TokenKind::Number(_)));
    }

    #[test]
    fn newline_runs_collapse_and_never_lead() {
        let kinds = scan_kinds("\n\n\ndec a = 1\n\n\ndec b = 2\n");
        let newlines = kinds
            .iter()
            .filter(|k| **k == TokenKind::Newline)
            .count();
        assert_eq!(newlines, 2);
        assert_ne!(kinds[0], TokenKind::Newline);
    }

    #[test]
    fn plain_string_value_is_unescaped() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(r#""a\tb\n""#, &mut interner).tokenize().unwrap();
        match tokens[0].kind {
            TokenKind::Str(sym) => assert_eq!(interner.resolve(sym), "a\tb\n"),
            ref other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn interpolation_becomes_template_with_marks() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(r#""sum: ${a + b}!""#, &mut interner)
            .tokenize()
            .unwrap();
        match tokens[0].kind {
            TokenKind::TemplateStr(sym) => {
                let value = interner.resolve(sym);
                assert_eq!(value, format!("sum: {}a + b{}!", MARK_OPEN, MARK_CLOSE));
            }
            ref other => panic!("expected template string, got {:?}", other),
        }
    }

    #[test]
    fn escaped_dollar_suppresses_interpolation() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(r#""cost: \${price}""#, &mut interner)
            .tokenize()
            .unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Str(_)));
    }

    #[test]
    fn interpolation_tracks_brace_depth() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(r#""v: ${obj.get({depth: 2})}""#, &mut interner)
            .tokenize()
            .unwrap();
        match tokens[0].kind {
            TokenKind::TemplateStr(sym) => {
                let value = interner.resolve(sym);
                assert!(value.contains("obj.get({depth: 2})"), "{value}");
            }
            ref other => panic!("expected template string, got {:?}", other),
        }
    }

    #[test]
    fn backtick_literal_keeps_delimiters() {
        let mut interner = Interner::new();
        let tokens = Lexer::new("`raw ${not} parsed`", &mut interner)
            .tokenize()
            .unwrap();
        match tokens[0].kind {
            TokenKind::Backtick(sym) => {
                assert_eq!(interner.resolve(sym), "`raw ${not} parsed`");
            }
            ref other => panic!("expected backtick literal, got {:?}", other),
        }
    }

    #[test]
    fn regex_at_statement_start() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(r"/ab+c/gi", &mut interner).tokenize().unwrap();
        match tokens[0].kind {
            TokenKind::Regex { pattern, flags } => {
                assert_eq!(interner.resolve(pattern), "ab+c");
                assert_eq!(interner.resolve(flags), "gi");
            }
            ref other => panic!("expected regex, got {:?}", other),
        }
    }

    #[test]
    fn slash_after_operand_is_division() {
        let kinds = scan_kinds("a / b");
        assert!(kinds.contains(&TokenKind::Slash));
        let kinds = scan_kinds("(a) / 2");
        assert!(kinds.contains(&TokenKind::Slash));
    }

    #[test]
    fn slash_after_operator_is_regex() {
        let kinds = scan_kinds("x = /ab/");
        assert!(kinds.iter().any(|k| matches!(k, TokenKind::Regex { .. })));
    }

    #[test]
    fn regex_with_escaped_slash() {
        let mut interner = Interner::new();
        let tokens = Lexer::new(r"x = /a\/b/", &mut interner).tokenize().unwrap();
        match tokens[2].kind {
            TokenKind::Regex { pattern, .. } => {
                assert_eq!(interner.resolve(pattern), r"a\/b");
            }
            ref other => panic!("expected regex, got {:?}", other),
        }
    }

    #[test]
    fn newline_inside_regex_is_an_error() {
        let err = scan_err("x = /ab\ncd/");
        assert!(err.message.contains("unterminated regex"), "{}", err.message);
    }

    #[test]
    fn shell_block_raw_capture() {
        let mut interner = Interner::new();
        let tokens = Lexer::new("shell(host) {\n  curl -s $host | wc -l\n}", &mut interner)
            .tokenize()
            .unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::Shell);
        assert_eq!(kinds[1], TokenKind::LParen);
        assert!(matches!(kinds[2], TokenKind::Identifier(_)));
        assert_eq!(kinds[3], TokenKind::RParen);
        assert_eq!(kinds[4], TokenKind::LBrace);
        match kinds[5] {
            TokenKind::ShellContent(sym) => {
                assert_eq!(interner.resolve(sym), "curl -s $host | wc -l");
            }
            ref other => panic!("expected shell content, got {:?}", other),
        }
        assert_eq!(kinds[6], TokenKind::RBrace);
    }

    #[test]
    fn shell_body_tracks_nested_braces() {
        let mut interner = Interner::new();
        let tokens = Lexer::new("shell { awk '{print $1}' f }", &mut interner)
            .tokenize()
            .unwrap();
        match tokens[2].kind {
            TokenKind::ShellContent(sym) => {
                assert_eq!(interner.resolve(sym), "awk '{print $1}' f");
            }
            ref other => panic!("expected shell content, got {:?}", other),
        }
    }

    #[test]
    fn js_blocks_are_not_raw_captured() {
        let kinds = scan_kinds("js { console.log(1) }");
        assert_eq!(kinds[0], TokenKind::Js);
        assert!(!kinds.iter().any(|k| matches!(k, TokenKind::ShellContent(_))));
    }

    #[test]
    fn lone_ampersand_is_rejected() {
        let err = scan_err("a & b");
        assert!(err.message.contains("disallowed bitwise"), "{}", err.message);
        let err = scan_err("a ^ b");
        assert!(err.message.contains("disallowed bitwise"), "{}", err.message);
    }

    #[test]
    fn double_ampersand_is_fine() {
        let kinds = scan_kinds("a && b");
        assert!(kinds.contains(&TokenKind::AndAnd));
    }

    #[test]
    fn multi_char_operators() {
        let kinds = scan_kinds("a ~> f >> g ** 2 ... xs .. y :: z");
        for expected in [
            TokenKind::PipeArrow,
            TokenKind::Shr,
            TokenKind::StarStar,
            TokenKind::Ellipsis,
            TokenKind::DotDot,
            TokenKind::ColonColon,
        ] {
            assert!(kinds.contains(&expected), "missing {:?}", expected);
        }
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = scan_err("dec a = 1 /* no close");
        assert!(err.message.contains("unterminated block comment"));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = scan_err("dec s = \"open");
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn tokens_carry_line_and_column() {
        let tokens = scan("dec a = 1\ndec b = 2");
        let second_dec = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Dec && t.pos.line == 2)
            .expect("dec on line 2");
        assert_eq!(second_dec.pos.column, 1);
    }

    #[test]
    fn round_trip_from_lexemes() {
        let mut interner = Interner::new();
        let source = "dec x = 0xFF ~> double";
        let tokens = Lexer::new(source, &mut interner).tokenize().unwrap();
        let rebuilt: Vec<String> = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| interner.resolve(t.lexeme).to_string())
            .collect();
        let rebuilt = rebuilt.join(" ");
        let again = Lexer::new(&rebuilt, &mut interner).tokenize().unwrap();
        let kinds_a: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        let kinds_b: Vec<TokenKind> = again.iter().map(|t| t.kind).collect();
        assert_eq!(kinds_a, kinds_b);
    }
}

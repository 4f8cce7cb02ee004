//! Lexer for the Haskell subset.
//!
//! Produces a flat vector of located tokens. Qualified names (`M.f`,
//! `Data.List.Cons`) are lexed as single tokens because `.` is not an
//! operator in the subset. Line comments start with `--`, block comments
//! `{- -}` nest.

use crate::ast::Span;
use crate::error::Result;
use crate::err_parse_at;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Module,
    Where,
    Import,
    Data,
    Type,
    Case,
    Of,
    If,
    Then,
    Else,
    Undefined,
    ErrorKw,

    /// Unqualified variable or type-variable identifier
    LowerIdent(String),
    /// Unqualified constructor or module-name identifier
    UpperIdent(String),
    /// `M.f`, a qualified variable
    QualLower(String, String),
    /// `M.C`, a qualified constructor
    QualUpper(String, String),
    /// Operator symbol such as `+` or `==`
    Operator(String),
    Int(i64),
    StringLit(String),

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Backslash,
    Arrow,
    DoubleColon,
    Equals,
    Pipe,
    Underscore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub span: Span,
}

const SYMBOL_CHARS: &str = "!#$%&*+./<=>?@\\^|-~:";

fn is_symbol_char(c: char) -> bool {
    SYMBOL_CHARS.contains(c)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\''
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn here(&self) -> Span {
        Span::new(self.line, self.col, self.line, self.col)
    }

    /// Span from `start` up to (exclusive) the current position.
    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start_line, start.start_col, self.line, self.col)
    }

    fn tokenize(&mut self) -> Result<Vec<LocatedToken>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            if c == '\n' || c == ' ' || c == '\t' || c == '\r' {
                self.bump();
                continue;
            }

            // Line comments: `--` followed by anything up to end of line.
            if c == '-' && self.starts_with_dashes() {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }

            // Nested block comments.
            if c == '{' && self.second_char() == Some('-') {
                self.skip_block_comment()?;
                continue;
            }

            let start = self.here();
            let token = self.next_token(start)?;
            let span = self.span_from(start);
            tokens.push(LocatedToken { token, span });
        }

        Ok(tokens)
    }

    /// True when the upcoming characters are a `--` comment opener (and not
    /// a longer operator; the fixed operator set has none starting with
    /// `--`, so two dashes always open a comment).
    fn starts_with_dashes(&mut self) -> bool {
        let mut clone = self.chars.clone();
        clone.next() == Some('-') && clone.next() == Some('-')
    }

    fn second_char(&mut self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.next()
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let start = self.here();
        self.bump(); // {
        self.bump(); // -
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some('{') if self.peek() == Some('-') => {
                    self.bump();
                    depth += 1;
                }
                Some('-') if self.peek() == Some('}') => {
                    self.bump();
                    depth -= 1;
                }
                Some(_) => {}
                None => return Err(err_parse_at!(start, "unterminated block comment")),
            }
        }
        Ok(())
    }

    fn next_token(&mut self, start: Span) -> Result<Token> {
        let c = self.peek().expect("next_token called at end of input");

        match c {
            '(' => {
                self.bump();
                Ok(Token::LParen)
            }
            ')' => {
                self.bump();
                Ok(Token::RParen)
            }
            '[' => {
                self.bump();
                Ok(Token::LBracket)
            }
            ']' => {
                self.bump();
                Ok(Token::RBracket)
            }
            '{' => {
                self.bump();
                Ok(Token::LBrace)
            }
            '}' => {
                self.bump();
                Ok(Token::RBrace)
            }
            ',' => {
                self.bump();
                Ok(Token::Comma)
            }
            ';' => {
                self.bump();
                Ok(Token::Semicolon)
            }
            '"' => self.lex_string(start),
            _ if c.is_ascii_digit() => self.lex_int(start),
            _ if is_ident_start(c) => Ok(self.lex_ident()),
            _ if is_symbol_char(c) => Ok(self.lex_operator()),
            _ => Err(err_parse_at!(start, "unexpected character {:?}", c)),
        }
    }

    fn lex_string(&mut self, start: Span) -> Result<Token> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::StringLit(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some(other) => {
                        return Err(err_parse_at!(start, "unsupported escape sequence \\{}", other))
                    }
                    None => return Err(err_parse_at!(start, "unterminated string literal")),
                },
                Some('\n') | None => return Err(err_parse_at!(start, "unterminated string literal")),
                Some(other) => value.push(other),
            }
        }
    }

    fn lex_int(&mut self, start: Span) -> Result<Token> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        digits
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| err_parse_at!(start, "integer literal out of range: {}", digits))
    }

    fn lex_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    fn lex_ident(&mut self) -> Token {
        let word = self.lex_word();

        if word.chars().next().map(|c| c.is_ascii_uppercase()) == Some(true) {
            // Possibly a qualified name: `M.f`, `M.C`, `Data.List.map`.
            let mut qualifier = word;
            while self.peek() == Some('.') && self.second_char().map(is_ident_start) == Some(true) {
                self.bump(); // .
                let next = self.lex_word();
                let upper = next.chars().next().map(|c| c.is_ascii_uppercase()) == Some(true);
                if upper {
                    // Could be a deeper module segment; decide when we see
                    // what follows.
                    if self.peek() == Some('.') && self.second_char().map(is_ident_start) == Some(true)
                    {
                        qualifier.push('.');
                        qualifier.push_str(&next);
                        continue;
                    }
                    return Token::QualUpper(qualifier, next);
                }
                // Keywords cannot be qualified; let the parser report
                // `M.case` and friends as unexpected tokens.
                return Token::QualLower(qualifier, next);
            }
            return Token::UpperIdent(qualifier);
        }

        if word == "_" {
            return Token::Underscore;
        }
        match keyword(&word) {
            Some(token) => token,
            None => Token::LowerIdent(word),
        }
    }

    fn lex_operator(&mut self) -> Token {
        let mut op = String::new();
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                op.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match op.as_str() {
            "->" => Token::Arrow,
            "::" => Token::DoubleColon,
            "=" => Token::Equals,
            "|" => Token::Pipe,
            "\\" => Token::Backslash,
            _ => Token::Operator(op),
        }
    }
}

fn keyword(word: &str) -> Option<Token> {
    match word {
        "module" => Some(Token::Module),
        "where" => Some(Token::Where),
        "import" => Some(Token::Import),
        "data" => Some(Token::Data),
        "type" => Some(Token::Type),
        "case" => Some(Token::Case),
        "of" => Some(Token::Of),
        "if" => Some(Token::If),
        "then" => Some(Token::Then),
        "else" => Some(Token::Else),
        "undefined" => Some(Token::Undefined),
        "error" => Some(Token::ErrorKw),
        _ => None,
    }
}

/// Tokenize a complete source file.
pub fn tokenize(source: &str) -> Result<Vec<LocatedToken>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("source should tokenize")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            tokens("case xs of"),
            vec![Token::Case, Token::LowerIdent("xs".to_string()), Token::Of]
        );
    }

    #[test]
    fn test_operators_are_maximal_munch() {
        assert_eq!(
            tokens("a <= b"),
            vec![
                Token::LowerIdent("a".to_string()),
                Token::Operator("<=".to_string()),
                Token::LowerIdent("b".to_string()),
            ]
        );
        assert_eq!(tokens("->")[0], Token::Arrow);
        assert_eq!(tokens("::")[0], Token::DoubleColon);
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            tokens("Queue.enqueue"),
            vec![Token::QualLower("Queue".to_string(), "enqueue".to_string())]
        );
        assert_eq!(
            tokens("Data.List.Cons"),
            vec![Token::QualUpper("Data.List".to_string(), "Cons".to_string())]
        );
    }

    #[test]
    fn test_primed_identifiers() {
        assert_eq!(tokens("xs'"), vec![Token::LowerIdent("xs'".to_string())]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(tokens("1 -- rest\n2"), vec![Token::Int(1), Token::Int(2)]);
        assert_eq!(tokens("{- a {- b -} c -} 3"), vec![Token::Int(3)]);
    }

    #[test]
    fn test_unterminated_block_comment_is_an_error() {
        assert!(tokenize("{- never closed").is_err());
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens("\"a\\nb\""),
            vec![Token::StringLit("a\nb".to_string())]
        );
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let located = tokenize("f =\n  g").expect("tokenizes");
        assert_eq!(located[0].span.start_line, 1);
        assert_eq!(located[0].span.start_col, 1);
        assert_eq!(located[2].span.start_line, 2);
        assert_eq!(located[2].span.start_col, 3);
    }
}

use super::token::{Pos, Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    idx: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(code: &str) -> Self {
        Self {
            chars: code.chars().collect(),
            idx: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(ch0) = self.peek_nth(0) {
            // 0. Skip whitespace
            if ch0.is_whitespace() {
                self.consume();
                continue;
            }

            let pos = Pos {
                line: self.line,
                col: self.col,
            };

            // 1. Preprocessor directives are not part of the language, skip the line
            if ch0 == '#' {
                while let Some(ch) = self.peek_nth(0) {
                    if ch == '\n' {
                        break;
                    }
                    self.consume();
                }
                continue;
            }

            // 2. Comments
            if ch0 == '/' && self.peek_nth(1) == Some('/') {
                self.consume();
                self.consume();
                let mut comment = String::new();
                while let Some(ch) = self.peek_nth(0) {
                    if ch == '\n' {
                        break;
                    }
                    comment.push(ch);
                    self.consume();
                }
                tokens.push(Token::new(TokenKind::Comment(comment.trim().to_string()), pos));
                continue;
            }
            if ch0 == '/' && self.peek_nth(1) == Some('*') {
                self.consume();
                self.consume();
                let mut comment = String::new();
                while let Some(ch) = self.peek_nth(0) {
                    if ch == '*' && self.peek_nth(1) == Some('/') {
                        self.consume();
                        self.consume();
                        break;
                    }
                    comment.push(ch);
                    self.consume();
                }
                tokens.push(Token::new(TokenKind::Comment(comment.trim().to_string()), pos));
                continue;
            }

            // 3. Double character token
            if let Some(ch1) = self.peek_nth(1) {
                if let Some(kind) = double_char_token(ch0, ch1) {
                    self.consume();
                    self.consume();
                    tokens.push(Token::new(kind, pos));
                    continue;
                }
            }

            // 4. Single character token
            if let Some(kind) = single_char_token(ch0) {
                self.consume();
                tokens.push(Token::new(kind, pos));
                continue;
            }

            // 5. Number literal
            if ch0.is_ascii_digit() {
                tokens.push(Token::new(self.scan_number(), pos));
                continue;
            }

            // 6. Char literal
            if ch0 == '\'' {
                tokens.push(Token::new(self.scan_char(), pos));
                continue;
            }

            // 7. String literal
            if ch0 == '"' {
                tokens.push(Token::new(self.scan_text(), pos));
                continue;
            }

            // 8. Identifier or keyword
            if ch0.is_ascii_alphabetic() || ch0 == '_' {
                tokens.push(Token::new(self.scan_word(), pos));
                continue;
            }

            // Anything else is an error token
            self.consume();
            tokens.push(Token::new(TokenKind::Error(format!("{ch0}")), pos));
        }
        tokens
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

impl Lexer {
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.get(self.idx + n).copied()
    }

    fn consume(&mut self) -> Option<char> {
        let ch = self.chars.get(self.idx).copied();
        if let Some(ch) = ch {
            self.idx += 1;
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        ch
    }

    fn consume_if<F: Fn(char) -> bool>(&mut self, cond: F) -> Option<char> {
        match self.peek_nth(0) {
            Some(ch) if cond(ch) => self.consume(),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Scanners
// ----------------------------------------------------------------------------

impl Lexer {
    fn scan_number(&mut self) -> TokenKind {
        let ch0 = self.consume().unwrap_or('0');
        if ch0 == '0' && matches!(self.peek_nth(0), Some('x') | Some('X')) {
            self.consume();
            let mut lexeme = String::new();
            while let Some(ch) = self.consume_if(|ch| ch.is_ascii_hexdigit()) {
                lexeme.push(ch);
            }
            return match i64::from_str_radix(&lexeme, 16) {
                Ok(num) => TokenKind::Number(num),
                Err(_) => TokenKind::Error(format!("0x{lexeme}")),
            };
        }
        let mut lexeme = String::from(ch0);
        while let Some(ch) = self.consume_if(|ch| ch.is_ascii_digit()) {
            lexeme.push(ch);
        }
        match lexeme.parse::<i64>() {
            Ok(num) => TokenKind::Number(num),
            Err(_) => TokenKind::Error(lexeme),
        }
    }

    fn scan_char(&mut self) -> TokenKind {
        self.consume(); // opening '
        let ch = match self.consume() {
            Some('\\') => match self.consume() {
                Some(esc) => match unescape(esc) {
                    Some(ch) => ch,
                    None => return TokenKind::Error(format!("\\{esc}")),
                },
                None => return TokenKind::Error(String::from("\\")),
            },
            Some(ch) => ch,
            None => return TokenKind::Error(String::from("'")),
        };
        match self.consume() {
            Some('\'') => TokenKind::Char(ch),
            _ => TokenKind::Error(format!("'{ch}")),
        }
    }

    fn scan_text(&mut self) -> TokenKind {
        self.consume(); // opening "
        let mut lexeme = String::new();
        loop {
            match self.consume() {
                Some('"') => break,
                Some('\\') => match self.consume().and_then(unescape) {
                    Some(ch) => lexeme.push(ch),
                    None => return TokenKind::Error(lexeme),
                },
                Some(ch) => lexeme.push(ch),
                None => return TokenKind::Error(lexeme),
            }
        }
        TokenKind::Text(lexeme)
    }

    fn scan_word(&mut self) -> TokenKind {
        let mut lexeme = String::new();
        while let Some(ch) =
            self.consume_if(|ch| matches!(ch, '_' | '0'..='9' | 'a'..='z' | 'A'..='Z'))
        {
            lexeme.push(ch);
        }
        match keyword(&lexeme) {
            Some(kind) => kind,
            None => TokenKind::Ident(lexeme),
        }
    }
}

fn unescape(ch: char) -> Option<char> {
    match ch {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        _ => None,
    }
}

fn double_char_token(ch0: char, ch1: char) -> Option<TokenKind> {
    match (ch0, ch1) {
        ('=', '=') => Some(TokenKind::EqualEqual),
        ('!', '=') => Some(TokenKind::ExclEqual),
        ('<', '=') => Some(TokenKind::LAngleEqual),
        ('>', '=') => Some(TokenKind::RAngleEqual),
        ('&', '&') => Some(TokenKind::AmpAmp),
        ('|', '|') => Some(TokenKind::PipePipe),
        _ => None,
    }
}

fn single_char_token(ch: char) -> Option<TokenKind> {
    match ch {
        '=' => Some(TokenKind::Equal),
        '+' => Some(TokenKind::Plus),
        '-' => Some(TokenKind::Minus),
        '*' => Some(TokenKind::Star),
        '/' => Some(TokenKind::Slash),
        '%' => Some(TokenKind::Percent),
        '&' => Some(TokenKind::Amp),
        '<' => Some(TokenKind::LAngle),
        '>' => Some(TokenKind::RAngle),
        '.' => Some(TokenKind::Dot),
        ',' => Some(TokenKind::Comma),
        ';' => Some(TokenKind::Semicolon),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        '{' => Some(TokenKind::LCurly),
        '}' => Some(TokenKind::RCurly),
        _ => None,
    }
}

fn keyword(s: &str) -> Option<TokenKind> {
    match s {
        "int" => Some(TokenKind::KwInt),
        "char" => Some(TokenKind::KwChar),
        "void" => Some(TokenKind::KwVoid),
        "struct" => Some(TokenKind::KwStruct),
        "class" => Some(TokenKind::KwClass),
        "extends" => Some(TokenKind::KwExtends),
        "sizeof" => Some(TokenKind::KwSizeof),
        "new" => Some(TokenKind::KwNew),
        "if" => Some(TokenKind::KwIf),
        "else" => Some(TokenKind::KwElse),
        "while" => Some(TokenKind::KwWhile),
        "return" => Some(TokenKind::KwReturn),
        "break" => Some(TokenKind::KwBreak),
        "continue" => Some(TokenKind::KwContinue),
        _ => None,
    }
}

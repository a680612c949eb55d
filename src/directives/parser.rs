//! Text syntax for directive lists.
//!
//! ```text
//! XPATH "/github"; ADD 'test'; ATTR "id", "1"; SET "hello, world"; UP;
//! ```
//!
//! Keywords are case-insensitive. Arguments are single- or double-quoted
//! strings with backslash escapes, separated by commas. Every directive ends
//! with `;`, which may be omitted after the last one. `STRICT` also accepts a
//! bare number.

use super::{Directive, Directives};
use crate::error::{Result, StoreError};

pub(super) fn parse(text: &str) -> Result<Directives> {
    let mut lexer = Lexer {
        chars: text.chars().collect(),
        pos: 0,
    };
    let mut items = Vec::new();

    loop {
        lexer.skip_whitespace();
        if lexer.at_end() {
            break;
        }

        let keyword = lexer.keyword()?;
        let args = lexer.arguments()?;
        items.push(build(&keyword, args).map_err(|msg| lexer.error(&msg))?);

        lexer.skip_whitespace();
        if !lexer.eat(';') && !lexer.at_end() {
            return Err(lexer.error("expected ';'"));
        }
    }

    Ok(items.into_iter().collect())
}

fn build(keyword: &str, args: Vec<String>) -> std::result::Result<Directive, String> {
    let upper = keyword.to_ascii_uppercase();
    let arity = match upper.as_str() {
        "UP" | "REMOVE" | "PUSH" | "POP" => 0,
        "XPATH" | "ADD" | "ADDIF" | "SET" | "STRICT" => 1,
        "ATTR" => 2,
        _ => return Err(format!("unknown directive '{}'", keyword)),
    };
    if args.len() != arity {
        return Err(format!(
            "{} takes {} argument(s), got {}",
            upper,
            arity,
            args.len()
        ));
    }

    let mut args = args.into_iter();
    let mut next = || args.next().unwrap_or_default();
    Ok(match upper.as_str() {
        "XPATH" => Directive::XPath(next()),
        "ADD" => Directive::Add(next()),
        "ADDIF" => Directive::AddIf(next()),
        "SET" => Directive::Set(next()),
        "ATTR" => {
            let name = next();
            let value = next();
            Directive::Attr { name, value }
        }
        "STRICT" => {
            let raw = next();
            let count = raw
                .trim()
                .parse()
                .map_err(|_| format!("STRICT expects a number, got '{}'", raw))?;
            Directive::Strict(count)
        }
        "UP" => Directive::Up,
        "REMOVE" => Directive::Remove,
        "PUSH" => Directive::Push,
        _ => Directive::Pop,
    })
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn keyword(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a directive name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn arguments(&mut self) -> Result<Vec<String>> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if matches!(self.peek(), None | Some(';')) {
            return Ok(args);
        }

        loop {
            self.skip_whitespace();
            args.push(self.argument()?);
            self.skip_whitespace();
            if !self.eat(',') {
                return Ok(args);
            }
        }
    }

    fn argument(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.quoted(quote)
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
            _ => Err(self.error("expected a quoted argument")),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            match self.peek() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(escaped @ ('\\' | '"' | '\'')) => out.push(escaped),
                Some(other) => {
                    return Err(self.error(&format!("unknown escape '\\{}'", other)));
                }
                None => break,
            }
            self.pos += 1;
        }
        Err(self.error("unterminated string"))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> StoreError {
        StoreError::DirectiveError(format!("{} at position {}", message, self.pos))
    }
}

//! Recursive-descent parser for path expressions.

use super::{Axis, Comparison, NodeTest, Operand, Predicate, Step, XPath};
use crate::error::{Result, StoreError};

pub(super) fn parse(expr: &str) -> Result<XPath> {
    let mut parser = Parser {
        source: expr,
        chars: expr.chars().collect(),
        pos: 0,
    };
    parser.path()
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn path(&mut self) -> Result<XPath> {
        let mut steps = Vec::new();
        self.skip_whitespace();

        let absolute = self.peek() == Some('/');
        if self.eat_str("//") {
            steps.push(descendant_or_self());
        } else if self.eat('/') {
            self.skip_whitespace();
            if self.at_end() {
                return Ok(self.finish(absolute, steps));
            }
        }

        if self.at_end() {
            return Err(self.error("empty expression"));
        }

        loop {
            steps.push(self.step()?);
            self.skip_whitespace();
            if self.at_end() {
                break;
            }
            if self.eat_str("//") {
                steps.push(descendant_or_self());
            } else if !self.eat('/') {
                return Err(self.error("expected '/'"));
            }
            self.skip_whitespace();
        }

        Ok(self.finish(absolute, steps))
    }

    fn finish(&self, absolute: bool, steps: Vec<Step>) -> XPath {
        XPath {
            source: self.source.to_string(),
            absolute,
            steps,
        }
    }

    fn step(&mut self) -> Result<Step> {
        let (axis, test) = if self.eat_str("..") {
            (Axis::Parent, NodeTest::AnyNode)
        } else if self.eat('.') {
            (Axis::SelfNode, NodeTest::AnyNode)
        } else if self.eat('@') {
            if self.eat('*') {
                (Axis::Attribute, NodeTest::Wildcard)
            } else {
                (Axis::Attribute, NodeTest::Name(self.name()?))
            }
        } else if self.eat('*') {
            (Axis::Child, NodeTest::Wildcard)
        } else {
            let name = self.name()?;
            if self.eat_str("()") {
                let test = match name.as_str() {
                    "text" => NodeTest::Text,
                    "node" => NodeTest::AnyNode,
                    "comment" => NodeTest::Comment,
                    other => return Err(self.error(&format!("unsupported node test {}()", other))),
                };
                (Axis::Child, test)
            } else {
                (Axis::Child, NodeTest::Name(name))
            }
        };

        let mut predicates = Vec::new();
        self.skip_whitespace();
        while self.eat('[') {
            predicates.push(self.predicate()?);
            self.skip_whitespace();
            if !self.eat(']') {
                return Err(self.error("expected ']'"));
            }
            self.skip_whitespace();
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate> {
        self.skip_whitespace();

        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let position = self.number()?;
            if position == 0 {
                return Err(self.error("positions start at 1"));
            }
            return Ok(Predicate::Position(position));
        }

        if self.eat_str("last()") {
            return Ok(Predicate::Last);
        }

        let operand = if self.eat('@') {
            Operand::Attribute(self.name()?)
        } else if self.eat_str("text()") {
            Operand::Text
        } else if self.eat('.') {
            Operand::Context
        } else {
            Operand::Child(self.name()?)
        };

        self.skip_whitespace();
        let comparison = if self.eat_str("!=") {
            Comparison::NotEqual
        } else if self.eat('=') {
            Comparison::Equal
        } else {
            return Ok(Predicate::Exists(operand));
        };

        self.skip_whitespace();
        let literal = self.literal()?;
        Ok(Predicate::Compare(operand, comparison, literal))
    }

    fn literal(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == quote {
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(value);
                    }
                    self.pos += 1;
                }
                Err(self.error("unterminated string literal"))
            }
            Some(c) if c.is_ascii_digit() => Ok(self.number()?.to_string()),
            _ => Err(self.error("expected a quoted literal")),
        }
    }

    fn number(&mut self) -> Result<usize> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse()
            .map_err(|_| self.error(&format!("invalid number '{}'", digits)))
    }

    fn name(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => self.pos += 1,
            _ => return Err(self.error("expected a name")),
        }
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
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

    fn eat_str(&mut self, expected: &str) -> bool {
        let len = expected.chars().count();
        let matches = self.pos + len <= self.chars.len()
            && self.chars[self.pos..self.pos + len]
                .iter()
                .copied()
                .eq(expected.chars());
        if matches {
            self.pos += len;
        }
        matches
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> StoreError {
        StoreError::QueryError(format!(
            "{} at position {} in '{}'",
            message, self.pos, self.source
        ))
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
    }
}

pub(crate) fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_alphanumeric() || c == '-' || c == '.'
}

/// Whether `name` is usable as an element or attribute name.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

//! Edit directives applied to a [`Document`](crate::document::Document).
//!
//! A [`Directives`] list is an ordered program over a *cursor*, the set of
//! elements the next directive acts on. The cursor starts at the root
//! element.
//!
//! | Directive | Effect |
//! |---|---|
//! | `XPATH expr` | cursor := elements selected by `expr` |
//! | `ADD name` | append a child to each cursor element; cursor := new children |
//! | `ADDIF name` | like `ADD`, reusing the last existing child with that name |
//! | `SET text` | replace the content of each cursor element with `text` |
//! | `ATTR name, value` | set an attribute on each cursor element |
//! | `UP` | cursor := parents |
//! | `REMOVE` | detach cursor elements; cursor := parents |
//! | `STRICT n` | fail unless the cursor holds exactly `n` elements |
//! | `PUSH` / `POP` | save / restore the cursor |
//!
//! Lists can be built in code or parsed from text:
//!
//! ```
//! use docstore::directives::Directives;
//!
//! let built = Directives::new().xpath("/github").add("test").set("hello, world");
//! let parsed: Directives = r#"XPATH "/github"; ADD "test"; SET "hello, world";"#.parse()?;
//! assert_eq!(built, parsed);
//! # Ok::<(), docstore::error::StoreError>(())
//! ```

mod engine;
mod parser;

#[cfg(test)]
mod tests;

use crate::error::StoreError;
use std::fmt;
use std::str::FromStr;

pub use engine::apply;

/// A single edit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    XPath(String),
    Add(String),
    AddIf(String),
    Set(String),
    Attr { name: String, value: String },
    Up,
    Remove,
    Strict(usize),
    Push,
    Pop,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::XPath(expr) => write!(f, "XPATH {}", Quoted(expr)),
            Directive::Add(name) => write!(f, "ADD {}", Quoted(name)),
            Directive::AddIf(name) => write!(f, "ADDIF {}", Quoted(name)),
            Directive::Set(text) => write!(f, "SET {}", Quoted(text)),
            Directive::Attr { name, value } => {
                write!(f, "ATTR {}, {}", Quoted(name), Quoted(value))
            }
            Directive::Up => f.write_str("UP"),
            Directive::Remove => f.write_str("REMOVE"),
            Directive::Strict(count) => write!(f, "STRICT \"{}\"", count),
            Directive::Push => f.write_str("PUSH"),
            Directive::Pop => f.write_str("POP"),
        }
    }
}

/// Double-quoted argument with backslash escapes.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                other => write!(f, "{}", other)?,
            }
        }
        f.write_str("\"")
    }
}

/// An ordered list of directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    items: Vec<Directive>,
}

impl Directives {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of directives.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the directives in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Directive> {
        self.items.iter()
    }

    /// Append a directive.
    pub fn push(mut self, directive: Directive) -> Self {
        self.items.push(directive);
        self
    }

    pub fn xpath(self, expr: impl Into<String>) -> Self {
        self.push(Directive::XPath(expr.into()))
    }

    pub fn add(self, name: impl Into<String>) -> Self {
        self.push(Directive::Add(name.into()))
    }

    pub fn addif(self, name: impl Into<String>) -> Self {
        self.push(Directive::AddIf(name.into()))
    }

    pub fn set(self, text: impl Into<String>) -> Self {
        self.push(Directive::Set(text.into()))
    }

    pub fn attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Directive::Attr {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn up(self) -> Self {
        self.push(Directive::Up)
    }

    pub fn remove(self) -> Self {
        self.push(Directive::Remove)
    }

    pub fn strict(self, count: usize) -> Self {
        self.push(Directive::Strict(count))
    }

    pub fn push_cursor(self) -> Self {
        self.push(Directive::Push)
    }

    pub fn pop_cursor(self) -> Self {
        self.push(Directive::Pop)
    }
}

impl FromIterator<Directive> for Directives {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Directives {
    type Item = &'a Directive;
    type IntoIter = std::slice::Iter<'a, Directive>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromStr for Directives {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)
    }
}

impl fmt::Display for Directives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, directive) in self.items.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{};", directive)?;
        }
        Ok(())
    }
}

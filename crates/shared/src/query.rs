//! Typed GraphQL operation documents.
//!
//! Clients build operations with [`OperationDocument`] and [`Selection`] and only
//! render them to text at the wire. The server parses incoming text back into the
//! same types before validating it against the schema.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub selections: Vec<Selection>,
}

impl Selection {
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selections: Vec::new(),
        }
    }

    pub fn with(mut self, child: Selection) -> Self {
        self.selections.push(child);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.selections.is_empty()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        if self.is_leaf() {
            return writeln!(f, "{indent}{}", self.name);
        }
        writeln!(f, "{indent}{} {{", self.name)?;
        for child in &self.selections {
            child.write_indented(f, depth + 1)?;
        }
        writeln!(f, "{indent}}}")
    }
}

/// A single `query` operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationDocument {
    pub name: Option<String>,
    pub selections: Vec<Selection>,
}

impl OperationDocument {
    pub fn query() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            selections: Vec::new(),
        }
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selections.push(selection);
        self
    }
}

impl fmt::Display for OperationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => writeln!(f, "query {name} {{")?,
            None => writeln!(f, "query {{")?,
        }
        for selection in &self.selections {
            selection.write_indented(f, 1)?;
        }
        write!(f, "}}")
    }
}

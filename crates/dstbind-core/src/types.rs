//! Core type definitions

use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search root a header was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderOrigin {
    /// DST2k project header directory
    Project,
    /// Stand-in standard library headers
    Fallback,
}

/// Raw text of a located header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderSource {
    /// Header basename
    pub name: String,
    /// File it was read from
    pub path: PathBuf,
    /// File content
    pub text: String,
    /// Headers every project header is assumed to include
    pub implied_includes: Vec<String>,
    /// Which search root matched
    pub origin: HeaderOrigin,
}

impl HeaderSource {
    /// Header text prefixed with one include directive per implied include
    pub fn text_with_implied(&self) -> String {
        let mut text = String::new();
        for include in &self.implied_includes {
            text.push_str(&format!("#include \"{}\"\n", include));
        }
        text.push_str(&self.text);
        text
    }
}

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Typedef,
    Struct,
    Union,
    Enum,
}

/// Type definition (`typedef`, or a tagged struct/union/enum)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub text: String,
    pub location: Option<Location>,
}

/// Function prototype or definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    /// Storage class specifiers (`extern`, `static`)
    pub storage: Vec<String>,
    pub text: String,
    /// Has a body (inline definition in a header)
    pub is_definition: bool,
    pub location: Option<Location>,
}

/// Variable declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    /// Storage class specifiers (`extern`, `static`)
    pub storage: Vec<String>,
    pub text: String,
    pub location: Option<Location>,
}

/// Top-level declaration of a translation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Type(TypeDecl),
    Function(FuncDecl),
    Variable(VarDecl),
}

/// Coarse category used for declaration identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeclCategory {
    Type,
    Function,
    Variable,
}

/// Identity of a declaration: category plus name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclKey {
    pub category: DeclCategory,
    pub name: String,
}

impl std::fmt::Display for DeclKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let category = match self.category {
            DeclCategory::Type => "type",
            DeclCategory::Function => "function",
            DeclCategory::Variable => "variable",
        };
        write!(f, "{} {}", category, self.name)
    }
}

impl Declaration {
    /// Declared name (empty for anonymous tagged types)
    pub fn name(&self) -> &str {
        match self {
            Declaration::Type(t) => &t.name,
            Declaration::Function(f) => &f.name,
            Declaration::Variable(v) => &v.name,
        }
    }

    /// C source text of this declaration
    pub fn render(&self) -> &str {
        match self {
            Declaration::Type(t) => &t.text,
            Declaration::Function(f) => &f.text,
            Declaration::Variable(v) => &v.text,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Declaration::Type(t) => t.location.as_ref(),
            Declaration::Function(f) => f.location.as_ref(),
            Declaration::Variable(v) => v.location.as_ref(),
        }
    }

    pub fn category(&self) -> DeclCategory {
        match self {
            Declaration::Type(_) => DeclCategory::Type,
            Declaration::Function(_) => DeclCategory::Function,
            Declaration::Variable(_) => DeclCategory::Variable,
        }
    }

    pub fn key(&self) -> DeclKey {
        DeclKey {
            category: self.category(),
            name: self.name().to_string(),
        }
    }

    /// Whether this is a function prototype or definition
    pub fn is_function(&self) -> bool {
        matches!(self, Declaration::Function(_))
    }

    /// Whether this is a `typedef` of the given name
    pub fn is_typedef_named(&self, name: &str) -> bool {
        matches!(self, Declaration::Type(t) if t.kind == TypeKind::Typedef && t.name == name)
    }

    /// Whether this is a variable declared exactly `extern`
    pub fn is_extern_variable(&self) -> bool {
        matches!(self, Declaration::Variable(v) if v.storage.len() == 1 && v.storage[0] == "extern")
    }
}

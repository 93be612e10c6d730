pub mod ast;
pub mod backend;
pub mod codegen;
pub mod frontend;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error ({line}:{col}): unexpected character '{ch}'")]
    Lex { line: usize, col: usize, ch: char },

    #[error("Parse error ({line}:{col}): {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("ResolutionError:{kind} - {message}")]
    Resolve {
        kind: ResolveErrorKind,
        message: String,
    },

    #[error("TypeError:{kind} - {message}")]
    Type {
        kind: TypeErrorKind,
        message: String,
    },

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl CompileError {
    pub fn resolve(kind: ResolveErrorKind, message: impl Into<String>) -> Self {
        CompileError::Resolve {
            kind,
            message: message.into(),
        }
    }

    pub fn typing(kind: TypeErrorKind, message: impl Into<String>) -> Self {
        CompileError::Type {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    UnknownIdentifier,
    UnknownFunction,
    FunctionRedefinition,
    NoEnclosingLoop,
    NotAssignable,
}

impl std::fmt::Display for ResolveErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveErrorKind::UnknownIdentifier => write!(f, "UnknownIdentifier"),
            ResolveErrorKind::UnknownFunction => write!(f, "UnknownFunction"),
            ResolveErrorKind::FunctionRedefinition => write!(f, "FunctionRedefinition"),
            ResolveErrorKind::NoEnclosingLoop => write!(f, "NoEnclosingLoop"),
            ResolveErrorKind::NotAssignable => write!(f, "NotAssignable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeErrorKind {
    UnknownTypeName,
    IncompatibleCast,
    MergeMismatch,
    UnresolvedOperator,
    ArgumentCountMismatch,
    ValuelessExpression,
}

impl std::fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeErrorKind::UnknownTypeName => write!(f, "UnknownTypeName"),
            TypeErrorKind::IncompatibleCast => write!(f, "IncompatibleCast"),
            TypeErrorKind::MergeMismatch => write!(f, "MergeMismatch"),
            TypeErrorKind::UnresolvedOperator => write!(f, "UnresolvedOperator"),
            TypeErrorKind::ArgumentCountMismatch => write!(f, "ArgumentCountMismatch"),
            TypeErrorKind::ValuelessExpression => write!(f, "ValuelessExpression"),
        }
    }
}

/// Parse one compilation unit into its AST.
pub fn parse_unit(source: &str) -> Result<ast::Ast, CompileError> {
    frontend::parser::parse_unit(source)
}

/// Compile one compilation unit into a control-flow graph module.
///
/// The unit's top-level expressions become the body of a synthetic
/// `_<name>_init` function returning the unit's last value as an i32.
pub fn compile_to_cfg(name: &str, source: &str) -> Result<backend::cfg::Module, CompileError> {
    let parsed = parse_unit(source)?;
    let mut module = backend::cfg::Module::new(name);
    codegen::lower_unit(name, &parsed, &mut module)?;
    Ok(module)
}

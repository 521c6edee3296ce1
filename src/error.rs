use crate::expr::ExprError;
use crate::lexer::LexError;
use crate::parser::ParsingError;
use std::io;
use std::path::PathBuf;

/// Any failure of a single statement.
///
/// The interpreter reports it and drops the rest of the line; statements that
/// already ran keep their effects.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Lexing error: {0}")]
    Lex(#[from] LexError),
    #[error("Parsing error: {0}")]
    Parse(#[from] ParsingError),
    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),
    #[error(
        "'{0}' is not an operable program or script.\nTry typing the full name, the program must be compiled."
    )]
    CommandNotFound(String),
    #[error("Path not found: '{}'", .0.display())]
    PathNotFound(PathBuf),
    #[error("File not found: '{}'", .0.display())]
    FileNotFound(PathBuf),
    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Permission to elevate was denied: {0}")]
    ElevationDenied(String),
    #[error("Interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

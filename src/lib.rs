//! PangShell: a small interactive shell with typed variables.
//!
//! A line is lexed into tokens, parsed into statements and executed in order.
//! Variables hold integers, floats or strings and take part in arithmetic
//! expressions; built-in commands cover directory navigation and file chores,
//! and every other word runs as an external program.
//!
//! The main entry point is [`Interpreter`]. Terminal, privilege, process and
//! host-information access are behind the traits in [`platform`] and
//! [`external`], so the whole shell can run against in-memory fakes.

mod builtin;
pub mod editor;
pub mod env;
pub mod error;
pub mod expr;
pub mod external;
pub mod interrupt;
mod interpreter;
mod io_adapters;
pub mod keyword;
pub mod lexer;
mod listing;
pub mod parser;
pub mod platform;
pub mod style;
pub mod value;

pub use env::Environment;
pub use error::ShellError;
/// The line runner; see [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
pub use io_adapters::MemWriter;
pub use value::Value;

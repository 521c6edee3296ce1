//! The fixed keyword table shared by the lexer, the parser and tab completion.

use std::fmt;

/// A word reserved by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `@echo on|off`
    EchoToggle,
    Cd,
    Cls,
    /// `del`
    Delete,
    Echo,
    Exit,
    /// `ls`
    List,
    Neofetch,
    /// `rl`
    Reload,
    /// `rm`
    Remove,
    /// Elevation prefix.
    Sudo,
    Title,
    Touch,
    Type,
    Uptime,
}

/// How the parser collects the arguments that follow a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// The rest of the statement is one expression.
    Scalar,
    /// The rest of the statement is a list of positional arguments.
    List,
    /// Nothing may follow the keyword.
    Bare,
    /// Statement prefix, never a statement of its own.
    Prefix,
}

/// Every keyword in alphabetical (byte) order of its spelling.
pub const ALL: [Keyword; 15] = [
    Keyword::EchoToggle,
    Keyword::Cd,
    Keyword::Cls,
    Keyword::Delete,
    Keyword::Echo,
    Keyword::Exit,
    Keyword::List,
    Keyword::Neofetch,
    Keyword::Reload,
    Keyword::Remove,
    Keyword::Sudo,
    Keyword::Title,
    Keyword::Touch,
    Keyword::Type,
    Keyword::Uptime,
];

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::EchoToggle => "@echo",
            Keyword::Cd => "cd",
            Keyword::Cls => "cls",
            Keyword::Delete => "del",
            Keyword::Echo => "echo",
            Keyword::Exit => "exit",
            Keyword::List => "ls",
            Keyword::Neofetch => "neofetch",
            Keyword::Reload => "rl",
            Keyword::Remove => "rm",
            Keyword::Sudo => "sudo",
            Keyword::Title => "title",
            Keyword::Touch => "touch",
            Keyword::Type => "type",
            Keyword::Uptime => "uptime",
        }
    }

    /// Look up a word in the keyword table.
    pub fn lookup(word: &str) -> Option<Keyword> {
        ALL.iter().copied().find(|k| k.as_str() == word)
    }

    pub fn shape(self) -> Shape {
        match self {
            Keyword::Echo
            | Keyword::Cd
            | Keyword::Touch
            | Keyword::Type
            | Keyword::Title
            | Keyword::Delete => Shape::Scalar,
            Keyword::List | Keyword::Remove | Keyword::EchoToggle => Shape::List,
            Keyword::Cls
            | Keyword::Uptime
            | Keyword::Neofetch
            | Keyword::Exit
            | Keyword::Reload => Shape::Bare,
            Keyword::Sudo => Shape::Prefix,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword spellings in completion order.
pub fn names() -> Vec<&'static str> {
    ALL.iter().map(|k| k.as_str()).collect()
}

use crate::keyword::{Keyword, Shape};
use crate::lexer::{BinaryOp, Token};
use std::fmt;

static END_OF_LINE: Token = Token::EndOfLine;

/// One piece of an expression template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Expression source text.
    Text(String),
    /// A `{}` slot filled, in order, from the statement's referenced variables.
    Slot,
}

/// Expression source with `{}` slots where variable references appeared.
///
/// Slots are structural rather than textual, so a string literal containing
/// `{}` is never mistaken for a slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    pub fn slot_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, TemplatePart::Slot))
            .count()
    }

    pub fn is_blank(&self) -> bool {
        self.parts.iter().all(|p| match p {
            TemplatePart::Text(t) => t.trim().is_empty(),
            TemplatePart::Slot => false,
        })
    }

    fn push_text(&mut self, text: &str) {
        if let Some(TemplatePart::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(TemplatePart::Text(text.to_string()));
        }
    }

    fn push_slot(&mut self) {
        self.parts.push(TemplatePart::Slot);
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TemplatePart::Text(t) => f.write_str(t)?,
                TemplatePart::Slot => f.write_str("{}")?,
            }
        }
        Ok(())
    }
}

/// A positional argument of a program or list keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(String),
    /// Replaced by the textual value of the next referenced variable.
    Placeholder,
}

/// Arguments of a keyword statement, shaped by [`Keyword::shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordArgs {
    Expr(Template),
    List(Vec<Arg>),
    None,
}

/// AST node for the shell.
///
/// A line parses into a sequence of these; each is executed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expr`, also the desugared form of `name op= expr`.
    Assign {
        name: String,
        expr: Template,
        referenced_vars: Vec<String>,
    },

    /// A built-in command.
    Keyword {
        keyword: Keyword,
        args: KeywordArgs,
        referenced_vars: Vec<String>,
        /// The statement was prefixed with `sudo`.
        elevated: bool,
    },

    /// An external program invocation; `args[0]` is the program.
    Program {
        args: Vec<Arg>,
        referenced_vars: Vec<String>,
        elevated: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsingError {
    #[error("No identifier to assign a value to.")]
    NoAssignmentTarget,
    #[error("Args must be a string, found '{0}'.")]
    InvalidArgument(String),
    #[error("Identifier '{0}' is only usable in assignment expressions.")]
    UnexpectedIdentifier(String),
    #[error("'{keyword}' does not take these arguments.")]
    MalformedKeywordArguments { keyword: Keyword },
    #[error("Unexpected '{0}' at the start of a statement.")]
    UnexpectedToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LeadState {
    /// Before the first significant token of a statement.
    Seeking,
    /// Right after the lead word, possibly after one whitespace run.
    AfterLead { name: String, skipped_whitespace: bool },
    /// Nothing left to rewrite in this statement.
    Rest,
}

/// Rewrites `<lead> <op>= <rhs>` into `<lead> = $<lead> <op> <rhs>`.
///
/// Runs before the statement parser so that a single assignment path handles
/// both plain and compound assignment.
pub(crate) fn desugar_compound_assignments(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len() + 2);
    let mut state = LeadState::Seeking;

    for token in tokens {
        if matches!(token, Token::Semicolon | Token::EndOfLine) {
            state = LeadState::Seeking;
            out.push(token);
            continue;
        }

        state = match (state, &token) {
            (LeadState::Seeking, Token::Whitespace(_) | Token::Keyword(Keyword::Sudo)) => {
                LeadState::Seeking
            }
            (LeadState::Seeking, Token::Ident(n) | Token::Variable(n) | Token::Str(n)) => {
                LeadState::AfterLead {
                    name: n.clone(),
                    skipped_whitespace: false,
                }
            }
            (
                LeadState::AfterLead {
                    name,
                    skipped_whitespace: false,
                },
                Token::Whitespace(_),
            ) => LeadState::AfterLead {
                name,
                skipped_whitespace: true,
            },
            (LeadState::AfterLead { name, .. }, Token::CompoundAssign(op)) => {
                out.push(Token::Assign);
                out.push(Token::Variable(name));
                out.push(Token::Operator(*op));
                state = LeadState::Rest;
                continue;
            }
            _ => LeadState::Rest,
        };
        out.push(token);
    }

    out
}

struct AstBuilder {
    tokens: Vec<Token>,
    pos: usize,
    /// Index of the first token of the statement being parsed.
    statement_start: usize,
    statements: Vec<Statement>,
}

impl AstBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        AstBuilder {
            tokens: desugar_compound_assignments(tokens),
            pos: 0,
            statement_start: 0,
            statements: Vec::new(),
        }
    }

    fn build_ast(mut self) -> Result<Vec<Statement>, ParsingError> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                Token::EndOfLine => break,
                Token::Semicolon => {
                    self.consume();
                }
                _ => {
                    self.statement_start = self.pos;
                    self.parse_statement()?;
                }
            }
        }
        Ok(self.statements)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&END_OF_LINE)
    }

    fn consume(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Token::EndOfLine | Token::Semicolon)
    }

    fn skip_whitespace(&mut self) {
        while let Token::Whitespace(_) = self.peek() {
            self.consume();
        }
    }

    /// statement: 'sudo'? (keyword_statement | program_or_assignment)
    fn parse_statement(&mut self) -> Result<(), ParsingError> {
        let elevated = if let Token::Keyword(Keyword::Sudo) = self.peek() {
            self.consume();
            self.skip_whitespace();
            true
        } else {
            false
        };

        match self.peek().clone() {
            Token::Keyword(Keyword::Sudo) => Err(ParsingError::MalformedKeywordArguments {
                keyword: Keyword::Sudo,
            }),
            Token::Keyword(keyword) => self.parse_keyword(keyword, elevated),
            Token::Ident(_) | Token::Variable(_) | Token::Str(_) => {
                self.parse_program_or_assignment(elevated)
            }
            Token::EndOfLine | Token::Semicolon if elevated => {
                Err(ParsingError::MalformedKeywordArguments {
                    keyword: Keyword::Sudo,
                })
            }
            other => Err(ParsingError::UnexpectedToken(other.to_string())),
        }
    }

    fn parse_keyword(&mut self, keyword: Keyword, elevated: bool) -> Result<(), ParsingError> {
        self.consume();

        let (args, referenced_vars) = match keyword.shape() {
            Shape::Scalar => {
                if keyword == Keyword::Delete {
                    if let Some(name) = self.lone_identifier() {
                        let mut expr = Template::default();
                        expr.push_text(&Token::Str(name).to_string());
                        (KeywordArgs::Expr(expr), Vec::new())
                    } else {
                        let (expr, vars) = self.parse_expression()?;
                        (KeywordArgs::Expr(expr), vars)
                    }
                } else {
                    let (expr, vars) = self.parse_expression()?;
                    (KeywordArgs::Expr(expr), vars)
                }
            }
            Shape::List => {
                let mut args = Vec::new();
                let mut vars = Vec::new();
                self.collect_arguments(&mut args, &mut vars)?;
                (KeywordArgs::List(args), vars)
            }
            Shape::Bare => {
                self.skip_whitespace();
                if !self.at_statement_end() {
                    return Err(ParsingError::MalformedKeywordArguments { keyword });
                }
                (KeywordArgs::None, Vec::new())
            }
            Shape::Prefix => return Err(ParsingError::MalformedKeywordArguments { keyword }),
        };

        self.statements.push(Statement::Keyword {
            keyword,
            args,
            referenced_vars,
            elevated,
        });
        Ok(())
    }

    /// `del name`: a single bare identifier names the variable directly.
    fn lone_identifier(&mut self) -> Option<String> {
        let mut probe = self.pos;
        let mut found = None;
        loop {
            match self.tokens.get(probe).unwrap_or(&END_OF_LINE) {
                Token::Whitespace(_) => {}
                Token::Ident(name) if found.is_none() => found = Some(name.clone()),
                Token::EndOfLine | Token::Semicolon => break,
                _ => return None,
            }
            probe += 1;
        }
        if found.is_some() {
            self.pos = probe;
        }
        found
    }

    fn parse_program_or_assignment(&mut self, elevated: bool) -> Result<(), ParsingError> {
        let mut args = Vec::new();
        let mut referenced_vars = Vec::new();

        match self.consume() {
            Token::Variable(name) => {
                args.push(Arg::Placeholder);
                referenced_vars.push(name);
            }
            Token::Ident(word) | Token::Str(word) => args.push(Arg::Literal(word)),
            other => return Err(ParsingError::UnexpectedToken(other.to_string())),
        }

        if let Token::Whitespace(_) = self.peek() {
            self.consume();
        }

        if let Token::Assign = self.peek() {
            if elevated {
                tracing::debug!("elevation has no effect on an assignment");
            }
            return self.parse_assignment();
        }

        self.collect_arguments(&mut args, &mut referenced_vars)?;
        self.statements.push(Statement::Program {
            args,
            referenced_vars,
            elevated,
        });
        Ok(())
    }

    /// Parse an assignment: the target is the nearest identifier before '='.
    fn parse_assignment(&mut self) -> Result<(), ParsingError> {
        let name = self.tokens[self.statement_start..self.pos]
            .iter()
            .rev()
            .find_map(|t| match t {
                Token::Ident(name) => Some(name.clone()),
                _ => None,
            })
            .ok_or(ParsingError::NoAssignmentTarget)?;

        self.consume(); // '='

        let (expr, referenced_vars) = self.parse_expression()?;
        self.statements.push(Statement::Assign {
            name,
            expr,
            referenced_vars,
        });
        Ok(())
    }

    /// Renders the rest of the statement as an expression template.
    fn parse_expression(&mut self) -> Result<(Template, Vec<String>), ParsingError> {
        self.skip_whitespace();

        let mut expr = Template::default();
        let mut vars = Vec::new();

        while !self.at_statement_end() {
            match self.consume() {
                Token::Variable(name) => {
                    expr.push_slot();
                    vars.push(name);
                }
                Token::Ident(name) => return Err(ParsingError::UnexpectedIdentifier(name)),
                other => expr.push_text(&other.to_string()),
            }
        }

        Ok((expr, vars))
    }

    /// Positional arguments up to the end of the statement.
    fn collect_arguments(
        &mut self,
        args: &mut Vec<Arg>,
        vars: &mut Vec<String>,
    ) -> Result<(), ParsingError> {
        while !self.at_statement_end() {
            match self.consume() {
                Token::Whitespace(_) => {}
                Token::Ident(word) | Token::Str(word) => args.push(Arg::Literal(word)),
                Token::Variable(name) => {
                    args.push(Arg::Placeholder);
                    vars.push(name);
                }
                Token::Operator(BinaryOp::Sub) => {
                    let mut dashes = String::from("-");
                    loop {
                        match self.consume() {
                            Token::Operator(BinaryOp::Sub) => dashes.push('-'),
                            Token::Ident(word) | Token::Str(word) => {
                                args.push(Arg::Literal(dashes + &word));
                                break;
                            }
                            other => {
                                return Err(ParsingError::InvalidArgument(format!(
                                    "{dashes}{other}"
                                )));
                            }
                        }
                    }
                }
                other => return Err(ParsingError::InvalidArgument(other.to_string())),
            }
        }
        Ok(())
    }
}

/// Builds the statements of one line from its tokens.
///
/// An empty or whitespace-only line yields no statements.
///
/// # Arguments
///
/// * `tokens` - The tokens of one line as produced by [`crate::lexer::tokenize`].
///
/// # Returns
///
/// The statements in execution order, or the first [`ParsingError`] found.
pub fn construct_ast(tokens: Vec<Token>) -> Result<Vec<Statement>, ParsingError> {
    let statements = AstBuilder::from(tokens).build_ast()?;
    tracing::debug!(?statements, "parsed line");
    Ok(statements)
}

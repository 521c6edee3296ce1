//! Evaluation of expression templates.
//!
//! The template text is re-lexed and the `{}` slots are filled with the
//! values of the referenced variables as typed operands, so a string value
//! can never change the shape of the expression it is substituted into.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('**' unary)?
//! primary := INT | FLOAT | STRING | SLOT | '(' expr ')'
//! ```

use crate::lexer::{self, BinaryOp, LexError, Token};
use crate::parser::{Template, TemplatePart};
use crate::value::{Value, ValueError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected '{0}' in expression")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("comparisons are not supported")]
    Comparison,
    #[error("expected {expected} values for the expression, got {got}")]
    SlotMismatch { expected: usize, got: usize },
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Value(#[from] ValueError),
}

#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Operand(Value),
    Operator(BinaryOp),
    Open,
    Close,
    Stray(String),
}

fn atomize(template: &Template, values: &[Value]) -> Result<Vec<Atom>, ExprError> {
    if template.slot_count() != values.len() {
        return Err(ExprError::SlotMismatch {
            expected: template.slot_count(),
            got: values.len(),
        });
    }

    let mut values = values.iter();
    let mut atoms = Vec::new();
    for part in template.parts() {
        match part {
            TemplatePart::Slot => {
                if let Some(value) = values.next() {
                    atoms.push(Atom::Operand(value.clone()));
                }
            }
            TemplatePart::Text(text) => {
                for token in lexer::tokenize(text)? {
                    let atom = match token {
                        Token::Whitespace(_) | Token::EndOfLine => continue,
                        Token::Int(n) => Atom::Operand(Value::Int(n)),
                        Token::Float(x) => Atom::Operand(Value::Float(x)),
                        Token::Str(s) => Atom::Operand(Value::Str(s)),
                        Token::Operator(op) => Atom::Operator(op),
                        Token::LParen => Atom::Open,
                        Token::RParen => Atom::Close,
                        Token::Equals => return Err(ExprError::Comparison),
                        other => Atom::Stray(other.to_string()),
                    };
                    atoms.push(atom);
                }
            }
        }
    }
    Ok(atoms)
}

struct Evaluator {
    atoms: Vec<Atom>,
    pos: usize,
}

impl Evaluator {
    fn peek(&self) -> Option<&Atom> {
        self.atoms.get(self.pos)
    }

    fn next(&mut self) -> Option<Atom> {
        let atom = self.atoms.get(self.pos).cloned();
        if atom.is_some() {
            self.pos += 1;
        }
        atom
    }

    fn peek_operator(&self, ops: &[BinaryOp]) -> Option<BinaryOp> {
        match self.peek() {
            Some(Atom::Operator(op)) if ops.contains(op) => Some(*op),
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<Value, ExprError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek_operator(&[BinaryOp::Add, BinaryOp::Sub]) {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = apply(op, &lhs, &rhs)?;
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Value, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_operator(&[BinaryOp::Mul, BinaryOp::Div, BinaryOp::Mod]) {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = apply(op, &lhs, &rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Value, ExprError> {
        match self.peek_operator(&[BinaryOp::Sub, BinaryOp::Add]) {
            Some(BinaryOp::Sub) => {
                self.pos += 1;
                Ok(self.unary()?.neg()?)
            }
            Some(_) => {
                self.pos += 1;
                Ok(self.unary()?.pos()?)
            }
            None => self.power(),
        }
    }

    fn power(&mut self) -> Result<Value, ExprError> {
        let base = self.primary()?;
        if self.peek_operator(&[BinaryOp::Pow]).is_some() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.pow(&exponent)?);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Value, ExprError> {
        match self.next() {
            Some(Atom::Operand(value)) => Ok(value),
            Some(Atom::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Atom::Close) => Ok(value),
                    Some(other) => Err(unexpected(other)),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(other) => Err(unexpected(other)),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

fn unexpected(atom: Atom) -> ExprError {
    ExprError::UnexpectedToken(match atom {
        Atom::Operand(value) => value.to_string(),
        Atom::Operator(op) => op.symbol().to_string(),
        Atom::Open => "(".to_string(),
        Atom::Close => ")".to_string(),
        Atom::Stray(text) => text,
    })
}

fn apply(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ValueError> {
    match op {
        BinaryOp::Add => lhs.add(rhs),
        BinaryOp::Sub => lhs.sub(rhs),
        BinaryOp::Mul => lhs.mul(rhs),
        BinaryOp::Div => lhs.div(rhs),
        BinaryOp::Mod => lhs.rem(rhs),
        BinaryOp::Pow => lhs.pow(rhs),
    }
}

/// Evaluates `template`, filling its slots from `values` in order.
pub fn evaluate(template: &Template, values: &[Value]) -> Result<Value, ExprError> {
    let atoms = atomize(template, values)?;
    if atoms.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut evaluator = Evaluator { atoms, pos: 0 };
    let value = evaluator.expr()?;
    match evaluator.next() {
        None => Ok(value),
        Some(extra) => Err(unexpected(extra)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::{Statement, construct_ast};

    /// Parses `echo <source>` and returns its template.
    fn template(source: &str) -> Template {
        let line = format!("echo {source}");
        match construct_ast(tokenize(&line).unwrap()).unwrap().remove(0) {
            Statement::Keyword {
                args: crate::parser::KeywordArgs::Expr(expr),
                ..
            } => expr,
            other => panic!("Expected echo, got {:?}", other),
        }
    }

    fn eval(source: &str) -> Result<Value, ExprError> {
        evaluate(&template(source), &[])
    }

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(eval("5 * (10 + 20)"), Ok(Value::Int(150)));
        assert_eq!(eval("2 + 3 * 4"), Ok(Value::Int(14)));
        assert_eq!(eval("10 - 4 - 3"), Ok(Value::Int(3)));
        assert_eq!(eval("7 % 4 * 2"), Ok(Value::Int(6)));
    }

    #[test]
    fn test_power_is_right_associative_and_tighter_than_unary_minus() {
        assert_eq!(eval("2 ** 3 ** 2"), Ok(Value::Int(512)));
        assert_eq!(eval("-2 ** 2"), Ok(Value::Int(-4)));
        assert_eq!(eval("(-2) ** 2"), Ok(Value::Int(4)));
        assert_eq!(eval("2 ** -1"), Ok(Value::Float(0.5)));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(eval("--3"), Ok(Value::Int(3)));
        assert_eq!(eval("+4.5"), Ok(Value::Float(4.5)));
        assert_eq!(eval("3 - -3"), Ok(Value::Int(6)));
    }

    #[test]
    fn test_slots_are_typed_operands() {
        let t = template("$a - 5");
        assert_eq!(evaluate(&t, &[Value::Int(5)]), Ok(Value::Int(0)));

        // A text value that looks like code stays a string.
        let t = template("$a + \"!\"");
        assert_eq!(
            evaluate(&t, &[Value::from("1) + (2")]),
            Ok(Value::from("1) + (2!"))
        );
    }

    #[test]
    fn test_slot_count_must_match() {
        let t = template("$a + $b");
        assert_eq!(
            evaluate(&t, &[Value::Int(1)]),
            Err(ExprError::SlotMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(eval("\"ab\" + \"c\""), Ok(Value::from("abc")));
        assert_eq!(eval("\"-\" * 3"), Ok(Value::from("---")));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval(""), Err(ExprError::Empty));
        assert_eq!(eval("1 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(eval("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert_eq!(eval("1 2"), Err(ExprError::UnexpectedToken("2".to_string())));
        assert_eq!(eval("1 == 1"), Err(ExprError::Comparison));
        assert_eq!(eval("echo"), Err(ExprError::UnexpectedToken("echo".to_string())));
        assert_eq!(
            eval("1 / 0"),
            Err(ExprError::Value(ValueError::DivisionByZero))
        );
        assert!(matches!(
            eval("\"a\" - 1"),
            Err(ExprError::Value(ValueError::TypeMismatch { .. }))
        ));
    }
}

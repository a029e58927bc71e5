//! Expressions prepared for evaluation against many items.

use lf_core::{Error, Result};
use regex::{Regex, RegexBuilder};

use crate::condition::{Condition, MatchMode, Subject};
use crate::expr::Expr;

/// An [`Expr`] that has been validated, with its name patterns compiled.
#[derive(Debug, Clone)]
pub enum CompiledExpr {
    Condition(Condition),
    /// A non-empty [`MatchMode::Regex`] name condition.
    Pattern(Regex),
    And(Vec<CompiledExpr>),
    Or(Vec<CompiledExpr>),
    Not(Box<CompiledExpr>),
}

impl CompiledExpr {
    /// Validate `expr` and compile every regex it contains.
    pub fn compile(expr: &Expr) -> Result<Self> {
        let compiled = match expr {
            Expr::Condition(Condition::Name {
                mode: MatchMode::Regex,
                text,
                ignore_case,
            }) if !text.is_empty() => RegexBuilder::new(text)
                .case_insensitive(*ignore_case)
                .build()
                .map(CompiledExpr::Pattern)
                .map_err(|e| Error::Validation(format!("invalid name pattern {text:?}: {e}")))?,
            Expr::Condition(cond) => {
                cond.validate()?;
                CompiledExpr::Condition(cond.clone())
            }
            Expr::And(exprs) => CompiledExpr::And(exprs.iter().map(Self::compile).collect::<Result<_>>()?),
            Expr::Or(exprs) => CompiledExpr::Or(exprs.iter().map(Self::compile).collect::<Result<_>>()?),
            Expr::Not(inner) => CompiledExpr::Not(Box::new(Self::compile(inner)?)),
        };
        Ok(compiled)
    }

    pub fn evaluate(&self, subject: &Subject<'_>) -> bool {
        match self {
            CompiledExpr::Condition(cond) => cond.evaluate(subject),
            CompiledExpr::Pattern(re) => re.is_match(subject.name),
            CompiledExpr::And(exprs) => exprs.iter().all(|e| e.evaluate(subject)),
            CompiledExpr::Or(exprs) => exprs.iter().any(|e| e.evaluate(subject)),
            CompiledExpr::Not(inner) => !inner.evaluate(subject),
        }
    }
}

//! Build condition expressions from condition commands.

use lf_core::{ArgMap, Error, ItemKind, Result};
use lf_rules::{CompiledExpr, Condition, Expr, MatchMode};
use serde_json::Value;

use crate::args;

/// Turn a condition command's resolved arguments into an expression.
///
/// The expression is not validated; see [`compile_condition`].
pub fn build_condition(name: &str, args: &ArgMap) -> Result<Expr> {
    let expr: Expr = match name {
        "name_matches" => {
            let mode = args::required_str(args, "mode")?;
            let mode: MatchMode = serde_json::from_value(Value::String(mode.to_string()))
                .map_err(|_| Error::Validation(format!("unknown match mode {mode:?}")))?;
            Condition::Name {
                mode,
                text: args::required_str(args, "text")?.to_string(),
                ignore_case: args::bool_or(args, "ignore_case", false)?,
            }
            .into()
        }
        "kind" => {
            let kinds = args::string_list(args, "kinds")?
                .iter()
                .map(|k| k.parse::<ItemKind>())
                .collect::<Result<Vec<_>>>()?;
            Condition::Kind(kinds).into()
        }
        "visible" => Condition::Visible(args::bool_or(args, "visible", true)?).into(),
        "top_level" => Condition::TopLevel.into(),
        "non_empty_group" => Condition::NonEmptyGroup.into(),
        "file_extension" => Condition::FileExtension(args::string_list(args, "extensions")?).into(),
        "selected" => Condition::Selected.into(),
        "expression" => {
            let raw = args
                .get("expr")
                .ok_or_else(|| Error::Validation("missing argument \"expr\"".into()))?;
            lf_rules::expr_from_value(raw)
                .map_err(|e| Error::Validation(format!("invalid expression: {e}")))?
        }
        other => {
            return Err(Error::Validation(format!("unknown condition {other:?}")));
        }
    };

    Ok(expr)
}

/// Build, validate and compile a condition command.
pub fn compile_condition(name: &str, args: &ArgMap) -> Result<CompiledExpr> {
    CompiledExpr::compile(&build_condition(name, args)?)
}

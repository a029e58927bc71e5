//! Field substitution for rename patterns.

use std::collections::HashMap;

use lf_core::{Error, Result};

/// Values available to a rename pattern.
///
/// Fields are written as `{field}`; the counter accepts a zero-padded
/// width, `{n:3}`. A literal brace is written twice, `{{` or `}}`.
///
/// ```
/// use lf_pipeline::template::NameTemplate;
///
/// let tpl = NameTemplate::new(7)
///     .with_var("name", "cat")
///     .with_var("parent", "icons");
/// assert_eq!(tpl.render("{parent}_{name}_{n:3}").unwrap(), "icons_cat_007");
/// ```
#[derive(Debug, Clone)]
pub struct NameTemplate {
    vars: HashMap<String, String>,
    number: u64,
}

impl NameTemplate {
    pub fn new(number: u64) -> Self {
        Self {
            vars: HashMap::new(),
            number,
        }
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Substitute every field in `pattern`.
    pub fn render(&self, pattern: &str) -> Result<String> {
        let mut out = String::with_capacity(pattern.len());
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        field.push(next);
                    }
                    if !closed {
                        return Err(Error::Validation(format!(
                            "unclosed field in pattern {pattern:?}"
                        )));
                    }
                    out.push_str(&self.field(&field)?);
                }
                '}' => {
                    return Err(Error::Validation(format!(
                        "unmatched '}}' in pattern {pattern:?}"
                    )));
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }

    fn field(&self, field: &str) -> Result<String> {
        if field == "n" {
            return Ok(self.number.to_string());
        }
        if let Some(width) = field.strip_prefix("n:") {
            let width: usize = width
                .parse()
                .map_err(|_| Error::Validation(format!("invalid counter width {width:?}")))?;
            return Ok(format!("{:0width$}", self.number));
        }
        self.get(field)
            .map(str::to_string)
            .ok_or_else(|| Error::Validation(format!("unknown field {{{field}}}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tpl() -> NameTemplate {
        NameTemplate::new(4)
            .with_var("name", "cat")
            .with_var("original", "Cat copy")
            .with_var("kind", "layer")
    }

    #[test]
    fn substitutes_fields() {
        assert_eq!(tpl().render("{name}-{kind}").unwrap(), "cat-layer");
        assert_eq!(tpl().render("{original}").unwrap(), "Cat copy");
        assert_eq!(tpl().render("plain").unwrap(), "plain");
    }

    #[test]
    fn counter_and_padding() {
        assert_eq!(tpl().render("img_{n}").unwrap(), "img_4");
        assert_eq!(tpl().render("img_{n:03}").unwrap(), "img_004");
        assert_eq!(tpl().render("img_{n:1}").unwrap(), "img_4");
        assert!(tpl().render("{n:x}").is_err());
    }

    #[test]
    fn escaped_braces() {
        assert_eq!(tpl().render("{{{name}}}").unwrap(), "{cat}");
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(tpl().render("{name").is_err());
        assert!(tpl().render("name}").is_err());
        assert!(tpl().render("{missing}").is_err());
    }
}

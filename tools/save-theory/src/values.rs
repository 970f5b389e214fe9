//! Parameter-specification ("values") file parsing.
//!
//! Each top-level table is a parameter group and each key a parameter. A
//! value written as three tokens (`min start max`) marks the parameter as
//! varied by the sampler. Anything else is a fixed parameter. The file may be
//! TOML or ini; in ini the tokens are written bare (`h0 = 0.6 0.7 0.8`).

use crate::config::parse_sections;
use crate::errors::SaveTheoryError;
use crate::types::ParamId;
use toml::Value;

/// Token count that marks a parameter as varied.
pub const VARYING_TOKEN_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub tokens: Vec<String>,
}

impl ParamSpec {
    pub fn is_varying(&self) -> bool {
        self.tokens.len() == VARYING_TOKEN_COUNT
    }
}

/// Every entry of the values file, in source order.
pub fn parse_values(text: &str) -> Result<Vec<ParamSpec>, SaveTheoryError> {
    let root = parse_sections(text)?;

    let mut specs = Vec::new();
    for (group, entries) in root {
        let Value::Table(entries) = entries else {
            return Err(SaveTheoryError::ConfigParse(format!(
                "values entry `{group}` must be a table of parameters"
            )));
        };
        for (name, value) in entries {
            specs.push(ParamSpec {
                id: ParamId::new(group.clone(), name),
                tokens: value_tokens(&value),
            });
        }
    }
    Ok(specs)
}

pub fn varying_parameters(text: &str) -> Result<Vec<ParamId>, SaveTheoryError> {
    Ok(parse_values(text)?
        .into_iter()
        .filter(ParamSpec::is_varying)
        .map(|spec| spec.id)
        .collect())
}

fn value_tokens(value: &Value) -> Vec<String> {
    match value {
        Value::String(raw) => raw.split_whitespace().map(str::to_string).collect(),
        Value::Integer(v) => vec![v.to_string()],
        Value::Float(v) => vec![v.to_string()],
        Value::Boolean(v) => vec![v.to_string()],
        Value::Array(items) => items.iter().map(scalar_token).collect(),
        Value::Datetime(_) | Value::Table(_) => Vec::new(),
    }
}

fn scalar_token(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: &str = r#"
[cosmo]
omega_m = "0.2 0.3 0.4"
h0 = "0.6 0.7 0.8"
omega_b = 0.045
w = "-1.0"

[nuisance]
bias = [1.0, 1.5, 2.0]
sigma = "0.1 0.2"
a_ia = "-5.0   0.0 5.0"
"#;

    #[test]
    fn three_token_entries_are_varying_in_source_order() {
        let varying = varying_parameters(VALUES).expect("parse");
        assert_eq!(
            varying,
            vec![
                ParamId::new("cosmo", "omega_m"),
                ParamId::new("cosmo", "h0"),
                ParamId::new("nuisance", "bias"),
                ParamId::new("nuisance", "a_ia"),
            ]
        );
    }

    #[test]
    fn fixed_entries_are_kept_but_not_varying() {
        let specs = parse_values(VALUES).expect("parse");
        let omega_b = specs
            .iter()
            .find(|s| s.id == ParamId::new("cosmo", "omega_b"))
            .expect("omega_b present");
        assert_eq!(omega_b.tokens, vec!["0.045".to_string()]);
        assert!(!omega_b.is_varying());
        assert_eq!(specs.len(), 7);
    }

    #[test]
    fn top_level_scalar_is_rejected() {
        let err = parse_values("h0 = \"0.6 0.7 0.8\"\n").expect_err("must fail");
        assert!(matches!(err, SaveTheoryError::ConfigParse(_)));

        let err = parse_values("h0 = 0.6 0.7 0.8\n[cosmo]\nw = -1\n").expect_err("must fail");
        assert!(matches!(err, SaveTheoryError::ConfigParse(msg) if msg.contains("h0")));
    }

    #[test]
    fn bare_ini_ranges_are_varying() {
        let text = "\
; sampler ranges
[cosmo]
h0 = 0.6 0.7 0.8
omega_m = 0.1   0.3 0.5
omega_b = 0.045
n_s = 0.96 0.97

[nuisance]
a_ia = -5.0 0.0 5.0
";
        assert_eq!(
            varying_parameters(text).expect("parse"),
            vec![
                ParamId::new("cosmo", "h0"),
                ParamId::new("cosmo", "omega_m"),
                ParamId::new("nuisance", "a_ia"),
            ]
        );
        let specs = parse_values(text).expect("parse");
        assert_eq!(specs.len(), 5);
        assert_eq!(specs[1].tokens, vec!["0.1", "0.3", "0.5"]);
        assert!(!specs[3].is_varying());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = parse_values("[cosmo\nh0 = 1").expect_err("must fail");
        assert!(matches!(err, SaveTheoryError::ConfigParse(_)));
    }
}

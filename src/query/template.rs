//! Template variable substitution for raw queries
//!
//! Raw mode hands the user's SQL through verbatim except for dashboard
//! variables, written as `$name` or `${name}`. Substitution is a plain
//! regex replace per known variable; tokens that name no known variable
//! are left untouched.

use std::collections::HashMap;

use regex::{NoExpand, Regex};

/// The match pattern for one variable: `$name` with optional braces
pub fn variable_pattern(name: &str) -> Regex {
    let pattern = format!(r"\$\{{?{}\}}?", regex::escape(name));
    Regex::new(&pattern).expect("escaped variable name is a valid pattern")
}

/// Replace every occurrence of the given variables in `text`
pub fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    let mut out = text.to_string();
    for (name, value) in variables {
        let re = variable_pattern(name);
        out = re.replace_all(&out, NoExpand(value)).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_both_token_forms() {
        let v = vars(&[("host", "server01")]);
        assert_eq!(
            substitute_variables("WHERE host = '$host'", &v),
            "WHERE host = 'server01'"
        );
        assert_eq!(
            substitute_variables("WHERE host = '${host}'", &v),
            "WHERE host = 'server01'"
        );
    }

    #[test]
    fn test_unknown_tokens_left_as_is() {
        let v = vars(&[("host", "server01")]);
        assert_eq!(
            substitute_variables("SELECT $field FROM t", &v),
            "SELECT $field FROM t"
        );
    }

    #[test]
    fn test_replacement_value_is_literal() {
        // '$' in the value must not be treated as a capture reference
        let v = vars(&[("amount", "$100")]);
        assert_eq!(substitute_variables("cost: $amount", &v), "cost: $100");
    }

    #[test]
    fn test_multiple_variables() {
        let v = vars(&[("db", "metrics"), ("table", "cpu")]);
        assert_eq!(
            substitute_variables("SELECT * FROM ${db}.${table}", &v),
            "SELECT * FROM metrics.cpu"
        );
    }
}

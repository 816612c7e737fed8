//! `%TOKEN%` substitution
//!
//! Tokens are replaced before parsing, so they may appear anywhere in
//! the script, including keys. Resolution order: explicit overrides,
//! then the process environment. `%%` escapes a literal percent sign.

use crate::error::ScriptError;
use indexmap::IndexMap;

/// Ordered token overrides (command line wins over environment)
pub type TokenMap = IndexMap<String, String>;

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Substitute every token in `input`
///
/// # Errors
/// Returns `UnresolvedTokens` naming every token that matched the
/// token grammar but resolved to nothing.
pub fn substitute(input: &str, overrides: &TokenMap) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(input.len());
    let mut missing: Vec<String> = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        // Escaped literal percent
        if let Some(stripped) = after.strip_prefix('%') {
            out.push('%');
            rest = stripped;
            continue;
        }

        match after.find('%') {
            Some(end) if end > 0 && after[..end].chars().all(is_token_char) => {
                let name = &after[..end];
                match lookup(name, overrides) {
                    Some(value) => out.push_str(&value),
                    None => {
                        if !missing.iter().any(|m| m == name) {
                            missing.push(name.to_string());
                        }
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            // Stray percent, not a token
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    if missing.is_empty() {
        Ok(out)
    } else {
        Err(ScriptError::UnresolvedTokens { missing })
    }
}

fn lookup(name: &str, overrides: &TokenMap) -> Option<String> {
    overrides
        .get(name)
        .cloned()
        .or_else(|| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pairs: &[(&str, &str)]) -> TokenMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_from_overrides() {
        let result =
            substitute("deploy %RELEASE% now", &tokens(&[("RELEASE", "v42")])).unwrap();
        assert_eq!(result, "deploy v42 now");
    }

    #[test]
    fn replaces_from_env() {
        std::env::set_var("RIGGER_TEST_TOKEN_A", "from-env");
        let result = substitute("x %RIGGER_TEST_TOKEN_A% y", &TokenMap::new()).unwrap();
        assert_eq!(result, "x from-env y");
    }

    #[test]
    fn overrides_win_over_env() {
        std::env::set_var("RIGGER_TEST_TOKEN_B", "env");
        let result = substitute(
            "%RIGGER_TEST_TOKEN_B%",
            &tokens(&[("RIGGER_TEST_TOKEN_B", "override")]),
        )
        .unwrap();
        assert_eq!(result, "override");
    }

    #[test]
    fn missing_tokens_all_reported() {
        let err = substitute("%RIGGER_NOPE_1% and %RIGGER_NOPE_2%", &TokenMap::new())
            .unwrap_err();
        let ScriptError::UnresolvedTokens { missing } = err else {
            panic!("expected unresolved tokens");
        };
        assert_eq!(missing, vec!["RIGGER_NOPE_1", "RIGGER_NOPE_2"]);
    }

    #[test]
    fn escaped_percent_is_literal() {
        let result = substitute("100%% done", &TokenMap::new()).unwrap();
        assert_eq!(result, "100% done");
    }

    #[test]
    fn stray_percent_passes_through() {
        let result = substitute("50% of the time", &TokenMap::new()).unwrap();
        assert_eq!(result, "50% of the time");
    }

    #[test]
    fn duplicate_missing_reported_once() {
        let err = substitute("%RIGGER_NOPE_3% %RIGGER_NOPE_3%", &TokenMap::new())
            .unwrap_err();
        let ScriptError::UnresolvedTokens { missing } = err else {
            panic!("expected unresolved tokens");
        };
        assert_eq!(missing.len(), 1);
    }
}

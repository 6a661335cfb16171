//! Adapted-name and alias derivation
//!
//! `GetWindowText` is installed as `get_window_text` plus the heuristic
//! alias `window_text`; `IsWindow` as `is_window` plus `window?` with a
//! boolean result; `SetWindowText` as `set_window_text` plus
//! `window_text=`.

use regex::Regex;
use std::sync::OnceLock;

static ACRONYM_BOUNDARY: OnceLock<Regex> = OnceLock::new();
static WORD_BOUNDARY: OnceLock<Regex> = OnceLock::new();

/// Names derived for one declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedNames {
    /// Primary adapted name
    pub adapted_name: String,
    /// Heuristic aliases, in derivation order
    pub aliases: Vec<String>,
    /// True when the name reads as a predicate (`is_` prefix)
    pub predicate: bool,
}

/// Convert an export-style name to snake_case
///
/// ```
/// # use apibind_runtime::binding::naming::snake_case;
/// assert_eq!(snake_case("GetDCEx"), "get_dc_ex");
/// assert_eq!(snake_case("DdeInitialize"), "dde_initialize");
/// ```
pub fn snake_case(name: &str) -> String {
    let acronym = ACRONYM_BOUNDARY
        .get_or_init(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("static pattern"));
    let word =
        WORD_BOUNDARY.get_or_init(|| Regex::new(r"([a-z\d])([A-Z])").expect("static pattern"));

    let name = acronym.replace_all(name, "${1}_${2}");
    let name = word.replace_all(&name, "${1}_${2}");
    name.replace('-', "_").to_lowercase()
}

/// Derive the adapted name and heuristic aliases
///
/// `rename` replaces the snake_case name before the heuristics run.
pub fn derive(canonical_name: &str, rename: Option<&str>) -> DerivedNames {
    let adapted_name = match rename {
        Some(name) => name.to_string(),
        None => snake_case(canonical_name),
    };

    let mut aliases = Vec::new();
    let mut predicate = false;

    if let Some(rest) = non_empty_suffix(&adapted_name, "is_") {
        aliases.push(format!("{}?", rest));
        predicate = true;
    } else if let Some(rest) = non_empty_suffix(&adapted_name, "get_") {
        aliases.push(rest.to_string());
    } else if let Some(rest) = non_empty_suffix(&adapted_name, "set_") {
        aliases.push(format!("{}=", rest));
    }

    DerivedNames {
        adapted_name,
        aliases,
        predicate,
    }
}

fn non_empty_suffix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("GetDCEx", "get_dc_ex")]
    #[case("GetWindowText", "get_window_text")]
    #[case("IsWindow", "is_window")]
    #[case("EnumWindows", "enum_windows")]
    #[case("DdeGetLastError", "dde_get_last_error")]
    #[case("GetWindowTextW", "get_window_text_w")]
    #[case("HTTPRequest", "http_request")]
    #[case("MessageBeep", "message_beep")]
    #[case("keybd_event", "keybd_event")]
    #[case("Sleep", "sleep")]
    #[case("GetDlgItem32", "get_dlg_item32")]
    fn test_snake_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(snake_case(input), expected);
    }

    #[test]
    fn test_predicate_heuristic() {
        let derived = derive("IsWindow", None);
        assert_eq!(derived.adapted_name, "is_window");
        assert_eq!(derived.aliases, vec!["window?"]);
        assert!(derived.predicate);
    }

    #[test]
    fn test_getter_heuristic() {
        let derived = derive("GetWindowText", None);
        assert_eq!(derived.adapted_name, "get_window_text");
        assert_eq!(derived.aliases, vec!["window_text"]);
        assert!(!derived.predicate);
    }

    #[test]
    fn test_setter_heuristic() {
        let derived = derive("SetWindowText", None);
        assert_eq!(derived.aliases, vec!["window_text="]);
    }

    #[test]
    fn test_no_heuristic() {
        let derived = derive("ShowWindow", None);
        assert_eq!(derived.adapted_name, "show_window");
        assert!(derived.aliases.is_empty());
    }

    #[test]
    fn test_rename_runs_before_heuristics() {
        let derived = derive("IsIconic", Some("is_minimized"));
        assert_eq!(derived.adapted_name, "is_minimized");
        assert_eq!(derived.aliases, vec!["minimized?"]);
        assert!(derived.predicate);
    }

    #[test]
    fn test_bare_prefix_is_not_a_heuristic() {
        assert!(derive("x", Some("is_")).aliases.is_empty());
    }
}

use anyhow::Result;
use serde::Serialize;

/// String helpers shared by the settings loader, the shell facades and the CLI.
pub struct StringUtil;

impl StringUtil {
    /// Serialize a value to a pretty-printed JSON string.
    pub fn convert_to_json<T: Serialize>(value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }

    /// Convert a string to a boolean.
    ///
    /// Valid true values: `"1"`, `"true"`, `"yes"` (case-insensitive).
    /// Valid false values: `"0"`, `"false"`, `"no"` (case-insensitive).
    /// Returns `None` for unrecognized values.
    pub fn convert_to_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    }

    /// Quote `value` so a POSIX shell reads it back as a single word.
    ///
    /// Words made only of safe characters are returned unchanged.
    pub fn quote_for_shell(value: &str) -> String {
        let safe = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
        if safe {
            return value.to_string();
        }
        format!("'{}'", value.replace('\'', r"'\''"))
    }

    /// Returns `value` if it has non-whitespace content.
    pub fn non_blank(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

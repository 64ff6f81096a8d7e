use std::path::Path;

/// A rejected argument. Carries a human-readable reason naming the parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidArgument(pub String);

/// Argument validation helpers. Each returns `Err` instead of panicking so
/// callers can reject bad input before any side effect.
pub struct ArgUtil;

impl ArgUtil {
    /// The value must be `Some`.
    pub fn not_null<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T, InvalidArgument> {
        value
            .as_ref()
            .ok_or_else(|| InvalidArgument(format!("{name} must not be null")))
    }

    /// The string must contain at least one non-whitespace character.
    pub fn not_null_or_empty(value: &str, name: &str) -> Result<(), InvalidArgument> {
        if value.trim().is_empty() {
            return Err(InvalidArgument(format!("{name} must not be null or empty")));
        }
        Ok(())
    }

    /// Every entry of the list must be non-blank.
    pub fn no_blank_entries(values: &[String], name: &str) -> Result<(), InvalidArgument> {
        match values.iter().position(|v| v.trim().is_empty()) {
            Some(index) => Err(InvalidArgument(format!(
                "{name}[{index}] must not be null or empty"
            ))),
            None => Ok(()),
        }
    }

    /// The path must exist and be a directory.
    pub fn directory_exists(path: &Path, name: &str) -> Result<(), InvalidArgument> {
        if !path.exists() {
            return Err(InvalidArgument(format!(
                "Directory not found: '{}' (parameter '{name}')",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(InvalidArgument(format!(
                "Path is not a directory: '{}' (parameter '{name}')",
                path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn not_null_passes_for_some() {
        assert_eq!(ArgUtil::not_null(&Some(42), "val"), Ok(&42));
    }

    #[test]
    fn not_null_rejects_none() {
        let val: Option<i32> = None;
        let err = ArgUtil::not_null(&val, "images").unwrap_err();
        assert_eq!(err.to_string(), "images must not be null");
    }

    #[test]
    fn not_null_or_empty_rejects_blank() {
        assert!(ArgUtil::not_null_or_empty("1.0", "tag").is_ok());
        assert!(ArgUtil::not_null_or_empty("", "tag").is_err());
        assert!(ArgUtil::not_null_or_empty("   ", "tag").is_err());
    }

    #[test]
    fn no_blank_entries_reports_index() {
        let values = vec!["a".to_string(), " ".to_string()];
        let err = ArgUtil::no_blank_entries(&values, "images").unwrap_err();
        assert_eq!(err.to_string(), "images[1] must not be null or empty");
    }

    #[test]
    fn directory_exists_rejects_missing() {
        let err = ArgUtil::directory_exists(&PathBuf::from("/nonexistent_dir_abc123"), "d")
            .unwrap_err();
        assert!(err.to_string().starts_with("Directory not found"));
    }

    #[test]
    fn directory_exists_rejects_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = ArgUtil::directory_exists(file.path(), "d").unwrap_err();
        assert!(err.to_string().starts_with("Path is not a directory"));
    }
}

// SecretMasker: replaces registered secret values with `***` before
// command lines and output reach the logs.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Replacement text used when a secret is found.
const MASK: &str = "***";

/// Environment variable name fragments whose values are treated as secrets.
const SECRET_NAME_HINTS: &[&str] = &["PASSWORD", "TOKEN", "SECRET", "CREDENTIAL", "API_KEY"];

/// Shorter values would mask too much unrelated text.
const MIN_SECRET_LENGTH: usize = 3;

#[derive(Debug, Default)]
pub struct SecretMasker {
    /// Sorted longest first so a secret containing another is masked whole.
    secrets: RwLock<Vec<String>>,
}

impl SecretMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value to be masked. Blank and very short values are ignored.
    pub fn add_value(&self, secret: &str) {
        let trimmed = secret.trim();
        if trimmed.len() < MIN_SECRET_LENGTH {
            return;
        }

        let mut secrets = self.secrets.write();
        if !secrets.iter().any(|s| s == trimmed) {
            secrets.push(trimmed.to_string());
            secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        }
    }

    /// Register the values of every variable whose name looks secret.
    pub fn add_from_environment(&self, environment: &HashMap<String, String>) {
        for (name, value) in environment {
            let upper = name.to_uppercase();
            if SECRET_NAME_HINTS.iter().any(|hint| upper.contains(hint)) {
                self.add_value(value);
            }
        }
    }

    pub fn mask_secrets(&self, input: &str) -> String {
        let secrets = self.secrets.read();
        let mut result = input.to_string();
        for secret in secrets.iter() {
            if result.contains(secret.as_str()) {
                result = result.replace(secret.as_str(), MASK);
            }
        }
        result
    }

    pub fn secret_count(&self) -> usize {
        self.secrets.read().len()
    }
}

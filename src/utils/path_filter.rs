use crate::error::{DockupError, Result};
use regex::Regex;
use std::path::Path;

/// Glob based ignore predicate applied to paths relative to the scan root.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Regex>,
}

impl PathFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| pattern.trim())
            .filter(|pattern| !pattern.is_empty())
            .map(Self::compile_glob)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, relative: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|re| re.is_match(&normalized))
    }

    fn compile_glob(pattern: &str) -> Result<Regex> {
        let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
        let mut regex = String::from("^");
        for ch in trimmed.chars() {
            match ch {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '[' | ']' | '\\' => {
                    regex.push('\\');
                    regex.push(ch);
                }
                _ => regex.push(ch),
            }
        }
        regex.push('$');

        Regex::new(&regex).map_err(|e| {
            DockupError::ProjectValidation(format!("Invalid ignore pattern '{}': {}", pattern, e))
        })
    }
}

use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Languages the analysis engine can index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    JavaScript,
    TypeScript,
    Python,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Go,
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
    ];

    /// Detect language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "go" => Some(Language::Go),
            "js" | "jsx" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "py" => Some(Language::Python),
            _ => None,
        }
    }

    /// Detect language from a file path. Files without a mapped extension yield `None`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Name understood by the engine.
    pub const fn as_str(self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions_case_insensitively() {
        assert_eq!(Language::from_path("cmd/main.go"), Some(Language::Go));
        assert_eq!(Language::from_path("web/App.JSX"), Some(Language::JavaScript));
        assert_eq!(Language::from_path("web/index.tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("tool.PY"), Some(Language::Python));
    }

    #[test]
    fn unmapped_or_missing_extensions_are_none() {
        assert_eq!(Language::from_path("README.md"), None);
        assert_eq!(Language::from_path("Makefile"), None);
        assert_eq!(Language::from_path("lib.rs"), None);
    }
}

use std::path::PathBuf;

/// A path template whose `#` placeholder is replaced by a batch index or a
/// source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern(String);

const PLACEHOLDER: char = '#';

impl FilePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn has_placeholder(&self) -> bool {
        self.0.contains(PLACEHOLDER)
    }

    pub fn build(&self, value: impl std::fmt::Display) -> PathBuf {
        PathBuf::from(self.0.replace(PLACEHOLDER, &value.to_string()))
    }
}

impl std::fmt::Display for FilePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

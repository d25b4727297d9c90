use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    // IO and parsing errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid wildcard pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Option errors
    #[error("Invalid config-plugin-options: {message}")]
    InvalidOptions { message: String },

    // Module graph errors
    #[error("Module \"{module}\" configuration contains both \"path\" and \"package\" keys.")]
    ModuleHasBothSources { module: String },

    #[error("Module \"{module}\" config must have either \"path\" or \"package\" key.")]
    ModuleHasNoSource { module: String },

    #[error("Package {package} is defined in both vendor-override and module sections")]
    PackageInBothLayers { package: String },

    #[error("Package \"{package}\" is not installed")]
    PackageNotInstalled { package: String },

    #[error("Root module \"{module}\" does not present in configuration")]
    RootModuleMissing { module: String },

    #[error("Module \"{module}\" refers to unknown parent \"{parent}\"")]
    UnknownParentModule { module: String, parent: String },

    #[error("Module \"{module}\" is its own ancestor")]
    ParentCycle { module: String },

    #[error("Module \"{module}\" is not present in the merge plan")]
    UnknownModule { module: String },

    // Resolution errors
    #[error("Circular reference: group \"{group}\" of module \"{module}\" is already building")]
    CircularReference { module: String, group: String },

    #[error("Duplicate key \"{key}\" in group \"{group}\": {}", files_list(.files))]
    DuplicateKey {
        group: String,
        key: String,
        files: [PathBuf; 2],
    },

    #[error("Cannot merge a {incoming} into a {base} in group \"{group}\"")]
    ShapeMismatch {
        group: String,
        base: &'static str,
        incoming: &'static str,
    },

    #[error("The \"{environment}\" configuration environment does not exist.")]
    UnknownEnvironment { environment: String },

    #[error(transparent)]
    Load(#[from] LoadError),
}

fn files_list(files: &[PathBuf; 2]) -> String {
    format!("{}, {}", files[0].display(), files[1].display())
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failure raised while turning a fragment file into a definitions tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to load {}{}: {message}", .file.display(), location(.line, .column))]
pub struct LoadError {
    pub file: PathBuf,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl LoadError {
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

fn location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {} column {}", line, column),
        _ => String::new(),
    }
}

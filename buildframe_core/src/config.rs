//! Build configuration for builder derivation.

use crate::error::BuildframeError;
use convert_case::{Case, Casing};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a type's generated builder file lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRule {
    /// A generated directory next to the declaring source file, the default.
    Alongside { dir_name: String },
    /// A single flat output directory for the whole project.
    Flat { output_path: PathBuf },
}

impl OutputRule {
    /// Computes the output path for a builder derived from `type_name`
    /// declared in `source_file`.
    pub fn target_path(&self, source_file: &Path, type_name: &str) -> PathBuf {
        let file_name = builder_file_name(type_name);
        match self {
            OutputRule::Alongside { dir_name } => source_file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(dir_name)
                .join(file_name),
            OutputRule::Flat { output_path } => output_path.join(file_name),
        }
    }
}

/// File name rule for generated builders: snake_case of the type name plus
/// a `_builder.rs` suffix. Fixed so regeneration is stable across runs.
pub fn builder_file_name(type_name: &str) -> String {
    format!("{}_builder.rs", type_name.to_case(Case::Snake))
}

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root paths to scan for annotated types.
    pub source_roots: Vec<PathBuf>,

    /// Glob patterns excluded from scanning. Generated output directories
    /// are always excluded on top of these.
    pub ignore: Vec<String>,

    /// Extra derive names accepted as the derivation marker, in addition to
    /// `Buildable`.
    pub marker_aliases: Vec<String>,

    /// Where generated files are written.
    pub output: OutputRule,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_roots: vec![PathBuf::from(".")],
            ignore: vec!["**/target/**".to_string(), "**/.git/**".to_string()],
            marker_aliases: Vec::new(),
            output: OutputRule::Alongside {
                dir_name: "generated".to_string(),
            },
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from buildframe.toml.
    ///
    /// Searches for buildframe.toml starting from `CARGO_MANIFEST_DIR` (if
    /// set) or the current directory, walking upward to the filesystem root.
    ///
    /// # Errors
    ///
    /// Returns `BuildframeError::ConfigNotFound` if no buildframe.toml is
    /// found. Returns `BuildframeError::Config` if the file cannot be parsed.
    pub fn from_toml() -> Result<Self, BuildframeError> {
        let start_dir = env::var("CARGO_MANIFEST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        Self::from_toml_search(&start_dir)
    }

    /// Loads configuration from a specific buildframe.toml file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, BuildframeError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        Self::parse_toml(&content, path)
    }

    /// Searches for buildframe.toml starting from the given directory.
    fn from_toml_search(start_dir: &Path) -> Result<Self, BuildframeError> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join("buildframe.toml");
            if config_path.exists() {
                return Self::from_toml_path(&config_path);
            }

            if !current.pop() {
                return Err(BuildframeError::ConfigNotFound {
                    search_start: start_dir.to_path_buf(),
                });
            }
        }
    }

    /// Parses TOML content into a BuildConfig. Relative paths resolve from
    /// the config file's directory.
    fn parse_toml(content: &str, path: &Path) -> Result<Self, BuildframeError> {
        let value: toml::Value =
            toml::from_str(content).map_err(|e| BuildframeError::config(e.to_string()))?;

        let mut config = Self::default();
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        if let Some(scan) = value.get("scan").and_then(|v| v.as_table()) {
            if let Some(roots) = scan.get("roots").and_then(|v| v.as_array()) {
                config.source_roots = roots
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| base_dir.join(s))
                    .collect();
                if config.source_roots.is_empty() {
                    return Err(BuildframeError::config(
                        "scan.roots must name at least one directory",
                    ));
                }
            } else {
                config.source_roots = vec![base_dir.to_path_buf()];
            }

            if let Some(ignore) = scan.get("ignore").and_then(|v| v.as_array()) {
                config.ignore = ignore
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
            }

            if let Some(aliases) = scan.get("marker_aliases").and_then(|v| v.as_array()) {
                config.marker_aliases = aliases
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
            }
        } else {
            config.source_roots = vec![base_dir.to_path_buf()];
        }

        if let Some(output) = value.get("output").and_then(|v| v.as_table()) {
            let mode = output.get("mode").and_then(|v| v.as_str()).unwrap_or("alongside");
            match mode {
                "alongside" => {
                    let dir_name = output
                        .get("dir_name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("generated")
                        .to_string();
                    config.output = OutputRule::Alongside { dir_name };
                }
                "flat" => {
                    let path = output.get("path").and_then(|v| v.as_str()).ok_or_else(|| {
                        BuildframeError::config("output.mode = \"flat\" requires output.path")
                    })?;
                    config.output = OutputRule::Flat {
                        output_path: base_dir.join(path),
                    };
                }
                other => {
                    return Err(BuildframeError::config(format!(
                        "unknown output.mode `{}` (expected \"alongside\" or \"flat\")",
                        other
                    )));
                }
            }
        }

        Ok(config)
    }

    /// Creates a builder for programmatic configuration.
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder::new()
    }

    /// The generated directory name for [`OutputRule::Alongside`], if that
    /// rule is active.
    pub fn generated_dir_name(&self) -> Option<&str> {
        match &self.output {
            OutputRule::Alongside { dir_name } => Some(dir_name),
            OutputRule::Flat { .. } => None,
        }
    }
}

/// Builder for creating a BuildConfig programmatically.
#[derive(Debug, Clone, Default)]
pub struct BuildConfigBuilder {
    config: BuildConfig,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BuildConfig::default(),
        }
    }

    /// Replaces the set of source roots with a single root.
    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_roots = vec![path.into()];
        self
    }

    /// Adds a source root to scan.
    pub fn add_source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_roots.push(path.into());
        self
    }

    /// Adds an ignore glob.
    pub fn ignore(mut self, glob: impl Into<String>) -> Self {
        self.config.ignore.push(glob.into());
        self
    }

    /// Adds a marker alias accepted alongside `Buildable`.
    pub fn marker_alias(mut self, alias: impl Into<String>) -> Self {
        self.config.marker_aliases.push(alias.into());
        self
    }

    /// Emits builders into a generated directory next to each source file.
    pub fn alongside(mut self, dir_name: impl Into<String>) -> Self {
        self.config.output = OutputRule::Alongside {
            dir_name: dir_name.into(),
        };
        self
    }

    /// Emits all builders into one flat directory.
    pub fn flat(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.config.output = OutputRule::Flat {
            output_path: output_path.into(),
        };
        self
    }

    pub fn build(self) -> BuildConfig {
        self.config
    }
}

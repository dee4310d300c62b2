use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Stem used for source files and binaries when a language does not name its own
const DEFAULT_STEM: &str = "solution";

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Registry key (e.g., "cpp"), filled in by the registry
    #[serde(skip)]
    pub id: String,

    /// Human-readable name for the language (e.g., "C++ 17 (GCC)")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Source file name inside the workspace (defaults to `solution.<extension>`)
    #[serde(default)]
    pub source_name: Option<String>,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Get the source file name for this language
    pub fn source_name(&self) -> String {
        self.source_name
            .clone()
            .unwrap_or_else(|| format!("{DEFAULT_STEM}.{}", self.extension))
    }

    /// Build the compiler argv for a source file, or None for interpreted languages
    pub fn compile_command(&self, source: &Path, output_dir: &Path) -> Option<Vec<String>> {
        let compile = self.compile.as_ref()?;
        let binary = output_dir.join(&compile.output_name);
        Some(Self::expand_command(
            &compile.command,
            &source.to_string_lossy(),
            &binary.to_string_lossy(),
            &output_dir.to_string_lossy(),
        ))
    }

    /// Build the argv that runs the program
    ///
    /// `output_dir` is only meaningful for compiled languages; interpreted
    /// languages never reference it.
    pub fn run_command(&self, source: &Path, output_dir: Option<&Path>) -> Vec<String> {
        let source = source.to_string_lossy();
        match (output_dir, &self.compile) {
            (Some(dir), Some(compile)) => {
                let binary = dir.join(&compile.output_name);
                Self::expand_command(
                    &self.run.command,
                    &source,
                    &binary.to_string_lossy(),
                    &dir.to_string_lossy(),
                )
            }
            _ => Self::expand_command(&self.run.command, &source, "", ""),
        }
    }

    /// Expand placeholders in the given command
    pub fn expand_command(
        command: &[String],
        source: &str,
        output: &str,
        output_dir: &str,
    ) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{output_dir}", output_dir)
                    .replace("{output}", output)
            })
            .collect()
    }

    /// The programs this language needs on the host, compiler first
    pub fn programs(&self) -> Vec<&str> {
        let mut programs = Vec::new();
        if let Some(program) = self.compile.as_ref().and_then(|c| c.command.first()) {
            programs.push(program.as_str());
        }
        if let Some(program) = self.run.command.first()
            && !program.contains('{')
        {
            programs.push(program.as_str());
        }
        programs
    }
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {output}, {output_dir}
    pub command: Vec<String>,

    /// Binary name inside the output directory (e.g., "solution")
    #[serde(default = "default_output_name")]
    pub output_name: String,
}

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {output}, {output_dir}
    pub command: Vec<String>,
}

fn default_output_name() -> String {
    DEFAULT_STEM.to_owned()
}

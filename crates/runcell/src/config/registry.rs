//! The built-in language table
//!
//! The table is embedded at compile time and parsed once per process. It is
//! read-only afterwards, so a single registry is shared by every request.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{ConfigError, Language};

/// Language table embedded at compile time.
pub const LANGUAGES: &str = include_str!("../../languages.toml");

static BUILTIN: LazyLock<LanguageRegistry> = LazyLock::new(|| {
    LanguageRegistry::parse_toml(LANGUAGES).expect("embedded language table should be valid")
});

/// Read-only mapping from language id to its toolchain description
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: BTreeMap<String, Language>,
}

impl LanguageRegistry {
    /// The registry built from the embedded language table
    pub fn builtin() -> &'static LanguageRegistry {
        &BUILTIN
    }

    /// Parse and validate a language table
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let table = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let mut languages: BTreeMap<String, Language> = table.try_deserialize()?;
        for (id, language) in languages.iter_mut() {
            language.id = id.clone();
            validate(language)?;
        }

        Ok(Self { languages })
    }

    /// Look up a language by id, ignoring case and surrounding whitespace
    pub fn lookup(&self, id: &str) -> Result<&Language, ConfigError> {
        let key = id.trim().to_ascii_lowercase();
        self.languages
            .get(&key)
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Language ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Languages in id order
    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.languages.values()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

fn validate(lang: &Language) -> Result<(), ConfigError> {
    let id = &lang.id;
    if lang.name.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "language '{id}' has empty name"
        )));
    }
    if lang.extension.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "language '{id}' has empty extension"
        )));
    }
    if lang.run.command.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "language '{id}' has empty run command"
        )));
    }
    if let Some(ref name) = lang.source_name
        && (name.is_empty() || name.contains('/') || name.contains(".."))
    {
        return Err(ConfigError::Invalid(format!(
            "language '{id}' has invalid source name '{name}'"
        )));
    }
    match lang.compile {
        Some(ref compile) => {
            if compile.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty compile command"
                )));
            }
            if compile.output_name.is_empty() || compile.output_name.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has invalid output name"
                )));
            }
        }
        None => {
            if lang.run.command.iter().any(|arg| arg.contains("{output")) {
                return Err(ConfigError::Invalid(format!(
                    "interpreted language '{id}' references compile output in its run command"
                )));
            }
        }
    }

    Ok(())
}

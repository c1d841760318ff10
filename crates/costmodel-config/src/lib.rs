//! Configuration sources for cost model registries.
//!
//! Reads section/key/value documents from TOML, YAML or INI into a
//! format-neutral [`ConfigTree`]. The tree keeps sections and keys in document
//! order and does not merge repeated names, so consumers can enforce their own
//! uniqueness rules.
//!
//! # Examples
//!
//! Load a tree from a TOML string:
//!
//! ```
//! use costmodel_config::ConfigTree;
//!
//! let tree = ConfigTree::from_toml_str(r#"
//!     [BaseVariable]
//!     InputSize = "n"
//!
//!     [LinearModel]
//!     cost = "a*n + b"
//! "#).unwrap();
//!
//! assert_eq!(tree.sections().len(), 2);
//! assert_eq!(
//!     tree.section("BaseVariable").and_then(|s| s.get("InputSize")).and_then(|v| v.as_str()),
//!     Some("n"),
//! );
//! ```
//!
//! The format of a file is chosen from its extension:
//!
//! ```no_run
//! use costmodel_config::ConfigTree;
//!
//! let tree = ConfigTree::load("models.ini")?;
//! # Ok::<(), costmodel_config::ConfigError>(())
//! ```

mod de;
mod value;


use std::path::Path;

use thiserror::Error;

pub use value::ConfigValue;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("INI parse error: {0}")]
    Ini(#[from] ini::ParseError),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Text format of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Ini,
}

impl Format {
    /// Picks the format from a file extension (`toml`, `yaml`/`yml`,
    /// `ini`/`cfg`/`conf`).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Ok(Format::Toml),
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("ini" | "cfg" | "conf") => Ok(Format::Ini),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One `key = value` pair inside a section.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: ConfigValue,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A named section and its entries, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Appends an entry. Repeated keys are kept.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.entries.push(Entry::new(key, value));
        self
    }

    /// Returns the value of the first entry named `key`.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.value)
    }
}

/// Parsed configuration: an ordered list of sections.
///
/// Unlike a map, the tree keeps repeated section names and repeated keys.
/// The TOML and YAML parsers reject those themselves; INI sources and trees
/// built in code can carry them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    sections: Vec<Section>,
}

impl ConfigTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Appends a section.
    pub fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// All sections in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the first section named `name`.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Every section named `name`, in document order.
    pub fn sections_named(&self, name: &str) -> Vec<&Section> {
        self.sections.iter().filter(|s| s.name == name).collect()
    }

    /// Loads a tree from a file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns error if the extension is unknown, the file cannot be read or
    /// its contents do not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Format::from_path(path)? {
            Format::Toml => Self::from_toml_file(path),
            Format::Yaml => Self::from_yaml_file(path),
            Format::Ini => Self::from_ini_file(path),
        }
    }

    /// Parses a tree from a string in the given format.
    pub fn parse(s: &str, format: Format) -> Result<Self, ConfigError> {
        match format {
            Format::Toml => Self::from_toml_str(s),
            Format::Yaml => Self::from_yaml_str(s),
            Format::Ini => Self::from_ini_str(s),
        }
    }

    /// Loads a tree from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses a tree from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads a tree from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses a tree from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Loads a tree from an INI file.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ini_str(&contents)
    }

    /// Parses a tree from an INI string.
    ///
    /// Every INI value is a string. Keys before the first section header are
    /// rejected.
    pub fn from_ini_str(s: &str) -> Result<Self, ConfigError> {
        let document = ini::Ini::load_from_str(s)?;
        let mut tree = ConfigTree::new();
        for (name, properties) in document.iter() {
            let Some(name) = name else {
                if let Some((key, _)) = properties.iter().next() {
                    return Err(ConfigError::Invalid(format!(
                        "key '{key}' is not inside a section"
                    )));
                }
                continue;
            };
            let mut section = Section::new(name);
            for (key, value) in properties.iter() {
                section.entries.push(Entry::new(key, value));
            }
            tree.push_section(section);
        }
        Ok(tree)
    }
}

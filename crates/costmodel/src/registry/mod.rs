//! Registry of compiled models loaded from configuration.
//!
//! # Configuration layout
//!
//! ```toml
//! [BaseVariable]
//! InputSize = "n"          # name of the input size variable, shared by all models
//!
//! [LinearModel]            # model type: section name ends with "Model"
//! cost = "a*n + b"         # model name = expression
//!
//! [LinearModelConstant]    # optional constants of LinearModel
//! a = 2.0
//! b = 1.0
//! ```
//!
//! Section roles are recognised purely by name suffix, so an unrelated section
//! that happens to end in `Model` is treated as a model type.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::Path;

use costmodel_config::{ConfigTree, Format, Section};
use tracing::{debug, error, info, info_span, warn};

use crate::error::{ConfigurationError, LossOfPrecisionError};
use crate::model::{exact_input, Constants, ExpressionModel, Model};

/// Section holding the input size declaration.
pub const BASE_VARIABLE_SECTION: &str = "BaseVariable";

/// Key naming the input size variable inside [`BASE_VARIABLE_SECTION`].
pub const INPUT_SIZE_KEY: &str = "InputSize";

/// Suffix marking a model type section.
pub const MODEL_SECTION_SUFFIX: &str = "Model";

/// Suffix appended to a model type name to form its constants section.
pub const CONSTANT_SECTION_SUFFIX: &str = "Constant";

type ModelMap = BTreeMap<String, Box<dyn Model>>;

/// Read-only lookup of compiled models by model type and model name.
///
/// Built once from a configuration source; construction either loads every
/// model or fails. Models are owned by the registry and handed out as
/// borrows.
///
/// # Examples
///
/// ```
/// use costmodel::ModelRegistry;
///
/// let registry = ModelRegistry::from_toml_str(r#"
///     [BaseVariable]
///     InputSize = "n"
///
///     [LinearModel]
///     cost = "a*n + b"
///
///     [LinearModelConstant]
///     a = 2.0
///     b = 1.0
/// "#).unwrap();
///
/// let model = registry.model("LinearModel", "cost").unwrap();
/// assert_eq!(model.evaluate(10).unwrap(), 21.0);
/// assert!(registry.model("LinearModel", "missing").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    input_variable: String,
    model_types: BTreeMap<String, ModelMap>,
}

impl ModelRegistry {
    /// Loads a registry from a configuration file, choosing the format by
    /// extension (`.toml`, `.yaml`/`.yml`, `.ini`/`.cfg`/`.conf`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the file cannot be read or parsed or
    /// if any section, constant or model is invalid. Every error is logged
    /// before it is returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let span = info_span!("model_registry", source = %path.display());
        let _guard = span.enter();

        let tree = ConfigTree::load(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Error while parsing configuration file");
            ConfigurationError::from(e)
        })?;
        Self::build(&tree)
    }

    /// Parses a registry from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigurationError> {
        Self::parse(s, Format::Toml)
    }

    /// Parses a registry from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigurationError> {
        Self::parse(s, Format::Yaml)
    }

    /// Parses a registry from an INI string.
    pub fn from_ini_str(s: &str) -> Result<Self, ConfigurationError> {
        Self::parse(s, Format::Ini)
    }

    /// Parses a registry from a string in the given format.
    pub fn parse(s: &str, format: Format) -> Result<Self, ConfigurationError> {
        let span = info_span!("model_registry", source = ?format);
        let _guard = span.enter();

        let tree = ConfigTree::parse(s, format).map_err(|e| {
            error!(error = %e, "Error while parsing configuration");
            ConfigurationError::from(e)
        })?;
        Self::build(&tree)
    }

    /// Builds a registry from an already parsed tree.
    pub fn from_tree(tree: &ConfigTree) -> Result<Self, ConfigurationError> {
        let span = info_span!("model_registry", source = "tree");
        let _guard = span.enter();
        Self::build(tree)
    }

    fn build(tree: &ConfigTree) -> Result<Self, ConfigurationError> {
        let input_variable = read_input_variable(tree)?;
        let mut model_types: BTreeMap<String, ModelMap> = BTreeMap::new();

        for section in tree.sections() {
            if !section.name.ends_with(MODEL_SECTION_SUFFIX) {
                continue;
            }

            let constants = read_constants(tree, &section.name, &input_variable)?;
            let models = compile_models(section, &input_variable, &constants)?;

            if model_types.contains_key(&section.name) {
                error!(model_type = %section.name, "Duplicate model type sections");
                return Err(ConfigurationError::DuplicateModelType(section.name.clone()));
            }
            model_types.insert(section.name.clone(), models);
        }

        warn_orphan_constants(tree, &model_types);

        let registry = Self {
            input_variable,
            model_types,
        };
        info!(
            event = "registry_loaded",
            input_variable = %registry.input_variable,
            model_types = registry.model_types.len(),
            models = registry.len(),
        );
        Ok(registry)
    }

    /// Looks up a model. Returns `None` if either the type or the name is
    /// unknown.
    pub fn model(&self, model_type: &str, model_name: &str) -> Option<&dyn Model> {
        self.model_types
            .get(model_type)?
            .get(model_name)
            .map(Box::as_ref)
    }

    /// Name of the input size variable shared by every model.
    pub fn input_variable(&self) -> &str {
        &self.input_variable
    }

    /// Model type names in sorted order.
    pub fn model_types(&self) -> impl Iterator<Item = &str> {
        self.model_types.keys().map(String::as_str)
    }

    /// Model names of one type in sorted order, or `None` for an unknown type.
    pub fn model_names(&self, model_type: &str) -> Option<impl Iterator<Item = &str>> {
        self.model_types
            .get(model_type)
            .map(|models| models.keys().map(String::as_str))
    }

    /// Total number of models across all types.
    pub fn len(&self) -> usize {
        self.model_types.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluates `model_name` in every model type that defines it and returns
    /// the type with the lowest prediction.
    ///
    /// Ties go to the type that sorts first. NaN predictions are never
    /// chosen. Returns `Ok(None)` if no type defines `model_name`.
    ///
    /// # Errors
    ///
    /// Returns [`LossOfPrecisionError`] if `input_size` cannot be represented
    /// exactly.
    pub fn cheapest(
        &self,
        model_name: &str,
        input_size: u64,
    ) -> Result<Option<(&str, f64)>, LossOfPrecisionError> {
        exact_input(input_size)?;

        let mut best: Option<(&str, f64)> = None;
        for (model_type, models) in &self.model_types {
            let Some(model) = models.get(model_name) else {
                continue;
            };
            let cost = model.evaluate(input_size)?;
            if cost.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, lowest)| cost < lowest) {
                best = Some((model_type.as_str(), cost));
            }
        }
        Ok(best)
    }
}

fn read_input_variable(tree: &ConfigTree) -> Result<String, ConfigurationError> {
    let Some(value) = tree
        .section(BASE_VARIABLE_SECTION)
        .and_then(|section| section.get(INPUT_SIZE_KEY))
    else {
        error!(
            section = BASE_VARIABLE_SECTION,
            key = INPUT_SIZE_KEY,
            "Missing input size variable declaration"
        );
        return Err(ConfigurationError::MissingInputSize);
    };

    let Some(name) = value.as_str().map(str::trim) else {
        error!(value = %value, value_type = value.type_name(), "Input size variable must be a string");
        return Err(ConfigurationError::InvalidInputSize(format!(
            "expected a string, got a {}",
            value.type_name()
        )));
    };

    if !is_identifier(name) {
        error!(value = %name, "Input size variable is not an identifier");
        return Err(ConfigurationError::InvalidInputSize(format!(
            "'{name}' is not an identifier"
        )));
    }
    Ok(name.to_string())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn read_constants(
    tree: &ConfigTree,
    model_type: &str,
    input_variable: &str,
) -> Result<Constants, ConfigurationError> {
    let section_name = format!("{model_type}{CONSTANT_SECTION_SUFFIX}");
    let mut constants = Constants::new();

    let section = match tree.sections_named(&section_name).as_slice() {
        [] => return Ok(constants),
        [section] => *section,
        _ => {
            error!(section = %section_name, "Duplicate model constant sections");
            return Err(ConfigurationError::DuplicateConstantSection(section_name));
        }
    };

    for entry in &section.entries {
        let Some(value) = entry.value.as_f64() else {
            error!(section = %section_name, constant = %entry.key, value = %entry.value, "Invalid model constant value");
            return Err(ConfigurationError::InvalidConstant {
                section: section_name,
                constant: entry.key.clone(),
                value: entry.value.to_string(),
            });
        };
        if entry.key == input_variable {
            error!(section = %section_name, constant = %entry.key, "Model constant has the name of the input size variable");
            return Err(ConfigurationError::ConstantShadowsInput {
                section: section_name,
                constant: entry.key.clone(),
            });
        }
        if !constants.insert(entry.key.clone(), value) {
            error!(section = %section_name, constant = %entry.key, "Duplicate model constants");
            return Err(ConfigurationError::DuplicateConstant {
                section: section_name,
                constant: entry.key.clone(),
            });
        }
    }

    debug!(section = %section_name, constants = constants.len(), "Loaded model constants");
    Ok(constants)
}

fn compile_models(
    section: &Section,
    input_variable: &str,
    constants: &Constants,
) -> Result<ModelMap, ConfigurationError> {
    let model_type = &section.name;
    let mut models = ModelMap::new();

    for entry in &section.entries {
        let Some(expression) = entry.value.as_text() else {
            error!(model_type = %model_type, model = %entry.key, value = %entry.value, "Model value is not an expression");
            return Err(ConfigurationError::InvalidModelValue {
                model_type: model_type.clone(),
                model: entry.key.clone(),
                value_type: entry.value.type_name(),
            });
        };

        let model = ExpressionModel::compile(&expression, input_variable, constants).map_err(
            |source| {
                error!(
                    model_type = %model_type,
                    model = %entry.key,
                    expression = %expression,
                    error = %source,
                    "Invalid model expression"
                );
                ConfigurationError::InvalidExpression {
                    model_type: model_type.clone(),
                    model: entry.key.clone(),
                    expression: expression.to_string(),
                    source,
                }
            },
        )?;

        if models.contains_key(&entry.key) {
            error!(model_type = %model_type, model = %entry.key, "Duplicate model expression definitions");
            return Err(ConfigurationError::DuplicateModel {
                model_type: model_type.clone(),
                model: entry.key.clone(),
            });
        }
        debug!(model_type = %model_type, model = %entry.key, expression = %expression, "Compiled model");
        models.insert(entry.key.clone(), Box::new(model));
    }

    Ok(models)
}

/// Warns about `<Type>ModelConstant` sections whose model type was never
/// declared. They are otherwise ignored.
fn warn_orphan_constants(tree: &ConfigTree, model_types: &BTreeMap<String, ModelMap>) {
    for section in tree.sections() {
        let Some(model_type) = section.name.strip_suffix(CONSTANT_SECTION_SUFFIX) else {
            continue;
        };
        if model_type.ends_with(MODEL_SECTION_SUFFIX) && !model_types.contains_key(model_type) {
            warn!(section = %section.name, model_type = %model_type, "Model constants without a model type section");
        }
    }
}

//! Error types for cost model loading and evaluation

use costmodel_config::ConfigError;
use thiserror::Error;

/// Fatal error while building a [`ModelRegistry`](crate::ModelRegistry).
///
/// Any single malformed entry fails the whole construction.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The configuration source could not be read or parsed
    #[error("Error while parsing configuration: {0}")]
    Source(#[from] ConfigError),

    /// No input size variable is declared
    #[error("Missing mandatory 'InputSize' key in [BaseVariable]")]
    MissingInputSize,

    /// The input size declaration is not an identifier string
    #[error("Invalid 'InputSize' declaration: {0}")]
    InvalidInputSize(String),

    #[error("Duplicate model type sections for '{0}'")]
    DuplicateModelType(String),

    #[error("Duplicate model expression definitions for '{model}' in '{model_type}'")]
    DuplicateModel { model_type: String, model: String },

    #[error("Duplicate model constant sections for '{0}'")]
    DuplicateConstantSection(String),

    #[error("Duplicate model constant '{constant}' in '{section}'")]
    DuplicateConstant { section: String, constant: String },

    #[error("Invalid value for model constant '{constant}' in '{section}': '{value}' is not a number")]
    InvalidConstant {
        section: String,
        constant: String,
        value: String,
    },

    #[error("Model constant '{constant}' in '{section}' has the name of the input size variable")]
    ConstantShadowsInput { section: String, constant: String },

    #[error("Model '{model}' in '{model_type}' must be an expression, got a {value_type}")]
    InvalidModelValue {
        model_type: String,
        model: String,
        value_type: &'static str,
    },

    #[error("Invalid model expression '{model}' = '{expression}' in '{model_type}': {source}")]
    InvalidExpression {
        model_type: String,
        model: String,
        expression: String,
        source: ExpressionCompileError,
    },
}

/// An expression could not be compiled against its symbol table.
#[derive(Debug, Error)]
pub enum ExpressionCompileError {
    /// Rejected by the expression parser
    #[error("Failed to parse expression: {0}")]
    Parse(#[from] evalexpr::EvalexprError),

    #[error("Expression is empty")]
    Empty,

    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: &'static str,
        found: usize,
    },

    /// A construct outside numeric arithmetic (assignment, strings, tuples, ...)
    #[error("Unsupported expression construct: {0}")]
    Unsupported(String),

    #[error("Integer literal {0} cannot be represented exactly")]
    InexactLiteral(i64),

    #[error("Constant '{0}' has the name of the input size variable")]
    ConstantShadowsInput(String),
}

/// The input size cannot be converted to `f64` without rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot cast input size {input_size} without loss of precision (maximum is {max})")]
pub struct LossOfPrecisionError {
    pub input_size: u64,
    pub max: u64,
}

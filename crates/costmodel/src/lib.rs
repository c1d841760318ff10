//! Compiled cost models.
//!
//! A [`ModelRegistry`] loads a configuration describing model types, each a
//! set of named arithmetic expressions over one shared input size variable
//! and per-type constants. Every expression is compiled once at load time;
//! evaluating a model afterwards only walks the compiled tree.
//!
//! A loaded registry is `Send + Sync` and can be shared by reference for
//! lookups. See [`Model`] for evaluating one model from several threads.
//!
//! # Examples
//!
//! ```
//! use costmodel::{Model, ModelRegistry};
//!
//! let registry = ModelRegistry::from_toml_str(r#"
//!     [BaseVariable]
//!     InputSize = "n"
//!
//!     [LinearModel]
//!     cost = "a*n + b"
//!
//!     [LinearModelConstant]
//!     a = 2.0
//!     b = 1.0
//!
//!     [QuadraticModel]
//!     cost = "n^2"
//! "#).unwrap();
//!
//! let linear = registry.model("LinearModel", "cost").unwrap();
//! assert_eq!(linear.evaluate(10).unwrap(), 21.0);
//!
//! let (model_type, cost) = registry.cheapest("cost", 10).unwrap().unwrap();
//! assert_eq!((model_type, cost), ("LinearModel", 21.0));
//! ```

mod compile;
mod error;
mod eval;
mod expr;
mod model;
mod registry;

pub use error::{ConfigurationError, ExpressionCompileError, LossOfPrecisionError};
pub use model::{exact_input, Constants, ExpressionModel, Model, MAX_EXACT_INPUT};
pub use registry::{
    ModelRegistry, BASE_VARIABLE_SECTION, CONSTANT_SECTION_SUFFIX, INPUT_SIZE_KEY,
    MODEL_SECTION_SUFFIX,
};

pub use costmodel_config::{ConfigError, ConfigTree, ConfigValue, Entry, Format, Section};

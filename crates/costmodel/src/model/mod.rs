//! Compiled cost models.
//!
//! A [`Model`] predicts a cost from one non-negative input size. The only
//! implementation today is [`ExpressionModel`], an arithmetic expression over
//! the input size variable and a set of named [`Constants`].
//!
//! # Thread safety
//!
//! A model evaluates by writing the input size into a private cell that its
//! compiled expression reads. Models are `Send + Sync`, so a registry can be
//! shared and looked up from any number of threads. Evaluating the *same*
//! instance from two threads at once is memory safe but races on the cell
//! and may return the result for the other thread's input. Give each
//! evaluating thread its own instance (models and registries are `Clone`,
//! and a clone owns a fresh cell) or guard a shared one with a `Mutex`.


use std::fmt;

use crate::compile::{compile, SymbolTable};
use crate::error::{ExpressionCompileError, LossOfPrecisionError};
use crate::eval::{eval_expr, Environment};
use crate::expr::Expr;

/// Largest input size that converts to `f64` exactly: `2^53 - 1`.
pub const MAX_EXACT_INPUT: u64 = (1u64 << f64::MANTISSA_DIGITS) - 1;

/// Converts an input size to `f64`, refusing values that would be rounded.
#[inline]
pub fn exact_input(input_size: u64) -> Result<f64, LossOfPrecisionError> {
    if input_size > MAX_EXACT_INPUT {
        return Err(LossOfPrecisionError {
            input_size,
            max: MAX_EXACT_INPUT,
        });
    }
    Ok(input_size as f64)
}

/// A compiled cost model.
///
/// Models can be shared between threads, but each instance has one input
/// cell: concurrent `evaluate` calls on the same instance race on it. Clone
/// the model (or its registry) per evaluating thread instead.
pub trait Model: Send + Sync + fmt::Debug {
    /// Predicts the cost for `input_size`.
    ///
    /// # Errors
    ///
    /// Returns [`LossOfPrecisionError`] without evaluating anything if
    /// `input_size` exceeds [`MAX_EXACT_INPUT`].
    fn evaluate(&self, input_size: u64) -> Result<f64, LossOfPrecisionError>;

    /// Clones the model into a new box with its own input cell.
    fn clone_box(&self) -> Box<dyn Model>;
}

impl Clone for Box<dyn Model> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Named constants of one model type, in declaration order.
///
/// Names are unique: [`Constants::insert`] refuses a name that is already
/// present instead of overwriting it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    entries: Vec<(String, f64)>,
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant. Returns `false` and keeps the existing value if
    /// `name` is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value));
        true
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Slot of `name` in declaration order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Values in slot order.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }
}

/// A model backed by an arithmetic expression.
///
/// # Examples
///
/// ```
/// use costmodel::{Constants, ExpressionModel, Model};
///
/// let mut constants = Constants::new();
/// constants.insert("a", 2.0);
/// constants.insert("b", 1.0);
///
/// let model = ExpressionModel::compile("a*n + b", "n", &constants).unwrap();
/// assert_eq!(model.evaluate(10).unwrap(), 21.0);
/// ```
#[derive(Debug, Clone)]
pub struct ExpressionModel {
    source: String,
    input_variable: String,
    expr: Expr,
    env: Environment,
}

impl ExpressionModel {
    /// Compiles `source` with `input_variable` bound to the model's input
    /// cell and every constant bound read-only.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionCompileError`] on syntax errors, unknown
    /// identifiers or functions, and constructs that are not arithmetic.
    pub fn compile(
        source: &str,
        input_variable: &str,
        constants: &Constants,
    ) -> Result<Self, ExpressionCompileError> {
        let symbols = SymbolTable::new(input_variable, constants)?;
        let expr = compile(source, &symbols)?;
        Ok(Self {
            source: source.to_string(),
            input_variable: input_variable.to_string(),
            expr,
            env: Environment::new(constants.values()),
        })
    }

    /// Expression text the model was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn input_variable(&self) -> &str {
        &self.input_variable
    }
}

impl Model for ExpressionModel {
    #[inline]
    fn evaluate(&self, input_size: u64) -> Result<f64, LossOfPrecisionError> {
        self.env.set_input(exact_input(input_size)?);
        Ok(eval_expr(&self.expr, &self.env))
    }

    fn clone_box(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}

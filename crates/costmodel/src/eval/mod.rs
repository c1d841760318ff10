//! Expression evaluation against a bound environment.


use std::sync::atomic::{AtomicU64, Ordering};

use crate::expr::Expr;

/// Storage an expression is bound to: the input size cell and constant slots.
///
/// The input cell holds the bits of an `f64`. It is written before each
/// evaluation and read by [`Expr::Input`]. Accesses are relaxed: two
/// evaluations of one environment running at the same time race on the
/// value, so each concurrent caller needs its own instance.
#[derive(Debug, Default)]
pub(crate) struct Environment {
    input: AtomicU64,
    constants: Vec<f64>,
}

impl Environment {
    /// Creates an environment holding the given constant slots.
    pub(crate) fn new(constants: Vec<f64>) -> Self {
        Self {
            input: AtomicU64::new(0f64.to_bits()),
            constants,
        }
    }

    /// Overwrites the input size cell.
    #[inline]
    pub(crate) fn set_input(&self, value: f64) {
        self.input.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn input(&self) -> f64 {
        f64::from_bits(self.input.load(Ordering::Relaxed))
    }

    /// Value of a constant slot.
    #[inline]
    pub(crate) fn constant(&self, slot: usize) -> Option<f64> {
        self.constants.get(slot).copied()
    }
}

impl Clone for Environment {
    fn clone(&self) -> Self {
        Self {
            input: AtomicU64::new(self.input.load(Ordering::Relaxed)),
            constants: self.constants.clone(),
        }
    }
}

/// Evaluates an expression in the given environment.
pub(crate) fn eval_expr(expr: &Expr, env: &Environment) -> f64 {
    match expr {
        Expr::Literal(v) => *v,

        Expr::Input => env.input(),

        // Slots are resolved at compile time; NaN only for hand-built trees.
        Expr::Constant(slot) => env.constant(*slot).unwrap_or(f64::NAN),

        Expr::Add(left, right) => eval_expr(left, env) + eval_expr(right, env),
        Expr::Sub(left, right) => eval_expr(left, env) - eval_expr(right, env),
        Expr::Mul(left, right) => eval_expr(left, env) * eval_expr(right, env),
        Expr::Div(left, right) => eval_expr(left, env) / eval_expr(right, env),
        Expr::Mod(left, right) => eval_expr(left, env) % eval_expr(right, env),
        Expr::Pow(base, exponent) => eval_expr(base, env).powf(eval_expr(exponent, env)),
        Expr::Neg(inner) => -eval_expr(inner, env),

        Expr::Eq(left, right) => from_bool(eval_expr(left, env) == eval_expr(right, env)),
        Expr::Ne(left, right) => from_bool(eval_expr(left, env) != eval_expr(right, env)),
        Expr::Lt(left, right) => from_bool(eval_expr(left, env) < eval_expr(right, env)),
        Expr::Le(left, right) => from_bool(eval_expr(left, env) <= eval_expr(right, env)),
        Expr::Gt(left, right) => from_bool(eval_expr(left, env) > eval_expr(right, env)),
        Expr::Ge(left, right) => from_bool(eval_expr(left, env) >= eval_expr(right, env)),

        Expr::And(left, right) => {
            from_bool(is_true(eval_expr(left, env)) && is_true(eval_expr(right, env)))
        }
        Expr::Or(left, right) => {
            from_bool(is_true(eval_expr(left, env)) || is_true(eval_expr(right, env)))
        }
        Expr::Not(inner) => from_bool(!is_true(eval_expr(inner, env))),

        Expr::Abs(inner) => eval_expr(inner, env).abs(),
        Expr::Min(left, right) => eval_expr(left, env).min(eval_expr(right, env)),
        Expr::Max(left, right) => eval_expr(left, env).max(eval_expr(right, env)),

        Expr::Apply(function, arg) => function.apply(eval_expr(arg, env)),

        Expr::If {
            cond,
            then_expr,
            else_expr,
        } => {
            if is_true(eval_expr(cond, env)) {
                eval_expr(then_expr, env)
            } else {
                eval_expr(else_expr, env)
            }
        }
    }
}

#[inline]
fn is_true(value: f64) -> bool {
    value != 0.0
}

#[inline]
fn from_bool(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

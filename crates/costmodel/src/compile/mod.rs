//! Compilation of expression text into [`Expr`] trees.
//!
//! Parsing is delegated to `evalexpr`. Its operator tree is lowered once into
//! an [`Expr`], resolving every identifier against a [`SymbolTable`]:
//! the input size variable becomes [`Expr::Input`], constants become slots.
//! Anything that cannot be resolved fails here rather than at evaluation.
//!
//! All literals are widened to `f64`, so `1/2` is `0.5`. Integer literals
//! beyond `2^53 - 1` in magnitude would be rounded and are rejected.


use evalexpr::{Node, Operator, Value};

use crate::error::ExpressionCompileError;
use crate::expr::{Expr, MathFn};
use crate::model::{Constants, MAX_EXACT_INPUT};

/// Namespace prefix accepted in front of function names (`math::ln`).
const MATH_PREFIX: &str = "math::";

/// Names an expression may refer to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SymbolTable<'a> {
    input_variable: &'a str,
    constants: &'a Constants,
}

/// What an identifier resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Input,
    Constant(usize),
}

impl<'a> SymbolTable<'a> {
    /// Binds `input_variable` and every constant.
    ///
    /// # Errors
    ///
    /// Fails if a constant has the name of the input variable.
    pub(crate) fn new(
        input_variable: &'a str,
        constants: &'a Constants,
    ) -> Result<Self, ExpressionCompileError> {
        if constants.contains(input_variable) {
            return Err(ExpressionCompileError::ConstantShadowsInput(
                input_variable.to_string(),
            ));
        }
        Ok(Self {
            input_variable,
            constants,
        })
    }

    fn resolve(&self, identifier: &str) -> Option<Symbol> {
        if identifier == self.input_variable {
            Some(Symbol::Input)
        } else {
            self.constants.index_of(identifier).map(Symbol::Constant)
        }
    }
}

/// Parses `source` and lowers it against `symbols`.
pub(crate) fn compile(source: &str, symbols: &SymbolTable<'_>) -> Result<Expr, ExpressionCompileError> {
    let tree = evalexpr::build_operator_tree(source)?;
    lower(&tree, symbols)
}

fn lower(node: &Node, symbols: &SymbolTable<'_>) -> Result<Expr, ExpressionCompileError> {
    let children = node.children();
    match node.operator() {
        // Whole expression and parenthesised groups.
        Operator::RootNode => match children {
            [inner] => lower(inner, symbols),
            [] => Err(ExpressionCompileError::Empty),
            _ => Err(ExpressionCompileError::Unsupported(
                "multiple expressions".to_string(),
            )),
        },

        Operator::Add => binary(children, symbols, Expr::add),
        Operator::Sub => binary(children, symbols, Expr::sub),
        Operator::Mul => binary(children, symbols, Expr::mul),
        Operator::Div => binary(children, symbols, Expr::div),
        Operator::Mod => binary(children, symbols, Expr::modulo),
        Operator::Exp => binary(children, symbols, Expr::pow),
        Operator::Eq => binary(children, symbols, Expr::eq),
        Operator::Neq => binary(children, symbols, Expr::ne),
        Operator::Lt => binary(children, symbols, Expr::lt),
        Operator::Leq => binary(children, symbols, Expr::le),
        Operator::Gt => binary(children, symbols, Expr::gt),
        Operator::Geq => binary(children, symbols, Expr::ge),
        Operator::And => binary(children, symbols, Expr::and),
        Operator::Or => binary(children, symbols, Expr::or),
        Operator::Neg => unary(children, symbols, Expr::neg),
        Operator::Not => unary(children, symbols, Expr::not),

        Operator::Const { value } => literal(value),

        Operator::VariableIdentifierRead { identifier } => match symbols.resolve(identifier) {
            Some(Symbol::Input) => Ok(Expr::input()),
            Some(Symbol::Constant(slot)) => Ok(Expr::constant(slot)),
            None => Err(ExpressionCompileError::UnknownIdentifier(
                identifier.clone(),
            )),
        },

        Operator::FunctionIdentifier { identifier } => {
            let args = match children {
                [arg] => arguments(arg),
                _ => children.iter().collect(),
            };
            call(identifier, &args, symbols)
        }

        other => Err(ExpressionCompileError::Unsupported(other.to_string())),
    }
}

fn literal(value: &Value) -> Result<Expr, ExpressionCompileError> {
    match value {
        Value::Float(f) => Ok(Expr::literal(*f)),
        Value::Int(i) if i.unsigned_abs() <= MAX_EXACT_INPUT => Ok(Expr::literal(*i as f64)),
        Value::Int(i) => Err(ExpressionCompileError::InexactLiteral(*i)),
        Value::Boolean(b) => Ok(Expr::literal(if *b { 1.0 } else { 0.0 })),
        other => Err(ExpressionCompileError::Unsupported(format!(
            "literal {other}"
        ))),
    }
}

fn unary(
    children: &[Node],
    symbols: &SymbolTable<'_>,
    build: fn(Expr) -> Expr,
) -> Result<Expr, ExpressionCompileError> {
    match children {
        [inner] => Ok(build(lower(inner, symbols)?)),
        _ => Err(ExpressionCompileError::Unsupported(format!(
            "unary operator with {} operands",
            children.len()
        ))),
    }
}

fn binary(
    children: &[Node],
    symbols: &SymbolTable<'_>,
    build: fn(Expr, Expr) -> Expr,
) -> Result<Expr, ExpressionCompileError> {
    match children {
        [left, right] => Ok(build(lower(left, symbols)?, lower(right, symbols)?)),
        _ => Err(ExpressionCompileError::Unsupported(format!(
            "binary operator with {} operands",
            children.len()
        ))),
    }
}

/// Flattens a function argument node into its argument list.
///
/// `f(x)` carries `x` (possibly wrapped in a group), `f(x, y)` carries a tuple
/// and `f()` an empty group.
fn arguments(node: &Node) -> Vec<&Node> {
    match (node.operator(), node.children()) {
        (Operator::RootNode, [inner]) => arguments(inner),
        (Operator::RootNode, []) => Vec::new(),
        (Operator::Tuple, items) => items.iter().collect(),
        _ => vec![node],
    }
}

fn call(
    identifier: &str,
    args: &[&Node],
    symbols: &SymbolTable<'_>,
) -> Result<Expr, ExpressionCompileError> {
    let name = identifier.strip_prefix(MATH_PREFIX).unwrap_or(identifier);
    let arity = |expected: &'static str, ok: bool| {
        if ok {
            Ok(())
        } else {
            Err(ExpressionCompileError::Arity {
                function: identifier.to_string(),
                expected,
                found: args.len(),
            })
        }
    };
    let lowered = |node: &Node| lower(node, symbols);

    match name {
        "abs" => {
            arity("1", args.len() == 1)?;
            Ok(Expr::abs(lowered(args[0])?))
        }
        "pow" => {
            arity("2", args.len() == 2)?;
            Ok(Expr::pow(lowered(args[0])?, lowered(args[1])?))
        }
        "if" => {
            arity("3", args.len() == 3)?;
            Ok(Expr::if_then_else(
                lowered(args[0])?,
                lowered(args[1])?,
                lowered(args[2])?,
            ))
        }
        "min" | "max" => {
            arity("at least 1", !args.is_empty())?;
            let combine: fn(Expr, Expr) -> Expr = if name == "min" {
                Expr::min
            } else {
                Expr::max
            };
            let mut folded = lowered(args[0])?;
            for &arg in &args[1..] {
                folded = combine(folded, lowered(arg)?);
            }
            Ok(folded)
        }
        _ => {
            let function = MathFn::from_name(name)
                .ok_or_else(|| ExpressionCompileError::UnknownFunction(identifier.to_string()))?;
            arity("1", args.len() == 1)?;
            Ok(Expr::apply(function, lowered(args[0])?))
        }
    }
}

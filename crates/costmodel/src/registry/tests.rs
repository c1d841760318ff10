//! Tests for the model registry.

use super::*;
use crate::error::ExpressionCompileError;
use costmodel_config::ConfigValue;

const LINEAR: &str = r#"
    [BaseVariable]
    InputSize = "n"

    [LinearModel]
    cost = "a*n + b"
    slope = "a"

    [LinearModelConstant]
    a = 2.0
    b = 1.0

    [LogModel]
    cost = "c * n * log2(n)"

    [LogModelConstant]
    c = 0.5
"#;

const MAX_INPUT_PLUS_ONE: u64 = crate::model::MAX_EXACT_INPUT + 1;

fn base_variable() -> Section {
    Section::new(BASE_VARIABLE_SECTION).with_entry(INPUT_SIZE_KEY, "n")
}

#[test]
fn test_lookup_and_evaluate() {
    let registry = ModelRegistry::from_toml_str(LINEAR).unwrap();

    assert_eq!(registry.input_variable(), "n");
    let model = registry.model("LinearModel", "cost").unwrap();
    assert_eq!(model.evaluate(10).unwrap(), 21.0);
    assert_eq!(registry.model("LinearModel", "slope").unwrap().evaluate(99).unwrap(), 2.0);
    assert_eq!(registry.model("LogModel", "cost").unwrap().evaluate(8).unwrap(), 12.0);
}

#[test]
fn test_missing_lookup_is_none() {
    let registry = ModelRegistry::from_toml_str(LINEAR).unwrap();

    assert!(registry.model("LinearModel", "missing").is_none());
    assert!(registry.model("MissingModel", "cost").is_none());
    // Constant sections are not model types.
    assert!(registry.model("LinearModelConstant", "a").is_none());
}

#[test]
fn test_lookup_matches_configuration() {
    let registry = ModelRegistry::from_toml_str(LINEAR).unwrap();

    assert_eq!(
        registry.model_types().collect::<Vec<_>>(),
        ["LinearModel", "LogModel"]
    );
    assert_eq!(
        registry.model_names("LinearModel").unwrap().collect::<Vec<_>>(),
        ["cost", "slope"]
    );
    assert!(registry.model_names("MissingModel").is_none());
    assert_eq!(registry.len(), 3);
    assert!(!registry.is_empty());

    for model_type in registry.model_types() {
        for name in registry.model_names(model_type).unwrap() {
            assert!(registry.model(model_type, name).is_some());
        }
    }
}

#[test]
fn test_precision_error_through_registry() {
    let registry = ModelRegistry::from_toml_str(LINEAR).unwrap();
    let model = registry.model("LinearModel", "cost").unwrap();

    let err = model.evaluate(MAX_INPUT_PLUS_ONE).unwrap_err();
    assert_eq!(err.input_size, MAX_INPUT_PLUS_ONE);
    assert_eq!(model.evaluate(1).unwrap(), 3.0);
    assert!(registry.cheapest("cost", MAX_INPUT_PLUS_ONE).is_err());
}

#[test]
fn test_models_without_constants() {
    let registry = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "size"

        [PlainModel]
        square = "size^2"
        fixed = 42
        half = 0.5
    "#,
    )
    .unwrap();

    let square = registry.model("PlainModel", "square").unwrap();
    assert_eq!(square.evaluate(12).unwrap(), 144.0);
    assert_eq!(registry.model("PlainModel", "fixed").unwrap().evaluate(0).unwrap(), 42.0);
    assert_eq!(registry.model("PlainModel", "half").unwrap().evaluate(0).unwrap(), 0.5);
}

#[test]
fn test_empty_registry() {
    let registry = ModelRegistry::from_toml_str("[BaseVariable]\nInputSize = \"n\"\n").unwrap();

    assert!(registry.is_empty());
    assert_eq!(registry.model_types().count(), 0);
}

#[test]
fn test_missing_input_size() {
    let err = ModelRegistry::from_toml_str("[LinearModel]\ncost = \"1\"\n").unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingInputSize), "got {err:?}");

    let err = ModelRegistry::from_toml_str("[BaseVariable]\nOther = \"n\"\n").unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingInputSize), "got {err:?}");
}

#[test]
fn test_invalid_input_size() {
    let err = ModelRegistry::from_toml_str("[BaseVariable]\nInputSize = 3\n").unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidInputSize(_)), "got {err:?}");

    let err = ModelRegistry::from_toml_str("[BaseVariable]\nInputSize = \"n m\"\n").unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidInputSize(_)), "got {err:?}");

    let err = ModelRegistry::from_toml_str("[BaseVariable]\nInputSize = \"\"\n").unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidInputSize(_)), "got {err:?}");
}

#[test]
fn test_undeclared_identifier_fails_load() {
    let err = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "a*n + z"

        [LinearModelConstant]
        a = 2.0
    "#,
    )
    .unwrap_err();

    match err {
        ConfigurationError::InvalidExpression {
            model_type,
            model,
            expression,
            source: ExpressionCompileError::UnknownIdentifier(name),
        } => {
            assert_eq!(model_type, "LinearModel");
            assert_eq!(model, "cost");
            assert_eq!(expression, "a*n + z");
            assert_eq!(name, "z");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_constants_are_scoped_to_their_type() {
    let err = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "a*n"

        [LinearModelConstant]
        a = 2.0

        [OtherModel]
        cost = "a*n"
    "#,
    )
    .unwrap_err();

    assert!(
        matches!(&err, ConfigurationError::InvalidExpression { model_type, .. } if model_type == "OtherModel"),
        "got {err:?}"
    );
}

#[test]
fn test_syntax_error_fails_load() {
    let err = ModelRegistry::from_toml_str(
        "[BaseVariable]\nInputSize = \"n\"\n[LinearModel]\ncost = \"(n\"\n",
    )
    .unwrap_err();
    assert!(
        matches!(
            err,
            ConfigurationError::InvalidExpression {
                source: ExpressionCompileError::Parse(_),
                ..
            }
        ),
        "got {err:?}"
    );
}

#[test]
fn test_invalid_constant() {
    let err = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "a*n"

        [LinearModelConstant]
        a = "two"
    "#,
    )
    .unwrap_err();

    match err {
        ConfigurationError::InvalidConstant {
            section,
            constant,
            value,
        } => {
            assert_eq!(section, "LinearModelConstant");
            assert_eq!(constant, "a");
            assert_eq!(value, "two");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_boolean_constant_is_invalid() {
    let tree = ConfigTree::new()
        .with_section(base_variable())
        .with_section(Section::new("LinearModel").with_entry("cost", "a*n"))
        .with_section(Section::new("LinearModelConstant").with_entry("a", true));

    let err = ModelRegistry::from_tree(&tree).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidConstant { .. }), "got {err:?}");
}

#[test]
fn test_constant_shadowing_input() {
    let err = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "n"

        [LinearModelConstant]
        n = 3.0
    "#,
    )
    .unwrap_err();

    assert!(
        matches!(&err, ConfigurationError::ConstantShadowsInput { constant, .. } if constant == "n"),
        "got {err:?}"
    );
}

#[test]
fn test_duplicate_model_type() {
    let tree = ConfigTree::new()
        .with_section(base_variable())
        .with_section(Section::new("LinearModel").with_entry("cost", "n"))
        .with_section(Section::new("LinearModel").with_entry("other", "2*n"));

    let err = ModelRegistry::from_tree(&tree).unwrap_err();
    assert!(
        matches!(&err, ConfigurationError::DuplicateModelType(name) if name == "LinearModel"),
        "got {err:?}"
    );
}

#[test]
fn test_duplicate_model() {
    let tree = ConfigTree::new()
        .with_section(base_variable())
        .with_section(
            Section::new("LinearModel")
                .with_entry("cost", "n")
                .with_entry("cost", "2*n"),
        );

    let err = ModelRegistry::from_tree(&tree).unwrap_err();
    assert!(
        matches!(&err, ConfigurationError::DuplicateModel { model, .. } if model == "cost"),
        "got {err:?}"
    );
}

#[test]
fn test_duplicate_constant_section() {
    let tree = ConfigTree::new()
        .with_section(base_variable())
        .with_section(Section::new("LinearModel").with_entry("cost", "a*n"))
        .with_section(Section::new("LinearModelConstant").with_entry("a", 1.0))
        .with_section(Section::new("LinearModelConstant").with_entry("a", 2.0));

    let err = ModelRegistry::from_tree(&tree).unwrap_err();
    assert!(
        matches!(&err, ConfigurationError::DuplicateConstantSection(name) if name == "LinearModelConstant"),
        "got {err:?}"
    );
}

#[test]
fn test_duplicate_constant() {
    let tree = ConfigTree::new()
        .with_section(base_variable())
        .with_section(Section::new("LinearModel").with_entry("cost", "a*n"))
        .with_section(
            Section::new("LinearModelConstant")
                .with_entry("a", 1.0)
                .with_entry("a", 2.0),
        );

    let err = ModelRegistry::from_tree(&tree).unwrap_err();
    assert!(
        matches!(&err, ConfigurationError::DuplicateConstant { constant, .. } if constant == "a"),
        "got {err:?}"
    );
}

#[test]
fn test_duplicate_toml_sections_fail_load() {
    let err = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "n"

        [LinearModel]
        other = "n"
    "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::Source(_)), "got {err:?}");
}

#[test]
fn test_invalid_model_value() {
    let tree = ConfigTree::new()
        .with_section(base_variable())
        .with_section(Section::new("LinearModel").with_entry("cost", ConfigValue::Bool(true)));

    let err = ModelRegistry::from_tree(&tree).unwrap_err();
    match err {
        ConfigurationError::InvalidModelValue {
            model_type,
            model,
            value_type,
        } => {
            assert_eq!(model_type, "LinearModel");
            assert_eq!(model, "cost");
            assert_eq!(value_type, "boolean");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_orphan_constants_are_ignored() {
    let registry = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "n"

        [MissingModelConstant]
        a = 1.0
    "#,
    )
    .unwrap();

    assert_eq!(registry.model_types().collect::<Vec<_>>(), ["LinearModel"]);
}

#[test]
fn test_cheapest() {
    let registry = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "100 * n"

        [QuadraticModel]
        cost = "n^2"

        [SqrtModel]
        cost = "sqrt(-1) + n"
        only = "n"
    "#,
    )
    .unwrap();

    assert_eq!(registry.cheapest("cost", 10).unwrap(), Some(("QuadraticModel", 100.0)));
    assert_eq!(registry.cheapest("cost", 1000).unwrap(), Some(("LinearModel", 100_000.0)));
    // Equal costs go to the type that sorts first.
    assert_eq!(registry.cheapest("cost", 100).unwrap(), Some(("LinearModel", 10_000.0)));
    assert_eq!(registry.cheapest("only", 5).unwrap(), Some(("SqrtModel", 5.0)));
    assert_eq!(registry.cheapest("missing", 5).unwrap(), None);
}

#[test]
fn test_clone_is_independent() {
    let registry = ModelRegistry::from_toml_str(LINEAR).unwrap();
    let copy = registry.clone();

    let handle = std::thread::spawn(move || {
        let model = copy.model("LinearModel", "cost").unwrap();
        (0..100u64).map(|n| model.evaluate(n).unwrap()).sum::<f64>()
    });

    let model = registry.model("LinearModel", "cost").unwrap();
    let local: f64 = (0..100u64).map(|n| model.evaluate(n).unwrap()).sum();
    assert_eq!(handle.join().unwrap(), local);
    assert_eq!(local, 2.0 * 4950.0 + 100.0);
}

#[test]
fn test_shared_lookup_from_threads() {
    let registry = ModelRegistry::from_toml_str(LINEAR).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let linear = registry.model("LinearModel", "cost").is_some();
                    let log = registry.model("LogModel", "cost").is_some();
                    let missing = registry.model("LinearModel", "missing").is_none();
                    linear && log && missing
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    });
}

#[test]
fn test_inexact_integer_constant() {
    let err = ModelRegistry::from_toml_str(
        r#"
        [BaseVariable]
        InputSize = "n"

        [LinearModel]
        cost = "a*n"

        [LinearModelConstant]
        a = 9007199254740993
    "#,
    )
    .unwrap_err();
    assert!(
        matches!(&err, ConfigurationError::InvalidConstant { constant, .. } if constant == "a"),
        "got {err:?}"
    );
}

#[test]
fn test_yaml_source() {
    let registry = ModelRegistry::from_yaml_str(
        r#"
        BaseVariable:
          InputSize: n
        LinearModel:
          cost: "a*n + b"
        LinearModelConstant:
          a: 2
          b: 1.0
    "#,
    )
    .unwrap();

    assert_eq!(registry.model("LinearModel", "cost").unwrap().evaluate(10).unwrap(), 21.0);
}

#[test]
fn test_ini_source() {
    let registry = ModelRegistry::from_ini_str(
        "
[BaseVariable]
InputSize = n

[LinearModel]
cost = a*n + b

[LinearModelConstant]
a = 2
b = 1.0
",
    )
    .unwrap();

    assert_eq!(registry.model("LinearModel", "cost").unwrap().evaluate(10).unwrap(), 21.0);
}

#[test]
fn test_ini_constant_must_be_numeric() {
    let err = ModelRegistry::from_ini_str(
        "[BaseVariable]\nInputSize = n\n[LinearModel]\ncost = a*n\n[LinearModelConstant]\na = abc\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidConstant { .. }), "got {err:?}");
}

//! 模块加载、别名与名称解析

mod common;

use std::sync::Arc;

use common::*;
use crispr_runtime::{Action, CallErrorKind, CrisprError, FrameworkError, Num, RuntimeError, Value};

fn runtime_error(result: Result<Vec<Action>, CrisprError>) -> RuntimeError {
    match result {
        Err(CrisprError::Runtime(e)) => e,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

fn command_kind(error: &RuntimeError) -> CallErrorKind {
    match error {
        RuntimeError::Command(e) => e.kind,
        other => panic!("expected a command error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_std_available_without_load() {
    let mut interpreter = interpreter();
    interpreter.interpret("std:print a\nprint b").await.unwrap();
    assert_eq!(interpreter.logs(), ["a", "b"]);
}

#[tokio::test]
async fn test_load_std_shares_instance() {
    let mut interpreter = interpreter();
    interpreter.interpret("load std").await.unwrap();

    let loaded = interpreter.bindings().get_module("std").unwrap();
    assert!(Arc::ptr_eq(&loaded.descriptor, &interpreter.registry().std_module()));

    let error = runtime_error(interpreter.interpret("load std").await);
    let RuntimeError::Command(e) = &error else {
        panic!("expected a command error, got {error:?}");
    };
    assert_eq!(e.kind, CallErrorKind::Failed);
    assert_eq!(e.message, "module std already loaded");
}

#[tokio::test]
async fn test_load_module_commands() {
    let mut interpreter = interpreter();
    let actions = interpreter
        .interpret(&format!("load sample\nsample:pay {DAI} 3"))
        .await
        .unwrap();
    assert_eq!(actions[0].as_transaction().unwrap().value, Some(Num::from_int(3)));

    let error = runtime_error(interpreter.interpret("load sample").await);
    assert_eq!(command_kind(&error), CallErrorKind::Failed);
}

#[tokio::test]
async fn test_load_with_alias() {
    for script in ["load sample as s", "load sample --as s"] {
        let mut interpreter = interpreter();
        interpreter.interpret(script).await.unwrap();

        let actions = interpreter.interpret(&format!("s:pay {DAI} 1")).await.unwrap();
        assert_eq!(actions.len(), 1);

        let error = runtime_error(interpreter.interpret(&format!("sample:pay {DAI} 1")).await);
        assert_eq!(command_kind(&error), CallErrorKind::ModuleNotFound);
    }
}

#[tokio::test]
async fn test_load_alias_errors() {
    let mut interpreter = interpreter();
    let error = runtime_error(interpreter.interpret("load sample as").await);
    assert_eq!(command_kind(&error), CallErrorKind::InvalidArgument);

    let error = runtime_error(interpreter.interpret("load sample as s --as t").await);
    assert_eq!(command_kind(&error), CallErrorKind::InvalidArgument);

    interpreter.interpret("load sample as s").await.unwrap();
    let error = runtime_error(interpreter.interpret("load std as s").await);
    let RuntimeError::Command(e) = &error else {
        panic!("expected a command error, got {error:?}");
    };
    assert_eq!(e.message, "alias s already in use");
}

#[tokio::test]
async fn test_load_unknown_module() {
    let mut interpreter = interpreter();
    let error = runtime_error(interpreter.interpret("load nowhere").await);
    assert!(matches!(error, RuntimeError::Framework(FrameworkError::NotFound(_))));
    assert!(interpreter.bindings().get_module("nowhere").is_none());
}

#[tokio::test]
async fn test_command_resolution_errors() {
    let mut interpreter = interpreter();

    let error = runtime_error(interpreter.interpret("sample:pick 1").await);
    let RuntimeError::Command(e) = &error else {
        panic!("expected a command error, got {error:?}");
    };
    assert_eq!(e.kind, CallErrorKind::ModuleNotFound);
    assert_eq!(e.message, "module sample is not loaded, use `load sample` first");

    let error = runtime_error(interpreter.interpret("nowhere:pick 1").await);
    assert_eq!(command_kind(&error), CallErrorKind::ModuleNotFound);

    let error = runtime_error(interpreter.interpret("frobnicate 1").await);
    assert_eq!(command_kind(&error), CallErrorKind::NotFound);

    interpreter.interpret("load sample").await.unwrap();
    let error = runtime_error(interpreter.interpret("sample:missing").await);
    let RuntimeError::Command(e) = &error else {
        panic!("expected a command error, got {error:?}");
    };
    assert_eq!(e.kind, CallErrorKind::NotFound);
    assert_eq!(e.message, "command missing not found in module sample");
}

#[tokio::test]
async fn test_helpers_need_loaded_module() {
    let mut interpreter = interpreter();
    let error = runtime_error(interpreter.interpret("set $x @double(2)").await);
    let RuntimeError::Helper(e) = &error else {
        panic!("expected a helper error, got {error:?}");
    };
    assert_eq!(e.kind, CallErrorKind::NotFound);

    interpreter.interpret("load sample\nset $x @double(2)").await.unwrap();
    assert_eq!(
        interpreter.bindings().get_value("x", crispr_runtime::BindingsSpace::User),
        Some(&Value::Number(Num::from_int(4)))
    );

    let error = runtime_error(interpreter.interpret("set $y @double()").await);
    let RuntimeError::Helper(e) = &error else {
        panic!("expected a helper error, got {error:?}");
    };
    assert_eq!(e.kind, CallErrorKind::Arity);
}

#[tokio::test]
async fn test_module_argument_types_are_checked() {
    let mut interpreter = interpreter();
    let error = runtime_error(interpreter.interpret("load sample\nsample:pay 1 2").await);
    let RuntimeError::Command(e) = &error else {
        panic!("expected a command error, got {error:?}");
    };
    assert_eq!(e.kind, CallErrorKind::InvalidArgument);
    assert_eq!(e.message, "<to>: expected address, but got number");
    assert_eq!(e.loc.start.line, 2);
}

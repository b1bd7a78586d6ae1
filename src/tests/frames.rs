use crate::config::RuntimeConfig;
use crate::language::{
    span::Span,
    token::{AssignOp, BinaryOp},
};
use crate::runtime::{
    environment::FrameRef,
    error::{RuntimeError, RuntimeResult},
    value::{BodyRef, CallableValue, Value},
    Interpreter,
};

fn span() -> Span {
    Span::new("frames.kiwi", 10, 3)
}

fn global_value(interp: &Interpreter, name: &str) -> Option<Value> {
    interp.global().borrow().local(name)
}

#[test]
fn scalar_parameters_copy_out_by_name() {
    let mut interp = Interpreter::new();
    interp.assign("x", Value::Int(1));
    interp.assign("count", Value::Int(0));
    let bump = CallableValue::function("bump", vec!["x".into()], BodyRef(0));

    interp
        .call_routine(&bump, vec![Value::Int(1)], &span(), |interp, _| {
            interp.assign_op("x", AssignOp::Binary(BinaryOp::Add), Value::Int(10), &span())?;
            // not a parameter, but the caller has a binding with this name
            interp.assign("count", Value::Int(5));
            interp.assign("scratch", Value::Int(9));
            Ok(())
        })
        .expect("call");

    assert!(matches!(global_value(&interp, "x"), Some(Value::Int(11))));
    assert!(matches!(global_value(&interp, "count"), Some(Value::Int(5))));
    assert!(global_value(&interp, "scratch").is_none());
    assert_eq!(interp.depth(), 0);
}

#[test]
fn container_arguments_are_aliased_during_the_call() {
    let mut interp = Interpreter::new();
    let items = Value::list(vec![Value::Int(1)]);
    interp.assign("items", items.clone());
    let append = CallableValue::function("append", vec!["list".into()], BodyRef(1));

    interp
        .call_routine(&append, vec![items.clone()], &span(), |interp, _| {
            interp.assign_op("list", AssignOp::Binary(BinaryOp::Add), Value::Int(2), &span())?;
            // the caller's handle already sees the append
            let seen = interp.global().borrow().local("items");
            assert_eq!(seen.map(|v| v.to_string()).as_deref(), Some("[1, 2]"));
            Ok(())
        })
        .expect("call");

    assert_eq!(items.to_string(), "[1, 2]");
    assert!(global_value(&interp, "list").is_none());
}

#[test]
fn reassigning_a_colliding_name_is_visible_after_return() {
    let mut interp = Interpreter::new();
    interp.assign("data", Value::list(vec![Value::Int(1)]));
    let replace = CallableValue::function("replace", vec!["data".into()], BodyRef(2));
    let arg = global_value(&interp, "data").expect("bound");

    interp
        .call_routine(&replace, vec![arg], &span(), |interp, _| {
            interp.assign("data", Value::list(vec![Value::string("fresh")]));
            Ok(())
        })
        .expect("call");

    let data = global_value(&interp, "data").expect("bound");
    assert_eq!(data.to_string(), "[\"fresh\"]");
}

#[test]
fn failed_calls_skip_copy_back() {
    let mut interp = Interpreter::new();
    interp.assign("x", Value::Int(1));
    let fail = CallableValue::function("fail", vec!["x".into()], BodyRef(3));

    let err = interp
        .call_routine(&fail, vec![Value::Int(1)], &span(), |interp, _| {
            interp.assign("x", Value::Int(99));
            interp.evaluate_binary(BinaryOp::Div, Value::Int(1), Value::Int(0), &span())?;
            Ok(())
        })
        .expect_err("divide by zero");

    assert!(matches!(err, RuntimeError::DivideByZero { .. }));
    assert!(matches!(global_value(&interp, "x"), Some(Value::Int(1))));
    assert_eq!(interp.depth(), 0);
}

#[test]
fn closures_read_their_captured_scope() {
    let mut interp = Interpreter::new();
    let outer = interp
        .push_frame(vec![("base".to_string(), Value::Int(40))], Some(interp.global()), &span())
        .expect("outer");
    let add = CallableValue::lambda(vec!["n".into()], BodyRef(4), outer.clone());
    interp.pop_frame(&outer, &interp.global());

    let result = interp
        .call_routine(&add, vec![Value::Int(2)], &span(), |interp, frame| {
            let base = interp.lookup("base", &span())?;
            let n = interp.lookup("n", &span())?;
            let sum = interp.evaluate_binary(BinaryOp::Add, base, n, &span())?;
            frame.borrow_mut().set_return(sum);
            Ok(())
        })
        .expect("call");
    assert!(matches!(result, Value::Int(42)));
}

#[test]
fn catch_binds_the_raised_value_in_a_handler_frame() {
    let mut interp = Interpreter::new();
    let error = interp.raise(Value::string("boom"), &span());
    assert_eq!(error.kind(), "Error");
    assert!(interp.global().borrow().has_error());

    let handler = interp.catch_error(&error, Some("e"), &span()).expect("handler");
    assert_eq!(handler.borrow().local("e").map(|v| v.to_string()).as_deref(), Some("boom"));
    assert!(!interp.global().borrow().has_error());
    assert_eq!(interp.depth(), 1);
    interp.pop_frame(&handler, &interp.global());
    assert_eq!(interp.depth(), 0);

    let internal = RuntimeError::DivideByZero { span: span() };
    let handler = interp.catch_error(&internal, Some("e"), &span()).expect("handler");
    assert_eq!(
        handler.borrow().local("e").map(|v| v.to_string()).as_deref(),
        Some("Attempted to divide by zero")
    );
    interp.discard_frame(&handler);

    let unnamed: FrameRef = interp.catch_error(&internal, None, &span()).expect("handler");
    assert!(unnamed.borrow().names().next().is_none());
}

#[test]
fn raised_value_stays_pending_until_caught_by_the_caller() {
    let mut interp = Interpreter::new();
    let thrower = CallableValue::function("thrower", Vec::new(), BodyRef(7));

    let err = interp
        .call_routine(&thrower, Vec::new(), &span(), |interp, frame| {
            let err = interp.raise(Value::Int(404), &span());
            assert!(frame.borrow().has_error());
            Err(err)
        })
        .expect_err("raised");
    assert!(matches!(err, RuntimeError::Raised { .. }));
    assert!(interp.global().borrow().has_error());

    let handler = interp.catch_error(&err, Some("code"), &span()).expect("handler");
    assert!(matches!(handler.borrow().local("code"), Some(Value::Int(404))));
    assert!(!interp.global().borrow().has_error());
    interp.pop_frame(&handler, &interp.global());
}

#[test]
fn parameters_absent_in_caller_are_not_created() {
    let mut interp = Interpreter::new();
    interp.assign("y", Value::Int(3));
    let set = CallableValue::function("set", vec!["x".into()], BodyRef(8));

    interp
        .call_routine(&set, vec![Value::Int(1)], &span(), |interp, _| {
            interp.assign("x", Value::Int(50));
            Ok(())
        })
        .expect("call");

    let global = interp.global();
    let global = global.borrow();
    assert!(!global.has_local("x"));
    assert!(matches!(global.local("y"), Some(Value::Int(3))));
    assert_eq!(global.names().count(), 1);
}

fn recurse(interp: &mut Interpreter, callable: &CallableValue) -> RuntimeResult<()> {
    interp
        .call_routine(callable, Vec::new(), &span(), |interp, _| recurse(interp, callable))
        .map(|_| ())
}

#[test]
fn unbounded_recursion_becomes_stack_overflow() {
    let mut interp = Interpreter::with_config(RuntimeConfig {
        max_call_depth: 32,
        ..RuntimeConfig::default()
    });
    let forever = CallableValue::function("forever", Vec::new(), BodyRef(5));
    let err = recurse(&mut interp, &forever).expect_err("overflow");
    assert!(matches!(err, RuntimeError::StackOverflow { limit: 32, .. }));
    assert_eq!(interp.depth(), 0);

    // the interpreter stays usable afterwards
    let ok = CallableValue::function("ok", Vec::new(), BodyRef(6));
    assert!(interp.call_routine(&ok, Vec::new(), &span(), |_, _| Ok(())).is_ok());
}

// core/tests/pipeline_execution_tests.rs
mod common;

use common::*;
use eva_flow::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<CheckoutTrace, TraceError>::new(&[("validate", false, None), ("price", false, None), ("persist", false, None)]);

  pipeline.on_root("validate", recording_step("validate", " V"));
  pipeline.on_root("price", recording_step("price", " P"));
  pipeline.on_root("persist", recording_step("persist", " W"));

  let ctx = ContextData::new(CheckoutTrace::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.runs, 3);
  assert_eq!(guard.trail, " V P W");
  assert_eq!(guard.visited, vec!["validate", "price", "persist"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_stop_signal() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[
    ("load_cart", false, None),
    ("reserve", false, None),
    ("charge", false, None),
  ]);
  pipeline.on_root("load_cart", recording_step("load_cart", "A"));
  pipeline.on_root("reserve", recording_step("reserve", "B"));
  pipeline.on_root("charge", recording_step("charge", "C"));

  let ctx = ContextData::new(CheckoutTrace {
    halt_at: Some("reserve".to_string()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.trail, "AB");
  assert_eq!(guard.visited, vec!["load_cart", "reserve"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_handler_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[
    ("load_cart", false, None),
    ("charge", false, None),
    ("notify", false, None),
  ]);
  pipeline.on_root("load_cart", recording_step("load_cart", "Good"));
  pipeline.on_root("charge", failing_step("charge", "boom"));
  pipeline.on_root("notify", recording_step("notify", "Never"));

  let ctx = ContextData::new(CheckoutTrace::default());
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TraceError::Handler("boom".to_string()));
  assert_eq!(ctx.read().visited, vec!["load_cart", "charge"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_skips_step_when_condition_holds() {
  setup_tracing();
  let skip_after_first: SkipCondition<CheckoutTrace> = Arc::new(|ctx: ContextData<CheckoutTrace>| ctx.read().runs > 0);
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[
    ("validate", false, None),
    ("apply_coupon", false, Some(skip_after_first)),
    ("persist", false, None),
  ]);
  pipeline.on_root("validate", recording_step("validate", " V"));
  pipeline.on_root("apply_coupon", recording_step("apply_coupon", " COUPON"));
  pipeline.on_root("persist", recording_step("persist", " W"));

  let ctx = ContextData::new(CheckoutTrace::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().trail, " V W");
}

#[tokio::test]
#[serial]
async fn test_optional_step_without_handlers_is_passed_over() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<CheckoutTrace, TraceError>::new(&[("validate", false, None), ("maybe", true, None), ("persist", false, None)]);
  pipeline.on_root("validate", recording_step("validate", "1"));
  pipeline.on_root("persist", recording_step("persist", "3"));

  let ctx = ContextData::new(CheckoutTrace::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().visited, vec!["validate", "persist"]);
}

#[tokio::test]
#[serial]
async fn test_required_step_without_handlers_fails() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[("validate", false, None), ("unwired", false, None)]);
  pipeline.on_root("validate", recording_step("validate", "1"));

  let ctx = ContextData::new(CheckoutTrace::default());
  match pipeline.run(ctx.clone()).await {
    Err(TraceError::Flow(msg)) => assert!(msg.contains("HandlerMissing"), "unexpected message: {}", msg),
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
  assert_eq!(ctx.read().runs, 1);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_order_within_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[("only", false, None)]);
  pipeline.after_root("only", recording_step("after", "[after]"));
  pipeline.on_root("only", recording_step("on", "[on]"));
  pipeline.before_root("only", recording_step("before", "[before]"));

  let ctx = ContextData::new(CheckoutTrace::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, "[before][on][after]");
}

#[tokio::test]
#[serial]
async fn test_stop_in_before_phase_skips_on_handlers() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[("guarded", false, None), ("later", false, None)]);
  pipeline.before_root("guarded", |ctx: ContextData<CheckoutTrace>| {
    Box::pin(async move {
      ctx.write().visited.push("guard".to_string());
      Ok::<_, TraceError>(PipelineControl::Stop)
    })
  });
  pipeline.on_root("guarded", recording_step("guarded", "G"));
  pipeline.on_root("later", recording_step("later", "L"));

  let ctx = ContextData::new(CheckoutTrace::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Stopped);
  assert_eq!(ctx.read().visited, vec!["guard"]);
  assert_eq!(ctx.read().trail, "");
}

#[tokio::test]
#[serial]
async fn test_set_skip_condition_on_unknown_step_is_an_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[("a", false, None)]);
  let always: SkipCondition<CheckoutTrace> = Arc::new(|_: ContextData<CheckoutTrace>| true);
  assert!(pipeline.set_skip_condition("a", Some(always)).is_ok());
  assert!(pipeline.set_skip_condition("missing", None).is_err());
  assert_eq!(pipeline.step_names(), vec!["a"]);
}

#[test]
#[should_panic(expected = "not defined in this pipeline")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut pipeline = Pipeline::<CheckoutTrace, TraceError>::new(&[("a", false, None)]);
  pipeline.on_root("b", recording_step("b", "b"));
}

// core/tests/registry_tests.rs
mod common;

use common::*;
use eva_flow::{ContextData, Flows, Pipeline, PipelineControl, PipelineResult};

#[derive(Clone, Debug, Default)]
struct SignupTrace {
  email: String,
}

#[derive(Clone, Debug, Default)]
struct RefundTrace {
  amount: i32,
}

#[tokio::test]
async fn test_registry_dispatches_by_context_type() {
  setup_tracing();
  let flows = Flows::<TraceError>::new();

  let mut signup = Pipeline::<SignupTrace, TraceError>::new(&[("signup_task", false, None)]);
  signup.on_root("signup_task", |ctx: ContextData<SignupTrace>| {
    Box::pin(async move {
      ctx.write().email = "lea@example.com".to_string();
      Ok::<_, TraceError>(PipelineControl::Continue)
    })
  });
  flows.register_pipeline(signup);

  let mut refund = Pipeline::<RefundTrace, TraceError>::new(&[("refund_task", false, None)]);
  refund.on_root("refund_task", |ctx: ContextData<RefundTrace>| {
    Box::pin(async move {
      ctx.write().amount = 1198;
      Ok::<_, TraceError>(PipelineControl::Continue)
    })
  });
  flows.register_pipeline(refund);

  let ctx_signup = ContextData::new(SignupTrace::default());
  assert_eq!(flows.run(ctx_signup.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_signup.read().email, "lea@example.com");

  let ctx_refund = ContextData::new(RefundTrace::default());
  assert_eq!(flows.run(ctx_refund.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_refund.read().amount, 1198);
  assert!(flows.is_registered::<SignupTrace>());
}

#[tokio::test]
async fn test_registry_reports_unregistered_context() {
  setup_tracing();
  let flows = Flows::<TraceError>::new();
  let result = flows.run(ContextData::new(SignupTrace::default())).await;
  match result {
    Err(TraceError::Flow(msg)) => assert!(msg.contains("NotRegistered")),
    other => panic!("expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registry_replaces_pipeline_for_same_context() {
  setup_tracing();
  let flows = Flows::<TraceError>::new();
  for label in ["first", "second"] {
    let mut p = Pipeline::<SignupTrace, TraceError>::new(&[("set", false, None)]);
    p.on_root("set", move |ctx: ContextData<SignupTrace>| {
      Box::pin(async move {
        ctx.write().email = label.to_string();
        Ok::<_, TraceError>(PipelineControl::Continue)
      })
    });
    flows.register_pipeline(p);
  }

  let ctx = ContextData::new(SignupTrace::default());
  flows.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().email, "second");
}

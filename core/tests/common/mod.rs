// core/tests/common/mod.rs
#![allow(dead_code)]

use eva_flow::{ContextData, FlowError, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct CheckoutTrace {
  pub runs: i32,
  pub trail: String,
  pub visited: Vec<String>,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TraceError {
  #[error("engine error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TraceError {
  fn from(err: FlowError) -> Self {
    TraceError::Flow(format!("{:?}", err))
  }
}

pub fn recording_step(
  step_name: &'static str,
  mark: &'static str,
) -> eva_flow::Handler<CheckoutTrace, TraceError> {
  Box::new(move |ctx: ContextData<CheckoutTrace>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.runs += 1;
      guard.trail.push_str(mark);
      guard.visited.push(step_name.to_string());
      if guard.halt_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_step(
  step_name: &'static str,
  reason: &'static str,
) -> eva_flow::Handler<CheckoutTrace, TraceError> {
  Box::new(move |ctx: ContextData<CheckoutTrace>| {
    Box::pin(async move {
      ctx.write().visited.push(step_name.to_string());
      Err(TraceError::Handler(reason.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

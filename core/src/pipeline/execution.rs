// core/src/pipeline/execution.rs

//! `Pipeline::run`.

use crate::context_data::ContextData;
use crate::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::{Handler, Pipeline};
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A step with a skip condition that evaluates to `true` is passed over. A
  /// non-optional step without any handler fails with
  /// `FlowError::HandlerMissing`. The first handler error aborts the run.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(context_type = %std::any::type_name::<TData>(), num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(parent: &step_span, Level::DEBUG, "step skipped by condition");
          continue;
        }
      }

      if !self.has_handlers(step_name) {
        if step_def.optional {
          event!(parent: &step_span, Level::DEBUG, "optional step has no handlers");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "non-optional step has no handlers");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for (phase, handlers) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
        let Some(handlers) = handlers.get(step_name) else {
          continue;
        };
        let control = run_phase(handlers, &ctx_data, phase)
          .instrument(step_span.clone())
          .await?;
        if control == PipelineControl::Stop {
          event!(parent: &step_span, Level::INFO, phase, "pipeline stopped by handler");
          return Ok(PipelineResult::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "pipeline completed");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<TData, Err>(
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
  phase: &'static str,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    match handler_fn(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
      Err(e) => {
        event!(Level::ERROR, error = %e, phase, handler_index = handler_idx, "handler failed");
        return Err(e);
      }
    }
  }
  Ok(PipelineControl::Continue)
}

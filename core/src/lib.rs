// core/src/lib.rs

//! eva-flow: small async step pipelines used by the storefront workflows.
//!
//! A pipeline is an ordered list of named steps over one shared context.
//! Each step may carry `before`, `on` and `after` handlers; a handler returns
//! [`PipelineControl::Continue`] to move on or [`PipelineControl::Stop`] to
//! end the run early. Steps can be marked optional (no handlers required) and
//! can carry a skip condition evaluated against the context.
//!
//! Typical use:
//!  1. Define a context struct `CheckoutCtx` for the workflow.
//!  2. Build a `Pipeline<CheckoutCtx, AppError>` from step definitions.
//!  3. Attach handlers with `.on_root()`, `.before_root()`, `.after_root()`.
//!  4. Register it in a [`Flows`] registry shared by the application.
//!  5. Run it with `flows.run(ContextData::new(ctx)).await` and inspect the
//!     context afterwards.

pub mod context_data;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use crate::context_data::ContextData;
pub use crate::control::{PipelineControl, PipelineResult};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::{Handler, Pipeline};
pub use crate::registry::Flows;
pub use crate::step::{SkipCondition, StepDef};

pub mod kernel;
pub mod memory;
pub mod plan_parser;
pub mod plan_runner;
pub mod planner;
pub mod plugin;
pub mod retry;
pub mod setup;

pub use crate::domain::model::{ContextVariables, FunctionView, ParameterView, Plan, PlanStep};
pub use crate::domain::ports::{ChatCompletion, TextCompletion, TextEmbedding};
pub use crate::utils::error::Result;

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod plugins;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{AzureOpenAiSettings, TomlConfig};
pub use core::kernel::Kernel;
pub use core::planner::{SequentialPlanner, SequentialPlannerConfig};
pub use core::retry::{retry, RetryPolicy};
pub use core::setup::{initialize_kernel, initialize_kernel_with, KernelOptions};
pub use domain::model::{Plan, PlanStep, GLOBAL_PLUGIN_NAME};
pub use utils::error::{PlannerError, PlanningErrorKind, Result};

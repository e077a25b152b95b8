pub mod azure;
#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use azure::AzureOpenAiSettings;
#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

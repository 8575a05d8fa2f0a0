//! Suite configuration: TOML data types and the file loader.

mod loader;
mod types;

pub use loader::load;
pub use types::{
    EmulatorsConfig, ProcessConfig, RewriteRuleConfig, RewriteTargetConfig, ServerConfig,
    SiteConfig, SuiteConfig, resolve_config_relative,
};

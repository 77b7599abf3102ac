// Re-export all items from the submodules
mod agent_config;

pub use agent_config::{
    load_or_create_config,
    AgentConfig,
    HttpConfig,
    IdentityConfig,
    IdentitySource,
    ParserConfig,
    PolicyConfig,
    ReachabilityConfig,
    ReachabilityMode,
};

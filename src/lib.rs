// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod feedback;
pub mod history;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod selector;
pub mod session;
pub mod typing_policy;

//! STM32N6 Development MCP Server
//!
//! A Model Context Protocol server for STM32N6 firmware and Edge AI work.
//! Simulated build, flash, debug, code generation and model tools run behind
//! a hook pipeline, alongside a set of specialist agents.

pub mod agents;
pub mod capability;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod hooks;
pub mod prompts;
pub mod schema;
pub mod server;
pub mod templates;
pub mod tools;

pub use capability::{Capability, Category};
pub use config::Config;
pub use context::{ExecutionContext, ServerContext};
pub use dispatch::Dispatcher;
pub use envelope::ResultEnvelope;
pub use error::{CapabilityError, Result, ServerError};
pub use server::Stm32DevServer;

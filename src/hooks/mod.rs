//! Hook engine and built-in hooks

pub mod builtin;
pub mod engine;

pub use builtin::register_builtin_hooks;
pub use engine::{
    HookContext, HookDefinition, HookEngine, HookHandler, HookOutcome, HookTarget, HookTiming, HookTrigger,
};

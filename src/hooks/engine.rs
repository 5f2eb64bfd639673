//! Priority-ordered pre/post interception chain

use std::collections::HashMap;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::HookError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookTiming {
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookTrigger {
    Tool,
    Command,
    Agent,
}

/// Which capability names a hook applies to
#[derive(Debug, Clone)]
pub enum HookTarget {
    /// `"*"`
    Any,
    Exact(String),
    Pattern(Regex),
}

impl HookTarget {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(HookTarget::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, target: &str) -> bool {
        match self {
            HookTarget::Any => true,
            HookTarget::Exact(name) => name == target,
            HookTarget::Pattern(re) => re.is_match(target),
        }
    }
}

impl From<&str> for HookTarget {
    fn from(value: &str) -> Self {
        if value == "*" {
            HookTarget::Any
        } else {
            HookTarget::Exact(value.to_string())
        }
    }
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookTarget::Any => write!(f, "*"),
            HookTarget::Exact(name) => write!(f, "{}", name),
            HookTarget::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// What a hook handler sees
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub params: Map<String, Value>,
    /// Dispatch result; only set in the post phase
    pub result: Option<Value>,
    pub environment: Arc<HashMap<String, String>>,
    pub project_path: PathBuf,
}

/// Result of one hook, or of a whole chain once merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutcome {
    pub proceed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub modified_params: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Default for HookOutcome {
    fn default() -> Self {
        Self::proceed()
    }
}

impl HookOutcome {
    pub fn proceed() -> Self {
        Self {
            proceed: true,
            error: None,
            suggestions: Vec::new(),
            modified_params: Map::new(),
            metadata: Map::new(),
        }
    }

    pub fn veto(error: impl Into<String>) -> Self {
        Self {
            proceed: false,
            error: Some(error.into()),
            ..Self::proceed()
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_modified_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.modified_params.insert(key.into(), value);
        self
    }

    /// Fold a later outcome into this one
    pub fn merge(mut self, update: HookOutcome) -> Self {
        self.proceed = self.proceed && update.proceed;
        if update.error.is_some() {
            self.error = update.error;
        }
        self.suggestions.extend(update.suggestions);
        self.modified_params.extend(update.modified_params);
        self.metadata.extend(update.metadata);
        self
    }
}

pub type HookHandler = Arc<dyn Fn(HookContext) -> BoxFuture<'static, Result<HookOutcome, HookError>> + Send + Sync>;

#[derive(Clone)]
pub struct HookDefinition {
    pub name: String,
    pub timing: HookTiming,
    pub trigger: HookTrigger,
    pub target: HookTarget,
    /// Higher runs first
    pub priority: i32,
    pub handler: HookHandler,
}

impl HookDefinition {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        timing: HookTiming,
        trigger: HookTrigger,
        target: impl Into<HookTarget>,
        priority: i32,
        handler: F,
    ) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HookOutcome, HookError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            timing,
            trigger,
            target: target.into(),
            priority,
            handler: Arc::new(move |ctx| handler(ctx).boxed()),
        }
    }

    fn applies_to(&self, timing: HookTiming, trigger: HookTrigger, target: &str) -> bool {
        self.timing == timing && self.trigger == trigger && self.target.matches(target)
    }
}

impl fmt::Debug for HookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition")
            .field("name", &self.name)
            .field("timing", &self.timing)
            .field("trigger", &self.trigger)
            .field("target", &self.target)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Ordered hook list. Duplicate names are accepted.
#[derive(Default)]
pub struct HookEngine {
    hooks: Vec<HookDefinition>,
}

impl HookEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook, keeping the list sorted by descending priority.
    /// Equal priorities keep registration order.
    pub fn register(&mut self, hook: HookDefinition) {
        debug!("Registered hook '{}' ({:?} {:?} {})", hook.name, hook.timing, hook.trigger, hook.target);
        self.hooks.push(hook);
        self.hooks.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Remove the first hook with this name
    pub fn unregister(&mut self, name: &str) -> bool {
        match self.hooks.iter().position(|h| h.name == name) {
            Some(index) => {
                self.hooks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Run the matching hooks in priority order and merge their outcomes.
    /// A failing or panicking handler is logged and skipped; a veto stops the chain.
    pub async fn execute(
        &self,
        timing: HookTiming,
        trigger: HookTrigger,
        target: &str,
        context: HookContext,
    ) -> HookOutcome {
        let mut outcome = HookOutcome::proceed();

        for hook in self.hooks.iter().filter(|h| h.applies_to(timing, trigger, target)) {
            let run = AssertUnwindSafe(async { (hook.handler)(context.clone()).await });
            let result = match run.catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    warn!("Hook {} panicked: {}", hook.name, panic_message(panic.as_ref()));
                    continue;
                }
            };
            match result {
                Ok(update) => {
                    outcome = outcome.merge(update);
                    if !outcome.proceed {
                        debug!("Hook '{}' stopped the chain for '{}'", hook.name, target);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Hook {} failed: {}", hook.name, e);
                }
            }
        }

        outcome
    }

    pub fn list_all(&self) -> &[HookDefinition] {
        &self.hooks
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

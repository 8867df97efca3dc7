//! Command dispatch
//!
//! Maps each routing command to a registered handler and runs one batch at
//! a time. Execution is two-pass: informational modules run first and their
//! results are buffered, then conversational commands run with the buffered
//! results injected as contextual preamble, so a weather lookup can feed
//! the reply engine within the same batch. An `Exit` command raises the
//! sticky termination signal but never short-circuits the batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::Result;
use crate::routing::{Module, RoutingCommand};

/// Default per-handler deadline
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// A registered module handler
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process one cleaned query, returning the text to aggregate
    async fn handle(&self, query: &str) -> Result<String>;
}

/// Outcome of one handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Handler text to include in the aggregated reply (may be empty)
    Ok(String),
    /// Human-readable failure reason
    Err(String),
}

/// Per-command result, kept in classifier order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Module the command was routed to
    pub module: Module,
    /// What its handler produced
    pub outcome: Outcome,
}

/// Result of one dispatched batch
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Aggregated reply: non-empty `Ok` texts in command order, failures
    /// surfaced as short distinct lines
    pub reply: String,
    /// Per-command results, in command order
    pub results: Vec<DispatchResult>,
    /// True once any command in the batch carried the `Exit` tag
    pub terminate: bool,
}

/// Routes commands to handlers and aggregates their results
pub struct Dispatcher {
    handlers: HashMap<Module, Arc<dyn Handler>>,
    handler_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with the default handler timeout
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_HANDLER_TIMEOUT)
    }

    /// Create a dispatcher with an explicit per-handler deadline
    #[must_use]
    pub fn with_timeout(handler_timeout: Duration) -> Self {
        Self {
            handlers: HashMap::new(),
            handler_timeout,
        }
    }

    /// Register the handler for a module tag
    ///
    /// Re-registering a module replaces the previous handler.
    pub fn register(&mut self, module: Module, handler: Arc<dyn Handler>) {
        self.handlers.insert(module, handler);
    }

    /// Run one command batch to completion
    ///
    /// Commands execute in classifier order except for the two-pass
    /// reordering: non-conversational modules first, then `CHATBOT`/`Exit`.
    /// Individual handler failures and timeouts become `Err` outcomes; the
    /// batch always runs to the end.
    pub async fn dispatch(&self, commands: &[RoutingCommand]) -> DispatchOutcome {
        let mut slots: Vec<Option<DispatchResult>> = vec![None; commands.len()];
        let mut context: Vec<(Module, String)> = Vec::new();
        let mut terminate = false;

        // Pass 1: informational modules, buffering their texts for the
        // conversational pass.
        for (idx, command) in commands.iter().enumerate() {
            if matches!(command.module, Module::Chatbot | Module::Exit) {
                continue;
            }
            let result = self.run_one(command, &command.query).await;
            if let Outcome::Ok(text) = &result.outcome {
                if !text.trim().is_empty() {
                    context.push((command.module.clone(), text.clone()));
                }
            }
            slots[idx] = Some(result);
        }

        // Pass 2: conversational and exit commands.
        for (idx, command) in commands.iter().enumerate() {
            match &command.module {
                Module::Exit => {
                    tracing::info!("exit command received, termination deferred to end of batch");
                    terminate = true;
                    slots[idx] = Some(DispatchResult {
                        module: Module::Exit,
                        outcome: Outcome::Ok(String::new()),
                    });
                }
                Module::Chatbot => {
                    let query = inject_context(&command.query, &context);
                    slots[idx] = Some(self.run_one(command, &query).await);
                }
                _ => {}
            }
        }

        let results: Vec<DispatchResult> = slots.into_iter().flatten().collect();
        let reply = aggregate(&results);

        DispatchOutcome {
            reply,
            results,
            terminate,
        }
    }

    /// Run a single command with timeout and error wrapping
    async fn run_one(&self, command: &RoutingCommand, query: &str) -> DispatchResult {
        let module = command.module.clone();

        let Some(handler) = self.handlers.get(&module) else {
            tracing::warn!(module = %module, "no handler registered");
            return DispatchResult {
                module: module.clone(),
                outcome: Outcome::Err(format!("no handler registered for {module}")),
            };
        };

        tracing::debug!(module = %module, query, "dispatching");

        let outcome = match tokio::time::timeout(self.handler_timeout, handler.handle(query)).await
        {
            Ok(Ok(text)) => Outcome::Ok(text),
            Ok(Err(e)) => {
                tracing::warn!(module = %module, error = %e, "handler failed");
                Outcome::Err(e.to_string())
            }
            Err(_) => {
                tracing::warn!(module = %module, timeout = ?self.handler_timeout, "handler timed out");
                Outcome::Err(format!(
                    "timed out after {}s",
                    self.handler_timeout.as_secs()
                ))
            }
        };

        DispatchResult { module, outcome }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Prepend buffered pass-1 results to a conversational query
fn inject_context(query: &str, context: &[(Module, String)]) -> String {
    if context.is_empty() {
        return query.to_string();
    }

    let mut block = String::from("Results already gathered for this request:\n");
    for (module, text) in context {
        block.push_str(&format!("[{module}] {text}\n"));
    }
    block.push('\n');
    block.push_str(query);
    block
}

/// Concatenate outcomes into the final reply, in command order
fn aggregate(results: &[DispatchResult]) -> String {
    let mut lines = Vec::new();
    for result in results {
        match &result.outcome {
            Outcome::Ok(text) if !text.trim().is_empty() => lines.push(text.trim().to_string()),
            Outcome::Ok(_) => {}
            Outcome::Err(reason) => lines.push(format!("{} failed: {reason}", result.module)),
        }
    }
    lines.join("\n")
}

/// Convenience handler wrapping a closure, used by tests and simple skills
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    async fn handle(&self, query: &str) -> Result<String> {
        (self.0)(query)
    }
}

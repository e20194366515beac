//! Tool registry and dispatch.
//!
//! The registry co-locates the catalog with a handler table populated once
//! at startup. [`ToolRegistry::execute`] is the single entry point both
//! transports call; it never fails outward — every validation, session, or
//! handler failure is folded into an error envelope.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chromiumoxide::Page;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::catalog::{self, ToolSpec};
use crate::error::Result;
use crate::handlers::{self, Args};
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::session::Session;

/// Boxed handler future.
type HandlerFuture = Pin<Box<dyn Future<Output = Result<ToolCallResult>> + Send>>;

/// Uniform handler signature: one page primitive per tool.
pub type Handler = fn(Page, Args) -> HandlerFuture;

fn handler_table() -> HashMap<&'static str, Handler> {
    // One entry per catalog tool; closures adapt the by-reference handler
    // fns to the owned-signature table type.
    macro_rules! entry {
        ($name:literal, $f:path) => {
            (
                $name,
                (|page: Page, args: Args| -> HandlerFuture {
                    Box::pin(async move { $f(&page, &args).await })
                }) as Handler,
            )
        };
    }

    HashMap::from([
        entry!("navigate", handlers::navigate),
        entry!("screenshot", handlers::screenshot),
        entry!("click", handlers::click),
        entry!("fill", handlers::fill),
        entry!("select", handlers::select),
        entry!("hover", handlers::hover),
        entry!("evaluate", handlers::evaluate),
        entry!("get_content", handlers::get_content),
        entry!("get_text", handlers::get_text),
        entry!("get_attribute", handlers::get_attribute),
        entry!("wait_for_selector", handlers::wait_for_selector),
        entry!("wait_for_timeout", handlers::wait_for_timeout),
        entry!("press_key", handlers::press_key),
        entry!("type_text", handlers::type_text),
        entry!("check", handlers::check),
        entry!("uncheck", handlers::uncheck),
        entry!("get_title", handlers::get_title),
        entry!("get_url", handlers::get_url),
        entry!("go_back", handlers::go_back),
        entry!("go_forward", handlers::go_forward),
        entry!("reload", handlers::reload),
        entry!("get_cookies", handlers::get_cookies),
        entry!("set_cookie", handlers::set_cookie),
        entry!("delete_cookies", handlers::delete_cookies),
        entry!("pdf", handlers::pdf),
        entry!("is_visible", handlers::is_visible),
        entry!("is_enabled", handlers::is_enabled),
        entry!("is_checked", handlers::is_checked),
        entry!("count_elements", handlers::count_elements),
        entry!("set_viewport", handlers::set_viewport),
    ])
}

/// Registry of available tools bound to the shared session.
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    handlers: HashMap<&'static str, Handler>,
    session: Arc<Session>,
    /// Serializes tool execution: concurrent transport requests would
    /// otherwise race on the single shared page.
    call_lock: Mutex<()>,
}

impl ToolRegistry {
    /// Create the registry with the full catalog and handler table.
    pub fn new(session: Arc<Session>) -> Self {
        let specs = catalog::specs();
        let handlers = handler_table();
        debug_assert!(
            specs.iter().all(|s| handlers.contains_key(s.name)),
            "every catalog tool must have a handler"
        );
        Self {
            specs,
            handlers,
            session,
            call_lock: Mutex::new(()),
        }
    }

    /// Wire-format definitions for every tool, in catalog order.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.specs.iter().map(ToolSpec::definition).collect()
    }

    /// Execute a tool by name. All failures become error envelopes; this
    /// never returns a transport-level fault.
    pub async fn execute(&self, name: &str, arguments: Value) -> ToolCallResult {
        let Some(spec) = self.specs.iter().find(|s| s.name == name) else {
            return ToolCallResult::error_text(format!("Unknown tool: {name}"));
        };

        let mut args = match arguments {
            Value::Object(map) => map,
            Value::Null => {
                if spec.has_required() {
                    return ToolCallResult::error_text(
                        "Arguments are required for tool execution",
                    );
                }
                Args::new()
            }
            _ => return ToolCallResult::error_text("tool arguments must be an object"),
        };

        if let Some(missing) = spec.missing_required(&args) {
            return ToolCallResult::error_text(format!("missing required argument: {missing}"));
        }
        spec.apply_defaults(&mut args);

        let Some(handler) = self.handlers.get(name).copied() else {
            return ToolCallResult::error_text(format!("no handler registered for: {name}"));
        };

        // Single-flight: one tool call at a time against the shared page.
        let _guard = self.call_lock.lock().await;

        let page = match self.session.ensure_page().await {
            Ok(page) => page,
            Err(e) => {
                error!(tool = name, error = %e, "session unavailable");
                return ToolCallResult::error_text(e.to_string());
            }
        };

        debug!(tool = name, "executing tool");
        match handler(page, args).await {
            Ok(result) => result,
            Err(e) => {
                error!(tool = name, error = %e, "tool failed");
                ToolCallResult::error_text(e.to_string())
            }
        }
    }
}

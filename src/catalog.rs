//! The tool catalog: one descriptor per browser operation.
//!
//! The catalog is pure data. Each [`ToolSpec`] names its parameters with a
//! type, a required flag, and an optional default; the dispatcher uses the
//! same specs to validate required arguments and fill in defaults, and the
//! transports render them to JSON-Schema tool definitions.

use serde_json::{json, Value};

use crate::protocol::ToolDefinition;

/// Parameter value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON string.
    String,
    /// JSON number.
    Number,
    /// JSON boolean.
    Boolean,
}

impl ParamKind {
    fn json_name(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Value type.
    pub kind: ParamKind,
    /// Human description.
    pub description: &'static str,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Default value applied when the parameter is absent.
    pub default: Option<Value>,
}

impl ParamSpec {
    fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            default: None,
        }
    }

    fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            default: None,
        }
    }

    fn with_default(
        name: &'static str,
        kind: ParamKind,
        description: &'static str,
        default: Value,
    ) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            default: Some(default),
        }
    }
}

/// A tool descriptor: name, description, ordered parameters.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: &'static str,
    /// Human description.
    pub description: &'static str,
    /// Ordered parameter set.
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    fn new(name: &'static str, description: &'static str, params: Vec<ParamSpec>) -> Self {
        Self {
            name,
            description,
            params,
        }
    }

    /// Whether any parameter is required.
    pub fn has_required(&self) -> bool {
        self.params.iter().any(|p| p.required)
    }

    /// First declared required parameter missing from `args`, if any.
    pub fn missing_required(&self, args: &serde_json::Map<String, Value>) -> Option<&'static str> {
        self.params
            .iter()
            .find(|p| p.required && !args.contains_key(p.name))
            .map(|p| p.name)
    }

    /// Insert declared defaults for parameters absent from `args`.
    pub fn apply_defaults(&self, args: &mut serde_json::Map<String, Value>) {
        for param in &self.params {
            if let Some(ref default) = param.default {
                args.entry(param.name.to_string())
                    .or_insert_with(|| default.clone());
            }
        }
    }

    /// Render the wire-format tool definition with a JSON-Schema input schema.
    pub fn definition(&self) -> ToolDefinition {
        let mut properties = serde_json::Map::new();
        for param in &self.params {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), json!(param.kind.json_name()));
            prop.insert("description".into(), json!(param.description));
            if let Some(ref default) = param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(param.name.to_string(), Value::Object(prop));
        }

        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }

        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: Value::Object(schema),
        }
    }
}

/// The full catalog, in stable order.
pub fn specs() -> Vec<ToolSpec> {
    use ParamKind::{Boolean, Number, String};

    vec![
        ToolSpec::new(
            "navigate",
            "Navigate to a URL in the browser",
            vec![ParamSpec::required("url", String, "The URL to navigate to")],
        ),
        ToolSpec::new(
            "screenshot",
            "Take a screenshot of the current page",
            vec![
                ParamSpec::with_default(
                    "name",
                    String,
                    "Name for the screenshot file",
                    json!("screenshot"),
                ),
                ParamSpec::with_default(
                    "fullPage",
                    Boolean,
                    "Whether to take a full page screenshot",
                    json!(false),
                ),
            ],
        ),
        ToolSpec::new(
            "click",
            "Click an element on the page",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the element to click",
            )],
        ),
        ToolSpec::new(
            "fill",
            "Fill a form field with text",
            vec![
                ParamSpec::required("selector", String, "CSS selector for the input field"),
                ParamSpec::required("value", String, "Text to fill in the field"),
            ],
        ),
        ToolSpec::new(
            "select",
            "Select an option from a dropdown",
            vec![
                ParamSpec::required("selector", String, "CSS selector for the select element"),
                ParamSpec::required("value", String, "Value to select"),
            ],
        ),
        ToolSpec::new(
            "hover",
            "Hover over an element",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the element to hover",
            )],
        ),
        ToolSpec::new(
            "evaluate",
            "Execute JavaScript code in the browser context. The script runs \
             with full page privileges; callers are trusted.",
            vec![ParamSpec::required(
                "script",
                String,
                "JavaScript code to execute",
            )],
        ),
        ToolSpec::new(
            "get_content",
            "Get the HTML content of the current page",
            vec![],
        ),
        ToolSpec::new(
            "get_text",
            "Get the text content of an element",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the element",
            )],
        ),
        ToolSpec::new(
            "get_attribute",
            "Get an attribute value from an element",
            vec![
                ParamSpec::required("selector", String, "CSS selector for the element"),
                ParamSpec::required("attribute", String, "Attribute name to get"),
            ],
        ),
        ToolSpec::new(
            "wait_for_selector",
            "Wait for an element to appear on the page",
            vec![
                ParamSpec::required("selector", String, "CSS selector to wait for"),
                ParamSpec::with_default(
                    "timeout",
                    Number,
                    "Timeout in milliseconds",
                    json!(30000),
                ),
            ],
        ),
        ToolSpec::new(
            "wait_for_timeout",
            "Wait for a specified amount of time",
            vec![ParamSpec::required(
                "timeout",
                Number,
                "Time to wait in milliseconds",
            )],
        ),
        ToolSpec::new(
            "press_key",
            "Press a keyboard key",
            vec![
                ParamSpec::optional(
                    "selector",
                    String,
                    "CSS selector for the element (optional, uses page if not provided)",
                ),
                ParamSpec::required(
                    "key",
                    String,
                    "Key to press (e.g., 'Enter', 'ArrowDown', 'a')",
                ),
            ],
        ),
        ToolSpec::new(
            "type_text",
            "Type text character by character (simulates real typing)",
            vec![
                ParamSpec::required("selector", String, "CSS selector for the input field"),
                ParamSpec::required("text", String, "Text to type"),
                ParamSpec::with_default(
                    "delay",
                    Number,
                    "Delay between key presses in milliseconds",
                    json!(0),
                ),
            ],
        ),
        ToolSpec::new(
            "check",
            "Check a checkbox or radio button",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the checkbox/radio",
            )],
        ),
        ToolSpec::new(
            "uncheck",
            "Uncheck a checkbox",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the checkbox",
            )],
        ),
        ToolSpec::new("get_title", "Get the page title", vec![]),
        ToolSpec::new("get_url", "Get the current page URL", vec![]),
        ToolSpec::new("go_back", "Navigate back in browser history", vec![]),
        ToolSpec::new("go_forward", "Navigate forward in browser history", vec![]),
        ToolSpec::new("reload", "Reload the current page", vec![]),
        ToolSpec::new("get_cookies", "Get all cookies for the current page", vec![]),
        ToolSpec::new(
            "set_cookie",
            "Set a cookie",
            vec![
                ParamSpec::required("name", String, "Cookie name"),
                ParamSpec::required("value", String, "Cookie value"),
                ParamSpec::optional("domain", String, "Cookie domain (optional)"),
                ParamSpec::optional("path", String, "Cookie path (optional)"),
            ],
        ),
        ToolSpec::new("delete_cookies", "Delete all cookies", vec![]),
        ToolSpec::new(
            "pdf",
            "Generate a PDF of the current page",
            vec![ParamSpec::with_default(
                "name",
                String,
                "PDF filename",
                json!("page.pdf"),
            )],
        ),
        ToolSpec::new(
            "is_visible",
            "Check if an element is visible",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the element",
            )],
        ),
        ToolSpec::new(
            "is_enabled",
            "Check if an element is enabled",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the element",
            )],
        ),
        ToolSpec::new(
            "is_checked",
            "Check if a checkbox or radio button is checked",
            vec![ParamSpec::required(
                "selector",
                String,
                "CSS selector for the element",
            )],
        ),
        ToolSpec::new(
            "count_elements",
            "Count the number of elements matching a selector",
            vec![ParamSpec::required("selector", String, "CSS selector")],
        ),
        ToolSpec::new(
            "set_viewport",
            "Set the browser viewport size",
            vec![
                ParamSpec::required("width", Number, "Viewport width in pixels"),
                ParamSpec::required("height", Number, "Viewport height in pixels"),
            ],
        ),
    ]
}

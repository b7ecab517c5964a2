//! Tool specification builders for the browser action tools.
//!
//! Each function returns a [`ToolSpec`] (tagged as `"function"`) describing
//! one browser primitive, so the model client can advertise the full action
//! vocabulary without this crate depending on any provider.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Minimal JSON Schema subset for tool parameter definitions.
// ---------------------------------------------------------------------------

/// Subset of JSON Schema used by tool definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonSchema {
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(alias = "integer")]
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Object {
        properties: BTreeMap<String, JsonSchema>,
        #[serde(skip_serializing_if = "Option::is_none")]
        required: Option<Vec<String>>,
        #[serde(
            rename = "additionalProperties",
            skip_serializing_if = "Option::is_none"
        )]
        additional_properties: Option<bool>,
    },
}

/// A single function-type tool definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionTool {
    pub name: String,
    pub description: String,
    pub parameters: JsonSchema,
}

/// Tool specification wrapper tagged with `"type": "function"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ToolSpec {
    #[serde(rename = "function")]
    Function(FunctionTool),
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn string_param(desc: &str) -> JsonSchema {
    JsonSchema::String {
        description: Some(desc.to_string()),
    }
}

fn number_param(desc: &str) -> JsonSchema {
    JsonSchema::Number {
        description: Some(desc.to_string()),
    }
}

fn bool_param(desc: &str) -> JsonSchema {
    JsonSchema::Boolean {
        description: Some(desc.to_string()),
    }
}

fn coord_params(props: &mut BTreeMap<String, JsonSchema>) {
    props.insert(
        "x".to_string(),
        number_param("Horizontal position in the normalized 0-1000 coordinate space."),
    );
    props.insert(
        "y".to_string(),
        number_param("Vertical position in the normalized 0-1000 coordinate space."),
    );
}

fn make_tool(
    name: &str,
    description: &str,
    properties: BTreeMap<String, JsonSchema>,
    required: Vec<&str>,
) -> ToolSpec {
    ToolSpec::Function(FunctionTool {
        name: name.to_string(),
        description: description.to_string(),
        parameters: JsonSchema::Object {
            properties,
            required: Some(required.into_iter().map(|s| s.to_string()).collect()),
            additional_properties: Some(false),
        },
    })
}

// ---------------------------------------------------------------------------
// Browser tool spec builders
// ---------------------------------------------------------------------------

/// `navigate` – load a URL in the current tab.
pub fn create_navigate_tool() -> ToolSpec {
    let mut props = BTreeMap::new();
    props.insert(
        "url".to_string(),
        string_param("Absolute URL to load, including the scheme."),
    );
    make_tool(
        "navigate",
        "Navigate the browser to a URL. The URL is checked against the configured allow and deny lists first.",
        props,
        vec!["url"],
    )
}

/// `click_at` – click at a normalized coordinate.
pub fn create_click_at_tool() -> ToolSpec {
    let mut props = BTreeMap::new();
    coord_params(&mut props);
    make_tool(
        "click_at",
        "Click at a position on the page. Coordinates are normalized to a 0-1000 space and mapped to the viewport.",
        props,
        vec!["x", "y"],
    )
}

/// `type_text_at` – click a position, then type text.
pub fn create_type_text_at_tool() -> ToolSpec {
    let mut props = BTreeMap::new();
    coord_params(&mut props);
    props.insert("text".to_string(), string_param("Text to type."));
    props.insert(
        "press_enter".to_string(),
        bool_param("Press Enter after typing. Defaults to false."),
    );
    props.insert(
        "clear_before_typing".to_string(),
        bool_param("Clear the field before typing. Defaults to false."),
    );
    make_tool(
        "type_text_at",
        "Click at a position and type text into the focused element, optionally clearing it first and pressing Enter after.",
        props,
        vec!["x", "y", "text"],
    )
}

/// `scroll_document` – scroll the document in a direction.
pub fn create_scroll_document_tool() -> ToolSpec {
    let mut props = BTreeMap::new();
    props.insert(
        "direction".to_string(),
        string_param("Scroll direction: 'up', 'down', 'left', or 'right'."),
    );
    props.insert(
        "amount".to_string(),
        number_param("Scroll distance in normalized units."),
    );
    make_tool(
        "scroll_document",
        "Scroll the document in the given direction by the given amount.",
        props,
        vec!["direction", "amount"],
    )
}

/// `drag_and_drop` – drag from one coordinate to another.
pub fn create_drag_and_drop_tool() -> ToolSpec {
    let mut props = BTreeMap::new();
    coord_params(&mut props);
    props.insert(
        "dest_x".to_string(),
        number_param("Drop target horizontal position, normalized 0-1000."),
    );
    props.insert(
        "dest_y".to_string(),
        number_param("Drop target vertical position, normalized 0-1000."),
    );
    make_tool(
        "drag_and_drop",
        "Press at the source position, drag to the destination position, and release.",
        props,
        vec!["x", "y", "dest_x", "dest_y"],
    )
}

/// `pagedown` – scroll one viewport down.
pub fn create_pagedown_tool() -> ToolSpec {
    make_tool(
        "pagedown",
        "Scroll the document down by one viewport height.",
        BTreeMap::new(),
        vec![],
    )
}

/// `pageup` – scroll one viewport up.
pub fn create_pageup_tool() -> ToolSpec {
    make_tool(
        "pageup",
        "Scroll the document up by one viewport height.",
        BTreeMap::new(),
        vec![],
    )
}

/// `key_combination` – press a key combination.
pub fn create_key_combination_tool() -> ToolSpec {
    let mut props = BTreeMap::new();
    props.insert(
        "keys".to_string(),
        string_param("Key combination to press, e.g. 'Control+a' or 'Enter'."),
    );
    make_tool(
        "key_combination",
        "Press a keyboard key or key combination in the focused context.",
        props,
        vec!["keys"],
    )
}

/// `open_web_browser` – ensure a browser instance is running.
pub fn create_open_web_browser_tool() -> ToolSpec {
    make_tool(
        "open_web_browser",
        "Open the web browser, launching it if it is not already running.",
        BTreeMap::new(),
        vec![],
    )
}

/// Return all browser tool specs.
pub fn all_browser_tool_specs() -> Vec<ToolSpec> {
    vec![
        create_navigate_tool(),
        create_click_at_tool(),
        create_type_text_at_tool(),
        create_scroll_document_tool(),
        create_drag_and_drop_tool(),
        create_pagedown_tool(),
        create_pageup_tool(),
        create_key_combination_tool(),
        create_open_web_browser_tool(),
    ]
}

//! The low-level browser driver interface and its action vocabulary.
//!
//! Drivers operate on pixel coordinates; the model speaks a normalized
//! 0-1000 coordinate space mapped through [`Viewport::to_pixels`]. Driver
//! failures surface as [`BrowserError`]; the dispatch layer folds them into
//! an [`ActionOutcome`] so a failed action feeds back to the model instead of
//! crashing the loop.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::error::{BrowserError, Result};

/// Upper bound of the normalized coordinate space in both axes.
pub const COORDINATE_SPACE: u32 = 1000;

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Map a normalized 0-1000 coordinate pair to pixel coordinates:
    /// `actual = value * dimension / 1000`.
    pub fn to_pixels(self, x: u32, y: u32) -> (u32, u32) {
        let px = u64::from(x) * u64::from(self.width) / u64::from(COORDINATE_SPACE);
        let py = u64::from(y) * u64::from(self.height) / u64::from(COORDINATE_SPACE);
        (px as u32, py as u32)
    }
}

/// Scroll directions understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Captured page state: visual image plus structural tree, used for model
/// grounding and overlay diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub url: String,
    /// Base64-encoded screenshot, when the driver can produce one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Structural/accessibility tree rendered as text.
    pub structure: String,
    pub viewport: Viewport,
}

/// Result of one dispatched browser action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// URL after the action (or where the failure was observed).
    pub url: String,
}

impl ActionOutcome {
    pub fn ok(output: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            error: None,
            url: url.into(),
        }
    }

    pub fn failed(error: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(error.into()),
            url: url.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A browser action requested by the model, carrying normalized coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrowserAction {
    Navigate {
        url: String,
    },
    ClickAt {
        x: u32,
        y: u32,
    },
    TypeTextAt {
        x: u32,
        y: u32,
        text: String,
        press_enter: bool,
        clear_before_typing: bool,
    },
    ScrollDocument {
        direction: ScrollDirection,
        amount: u32,
    },
    DragAndDrop {
        x: u32,
        y: u32,
        dest_x: u32,
        dest_y: u32,
    },
    PageDown,
    PageUp,
    KeyCombination {
        keys: String,
    },
    OpenWebBrowser,
}

impl BrowserAction {
    /// Parse a named tool call with JSON arguments into an action.
    pub fn parse(name: &str, args: &serde_json::Value) -> Result<Self> {
        let action = match name {
            "navigate" => Self::Navigate {
                url: string_arg(name, args, "url")?,
            },
            "click_at" => Self::ClickAt {
                x: coord_arg(name, args, "x")?,
                y: coord_arg(name, args, "y")?,
            },
            "type_text_at" => Self::TypeTextAt {
                x: coord_arg(name, args, "x")?,
                y: coord_arg(name, args, "y")?,
                text: string_arg(name, args, "text")?,
                press_enter: bool_arg(args, "press_enter"),
                clear_before_typing: bool_arg(args, "clear_before_typing"),
            },
            "scroll_document" => Self::ScrollDocument {
                direction: direction_arg(name, args)?,
                amount: coord_arg(name, args, "amount")?,
            },
            "drag_and_drop" => Self::DragAndDrop {
                x: coord_arg(name, args, "x")?,
                y: coord_arg(name, args, "y")?,
                dest_x: coord_arg(name, args, "dest_x")?,
                dest_y: coord_arg(name, args, "dest_y")?,
            },
            "pagedown" => Self::PageDown,
            "pageup" => Self::PageUp,
            "key_combination" => Self::KeyCombination {
                keys: string_arg(name, args, "keys")?,
            },
            "open_web_browser" => Self::OpenWebBrowser,
            other => {
                return Err(BrowserError::MalformedAction {
                    name: other.to_string(),
                    reason: "no such browser tool".to_string(),
                });
            }
        };
        Ok(action)
    }

    /// The tool name this action is exposed under.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::ClickAt { .. } => "click_at",
            Self::TypeTextAt { .. } => "type_text_at",
            Self::ScrollDocument { .. } => "scroll_document",
            Self::DragAndDrop { .. } => "drag_and_drop",
            Self::PageDown => "pagedown",
            Self::PageUp => "pageup",
            Self::KeyCombination { .. } => "key_combination",
            Self::OpenWebBrowser => "open_web_browser",
        }
    }

    /// Whether this action loads a new document (and so counts against the
    /// navigation rate window and the URL filter).
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigate { .. })
    }
}

fn string_arg(action: &str, args: &serde_json::Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| BrowserError::MalformedAction {
            name: action.to_string(),
            reason: format!("missing string argument '{key}'"),
        })
}

fn coord_arg(action: &str, args: &serde_json::Value, key: &str) -> Result<u32> {
    args.get(key)
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| BrowserError::MalformedAction {
            name: action.to_string(),
            reason: format!("missing or non-numeric argument '{key}'"),
        })
}

fn bool_arg(args: &serde_json::Value, key: &str) -> bool {
    args.get(key).and_then(serde_json::Value::as_bool).unwrap_or(false)
}

fn direction_arg(action: &str, args: &serde_json::Value) -> Result<ScrollDirection> {
    let raw = string_arg(action, args, "direction")?;
    match raw.as_str() {
        "up" => Ok(ScrollDirection::Up),
        "down" => Ok(ScrollDirection::Down),
        "left" => Ok(ScrollDirection::Left),
        "right" => Ok(ScrollDirection::Right),
        other => Err(BrowserError::MalformedAction {
            name: action.to_string(),
            reason: format!("unknown scroll direction '{other}'"),
        }),
    }
}

/// The low-level DOM/browser driver. An external collaborator; implementations
/// wrap a real browser, tests use fakes.
///
/// Coordinate-taking methods receive **pixel** coordinates; normalized model
/// coordinates are mapped by the dispatch layer before the call.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Whether the underlying browser process is still reachable.
    fn is_connected(&self) -> bool;

    fn viewport(&self) -> Viewport;

    async fn navigate(&self, url: &str) -> Result<ActionOutcome>;
    async fn click_at(&self, x: u32, y: u32) -> Result<ActionOutcome>;
    async fn type_text_at(
        &self,
        x: u32,
        y: u32,
        text: &str,
        press_enter: bool,
        clear_before_typing: bool,
    ) -> Result<ActionOutcome>;
    async fn scroll_document(
        &self,
        direction: ScrollDirection,
        amount: u32,
    ) -> Result<ActionOutcome>;
    async fn drag_and_drop(&self, x: u32, y: u32, dest_x: u32, dest_y: u32)
    -> Result<ActionOutcome>;
    async fn page_down(&self) -> Result<ActionOutcome>;
    async fn page_up(&self) -> Result<ActionOutcome>;
    async fn key_combination(&self, keys: &str) -> Result<ActionOutcome>;

    /// Capture the current page state (screenshot + structural tree).
    async fn snapshot(&self) -> Result<Snapshot>;
}

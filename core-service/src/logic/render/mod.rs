//! Render Module - Page Rendering Boundary
//!
//! The evaluator only talks to a browser through these traits. A session
//! owns its browser resource exclusively and releases it on `Drop`, so every
//! exit path (success, error, panic unwinding) frees it.
//!
//! Runtime checks are capability queries (`has_listener`, `uses_api`) rather
//! than injected script strings, which keeps the extractor renderer-agnostic.

pub mod http;

use std::collections::HashMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};

pub use http::HttpRenderer;

// ============================================================================
// ERRORS
// ============================================================================

/// Single error type for everything the renderer can fail at
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error("render timed out after {0:?}")]
    Timeout(Duration),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("browser session crashed: {0}")]
    SessionCrashed(String),
    #[error("capability not supported by this renderer: {0}")]
    Unsupported(&'static str),
}

// ============================================================================
// CAPABILITIES
// ============================================================================

/// DOM events a page may register listeners for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MouseMove,
    KeyDown,
    Copy,
    Cut,
    Paste,
    Submit,
    Change,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MouseMove => "mousemove",
            EventKind::KeyDown => "keydown",
            EventKind::Copy => "copy",
            EventKind::Cut => "cut",
            EventKind::Paste => "paste",
            EventKind::Submit => "submit",
            EventKind::Change => "change",
        }
    }
}

/// Browser APIs whose use by the page is worth knowing about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserApi {
    WindowOpen,
    Alert,
    Confirm,
    Prompt,
    DocumentCookie,
}

impl BrowserApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserApi::WindowOpen => "window.open",
            BrowserApi::Alert => "alert",
            BrowserApi::Confirm => "confirm",
            BrowserApi::Prompt => "prompt",
            BrowserApi::DocumentCookie => "document.cookie",
        }
    }
}

/// Elements hidden from the user, by how they are hidden
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenElements {
    pub display_none: u32,
    pub visibility_hidden: u32,
    pub hidden_inputs: u32,
    pub offscreen: u32,
}

impl HiddenElements {
    pub fn total(&self) -> u32 {
        self.display_none + self.visibility_hidden + self.hidden_inputs + self.offscreen
    }
}

// ============================================================================
// LIVE ELEMENTS
// ============================================================================

/// Snapshot of a rendered element.
///
/// Attribute values are what the browser reports as properties: a form's
/// `action` is absolute, and defaults to the page URL when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveElement {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    /// Descendant elements (flattened, document order)
    pub descendants: Vec<LiveElement>,
}

impl LiveElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: LiveElement) -> Self {
        self.descendants.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Descendants with the given tag name
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a LiveElement> + 'a {
        self.descendants.iter().filter(move |el| el.tag.eq_ignore_ascii_case(tag))
    }
}

// ============================================================================
// RENDERER TRAITS
// ============================================================================

/// An exclusively owned, rendered page
pub trait RenderSession {
    /// Serialized DOM after rendering
    fn page_source(&self) -> Result<String, RenderError>;

    /// URL the session is currently showing
    fn current_url(&self) -> Result<String, RenderError>;

    /// Block until the document reports load-complete, or `timeout` elapses
    fn wait_for_load(&self, timeout: Duration) -> Result<(), RenderError>;

    /// All elements with the given tag
    fn find_elements(&self, tag: &str) -> Result<Vec<LiveElement>, RenderError>;

    /// Whether the page registered a listener for `event`
    fn has_listener(&self, event: EventKind) -> Result<bool, RenderError>;

    /// Whether page script touches `api`
    fn uses_api(&self, api: BrowserApi) -> Result<bool, RenderError>;

    /// Elements hidden through computed style, input type or geometry
    fn hidden_elements(&self) -> Result<HiddenElements, RenderError>;
}

/// Factory for render sessions (one per concurrent evaluation)
pub trait Renderer: Send + Sync {
    fn render(&self, url: &str, timeout: Duration) -> Result<Box<dyn RenderSession>, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_total() {
        let hidden = HiddenElements {
            display_none: 2,
            visibility_hidden: 1,
            hidden_inputs: 3,
            offscreen: 4,
        };
        assert_eq!(hidden.total(), 10);
    }

    #[test]
    fn test_live_element_find_all() {
        let form = LiveElement::new("FORM")
            .with_attr("Action", "https://x.test/post")
            .with_child(LiveElement::new("input").with_attr("type", "password"))
            .with_child(LiveElement::new("label"))
            .with_child(LiveElement::new("INPUT"));

        assert_eq!(form.tag, "form");
        assert_eq!(form.attr("action"), Some("https://x.test/post"));
        assert_eq!(form.find_all("input").count(), 2);
    }
}

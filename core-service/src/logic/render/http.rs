//! HTTP Renderer - browserless fallback renderer
//!
//! Fetches the page with a blocking HTTP client and parses it with
//! `scraper`. Script is never executed: listener and API capabilities are
//! answered from inline script text and `on*` handler attributes, hidden
//! elements from inline styles. A `<meta http-equiv="refresh">` target is
//! treated as the post-load navigation.

use std::cell::Cell;
use std::time::{Duration, Instant};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{BrowserApi, EventKind, HiddenElements, LiveElement, RenderError, RenderSession, Renderer};
use crate::constants::USER_AGENT;

// ============================================================================
// PATTERNS
// ============================================================================

static OFFSCREEN_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|;)(?:left|top):-\d").expect("offscreen style pattern"));

static REFRESH_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*(\d+)?\s*[;,]?\s*url\s*=\s*['"]?([^'"]+)"#).expect("refresh pattern"));

fn listener_pattern(event: EventKind) -> &'static Regex {
    static PATTERNS: Lazy<Vec<(EventKind, Regex)>> = Lazy::new(|| {
        [
            EventKind::MouseMove,
            EventKind::KeyDown,
            EventKind::Copy,
            EventKind::Cut,
            EventKind::Paste,
            EventKind::Submit,
            EventKind::Change,
        ]
        .into_iter()
        .map(|event| {
            let name = event.as_str();
            let pattern = format!(
                r#"(?i)(?:addEventListener\s*\(\s*['"]{name}['"]|\bon{name}\s*=|\.on\s*\(\s*['"]{name}['"]|\.{name}\s*\()"#
            );
            (event, Regex::new(&pattern).expect("listener pattern"))
        })
        .collect()
    });

    PATTERNS
        .iter()
        .find(|(kind, _)| *kind == event)
        .map(|(_, re)| re)
        .unwrap_or_else(|| unreachable!("every event kind has a pattern"))
}

fn api_pattern(api: BrowserApi) -> &'static Regex {
    static WINDOW_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"window\.open\s*[(=]").expect("window.open"));
    static ALERT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\balert\s*\(").expect("alert"));
    static CONFIRM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bconfirm\s*\(").expect("confirm"));
    static PROMPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bprompt\s*\(").expect("prompt"));
    static COOKIE: Lazy<Regex> = Lazy::new(|| Regex::new(r"document\.cookie").expect("cookie"));

    match api {
        BrowserApi::WindowOpen => &WINDOW_OPEN,
        BrowserApi::Alert => &ALERT,
        BrowserApi::Confirm => &CONFIRM,
        BrowserApi::Prompt => &PROMPT,
        BrowserApi::DocumentCookie => &COOKIE,
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// Renderer that needs nothing but network access
pub struct HttpRenderer {
    agent: ureq::Agent,
}

impl HttpRenderer {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(USER_AGENT)
            .redirects(5)
            .build();
        Self { agent }
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HttpRenderer {
    fn render(&self, url: &str, timeout: Duration) -> Result<Box<dyn RenderSession>, RenderError> {
        let started = Instant::now();
        let response = match self.agent.get(url).timeout(timeout).call() {
            // a browser shows error pages too; they get scored like any other
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(e) if started.elapsed() >= timeout => {
                log::debug!("Render of {} timed out: {}", url, e);
                return Err(RenderError::Timeout(timeout));
            }
            Err(e) => return Err(RenderError::Navigation(e.to_string())),
        };
        let status = response.status();

        let landing_url = response.get_url().to_string();
        let html = response
            .into_string()
            .map_err(|e| RenderError::Navigation(format!("failed to read body: {}", e)))?;

        log::debug!(
            "Rendered {} (HTTP {}, {} bytes, landed on {})",
            url,
            status,
            html.len(),
            landing_url
        );
        Ok(Box::new(HttpSession::new(landing_url, html)))
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// A fetched and parsed page
pub struct HttpSession {
    landing_url: String,
    refresh_target: Option<(u64, String)>,
    settled: Cell<bool>,
    source: String,
    document: Html,
    script_text: String,
}

impl HttpSession {
    pub fn new(landing_url: String, source: String) -> Self {
        let document = Html::parse_document(&source);
        let script_text = collect_script_text(&document);
        let refresh_target = find_refresh_target(&document, &landing_url);

        Self {
            landing_url,
            refresh_target,
            settled: Cell::new(false),
            source,
            document,
            script_text,
        }
    }

    fn selector(tag: &str) -> Result<Selector, RenderError> {
        Selector::parse(tag).map_err(|_| RenderError::Unsupported("non-tag element query"))
    }

    fn snapshot(&self, element: ElementRef<'_>, page_url: &str, with_descendants: bool) -> LiveElement {
        let tag = element.value().name();
        let mut live = LiveElement::new(tag);
        for (name, value) in element.value().attrs() {
            live.attributes.insert(name.to_ascii_lowercase(), value.to_string());
        }

        if tag == "form" {
            let action = resolve_action(live.attr("action"), page_url);
            live.attributes.insert("action".to_string(), action);
        }

        if with_descendants {
            live.descendants = element
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .map(|child| self.snapshot(child, page_url, false))
                .collect();
        }

        live
    }
}

impl RenderSession for HttpSession {
    fn page_source(&self) -> Result<String, RenderError> {
        Ok(self.source.clone())
    }

    fn current_url(&self) -> Result<String, RenderError> {
        match (&self.refresh_target, self.settled.get()) {
            (Some((_, target)), true) => Ok(target.clone()),
            _ => Ok(self.landing_url.clone()),
        }
    }

    fn wait_for_load(&self, timeout: Duration) -> Result<(), RenderError> {
        if let Some((delay, _)) = &self.refresh_target {
            if Duration::from_secs(*delay) <= timeout {
                self.settled.set(true);
            }
        }
        Ok(())
    }

    fn find_elements(&self, tag: &str) -> Result<Vec<LiveElement>, RenderError> {
        let selector = Self::selector(tag)?;
        let page_url = self.current_url()?;
        Ok(self
            .document
            .select(&selector)
            .map(|el| self.snapshot(el, &page_url, true))
            .collect())
    }

    fn has_listener(&self, event: EventKind) -> Result<bool, RenderError> {
        Ok(listener_pattern(event).is_match(&self.script_text))
    }

    fn uses_api(&self, api: BrowserApi) -> Result<bool, RenderError> {
        Ok(api_pattern(api).is_match(&self.script_text))
    }

    fn hidden_elements(&self) -> Result<HiddenElements, RenderError> {
        let mut hidden = HiddenElements::default();

        for element in self.document.root_element().descendants().filter_map(ElementRef::wrap) {
            let value = element.value();
            let style: String = value
                .attr("style")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();

            if style.contains("display:none") || value.attr("hidden").is_some() {
                hidden.display_none += 1;
            }
            if style.contains("visibility:hidden") {
                hidden.visibility_hidden += 1;
            }
            if OFFSCREEN_STYLE.is_match(&style) {
                hidden.offscreen += 1;
            }
            if value.name() == "input"
                && value.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
            {
                hidden.hidden_inputs += 1;
            }
        }

        Ok(hidden)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Inline script bodies plus every `on*` handler attribute, one per line
fn collect_script_text(document: &Html) -> String {
    let mut text = String::new();

    for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
        if element.value().name() == "script" {
            text.extend(element.text());
            text.push('\n');
        }
        for (name, value) in element.value().attrs() {
            if name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on")) {
                text.push_str(&name.to_ascii_lowercase());
                text.push('=');
                text.push_str(value);
                text.push('\n');
            }
        }
    }

    text
}

/// `(delay_secs, absolute_target)` of a meta refresh, if any
fn find_refresh_target(document: &Html, base: &str) -> Option<(u64, String)> {
    let selector = Selector::parse("meta[http-equiv]").ok()?;
    let content = document
        .select(&selector)
        .find(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })?
        .value()
        .attr("content")?;

    let captures = REFRESH_URL.captures(content)?;
    let delay = captures
        .get(1)
        .and_then(|d| d.as_str().parse().ok())
        .unwrap_or(0);
    let target = Url::parse(base).ok()?.join(captures.get(2)?.as_str().trim()).ok()?;
    Some((delay, target.to_string()))
}

/// Mirror the DOM `form.action` property: absolute, page URL when empty
fn resolve_action(raw: Option<&str>, page_url: &str) -> String {
    match raw.map(str::trim) {
        None | Some("") => page_url.to_string(),
        Some(action) if action.eq_ignore_ascii_case("about:blank") => action.to_string(),
        Some(action) => Url::parse(page_url)
            .and_then(|base| base.join(action))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| action.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Dynamic Signals
//!
//! Computed against a live render session. Each query can fail on its own
//! (crashed session, unsupported capability) without affecting the others.

use std::time::Duration;

use super::layout::SignalFamily;
use super::signals::{flag, SignalError, SignalRecord, SignalResult, SignalSet};
use crate::logic::render::{BrowserApi, EventKind, LiveElement, RenderSession};

// ============================================================================
// COMPOSITE RECORDS
// ============================================================================

/// Password field detection over every form on the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordFields {
    /// `input[type=password]`
    pub type_count: u32,
    /// Inputs whose name or id mentions "password"
    pub name_id_count: u32,
    /// Hidden inputs whose name or id mentions "password"
    pub hidden_count: u32,
    /// Forms holding at least one password-typed input
    pub forms_with_password: u32,
}

impl PasswordFields {
    pub fn scan(forms: &[LiveElement]) -> Self {
        let mut fields = Self::default();

        for form in forms {
            let mut has_password = false;

            for input in form.find_all("input") {
                let input_type = input.attr("type").unwrap_or_default();
                let named_password = ["name", "id"].iter().any(|attr| {
                    input
                        .attr(attr)
                        .is_some_and(|v| v.to_lowercase().contains("password"))
                });

                if input_type == "password" {
                    fields.type_count += 1;
                    has_password = true;
                }
                if named_password {
                    fields.name_id_count += 1;
                    if input_type == "hidden" {
                        fields.hidden_count += 1;
                    }
                }
            }

            if has_password {
                fields.forms_with_password += 1;
            }
        }

        fields
    }
}

impl SignalRecord for PasswordFields {
    const FIELDS: &'static [&'static str] = &[
        "password_type_count",
        "password_name_id_count",
        "hidden_password_count",
        "form_with_password",
    ];

    fn values(&self) -> Vec<f32> {
        vec![
            self.type_count as f32,
            self.name_id_count as f32,
            self.hidden_count as f32,
            self.forms_with_password as f32,
        ]
    }
}

/// Script behavior typical of credential harvesting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuspiciousScripts {
    pub clipboard_monitoring: bool,
    pub form_data_collection: bool,
    pub cookie_manipulation: bool,
}

impl SuspiciousScripts {
    pub fn inspect(session: &dyn RenderSession) -> Result<Self, SignalError> {
        Ok(Self {
            clipboard_monitoring: any_listener(session, &[EventKind::Copy, EventKind::Cut, EventKind::Paste])?,
            form_data_collection: any_listener(session, &[EventKind::Submit, EventKind::Change])?,
            cookie_manipulation: session.uses_api(BrowserApi::DocumentCookie)?,
        })
    }
}

impl SignalRecord for SuspiciousScripts {
    const FIELDS: &'static [&'static str] = &[
        "clipboard_monitoring",
        "form_data_collection",
        "cookie_manipulation",
    ];

    fn values(&self) -> Vec<f32> {
        vec![
            flag(self.clipboard_monitoring),
            flag(self.form_data_collection),
            flag(self.cookie_manipulation),
        ]
    }
}

fn any_listener(session: &dyn RenderSession, events: &[EventKind]) -> Result<bool, SignalError> {
    for event in events {
        if session.has_listener(*event)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ============================================================================
// SCALAR SIGNALS
// ============================================================================

pub fn has_mouse_tracking(session: &dyn RenderSession) -> SignalResult {
    Ok(flag(session.has_listener(EventKind::MouseMove)?))
}

pub fn has_keyboard_monitoring(session: &dyn RenderSession) -> SignalResult {
    Ok(flag(session.has_listener(EventKind::KeyDown)?))
}

/// window.open or any dialog override
pub fn has_popups(session: &dyn RenderSession) -> SignalResult {
    for api in [BrowserApi::WindowOpen, BrowserApi::Alert, BrowserApi::Confirm, BrowserApi::Prompt] {
        if session.uses_api(api)? {
            return Ok(1.0);
        }
    }
    Ok(0.0)
}

pub fn number_of_hidden_element(session: &dyn RenderSession) -> SignalResult {
    Ok(session.hidden_elements()?.total() as f32)
}

/// URL before vs. after the document reports load-complete
pub fn page_redirect(session: &dyn RenderSession, load_wait: Duration) -> SignalResult {
    let initial = session.current_url()?;
    session.wait_for_load(load_wait)?;
    let settled = session.current_url()?;
    Ok(flag(initial != settled))
}

pub fn form_redirect_behavior(forms: &[LiveElement], current_url: &str) -> SignalResult {
    let redirects = form_actions(forms).any(|action| {
        action.is_empty()
            || action == "about:blank"
            || (action.contains("http") && !action.contains(current_url))
    });
    Ok(flag(redirects))
}

/// Any form posting somewhere other than the current host
pub fn check_external_form_action(forms: &[LiveElement], current_url: &str) -> SignalResult {
    let host = current_url
        .split('/')
        .nth(2)
        .ok_or_else(|| SignalError::InvalidUrl(current_url.to_string()))?;

    Ok(flag(form_actions(forms).any(|action| !action.contains(host))))
}

fn form_actions(forms: &[LiveElement]) -> impl Iterator<Item = &str> {
    forms.iter().filter_map(|form| form.attr("action"))
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Every dynamic signal for one session
pub fn extract(session: &dyn RenderSession, load_wait: Duration) -> SignalSet {
    let mut set = SignalSet::new(SignalFamily::Dynamic);

    set.insert("has_mouse_tracking", has_mouse_tracking(session));
    set.insert("has_keyboard_monitoring", has_keyboard_monitoring(session));
    set.insert("has_popups", has_popups(session));
    set.insert("number_of_hidden_element", number_of_hidden_element(session));
    set.insert("page_redirect", page_redirect(session, load_wait));

    let forms = session.find_elements("form").map_err(SignalError::from);
    let current_url = session.current_url().map_err(SignalError::from);

    match (&forms, &current_url) {
        (Ok(forms), Ok(url)) => {
            set.insert("form_redirect_behavior", form_redirect_behavior(forms, url));
            set.insert("check_external_form_action", check_external_form_action(forms, url));
        }
        (Err(err), _) | (_, Err(err)) => {
            set.insert("form_redirect_behavior", Err(err.clone()));
            set.insert("check_external_form_action", Err(err.clone()));
        }
    }

    set.insert_record(forms.map(|forms| PasswordFields::scan(&forms)));
    set.insert_record(SuspiciousScripts::inspect(session));

    set
}

// ============================================================================
// TESTS
// ============================================================================

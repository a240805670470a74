use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::ytmusic::surface::{ElementRef, Surface, TextMatch};

/// Marks elements handed out as [`ElementRef`]s so later calls can find
/// them again.
const REF_HELPER: &str = r#"
const __ref = (el) => {
    if (!el.dataset.s2yRef) {
        window.__s2yNext = (window.__s2yNext || 0) + 1;
        el.dataset.s2yRef = String(window.__s2yNext);
    }
    return el.dataset.s2yRef;
};
const __byRef = (id) => document.querySelector(`[data-s2y-ref="${id}"]`);
"#;

/// A Chrome tab on the destination site.
pub struct ChromeSurface {
    // Dropping the browser closes the tab.
    _browser: Browser,
    tab: Arc<Tab>,
}

fn browser_error(err: impl std::fmt::Display) -> AppError {
    AppError::Browser(err.to_string())
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

impl ChromeSurface {
    /// Launch Chrome with a persistent profile (so a YouTube login survives
    /// between runs) and open `url`.
    pub fn launch(url: &str, profile_dir: &Path, headless: bool) -> Result<Self> {
        std::fs::create_dir_all(profile_dir)?;

        let launch_options = LaunchOptions {
            headless,
            window_size: Some((1400, 1000)),
            user_data_dir: Some(profile_dir.to_path_buf()),
            idle_browser_timeout: Duration::from_secs(30 * 60),
            ..Default::default()
        };

        let browser = Browser::new(launch_options).map_err(browser_error)?;
        let tab = browser.new_tab().map_err(browser_error)?;

        tab.navigate_to(url).map_err(browser_error)?;
        tab.wait_until_navigated().map_err(browser_error)?;
        info!("Opened {} in Chrome (headless={})", url, headless);

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Run `body` (a JS function body) in the page and decode its return
    /// value. The result goes through JSON.stringify so arrays and objects
    /// come back by value.
    fn eval(&self, body: &str) -> Result<Value> {
        let script = format!(
            "(() => {{ {} const __result = (() => {{ {} }})(); \
             return JSON.stringify(__result === undefined ? null : __result); }})()",
            REF_HELPER, body
        );

        let remote = self.tab.evaluate(&script, false).map_err(browser_error)?;
        match remote.value {
            Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
            other => {
                debug!("Unexpected evaluation result: {:?}", other);
                Ok(Value::Null)
            }
        }
    }

    fn eval_ref(&self, body: &str) -> Result<Option<ElementRef>> {
        Ok(self
            .eval(body)?
            .as_str()
            .map(|id| ElementRef(id.to_string())))
    }

    /// Run `action` against the element, failing if it has left the page.
    fn on_element(&self, element: &ElementRef, action: &str) -> Result<Value> {
        let value = self.eval(&format!(
            "const el = __byRef({}); if (!el) return false; {} return true;",
            js_string(&element.0),
            action
        ))?;

        if value == Value::Bool(true) {
            Ok(value)
        } else {
            Err(AppError::ElementNotFound(element.to_string()))
        }
    }
}

impl Surface for ChromeSurface {
    fn query(&self, selector: &str) -> Result<Option<ElementRef>> {
        self.eval_ref(&format!(
            "const el = document.querySelector({}); return el ? __ref(el) : null;",
            js_string(selector)
        ))
    }

    fn query_within(
        &self,
        scope: &ElementRef,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<ElementRef>> {
        let value = self.eval(&format!(
            "const root = __byRef({}); if (!root) return []; \
             return Array.from(root.querySelectorAll({})).slice(0, {}).map(__ref);",
            js_string(&scope.0),
            js_string(selector),
            limit
        ))?;

        Ok(value
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(|id| ElementRef(id.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_by_text(
        &self,
        scope: Option<&ElementRef>,
        text: &str,
        mode: TextMatch,
    ) -> Result<Option<ElementRef>> {
        let root = match scope {
            Some(scope) => format!("__byRef({})", js_string(&scope.0)),
            None => "document.body".to_string(),
        };
        let test = match mode {
            TextMatch::Exact => "t.trim() === needle",
            TextMatch::Contains => "t.includes(needle)",
        };

        self.eval_ref(&format!(
            "const root = {}; if (!root) return null; const needle = {}; \
             const el = Array.from(root.querySelectorAll('*')).find((e) => {{ \
                 const t = e.textContent || ''; return e.children.length === 0 && {}; }}); \
             return el ? __ref(el) : null;",
            root,
            js_string(text),
            test
        ))
    }

    fn text(&self, element: &ElementRef) -> Result<String> {
        let value = self.eval(&format!(
            "const el = __byRef({}); return el ? (el.textContent || '').trim() : null;",
            js_string(&element.0)
        ))?;

        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::ElementNotFound(element.to_string()))
    }

    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self.eval(&format!(
            "const el = __byRef({}); return el ? el.getAttribute({}) : null;",
            js_string(&element.0),
            js_string(name)
        ))?;

        Ok(value.as_str().map(str::to_string))
    }

    fn set_value(&self, element: &ElementRef, value: &str) -> Result<()> {
        self.on_element(
            element,
            &format!(
                "el.focus(); el.value = {}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }}));",
                js_string(value)
            ),
        )?;
        Ok(())
    }

    fn click(&self, element: &ElementRef) -> Result<()> {
        self.on_element(element, "el.click();")?;
        Ok(())
    }

    fn open_context_menu(&self, element: &ElementRef) -> Result<()> {
        self.on_element(
            element,
            "el.dispatchEvent(new MouseEvent('contextmenu', \
             { bubbles: true, cancelable: true, view: window }));",
        )?;
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }
}

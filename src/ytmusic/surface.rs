use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{AppError, Result};

/// Opaque handle to an element on the destination surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    /// Trimmed text equals the needle.
    Exact,
    /// Text contains the needle.
    Contains,
}

/// A page that can only be observed through DOM queries and driven through
/// synthetic events. Calls are quick, one-shot observations; waiting is done
/// by [`await_observable`].
pub trait Surface: Send + Sync {
    fn query(&self, selector: &str) -> Result<Option<ElementRef>>;

    /// Up to `limit` matches of `selector` under `scope`, in document order.
    fn query_within(
        &self,
        scope: &ElementRef,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<ElementRef>>;

    /// First leaf element (no child elements) whose text matches, searched
    /// under `scope` or the whole document.
    fn find_by_text(
        &self,
        scope: Option<&ElementRef>,
        text: &str,
        mode: TextMatch,
    ) -> Result<Option<ElementRef>>;

    fn text(&self, element: &ElementRef) -> Result<String>;

    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Focus, assign the value and dispatch a bubbling `input` event.
    fn set_value(&self, element: &ElementRef, value: &str) -> Result<()>;

    fn click(&self, element: &ElementRef) -> Result<()>;

    /// Dispatch a bubbling `contextmenu` mouse event.
    fn open_context_menu(&self, element: &ElementRef) -> Result<()>;

    fn current_url(&self) -> Result<String>;
}

/// Poll `probe` until it yields a value or `timeout` elapses.
///
/// Probe errors end the wait immediately. On expiry the error is
/// [`AppError::Timeout`] naming `what`.
pub async fn await_observable<S, T, F>(
    surface: &S,
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<T>
where
    S: Surface + ?Sized,
    F: FnMut(&S) -> Result<Option<T>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(found) = probe(surface)? {
            return Ok(found);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(AppError::Timeout {
                what: what.to_string(),
                ms: timeout.as_millis() as u64,
            });
        }

        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}

//! In-memory stand-in for the YouTube Music page.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::ytmusic::models::{Selectors, Timings};
use crate::ytmusic::surface::{ElementRef, Surface, TextMatch};

const HOME_URL: &str = "https://music.youtube.com/";

pub fn fast_timings() -> Timings {
    Timings {
        structural_timeout: Duration::from_millis(40),
        results_timeout: Duration::from_millis(40),
        menu_timeout: Duration::from_millis(40),
        search_settle: Duration::from_millis(1),
        poll_interval: Duration::from_millis(5),
    }
}

#[derive(Default)]
struct FakeState {
    anchor_present: bool,
    created_id: Option<String>,
    created_link: Option<String>,
    page_link: Option<String>,
    create_dialog_open: bool,
    name_value: String,
    url: String,
    search_value: Option<String>,
    results: HashMap<String, Vec<String>>,
    context_menu_for: Option<usize>,
    add_dialog_open: bool,
    playlists: Vec<String>,
    added: Vec<(String, String)>,
    failing_clicks: bool,
}

/// Scripted page: search results per query, playlists created through the
/// dialog, and a log of tracks added to playlists.
pub struct FakeSurface {
    sel: Selectors,
    state: Mutex<FakeState>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self {
            sel: Selectors::default(),
            state: Mutex::new(FakeState {
                anchor_present: true,
                url: HOME_URL.to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn without_anchor(self) -> Self {
        self.state.lock().unwrap().anchor_present = false;
        self
    }

    /// Confirming the create dialog navigates to `?list=<id>`.
    pub fn with_created_id(self, id: &str) -> Self {
        self.state.lock().unwrap().created_id = Some(id.to_string());
        self
    }

    /// Confirming the create dialog lands on a page without `list=`, where
    /// the new playlist only shows up as a link.
    pub fn with_created_link(self, id: &str) -> Self {
        self.state.lock().unwrap().created_link = Some(id.to_string());
        self
    }

    /// A link to an existing playlist already on the page.
    pub fn with_library_link(self, id: &str) -> Self {
        self.state.lock().unwrap().page_link = Some(id.to_string());
        self
    }

    pub fn starting_at(self, url: &str) -> Self {
        self.state.lock().unwrap().url = url.to_string();
        self
    }

    pub fn with_results(self, query: &str, titles: &[&str]) -> Self {
        self.state.lock().unwrap().results.insert(
            query.to_string(),
            titles.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_playlist(self, name: &str) -> Self {
        self.state.lock().unwrap().playlists.push(name.to_string());
        self
    }

    pub fn failing_clicks(self) -> Self {
        self.state.lock().unwrap().failing_clicks = true;
        self
    }

    pub fn playlist_names(&self) -> Vec<String> {
        self.state.lock().unwrap().playlists.clone()
    }

    /// `(result title, playlist name)` pairs in the order they were added.
    pub fn added(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().added.clone()
    }

    fn result_titles(state: &FakeState) -> Option<&Vec<String>> {
        state
            .search_value
            .as_ref()
            .and_then(|query| state.results.get(query))
    }

    fn index(element: &ElementRef, prefix: &str) -> Option<usize> {
        element.0.strip_prefix(prefix)?.parse().ok()
    }
}

fn el(id: impl Into<String>) -> ElementRef {
    ElementRef(id.into())
}

impl Surface for FakeSurface {
    fn query(&self, selector: &str) -> Result<Option<ElementRef>> {
        let state = self.state.lock().unwrap();
        let sel = &self.sel;

        let found = if selector == sel.anchor {
            state.anchor_present.then(|| el("anchor"))
        } else if selector == sel.create_dialog {
            state.create_dialog_open.then(|| el("create-dialog"))
        } else if selector == sel.search_input {
            state.anchor_present.then(|| el("search-input"))
        } else if selector == sel.results_container {
            Self::result_titles(&state).map(|_| el("results"))
        } else if selector == sel.context_menu {
            state.context_menu_for.map(|_| el("context-menu"))
        } else if selector == sel.add_dialog {
            state.add_dialog_open.then(|| el("add-dialog"))
        } else if selector == sel.playlist_link {
            state.page_link.as_ref().map(|_| el("playlist-link"))
        } else {
            None
        };

        Ok(found)
    }

    fn query_within(
        &self,
        scope: &ElementRef,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<ElementRef>> {
        let state = self.state.lock().unwrap();
        let sel = &self.sel;

        let found = match scope.0.as_str() {
            "results" if selector == sel.result_entry => {
                let count = Self::result_titles(&state).map_or(0, Vec::len);
                (0..count).map(|i| el(format!("result:{}", i))).collect()
            }
            "create-dialog" if selector == sel.name_input => vec![el("name-input")],
            other if selector == sel.result_title => match Self::index(scope, "result:") {
                Some(i) => vec![el(format!("result-title:{}", i))],
                None => panic!("unexpected title lookup in {}", other),
            },
            _ => Vec::new(),
        };

        Ok(found.into_iter().take(limit).collect())
    }

    fn find_by_text(
        &self,
        scope: Option<&ElementRef>,
        text: &str,
        mode: TextMatch,
    ) -> Result<Option<ElementRef>> {
        let state = self.state.lock().unwrap();
        let sel = &self.sel;
        let matches = |label: &str| match mode {
            TextMatch::Exact => label.trim() == text,
            TextMatch::Contains => label.contains(text),
        };

        let found = match scope.map(|s| s.0.as_str()) {
            None if state.anchor_present && matches(&sel.create_playlist_text) => {
                Some(el("create-button"))
            }
            Some("create-dialog") if matches(&sel.create_confirm_text) => {
                Some(el("create-confirm"))
            }
            Some("context-menu") if matches(&sel.add_to_playlist_text) => Some(el("add-item")),
            Some("add-dialog") => state
                .playlists
                .iter()
                .find(|name| matches(name))
                .map(|name| el(format!("playlist:{}", name))),
            _ => None,
        };

        Ok(found)
    }

    fn text(&self, element: &ElementRef) -> Result<String> {
        let state = self.state.lock().unwrap();
        let index = Self::index(element, "result-title:")
            .or_else(|| Self::index(element, "result:"))
            .ok_or_else(|| AppError::ElementNotFound(element.to_string()))?;

        Self::result_titles(&state)
            .and_then(|titles| titles.get(index).cloned())
            .ok_or_else(|| AppError::ElementNotFound(element.to_string()))
    }

    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        match (element.0.as_str(), name) {
            ("playlist-link", "href") => Ok(state
                .page_link
                .as_ref()
                .map(|id| format!("playlist?list={}", id))),
            _ => Ok(None),
        }
    }

    fn set_value(&self, element: &ElementRef, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match element.0.as_str() {
            "name-input" => state.name_value = value.to_string(),
            "search-input" => {
                state.search_value = Some(value.to_string());
                state.context_menu_for = None;
                state.add_dialog_open = false;
            }
            other => return Err(AppError::ElementNotFound(other.to_string())),
        }
        Ok(())
    }

    fn click(&self, element: &ElementRef) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_clicks {
            return Err(AppError::Browser("click failed".into()));
        }

        match element.0.as_str() {
            "create-button" => state.create_dialog_open = true,
            "create-confirm" => {
                state.create_dialog_open = false;
                let name = std::mem::take(&mut state.name_value);
                state.playlists.push(name);
                if let Some(id) = state.created_id.clone() {
                    state.url = format!("{}playlist?list={}", HOME_URL, id);
                } else if let Some(id) = state.created_link.clone() {
                    state.url = format!("{}library/playlists", HOME_URL);
                    state.page_link = Some(id);
                }
            }
            "add-item" => state.add_dialog_open = true,
            other => match other.strip_prefix("playlist:") {
                Some(name) => {
                    let index = state
                        .context_menu_for
                        .take()
                        .ok_or_else(|| AppError::Browser("no context menu".into()))?;
                    let title = Self::result_titles(&state)
                        .and_then(|titles| titles.get(index).cloned())
                        .unwrap_or_default();
                    state.added.push((title, name.to_string()));
                    state.add_dialog_open = false;
                }
                None => return Err(AppError::ElementNotFound(other.to_string())),
            },
        }
        Ok(())
    }

    fn open_context_menu(&self, element: &ElementRef) -> Result<()> {
        let index = Self::index(element, "result:")
            .ok_or_else(|| AppError::ElementNotFound(element.to_string()))?;
        self.state.lock().unwrap().context_menu_for = Some(index);
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }
}

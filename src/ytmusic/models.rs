use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::spotify::Track;
use crate::ytmusic::surface::ElementRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistHandle {
    pub id: String,
    pub name: String,
}

/// Where a per-track search-and-add stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStep {
    Searching,
    ResultsAvailable,
    BestMatchSelected,
    ContextMenuOpen,
    AddMenuOpen,
    PlaylistSelected,
}

impl fmt::Display for SearchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStep::Searching => write!(f, "searching"),
            SearchStep::ResultsAvailable => write!(f, "results available"),
            SearchStep::BestMatchSelected => write!(f, "best match selected"),
            SearchStep::ContextMenuOpen => write!(f, "context menu open"),
            SearchStep::AddMenuOpen => write!(f, "add menu open"),
            SearchStep::PlaylistSelected => write!(f, "playlist selected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum MatchFailure {
    NoResults,
    Timeout(SearchStep),
    AffordanceNotFound(SearchStep),
    Surface(String),
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchFailure::NoResults => write!(f, "no search results"),
            MatchFailure::Timeout(step) => write!(f, "timed out while {}", step),
            MatchFailure::AffordanceNotFound(step) => {
                write!(f, "control missing after {}", step)
            }
            MatchFailure::Surface(msg) => write!(f, "surface error: {}", msg),
        }
    }
}

/// Outcome of one track's search-and-add. Built once per track per transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub track: Track,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_element: Option<ElementRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<MatchFailure>,
}

impl MatchResult {
    pub fn matched(track: Track, element: ElementRef, title: String) -> Self {
        Self {
            track,
            found: true,
            matched_element: Some(element),
            matched_title: Some(title),
            failure: None,
        }
    }

    pub fn not_found(track: Track, failure: MatchFailure) -> Self {
        Self {
            track,
            found: false,
            matched_element: None,
            matched_title: None,
            failure: Some(failure),
        }
    }
}

/// Selectors and labels of the destination page.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub anchor: String,
    pub create_playlist_text: String,
    pub create_dialog: String,
    pub name_input: String,
    pub create_confirm_text: String,
    pub playlist_link: String,
    pub search_input: String,
    pub results_container: String,
    pub result_entry: String,
    pub result_title: String,
    pub context_menu: String,
    pub add_to_playlist_text: String,
    pub add_dialog: String,
    pub max_candidates: usize,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            anchor: "ytmusic-nav-bar".to_string(),
            create_playlist_text: "Create new playlist".to_string(),
            create_dialog: "ytmusic-playlist-form".to_string(),
            name_input: "input[placeholder*=\"ame\"]".to_string(),
            create_confirm_text: "Create".to_string(),
            playlist_link: "a[href*=\"list=\"]".to_string(),
            search_input: "input[placeholder*=\"earch\"]".to_string(),
            results_container: "[role=\"listbox\"]".to_string(),
            result_entry: "[role=\"option\"]".to_string(),
            result_title: "[role=\"button\"]".to_string(),
            context_menu: "ytmusic-menu-popup-renderer".to_string(),
            add_to_playlist_text: "Add to playlist".to_string(),
            add_dialog: "ytmusic-add-to-playlist-renderer".to_string(),
            max_candidates: 3,
        }
    }
}

/// Wait bounds. None of the waits are retried.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Page anchors, dialogs and the created playlist's id.
    pub structural_timeout: Duration,
    pub results_timeout: Duration,
    /// Context menu and add-to-playlist entries.
    pub menu_timeout: Duration,
    /// Pause after typing a query so stale results are not read.
    pub search_settle: Duration,
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            structural_timeout: Duration::from_millis(5000),
            results_timeout: Duration::from_millis(3000),
            menu_timeout: Duration::from_millis(2000),
            search_settle: Duration::from_millis(800),
            poll_interval: Duration::from_millis(100),
        }
    }
}

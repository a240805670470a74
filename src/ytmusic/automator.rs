use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::spotify::Track;
use crate::ytmusic::models::{
    MatchFailure, MatchResult, PlaylistHandle, SearchStep, Selectors, Timings,
};
use crate::ytmusic::surface::{ElementRef, Surface, TextMatch, await_observable};

/// Where matched tracks end up.
///
/// Calls take `&mut self`: the destination is one shared page and two
/// operations must never interleave on it.
#[async_trait]
pub trait PlaylistDestination: Send {
    async fn create_playlist(&mut self, name: &str) -> Result<PlaylistHandle>;

    /// Never fails; every fault is folded into `found: false`.
    async fn search_and_add(&mut self, track: &Track, playlist_name: &str) -> MatchResult;
}

struct Candidate {
    element: ElementRef,
    title: String,
}

/// Drives the YouTube Music web UI through a [`Surface`].
pub struct DestinationAutomator<S: Surface> {
    surface: S,
    selectors: Selectors,
    timings: Timings,
    current_playlist: Option<PlaylistHandle>,
}

impl<S: Surface> DestinationAutomator<S> {
    pub fn new(surface: S) -> Self {
        Self::with_settings(surface, Selectors::default(), Timings::default())
    }

    pub fn with_settings(surface: S, selectors: Selectors, timings: Timings) -> Self {
        Self {
            surface,
            selectors,
            timings,
            current_playlist: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn current_playlist(&self) -> Option<&PlaylistHandle> {
        self.current_playlist.as_ref()
    }

    /// Wait for `selector` within the structural bound, reporting a miss as
    /// `ElementNotFound`.
    async fn require_element(&self, selector: &str) -> Result<ElementRef> {
        await_observable(
            &self.surface,
            selector,
            self.timings.structural_timeout,
            self.timings.poll_interval,
            |s| s.query(selector),
        )
        .await
        .map_err(|e| not_found_on_timeout(e, selector))
    }

    async fn require_text(
        &self,
        scope: Option<&ElementRef>,
        text: &str,
        mode: TextMatch,
    ) -> Result<ElementRef> {
        await_observable(
            &self.surface,
            text,
            self.timings.structural_timeout,
            self.timings.poll_interval,
            |s| s.find_by_text(scope, text, mode),
        )
        .await
        .map_err(|e| not_found_on_timeout(e, text))
    }

    /// Playlist id from the current URL, or from a playlist link on the page.
    /// Nothing is read until the page has left `url_before`, so links that
    /// were already there are never taken for the new playlist.
    fn extract_playlist_id(&self, url_before: &str) -> Result<Option<String>> {
        let current = self.surface.current_url()?;
        if current == url_before {
            return Ok(None);
        }

        if let Some(id) = playlist_id_from_url(&current, None) {
            return Ok(Some(id));
        }

        if let Some(link) = self.surface.query(&self.selectors.playlist_link)? {
            if let Some(href) = self.surface.attribute(&link, "href")? {
                return Ok(playlist_id_from_url(&href, Some(&current)));
            }
        }

        Ok(None)
    }

    async fn search(&self, track: &Track) -> std::result::Result<Vec<Candidate>, MatchFailure> {
        let sel = &self.selectors;
        let step = SearchStep::Searching;

        let search_box = self
            .surface
            .query(&sel.search_input)
            .map_err(surface_failure)?
            .ok_or(MatchFailure::AffordanceNotFound(step))?;

        self.surface
            .set_value(&search_box, &track.search_query())
            .map_err(surface_failure)?;

        tokio::time::sleep(self.timings.search_settle).await;

        let container = await_observable(
            &self.surface,
            &sel.results_container,
            self.timings.results_timeout,
            self.timings.poll_interval,
            |s| s.query(&sel.results_container),
        )
        .await
        .map_err(|e| step_failure(e, step))?;

        let entries = self
            .surface
            .query_within(&container, &sel.result_entry, sel.max_candidates)
            .map_err(surface_failure)?;

        let mut candidates = Vec::with_capacity(entries.len());
        for element in entries.into_iter().take(sel.max_candidates) {
            let title = match self
                .surface
                .query_within(&element, &sel.result_title, 1)
                .map_err(surface_failure)?
                .first()
            {
                Some(title_el) => self.surface.text(title_el).map_err(surface_failure)?,
                None => String::new(),
            };
            candidates.push(Candidate { element, title });
        }

        Ok(candidates)
    }

    async fn add_to_playlist(
        &self,
        candidate: &Candidate,
        playlist_name: &str,
    ) -> std::result::Result<(), MatchFailure> {
        let sel = &self.selectors;

        self.surface
            .open_context_menu(&candidate.element)
            .map_err(surface_failure)?;

        let step = SearchStep::ContextMenuOpen;
        debug!("Step: {}", step);
        let add_item = await_observable(
            &self.surface,
            &sel.add_to_playlist_text,
            self.timings.menu_timeout,
            self.timings.poll_interval,
            |s| {
                let Some(menu) = s.query(&sel.context_menu)? else {
                    return Ok(None);
                };
                s.find_by_text(Some(&menu), &sel.add_to_playlist_text, TextMatch::Contains)
            },
        )
        .await
        .map_err(|e| affordance_failure(e, step))?;
        self.surface.click(&add_item).map_err(surface_failure)?;

        let step = SearchStep::AddMenuOpen;
        debug!("Step: {}", step);
        let option = await_observable(
            &self.surface,
            playlist_name,
            self.timings.menu_timeout,
            self.timings.poll_interval,
            |s| {
                let Some(dialog) = s.query(&sel.add_dialog)? else {
                    return Ok(None);
                };
                s.find_by_text(Some(&dialog), playlist_name, TextMatch::Exact)
            },
        )
        .await
        .map_err(|e| affordance_failure(e, step))?;
        self.surface.click(&option).map_err(surface_failure)?;

        debug!("Step: {}", SearchStep::PlaylistSelected);
        Ok(())
    }
}

#[async_trait]
impl<S: Surface> PlaylistDestination for DestinationAutomator<S> {
    async fn create_playlist(&mut self, name: &str) -> Result<PlaylistHandle> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Playlist name is required".into()));
        }

        let sel = self.selectors.clone();

        self.require_element(&sel.anchor).await?;

        let create = self
            .require_text(None, &sel.create_playlist_text, TextMatch::Contains)
            .await?;
        self.surface.click(&create)?;

        let dialog = self.require_element(&sel.create_dialog).await?;
        let name_input = self
            .surface
            .query_within(&dialog, &sel.name_input, 1)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ElementNotFound(sel.name_input.clone()))?;
        self.surface.set_value(&name_input, name)?;

        let confirm = self
            .require_text(Some(&dialog), &sel.create_confirm_text, TextMatch::Exact)
            .await?;
        let url_before = self.surface.current_url()?;
        self.surface.click(&confirm)?;

        let id = await_observable(
            &self.surface,
            "created playlist id",
            self.timings.structural_timeout,
            self.timings.poll_interval,
            |_| self.extract_playlist_id(&url_before),
        )
        .await
        .map_err(|e| match e {
            AppError::Timeout { .. } => AppError::IdExtractionFailed,
            other => other,
        })?;

        info!("Created YouTube Music playlist: {} ({})", name, id);

        let handle = PlaylistHandle {
            id,
            name: name.to_string(),
        };
        self.current_playlist = Some(handle.clone());
        Ok(handle)
    }

    async fn search_and_add(&mut self, track: &Track, playlist_name: &str) -> MatchResult {
        if track.search_query().is_empty() {
            debug!("Nothing to search for track {:?}", track.source_id);
            return MatchResult::not_found(track.clone(), MatchFailure::NoResults);
        }

        debug!("Step: {} for {}", SearchStep::Searching, track.search_query());

        let candidates = match self.search(track).await {
            Ok(candidates) => candidates,
            Err(failure) => {
                debug!("Search failed for {}: {}", track.title, failure);
                return MatchResult::not_found(track.clone(), failure);
            }
        };
        debug!("Step: {} ({} candidates)", SearchStep::ResultsAvailable, candidates.len());

        // Position is the only ranking; the other candidates are never tried.
        let Some(best) = candidates.into_iter().next() else {
            debug!("No results for {}", track.title);
            return MatchResult::not_found(track.clone(), MatchFailure::NoResults);
        };
        debug!("Step: {} ({})", SearchStep::BestMatchSelected, best.title);

        match self.add_to_playlist(&best, playlist_name).await {
            Ok(()) => MatchResult::matched(track.clone(), best.element, best.title),
            Err(failure) => {
                warn!("Could not add {} to {}: {}", track.title, playlist_name, failure);
                MatchResult::not_found(track.clone(), failure)
            }
        }
    }
}

/// `list` query parameter of `href`, resolved against `base` when relative.
pub fn playlist_id_from_url(href: &str, base: Option<&str>) -> Option<String> {
    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => Url::parse(base?).ok()?.join(href).ok()?,
    };

    url.query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.into_owned())
        .filter(|id| {
            !id.is_empty()
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

fn not_found_on_timeout(err: AppError, target: &str) -> AppError {
    match err {
        AppError::Timeout { .. } => AppError::ElementNotFound(target.to_string()),
        other => other,
    }
}

fn surface_failure(err: AppError) -> MatchFailure {
    MatchFailure::Surface(err.to_string())
}

fn step_failure(err: AppError, step: SearchStep) -> MatchFailure {
    match err {
        AppError::Timeout { .. } => MatchFailure::Timeout(step),
        other => surface_failure(other),
    }
}

fn affordance_failure(err: AppError, step: SearchStep) -> MatchFailure {
    match err {
        AppError::Timeout { .. } => MatchFailure::AffordanceNotFound(step),
        other => surface_failure(other),
    }
}

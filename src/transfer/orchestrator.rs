use tracing::{info, warn};

use crate::error::Result;
use crate::spotify::{Playlist, SourceCatalog};
use crate::storage::TransferHistory;
use crate::transfer::report::{FailedTrack, TransferRecord, TransferReport};
use crate::ytmusic::PlaylistDestination;

const TRACKS_FETCHED_PERCENT: f64 = 30.0;
const PLAYLIST_CREATED_PERCENT: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    TracksFetched,
    PlaylistCreated,
    AddingTracks,
}

/// Emitted after every discrete step of a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub stage: TransferStage,
    /// 0..=100
    pub percent: f64,
    pub matched: usize,
    pub not_found: usize,
    pub status: String,
}

/// Percent shown once `completed` of `total` tracks have been attempted.
pub fn track_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    PLAYLIST_CREATED_PERCENT
        + (completed as f64 / total as f64) * (100.0 - PLAYLIST_CREATED_PERCENT)
}

/// Runs source read, destination create and per-track search-and-add, one
/// step at a time.
pub struct TransferOrchestrator<S, D> {
    source: S,
    destination: D,
    history: TransferHistory,
}

impl<S, D> TransferOrchestrator<S, D>
where
    S: SourceCatalog,
    D: PlaylistDestination,
{
    pub fn new(source: S, destination: D, history: TransferHistory) -> Self {
        Self {
            source,
            destination,
            history,
        }
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Transfer one playlist. Only a failed track read or playlist creation
    /// aborts; unmatched tracks are counted and skipped. Nothing is rolled
    /// back if the caller stops midway.
    pub async fn transfer<F>(
        &mut self,
        playlist: &Playlist,
        source_token: &str,
        mut on_progress: F,
    ) -> Result<TransferReport>
    where
        F: FnMut(Progress),
    {
        info!("Transferring playlist: {}", playlist.name);

        let tracks = self.source.list_tracks(&playlist.id, source_token).await?;
        let total = tracks.len();
        on_progress(Progress {
            stage: TransferStage::TracksFetched,
            percent: TRACKS_FETCHED_PERCENT,
            matched: 0,
            not_found: 0,
            status: format!("Found {} tracks. Creating YouTube Music playlist...", total),
        });

        let handle = match self.destination.create_playlist(&playlist.name).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to create YouTube Music playlist for {}: {}", playlist.name, e);
                return Err(e);
            }
        };
        on_progress(Progress {
            stage: TransferStage::PlaylistCreated,
            percent: PLAYLIST_CREATED_PERCENT,
            matched: 0,
            not_found: 0,
            status: "Searching and adding tracks to YouTube Music...".to_string(),
        });

        let mut matched = 0;
        let mut not_found = 0;
        let mut failed_tracks = Vec::new();

        for (i, track) in tracks.iter().enumerate() {
            let result = self.destination.search_and_add(track, &handle.name).await;

            if result.found {
                matched += 1;
            } else {
                not_found += 1;
                failed_tracks.push(FailedTrack::new(
                    track,
                    result.failure.as_ref().map(ToString::to_string),
                ));
            }

            on_progress(Progress {
                stage: TransferStage::AddingTracks,
                percent: track_percent(i + 1, total),
                matched,
                not_found,
                status: format!("Adding tracks... {}/{}", i + 1, total),
            });
        }

        if total == 0 {
            on_progress(Progress {
                stage: TransferStage::AddingTracks,
                percent: track_percent(0, 0),
                matched: 0,
                not_found: 0,
                status: "No tracks to add".to_string(),
            });
        }

        let record = TransferRecord::new(playlist.name.clone(), matched, total);
        self.history.append(record.clone())?;

        info!(
            "Playlist transfer completed: {} - {}/{} tracks matched ({:.1}% success rate)",
            playlist.name,
            matched,
            total,
            record.success_rate()
        );

        Ok(TransferReport {
            record,
            destination_playlist_id: handle.id,
            tracks_not_found: not_found,
            failed_tracks,
        })
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spotify::Track;

pub const SOURCE_NAME: &str = "Spotify";
pub const DESTINATION_NAME: &str = "YouTube Music";

/// Summary of one completed transfer, as kept in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub source: String,
    pub destination: String,
    pub playlist_name: String,
    pub tracks_matched: usize,
    pub tracks_total: usize,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TransferRecord {
    pub fn new(playlist_name: String, tracks_matched: usize, tracks_total: usize) -> Self {
        Self {
            source: SOURCE_NAME.to_string(),
            destination: DESTINATION_NAME.to_string(),
            playlist_name,
            tracks_matched,
            tracks_total,
            timestamp: Utc::now(),
        }
    }

    pub fn tracks_not_found(&self) -> usize {
        self.tracks_total.saturating_sub(self.tracks_matched)
    }

    pub fn success_rate(&self) -> f64 {
        if self.tracks_total > 0 {
            (self.tracks_matched as f64 / self.tracks_total as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTrack {
    pub name: String,
    pub artist: String,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FailedTrack {
    pub fn new(track: &Track, reason: Option<String>) -> Self {
        Self {
            name: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            reason,
        }
    }
}

/// Everything a finished transfer produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    pub record: TransferRecord,
    pub destination_playlist_id: String,
    pub tracks_not_found: usize,
    pub failed_tracks: Vec<FailedTrack>,
}

use serde::{Deserialize, Serialize};

/// A track as read from the source catalog. Never mutated after reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    /// Contributing artist names joined with ", ".
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Track {
    /// Query typed into the destination search box.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// Wire shapes of the source API. Every field is optional so one malformed
// item never fails a whole page.

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct PageDto<T> {
    #[serde(default)]
    pub items: Option<Vec<T>>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItemDto {
    #[serde(default)]
    pub track: Option<TrackDto>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TrackDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Option<Vec<NamedDto>>,
    #[serde(default)]
    pub album: Option<AlbumDto>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub external_ids: Option<ExternalIdsDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedDto {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AlbumDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImageDto>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageDto {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExternalIdsDto {
    #[serde(default)]
    pub isrc: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tracks: Option<TrackTotalDto>,
    #[serde(default)]
    pub images: Option<Vec<ImageDto>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackTotalDto {
    #[serde(default)]
    pub total: u64,
}

impl From<TrackDto> for Track {
    fn from(dto: TrackDto) -> Self {
        let album = dto.album.unwrap_or_default();
        Self {
            title: dto.name.unwrap_or_default(),
            artist: dto
                .artists
                .unwrap_or_default()
                .into_iter()
                .filter_map(|a| a.name)
                .collect::<Vec<_>>()
                .join(", "),
            album: album.name.unwrap_or_default(),
            duration_ms: dto.duration_ms.unwrap_or(0),
            source_id: dto.id.unwrap_or_default(),
            isrc: dto.external_ids.and_then(|ids| ids.isrc),
            image_url: album
                .images
                .and_then(|images| images.into_iter().next())
                .and_then(|i| i.url),
        }
    }
}

impl From<PlaylistDto> for Playlist {
    fn from(dto: PlaylistDto) -> Self {
        Self {
            id: dto.id.unwrap_or_default(),
            name: dto.name.unwrap_or_default(),
            track_count: dto.tracks.map(|t| t.total).unwrap_or(0),
            image_url: dto
                .images
                .and_then(|images| images.into_iter().next())
                .and_then(|i| i.url),
        }
    }
}

#[cfg(test)]
impl Track {
    pub fn mock(title: &str, artist: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            album: "Mock Album".to_string(),
            duration_ms: 180000,
            source_id: format!("mock_{}", title.to_lowercase().replace(' ', "_")),
            isrc: Some("MOCK12345678".to_string()),
            image_url: None,
        }
    }
}

pub mod automator;
pub mod chrome;
pub mod models;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use automator::{DestinationAutomator, PlaylistDestination};
pub use chrome::ChromeSurface;
pub use models::{MatchFailure, MatchResult, PlaylistHandle, SearchStep, Selectors, Timings};
pub use surface::{ElementRef, Surface, TextMatch};

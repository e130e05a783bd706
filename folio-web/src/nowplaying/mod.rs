//! Live "now playing" status from Last.fm

pub mod display;
pub mod lastfm;
pub mod notifier;
pub mod source;

pub use display::{NowPlaying, TrackPlay, LASTFM_LOGO};
pub use lastfm::LastFmClient;
pub use notifier::{NowPlayingNotifier, RefreshOutcome, SubscriberId, Subscription};
pub use source::{RecentTracksSource, SourceError, UnconfiguredSource};

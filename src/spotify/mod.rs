pub mod auth;
pub mod client;
pub mod models;
pub mod paging;

pub use auth::SpotifyAuth;
pub use client::{PlaylistSource, SpotifyClient};
pub use models::{SpotifyPlaylist, SpotifyTrack};

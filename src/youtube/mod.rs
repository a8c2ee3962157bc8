pub mod catalog;
pub mod client;
pub mod models;

pub use catalog::{NO_MATCH, VideoCatalog};
pub use client::YouTubeClient;
pub use models::{
    CredentialRole, FailureKind, PrivacyStatus, SearchAndAddResult, SearchStrategy,
    YouTubePlaylist,
};

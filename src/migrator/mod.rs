pub mod orchestrator;
pub mod progress;
pub mod report;

pub use orchestrator::{MigrationOptions, PlaylistMigrator};
pub use progress::{MigrationEvent, ProgressCallback, TrackProgress};
pub use report::{FailedTrack, MigrationOutcome};

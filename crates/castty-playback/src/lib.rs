pub mod cast_reader;
pub mod errors;
pub mod playback_loop;

pub use cast_reader::{load, CastRecording};
pub use errors::PlaybackError;
pub use playback_loop::{run, PlaybackOptions, PlaybackStatus};

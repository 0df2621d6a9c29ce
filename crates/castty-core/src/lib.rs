pub mod cast_writer;
pub mod clock;
pub mod error;
pub mod logging;
pub mod replay_buffer;
pub mod terminal_controller;

pub use cast_writer::CastWriter;
pub use clock::EventClock;
pub use error::CoreError;
pub use logging::init_logging;
pub use replay_buffer::{ReplayBuffer, ReplayEntry};
pub use terminal_controller::TerminalController;

pub mod errors;
pub mod hub;
pub mod monitor;
pub mod pty;
pub mod recorder_loop;

pub use errors::RecorderError;
pub use hub::HubHandle;
pub use pty::{LineDiscipline, PtyHost};
pub use recorder_loop::{run, RecordOptions};

pub use castty_core::TerminalController;

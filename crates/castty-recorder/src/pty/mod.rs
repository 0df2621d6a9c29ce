pub mod host;

pub use host::{LineDiscipline, PtyHost};

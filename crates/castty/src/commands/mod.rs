pub mod monitor_connect;
pub mod playback;
pub mod record;
mod window_spawn;

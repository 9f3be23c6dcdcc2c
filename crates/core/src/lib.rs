pub mod chat;
pub mod config;
pub mod emotion;
pub mod lipsync;
pub mod morph;
pub mod playback;
pub mod speech;
pub mod util;

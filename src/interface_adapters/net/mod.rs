// Push channel adapter.

pub mod channel;

pub use channel::{ChannelConfig, ChannelEvent, ChannelHandle, run_channel, spawn_channel};

// Frameworks layer: configuration, logging bootstrap, and the session loop.

pub mod config;
pub mod runtime;

// Outbound request/response clients.

pub mod service;

pub use service::HttpMatchService;

// Interface adapters: wire protocol, service client, and push channel.

pub mod clients;
pub mod clock;
pub mod net;
pub mod protocol;

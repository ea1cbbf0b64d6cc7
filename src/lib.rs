pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
mod handler;
pub mod mvpn;
pub mod rib;
mod server;
pub mod utils;

pub use config::{InstanceConfig, ServerConfig};
pub use handler::Server;
pub use server::{EngineError, MvpnServer};

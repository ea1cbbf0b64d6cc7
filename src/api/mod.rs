mod handler;
mod instances;
mod routes;
pub mod rpc;

pub use rpc::{ApiClient, ApiServer};

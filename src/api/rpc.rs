use std::net::Ipv4Addr;

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use serde::{self, Deserialize, Serialize};

#[rpc(client, server)]
pub trait Api {
    #[method(name = "show_instances")]
    async fn show_instances(&self) -> RpcResult<Vec<InstanceSummary>>;
    #[method(name = "show_routes")]
    async fn show_routes(&self, instance: String) -> RpcResult<Vec<RouteDetail>>;
    #[method(name = "show_tree_routes")]
    async fn show_tree_routes(&self, instance: String) -> RpcResult<Vec<RouteDetail>>;
    #[method(name = "show_neighbors")]
    async fn show_neighbors(&self, instance: String) -> RpcResult<Vec<NeighborDetail>>;
    #[method(name = "advertise_route")]
    async fn advertise_route(&self, route: RouteSpec) -> RpcResult<Vec<RouteDetail>>;
    #[method(name = "withdraw_route")]
    async fn withdraw_route(&self, instance: String, prefix: String) -> RpcResult<bool>;
    #[method(name = "advertise_tree")]
    async fn advertise_tree(&self, tree: TreeSpec) -> RpcResult<Vec<RouteDetail>>;
    #[method(name = "withdraw_tree")]
    async fn withdraw_tree(&self, instance: String, prefix: String) -> RpcResult<bool>;
    #[method(name = "update_identifier")]
    async fn update_identifier(&self, identifier: Ipv4Addr) -> RpcResult<Ipv4Addr>;
    #[method(name = "create_instance")]
    async fn create_instance(&self, instance: InstanceSpec) -> RpcResult<InstanceSummary>;
    #[method(name = "delete_instance")]
    async fn delete_instance(&self, name: String) -> RpcResult<()>;
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InstanceSummary {
    pub name: String,
    pub index: u16,
    pub rd: String,
    pub import_targets: Vec<String>,
    pub export_targets: Vec<String>,
    pub project_manager: Option<String>,
    /// MVPN manager running for this instance
    pub managed: bool,
    pub routes: usize,
    pub tree_routes: usize,
    pub neighbors: Option<usize>,
    pub created_at: i64,
    pub uptime: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RouteDetail {
    pub table: String,
    pub prefix: String,
    /// Route type name (E.g. "spmsi-ad" or "tree")
    pub kind: String,
    pub source: String,
    pub best: bool,
    pub received_at: i64,
    pub age: String,
    pub communities: Vec<String>,
    pub pmsi_tunnel: Option<String>,
    pub source_as: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NeighborDetail {
    pub rd: String,
    pub source_as: u32,
    pub originator: Ipv4Addr,
}

/// API Input for an MVPN route to add to a routing instance
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RouteSpec {
    /// Routing instance to add the route to (E.g. "master")
    pub instance: String,
    /// MVPN route key (E.g. "3-10.1.1.1:65535,9.8.7.6,224.1.2.3,192.168.1.1")
    pub prefix: String,
    /// Route targets (E.g. "target:1:1001")
    #[serde(default = "Vec::new")]
    pub route_targets: Vec<String>,
    #[serde(default)]
    pub source_as: u32,
}

impl RouteSpec {
    pub fn new(instance: &str, prefix: &str) -> Self {
        Self {
            instance: instance.to_string(),
            prefix: prefix.to_string(),
            route_targets: vec![],
            source_as: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PmsiSpec {
    pub label: u32,
    /// Tunnel identifier, the forwarding node address
    pub identifier: Ipv4Addr,
    /// Tunnel encapsulations (E.g. "gre", "udp")
    #[serde(default = "Vec::new")]
    pub encapsulations: Vec<String>,
}

/// API Input for an ErmVpn tree route
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TreeSpec {
    pub instance: String,
    /// ErmVpn route key (E.g. "2-10.1.1.1:65535-192.168.1.1,224.1.2.3,9.8.7.6")
    pub prefix: String,
    #[serde(default = "Vec::new")]
    pub route_targets: Vec<String>,
    pub pmsi: Option<PmsiSpec>,
}

impl TreeSpec {
    pub fn new(instance: &str, prefix: &str) -> Self {
        Self {
            instance: instance.to_string(),
            prefix: prefix.to_string(),
            route_targets: vec![],
            pmsi: None,
        }
    }
}

/// API Input for a routing instance to create
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InstanceSpec {
    pub name: String,
    /// Imported and exported route targets
    #[serde(default = "Vec::new")]
    pub targets: Vec<String>,
    #[serde(default = "Vec::new")]
    pub import_targets: Vec<String>,
    #[serde(default = "Vec::new")]
    pub export_targets: Vec<String>,
    /// Defaults to the server's project manager
    pub project_manager: Option<String>,
}

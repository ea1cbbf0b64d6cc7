use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

use jsonrpsee::core::{Error, RpcResult};
use jsonrpsee::http_server::{HttpServerBuilder, HttpServerHandle};
use log::{debug, info};

use super::instances::instance_to_summary;
use super::routes::route_to_details;
use super::rpc::{ApiServer, InstanceSpec, InstanceSummary, NeighborDetail, RouteDetail};
use super::rpc::{RouteSpec, TreeSpec};
use crate::handler::Server;
use crate::mvpn::{ErmVpnPrefix, MvpnPrefix};
use crate::rib::PathSource;
use crate::server::EngineError;
use crate::utils::{parse_instance_spec, parse_route_spec, parse_tree_spec};

const TREE_KIND: &str = "ErmVpn";

fn rpc_error<E: fmt::Display>(err: E) -> Error {
    Error::Custom(err.to_string())
}

#[async_trait::async_trait]
impl ApiServer for Server {
    async fn show_instances(&self) -> RpcResult<Vec<InstanceSummary>> {
        self.call(|engine| {
            engine
                .database()
                .instances()
                .map(|instance| {
                    let managed = engine.manager(instance.name()).is_some();
                    let neighbors = engine.neighbors_count(instance.name());
                    instance_to_summary(instance, managed, neighbors)
                })
                .collect()
        })
        .await
        .map_err(rpc_error)
    }

    async fn show_routes(&self, instance: String) -> RpcResult<Vec<RouteDetail>> {
        self.call(move |engine| {
            engine
                .instance(&instance)
                .map(|i| {
                    let table = i.mvpn_table();
                    table
                        .routes()
                        .flat_map(|r| route_to_details(table.name(), &r.prefix().kind().to_string(), r))
                        .collect::<Vec<_>>()
                })
                .ok_or(EngineError::UnknownInstance(instance))
        })
        .await
        .map_err(rpc_error)?
        .map_err(rpc_error)
    }

    async fn show_tree_routes(&self, instance: String) -> RpcResult<Vec<RouteDetail>> {
        self.call(move |engine| {
            engine
                .instance(&instance)
                .map(|i| {
                    let table = i.ermvpn_table();
                    table
                        .routes()
                        .flat_map(|r| route_to_details(table.name(), TREE_KIND, r))
                        .collect::<Vec<_>>()
                })
                .ok_or(EngineError::UnknownInstance(instance))
        })
        .await
        .map_err(rpc_error)?
        .map_err(rpc_error)
    }

    async fn show_neighbors(&self, instance: String) -> RpcResult<Vec<NeighborDetail>> {
        self.call(move |engine| {
            if engine.instance(&instance).is_none() {
                return Err(EngineError::UnknownInstance(instance));
            }
            // Unmanaged instances have no neighbors
            let neighbors = engine
                .manager(&instance)
                .map(|manager| {
                    manager
                        .neighbors()
                        .map(|n| NeighborDetail {
                            rd: n.rd.to_string(),
                            source_as: n.source_as,
                            originator: n.originator,
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            Ok(neighbors)
        })
        .await
        .map_err(rpc_error)?
        .map_err(rpc_error)
    }

    async fn advertise_route(&self, route: RouteSpec) -> RpcResult<Vec<RouteDetail>> {
        let (prefix, attributes) = parse_route_spec(&route).map_err(rpc_error)?;
        debug!("Advertising {} in {}", prefix, route.instance);
        self.call(move |engine| {
            engine.add_route(&route.instance, prefix, PathSource::Api, attributes)?;
            let details = engine
                .instance(&route.instance)
                .and_then(|i| {
                    let table = i.mvpn_table();
                    table
                        .find(&prefix)
                        .map(|r| route_to_details(table.name(), &prefix.kind().to_string(), r))
                })
                .unwrap_or_default();
            Ok::<_, EngineError>(details)
        })
        .await
        .map_err(rpc_error)?
        .map_err(rpc_error)
    }

    async fn withdraw_route(&self, instance: String, prefix: String) -> RpcResult<bool> {
        let prefix: MvpnPrefix = prefix.parse().map_err(rpc_error)?;
        debug!("Withdrawing {} from {}", prefix, instance);
        self.call(move |engine| engine.delete_route(&instance, &prefix, &PathSource::Api))
            .await
            .map_err(rpc_error)?
            .map_err(rpc_error)
    }

    async fn advertise_tree(&self, tree: TreeSpec) -> RpcResult<Vec<RouteDetail>> {
        let (prefix, attributes) = parse_tree_spec(&tree).map_err(rpc_error)?;
        debug!("Advertising tree {} in {}", prefix, tree.instance);
        self.call(move |engine| {
            engine.add_tree_route(&tree.instance, prefix, PathSource::Api, attributes)?;
            let details = engine
                .instance(&tree.instance)
                .and_then(|i| {
                    let table = i.ermvpn_table();
                    table
                        .find(&prefix)
                        .map(|r| route_to_details(table.name(), TREE_KIND, r))
                })
                .unwrap_or_default();
            Ok::<_, EngineError>(details)
        })
        .await
        .map_err(rpc_error)?
        .map_err(rpc_error)
    }

    async fn withdraw_tree(&self, instance: String, prefix: String) -> RpcResult<bool> {
        let prefix: ErmVpnPrefix = prefix.parse().map_err(rpc_error)?;
        debug!("Withdrawing tree {} from {}", prefix, instance);
        self.call(move |engine| engine.delete_tree_route(&instance, &prefix, &PathSource::Api))
            .await
            .map_err(rpc_error)?
            .map_err(rpc_error)
    }

    async fn update_identifier(&self, identifier: Ipv4Addr) -> RpcResult<Ipv4Addr> {
        self.call(move |engine| {
            engine.update_identifier(identifier);
            engine.identifier()
        })
        .await
        .map_err(rpc_error)
    }

    async fn create_instance(&self, instance: InstanceSpec) -> RpcResult<InstanceSummary> {
        let config =
            parse_instance_spec(&instance, &self.default_project_manager).map_err(rpc_error)?;
        self.call(move |engine| {
            let id = engine.create_instance(&config)?;
            engine
                .database()
                .instance(id)
                .map(|i| {
                    let managed = engine.manager(i.name()).is_some();
                    instance_to_summary(i, managed, engine.neighbors_count(i.name()))
                })
                .ok_or(EngineError::UnknownInstance(config.name))
        })
        .await
        .map_err(rpc_error)?
        .map_err(rpc_error)
    }

    async fn delete_instance(&self, name: String) -> RpcResult<()> {
        self.call(move |engine| engine.delete_instance(&name))
            .await
            .map_err(rpc_error)?
            .map_err(rpc_error)
    }
}

impl Server {
    /// Start the JSON-RPC API, it runs until the returned handle is stopped
    pub fn serve_rpc_api(&self, socket: SocketAddr) -> Result<HttpServerHandle, Error> {
        info!("Starting JSON-RPC server on {}...", socket);
        HttpServerBuilder::default()
            .build(socket)?
            .start(self.clone().into_rpc())
    }
}

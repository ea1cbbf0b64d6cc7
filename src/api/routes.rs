use std::fmt::Display;
use std::sync::Arc;

use crate::api::rpc::RouteDetail;
use crate::rib::{Path, Route};
use crate::utils::format_time_as_elapsed;

fn path_to_detail<P: Display>(table: &str, kind: &str, prefix: &P, path: &Arc<Path>, best: bool) -> RouteDetail {
    let attrs = path.attrs();
    RouteDetail {
        table: table.to_string(),
        prefix: prefix.to_string(),
        kind: kind.to_string(),
        source: path.source().to_string(),
        best,
        received_at: path.timestamp().timestamp(),
        age: format_time_as_elapsed(path.timestamp()),
        communities: attrs
            .communities
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
        pmsi_tunnel: attrs.pmsi_tunnel.map(|t| t.to_string()),
        source_as: attrs.source_as,
    }
}

/// One detail row per path, best path first
pub fn route_to_details<P: Display>(table: &str, kind: &str, route: &Route<P>) -> Vec<RouteDetail> {
    route
        .paths()
        .iter()
        .enumerate()
        .map(|(i, path)| path_to_detail(table, kind, route.prefix(), path, i == 0))
        .collect()
}

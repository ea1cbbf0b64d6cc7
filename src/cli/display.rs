use itertools::Itertools;
use prettytable::{cell, row, Row};

use super::table::ToRow;
use crate::api::rpc::{InstanceSummary, NeighborDetail, RouteDetail};
use crate::utils::maybe_string;

pub struct InstanceSummaryRow(pub InstanceSummary);

impl ToRow for InstanceSummaryRow {
    fn columns() -> Row {
        row![
            "Instance",
            "Index",
            "RD",
            "Project Manager",
            "Managed",
            "Routes",
            "Trees",
            "Neighbors",
            "Uptime"
        ]
    }

    fn to_row(&self) -> Row {
        let instance = &self.0;
        row![
            instance.name,
            instance.index,
            instance.rd,
            maybe_string(instance.project_manager.as_ref()),
            if instance.managed { "yes" } else { "no" },
            instance.routes,
            instance.tree_routes,
            maybe_string(instance.neighbors.as_ref()),
            instance.uptime,
        ]
    }
}

pub struct RouteDetailRow(pub RouteDetail);

impl ToRow for RouteDetailRow {
    fn columns() -> Row {
        row![
            "",
            "Kind",
            "Prefix",
            "Source",
            "Age",
            "Source AS",
            "Communities",
            "PMSI Tunnel"
        ]
    }

    fn to_row(&self) -> Row {
        let route = &self.0;
        row![
            if route.best { "*" } else { "" },
            route.kind,
            route.prefix,
            route.source,
            route.age,
            route.source_as,
            route.communities.iter().join(" "),
            maybe_string(route.pmsi_tunnel.as_ref()),
        ]
    }
}

pub struct NeighborDetailRow(pub NeighborDetail);

impl ToRow for NeighborDetailRow {
    fn columns() -> Row {
        row!["RD", "Originator", "Source AS"]
    }

    fn to_row(&self) -> Row {
        let neighbor = &self.0;
        row![neighbor.rd, neighbor.originator, neighbor.source_as]
    }
}

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::rib::{EncapType, RouteDistinguisher, TunnelType};

/// A (source, group) multicast flow
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SG {
    pub source: Ipv4Addr,
    pub group: Ipv4Addr,
}

impl SG {
    pub fn new(source: Ipv4Addr, group: Ipv4Addr) -> Self {
        Self { source, group }
    }
}

impl fmt::Display for SG {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.source, self.group)
    }
}

/// Remote PE discovered through a Type 1 AD route
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct MvpnNeighbor {
    pub rd: RouteDistinguisher,
    pub source_as: u32,
    pub originator: Ipv4Addr,
}

impl fmt::Display for MvpnNeighbor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<MvpnNeighbor rd={} as={} originator={}>",
            self.rd, self.source_as, self.originator
        )
    }
}

/// Forwarding information for an (S,G) tree, as built by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmsiInfo {
    pub label: u32,
    pub tunnel_identifier: Ipv4Addr,
    pub tunnel_type: TunnelType,
    pub encapsulations: Vec<EncapType>,
}

#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MvpnRouteKind {
    /// Type 1, Intra-AS I-PMSI Auto-Discovery
    Ad,
    /// Type 2, Inter-AS I-PMSI Auto-Discovery
    InterAsAd,
    /// Type 3, Selective PMSI Auto-Discovery
    Spmsi,
    /// Type 4, Leaf Auto-Discovery
    LeafAd,
    /// Type 5, Source Active Auto-Discovery
    SaActive,
    /// Type 6, Shared Tree Join
    SharedTreeJoin,
    /// Type 7, Source Tree Join
    Join,
}

impl MvpnRouteKind {
    pub fn route_type(self) -> u8 {
        match self {
            MvpnRouteKind::Ad => 1,
            MvpnRouteKind::InterAsAd => 2,
            MvpnRouteKind::Spmsi => 3,
            MvpnRouteKind::LeafAd => 4,
            MvpnRouteKind::SaActive => 5,
            MvpnRouteKind::SharedTreeJoin => 6,
            MvpnRouteKind::Join => 7,
        }
    }
}

impl fmt::Display for MvpnRouteKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            MvpnRouteKind::Ad => "AD",
            MvpnRouteKind::InterAsAd => "Inter-AS AD",
            MvpnRouteKind::Spmsi => "S-PMSI",
            MvpnRouteKind::LeafAd => "Leaf-AD",
            MvpnRouteKind::SaActive => "Source-Active",
            MvpnRouteKind::SharedTreeJoin => "Shared-Tree-Join",
            MvpnRouteKind::Join => "Join",
        };
        write!(f, "{}", word)
    }
}

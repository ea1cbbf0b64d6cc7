use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::rib::{EncapType, ExtCommunity, ExtCommunityList, RouteTarget};

/// PMSI tunnel types (RFC 6514 section 5)
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TunnelType {
    RsvpTeP2mp = 1,
    MldpP2mp = 2,
    PimSsm = 3,
    PimSm = 4,
    BidirPim = 5,
    IngressReplication = 6,
    MldpMp2mp = 7,
}

impl fmt::Display for TunnelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TunnelType::*;
        let word = match self {
            RsvpTeP2mp => "rsvp-te-p2mp",
            MldpP2mp => "mldp-p2mp",
            PimSsm => "pim-ssm",
            PimSm => "pim-sm",
            BidirPim => "bidir-pim",
            IngressReplication => "ingress-replication",
            MldpMp2mp => "mldp-mp2mp",
        };
        write!(f, "{}", word)
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PmsiTunnel {
    pub tunnel_type: TunnelType,
    pub label: u32,
    pub identifier: Ipv4Addr,
}

impl fmt::Display for PmsiTunnel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} label={} id={}",
            self.tunnel_type, self.label, self.identifier
        )
    }
}

/// Path attributes relevant to MVPN/ErmVpn routes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathAttributes {
    pub communities: ExtCommunityList,
    pub pmsi_tunnel: Option<PmsiTunnel>,
    pub source_as: u32,
}

impl PathAttributes {
    pub fn with_targets(targets: &[RouteTarget]) -> Self {
        Self {
            communities: ExtCommunityList::new(
                targets.iter().map(|t| ExtCommunity::RouteTarget(*t)).collect(),
            ),
            ..Default::default()
        }
    }

    pub fn route_targets(&self) -> Vec<RouteTarget> {
        self.communities.route_targets()
    }

    pub fn tunnel_encaps(&self) -> Vec<EncapType> {
        self.communities.tunnel_encaps()
    }
}

/// Interns PathAttributes so equal sets share one allocation
///
/// Paths compare attributes by pointer after locating them here,
/// an unchanged attribute set always resolves to the same `Arc`.
#[derive(Debug, Default)]
pub struct PathAttributeCache(HashSet<Arc<PathAttributes>>);

impl PathAttributeCache {
    pub fn with_capacity(size: usize) -> Self {
        Self(HashSet::with_capacity(size))
    }

    pub fn locate(&mut self, attrs: PathAttributes) -> Arc<PathAttributes> {
        if let Some(existing) = self.0.get(&attrs) {
            return existing.clone();
        }
        let attrs = Arc::new(attrs);
        self.0.insert(attrs.clone());
        attrs
    }

    /// Cleanup attribute sets no longer referenced by any path
    pub fn purge(&mut self) -> usize {
        let before = self.0.len();
        self.0.retain(|attrs| Arc::strong_count(attrs) > 1);
        before - self.0.len()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

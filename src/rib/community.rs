use std::fmt;
use std::net::Ipv4Addr;
use std::slice::Iter;
use std::str::FromStr;

use itertools::Itertools;
use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

use crate::utils::{ipv4_from_str, number_from_str, split_admin_assigned, ParseError};

/// BGP Route Target extended community
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteTarget {
    As { asn: u32, assigned: u32 },
    Ip { address: Ipv4Addr, assigned: u16 },
}

impl RouteTarget {
    pub fn from_address(address: Ipv4Addr, assigned: u16) -> Self {
        RouteTarget::Ip { address, assigned }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouteTarget::As { asn, assigned } => write!(f, "target:{}:{}", asn, assigned),
            RouteTarget::Ip { address, assigned } => write!(f, "target:{}:{}", address, assigned),
        }
    }
}

impl FromStr for RouteTarget {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let rest = value
            .strip_prefix("target:")
            .ok_or_else(|| ParseError::new(format!("Not a route target: '{}'", value)))?;
        let (admin, assigned) = split_admin_assigned(rest, "route target")?;
        if admin.contains('.') {
            Ok(RouteTarget::Ip {
                address: ipv4_from_str(admin, "route target address")?,
                assigned: number_from_str(assigned, "route target value")?,
            })
        } else {
            Ok(RouteTarget::As {
                asn: number_from_str(admin, "route target ASN")?,
                assigned: number_from_str(assigned, "route target value")?,
            })
        }
    }
}

impl Serialize for RouteTarget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RouteTarget {
    fn deserialize<D>(deserializer: D) -> Result<RouteTarget, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Tunnel encapsulation advertised in the tunnel-encap extended community
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EncapType {
    Gre,
    Udp,
    Vxlan,
    Mpls,
}

impl fmt::Display for EncapType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            EncapType::Gre => "gre",
            EncapType::Udp => "udp",
            EncapType::Vxlan => "vxlan",
            EncapType::Mpls => "mpls",
        };
        write!(f, "{}", word)
    }
}

impl FromStr for EncapType {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "gre" => Ok(EncapType::Gre),
            "udp" => Ok(EncapType::Udp),
            "vxlan" => Ok(EncapType::Vxlan),
            "mpls" => Ok(EncapType::Mpls),
            _ => Err(ParseError::new(format!(
                "Unsupported encapsulation: '{}'",
                value
            ))),
        }
    }
}

impl Serialize for EncapType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EncapType {
    fn deserialize<D>(deserializer: D) -> Result<EncapType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtCommunity {
    RouteTarget(RouteTarget),
    TunnelEncap(EncapType),
}

impl fmt::Display for ExtCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtCommunity::RouteTarget(target) => write!(f, "{}", target),
            ExtCommunity::TunnelEncap(encap) => write!(f, "encapsulation:{}", encap),
        }
    }
}

impl FromStr for ExtCommunity {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Some(encap) = value.strip_prefix("encapsulation:") {
            return Ok(ExtCommunity::TunnelEncap(encap.parse()?));
        }
        Ok(ExtCommunity::RouteTarget(value.parse()?))
    }
}

impl Serialize for ExtCommunity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Ordered, de-duplicated set of extended communities
/// Kept sorted so equal sets compare (and hash) equal
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtCommunityList(Vec<ExtCommunity>);

impl ExtCommunityList {
    pub fn new(communities: Vec<ExtCommunity>) -> Self {
        let mut communities = communities;
        communities.sort();
        communities.dedup();
        Self(communities)
    }

    pub fn iter(&self) -> Iter<ExtCommunity> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn route_targets(&self) -> Vec<RouteTarget> {
        self.0
            .iter()
            .filter_map(|c| {
                if let ExtCommunity::RouteTarget(target) = c {
                    Some(*target)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn tunnel_encaps(&self) -> Vec<EncapType> {
        self.0
            .iter()
            .filter_map(|c| {
                if let ExtCommunity::TunnelEncap(encap) = c {
                    Some(*encap)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Union with additional route targets
    pub fn with_route_targets(&self, targets: &[RouteTarget]) -> Self {
        Self::new(
            self.0
                .iter()
                .cloned()
                .chain(targets.iter().map(|t| ExtCommunity::RouteTarget(*t)))
                .collect(),
        )
    }
}

impl fmt::Display for ExtCommunityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

use super::{MvpnRouteKind, SG};
use crate::rib::RouteDistinguisher;
use crate::utils::{ipv4_from_str, number_from_str, ParseError};

/// MVPN NLRI key
///
/// Text forms:
///   1-<rd>,<originator>
///   2-<rd>,<asn>
///   3-<rd>,<source>,<group>,<originator>
///   4-<type 3 or type 2 prefix>,<originator>
///   5-<rd>,<source>,<group>
///   6-<rd>,<asn>,<source>,<group>
///   7-<rd>,<asn>,<source>,<group>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MvpnPrefix {
    Ad {
        rd: RouteDistinguisher,
        originator: Ipv4Addr,
    },
    InterAsAd {
        rd: RouteDistinguisher,
        asn: u32,
    },
    Spmsi {
        rd: RouteDistinguisher,
        sg: SG,
        originator: Ipv4Addr,
    },
    LeafAd {
        parent: LeafAdParent,
        originator: Ipv4Addr,
    },
    SourceActive {
        rd: RouteDistinguisher,
        sg: SG,
    },
    SharedTreeJoin {
        rd: RouteDistinguisher,
        asn: u32,
        sg: SG,
    },
    Join {
        rd: RouteDistinguisher,
        asn: u32,
        sg: SG,
    },
}

/// Route a Leaf-AD answers, embedded in the Leaf-AD key
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeafAdParent {
    InterAsAd {
        rd: RouteDistinguisher,
        asn: u32,
    },
    Spmsi {
        rd: RouteDistinguisher,
        sg: SG,
        originator: Ipv4Addr,
    },
}

impl From<LeafAdParent> for MvpnPrefix {
    fn from(parent: LeafAdParent) -> Self {
        match parent {
            LeafAdParent::InterAsAd { rd, asn } => MvpnPrefix::InterAsAd { rd, asn },
            LeafAdParent::Spmsi { rd, sg, originator } => MvpnPrefix::Spmsi { rd, sg, originator },
        }
    }
}

impl MvpnPrefix {
    pub fn kind(&self) -> MvpnRouteKind {
        match self {
            MvpnPrefix::Ad { .. } => MvpnRouteKind::Ad,
            MvpnPrefix::InterAsAd { .. } => MvpnRouteKind::InterAsAd,
            MvpnPrefix::Spmsi { .. } => MvpnRouteKind::Spmsi,
            MvpnPrefix::LeafAd { .. } => MvpnRouteKind::LeafAd,
            MvpnPrefix::SourceActive { .. } => MvpnRouteKind::SaActive,
            MvpnPrefix::SharedTreeJoin { .. } => MvpnRouteKind::SharedTreeJoin,
            MvpnPrefix::Join { .. } => MvpnRouteKind::Join,
        }
    }

    pub fn rd(&self) -> RouteDistinguisher {
        match self {
            MvpnPrefix::Ad { rd, .. }
            | MvpnPrefix::InterAsAd { rd, .. }
            | MvpnPrefix::Spmsi { rd, .. }
            | MvpnPrefix::SourceActive { rd, .. }
            | MvpnPrefix::SharedTreeJoin { rd, .. }
            | MvpnPrefix::Join { rd, .. } => *rd,
            MvpnPrefix::LeafAd { parent, .. } => MvpnPrefix::from(*parent).rd(),
        }
    }

    pub fn sg(&self) -> Option<SG> {
        match self {
            MvpnPrefix::Ad { .. } | MvpnPrefix::InterAsAd { .. } => None,
            MvpnPrefix::Spmsi { sg, .. }
            | MvpnPrefix::SourceActive { sg, .. }
            | MvpnPrefix::SharedTreeJoin { sg, .. }
            | MvpnPrefix::Join { sg, .. } => Some(*sg),
            MvpnPrefix::LeafAd { parent, .. } => MvpnPrefix::from(*parent).sg(),
        }
    }

    pub fn originator(&self) -> Option<Ipv4Addr> {
        match self {
            MvpnPrefix::Ad { originator, .. }
            | MvpnPrefix::Spmsi { originator, .. }
            | MvpnPrefix::LeafAd { originator, .. } => Some(*originator),
            MvpnPrefix::InterAsAd { .. }
            | MvpnPrefix::SourceActive { .. }
            | MvpnPrefix::SharedTreeJoin { .. }
            | MvpnPrefix::Join { .. } => None,
        }
    }

    /// Leaf-AD key answering this S-PMSI or Inter-AS AD route
    pub fn leaf_ad(&self, originator: Ipv4Addr) -> Option<MvpnPrefix> {
        let parent = match *self {
            MvpnPrefix::Spmsi {
                rd,
                sg,
                originator: spmsi_originator,
            } => LeafAdParent::Spmsi {
                rd,
                sg,
                originator: spmsi_originator,
            },
            MvpnPrefix::InterAsAd { rd, asn } => LeafAdParent::InterAsAd { rd, asn },
            _ => return None,
        };
        Some(MvpnPrefix::LeafAd { parent, originator })
    }

    /// Key of the route a Leaf-AD route answers (S-PMSI or Inter-AS AD)
    pub fn spmsi(&self) -> Option<MvpnPrefix> {
        match *self {
            MvpnPrefix::LeafAd { parent, .. } => Some(parent.into()),
            _ => None,
        }
    }
}

impl fmt::Display for MvpnPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MvpnPrefix::Ad { rd, originator } => write!(f, "1-{},{}", rd, originator),
            MvpnPrefix::InterAsAd { rd, asn } => write!(f, "2-{},{}", rd, asn),
            MvpnPrefix::Spmsi { rd, sg, originator } => {
                write!(f, "3-{},{},{},{}", rd, sg.source, sg.group, originator)
            }
            MvpnPrefix::LeafAd { parent, originator } => {
                write!(f, "4-{},{}", MvpnPrefix::from(*parent), originator)
            }
            MvpnPrefix::SourceActive { rd, sg } => {
                write!(f, "5-{},{},{}", rd, sg.source, sg.group)
            }
            MvpnPrefix::SharedTreeJoin { rd, asn, sg } => {
                write!(f, "6-{},{},{},{}", rd, asn, sg.source, sg.group)
            }
            MvpnPrefix::Join { rd, asn, sg } => {
                write!(f, "7-{},{},{},{}", rd, asn, sg.source, sg.group)
            }
        }
    }
}

/// Split `value` into exactly `count` comma separated fields
fn fields<'a>(value: &'a str, count: usize, kind: &str) -> Result<Vec<&'a str>, ParseError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != count {
        return Err(ParseError::new(format!(
            "{} route expects {} fields: '{}'",
            kind, count, value
        )));
    }
    Ok(parts)
}

/// Split `<type>-<rest>`
fn route_type(value: &str) -> Result<(&str, &str), ParseError> {
    value
        .split_once('-')
        .ok_or_else(|| ParseError::new(format!("Missing MVPN route type: '{}'", value)))
}

fn sg_from_strs(source: &str, group: &str) -> Result<SG, ParseError> {
    Ok(SG::new(
        ipv4_from_str(source, "source")?,
        ipv4_from_str(group, "group")?,
    ))
}

fn parse_inter_as_ad(rest: &str) -> Result<(RouteDistinguisher, u32), ParseError> {
    let parts = fields(rest, 2, "Inter-AS AD")?;
    Ok((parts[0].parse()?, number_from_str(parts[1], "asn")?))
}

fn parse_spmsi(rest: &str) -> Result<(RouteDistinguisher, SG, Ipv4Addr), ParseError> {
    let parts = fields(rest, 4, "S-PMSI")?;
    Ok((
        parts[0].parse()?,
        sg_from_strs(parts[1], parts[2])?,
        ipv4_from_str(parts[3], "originator")?,
    ))
}

/// `<rd>,<asn>,<source>,<group>`, shared by both C-multicast join types
fn parse_join(rest: &str, kind: &str) -> Result<(RouteDistinguisher, u32, SG), ParseError> {
    let parts = fields(rest, 4, kind)?;
    Ok((
        parts[0].parse()?,
        number_from_str(parts[1], "asn")?,
        sg_from_strs(parts[2], parts[3])?,
    ))
}

/// Parse the key embedded in a Leaf-AD route. Only types 3 and 2 are
/// accepted, so a Leaf-AD never nests inside another.
fn parse_leaf_ad_parent(value: &str) -> Result<LeafAdParent, ParseError> {
    let (kind, rest) = route_type(value)?;
    match kind {
        "3" => {
            let (rd, sg, originator) = parse_spmsi(rest)?;
            Ok(LeafAdParent::Spmsi { rd, sg, originator })
        }
        "2" => {
            let (rd, asn) = parse_inter_as_ad(rest)?;
            Ok(LeafAdParent::InterAsAd { rd, asn })
        }
        _ => Err(ParseError::new(format!(
            "Leaf-AD route must reference an S-PMSI or Inter-AS AD route: '{}'",
            value
        ))),
    }
}

impl FromStr for MvpnPrefix {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let (kind, rest) = route_type(value)?;
        match kind {
            "1" => {
                let parts = fields(rest, 2, "AD")?;
                Ok(MvpnPrefix::Ad {
                    rd: parts[0].parse()?,
                    originator: ipv4_from_str(parts[1], "originator")?,
                })
            }
            "2" => {
                let (rd, asn) = parse_inter_as_ad(rest)?;
                Ok(MvpnPrefix::InterAsAd { rd, asn })
            }
            "3" => {
                let (rd, sg, originator) = parse_spmsi(rest)?;
                Ok(MvpnPrefix::Spmsi { rd, sg, originator })
            }
            "4" => {
                let (parent, originator) = rest.rsplit_once(',').ok_or_else(|| {
                    ParseError::new(format!("Leaf-AD route missing originator: '{}'", value))
                })?;
                Ok(MvpnPrefix::LeafAd {
                    parent: parse_leaf_ad_parent(parent)?,
                    originator: ipv4_from_str(originator, "originator")?,
                })
            }
            "5" => {
                let parts = fields(rest, 3, "Source-Active")?;
                Ok(MvpnPrefix::SourceActive {
                    rd: parts[0].parse()?,
                    sg: sg_from_strs(parts[1], parts[2])?,
                })
            }
            "6" => {
                let (rd, asn, sg) = parse_join(rest, "Shared Tree Join")?;
                Ok(MvpnPrefix::SharedTreeJoin { rd, asn, sg })
            }
            "7" => {
                let (rd, asn, sg) = parse_join(rest, "Join")?;
                Ok(MvpnPrefix::Join { rd, asn, sg })
            }
            _ => Err(ParseError::new(format!("Invalid MVPN route type '{}'", kind))),
        }
    }
}

impl Serialize for MvpnPrefix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MvpnPrefix {
    fn deserialize<D>(deserializer: D) -> Result<MvpnPrefix, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErmVpnRouteType {
    Native = 0,
    LocalTree = 1,
    GlobalTree = 2,
}

/// ErmVpn (transport tree) route key
///
/// Text form: <type>-<rd>-<router-id>,<group>,<source>
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErmVpnPrefix {
    pub route_type: ErmVpnRouteType,
    pub rd: RouteDistinguisher,
    pub router_id: Ipv4Addr,
    pub group: Ipv4Addr,
    pub source: Ipv4Addr,
}

impl ErmVpnPrefix {
    pub fn sg(&self) -> SG {
        SG::new(self.source, self.group)
    }

    pub fn is_global_tree(&self) -> bool {
        self.route_type == ErmVpnRouteType::GlobalTree
    }
}

impl fmt::Display for ErmVpnPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{}-{},{},{}",
            self.route_type as u8, self.rd, self.router_id, self.group, self.source
        )
    }
}

impl FromStr for ErmVpnPrefix {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let invalid = || ParseError::new(format!("Invalid ErmVpn prefix: '{}'", value));
        let (route_type, rest) = value.split_once('-').ok_or_else(invalid)?;
        let (rd, rest) = rest.split_once('-').ok_or_else(invalid)?;
        let route_type = match route_type {
            "0" => ErmVpnRouteType::Native,
            "1" => ErmVpnRouteType::LocalTree,
            "2" => ErmVpnRouteType::GlobalTree,
            _ => {
                return Err(ParseError::new(format!(
                    "Invalid ErmVpn route type '{}'",
                    route_type
                )))
            }
        };
        let parts = fields(rest, 3, "ErmVpn")?;
        Ok(ErmVpnPrefix {
            route_type,
            rd: rd.parse()?,
            router_id: ipv4_from_str(parts[0], "router-id")?,
            group: ipv4_from_str(parts[1], "group")?,
            source: ipv4_from_str(parts[2], "source")?,
        })
    }
}

impl Serialize for ErmVpnPrefix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ErmVpnPrefix {
    fn deserialize<D>(deserializer: D) -> Result<ErmVpnPrefix, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

use std::error::Error;
use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::api::rpc::{InstanceSpec, RouteSpec, TreeSpec};
use crate::config::InstanceConfig;
use crate::mvpn::{ErmVpnPrefix, MvpnPrefix};
use crate::rib::{EncapType, ExtCommunity, ExtCommunityList, PathAttributes, PmsiTunnel};
use crate::rib::{RouteTarget, TunnelType};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub fn new(reason: String) -> Self {
        ParseError { reason }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError: {}", self.reason)
    }
}

impl Error for ParseError {
    fn description(&self) -> &str {
        "Error parsing MVPN route keys or attributes"
    }
}

impl From<ParseError> for io::Error {
    fn from(error: ParseError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, error.reason)
    }
}

/// Parse a dotted-quad, reporting which field failed
pub fn ipv4_from_str(value: &str, field: &str) -> Result<Ipv4Addr, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|err| ParseError::new(format!("Invalid {} '{}': {}", field, value, err)))
}

pub fn number_from_str<T>(value: &str, field: &str) -> Result<T, ParseError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| ParseError::new(format!("Invalid {} '{}': {}", field, value, err)))
}

/// Split "<administrator>:<assigned>" on the last ':'
/// E.g. "10.1.1.1:65535" -> ("10.1.1.1", "65535")
pub fn split_admin_assigned<'a>(value: &'a str, field: &str) -> Result<(&'a str, &'a str), ParseError> {
    value
        .rfind(':')
        .map(|i| (&value[..i], &value[i + 1..]))
        .filter(|(admin, assigned)| !admin.is_empty() && !assigned.is_empty())
        .ok_or_else(|| ParseError::new(format!("Not a valid {}: '{}'", field, value)))
}

fn route_targets_from_strs(values: &[String]) -> Result<Vec<RouteTarget>, ParseError> {
    values.iter().map(|v| v.trim().parse()).collect()
}

/// Build a route key and attributes from API input
pub fn parse_route_spec(spec: &RouteSpec) -> Result<(MvpnPrefix, PathAttributes), ParseError> {
    let prefix: MvpnPrefix = spec.prefix.parse()?;
    let targets = route_targets_from_strs(&spec.route_targets)?;
    let mut attributes = PathAttributes::with_targets(&targets);
    attributes.source_as = spec.source_as;
    Ok((prefix, attributes))
}

/// Build a tree route key and attributes from API input
///
/// The PMSI tunnel is always ingress replication, its encapsulations are
/// carried as extended communities.
pub fn parse_tree_spec(spec: &TreeSpec) -> Result<(ErmVpnPrefix, PathAttributes), ParseError> {
    let prefix: ErmVpnPrefix = spec.prefix.parse()?;
    let mut communities: Vec<ExtCommunity> = route_targets_from_strs(&spec.route_targets)?
        .into_iter()
        .map(ExtCommunity::RouteTarget)
        .collect();
    let pmsi_tunnel = match &spec.pmsi {
        Some(pmsi) => {
            for encap in pmsi.encapsulations.iter() {
                let encap: EncapType = encap.trim().parse()?;
                communities.push(ExtCommunity::TunnelEncap(encap));
            }
            Some(PmsiTunnel {
                tunnel_type: TunnelType::IngressReplication,
                label: pmsi.label,
                identifier: pmsi.identifier,
            })
        }
        None => None,
    };
    let attributes = PathAttributes {
        communities: ExtCommunityList::new(communities),
        pmsi_tunnel,
        ..Default::default()
    };
    Ok((prefix, attributes))
}

pub fn parse_instance_spec(
    spec: &InstanceSpec,
    project_manager: &str,
) -> Result<InstanceConfig, ParseError> {
    if spec.name.trim().is_empty() {
        return Err(ParseError::new("Routing instance name is empty".to_string()));
    }
    let project_manager = spec.project_manager.as_deref().unwrap_or(project_manager);
    let config = InstanceConfig::new(spec.name.trim(), project_manager);
    let config = route_targets_from_strs(&spec.targets)?
        .into_iter()
        .fold(config, |c, t| c.target(t));
    let config = route_targets_from_strs(&spec.import_targets)?
        .into_iter()
        .fold(config, |c, t| c.import_target(t));
    let config = route_targets_from_strs(&spec.export_targets)?
        .into_iter()
        .fold(config, |c, t| c.export_target(t));
    Ok(config)
}

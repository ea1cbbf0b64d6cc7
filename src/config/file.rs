use std::fs::File;
use std::io::{self, Read};
use std::net::Ipv4Addr;

use serde::{self, Deserialize};
use toml;

use crate::rib::RouteTarget;

struct Defaults {}

impl Defaults {
    fn project_manager() -> String {
        "default-domain:default-project:ip-fabric:ip-fabric".to_string()
    }
}

/// Config (toml) representation of a routing instance
#[derive(Clone, Debug, Deserialize)]
pub(super) struct InstanceConfigSpec {
    pub(super) name: String,
    // Imported and exported
    #[serde(default = "Vec::new")]
    pub(super) targets: Vec<RouteTarget>,
    #[serde(default = "Vec::new")]
    pub(super) import_targets: Vec<RouteTarget>,
    #[serde(default = "Vec::new")]
    pub(super) export_targets: Vec<RouteTarget>,
    // Will defer to server config if not provided
    pub(super) project_manager: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServerConfigSpec {
    // BGP identifier, 0.0.0.0 disables route origination
    pub(super) router_id: Ipv4Addr,
    // Used for instance RDs and VRF import targets, defaults to router_id
    pub(super) address: Option<Ipv4Addr>,
    // Instance that coordinates multicast trees for the others
    #[serde(default = "Defaults::project_manager")]
    pub(super) project_manager: String,
    #[serde(default = "Vec::new")]
    pub(super) instances: Vec<InstanceConfigSpec>,
}

impl ServerConfigSpec {
    pub(super) fn from_file(path: &str) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_toml(&contents)
    }

    pub(super) fn from_toml(contents: &str) -> io::Result<Self> {
        toml::from_str(contents).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

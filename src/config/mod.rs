mod file;

use std::io::Result;
use std::net::Ipv4Addr;

use crate::rib::RouteTarget;

/// Parse a TOML config file and return a ServerConfig
pub fn from_file(path: &str) -> Result<ServerConfig> {
    let spec = file::ServerConfigSpec::from_file(path)?;
    Ok(ServerConfig::from_spec(spec))
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub router_id: Ipv4Addr,
    pub address: Ipv4Addr,
    pub project_manager: String,
    pub instances: Vec<InstanceConfig>,
}

/// In-Memory Server representation of a routing instance config
///   Has missing InstanceConfigSpec items defaulted to Server values
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceConfig {
    pub name: String,
    pub import_targets: Vec<RouteTarget>,
    pub export_targets: Vec<RouteTarget>,
    pub project_manager: String,
}

impl InstanceConfig {
    pub fn new(name: &str, project_manager: &str) -> Self {
        Self {
            name: name.to_string(),
            import_targets: vec![],
            export_targets: vec![],
            project_manager: project_manager.to_string(),
        }
    }

    /// Import and export `target`
    pub fn target(self, target: RouteTarget) -> Self {
        self.import_target(target).export_target(target)
    }

    pub fn import_target(mut self, target: RouteTarget) -> Self {
        if !self.import_targets.contains(&target) {
            self.import_targets.push(target);
        }
        self
    }

    pub fn export_target(mut self, target: RouteTarget) -> Self {
        if !self.export_targets.contains(&target) {
            self.export_targets.push(target);
        }
        self
    }
}

impl ServerConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let spec = file::ServerConfigSpec::from_toml(contents)?;
        Ok(Self::from_spec(spec))
    }

    fn from_spec(spec: file::ServerConfigSpec) -> Self {
        let instances: Vec<_> = spec
            .instances
            .iter()
            .map(|i| {
                let project_manager = i
                    .project_manager
                    .as_deref()
                    .unwrap_or_else(|| spec.project_manager.as_str());
                let config = InstanceConfig::new(&i.name, project_manager);
                let config = i.targets.iter().fold(config, |c, t| c.target(*t));
                let config = i
                    .import_targets
                    .iter()
                    .fold(config, |c, t| c.import_target(*t));
                i.export_targets
                    .iter()
                    .fold(config, |c, t| c.export_target(*t))
            })
            .collect();

        Self {
            router_id: spec.router_id,
            address: spec.address.unwrap_or(spec.router_id),
            project_manager: spec.project_manager,
            instances,
        }
    }
}

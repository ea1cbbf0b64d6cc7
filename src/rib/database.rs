use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::Serialize;

use super::{ErmVpnTable, MvpnTable, PathAttributeCache, PathAttributes, PathSource};
use super::{RouteDistinguisher, RouteTarget, Table};
use crate::config::InstanceConfig;
use crate::mvpn::{ErmVpnPrefix, MvpnPrefix};
use crate::server::EngineError;

pub const MASTER_INSTANCE: &str = "master";

/// Index of a routing instance in the database arena
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u16);

impl InstanceId {
    pub const MASTER: InstanceId = InstanceId(0);

    pub fn index(self) -> u16 {
        self.0
    }

    pub fn is_master(self) -> bool {
        self == Self::MASTER
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Change to a route that listeners must be told about
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    Mvpn {
        instance: InstanceId,
        prefix: MvpnPrefix,
    },
    ErmVpn {
        instance: InstanceId,
        prefix: ErmVpnPrefix,
    },
}

#[derive(Debug)]
pub struct RoutingInstance {
    id: InstanceId,
    name: String,
    rd: RouteDistinguisher,
    import_targets: BTreeSet<RouteTarget>,
    export_targets: BTreeSet<RouteTarget>,
    project_manager: Option<String>,
    pub(crate) mvpn: MvpnTable,
    pub(crate) ermvpn: ErmVpnTable,
    created: DateTime<Utc>,
}

impl RoutingInstance {
    fn master(address: Ipv4Addr) -> Self {
        Self {
            id: InstanceId::MASTER,
            name: MASTER_INSTANCE.to_string(),
            rd: RouteDistinguisher::from_address(address, 0),
            import_targets: BTreeSet::new(),
            export_targets: BTreeSet::new(),
            project_manager: None,
            mvpn: Table::new("bgp.mvpn.0"),
            ermvpn: ErmVpnTable::new("bgp.ermvpn.0"),
            created: Utc::now(),
        }
    }

    fn from_config(id: InstanceId, address: Ipv4Addr, config: &InstanceConfig) -> Self {
        let mut import_targets: BTreeSet<RouteTarget> =
            config.import_targets.iter().cloned().collect();
        // VRF import target, lets remote PEs aim routes at this instance
        import_targets.insert(RouteTarget::from_address(address, id.index()));
        Self {
            id,
            name: config.name.clone(),
            rd: RouteDistinguisher::from_address(address, id.index()),
            import_targets,
            export_targets: config.export_targets.iter().cloned().collect(),
            project_manager: Some(config.project_manager.clone()),
            mvpn: Table::new(format!("{}.mvpn.0", config.name)),
            ermvpn: ErmVpnTable::new(format!("{}.ermvpn.0", config.name)),
            created: Utc::now(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rd(&self) -> RouteDistinguisher {
        self.rd
    }

    pub fn import_targets(&self) -> &BTreeSet<RouteTarget> {
        &self.import_targets
    }

    pub fn export_targets(&self) -> &BTreeSet<RouteTarget> {
        &self.export_targets
    }

    pub fn project_manager(&self) -> Option<&str> {
        self.project_manager.as_deref()
    }

    pub fn mvpn_table(&self) -> &MvpnTable {
        &self.mvpn
    }

    pub fn ermvpn_table(&self) -> &ErmVpnTable {
        &self.ermvpn
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Does a path carrying `targets` belong in this instance
    pub fn imports_any(&self, targets: &[RouteTarget]) -> bool {
        targets.iter().any(|t| self.import_targets.contains(t))
    }
}

/// Arena of routing instances and the change events their tables produce
#[derive(Debug)]
pub struct Database {
    address: Ipv4Addr,
    instances: Vec<Option<RoutingInstance>>,
    names: HashMap<String, InstanceId>,
    attributes: PathAttributeCache,
    events: VecDeque<TableEvent>,
}

impl Database {
    pub fn new(address: Ipv4Addr) -> Self {
        let mut names = HashMap::new();
        names.insert(MASTER_INSTANCE.to_string(), InstanceId::MASTER);
        Self {
            address,
            instances: vec![Some(RoutingInstance::master(address))],
            names,
            attributes: PathAttributeCache::with_capacity(64),
            events: VecDeque::new(),
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Create an instance at the lowest free index
    pub fn create_instance(&mut self, config: &InstanceConfig) -> Result<InstanceId, EngineError> {
        if self.names.contains_key(&config.name) {
            return Err(EngineError::DuplicateInstance(config.name.clone()));
        }
        let index = self
            .instances
            .iter()
            .skip(1)
            .position(Option::is_none)
            .map(|free| free + 1)
            .unwrap_or_else(|| self.instances.len());
        if index > u16::MAX as usize {
            return Err(EngineError::InstanceLimit);
        }
        let id = InstanceId(index as u16);
        let instance = RoutingInstance::from_config(id, self.address, config);
        debug!(
            "Created instance {} [index={}, rd={}]",
            instance.name, id, instance.rd
        );
        if index == self.instances.len() {
            self.instances.push(Some(instance));
        } else {
            self.instances[index] = Some(instance);
        }
        self.names.insert(config.name.clone(), id);
        Ok(id)
    }

    /// Drop an instance and its tables without raising table events
    pub fn remove_instance(&mut self, id: InstanceId) -> Option<RoutingInstance> {
        if id.is_master() {
            return None;
        }
        let instance = self.instances.get_mut(id.0 as usize)?.take()?;
        self.names.remove(&instance.name);
        debug!("Removed instance {} [index={}]", instance.name, id);
        Some(instance)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&RoutingInstance> {
        self.instances.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn instance_mut(&mut self, id: InstanceId) -> Option<&mut RoutingInstance> {
        self.instances.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn master(&self) -> Option<&RoutingInstance> {
        self.instance(InstanceId::MASTER)
    }

    pub fn find_instance(&self, name: &str) -> Option<InstanceId> {
        self.names.get(name).copied()
    }

    pub fn instances(&self) -> impl Iterator<Item = &RoutingInstance> {
        self.instances.iter().filter_map(Option::as_ref)
    }

    /// Every live instance except master
    pub fn vrf_ids(&self) -> Vec<InstanceId> {
        self.instances()
            .map(RoutingInstance::id)
            .filter(|id| !id.is_master())
            .collect()
    }

    pub fn locate(&mut self, attrs: PathAttributes) -> Arc<PathAttributes> {
        self.attributes.locate(attrs)
    }

    pub fn add_mvpn_path(
        &mut self,
        id: InstanceId,
        prefix: MvpnPrefix,
        source: PathSource,
        attrs: Arc<PathAttributes>,
    ) -> bool {
        let changed = match self.instance_mut(id) {
            Some(instance) => instance.mvpn.add_path(prefix, source, attrs),
            None => false,
        };
        if changed {
            self.events.push_back(TableEvent::Mvpn { instance: id, prefix });
        }
        changed
    }

    pub fn delete_mvpn_path(
        &mut self,
        id: InstanceId,
        prefix: &MvpnPrefix,
        source: &PathSource,
    ) -> bool {
        let changed = match self.instance_mut(id) {
            Some(instance) => instance.mvpn.delete_path(prefix, source),
            None => false,
        };
        if changed {
            self.events.push_back(TableEvent::Mvpn {
                instance: id,
                prefix: *prefix,
            });
        }
        changed
    }

    pub fn add_ermvpn_path(
        &mut self,
        id: InstanceId,
        prefix: ErmVpnPrefix,
        source: PathSource,
        attrs: Arc<PathAttributes>,
    ) -> bool {
        let changed = match self.instance_mut(id) {
            Some(instance) => instance.ermvpn.add_path(prefix, source, attrs),
            None => false,
        };
        if changed {
            self.events
                .push_back(TableEvent::ErmVpn { instance: id, prefix });
        }
        changed
    }

    pub fn delete_ermvpn_path(
        &mut self,
        id: InstanceId,
        prefix: &ErmVpnPrefix,
        source: &PathSource,
    ) -> bool {
        let changed = match self.instance_mut(id) {
            Some(instance) => instance.ermvpn.delete_path(prefix, source),
            None => false,
        };
        if changed {
            self.events.push_back(TableEvent::ErmVpn {
                instance: id,
                prefix: *prefix,
            });
        }
        changed
    }

    /// Re-announce an ErmVpn route without changing it
    pub fn notify_ermvpn(&mut self, id: InstanceId, prefix: &ErmVpnPrefix) -> bool {
        let exists = self
            .instance(id)
            .map(|instance| instance.ermvpn.find(prefix).is_some())
            .unwrap_or(false);
        if exists {
            trace!("Notify {} in instance {}", prefix, id);
            self.events.push_back(TableEvent::ErmVpn {
                instance: id,
                prefix: *prefix,
            });
        }
        exists
    }

    pub fn pop_event(&mut self) -> Option<TableEvent> {
        self.events.pop_front()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn purge_attributes(&mut self) -> usize {
        self.attributes.purge()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

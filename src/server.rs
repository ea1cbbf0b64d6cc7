use std::collections::BTreeMap;
use std::error;
use std::fmt;
use std::net::Ipv4Addr;

use log::{debug, info, trace, warn};

use crate::config::{InstanceConfig, ServerConfig};
use crate::mvpn::{project_manager_of, ErmVpnForest, ErmVpnPrefix, McastForest, MvpnManager};
use crate::mvpn::MvpnPrefix;
use crate::rib::{replicator, Database, InstanceId, PathAttributes, PathSource};
use crate::rib::{Route, RoutingInstance, TableEvent};
use crate::utils::ParseError;

#[derive(Debug)]
pub enum EngineError {
    /// No routing instance with this name. [name]
    UnknownInstance(String),
    /// Routing instance already exists. [name]
    DuplicateInstance(String),
    /// Operation not allowed on the master instance
    MasterInstance,
    /// No instance index left to allocate
    InstanceLimit,
    /// Invalid textual input. [reason]
    Parse(ParseError),
    /// Route processing queue is no longer running
    QueueStopped,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Engine Error: ")?;
        use EngineError::*;
        match self {
            UnknownInstance(name) => write!(f, "Unknown routing instance '{}'", name)?,
            DuplicateInstance(name) => write!(f, "Routing instance '{}' already exists", name)?,
            MasterInstance => write!(f, "Not allowed on the master instance")?,
            InstanceLimit => write!(f, "No free routing instance index")?,
            Parse(err) => write!(f, "{}", err)?,
            QueueStopped => write!(f, "Route processing stopped")?,
        }
        Ok(())
    }
}

impl From<ParseError> for EngineError {
    fn from(error: ParseError) -> Self {
        EngineError::Parse(error)
    }
}

impl error::Error for EngineError {}

/// Routing instances, their tables and the MVPN managers reacting to them
///
/// Every mutating operation drains the table event queue before returning,
/// so reads always observe the converged state.
#[derive(Debug)]
pub struct MvpnServer {
    db: Database,
    managers: BTreeMap<InstanceId, MvpnManager>,
    forest: Box<dyn McastForest>,
    identifier: Ipv4Addr,
}

impl MvpnServer {
    pub fn new(identifier: Ipv4Addr, address: Ipv4Addr) -> Self {
        Self::with_forest(identifier, address, Box::new(ErmVpnForest::default()))
    }

    pub fn with_forest(
        identifier: Ipv4Addr,
        address: Ipv4Addr,
        forest: Box<dyn McastForest>,
    ) -> Self {
        Self {
            db: Database::new(address),
            managers: BTreeMap::new(),
            forest,
            identifier,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, EngineError> {
        let mut server = Self::new(config.router_id, config.address);
        for instance in config.instances.iter() {
            server.create_instance(instance)?;
        }
        Ok(server)
    }

    pub fn identifier(&self) -> Ipv4Addr {
        self.identifier
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn create_instance(&mut self, config: &InstanceConfig) -> Result<InstanceId, EngineError> {
        let id = self.db.create_instance(config)?;
        info!("Routing instance {} created [index={}]", config.name, id);
        replicator::instance_created(&mut self.db, id);
        self.sync_managers();
        self.run_until_idle();
        Ok(id)
    }

    pub fn delete_instance(&mut self, name: &str) -> Result<(), EngineError> {
        let id = self.instance_id(name)?;
        if id.is_master() {
            return Err(EngineError::MasterInstance);
        }
        if let Some(mut manager) = self.managers.remove(&id) {
            manager.stop(&mut self.db);
        }
        self.run_until_idle();
        replicator::instance_deleted(&mut self.db, id);
        self.db.remove_instance(id);
        info!("Routing instance {} deleted", name);
        self.sync_managers();
        self.run_until_idle();
        Ok(())
    }

    /// Change the BGP identifier, re-keying every originated route
    pub fn update_identifier(&mut self, identifier: Ipv4Addr) {
        if identifier == self.identifier {
            return;
        }
        info!("BGP identifier changed {} -> {}", self.identifier, identifier);
        self.identifier = identifier;
        for manager in self.managers.values_mut() {
            manager.update_identifier(&mut self.db, self.forest.as_ref(), identifier);
        }
        self.run_until_idle();
    }

    pub fn add_route(
        &mut self,
        instance: &str,
        prefix: MvpnPrefix,
        source: PathSource,
        attrs: PathAttributes,
    ) -> Result<bool, EngineError> {
        let id = self.instance_id(instance)?;
        let attrs = self.db.locate(attrs);
        let changed = self.db.add_mvpn_path(id, prefix, source, attrs);
        self.run_until_idle();
        Ok(changed)
    }

    pub fn delete_route(
        &mut self,
        instance: &str,
        prefix: &MvpnPrefix,
        source: &PathSource,
    ) -> Result<bool, EngineError> {
        let id = self.instance_id(instance)?;
        let changed = self.db.delete_mvpn_path(id, prefix, source);
        self.run_until_idle();
        Ok(changed)
    }

    pub fn add_tree_route(
        &mut self,
        instance: &str,
        prefix: ErmVpnPrefix,
        source: PathSource,
        attrs: PathAttributes,
    ) -> Result<bool, EngineError> {
        let id = self.instance_id(instance)?;
        let attrs = self.db.locate(attrs);
        let changed = self.db.add_ermvpn_path(id, prefix, source, attrs);
        self.run_until_idle();
        Ok(changed)
    }

    pub fn delete_tree_route(
        &mut self,
        instance: &str,
        prefix: &ErmVpnPrefix,
        source: &PathSource,
    ) -> Result<bool, EngineError> {
        let id = self.instance_id(instance)?;
        let changed = self.db.delete_ermvpn_path(id, prefix, source);
        self.run_until_idle();
        Ok(changed)
    }

    /// Re-announce a tree route without changing it
    pub fn notify_tree_route(
        &mut self,
        instance: &str,
        prefix: &ErmVpnPrefix,
    ) -> Result<bool, EngineError> {
        let id = self.instance_id(instance)?;
        let found = self.db.notify_ermvpn(id, prefix);
        self.run_until_idle();
        Ok(found)
    }

    pub fn instance(&self, name: &str) -> Option<&RoutingInstance> {
        self.db
            .find_instance(name)
            .and_then(|id| self.db.instance(id))
    }

    pub fn manager(&self, name: &str) -> Option<&MvpnManager> {
        self.db
            .find_instance(name)
            .and_then(|id| self.managers.get(&id))
    }

    pub fn neighbors_count(&self, name: &str) -> Option<usize> {
        self.manager(name).map(MvpnManager::neighbors_count)
    }

    pub fn table_size(&self, name: &str) -> Option<usize> {
        self.instance(name).map(|i| i.mvpn_table().len())
    }

    pub fn find_route(&self, name: &str, prefix: &MvpnPrefix) -> Option<&Route<MvpnPrefix>> {
        self.instance(name).and_then(|i| i.mvpn_table().find(prefix))
    }

    pub fn find_tree_route(&self, name: &str, prefix: &ErmVpnPrefix) -> Option<&Route<ErmVpnPrefix>> {
        self.instance(name).and_then(|i| i.ermvpn_table().find(prefix))
    }

    fn instance_id(&self, name: &str) -> Result<InstanceId, EngineError> {
        self.db
            .find_instance(name)
            .ok_or_else(|| EngineError::UnknownInstance(name.to_string()))
    }

    /// Start or stop managers so that exactly the instances whose project
    /// manager exists have one
    fn sync_managers(&mut self) {
        let wanted: BTreeMap<InstanceId, Option<InstanceId>> = self
            .db
            .vrf_ids()
            .into_iter()
            .map(|id| (id, project_manager_of(&self.db, id)))
            .collect();

        let stale: Vec<InstanceId> = self
            .managers
            .iter()
            .filter(|(id, manager)| wanted.get(*id) != Some(&Some(manager.project_manager())))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            if let Some(mut manager) = self.managers.remove(&id) {
                warn!("Project manager gone for instance {}", id);
                manager.stop(&mut self.db);
            }
        }

        for (id, project_manager) in wanted {
            let project_manager = match project_manager {
                Some(pm) => pm,
                None => continue,
            };
            if self.managers.contains_key(&id) {
                continue;
            }
            let rd = match self.db.instance(id) {
                Some(instance) => instance.rd(),
                None => continue,
            };
            debug!(
                "Project manager {} present for instance {}",
                project_manager, id
            );
            let mut manager = MvpnManager::new(id, rd, project_manager, self.identifier);
            manager.start(&mut self.db, self.forest.as_ref());
            self.managers.insert(id, manager);
        }
    }

    /// Deliver queued table events until the tables converge
    pub fn run_until_idle(&mut self) {
        let mut processed = 0;
        while let Some(event) = self.db.pop_event() {
            processed += 1;
            match event {
                TableEvent::Mvpn { instance, prefix } => {
                    replicator::route_changed(&mut self.db, instance, &prefix);
                    if let Some(manager) = self.managers.get_mut(&instance) {
                        manager.route_changed(&mut self.db, self.forest.as_ref(), &prefix);
                    }
                }
                TableEvent::ErmVpn { instance, prefix } => {
                    for manager in self
                        .managers
                        .values_mut()
                        .filter(|m| m.project_manager() == instance)
                    {
                        manager.tree_changed(&mut self.db, self.forest.as_ref(), &prefix);
                    }
                }
            }
        }
        let purged = self.db.purge_attributes();
        if processed > 0 {
            trace!("Processed {} table events, purged {} attributes", processed, purged);
        }
    }
}

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use log::{debug, info};

use super::leaf_ad::{LeafAdEvent, LeafAdGenerator};
use super::project_manager::McastForest;
use super::spmsi::SpmsiGenerator;
use super::tracker::{Tracker, TrackerEvent};
use super::{ErmVpnPrefix, MvpnNeighbor, MvpnPrefix};
use crate::rib::{Database, InstanceId, MvpnTable, PathSource, RouteDistinguisher};

/// Identity under which a manager originates routes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocalOrigin {
    pub instance: InstanceId,
    pub rd: RouteDistinguisher,
    pub identifier: Ipv4Addr,
    pub project_manager: InstanceId,
}

impl LocalOrigin {
    /// Nothing is originated while the BGP identifier is unset
    pub fn can_originate(&self) -> bool {
        !self.identifier.is_unspecified()
    }
}

/// MVPN state machine for one routing instance
///
/// Exists only while the instance's project manager instance exists.
/// Every input arrives as a table change of the owning instance (or of the
/// project manager's ErmVpn table) and every output is a path in the owning
/// instance's MVPN table.
#[derive(Debug)]
pub struct MvpnManager {
    origin: LocalOrigin,
    local_ad: Option<MvpnPrefix>,
    neighbors: BTreeMap<RouteDistinguisher, MvpnNeighbor>,
    tracker: Tracker,
    spmsi: SpmsiGenerator,
    leaf_ad: LeafAdGenerator,
}

impl MvpnManager {
    pub fn new(
        instance: InstanceId,
        rd: RouteDistinguisher,
        project_manager: InstanceId,
        identifier: Ipv4Addr,
    ) -> Self {
        Self {
            origin: LocalOrigin {
                instance,
                rd,
                identifier,
                project_manager,
            },
            local_ad: None,
            neighbors: BTreeMap::new(),
            tracker: Tracker::new(),
            spmsi: SpmsiGenerator::default(),
            leaf_ad: LeafAdGenerator::default(),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.origin.instance
    }

    pub fn project_manager(&self) -> InstanceId {
        self.origin.project_manager
    }

    pub fn identifier(&self) -> Ipv4Addr {
        self.origin.identifier
    }

    pub fn local_ad(&self) -> Option<&MvpnPrefix> {
        self.local_ad.as_ref()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &MvpnNeighbor> {
        self.neighbors.values()
    }

    pub fn neighbors_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn find_neighbor(&self, rd: &RouteDistinguisher) -> Option<&MvpnNeighbor> {
        self.neighbors.get(rd)
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn spmsi_count(&self) -> usize {
        self.spmsi.len()
    }

    pub fn leaf_ad_count(&self) -> usize {
        self.leaf_ad.len()
    }

    /// Originate the AD route and replay every route already in the table
    pub fn start(&mut self, db: &mut Database, forest: &dyn McastForest) {
        debug!(
            "Starting MVPN manager for instance {} [identifier={}]",
            self.origin.instance, self.origin.identifier
        );
        self.originate_ad(db);
        let prefixes = match db.instance(self.origin.instance) {
            Some(instance) => instance.mvpn_table().prefixes(),
            None => return,
        };
        for prefix in prefixes.iter() {
            self.route_changed(db, forest, prefix);
        }
    }

    /// Withdraw everything this manager originated and forget all state
    pub fn stop(&mut self, db: &mut Database) {
        debug!("Stopping MVPN manager for instance {}", self.origin.instance);
        if let Some(prefix) = self.local_ad.take() {
            db.delete_mvpn_path(self.origin.instance, &prefix, &PathSource::Local);
        }
        self.spmsi.withdraw_all(db, &self.origin);
        self.leaf_ad.withdraw_all(db, &self.origin);
        self.tracker.clear();
        self.neighbors.clear();
    }

    /// Re-key every originated route under a new BGP identifier
    pub fn update_identifier(
        &mut self,
        db: &mut Database,
        forest: &dyn McastForest,
        identifier: Ipv4Addr,
    ) {
        if identifier == self.origin.identifier {
            return;
        }
        self.stop(db);
        self.origin.identifier = identifier;
        self.start(db, forest);
    }

    fn originate_ad(&mut self, db: &mut Database) {
        if !self.origin.can_originate() {
            return;
        }
        let prefix = MvpnPrefix::Ad {
            rd: self.origin.rd,
            originator: self.origin.identifier,
        };
        let attrs = db.locate(Default::default());
        if db.add_mvpn_path(self.origin.instance, prefix, PathSource::Local, attrs) {
            info!("Originated AD {} in instance {}", prefix, self.origin.instance);
        }
        self.local_ad = Some(prefix);
    }

    /// React to a route being added, changed or removed in the owning table
    pub fn route_changed(&mut self, db: &mut Database, forest: &dyn McastForest, prefix: &MvpnPrefix) {
        let present = self.table(db).and_then(|t| t.find(prefix)).is_some();
        match *prefix {
            MvpnPrefix::Ad { rd, .. } => self.update_neighbor(db, rd),
            MvpnPrefix::SourceActive { sg, .. } => {
                let event = TrackerEvent::SourceActive {
                    sg,
                    prefix: *prefix,
                    present,
                };
                if let Some(edge) = self.tracker.handle(event) {
                    self.spmsi.handle(db, &self.origin, edge);
                }
            }
            MvpnPrefix::Join { sg, .. } => {
                let event = TrackerEvent::Join {
                    sg,
                    prefix: *prefix,
                    present,
                };
                if let Some(edge) = self.tracker.handle(event) {
                    self.spmsi.handle(db, &self.origin, edge);
                }
            }
            MvpnPrefix::Spmsi { sg, .. } => {
                let event = LeafAdEvent::Spmsi {
                    sg,
                    spmsi: *prefix,
                    present,
                };
                self.leaf_ad.handle(db, forest, &self.origin, event);
            }
            MvpnPrefix::LeafAd { .. } => {
                let originated = self
                    .table(db)
                    .and_then(|t| t.find(prefix))
                    .and_then(|route| route.path_from(&PathSource::Local))
                    .is_some();
                debug_assert!(
                    !originated || self.leaf_ad.is_advertised(prefix),
                    "Leaf-AD {} originated without a S-PMSI route",
                    prefix
                );
            }
            // Stored and replicated, never acted on
            MvpnPrefix::InterAsAd { .. } | MvpnPrefix::SharedTreeJoin { .. } => {}
        }
    }

    /// React to a tree route change in the project manager instance
    pub fn tree_changed(&mut self, db: &mut Database, forest: &dyn McastForest, prefix: &ErmVpnPrefix) {
        let event = LeafAdEvent::Tree { sg: prefix.sg() };
        self.leaf_ad.handle(db, forest, &self.origin, event);
    }

    fn table<'a>(&self, db: &'a Database) -> Option<&'a MvpnTable> {
        db.instance(self.origin.instance).map(|i| i.mvpn_table())
    }

    /// Recompute the neighbor for `rd` from the AD routes in the table
    fn update_neighbor(&mut self, db: &Database, rd: RouteDistinguisher) {
        if rd == self.origin.rd {
            return;
        }
        let neighbor = self.table(db).and_then(|table| {
            let low = MvpnPrefix::Ad {
                rd,
                originator: Ipv4Addr::UNSPECIFIED,
            };
            let high = MvpnPrefix::Ad {
                rd,
                originator: Ipv4Addr::BROADCAST,
            };
            table.range(low..=high).find_map(|(prefix, route)| {
                let path = route.best_path()?;
                Some(MvpnNeighbor {
                    rd,
                    source_as: path.attrs().source_as,
                    originator: prefix.originator()?,
                })
            })
        });
        match neighbor {
            Some(neighbor) => {
                if self.neighbors.get(&rd) != Some(&neighbor) {
                    info!(
                        "Instance {} discovered neighbor {}",
                        self.origin.instance, neighbor
                    );
                    self.neighbors.insert(rd, neighbor);
                }
            }
            None => {
                if let Some(neighbor) = self.neighbors.remove(&rd) {
                    info!("Instance {} lost neighbor {}", self.origin.instance, neighbor);
                }
            }
        }
    }
}

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use super::manager::LocalOrigin;
use super::project_manager::{resolve_pmsi, McastForest};
use super::{MvpnPrefix, PmsiInfo, SG};
use crate::rib::{Database, ExtCommunity, ExtCommunityList, PathAttributes, PathSource};
use crate::rib::{PmsiTunnel, RouteTarget, TunnelType};

/// Input edges of the Leaf-AD generator
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LeafAdEvent {
    /// A Type 3 route became visible in (or left) the table
    Spmsi {
        sg: SG,
        spmsi: MvpnPrefix,
        present: bool,
    },
    /// Tree route for an (S,G) changed or was re-announced
    Tree { sg: SG },
}

/// Answers every visible Type 3 route with a Type 4 route once the tree
/// for its (S,G) is resolvable
#[derive(Debug, Default)]
pub struct LeafAdGenerator {
    spmsi_routes: BTreeMap<SG, BTreeSet<MvpnPrefix>>,
    // S-PMSI route -> Leaf-AD route answering it
    advertised: BTreeMap<MvpnPrefix, MvpnPrefix>,
}

impl LeafAdGenerator {
    pub fn handle(
        &mut self,
        db: &mut Database,
        forest: &dyn McastForest,
        origin: &LocalOrigin,
        event: LeafAdEvent,
    ) {
        match event {
            LeafAdEvent::Spmsi {
                sg,
                spmsi,
                present: true,
            } => {
                self.spmsi_routes
                    .entry(sg)
                    .or_insert_with(BTreeSet::new)
                    .insert(spmsi);
                self.evaluate(db, forest, origin, sg, spmsi);
            }
            LeafAdEvent::Spmsi {
                sg,
                spmsi,
                present: false,
            } => {
                if let Some(routes) = self.spmsi_routes.get_mut(&sg) {
                    routes.remove(&spmsi);
                    if routes.is_empty() {
                        self.spmsi_routes.remove(&sg);
                    }
                }
                self.withdraw(db, origin, &spmsi);
            }
            LeafAdEvent::Tree { sg } => {
                let routes: Vec<MvpnPrefix> = match self.spmsi_routes.get(&sg) {
                    Some(routes) => routes.iter().cloned().collect(),
                    None => return,
                };
                for spmsi in routes {
                    self.evaluate(db, forest, origin, sg, spmsi);
                }
            }
        }
    }

    fn evaluate(
        &mut self,
        db: &mut Database,
        forest: &dyn McastForest,
        origin: &LocalOrigin,
        sg: SG,
        spmsi: MvpnPrefix,
    ) {
        let pmsi = if origin.can_originate() {
            resolve_pmsi(db, forest, origin.project_manager, &sg)
        } else {
            None
        };
        let leaf_ad = spmsi.leaf_ad(origin.identifier);
        let attrs = pmsi.as_ref().and_then(|pmsi| leaf_ad_attributes(&spmsi, pmsi));
        match (leaf_ad, attrs) {
            (Some(leaf_ad), Some(attrs)) => {
                let attrs = db.locate(attrs);
                if db.add_mvpn_path(origin.instance, leaf_ad, PathSource::Local, attrs) {
                    info!("Originated Leaf-AD {} in instance {}", leaf_ad, origin.instance);
                }
                self.advertised.insert(spmsi, leaf_ad);
            }
            _ => {
                debug!("No PMSI for {} yet in instance {}", sg, origin.instance);
                self.withdraw(db, origin, &spmsi);
            }
        }
    }

    fn withdraw(&mut self, db: &mut Database, origin: &LocalOrigin, spmsi: &MvpnPrefix) {
        if let Some(leaf_ad) = self.advertised.remove(spmsi) {
            db.delete_mvpn_path(origin.instance, &leaf_ad, &PathSource::Local);
            info!("Withdrew Leaf-AD {} in instance {}", leaf_ad, origin.instance);
        }
    }

    /// Is `leaf_ad` a route this generator currently originates
    pub fn is_advertised(&self, leaf_ad: &MvpnPrefix) -> bool {
        leaf_ad
            .spmsi()
            .and_then(|spmsi| self.advertised.get(&spmsi))
            .map(|advertised| advertised == leaf_ad)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.advertised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advertised.is_empty()
    }

    pub fn withdraw_all(&mut self, db: &mut Database, origin: &LocalOrigin) {
        self.spmsi_routes.clear();
        for (_, leaf_ad) in std::mem::take(&mut self.advertised) {
            db.delete_mvpn_path(origin.instance, &leaf_ad, &PathSource::Local);
        }
    }
}

/// Type 4 attributes: the S-PMSI originator as sole route target, the first
/// tree encapsulation and an ingress replication PMSI tunnel
fn leaf_ad_attributes(spmsi: &MvpnPrefix, pmsi: &PmsiInfo) -> Option<PathAttributes> {
    let sender = spmsi.originator()?;
    let encap = *pmsi.encapsulations.first()?;
    Some(PathAttributes {
        communities: ExtCommunityList::new(vec![
            ExtCommunity::RouteTarget(RouteTarget::from_address(sender, 0)),
            ExtCommunity::TunnelEncap(encap),
        ]),
        pmsi_tunnel: Some(PmsiTunnel {
            tunnel_type: TunnelType::IngressReplication,
            label: pmsi.label,
            identifier: pmsi.tunnel_identifier,
        }),
        source_as: 0,
    })
}

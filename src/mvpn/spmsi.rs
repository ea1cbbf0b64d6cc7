use std::collections::BTreeMap;

use log::{debug, info};

use super::manager::LocalOrigin;
use super::{MvpnPrefix, SpmsiEvent, SG};
use crate::rib::{Database, PathAttributes, PathSource};

/// Originates one Type 3 route per (S,G) in the `Both` state
///
/// The local path carries no targets or PMSI. Export into master adds the
/// instance export targets.
#[derive(Debug, Default)]
pub struct SpmsiGenerator {
    advertised: BTreeMap<SG, MvpnPrefix>,
}

impl SpmsiGenerator {
    pub fn handle(&mut self, db: &mut Database, origin: &LocalOrigin, event: SpmsiEvent) {
        match event {
            SpmsiEvent::Originate(sg) => {
                if !origin.can_originate() {
                    debug!("No identifier, not originating S-PMSI for {}", sg);
                    return;
                }
                let prefix = MvpnPrefix::Spmsi {
                    rd: origin.rd,
                    sg,
                    originator: origin.identifier,
                };
                let attrs = db.locate(PathAttributes::default());
                if db.add_mvpn_path(origin.instance, prefix, PathSource::Local, attrs) {
                    info!("Originated S-PMSI {} in instance {}", prefix, origin.instance);
                }
                self.advertised.insert(sg, prefix);
            }
            SpmsiEvent::Withdraw(sg) => {
                if let Some(prefix) = self.advertised.remove(&sg) {
                    db.delete_mvpn_path(origin.instance, &prefix, &PathSource::Local);
                    info!("Withdrew S-PMSI {} in instance {}", prefix, origin.instance);
                }
            }
        }
    }

    pub fn advertised(&self, sg: &SG) -> Option<&MvpnPrefix> {
        self.advertised.get(sg)
    }

    pub fn len(&self) -> usize {
        self.advertised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advertised.is_empty()
    }

    pub fn withdraw_all(&mut self, db: &mut Database, origin: &LocalOrigin) {
        for (_, prefix) in std::mem::take(&mut self.advertised) {
            db.delete_mvpn_path(origin.instance, &prefix, &PathSource::Local);
        }
    }
}

//! Route target based replication between VRF tables and the master table
//!
//! A VRF exports the best primary path of each route into master, tagged
//! with its export targets. Master paths are imported into every VRF whose
//! import targets intersect the path's targets, except the VRF the path was
//! exported from.
use std::sync::Arc;

use log::trace;

use super::{Database, InstanceId, PathAttributes, PathSource, RouteTarget};
use crate::mvpn::{MvpnPrefix, MvpnRouteKind};

/// Re-evaluate replication for a route that changed in `instance`
pub fn route_changed(db: &mut Database, instance: InstanceId, prefix: &MvpnPrefix) {
    if instance.is_master() {
        for vrf in db.vrf_ids() {
            sync_import(db, vrf, prefix);
        }
    } else {
        sync_export(db, instance, prefix);
    }
}

/// Import every eligible master route into a new instance
pub fn instance_created(db: &mut Database, vrf: InstanceId) {
    let prefixes = match db.master() {
        Some(master) => master.mvpn_table().prefixes(),
        None => return,
    };
    for prefix in prefixes.iter() {
        sync_import(db, vrf, prefix);
    }
}

/// Withdraw everything an instance exported into master
pub fn instance_deleted(db: &mut Database, vrf: InstanceId) {
    let prefixes = match db.instance(vrf) {
        Some(instance) => instance.mvpn_table().prefixes(),
        None => return,
    };
    let source = PathSource::Replicated { primary: vrf };
    for prefix in prefixes.iter() {
        db.delete_mvpn_path(InstanceId::MASTER, prefix, &source);
    }
}

fn sync_export(db: &mut Database, vrf: InstanceId, prefix: &MvpnPrefix) {
    let (best, export_targets) = match db.instance(vrf) {
        Some(instance) => (
            instance
                .mvpn_table()
                .find(prefix)
                .and_then(|route| route.best_primary_path())
                .map(|path| path.attrs().clone()),
            instance.export_targets().iter().cloned().collect::<Vec<_>>(),
        ),
        None => return,
    };
    let source = PathSource::Replicated { primary: vrf };
    match best {
        Some(attrs) => {
            let attrs = export_attributes(db, prefix, attrs, &export_targets);
            if db.add_mvpn_path(InstanceId::MASTER, *prefix, source, attrs) {
                trace!("Exported {} from instance {}", prefix, vrf);
            }
        }
        None => {
            if db.delete_mvpn_path(InstanceId::MASTER, prefix, &source) {
                trace!("Withdrew export of {} from instance {}", prefix, vrf);
            }
        }
    }
}

/// Leaf-AD routes already carry the single target they are aimed at
fn export_attributes(
    db: &mut Database,
    prefix: &MvpnPrefix,
    attrs: Arc<PathAttributes>,
    export_targets: &[RouteTarget],
) -> Arc<PathAttributes> {
    if prefix.kind() == MvpnRouteKind::LeafAd || export_targets.is_empty() {
        return attrs;
    }
    let mut exported = (*attrs).clone();
    exported.communities = exported.communities.with_route_targets(export_targets);
    db.locate(exported)
}

fn sync_import(db: &mut Database, vrf: InstanceId, prefix: &MvpnPrefix) {
    let (wanted, existing) = {
        let instance = match db.instance(vrf) {
            Some(instance) => instance,
            None => return,
        };
        let mut wanted: Vec<(PathSource, Arc<PathAttributes>)> = Vec::new();
        if let Some(route) = db.master().and_then(|m| m.mvpn_table().find(prefix)) {
            for path in route.paths() {
                let primary = match path.source() {
                    PathSource::Replicated { primary } => primary,
                    _ => InstanceId::MASTER,
                };
                if primary == vrf || !instance.imports_any(&path.attrs().route_targets()) {
                    continue;
                }
                let source = PathSource::Replicated { primary };
                // Paths are ordered best first, keep the best one per primary
                if wanted.iter().all(|(s, _)| *s != source) {
                    wanted.push((source, path.attrs().clone()));
                }
            }
        }
        let existing: Vec<PathSource> = instance
            .mvpn_table()
            .find(prefix)
            .map(|route| {
                route
                    .paths()
                    .iter()
                    .map(|p| p.source())
                    .filter(PathSource::is_replicated)
                    .collect()
            })
            .unwrap_or_default();
        (wanted, existing)
    };

    for source in existing.iter() {
        if wanted.iter().all(|(s, _)| s != source) {
            db.delete_mvpn_path(vrf, prefix, source);
        }
    }
    for (source, attrs) in wanted.into_iter() {
        if db.add_mvpn_path(vrf, *prefix, source, attrs) {
            trace!("Imported {} into instance {}", prefix, vrf);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::config::InstanceConfig;

    fn config(name: &str, imports: &[&str], exports: &[&str]) -> InstanceConfig {
        InstanceConfig {
            name: name.to_string(),
            import_targets: imports.iter().map(|t| t.parse().unwrap()).collect(),
            export_targets: exports.iter().map(|t| t.parse().unwrap()).collect(),
            project_manager: "fabric".to_string(),
        }
    }

    /// Replicate until no table events are left
    fn drain(db: &mut Database) {
        while let Some(event) = db.pop_event() {
            if let crate::rib::TableEvent::Mvpn { instance, prefix } = event {
                route_changed(db, instance, &prefix);
            }
        }
    }

    fn size(db: &Database, id: InstanceId) -> usize {
        db.instance(id).unwrap().mvpn_table().len()
    }

    #[test]
    fn test_export_and_import() {
        let mut db = Database::new(Ipv4Addr::new(127, 0, 0, 1));
        let red = db
            .create_instance(&config(
                "red",
                &["target:127.0.0.1:1001"],
                &["target:127.0.0.1:1001"],
            ))
            .unwrap();
        let green = db
            .create_instance(&config(
                "green",
                &["target:127.0.0.1:1003", "target:127.0.0.1:1001"],
                &["target:127.0.0.1:1003"],
            ))
            .unwrap();
        let prefix: MvpnPrefix = "5-10.1.1.1:65535,9.8.7.6,224.1.2.3".parse().unwrap();
        let attrs = db.locate(PathAttributes::default());
        db.add_mvpn_path(red, prefix, PathSource::Api, attrs);
        drain(&mut db);

        assert_eq!(size(&db, InstanceId::MASTER), 1);
        assert_eq!(size(&db, red), 1);
        assert_eq!(size(&db, green), 1);
        let master = db.master().unwrap().mvpn_table().find(&prefix).unwrap();
        assert_eq!(
            master.best_path().unwrap().attrs().route_targets(),
            vec!["target:127.0.0.1:1001".parse().unwrap()]
        );
        let imported = db.instance(green).unwrap().mvpn_table().find(&prefix).unwrap();
        assert_eq!(
            imported.best_path().unwrap().source(),
            PathSource::Replicated { primary: red }
        );

        db.delete_mvpn_path(red, &prefix, &PathSource::Api);
        drain(&mut db);
        assert_eq!(size(&db, InstanceId::MASTER), 0);
        assert_eq!(size(&db, green), 0);
    }

    #[test]
    fn test_import_on_instance_create() {
        let mut db = Database::new(Ipv4Addr::new(127, 0, 0, 1));
        let prefix: MvpnPrefix = "1-10.1.1.1:65535,9.8.7.6".parse().unwrap();
        let attrs = db.locate(PathAttributes::with_targets(&[
            "target:127.0.0.1:1001".parse().unwrap()
        ]));
        db.add_mvpn_path(
            InstanceId::MASTER,
            prefix,
            PathSource::Peer("10.1.1.1".parse().unwrap()),
            attrs,
        );
        drain(&mut db);

        let red = db
            .create_instance(&config("red", &["target:127.0.0.1:1001"], &[]))
            .unwrap();
        instance_created(&mut db, red);
        drain(&mut db);
        assert_eq!(size(&db, red), 1);
        // Imported paths are never exported back into master
        assert_eq!(
            db.master().unwrap().mvpn_table().find(&prefix).unwrap().paths().len(),
            1
        );

        instance_deleted(&mut db, red);
        db.remove_instance(red);
        drain(&mut db);
        assert_eq!(size(&db, InstanceId::MASTER), 1);
    }
}

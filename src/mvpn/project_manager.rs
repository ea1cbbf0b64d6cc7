use std::fmt::Debug;

use super::{PmsiInfo, SG};
use crate::rib::{Database, ErmVpnTable, InstanceId};

/// Source of tree forwarding information for an (S,G)
///
/// `None` means the transport layer has not built the tree yet.
pub trait McastForest: Debug + Send {
    fn forest_node_pmsi(&self, table: &ErmVpnTable, sg: &SG) -> Option<PmsiInfo>;
}

/// Reads PMSI data from the global tree root route in the ErmVpn table
#[derive(Debug, Default)]
pub struct ErmVpnForest;

impl McastForest for ErmVpnForest {
    fn forest_node_pmsi(&self, table: &ErmVpnTable, sg: &SG) -> Option<PmsiInfo> {
        let root = table.global_tree_root(sg)?;
        let attrs = root.best_path()?.attrs();
        let tunnel = attrs.pmsi_tunnel?;
        let encapsulations = attrs.tunnel_encaps();
        if encapsulations.is_empty() {
            return None;
        }
        Some(PmsiInfo {
            label: tunnel.label,
            tunnel_identifier: tunnel.identifier,
            tunnel_type: tunnel.tunnel_type,
            encapsulations,
        })
    }
}

/// Instance acting as project manager for `instance`, if it exists
///
/// The project manager instance is its own project manager.
pub fn project_manager_of(db: &Database, instance: InstanceId) -> Option<InstanceId> {
    let name = db.instance(instance)?.project_manager()?;
    db.find_instance(name)
}

/// PMSI for an (S,G) in the project manager's ErmVpn table
pub fn resolve_pmsi(
    db: &Database,
    forest: &dyn McastForest,
    project_manager: InstanceId,
    sg: &SG,
) -> Option<PmsiInfo> {
    let table = db.instance(project_manager)?.ermvpn_table();
    forest.forest_node_pmsi(table, sg)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::config::InstanceConfig;
    use crate::mvpn::ErmVpnPrefix;
    use crate::rib::{EncapType, ExtCommunity, ExtCommunityList, PathAttributes, PathSource};
    use crate::rib::{PmsiTunnel, TunnelType};

    fn tree_attrs(encaps: Vec<EncapType>) -> PathAttributes {
        PathAttributes {
            communities: ExtCommunityList::new(
                encaps.into_iter().map(ExtCommunity::TunnelEncap).collect(),
            ),
            pmsi_tunnel: Some(PmsiTunnel {
                tunnel_type: TunnelType::IngressReplication,
                label: 10,
                identifier: Ipv4Addr::new(1, 2, 3, 4),
            }),
            source_as: 0,
        }
    }

    #[test]
    fn test_forest_node_pmsi() {
        let mut table = ErmVpnTable::new("fabric.ermvpn.0");
        let prefix: ErmVpnPrefix = "2-10.1.1.1:65535-192.168.1.1,224.1.2.3,9.8.7.6"
            .parse()
            .unwrap();
        let forest = ErmVpnForest::default();
        assert!(forest.forest_node_pmsi(&table, &prefix.sg()).is_none());

        table.add_path(
            prefix,
            PathSource::Api,
            std::sync::Arc::new(tree_attrs(vec![EncapType::Gre])),
        );
        let pmsi = forest.forest_node_pmsi(&table, &prefix.sg()).unwrap();
        assert_eq!(pmsi.label, 10);
        assert_eq!(pmsi.tunnel_identifier, Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(pmsi.encapsulations, vec![EncapType::Gre]);

        // No encapsulation, nothing to forward with
        table.add_path(
            prefix,
            PathSource::Api,
            std::sync::Arc::new(tree_attrs(vec![])),
        );
        assert!(forest.forest_node_pmsi(&table, &prefix.sg()).is_none());
    }

    #[test]
    fn test_project_manager_of() {
        let mut db = Database::new(Ipv4Addr::new(127, 0, 0, 1));
        let config = |name: &str| InstanceConfig {
            name: name.to_string(),
            import_targets: vec![],
            export_targets: vec![],
            project_manager: "fabric".to_string(),
        };
        let red = db.create_instance(&config("red")).unwrap();
        assert_eq!(project_manager_of(&db, red), None);
        let fabric = db.create_instance(&config("fabric")).unwrap();
        assert_eq!(project_manager_of(&db, red), Some(fabric));
        assert_eq!(project_manager_of(&db, fabric), Some(fabric));
        assert_eq!(project_manager_of(&db, InstanceId::MASTER), None);
    }
}

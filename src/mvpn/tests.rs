use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use super::{ErmVpnPrefix, MvpnPrefix};
use crate::config::InstanceConfig;
use crate::rib::{EncapType, ExtCommunity, ExtCommunityList, PathAttributes, PathSource};
use crate::rib::{PmsiTunnel, RouteTarget, TunnelType};
use crate::server::MvpnServer;

const FABRIC: &str = "default-domain:default-project:ip-fabric:ip-fabric";
const REMOTE_AD: &str = "1-10.1.1.1:65535,9.8.7.6";
const REMOTE_SPMSI: &str = "3-10.1.1.1:65535,9.8.7.6,224.1.2.3,192.168.1.1";
const SOURCE_ACTIVE: &str = "5-10.1.1.1:65535,9.8.7.6,224.1.2.3";
const JOIN: &str = "7-10.1.1.1:65535,100,9.8.7.6,224.1.2.3";
const TREE: &str = "2-10.1.1.1:65535-192.168.1.1,224.1.2.3,9.8.7.6";
const SOURCE_ACTIVE_2: &str = "5-10.1.1.1:65535,9.8.7.6,224.1.2.4";
const JOIN_2: &str = "7-10.1.1.1:65535,100,9.8.7.6,224.1.2.4";
const TREE_2: &str = "2-10.1.1.1:65535-192.168.1.1,224.1.2.4,9.8.7.6";

fn localhost() -> Ipv4Addr {
    Ipv4Addr::new(127, 0, 0, 1)
}

fn target(assigned: u16) -> RouteTarget {
    RouteTarget::from_address(localhost(), assigned)
}

fn peer() -> PathSource {
    PathSource::Peer(IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)))
}

fn fabric_config() -> InstanceConfig {
    InstanceConfig::new(FABRIC, FABRIC).target(target(9999))
}

/// red, blue and green VRFs, green importing from red and blue
fn topology(identifier: Ipv4Addr, with_project_manager: bool) -> MvpnServer {
    let mut server = MvpnServer::new(identifier, localhost());
    let instances = vec![
        InstanceConfig::new("red", FABRIC).target(target(1001)),
        InstanceConfig::new("blue", FABRIC).target(target(1002)),
        InstanceConfig::new("green", FABRIC)
            .target(target(1003))
            .import_target(target(1001))
            .import_target(target(1002)),
    ];
    for config in instances.iter() {
        server.create_instance(config).unwrap();
    }
    if with_project_manager {
        server.create_instance(&fabric_config()).unwrap();
    }
    server
}

/// Table sizes of (master, red, blue, green)
fn sizes(server: &MvpnServer) -> (usize, usize, usize, usize) {
    let size = |name: &str| server.table_size(name).unwrap();
    (size("master"), size("red"), size("blue"), size("green"))
}

fn neighbors(server: &MvpnServer) -> (usize, usize, usize) {
    let count = |name: &str| server.neighbors_count(name).unwrap();
    (count("red"), count("blue"), count("green"))
}

fn vrf_import_target(server: &MvpnServer, name: &str) -> RouteTarget {
    let index = server.instance(name).unwrap().id().index();
    target(index)
}

fn add_master_route(server: &mut MvpnServer, prefix: &str, targets: &[RouteTarget]) -> MvpnPrefix {
    let prefix: MvpnPrefix = prefix.parse().unwrap();
    let attrs = PathAttributes::with_targets(targets);
    assert!(server.add_route("master", prefix, peer(), attrs).unwrap());
    prefix
}

fn tree_attrs(label: u32, identifier: Ipv4Addr, encap: EncapType, targets: &[RouteTarget]) -> PathAttributes {
    let mut communities: Vec<ExtCommunity> =
        targets.iter().map(|t| ExtCommunity::RouteTarget(*t)).collect();
    communities.push(ExtCommunity::TunnelEncap(encap));
    PathAttributes {
        communities: ExtCommunityList::new(communities),
        pmsi_tunnel: Some(PmsiTunnel {
            tunnel_type: TunnelType::IngressReplication,
            label,
            identifier,
        }),
        source_as: 0,
    }
}

fn add_tree(server: &mut MvpnServer) -> ErmVpnPrefix {
    add_tree_for(server, TREE)
}

fn add_tree_for(server: &mut MvpnServer, tree: &str) -> ErmVpnPrefix {
    let prefix: ErmVpnPrefix = tree.parse().unwrap();
    let attrs = tree_attrs(10, Ipv4Addr::new(1, 2, 3, 4), EncapType::Gre, &[]);
    server
        .add_tree_route(FABRIC, prefix, PathSource::Api, attrs)
        .unwrap();
    prefix
}

fn add_source_active(server: &mut MvpnServer) -> MvpnPrefix {
    add_source_active_for(server, SOURCE_ACTIVE)
}

fn add_source_active_for(server: &mut MvpnServer, source_active: &str) -> MvpnPrefix {
    let prefix: MvpnPrefix = source_active.parse().unwrap();
    let attrs = PathAttributes::with_targets(&[target(1001)]);
    server
        .add_route("red", prefix, PathSource::Api, attrs)
        .unwrap();
    prefix
}

fn add_join(server: &mut MvpnServer) -> MvpnPrefix {
    add_join_for(server, JOIN)
}

fn add_join_for(server: &mut MvpnServer, join: &str) -> MvpnPrefix {
    let red = vrf_import_target(server, "red");
    add_master_route(server, join, &[red])
}

/// Type 3 red originates for the group of `source_active`
fn red_spmsi(server: &MvpnServer, source_active: &str, originator: Ipv4Addr) -> MvpnPrefix {
    MvpnPrefix::Spmsi {
        rd: server.instance("red").unwrap().rd(),
        sg: source_active.parse::<MvpnPrefix>().unwrap().sg().unwrap(),
        originator,
    }
}

#[test]
fn test_local_ad_routes() {
    let server = topology(localhost(), true);
    assert_eq!(sizes(&server), (4, 1, 1, 3));
    assert_eq!(neighbors(&server), (0, 0, 2));

    let red = server.manager("red").unwrap();
    let ad = *red.local_ad().unwrap();
    assert_eq!(ad.originator(), Some(localhost()));
    assert_eq!(ad.rd(), server.instance("red").unwrap().rd());

    let green = server.manager("green").unwrap();
    let neighbor = green.find_neighbor(&ad.rd()).unwrap();
    assert_eq!(neighbor.source_as, 0);
    assert_eq!(neighbor.originator, localhost());

    // The project manager manages itself
    assert!(server.manager(FABRIC).is_some());
}

#[test]
fn test_identifier_change() {
    let mut server = topology(localhost(), true);
    let old_ad = *server.manager("red").unwrap().local_ad().unwrap();

    let identifier = Ipv4Addr::new(192, 168, 1, 1);
    server.update_identifier(identifier);
    assert_eq!(sizes(&server), (4, 1, 1, 3));
    assert_eq!(neighbors(&server), (0, 0, 2));
    assert!(server.find_route("red", &old_ad).is_none());
    let new_ad = *server.manager("red").unwrap().local_ad().unwrap();
    assert_eq!(new_ad.originator(), Some(identifier));
    assert!(server.find_route("master", &new_ad).is_some());
}

#[test]
fn test_identifier_unset() {
    let mut server = topology(localhost(), true);
    server.update_identifier(Ipv4Addr::UNSPECIFIED);
    assert_eq!(sizes(&server), (0, 0, 0, 0));
    assert_eq!(server.table_size(FABRIC), Some(0));
    assert_eq!(neighbors(&server), (0, 0, 0));

    server.update_identifier(localhost());
    assert_eq!(sizes(&server), (4, 1, 1, 3));
    assert_eq!(neighbors(&server), (0, 0, 2));
}

#[test]
fn test_remote_ad_route() {
    let mut server = topology(localhost(), true);
    let remote = add_master_route(&mut server, REMOTE_AD, &[target(1001)]);
    assert_eq!(sizes(&server), (5, 2, 1, 4));
    assert_eq!(neighbors(&server), (1, 0, 3));

    let neighbor = *server
        .manager("red")
        .unwrap()
        .find_neighbor(&remote.rd())
        .unwrap();
    assert_eq!(neighbor.originator, Ipv4Addr::new(9, 8, 7, 6));
    assert_eq!(neighbor.source_as, 0);

    assert!(server
        .delete_route("master", &remote, &peer())
        .unwrap());
    assert_eq!(sizes(&server), (4, 1, 1, 3));
    assert_eq!(neighbors(&server), (0, 0, 2));
}

#[test]
fn test_remote_ad_source_as() {
    let mut server = topology(localhost(), true);
    let prefix: MvpnPrefix = REMOTE_AD.parse().unwrap();
    let mut attrs = PathAttributes::with_targets(&[target(1001)]);
    attrs.source_as = 64512;
    server.add_route("master", prefix, peer(), attrs).unwrap();

    let neighbor = server
        .manager("green")
        .unwrap()
        .find_neighbor(&prefix.rd())
        .copied()
        .unwrap();
    assert_eq!(neighbor.source_as, 64512);
}

#[test]
fn test_remote_spmsi_without_tree() {
    let mut server = topology(localhost(), true);
    let spmsi = add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    assert_eq!(sizes(&server), (5, 2, 1, 4));

    let leaf_ad = spmsi.leaf_ad(localhost()).unwrap();
    assert!(server.find_route("red", &leaf_ad).is_none());
    assert_eq!(server.manager("red").unwrap().leaf_ad_count(), 0);
}

fn check_leaf_ad_attributes(server: &MvpnServer, leaf_ad: &MvpnPrefix, label: u32, identifier: Ipv4Addr, encap: EncapType) {
    for name in ["red", "green"].iter() {
        let route = server.find_route(name, leaf_ad).unwrap();
        let path = route.best_path().unwrap();
        assert_eq!(path.source(), PathSource::Local);
        let attrs = path.attrs();
        assert_eq!(
            attrs.route_targets(),
            vec![RouteTarget::from_address(Ipv4Addr::new(192, 168, 1, 1), 0)]
        );
        assert_eq!(attrs.tunnel_encaps(), vec![encap]);
        let tunnel = attrs.pmsi_tunnel.unwrap();
        assert_eq!(tunnel.tunnel_type, TunnelType::IngressReplication);
        assert_eq!(tunnel.label, label);
        assert_eq!(tunnel.identifier, identifier);
    }
}

#[test]
fn test_remote_spmsi_tree_after() {
    let mut server = topology(localhost(), true);
    let spmsi = add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    add_tree(&mut server);
    assert_eq!(sizes(&server), (6, 3, 1, 5));

    // red and green answer with the same Leaf-AD
    let leaf_ad = spmsi.leaf_ad(localhost()).unwrap();
    let master = server.find_route("master", &leaf_ad).unwrap();
    assert_eq!(master.paths().len(), 2);
    check_leaf_ad_attributes(&server, &leaf_ad, 10, Ipv4Addr::new(1, 2, 3, 4), EncapType::Gre);
}

#[test]
fn test_remote_spmsi_tree_before() {
    let mut server = topology(localhost(), true);
    add_tree(&mut server);
    assert_eq!(sizes(&server), (4, 1, 1, 3));
    let spmsi = add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    assert_eq!(sizes(&server), (6, 3, 1, 5));

    let leaf_ad = spmsi.leaf_ad(localhost()).unwrap();
    check_leaf_ad_attributes(&server, &leaf_ad, 10, Ipv4Addr::new(1, 2, 3, 4), EncapType::Gre);
}

#[test]
fn test_remote_spmsi_withdrawn() {
    let mut server = topology(localhost(), true);
    let spmsi = add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    add_tree(&mut server);
    assert_eq!(sizes(&server), (6, 3, 1, 5));

    server.delete_route("master", &spmsi, &peer()).unwrap();
    assert_eq!(sizes(&server), (4, 1, 1, 3));
    assert_eq!(server.manager("red").unwrap().leaf_ad_count(), 0);
    assert_eq!(server.manager("green").unwrap().leaf_ad_count(), 0);
}

#[test]
fn test_tree_deleted() {
    let mut server = topology(localhost(), true);
    let spmsi = add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    let tree = add_tree(&mut server);
    assert_eq!(sizes(&server), (6, 3, 1, 5));

    assert!(server
        .delete_tree_route(FABRIC, &tree, &PathSource::Api)
        .unwrap());
    assert_eq!(sizes(&server), (5, 2, 1, 4));
    let leaf_ad = spmsi.leaf_ad(localhost()).unwrap();
    assert!(server.find_route("master", &leaf_ad).is_none());

    // Comes back with the tree
    add_tree(&mut server);
    assert_eq!(sizes(&server), (6, 3, 1, 5));
}

#[test]
fn test_tree_without_encapsulation() {
    let mut server = topology(localhost(), true);
    add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    let prefix: ErmVpnPrefix = TREE.parse().unwrap();
    let attrs = PathAttributes {
        pmsi_tunnel: Some(PmsiTunnel {
            tunnel_type: TunnelType::IngressReplication,
            label: 10,
            identifier: Ipv4Addr::new(1, 2, 3, 4),
        }),
        ..Default::default()
    };
    server
        .add_tree_route(FABRIC, prefix, PathSource::Api, attrs)
        .unwrap();
    assert_eq!(sizes(&server), (5, 2, 1, 4));
}

#[test]
fn test_tree_notify_keeps_paths() {
    let mut server = topology(localhost(), true);
    let spmsi = add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    let tree = add_tree(&mut server);
    let leaf_ad = spmsi.leaf_ad(localhost()).unwrap();

    let red_path = Arc::clone(server.find_route("red", &leaf_ad).unwrap().best_path().unwrap());
    let master_path = Arc::clone(
        server
            .find_route("master", &leaf_ad)
            .unwrap()
            .best_path()
            .unwrap(),
    );

    assert!(server.notify_tree_route(FABRIC, &tree).unwrap());
    assert_eq!(sizes(&server), (6, 3, 1, 5));
    let red_route = server.find_route("red", &leaf_ad).unwrap();
    assert!(Arc::ptr_eq(&red_path, red_route.best_path().unwrap()));
    assert!(Arc::ptr_eq(red_path.attrs(), red_route.best_path().unwrap().attrs()));
    let master_route = server.find_route("master", &leaf_ad).unwrap();
    assert!(Arc::ptr_eq(&master_path, master_route.best_path().unwrap()));
}

#[test]
fn test_tree_pmsi_change() {
    let mut server = topology(localhost(), true);
    let spmsi = add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    let tree = add_tree(&mut server);
    let leaf_ad = spmsi.leaf_ad(localhost()).unwrap();
    let red_path = Arc::clone(server.find_route("red", &leaf_ad).unwrap().best_path().unwrap());

    let identifier = Ipv4Addr::new(1, 2, 3, 5);
    let attrs = tree_attrs(20, identifier, EncapType::Udp, &[target(1101)]);
    assert!(server
        .add_tree_route(FABRIC, tree, PathSource::Api, attrs)
        .unwrap());
    assert_eq!(sizes(&server), (6, 3, 1, 5));

    let red_route = server.find_route("red", &leaf_ad).unwrap();
    assert!(!Arc::ptr_eq(&red_path, red_route.best_path().unwrap()));
    assert!(!Arc::ptr_eq(red_path.attrs(), red_route.best_path().unwrap().attrs()));
    check_leaf_ad_attributes(&server, &leaf_ad, 20, identifier, EncapType::Udp);
}

#[test]
fn test_source_active_then_join() {
    let mut server = topology(localhost(), true);
    let source_active = add_source_active(&mut server);
    assert_eq!(sizes(&server), (5, 2, 1, 4));

    let join = add_join(&mut server);
    assert_eq!(sizes(&server), (7, 4, 1, 5));
    assert_eq!(server.manager("red").unwrap().spmsi_count(), 1);
    assert_eq!(server.manager("green").unwrap().spmsi_count(), 0);

    server.delete_route("master", &join, &peer()).unwrap();
    assert_eq!(sizes(&server), (5, 2, 1, 4));
    server
        .delete_route("red", &source_active, &PathSource::Api)
        .unwrap();
    assert_eq!(sizes(&server), (4, 1, 1, 3));
}

#[test]
fn test_source_active_withdrawn_first() {
    let mut server = topology(localhost(), true);
    let source_active = add_source_active(&mut server);
    let join = add_join(&mut server);
    assert_eq!(sizes(&server), (7, 4, 1, 5));

    server
        .delete_route("red", &source_active, &PathSource::Api)
        .unwrap();
    assert_eq!(sizes(&server), (5, 2, 1, 3));
    server.delete_route("master", &join, &peer()).unwrap();
    assert_eq!(sizes(&server), (4, 1, 1, 3));
}

#[test]
fn test_join_then_source_active() {
    let mut server = topology(localhost(), true);
    add_join(&mut server);
    assert_eq!(sizes(&server), (5, 2, 1, 3));
    add_source_active(&mut server);
    assert_eq!(sizes(&server), (7, 4, 1, 5));

    let spmsi = red_spmsi(&server, SOURCE_ACTIVE, localhost());
    let route = server.find_route("master", &spmsi).unwrap();
    let attrs = route.best_path().unwrap().attrs();
    assert_eq!(attrs.route_targets(), vec![target(1001)]);
    assert!(attrs.pmsi_tunnel.is_none());
}

#[test]
fn test_spmsi_orderings() {
    #[derive(Copy, Clone, Debug)]
    enum Step {
        SourceActive,
        Join,
        Tree,
    }
    use Step::*;
    let orderings = [
        [SourceActive, Join, Tree],
        [SourceActive, Tree, Join],
        [Join, SourceActive, Tree],
        [Join, Tree, SourceActive],
        [Tree, SourceActive, Join],
        [Tree, Join, SourceActive],
    ];
    let identifier = Ipv4Addr::new(192, 168, 1, 1);
    for ordering in orderings.iter() {
        let mut server = topology(identifier, true);
        let mut tree = None;
        for step in ordering.iter() {
            match step {
                SourceActive => {
                    add_source_active(&mut server);
                }
                Join => {
                    add_join(&mut server);
                }
                Tree => tree = Some(add_tree(&mut server)),
            }
        }
        assert_eq!(sizes(&server), (8, 5, 1, 6), "{:?}", ordering);
        assert_eq!(neighbors(&server), (0, 0, 2), "{:?}", ordering);

        let spmsi = red_spmsi(&server, SOURCE_ACTIVE, identifier);
        let leaf_ad = spmsi.leaf_ad(identifier).unwrap();
        let master = server.find_route("master", &leaf_ad).unwrap();
        assert_eq!(master.paths().len(), 2, "{:?}", ordering);
        check_leaf_ad_attributes(&server, &leaf_ad, 10, Ipv4Addr::new(1, 2, 3, 4), EncapType::Gre);

        let tree = tree.unwrap();
        server
            .delete_tree_route(FABRIC, &tree, &PathSource::Api)
            .unwrap();
        assert_eq!(sizes(&server), (7, 4, 1, 5), "{:?}", ordering);
        assert_eq!(neighbors(&server), (0, 0, 2), "{:?}", ordering);
        assert!(server.find_route("red", &leaf_ad).is_none(), "{:?}", ordering);
    }
}

#[test]
fn test_groups_are_independent() {
    let identifier = Ipv4Addr::new(192, 168, 1, 1);
    let mut server = topology(identifier, true);
    let groups = [(SOURCE_ACTIVE, JOIN, TREE), (SOURCE_ACTIVE_2, JOIN_2, TREE_2)];
    for (source_active, join, tree) in groups.iter() {
        add_source_active_for(&mut server, source_active);
        add_join_for(&mut server, join);
        add_tree_for(&mut server, tree);
    }
    assert_eq!(sizes(&server), (12, 9, 1, 9));
    let red = server.manager("red").unwrap();
    assert_eq!(red.spmsi_count(), 2);
    assert_eq!(red.leaf_ad_count(), 2);

    let join: MvpnPrefix = JOIN_2.parse().unwrap();
    assert!(server.delete_route("master", &join, &peer()).unwrap());
    assert_eq!(sizes(&server), (9, 6, 1, 7));
    let red = server.manager("red").unwrap();
    assert_eq!(red.spmsi_count(), 1);
    assert_eq!(red.leaf_ad_count(), 1);

    // The first group keeps its Type 3 and Type 4
    let kept = red_spmsi(&server, SOURCE_ACTIVE, identifier);
    assert!(server.find_route("master", &kept).is_some());
    assert!(server.find_route("green", &kept).is_some());
    let leaf_ad = kept.leaf_ad(identifier).unwrap();
    assert_eq!(server.find_route("master", &leaf_ad).unwrap().paths().len(), 2);
    check_leaf_ad_attributes(&server, &leaf_ad, 10, Ipv4Addr::new(1, 2, 3, 4), EncapType::Gre);

    let withdrawn = red_spmsi(&server, SOURCE_ACTIVE_2, identifier);
    assert!(server.find_route("master", &withdrawn).is_none());
    let withdrawn_leaf_ad = withdrawn.leaf_ad(identifier).unwrap();
    assert!(server.find_route("red", &withdrawn_leaf_ad).is_none());
    assert!(server.find_route("master", &withdrawn_leaf_ad).is_none());
}

#[test]
fn test_inter_as_and_shared_tree_routes_are_stored_only() {
    let mut server = topology(localhost(), true);
    let inter_as = add_master_route(&mut server, "2-10.1.1.1:65535,23456", &[target(1001)]);
    assert_eq!(sizes(&server), (5, 2, 1, 4));
    assert_eq!(neighbors(&server), (0, 0, 2));

    let red = vrf_import_target(&server, "red");
    add_master_route(&mut server, "6-10.1.1.1:65535,100,9.8.7.6,224.1.2.3", &[red]);
    add_source_active(&mut server);
    add_tree(&mut server);
    assert_eq!(sizes(&server), (7, 4, 1, 5));

    // A shared tree join does not complete the (S,G) for Type 3
    let red = server.manager("red").unwrap();
    assert_eq!(red.spmsi_count(), 0);
    assert_eq!(red.leaf_ad_count(), 0);
    let leaf_ad = inter_as.leaf_ad(localhost()).unwrap();
    assert!(server.find_route("red", &leaf_ad).is_none());
}

#[test]
fn test_project_manager_absent() {
    let mut server = topology(localhost(), false);
    assert_eq!(sizes(&server), (0, 0, 0, 0));
    assert!(server.manager("red").is_none());
    assert_eq!(server.neighbors_count("green"), None);

    // Replication does not need managers
    add_master_route(&mut server, REMOTE_SPMSI, &[target(1001)]);
    assert_eq!(sizes(&server), (1, 1, 0, 1));

    server.create_instance(&fabric_config()).unwrap();
    assert_eq!(sizes(&server), (5, 2, 1, 4));
    assert_eq!(neighbors(&server), (0, 0, 2));
}

#[test]
fn test_project_manager_flap() {
    let mut server = topology(localhost(), true);
    for _ in 0..3 {
        server.delete_instance(FABRIC).unwrap();
        assert_eq!(sizes(&server), (0, 0, 0, 0));
        assert!(server.manager("green").is_none());

        server.create_instance(&fabric_config()).unwrap();
        assert_eq!(sizes(&server), (4, 1, 1, 3));
        assert_eq!(neighbors(&server), (0, 0, 2));
    }
}

#[test]
fn test_vrf_deleted() {
    let mut server = topology(localhost(), true);
    server.delete_instance("red").unwrap();
    assert_eq!(server.table_size("master"), Some(3));
    assert_eq!(server.table_size("green"), Some(2));
    assert_eq!(server.neighbors_count("green"), Some(1));
    assert!(server.delete_instance("red").is_err());
    assert!(server.delete_instance("master").is_err());
}

#[test]
fn test_unknown_instance() {
    let mut server = topology(localhost(), true);
    let prefix: MvpnPrefix = REMOTE_AD.parse().unwrap();
    assert!(server
        .add_route("purple", prefix, peer(), PathAttributes::default())
        .is_err());
    assert!(server
        .create_instance(&InstanceConfig::new("red", FABRIC))
        .is_err());
}

use crate::api::rpc::InstanceSummary;
use crate::rib::RoutingInstance;
use crate::utils::format_time_as_elapsed;

pub fn instance_to_summary(
    instance: &RoutingInstance,
    managed: bool,
    neighbors: Option<usize>,
) -> InstanceSummary {
    InstanceSummary {
        name: instance.name().to_string(),
        index: instance.id().index(),
        rd: instance.rd().to_string(),
        import_targets: instance
            .import_targets()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
        export_targets: instance
            .export_targets()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
        project_manager: instance.project_manager().map(String::from),
        managed,
        routes: instance.mvpn_table().len(),
        tree_routes: instance.ermvpn_table().len(),
        neighbors,
        created_at: instance.created().timestamp(),
        uptime: format_time_as_elapsed(instance.created()),
    }
}

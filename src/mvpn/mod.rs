//! MVPN replication engine
//!
//! Per routing instance, an [`MvpnManager`] derives Type 1, Type 3 and
//! Type 4 routes from the Type 1, 3, 5 and 7 routes visible in the instance's
//! table and from the ErmVpn tree routes of its project manager instance.
mod leaf_ad;
mod manager;
mod prefix;
mod project_manager;
mod spmsi;
mod tracker;
mod types;

#[cfg(test)]
mod tests;

pub use leaf_ad::{LeafAdEvent, LeafAdGenerator};
pub use manager::{LocalOrigin, MvpnManager};
pub use prefix::{ErmVpnPrefix, ErmVpnRouteType, MvpnPrefix};
pub use project_manager::{project_manager_of, resolve_pmsi, ErmVpnForest, McastForest};
pub use spmsi::SpmsiGenerator;
pub use tracker::{SpmsiEvent, Tracker, TrackerEvent, TrackerState};
pub use types::{MvpnNeighbor, MvpnRouteKind, PmsiInfo, SG};

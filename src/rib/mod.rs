pub mod attributes;
pub mod community;
pub mod database;
pub mod distinguisher;
pub mod ermvpn;
pub mod replicator;

pub use attributes::{PathAttributeCache, PathAttributes, PmsiTunnel, TunnelType};
pub use community::{EncapType, ExtCommunity, ExtCommunityList, RouteTarget};
pub use database::{Database, InstanceId, RoutingInstance, TableEvent};
pub use distinguisher::RouteDistinguisher;
pub use ermvpn::ErmVpnTable;

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::net::IpAddr;
use std::ops::RangeBounds;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::trace;

use crate::mvpn::MvpnPrefix;
use crate::utils::format_time_as_elapsed;

pub type MvpnTable = Table<MvpnPrefix>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSource {
    /// Originated by an MVPN manager on this node
    Local,
    Api,
    Peer(IpAddr),
    /// Copied from another table, `primary` owns the original path
    Replicated { primary: InstanceId },
}

impl PathSource {
    /// Lower is preferred during best-path selection
    fn preference(&self) -> u8 {
        use PathSource::*;
        match self {
            Local => 0,
            Api => 1,
            Peer(_) => 2,
            Replicated { .. } => 3,
        }
    }

    pub fn is_replicated(&self) -> bool {
        matches!(self, PathSource::Replicated { .. })
    }
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PathSource::*;
        let display = match self {
            Local => "Local".to_string(),
            Api => "API".to_string(),
            Peer(addr) => addr.to_string(),
            Replicated { primary } => format!("Replicated({})", primary),
        };
        write!(f, "{}", display)
    }
}

#[derive(Debug)]
pub struct Path {
    pub(crate) source: PathSource,
    pub(crate) attrs: Arc<PathAttributes>,
    // Time received
    pub(crate) timestamp: DateTime<Utc>,
}

impl Path {
    pub fn new(source: PathSource, attrs: Arc<PathAttributes>) -> Self {
        Self {
            source,
            attrs,
            timestamp: Utc::now(),
        }
    }

    pub fn source(&self) -> PathSource {
        self.source
    }

    pub fn attrs(&self) -> &Arc<PathAttributes> {
        &self.attrs
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Path source={} age={}>",
            self.source,
            format_time_as_elapsed(self.timestamp),
        )
    }
}

/// All paths known for a prefix, best path first
#[derive(Debug)]
pub struct Route<P> {
    prefix: P,
    paths: Vec<Arc<Path>>,
}

impl<P> Route<P> {
    fn new(prefix: P) -> Self {
        Self {
            prefix,
            paths: Vec::with_capacity(1),
        }
    }

    pub fn prefix(&self) -> &P {
        &self.prefix
    }

    pub fn best_path(&self) -> Option<&Arc<Path>> {
        self.paths.first()
    }

    pub fn paths(&self) -> &[Arc<Path>] {
        &self.paths
    }

    pub fn path_from(&self, source: &PathSource) -> Option<&Arc<Path>> {
        self.paths.iter().find(|p| &p.source == source)
    }

    /// Best path that was not copied in from another table
    pub fn best_primary_path(&self) -> Option<&Arc<Path>> {
        self.paths.iter().find(|p| !p.source.is_replicated())
    }

    /// Insert keeping paths ordered by preference, ties by arrival
    fn insert(&mut self, path: Arc<Path>) {
        let position = self
            .paths
            .iter()
            .position(|p| p.source.preference() > path.source.preference())
            .unwrap_or_else(|| self.paths.len());
        self.paths.insert(position, path);
    }
}

/// Routes of a single address family, keyed by prefix
#[derive(Debug)]
pub struct Table<P: Ord> {
    name: String,
    routes: BTreeMap<P, Route<P>>,
}

impl<P> Table<P>
where
    P: Ord + Clone + fmt::Display,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn find(&self, prefix: &P) -> Option<&Route<P>> {
        self.routes.get(prefix)
    }

    pub fn routes(&self) -> btree_map::Values<P, Route<P>> {
        self.routes.values()
    }

    pub fn range<R: RangeBounds<P>>(&self, range: R) -> btree_map::Range<P, Route<P>> {
        self.routes.range(range)
    }

    pub fn prefixes(&self) -> Vec<P> {
        self.routes.keys().cloned().collect()
    }

    /// Add or replace the path from `source`
    ///
    /// Returns false (and leaves the existing path object untouched) when
    /// the source already has a path with identical attributes.
    pub fn add_path(&mut self, prefix: P, source: PathSource, attrs: Arc<PathAttributes>) -> bool {
        let route = self
            .routes
            .entry(prefix.clone())
            .or_insert_with(|| Route::new(prefix.clone()));
        if let Some(index) = route.paths.iter().position(|p| p.source == source) {
            if route.paths[index].attrs == attrs {
                return false;
            }
            route.paths.remove(index);
        }
        trace!("[{}] Path for {} from {}", self.name, prefix, source);
        route.insert(Arc::new(Path::new(source, attrs)));
        true
    }

    /// Remove the path from `source`, dropping the route with its last path
    pub fn delete_path(&mut self, prefix: &P, source: &PathSource) -> bool {
        let (removed, now_empty) = match self.routes.get_mut(prefix) {
            Some(route) => {
                let before = route.paths.len();
                route.paths.retain(|p| &p.source != source);
                (route.paths.len() != before, route.paths.is_empty())
            }
            None => return false,
        };
        if now_empty {
            self.routes.remove(prefix);
        }
        if removed {
            trace!("[{}] Removed {} path for {}", self.name, source, prefix);
        }
        removed
    }

    /// Remove every path, returning the prefixes that held routes
    pub fn clear(&mut self) -> Vec<P> {
        let prefixes = self.prefixes();
        self.routes.clear();
        prefixes
    }
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::{PathAttributes, PathSource, Route, Table};
use crate::mvpn::{ErmVpnPrefix, SG};

/// Transport tree routes, indexed by (S,G) for global tree root lookups
#[derive(Debug)]
pub struct ErmVpnTable {
    table: Table<ErmVpnPrefix>,
    global_trees: HashMap<SG, BTreeSet<ErmVpnPrefix>>,
}

impl ErmVpnTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: Table::new(name),
            global_trees: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn find(&self, prefix: &ErmVpnPrefix) -> Option<&Route<ErmVpnPrefix>> {
        self.table.find(prefix)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route<ErmVpnPrefix>> {
        self.table.routes()
    }

    /// Global tree root route for an (S,G), if the tree has been built
    pub fn global_tree_root(&self, sg: &SG) -> Option<&Route<ErmVpnPrefix>> {
        self.global_trees
            .get(sg)
            .and_then(|prefixes| prefixes.iter().next())
            .and_then(|prefix| self.table.find(prefix))
    }

    pub fn add_path(
        &mut self,
        prefix: ErmVpnPrefix,
        source: PathSource,
        attrs: Arc<PathAttributes>,
    ) -> bool {
        if prefix.is_global_tree() {
            self.global_trees
                .entry(prefix.sg())
                .or_insert_with(BTreeSet::new)
                .insert(prefix);
        }
        self.table.add_path(prefix, source, attrs)
    }

    pub fn delete_path(&mut self, prefix: &ErmVpnPrefix, source: &PathSource) -> bool {
        let removed = self.table.delete_path(prefix, source);
        if prefix.is_global_tree() && self.table.find(prefix).is_none() {
            let sg = prefix.sg();
            if let Some(prefixes) = self.global_trees.get_mut(&sg) {
                prefixes.remove(prefix);
                if prefixes.is_empty() {
                    self.global_trees.remove(&sg);
                }
            }
        }
        removed
    }

    pub fn clear(&mut self) -> Vec<ErmVpnPrefix> {
        self.global_trees.clear();
        self.table.clear()
    }
}

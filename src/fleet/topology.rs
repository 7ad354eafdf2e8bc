//! Region Topology
//!
//! A static adjacency map from region to its neighbors, in declared order.
//! The declared order is the tie-break: rebalancing always spawns into the
//! first two distinct neighbors, which keeps replacement placement
//! deterministic and reproducible in tests.

use super::types::Region;
use std::collections::HashMap;

pub struct RegionTopology {
    neighbors: HashMap<Region, Vec<Region>>,
}

impl RegionTopology {
    /// Builds a topology from explicit adjacency lists.
    pub fn new(adjacency: Vec<(Region, Vec<Region>)>) -> Self {
        Self {
            neighbors: adjacency.into_iter().collect(),
        }
    }

    /// Builds a ring topology: each region's neighbors are the next and
    /// previous regions in the given order. Used as the default layout.
    pub fn ring(regions: &[&str]) -> Self {
        let n = regions.len();
        let mut adjacency = HashMap::new();

        for (i, name) in regions.iter().enumerate() {
            let mut list = Vec::new();
            if n > 1 {
                list.push(Region::new(regions[(i + 1) % n]));
            }
            if n > 2 {
                list.push(Region::new(regions[(i + n - 1) % n]));
            }
            adjacency.insert(Region::new(name), list);
        }

        Self {
            neighbors: adjacency,
        }
    }

    /// Neighbors of `region` in declared order. Unknown regions have none.
    pub fn neighbors_of(&self, region: &Region) -> &[Region] {
        self.neighbors
            .get(region)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Selects the regions to spawn replacement workers into: the first two
    /// distinct neighbors of `region`, excluding `region` itself.
    ///
    /// Returns fewer than two entries when the topology cannot provide them;
    /// the caller is responsible for raising that as an alert.
    pub fn spawn_targets(&self, region: &Region) -> Vec<Region> {
        let mut targets: Vec<Region> = Vec::with_capacity(2);

        for neighbor in self.neighbors_of(region) {
            if neighbor == region || targets.contains(neighbor) {
                continue;
            }
            targets.push(neighbor.clone());
            if targets.len() == 2 {
                break;
            }
        }

        targets
    }

    pub fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<Region> = self.neighbors.keys().cloned().collect();
        regions.sort();
        regions
    }
}

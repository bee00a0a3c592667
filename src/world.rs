//! World: the owning registry of nodes, links, vehicles and demand, plus
//! the construction API that builds a scenario before simulation starts.
//!
//! Grounded on `rust_qsim`'s `scenario.rs::GlobalScenario` (a single-owner
//! struct holding network/garage/population/config by value), replaced
//! here with direct `add_*` builder calls since spec §6 has no file-backed
//! scenario format.

use crate::config::WorldParams;
use crate::demand::Demand;
use crate::error::{Diagnostic, Result, SimError};
use crate::link::Link;
use crate::node::Node;
use crate::random::RandomStream;
use crate::routing::{LinkGraph, RoutingTables};
use crate::vehicle::Vehicle;
use ahash::AHashMap;
use std::collections::{HashSet, VecDeque};

pub struct World {
    pub params: WorldParams,
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) vehicles: Vec<Vehicle>,
    pub(crate) demands: Vec<Demand>,
    node_names: AHashMap<String, usize>,
    link_names: AHashMap<String, usize>,
    topology_frozen: bool,
    pub(crate) rng: RandomStream,
    pub(crate) routing: Option<RoutingTables>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) step: u32,
    pub(crate) t: f64,
    pub(crate) next_duo_step: u32,
    /// Vehicles generated but not yet admitted onto their first link,
    /// FIFO per origin node.
    pub(crate) pending: Vec<VecDeque<usize>>,
    pub(crate) last_step_speeds: Vec<f32>,
}

impl World {
    pub fn new(params: WorldParams) -> Result<Self> {
        params.validate()?;
        let seed = params.random_seed;
        Ok(World {
            params,
            nodes: Vec::new(),
            links: Vec::new(),
            vehicles: Vec::new(),
            demands: Vec::new(),
            node_names: AHashMap::default(),
            link_names: AHashMap::default(),
            topology_frozen: false,
            rng: RandomStream::new(seed),
            routing: None,
            diagnostics: Vec::new(),
            step: 0,
            t: 0.0,
            next_duo_step: 0,
            pending: Vec::new(),
            last_step_speeds: Vec::new(),
        })
    }

    fn check_mutable(&self) -> Result<()> {
        if self.topology_frozen {
            Err(SimError::TopologyFrozen)
        } else {
            Ok(())
        }
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> Result<usize> {
        self.check_mutable()?;
        let name = name.into();
        if self.node_names.contains_key(&name) {
            return Err(SimError::DuplicateName(name));
        }
        let id = self.nodes.len();
        self.node_names.insert(name.clone(), id);
        self.nodes.push(Node::new(id, name));
        Ok(id)
    }

    /// Sets a fixed-cycle signal plan: `intervals[i]` is phase `i`'s
    /// duration in seconds, cycle length `C = Σ intervals`. `[0.0]` (the
    /// default set by `add_node`) disables signaling entirely.
    pub fn set_signal_plan(&mut self, node: &str, intervals: Vec<f64>, offset: f64) -> Result<()> {
        self.check_mutable()?;
        let id = self.resolve_node(node)?;
        if intervals.is_empty() {
            return Err(SimError::InvalidParameter("signal_intervals must not be empty".into()));
        }
        self.nodes[id].signal_intervals = intervals;
        self.nodes[id].signal_offset = offset;
        Ok(())
    }

    pub fn resolve_node(&self, name: &str) -> Result<usize> {
        self.node_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownName(name.to_string()))
    }

    pub fn resolve_link(&self, name: &str) -> Result<usize> {
        self.link_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownName(name.to_string()))
    }

    /// Adds a link with default `capacity_out=-1` (unconstrained by anything
    /// but the fundamental diagram) and `signal_group=[0]`.
    pub fn add_link(
        &mut self,
        name: impl Into<String>,
        start_node: &str,
        end_node: &str,
        length: f32,
        free_flow_speed: f32,
        jam_density: f32,
        merge_priority: f32,
    ) -> Result<usize> {
        self.add_link_full(
            name,
            start_node,
            end_node,
            length,
            free_flow_speed,
            jam_density,
            merge_priority,
            -1.0,
            HashSet::from([0]),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_link_full(
        &mut self,
        name: impl Into<String>,
        start_node: &str,
        end_node: &str,
        length: f32,
        free_flow_speed: f32,
        jam_density: f32,
        merge_priority: f32,
        capacity_out: f32,
        signal_group: HashSet<usize>,
    ) -> Result<usize> {
        self.check_mutable()?;
        let name = name.into();
        if self.link_names.contains_key(&name) {
            return Err(SimError::DuplicateName(name));
        }
        if length <= 0.0 || free_flow_speed <= 0.0 || jam_density <= 0.0 {
            return Err(SimError::InvalidParameter(
                "length, free_flow_speed and jam_density must be > 0".into(),
            ));
        }
        let start = self.resolve_node(start_node)?;
        let end = self.resolve_node(end_node)?;

        let id = self.links.len();
        let link = Link::new(
            id,
            name.clone(),
            start,
            end,
            length,
            free_flow_speed,
            jam_density,
            merge_priority,
            capacity_out,
            signal_group,
            self.params.delta_n,
            self.params.tau,
        );
        self.link_names.insert(name, id);
        self.links.push(link);
        self.nodes[start].outgoing.push(id);
        self.nodes[end].incoming.push(id);
        Ok(id)
    }

    /// Adds a demand stream with no route override; generated vehicles fall
    /// through to DUO routing at every node.
    pub fn add_demand(
        &mut self,
        origin: &str,
        destination: &str,
        start_t: f64,
        end_t: f64,
        rate_veh_s: f64,
    ) -> Result<()> {
        self.add_demand_full(origin, destination, start_t, end_t, rate_veh_s, Vec::new())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_demand_full(
        &mut self,
        origin: &str,
        destination: &str,
        start_t: f64,
        end_t: f64,
        rate_veh_s: f64,
        preferred_links: Vec<usize>,
    ) -> Result<()> {
        self.check_mutable()?;
        if rate_veh_s < 0.0 {
            return Err(SimError::InvalidParameter(
                "rate_veh_s must be >= 0".into(),
            ));
        }
        if end_t <= start_t {
            return Err(SimError::InvalidParameter(
                "demand end_t must be > start_t".into(),
            ));
        }
        let origin = self.resolve_node(origin)?;
        let destination = self.resolve_node(destination)?;
        self.demands.push(Demand::new(
            origin,
            destination,
            start_t,
            end_t,
            rate_veh_s,
            preferred_links,
        ));
        Ok(())
    }

    /// Freezes topology and builds the link-to-link successor graph and
    /// routing tables. Must be called exactly once before `run`.
    pub fn initialize_adj_matrix(&mut self) -> Result<()> {
        self.check_mutable()?;
        self.topology_frozen = true;
        let num_links = self.links.len();
        let num_nodes = self.nodes.len();
        let total_steps = self.params.num_steps() as usize;
        for link in &mut self.links {
            link.reserve(total_steps);
        }
        self.routing = Some(RoutingTables::new(num_links, num_nodes, self.params.duo_update_weight));
        self.next_duo_step = 0;
        self.pending = vec![VecDeque::new(); num_nodes];
        Ok(())
    }

    /// Creates a `Home`-state vehicle and enqueues it at its origin node's
    /// pending-entry queue. Returns the new vehicle's id.
    pub(crate) fn spawn_vehicle(
        &mut self,
        origin: usize,
        destination: usize,
        preferred_links: Vec<usize>,
    ) -> usize {
        let id = self.vehicles.len();
        let mut veh = Vehicle::new(
            id,
            origin,
            destination,
            preferred_links,
            self.step,
            self.params.vehicle_log_mode,
        );
        // Demand generation releases a vehicle straight into the origin's
        // admission queue (there is no separate pre-generation roster), so
        // it is already past `home` the moment it exists.
        veh.state = crate::vehicle::VehicleState::Wait;
        self.vehicles.push(veh);
        self.pending[origin].push_back(id);
        id
    }

    pub(crate) fn link_graph(&self) -> (Vec<usize>, Vec<usize>, Vec<Vec<usize>>) {
        let start: Vec<usize> = self.links.iter().map(|l| l.start_node).collect();
        let end: Vec<usize> = self.links.iter().map(|l| l.end_node).collect();
        let outgoing: Vec<Vec<usize>> = self.nodes.iter().map(|n| n.outgoing.clone()).collect();
        (start, end, outgoing)
    }

    pub(crate) fn as_link_graph<'a>(
        start: &'a [usize],
        end: &'a [usize],
        outgoing: &'a [Vec<usize>],
        num_links: usize,
        num_nodes: usize,
    ) -> LinkGraph<'a> {
        LinkGraph {
            num_links,
            num_nodes,
            link_end_node: end,
            link_start_node: start,
            node_outgoing: outgoing,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn current_time(&self) -> f64 {
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> WorldParams {
        WorldParams::new("w", 1000.0, 5.0, 1.0)
    }

    #[test]
    fn duplicate_node_name_rejected() {
        let mut w = World::new(params()).unwrap();
        w.add_node("a").unwrap();
        assert_eq!(
            w.add_node("a").unwrap_err(),
            SimError::DuplicateName("a".into())
        );
    }

    #[test]
    fn unknown_node_in_link_rejected() {
        let mut w = World::new(params()).unwrap();
        w.add_node("a").unwrap();
        let err = w
            .add_link("l", "a", "b", 1000.0, 20.0, 0.2, 1.0)
            .unwrap_err();
        assert_eq!(err, SimError::UnknownName("b".into()));
    }

    #[test]
    fn topology_frozen_after_initialize() {
        let mut w = World::new(params()).unwrap();
        w.add_node("a").unwrap();
        w.add_node("b").unwrap();
        w.add_link("l", "a", "b", 1000.0, 20.0, 0.2, 1.0).unwrap();
        w.initialize_adj_matrix().unwrap();
        assert_eq!(w.add_node("c").unwrap_err(), SimError::TopologyFrozen);
    }

    #[test]
    fn seed_scenario_1_builds_single_link() {
        let mut w = World::new(WorldParams::new("s1", 1500.0, 1.0, 1.0)).unwrap();
        w.add_node("orig").unwrap();
        w.add_node("dest").unwrap();
        w.add_link("link", "orig", "dest", 10000.0, 20.0, 0.2, 1.0)
            .unwrap();
        w.add_demand("orig", "dest", 0.0, 1000.0, 0.5).unwrap();
        w.initialize_adj_matrix().unwrap();
        assert_eq!(w.links.len(), 1);
        assert_eq!(w.nodes.len(), 2);
    }
}

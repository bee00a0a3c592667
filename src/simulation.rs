//! Fixed-step simulation driver: `World::run`/`World::run_until`, demand
//! generation, node transfer resolution, periodic DUO recomputation.
//!
//! Grounded on `rust_qsim/src/simulation/simulation.rs::Simulation::run`
//! (`while now <= end_time { do_sim_step(now); now += 1 }` with periodic
//! `tracing::info!` progress logs) and `engines/network_engine.rs`
//! (`receive_vehicle` / `move_nodes` / `move_links` step ordering) — merged
//! directly onto `World` rather than kept as a separate `Simulation<C>`
//! wrapper, since this crate has one single-threaded `World` owning all
//! mutable state instead of the teacher's per-partition `ComputationalEnvironment`.

use crate::error::Result;
use crate::node::resolve_transfers;
use crate::world::World;
use tracing::{debug, info};

impl World {
    /// Advances the simulation by `duration` seconds (rounded up to whole
    /// steps). Equivalent to `run_until(current_time() + duration)`.
    pub fn run(&mut self, duration: f64) -> Result<()> {
        self.run_until(self.t + duration)
    }

    /// Advances the simulation up to and including the first step at or
    /// after `until_t`. Calling `run`/`run_until` repeatedly with
    /// contiguous endpoints reproduces exactly the same state as one call
    /// covering the whole span (spec's segmentation-equivalence property).
    pub fn run_until(&mut self, until_t: f64) -> Result<()> {
        if self.routing.is_none() {
            return Err(crate::error::SimError::InvalidParameter(
                "initialize_adj_matrix must run before simulation starts".into(),
            ));
        }
        let total_steps = self.params.num_steps();
        let print_mode = self.params.print_mode;

        while self.t < until_t - 1e-9 && self.step < total_steps && !self.is_finished() {
            self.do_sim_step();
            if print_mode && self.step % 100 == 0 {
                info!(step = self.step, t = self.t, "simulation progress");
            } else {
                debug!(step = self.step, t = self.t, "step complete");
            }
        }
        Ok(())
    }

    /// True once no platoon remains in `{home, wait, run}` and every demand
    /// window has elapsed — the engine's early termination condition
    /// alongside the hard `t_max` cutoff.
    pub fn is_finished(&self) -> bool {
        let all_demand_windows_elapsed = self.demands.iter().all(|d| self.t >= d.end_t);
        let no_active_vehicles = self.vehicles.iter().all(|v| !v.is_active());
        all_demand_windows_elapsed && no_active_vehicles
    }

    /// `true` while the driver would still advance on a further `run` call.
    pub fn is_running(&self) -> bool {
        self.step < self.params.num_steps() && !self.is_finished()
    }

    fn do_sim_step(&mut self) {
        let t = self.t;
        let tau = self.params.tau;
        let delta_n = self.params.delta_n;
        let step = self.step;

        self.generate_demand(t, tau, delta_n);
        self.check_demand_diagnostics(t);
        self.admit_pending(step, t);
        self.advance_links();
        self.transfer_at_nodes(step, t);
        self.release_storage();
        self.record_links();
        self.record_vehicles(step);

        self.step += 1;
        self.t = (self.step as f64) * tau;

        if self.step >= self.next_duo_step {
            self.update_routing();
        }
    }

    fn generate_demand(&mut self, t: f64, tau: f64, delta_n: f64) {
        let mut new_vehicles = Vec::new();
        for i in 0..self.demands.len() {
            let batch = self.demands[i].step(t, tau, delta_n);
            new_vehicles.extend(batch);
        }
        for (origin, destination, preferred) in new_vehicles {
            self.spawn_vehicle(origin, destination, preferred);
        }
    }

    fn check_demand_diagnostics(&mut self, t: f64) {
        for demand in &mut self.demands {
            if let Some(diag) = demand.check_diagnostic(t) {
                self.diagnostics.push(diag);
            }
        }
    }

    /// Admits vehicles waiting at each origin node onto their first link,
    /// respecting capacity (blocked vehicles stay queued, FIFO, per node).
    fn admit_pending(&mut self, now_step: u32, _now_t: f64) {
        let routing = self.routing.as_ref().unwrap();
        for node in 0..self.nodes.len() {
            loop {
                let Some(&vid) = self.pending[node].front() else {
                    break;
                };
                let dest = self.vehicles[vid].destination;
                let desired = self.vehicles[vid]
                    .next_preferred_link()
                    .or_else(|| routing.next_hop(node, dest));
                let Some(out_link) = desired else {
                    break;
                };
                if !self.links[out_link].can_admit(now_step, true) {
                    break;
                }
                self.links[out_link].consume_admission();
                self.links[out_link].push_tail(vid, &mut self.vehicles, now_step);
                self.vehicles[vid].state = crate::vehicle::VehicleState::Run;
                self.vehicles[vid].departure_step = Some(now_step);
                self.pending[node].pop_front();
            }
        }
    }

    fn advance_links(&mut self) {
        self.last_step_speeds.clear();
        self.last_step_speeds.reserve(self.links.len());
        for link in &mut self.links {
            self.last_step_speeds.push(link.advance_positions(&mut self.vehicles));
        }
    }

    fn transfer_at_nodes(&mut self, now_step: u32, now_t: f64) {
        let routing = self.routing.as_ref().unwrap();
        let end_nodes: Vec<usize> = self.links.iter().map(|l| l.end_node).collect();
        // spec's control flow resolves transfers "across nodes in randomized
        // order"; draw that per-step node permutation before the
        // per-node incoming-link permutation resolve_transfers draws itself.
        let node_order = self.rng.weighted_order(&vec![1.0f32; self.nodes.len()]);
        for node_idx in node_order {
            let node = self.nodes[node_idx].clone();
            resolve_transfers(
                &node,
                &mut self.links,
                &mut self.vehicles,
                &mut self.rng,
                now_step,
                now_t,
                |in_link, dest| routing.next_hop(end_nodes[in_link], dest),
            );
        }
    }

    fn release_storage(&mut self) {
        for link in &mut self.links {
            link.apply_released_storage();
        }
    }

    fn record_links(&mut self) {
        for (link, &avg_speed) in self.links.iter_mut().zip(self.last_step_speeds.iter()) {
            link.record_step(avg_speed);
        }
    }

    /// Appends one detailed-log sample per active vehicle, a no-op for
    /// vehicles built without `vehicle_log_mode`.
    fn record_vehicles(&mut self, now_step: u32) {
        for vehicle in &mut self.vehicles {
            if vehicle.is_active() {
                vehicle.record(now_step);
            }
        }
    }

    fn update_routing(&mut self) {
        let (start, end, outgoing) = self.link_graph();
        let graph = World::as_link_graph(&start, &end, &outgoing, self.links.len(), self.nodes.len());
        let instant: Vec<f32> = self
            .links
            .iter()
            .map(|l| l.traveltime_instant.last().copied().unwrap_or(l.length / l.free_flow_speed))
            .collect();
        let uncertainty = self.params.route_choice_uncertainty;
        let diags = self
            .routing
            .as_mut()
            .unwrap()
            .update(&graph, &instant, &mut self.rng, uncertainty);
        self.diagnostics.extend(diags);
        self.next_duo_step = self.step + self.params.duo_period_steps();
    }
}

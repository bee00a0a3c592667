//! Link dynamics: triangular fundamental diagram, FIFO platoon queue with
//! spacing-enforced shockwaves, flow-capacity and storage-capacity gating.
//!
//! Grounded on `rust_qsim`'s `network/flow_cap.rs` (`Flowcap`: fractional
//! accumulator so a sub-1-platoon-per-step capacity still throttles flow
//! correctly over several steps) and `network/storage_cap.rs` (`StorageCap`:
//! released storage only becomes available on the *next* step, to keep the
//! result independent of node-processing order). The position/shockwave
//! model itself follows spec §4.C directly: platoons advance by `u*tau` each
//! step, capped by the position of the platoon ahead minus the minimum jam
//! spacing, which reproduces the triangular FD without an explicit cell
//! array.

use crate::vehicle::Vehicle;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone)]
struct Flowcap {
    last_update_step: u32,
    accumulated: f64,
    capacity_per_step: f64,
}

impl Flowcap {
    fn new(capacity_per_step: f64) -> Self {
        Flowcap {
            last_update_step: 0,
            accumulated: capacity_per_step,
            capacity_per_step,
        }
    }

    fn update(&mut self, step: u32) {
        if step > self.last_update_step {
            let elapsed = (step - self.last_update_step) as f64;
            self.accumulated =
                (self.accumulated + elapsed * self.capacity_per_step).min(self.capacity_per_step);
            self.last_update_step = step;
        }
    }

    fn has_capacity(&self) -> bool {
        self.accumulated > 1e-9
    }

    fn consume(&mut self, n: f64) {
        self.accumulated -= n;
    }
}

#[derive(Debug, Clone)]
pub struct Link {
    pub id: usize,
    pub name: String,
    pub start_node: usize,
    pub end_node: usize,
    pub length: f32,
    pub free_flow_speed: f32,
    pub jam_density: f32,
    pub backward_wave_speed: f32,
    /// mu: the link's saturation flow, veh/s (spec §9 FD derivation).
    pub saturation_flow: f32,
    pub merge_priority: f32,
    /// -1 => unconstrained by an explicit cap (the FD's own mu still binds).
    pub capacity_out: f32,
    pub signal_group: HashSet<usize>,

    /// FIFO of vehicle ids; front = closest to the link's exit.
    pub(crate) queue: VecDeque<usize>,
    flowcap: Flowcap,
    storage_max: f64,
    storage_used: f64,
    storage_released: f64,

    delta_n: f64,
    tau: f32,

    arrival_total: f64,
    departure_total: f64,
    realized_tt_this_step: Vec<f32>,
    last_realized_tt: f32,
    realized_tt_sum: f64,
    realized_tt_sumsq: f64,
    realized_tt_count: u64,

    pub cum_arrival: Vec<f64>,
    pub cum_departure: Vec<f64>,
    pub traveltime_instant: Vec<f32>,
    pub traveltime_real: Vec<f32>,
}

impl Link {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        name: impl Into<String>,
        start_node: usize,
        end_node: usize,
        length: f32,
        free_flow_speed: f32,
        jam_density: f32,
        merge_priority: f32,
        capacity_out: f32,
        signal_group: HashSet<usize>,
        delta_n: f64,
        tau: f32,
    ) -> Self {
        // mu = quarter-jam free-flow capacity unless capacity_out overrides it.
        let default_mu = free_flow_speed * jam_density / 4.0;
        let mu = if capacity_out > 0.0 {
            capacity_out
        } else {
            default_mu
        };
        let w = mu / (jam_density - mu / free_flow_speed);

        let capacity_per_step = (mu as f64) * (tau as f64) / delta_n;
        let storage_max = (length as f64 * jam_density as f64 / delta_n).max(capacity_per_step);

        Link {
            id,
            name: name.into(),
            start_node,
            end_node,
            length,
            free_flow_speed,
            jam_density,
            backward_wave_speed: w,
            saturation_flow: mu,
            merge_priority,
            capacity_out,
            signal_group,
            queue: VecDeque::new(),
            flowcap: Flowcap::new(capacity_per_step),
            storage_max,
            storage_used: 0.0,
            storage_released: 0.0,
            delta_n,
            tau,
            arrival_total: 0.0,
            departure_total: 0.0,
            realized_tt_this_step: Vec::new(),
            last_realized_tt: length / free_flow_speed,
            realized_tt_sum: 0.0,
            realized_tt_sumsq: 0.0,
            realized_tt_count: 0,
            cum_arrival: Vec::new(),
            cum_departure: Vec::new(),
            traveltime_instant: Vec::new(),
            traveltime_real: Vec::new(),
        }
    }

    pub fn reserve(&mut self, steps: usize) {
        self.cum_arrival.reserve(steps);
        self.cum_departure.reserve(steps);
        self.traveltime_instant.reserve(steps);
        self.traveltime_real.reserve(steps);
    }

    pub fn num_platoons(&self) -> usize {
        self.queue.len()
    }

    /// Minimum bumper-to-bumper spacing between consecutive platoon heads,
    /// in link-length units, derived from jam density (spec §4.C).
    fn min_spacing(&self) -> f32 {
        (self.delta_n as f32) / self.jam_density
    }

    /// Advances every platoon's position, enforcing FIFO spacing. Returns
    /// the average speed of platoons on the link this step (free-flow speed
    /// if the link is empty), used for `traveltime_instant`.
    pub fn advance_positions(&mut self, vehicles: &mut [Vehicle]) -> f32 {
        let dt = self.tau;
        let min_spacing = self.min_spacing();
        let mut prev_pos: Option<f32> = None;
        let mut speed_sum = 0.0f32;
        let mut count = 0u32;

        for &vid in self.queue.iter() {
            let veh = &mut vehicles[vid];
            let free_target = (veh.position + self.free_flow_speed * dt).min(self.length);
            let capped = match prev_pos {
                Some(p) => free_target.min(p - min_spacing),
                None => free_target,
            };
            let new_pos = capped.max(veh.position);
            let speed = if dt > 0.0 {
                (new_pos - veh.position) / dt
            } else {
                0.0
            };
            veh.position = new_pos;
            veh.speed = speed;
            speed_sum += speed;
            count += 1;
            prev_pos = Some(new_pos);
        }

        if count > 0 {
            speed_sum / count as f32
        } else {
            self.free_flow_speed
        }
    }

    /// True when the front platoon has reached the link's tail and may
    /// contend for transfer at the end node.
    pub fn front_ready(&self, vehicles: &[Vehicle]) -> Option<usize> {
        self.queue
            .front()
            .copied()
            .filter(|&vid| vehicles[vid].position >= self.length - 1e-6)
    }

    /// Whether one more platoon may be admitted onto the link's head this
    /// step: signal state, flow capacity and storage capacity must all
    /// allow it.
    pub fn can_admit(&mut self, now_step: u32, signal_open: bool) -> bool {
        if !signal_open {
            return false;
        }
        self.flowcap.update(now_step);
        if !self.flowcap.has_capacity() {
            return false;
        }
        self.storage_max - self.storage_used >= 1.0 - 1e-9
    }

    /// Consumes one platoon's worth of this link's outflow capacity and
    /// head-of-link storage (called once per admitted platoon).
    pub fn consume_admission(&mut self) {
        self.flowcap.consume(1.0);
        self.storage_used = (self.storage_used + 1.0).min(self.storage_max);
    }

    /// Schedules one platoon's worth of storage to be released on the next
    /// step (teacher's `StorageCap::release`/`apply_released` ordering).
    fn schedule_release(&mut self) {
        self.storage_released += 1.0;
    }

    pub fn apply_released_storage(&mut self) {
        self.storage_used = (self.storage_used - self.storage_released).max(0.0);
        self.storage_released = 0.0;
    }

    /// Test-only: saturates storage so `can_admit` reports no room. Used by
    /// `node.rs`'s diverge-blocking test.
    #[cfg(any(test, feature = "test_util"))]
    pub fn storage_test_fill_to_max(&mut self) {
        self.storage_used = self.storage_max;
    }

    /// Admits `vehicle_id` at the link head (position 0), appended to the
    /// FIFO tail.
    pub fn push_tail(&mut self, vehicle_id: usize, vehicles: &mut [Vehicle], now_step: u32) {
        let veh = &mut vehicles[vehicle_id];
        veh.position = 0.0;
        veh.current_link = Some(self.id);
        veh.link_entry_step = now_step;
        self.queue.push_back(vehicle_id);
        self.arrival_total += 1.0;
    }

    /// Removes the front platoon (caller must have confirmed `front_ready`).
    /// Records its realized travel time, credits it with having fully
    /// traversed this link's length, and releases one unit of storage
    /// (deferred to next step).
    pub fn pop_front(&mut self, vehicles: &mut [Vehicle], now_step: u32) -> usize {
        let vid = self.queue.pop_front().expect("pop_front on empty link");
        self.departure_total += 1.0;
        self.schedule_release();
        let entry = vehicles[vid].link_entry_step;
        let tt = (now_step - entry) as f32 * self.tau;
        self.realized_tt_this_step.push(tt);
        self.realized_tt_sum += tt as f64;
        self.realized_tt_sumsq += (tt as f64) * (tt as f64);
        self.realized_tt_count += 1;
        vehicles[vid].distance += self.length;
        vid
    }

    /// Mean and (population) standard deviation of realized travel times
    /// over every platoon that has ever departed this link. Falls back to
    /// the free-flow time and zero spread before any platoon has departed.
    pub fn travel_time_stats(&self) -> (f32, f32) {
        if self.realized_tt_count == 0 {
            return (self.length / self.free_flow_speed, 0.0);
        }
        let n = self.realized_tt_count as f64;
        let mean = self.realized_tt_sum / n;
        let variance = (self.realized_tt_sumsq / n - mean * mean).max(0.0);
        (mean as f32, variance.sqrt() as f32)
    }

    /// Appends one snapshot to every per-step time series. Call exactly
    /// once per link per simulation step.
    pub fn record_step(&mut self, avg_speed: f32) {
        self.cum_arrival.push(self.arrival_total);
        self.cum_departure.push(self.departure_total);
        let v_eff = if avg_speed > 1e-6 {
            avg_speed
        } else {
            self.free_flow_speed
        };
        self.traveltime_instant.push(self.length / v_eff);

        if !self.realized_tt_this_step.is_empty() {
            let sum: f32 = self.realized_tt_this_step.iter().sum();
            self.last_realized_tt = sum / self.realized_tt_this_step.len() as f32;
            self.realized_tt_this_step.clear();
        }
        self.traveltime_real.push(self.last_realized_tt);
    }

    fn step_index(&self, t: f64) -> usize {
        ((t / self.tau as f64).floor() as usize).min(self.cum_arrival.len().saturating_sub(1))
    }

    /// Vehicles per second entering the link over `(t1, t2]`.
    pub fn inflow(&self, t1: f64, t2: f64) -> f64 {
        if self.cum_arrival.is_empty() || t2 <= t1 {
            return 0.0;
        }
        let a = self.cum_arrival[self.step_index(t1)];
        let b = self.cum_arrival[self.step_index(t2)];
        (b - a) * self.delta_n / (t2 - t1)
    }

    /// Vehicles per second leaving the link over `(t1, t2]`.
    pub fn outflow(&self, t1: f64, t2: f64) -> f64 {
        if self.cum_departure.is_empty() || t2 <= t1 {
            return 0.0;
        }
        let a = self.cum_departure[self.step_index(t1)];
        let b = self.cum_departure[self.step_index(t2)];
        (b - a) * self.delta_n / (t2 - t1)
    }
}

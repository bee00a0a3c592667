//! Vehicle (platoon) life-cycle, grounded on `rust_qsim`'s `QVehicle`
//! (`src/simulation/q_vehicle.rs`: a route-progress cursor plus
//! `advance_route_index`/`current_link_id`), generalized from matsim's
//! activity/leg plan structure to the home->wait->run->end states of
//! spec §3.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Home,
    Wait,
    Run,
    End,
}

impl VehicleState {
    pub fn code(self) -> u8 {
        match self {
            VehicleState::Home => 0,
            VehicleState::Wait => 1,
            VehicleState::Run => 2,
            VehicleState::End => 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VehicleLog {
    pub t: Vec<u32>,
    pub state: Vec<u8>,
    pub link: Vec<i64>,
    pub x: Vec<f32>,
    pub v: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: usize,
    pub origin: usize,
    pub destination: usize,
    pub preferred_links: Vec<usize>,
    route_cursor: usize,
    pub state: VehicleState,
    pub current_link: Option<usize>,
    pub position: f32,
    pub speed: f32,
    /// Sum of the full length of every link this platoon has completed.
    /// Does not include progress on the current (not yet completed) link —
    /// see `total_distance`.
    pub distance: f32,
    pub generation_step: u32,
    pub link_entry_step: u32,
    pub departure_step: Option<u32>,
    pub arrival_step: Option<u32>,
    pub log: Option<VehicleLog>,
}

impl Vehicle {
    pub fn new(
        id: usize,
        origin: usize,
        destination: usize,
        preferred_links: Vec<usize>,
        generation_step: u32,
        detailed_log: bool,
    ) -> Self {
        Vehicle {
            id,
            origin,
            destination,
            preferred_links,
            route_cursor: 0,
            state: VehicleState::Home,
            current_link: None,
            position: 0.0,
            speed: 0.0,
            distance: 0.0,
            generation_step,
            link_entry_step: 0,
            departure_step: None,
            arrival_step: None,
            log: detailed_log.then(VehicleLog::default),
        }
    }

    /// Appends one `(t, state, link, x, v)` sample if detailed logging is on.
    pub fn record(&mut self, t: u32) {
        if let Some(log) = self.log.as_mut() {
            log.t.push(t);
            log.state.push(self.state.code());
            log.link
                .push(self.current_link.map(|l| l as i64).unwrap_or(-1));
            log.x.push(self.position);
            log.v.push(self.speed);
        }
    }

    /// Next link from the preferred-route override, if one remains.
    pub fn next_preferred_link(&mut self) -> Option<usize> {
        let link = self.preferred_links.get(self.route_cursor).copied();
        if link.is_some() {
            self.route_cursor += 1;
        }
        link
    }

    /// Total distance traveled so far: every fully-completed link's length
    /// plus progress on the current link, if still active.
    pub fn total_distance(&self) -> f32 {
        if self.current_link.is_some() {
            self.distance + self.position
        } else {
            self.distance
        }
    }

    pub fn travel_time(&self, tau: f64) -> Option<f64> {
        match (self.departure_step, self.arrival_step) {
            (Some(d), Some(a)) => Some((a - d) as f64 * tau),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            VehicleState::Home | VehicleState::Wait | VehicleState::Run
        )
    }
}

//! A mesoscopic dynamic traffic assignment engine: kinematic-wave (LWR)
//! link dynamics with a triangular fundamental diagram, priority-proportional
//! node merges, FIFO-blocking diverges, and periodic dynamic user-optimal
//! route choice.
//!
//! Build a scenario with [`World::new`] and the `add_node`/`add_link`/
//! `add_demand` builders, finish construction with
//! [`World::initialize_adj_matrix`], then advance it with
//! [`World::run`]/[`World::run_until`].

pub mod config;
pub mod demand;
pub mod error;
pub mod link;
pub mod logging;
pub mod node;
pub mod query;
pub mod random;
pub mod routing;
mod simulation;
pub mod vehicle;
pub mod world;

pub use config::WorldParams;
pub use error::{Diagnostic, Result, SimError};
pub use world::World;

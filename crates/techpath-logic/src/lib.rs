//! Pure simulation logic for TechPath.
//!
//! This crate models an energy-technology dependency graph (enabling
//! technologies → milestones → reactor concepts) and answers one question:
//! which technology, accelerated by one year now, buys the most discounted
//! clean energy? Everything here is deterministic and free of I/O; callers
//! hand in a parsed graph and a configuration and get plain data back.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Simulation constants (discounting, plant size, thresholds) |
//! | [`critical_path`] | Memoized max-time / product-probability path evaluation |
//! | [`energy`] | Discount factors and plant output arithmetic |
//! | [`error`] | Error type shared by graph construction and evaluation |
//! | [`graph`] | Node/edge data model, adjacency, degree metrics |
//! | [`outlook`] | Static per-pathway deployment outlook, enabling-tech tiers |
//! | [`readiness`] | Readiness level → probability and time estimates |
//! | [`scheduler`] | Year-by-year status and marginal impact tables |
//! | [`state`] | Per-run node state and the yearly update rule |
//! | [`strategic`] | Forward deployment simulation and investment ranking |

pub mod config;
pub mod critical_path;
pub mod energy;
pub mod error;
pub mod graph;
pub mod outlook;
pub mod readiness;
pub mod scheduler;
pub mod state;
pub mod strategic;

pub use config::SimulationConfig;
pub use error::{SimError, SimResult};
pub use graph::{GraphData, TechGraph};

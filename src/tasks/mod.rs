//! Background Tasks Module
//!
//! Contains background tasks that run periodically during proxy operation.
//!
//! # Tasks
//! - Eviction sweep: Enforces the capacity and lifetime bounds at a fixed period

mod sweeper;

pub use sweeper::{spawn_sweep_task, SweepTask};

//! Background refresh of tracked-location weather snapshots
//!
//! Every cycle lists all tracked locations, fetches current conditions for
//! each one independently and overwrites its snapshot, recording provider
//! failures as error markers instead of aborting the cycle.

pub mod scheduler;

pub use scheduler::*;

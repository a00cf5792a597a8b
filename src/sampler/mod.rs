//! Randomized execution-configuration sampling.
//!
//! `knobs` defines the closed value space of every tuning knob and how a
//! sampled configuration renders into env/argv; `service` owns the shared
//! seeded generator the workers draw from.

pub mod knobs;
pub mod service;

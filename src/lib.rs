#![forbid(unsafe_code)]

//! gosoak — randomized soak-test harness for Go test suites.
//!
//! Repeatedly executes compiled test binaries under randomly perturbed
//! runtime tuning (GOMAXPROCS, GOGC, GOGCTRACE, GOTRACEBACK) and
//! execution modifiers (`-test.cpu` shards, short/verbose/bench flags,
//! `sudo`/`strace` prefixes), with a bounded worker pool and per-target
//! repetition/time budgets. The goal is to surface concurrency and
//! resource-management bugs in the runtime under combinatorially varied
//! tuning, not to judge individual test outcomes.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use gosoak::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use gosoak::harness::driver::run_from_config;
//! use gosoak::sampler::service::SamplerService;
//! ```

pub mod prelude;

pub mod core;
pub mod discovery;
pub mod exec;
pub mod harness;
pub mod logger;
pub mod sampler;
pub mod work;

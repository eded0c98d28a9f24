//! Deterministic simulation harness for the framelink channel.
//!
//! [`SimWorld`] implements the core's host seams over an in-memory frame
//! tree with a same-origin access rule, a single-threaded notification
//! queue, and a virtual clock. [`SimEnv`] makes every identity and nonce
//! reproducible from a seed.
//!
//! # Scenarios
//!
//! [`Scenario`] wires up the common two-frame topology, runs a handshake and
//! a batch of messages, and checks an oracle against the outcome.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenario;
pub mod sim_env;
pub mod sim_world;

pub use scenario::{Oracle, Scenario, ScenarioConfig, ScenarioError, ScenarioWorld};
pub use sim_env::SimEnv;
pub use sim_world::{SimError, SimWorld};

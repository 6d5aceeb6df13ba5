// src/scenario/mod.rs

//! Scripted player sessions.
//!
//! The host tree is external to the guard, so the binary drives it with a
//! replayed session instead:
//! - a scenario file (`model.rs`) lists setup actions and timed steps,
//! - the player (`player.rs`) applies them to a [`MemoryDocument`] while
//!   the engine runs, and finally requests shutdown.
//!
//! [`MemoryDocument`]: crate::dom::MemoryDocument

pub mod model;
pub mod player;

pub use model::{Action, Scenario, Step};
pub use player::{ScenarioPlayer, describe_node};

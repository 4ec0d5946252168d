//! Concierge: step-progression engine for travel booking workflows.
//!
//! A booking request becomes a workflow of ordered steps (flight, hotel,
//! visa, activities, payment). The engine drives each step through
//! pending, in-progress, and completed states with positional
//! auto-advance, keeps a local copy reconciled with the remote store
//! through a polling sync coordinator, and decorates steps with travel
//! advisories.

pub mod advisory;
pub mod config;
pub mod logging;
pub mod parser;
pub mod rest;
pub mod store;
pub mod sync;
pub mod workflow;

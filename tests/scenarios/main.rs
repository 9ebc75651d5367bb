//! Scenario-based tests for relay

#[path = "../helpers.rs"]
mod helpers;

mod failure_handling;
mod success_chain;

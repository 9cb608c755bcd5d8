//! Test suites for the agent.

mod connection_behaviour;
mod support;

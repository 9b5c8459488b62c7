//! Split-routing of token swaps across a network of AMM pools.
//!
//! A [`crate::core::token_graph::LiquidityGraph`] snapshot is built from the current
//! pool set, and the [`orchestrator`] entry points turn a
//! [`types::RouteRequest`] into a [`crate::core::types::MultiRoute`]: a list of legs,
//! possibly spread over several parallel paths, ready for an on-chain encoder.

pub mod config;
pub mod core;
pub mod orchestrator;
pub mod types;

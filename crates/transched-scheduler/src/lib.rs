//! transched-scheduler: round-based transfer scheduling
//!
//! This crate decides which transfers run in each round:
//! - Per-round capacity accounting
//! - Scheduling strategies (in-order, greedy, capacity-split colouring and
//!   matching, flow-bipartite)
//! - Graph transforms and algorithms backing them
//! - Bypass relay overlay
//! - The round driver and run report

pub mod bypass;
pub mod coloring;
pub mod driver;
pub mod euler;
pub mod flow;
pub mod greedy;
pub mod ledger;
pub mod matching;
pub mod maxflow;
pub mod split;
pub mod strategy;

pub use bypass::{BypassOverlay, RelayHop};
pub use driver::{RoundDriver, RoundObserver, RoundRecord, RunReport};
pub use ledger::CapacityLedger;
pub use strategy::{build_strategy, dispatch_in_order, InOrder, Strategy};

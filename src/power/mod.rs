//! Node power control
//!
//! The [`ZNodes`] controller plus the reports it produces.

mod controller;
mod fanout;
mod report;

pub use controller::{ZNodes, ZNodesBuilder};
pub use report::{PowerAction, PowerMode, PowerReport};

//! Engine-log histograms: bins logged channels into a 17x17 RPM by
//! pressure-ratio grid and reduces single channels to triangulated
//! surfaces for 3D display.

pub mod data;
pub mod error;
pub mod processing;
pub mod render;
pub mod report;
pub mod session;
pub mod state;
pub mod triangulation;

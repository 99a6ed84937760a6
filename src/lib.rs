//! Gated Traffic Library
//!
//! A grid-based pedestrian flow simulation where intersections admit one
//! walker at a time through signal-controlled gates.

pub mod simulation;
pub mod stats;

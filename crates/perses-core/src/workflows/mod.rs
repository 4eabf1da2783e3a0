//! # Workflows Module
//!
//! High-level entry points that run a complete geometry proposal for a topology change.
//!
//! ## Overview
//!
//! A workflow validates its inputs, drives a geometry engine through the forward proposal
//! and, when requested, the reverse evaluation, and reports each phase through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter). The result carries
//! everything an RJMC acceptance test needs from the geometry: the proposed positions and
//! the log-probabilities in both directions.
//!
//! - **Proposal Workflow** ([`propose`]) - Forward proposal plus optional reverse evaluation

pub mod propose;

//! Repominer - failure-prone file mining for Infrastructure-as-Code
//!
//! Finds fixing commits, blames them back to the commits that introduced
//! each defect, and labels every file version in between.

pub mod classifier;
pub mod config;
pub mod git;
pub mod issues;
pub mod languages;
pub mod mining;
pub mod models;

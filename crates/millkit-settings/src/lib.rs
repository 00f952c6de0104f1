//! millkit Settings Crate
//!
//! Handles job configuration: loading, saving and validation.

pub mod config;

pub use config::{
    ClearanceSettings, FinishingSettings, JobConfig, JoinStyle, KernelSettings, PocketSettings, SafetyKind,
    SafetySettings,
};

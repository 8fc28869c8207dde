#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![allow(missing_docs)]

pub mod aliases;
pub mod constants;
pub mod control;
pub mod phase;
pub mod scenario;

pub use phase::Phase;
pub use scenario::{ScenarioKey, TestMetadata};

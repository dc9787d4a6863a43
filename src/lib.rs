#![warn(clippy::all, rust_2018_idioms)]

//! EDX spectrum analysis: normalize spectra onto a common energy grid,
//! subtract background, find peaks and match them against reference
//! emission lines.

pub mod background;
pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod matcher;
pub mod normalizer;
pub mod peak_finder;
pub mod pipeline;
pub mod reference;
pub mod spectrum_reader;

pub use config::AnalysisConfig;
pub use error::EdxError;
pub use pipeline::{AnalysisOutput, AnalysisResult, Pipeline, RunState};

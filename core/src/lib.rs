//! Balanced-subset extraction and MLP classification for the Elliptic
//! bitcoin transaction dataset.
//!
//! Two stages, coupled only through files on disk:
//!   - `balancer`: raw classes/edges/features -> balanced, truncated subset
//!   - `trainer`:  balanced subset -> scaled MLP -> held-out report

pub mod balancer;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod mlp;
pub mod rng;
pub mod scaler;
pub mod split;
pub mod table;
pub mod trainer;
pub mod types;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};

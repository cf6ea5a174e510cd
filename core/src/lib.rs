//! demobank-core: synthetic data for a six-store demo bank.
//!
//! Data flow:
//!   Orchestrator → ScaleConfig (sizes) → phases (read the registry,
//!   draw unique values) → RecordSink (batched writes per store) →
//!   committed identifiers back into the registry for later phases.

pub mod config;
pub mod distribution;
pub mod error;
pub mod name_generator;
pub mod orchestrator;
pub mod phase;
pub mod registry;
pub mod rng;
pub mod scale;
pub mod store;
pub mod types;
pub mod unique;

pub mod banking_phase;
pub mod compliance_phase;
pub mod customer_phase;
pub mod engagement_phase;
pub mod insurance_phase;
pub mod lending_phase;
pub mod workforce_phase;

pub use config::{GenConfig, StorePaths};
pub use error::{GenError, GenResult};
pub use orchestrator::{Orchestrator, PhaseResult, PhaseState, RunReport, RunStatus};
pub use registry::{IdentifierRegistry, SamplePolicy, TagFilter};
pub use store::{RecordSink, StoreName, StoreSet};
pub use unique::UniquenessLedger;

//! Services - business logic and state management
//!
//! This module contains the core pipeline services:
//! - `pipeline` - Per-sample ingestion: validate, persist, evaluate, publish
//! - `transitions` - Per-(vehicle, zone) containment state and transition detection
//! - `router` - Shard workers serializing samples per vehicle

pub mod pipeline;
pub mod router;
pub mod transitions;

// Re-export commonly used types
pub use pipeline::{IngestError, IngestReport, IngestionPipeline, ValidationError};
pub use router::{spawn_ingest_shards, IngestSender, RouteError};
pub use transitions::TransitionTracker;

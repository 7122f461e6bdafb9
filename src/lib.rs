// Re-export modules for testing and external use
pub mod formatters {
    pub mod output;

    pub use output::OutputFormatter;
}

pub mod shared {
    pub mod logging;
    pub mod utils;
}

pub mod terraform {
    pub mod analyzer;
    pub mod codec;
    pub mod document;
    pub mod generator;
    pub mod schema;
}

pub mod graph {
    pub mod graph;
    pub mod infer;
    pub mod model;
}

pub mod project {
    pub mod bundle;
    pub mod loader;
}

pub mod core {
    pub mod engine;
}

pub mod config;

// Re-export commonly used types for easier testing and external use
pub use crate::core::engine::{CanvasEngine, EngineError, IngestSummary};
pub use crate::graph::graph::{AnchorRole, ResourceGraph, Scope};
pub use crate::graph::model::{
    CompositeBlock, Connection, Point, ResourceNode, Size, Variable, VariableType,
};
pub use crate::terraform::generator::{CodeGenerator, GeneratedArtifacts};
pub use crate::terraform::schema::{ResourceKind, SchemaProvider};

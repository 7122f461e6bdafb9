//! Persisted project bundle: a directory of independently serialized JSON
//! collections. Edges reference nodes by id and are re-linked on load; a
//! bundle whose edges point at missing nodes loads with an empty edge list
//! rather than failing.

use crate::graph::graph::ResourceGraph;
use crate::graph::model::{CompositeBlock, Connection, ResourceNode, Variable};
use crate::shared::logging;
use crate::terraform::schema::SchemaProvider;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PROJECT_FILE: &str = "project.json";
pub const NODES_FILE: &str = "nodes.json";
pub const VARIABLES_FILE: &str = "variables.json";
pub const CONNECTIONS_FILE: &str = "connections.json";
pub const COMPOSITES_FILE: &str = "composites.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ProjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            format_version: FORMAT_VERSION,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// Write the whole bundle. In-memory state is never mutated here; an IO
/// failure surfaces with the file and operation that failed.
pub async fn save(dir: &Path, meta: &ProjectMeta, graph: &ResourceGraph) -> Result<(), BundleError> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| BundleError::Io {
        operation: "create",
        path: dir.display().to_string(),
        source: e,
    })?;

    write_json(&dir.join(PROJECT_FILE), meta).await?;
    write_json(&dir.join(NODES_FILE), &graph.nodes().to_vec()).await?;
    write_json(&dir.join(VARIABLES_FILE), &graph.variables().to_vec()).await?;
    write_json(&dir.join(CONNECTIONS_FILE), &graph.connections().to_vec()).await?;
    write_json(&dir.join(COMPOSITES_FILE), &graph.composites().to_vec()).await?;
    logging::info(&format!("project saved to {}", dir.display()));
    Ok(())
}

/// Read the bundle back into a fresh graph. Connections are re-linked
/// against the loaded nodes; if any referenced id is missing, the edge
/// list loads empty and a warning is logged.
pub async fn load(
    dir: &Path,
    schema: SchemaProvider,
) -> Result<(ProjectMeta, ResourceGraph), BundleError> {
    let meta: ProjectMeta = read_json(&dir.join(PROJECT_FILE)).await?;
    let nodes: Vec<ResourceNode> = read_json(&dir.join(NODES_FILE)).await?;
    let variables: Vec<Variable> = read_json_or_default(&dir.join(VARIABLES_FILE)).await?;
    let connections: Vec<Connection> = read_json_or_default(&dir.join(CONNECTIONS_FILE)).await?;
    let composites: Vec<CompositeBlock> = read_json_or_default(&dir.join(COMPOSITES_FILE)).await?;

    let connections = relink_connections(connections, &nodes, &composites);
    let graph = ResourceGraph::from_parts(schema, nodes, variables, connections, composites);
    Ok((meta, graph))
}

fn relink_connections(
    connections: Vec<Connection>,
    nodes: &[ResourceNode],
    composites: &[CompositeBlock],
) -> Vec<Connection> {
    let known = |id: &uuid::Uuid| {
        nodes.iter().any(|n| n.id == *id)
            || composites
                .iter()
                .any(|c| c.children.iter().any(|n| n.id == *id))
    };
    let dangling = connections
        .iter()
        .any(|c| !known(&c.source_id) || !known(&c.target_id));
    if dangling {
        logging::warn("bundle connections reference missing nodes; loading with no edges");
        return Vec::new();
    }
    connections
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BundleError> {
    let encoded = serde_json::to_vec_pretty(value).map_err(|e| BundleError::Decode {
        path: path.display().to_string(),
        source: e,
    })?;
    tokio::fs::write(path, encoded).await.map_err(|e| BundleError::Io {
        operation: "write",
        path: path.display().to_string(),
        source: e,
    })
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| BundleError::Io {
        operation: "read",
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| BundleError::Decode {
        path: path.display().to_string(),
        source: e,
    })
}

/// Missing collection files load as empty rather than failing the bundle.
async fn read_json_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, BundleError> {
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path).await
}

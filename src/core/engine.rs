use crate::config::Config;
use crate::formatters::output::OutputFormatter;
use crate::graph::graph::ResourceGraph;
use crate::graph::infer;
use crate::graph::model::Variable;
use crate::project::bundle::{self, BundleError, ProjectMeta};
use crate::project::loader;
use crate::shared::logging;
use crate::terraform::document::{self, ParseResult, ResourceRecord};
use crate::terraform::generator::{CodeGenerator, GenerateError, GeneratedArtifacts};
use crate::terraform::schema::SchemaProvider;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("nothing to generate: the canvas has no resources")]
    GenerationRefused,

    #[error(transparent)]
    Persistence(#[from] BundleError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outcome of one ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub nodes: usize,
    pub variables: usize,
    pub failed_documents: usize,
}

/// Orchestrates the round-trip pipeline: ingestion, the in-memory graph,
/// dependency inference and code generation.
pub struct CanvasEngine {
    config: Config,
    schema: SchemaProvider,
    graph: ResourceGraph,
    meta: ProjectMeta,
}

impl CanvasEngine {
    pub fn new(config: Config) -> Self {
        let schema = SchemaProvider::new();
        let graph = ResourceGraph::new(schema.clone());
        let name = config
            .project
            .name
            .clone()
            .unwrap_or_else(|| "untitled".to_string());
        Self {
            config,
            schema,
            graph,
            meta: ProjectMeta::new(name),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ResourceGraph {
        &mut self.graph
    }

    pub fn schema(&self) -> &SchemaProvider {
        &self.schema
    }

    /// Parse the documents and replace the graph with the result in one
    /// step. The previous graph stays visible until the replacement is
    /// complete; a malformed document contributes nothing and is logged,
    /// never raised.
    pub fn ingest_documents(&mut self, documents: &[String]) -> IngestSummary {
        let (result, failed_documents) = self.parse_documents(documents);

        let mut next = ResourceGraph::new(self.schema.clone());
        for node in document::convert_to_nodes(&result.resources, &self.schema) {
            next.add_node(node);
        }
        for variable in result.variables {
            next.add_variable(variable);
        }

        let summary = IngestSummary {
            nodes: next.nodes().len(),
            variables: next.variables().len(),
            failed_documents,
        };
        self.graph = next;
        logging::info(&format!(
            "ingested {} nodes, {} variables ({} documents failed to parse)",
            summary.nodes, summary.variables, summary.failed_documents
        ));
        summary
    }

    /// Parse without touching the graph and return a structured summary.
    pub fn analyze_documents(&self, documents: &[String]) -> serde_json::Value {
        let (result, _) = self.parse_documents(documents);
        OutputFormatter::format_analysis(&result, &self.schema)
    }

    fn parse_documents(&self, documents: &[String]) -> (ParseResult, usize) {
        let mut merged = ParseResult::default();
        let mut failed = 0;
        for (index, text) in documents.iter().enumerate() {
            match document::parse(text) {
                Ok(result) => {
                    for record in result.resources {
                        merge_record(&mut merged.resources, record);
                    }
                    for variable in result.variables {
                        merge_variable(&mut merged.variables, variable);
                    }
                }
                Err(err) => {
                    failed += 1;
                    logging::error(&format!("document {} failed to parse: {}", index + 1, err));
                    tracing::warn!(document = index, error = %err, "parse failure");
                }
            }
        }
        (merged, failed)
    }

    /// Run dependency inference over the drawn connections, then render
    /// the artifact set.
    pub fn generate(&mut self) -> Result<GeneratedArtifacts, EngineError> {
        let summary = infer::apply(&mut self.graph);
        logging::info(&format!(
            "inference resolved {} references, {} ordering constraints",
            summary.resolved, summary.ordering
        ));

        let nodes: Vec<_> = self.graph.all_nodes().cloned().collect();
        let generator = CodeGenerator::new(&self.schema, self.config.provider.region.clone());
        generator
            .generate(&nodes, self.graph.variables())
            .map_err(|e| match e {
                GenerateError::EmptyGraph => EngineError::GenerationRefused,
            })
    }

    /// Generate and write the artifacts. Everything is rendered in memory
    /// before the first write, so an abort leaves no partial output.
    pub async fn generate_to(&mut self, out_dir: &Path) -> Result<GeneratedArtifacts, EngineError> {
        let artifacts = self.generate()?;
        loader::write_artifacts(out_dir, &artifacts).await?;
        Ok(artifacts)
    }

    /// Ingest every `*.tf` document in a directory.
    pub async fn ingest_directory(&mut self, dir: &Path) -> Result<IngestSummary, EngineError> {
        let documents = loader::scan_directory(dir).await?;
        Ok(self.ingest_documents(&documents))
    }

    pub async fn save_project(&mut self, dir: &Path) -> Result<(), EngineError> {
        self.meta.touch();
        bundle::save(dir, &self.meta, &self.graph).await?;
        Ok(())
    }

    /// Load a bundle and swap it in as the active graph. On failure the
    /// current graph is left untouched.
    pub async fn load_project(&mut self, dir: &Path) -> Result<(), EngineError> {
        let (meta, graph) = bundle::load(dir, self.schema.clone()).await?;
        self.meta = meta;
        self.graph = graph;
        logging::info(&format!("project '{}' loaded", self.meta.name));
        Ok(())
    }
}

/// Cross-document merge keeps the last record for a (type, name) pair,
/// matching the in-document rule.
fn merge_record(records: &mut Vec<ResourceRecord>, record: ResourceRecord) {
    if let Some(existing) = records
        .iter_mut()
        .find(|r| r.resource_type == record.resource_type && r.name == record.name)
    {
        *existing = record;
    } else {
        records.push(record);
    }
}

/// Variables keep first-wins semantics across documents too.
fn merge_variable(variables: &mut Vec<Variable>, variable: Variable) {
    if !variables.iter().any(|v| v.name == variable.name) {
        variables.push(variable);
    }
}

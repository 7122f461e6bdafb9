use tfcanvas::project::bundle;
use tfcanvas::terraform::generator::{MAIN_FILE, PROVIDER_FILE};
use tfcanvas::{CanvasEngine, ResourceKind, ResourceNode, SchemaProvider};

fn engine() -> CanvasEngine {
    CanvasEngine::new(tfcanvas::config::init_default().unwrap())
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut e = engine();
    e.ingest_documents(&[r#"
resource "aws_vpc" "main" { cidr_block = "10.0.0.0/16" }
resource "aws_subnet" "public" { cidr_block = "10.0.1.0/24" }
variable "region" { type = string }
"#
    .to_string()]);
    let ids: Vec<_> = e.graph().nodes().iter().map(|n| n.id).collect();
    e.graph_mut().add_connection(ids[0], ids[1]).unwrap();

    e.save_project(dir.path()).await.unwrap();

    let mut loaded = engine();
    loaded.load_project(dir.path()).await.unwrap();

    assert_eq!(loaded.graph().nodes().len(), 2);
    assert_eq!(loaded.graph().variables().len(), 1);
    assert_eq!(loaded.graph().connections().len(), 1);
    assert_eq!(loaded.graph().connections()[0].source_id, ids[0]);
    let vpc = loaded.graph().find_node(ids[0]).unwrap();
    assert_eq!(vpc.property("cidr_block"), Some("10.0.0.0/16"));
}

#[tokio::test]
async fn dangling_edges_load_as_empty_edge_list() {
    let dir = tempfile::tempdir().unwrap();
    let mut e = engine();
    e.ingest_documents(
        &[r#"resource "aws_vpc" "main" { cidr_block = "10.0.0.0/16" }"#.to_string()],
    );
    e.save_project(dir.path()).await.unwrap();

    // Overwrite the edge list with ids that no node carries.
    let bogus = serde_json::json!([{
        "id": uuid::Uuid::new_v4(),
        "source_id": uuid::Uuid::new_v4(),
        "target_id": uuid::Uuid::new_v4(),
    }]);
    std::fs::write(
        dir.path().join(bundle::CONNECTIONS_FILE),
        serde_json::to_vec_pretty(&bogus).unwrap(),
    )
    .unwrap();

    let (_, graph) = bundle::load(dir.path(), SchemaProvider::new())
        .await
        .unwrap();
    assert_eq!(graph.nodes().len(), 1);
    assert!(graph.connections().is_empty());
}

#[tokio::test]
async fn missing_collection_files_load_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut e = engine();
    e.ingest_documents(
        &[r#"resource "aws_vpc" "main" { cidr_block = "10.0.0.0/16" }"#.to_string()],
    );
    e.save_project(dir.path()).await.unwrap();
    std::fs::remove_file(dir.path().join(bundle::VARIABLES_FILE)).unwrap();
    std::fs::remove_file(dir.path().join(bundle::COMPOSITES_FILE)).unwrap();

    let (_, graph) = bundle::load(dir.path(), SchemaProvider::new())
        .await
        .unwrap();
    assert_eq!(graph.nodes().len(), 1);
    assert!(graph.variables().is_empty());
}

#[tokio::test]
async fn load_failure_leaves_graph_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut e = engine();
    e.ingest_documents(
        &[r#"resource "aws_vpc" "main" { cidr_block = "10.0.0.0/16" }"#.to_string()],
    );
    let before = e.graph().nodes().len();

    let missing = dir.path().join("does-not-exist");
    assert!(e.load_project(&missing).await.is_err());
    assert_eq!(e.graph().nodes().len(), before);
}

#[tokio::test]
async fn composites_round_trip_through_the_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let mut e = engine();
    let a = e
        .graph_mut()
        .add_node(ResourceNode::new(ResourceKind::Vpc, "net"));
    let b = e
        .graph_mut()
        .add_node(ResourceNode::new(ResourceKind::Subnet, "inner"));
    e.graph_mut().group_nodes(&[a, b], "network tier").unwrap();
    e.save_project(dir.path()).await.unwrap();

    let mut loaded = engine();
    loaded.load_project(dir.path()).await.unwrap();
    assert!(loaded.graph().nodes().is_empty());
    assert_eq!(loaded.graph().composites().len(), 1);
    assert_eq!(loaded.graph().composites()[0].children.len(), 2);
    assert_eq!(loaded.graph().composites()[0].name, "network tier");
}

#[tokio::test]
async fn ingest_directory_and_generate_to_disk() {
    let source_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        source_dir.path().join("network.tf"),
        r#"resource "aws_vpc" "main" { cidr_block = "10.0.0.0/16" }"#,
    )
    .unwrap();
    std::fs::write(
        source_dir.path().join("vars.tf"),
        r#"variable "region" { type = string }"#,
    )
    .unwrap();
    std::fs::write(source_dir.path().join("README.md"), "not terraform").unwrap();

    let mut e = engine();
    let summary = e.ingest_directory(source_dir.path()).await.unwrap();
    assert_eq!(summary.nodes, 1);
    assert_eq!(summary.variables, 1);
    assert_eq!(summary.failed_documents, 0);

    e.generate_to(out_dir.path()).await.unwrap();
    let main = std::fs::read_to_string(out_dir.path().join(MAIN_FILE)).unwrap();
    assert!(main.contains("resource \"aws_vpc\" \"main\""));
    let provider = std::fs::read_to_string(out_dir.path().join(PROVIDER_FILE)).unwrap();
    assert!(provider.contains("region = \"us-east-1\""));
}

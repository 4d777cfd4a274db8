//! Integration tests for the async dataset and document clients.

mod support;

use ragflow_client::client::{DatasetClient, DocumentClient};
use ragflow_client::model::{
    CreateDatasetPayload, DeleteDatasetsPayload, DocumentUpload, UpdateDatasetPayload,
    UpdateDocumentPayload,
};
use ragflow_client::{ChunkMethod, ClientError, DocumentQuery, PageQuery, Permission};
use serde_json::json;
use support::{API_KEY, init_tracing, properties_for, start_mock_server_or_skip};
use wiremock::matchers::{
    body_json, body_partial_json, body_string_contains, header, header_regex, method, path,
    query_param,
};
use wiremock::{Mock, ResponseTemplate};

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "data": data }))
}

#[tokio::test]
async fn test_create_dataset_sends_payload_with_bearer_token() {
    init_tracing();
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/api/v1/datasets"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .and(body_partial_json(json!({
            "name": "handbook",
            "permission": "team",
            "chunk_method": "book"
        })))
        .respond_with(ok(json!({
            "id": "ds1",
            "name": "handbook",
            "chunk_method": "book",
            "create_time": "1728910240150",
            "embedding_model": "BAAI/bge-large-zh-v1.5"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatasetClient::new(properties_for(&server.uri())).unwrap();
    let payload = CreateDatasetPayload::new("handbook")
        .permission(Permission::Team)
        .chunk_method(ChunkMethod::Book);
    let dataset = client.create_dataset("global", &payload).await.unwrap();

    assert_eq!(dataset.id, "ds1");
    assert_eq!(dataset.chunk_method.as_deref(), Some("book"));
    assert_eq!(dataset.create_time, Some(1_728_910_240_150));
}

#[tokio::test]
async fn test_invalid_dataset_name_is_rejected_before_sending() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = DatasetClient::new(properties_for(&server.uri())).unwrap();
    let err = client
        .create_dataset("global", &CreateDatasetPayload::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_business_error_maps_to_api_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("PUT"))
        .and(path("/api/v1/datasets/ds1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 102,
            "message": "You don't own the dataset ds1."
        })))
        .mount(&server)
        .await;

    let client = DatasetClient::new(properties_for(&server.uri())).unwrap();
    let payload = UpdateDatasetPayload {
        name: Some("renamed".to_string()),
        ..UpdateDatasetPayload::default()
    };
    let err = client
        .update_dataset("global", "ds1", &payload)
        .await
        .unwrap_err();
    match err {
        ClientError::Api { code, message } => {
            assert_eq!(code, 102);
            assert_eq!(message, "You don't own the dataset ds1.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_datasets_sends_page_query() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "10"))
        .and(query_param("orderby", "update_time"))
        .and(query_param("desc", "false"))
        .and(query_param("name", "handbook"))
        .respond_with(ok(json!([{ "id": "ds1", "name": "handbook" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatasetClient::new(properties_for(&server.uri())).unwrap();
    let query = PageQuery::new()
        .page(2)
        .page_size(10)
        .orderby("update_time")
        .desc(false)
        .name("handbook");
    let datasets = client.list_datasets("global", &query).await.unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name, "handbook");
}

#[tokio::test]
async fn test_delete_all_datasets_sends_null_ids() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("DELETE"))
        .and(path("/api/v1/datasets"))
        .and(body_json(json!({ "ids": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DatasetClient::new(properties_for(&server.uri())).unwrap();
    client
        .delete_datasets("global", &DeleteDatasetsPayload::all())
        .await
        .unwrap();
    let err = client
        .delete_datasets("global", &DeleteDatasetsPayload::ids(Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_knowledge_graph_round_trip() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds1/knowledge_graph"))
        .respond_with(ok(json!({
            "graph": {
                "directed": false,
                "nodes": [{ "id": "RAGFlow", "entity_type": "ORGANIZATION", "pagerank": 0.3 }],
                "edges": []
            },
            "mind_map": {}
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/datasets/ds1/knowledge_graph"))
        .respond_with(ok(json!(true)))
        .mount(&server)
        .await;

    let client = DatasetClient::new(properties_for(&server.uri())).unwrap();
    let graph = client.get_knowledge_graph("global", "ds1").await.unwrap();
    let nodes = graph.graph.unwrap().nodes;
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, "RAGFlow");
    assert!(client.delete_knowledge_graph("global", "ds1").await.unwrap());
}

#[tokio::test]
async fn test_upload_documents_sends_one_file_part_per_upload() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains(r#"name="file"; filename="notes.txt""#))
        .and(body_string_contains(r#"name="file"; filename="guide.md""#))
        .respond_with(ok(json!([
            { "id": "doc1", "name": "notes.txt", "run": "UNSTART" },
            { "id": "doc2", "name": "guide.md", "run": "UNSTART" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocumentClient::new(properties_for(&server.uri())).unwrap();
    let uploads = vec![
        DocumentUpload::new("notes.txt", b"hello".to_vec()),
        DocumentUpload::new("guide.md", b"# guide".to_vec()),
    ];
    let documents = client.upload_documents("global", "ds1", uploads).await.unwrap();
    assert_eq!(documents.len(), 2);
    assert!(!documents[0].is_parse_done());
}

#[tokio::test]
async fn test_upload_from_path_uses_file_name() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(body_string_contains(r#"filename="manual.txt""#))
        .and(body_string_contains("manual contents"))
        .respond_with(ok(json!([{ "id": "doc9", "name": "manual.txt" }])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("manual.txt");
    std::fs::write(&file, "manual contents").unwrap();

    let client = DocumentClient::new(properties_for(&server.uri())).unwrap();
    let upload = DocumentUpload::from_path(&file).unwrap();
    let documents = client
        .upload_documents("global", "ds1", vec![upload])
        .await
        .unwrap();
    assert_eq!(documents[0].id, "doc9");
}

#[tokio::test]
async fn test_update_document_sends_meta_fields() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("PUT"))
        .and(path("/api/v1/datasets/ds1/documents/doc1"))
        .and(body_json(json!({
            "name": "renamed.txt",
            "meta_fields": { "author": "ops" },
            "chunk_method": "manual"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocumentClient::new(properties_for(&server.uri())).unwrap();
    let mut meta = serde_json::Map::new();
    meta.insert("author".to_string(), json!("ops"));
    let payload = UpdateDocumentPayload {
        name: Some("renamed.txt".to_string()),
        meta: Some(meta),
        chunk_method: Some(ChunkMethod::Manual),
        parser_config: None,
    };
    client
        .update_document("global", "ds1", "doc1", &payload)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_documents_sends_repeated_filters() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(query_param("page", "1"))
        .and(query_param("keywords", "policy"))
        .and(query_param("suffix", "pdf"))
        .and(query_param("suffix", "docx"))
        .and(query_param("run", "DONE"))
        .and(query_param("create_time_from", "1700000000000"))
        .respond_with(ok(json!({
            "docs": [{ "id": "doc1", "name": "policy.pdf", "run": "DONE", "type": "pdf" }],
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocumentClient::new(properties_for(&server.uri())).unwrap();
    let query = DocumentQuery::new()
        .with_page(PageQuery::new().page(1).keywords("policy"))
        .suffix("pdf")
        .suffix("docx")
        .run("DONE")
        .create_time_from(1_700_000_000_000);
    let page = client.list_documents("global", "ds1", &query).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.docs[0].kind.as_deref(), Some("pdf"));
}

#[tokio::test]
async fn test_parse_and_stop_parsing_send_document_ids() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    for verb in ["POST", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/api/v1/datasets/ds1/chunks"))
            .and(body_json(json!({ "document_ids": ["doc1", "doc2"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0 })))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(body_json(json!({ "ids": ["doc1", "doc2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocumentClient::new(properties_for(&server.uri())).unwrap();
    let ids = vec!["doc1".to_string(), "doc2".to_string()];
    client.parse_documents("global", "ds1", &ids).await.unwrap();
    client.stop_parsing_documents("global", "ds1", &ids).await.unwrap();
    client.delete_documents("global", "ds1", &ids).await.unwrap();

    let err = client.parse_documents("global", "ds1", &[]).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_parsing_status_reads_first_listed_document() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(query_param("id", "doc1"))
        .respond_with(ok(json!({ "docs": [{ "id": "doc1", "run": "DONE" }], "total": 1 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(query_param("id", "gone"))
        .respond_with(ok(json!({ "docs": [], "total": 0 })))
        .mount(&server)
        .await;

    let client = DocumentClient::new(properties_for(&server.uri())).unwrap();
    let status = client.parsing_status("global", "ds1", "doc1").await.unwrap();
    assert_eq!(status.document_id, "doc1");
    assert!(status.is_finished());
    assert!(!status.is_cancelled());

    let err = client.parsing_status("global", "ds1", "gone").await.unwrap_err();
    assert!(matches!(err, ClientError::DocumentNotFound { .. }));

    let err = client.parsing_status("global", "ds1", " ").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_dataset_alias_is_sent_as_configured_id() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .and(query_param("id", "gone"))
        .respond_with(ok(json!({ "docs": [], "total": 0 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds1/documents"))
        .respond_with(ok(json!({ "docs": [{ "id": "doc1", "run": "DONE" }], "total": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/datasets/ds1/knowledge_graph"))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let properties = properties_for(&server.uri()).with_dataset("handbook", "ds1");
    let documents = DocumentClient::new(properties.clone()).unwrap();
    let page = documents
        .list_documents("global", "handbook", &DocumentQuery::new())
        .await
        .unwrap();
    assert_eq!(page.docs[0].id, "doc1");

    let err = documents
        .parsing_status("global", "handbook", "gone")
        .await
        .unwrap_err();
    match err {
        ClientError::DocumentNotFound { dataset_id, .. } => assert_eq!(dataset_id, "ds1"),
        other => panic!("unexpected error: {other:?}"),
    }

    let datasets = DatasetClient::new(properties).unwrap();
    assert!(datasets.delete_knowledge_graph("global", "handbook").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_download_consumed_on_blocking_thread() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/ds%201/documents/doc%2F1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"plain text body".to_vec(), "text/plain; charset=utf-8"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = DocumentClient::new(properties_for(&server.uri())).unwrap();
    let handle = client
        .download_document("global", "ds 1", "doc/1", Some("notes.txt"))
        .await
        .unwrap();
    assert_eq!(handle.metadata().content_type(), Some("text/plain; charset=utf-8"));

    let body = tokio::task::spawn_blocking(move || handle.read_all_bytes())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body, b"plain text body");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let client = DatasetClient::new(properties_for("http://127.0.0.1:1")).unwrap();
    let err = client
        .list_datasets("global", &PageQuery::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport { .. } | ClientError::Timeout { .. }
    ));
}

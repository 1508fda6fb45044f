//! Integration tests for the service client against a mock server.
//!
//! The client is blocking, so each call runs on tokio's blocking pool while
//! the mock server keeps serving on the async runtime.

use cosmos_demos::api::{
    Collection, CosmosClient, CosmosError, Database, Link, Query, RequestOptions, ResourceType,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

// Built inside `blocking` closures: a blocking client must not be created
// or dropped on the async runtime.
fn client(uri: &str) -> CosmosClient {
    CosmosClient::new(uri, KEY).unwrap()
}

fn database(id: &str, rid: &str) -> Value {
    json!({ "id": id, "_rid": rid, "_self": format!("dbs/{rid}/"), "_etag": "\"0000\"", "_ts": 1527582222 })
}

#[tokio::test]
async fn test_requests_carry_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dbs/mydb"))
        .and(header_exists("authorization"))
        .and(header_exists("x-ms-date"))
        .and(header("x-ms-version", "2018-12-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(database("mydb", "AAAA")))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let db: Database = blocking(move || client(&uri).read(&Link::database("mydb"), &RequestOptions::default()))
        .await
        .unwrap();

    assert_eq!(db.id, "mydb");
    assert_eq!(db.system.resource_id, "AAAA");
    assert_eq!(db.system.self_link, "dbs/AAAA/");

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(authorization.starts_with("type%3Dmaster%26ver%3D1.0%26sig%3D"));
}

#[tokio::test]
async fn test_list_follows_continuation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dbs"))
        .and(header("x-ms-continuation", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_rid": "",
            "Databases": [database("third", "CCCC")],
            "_count": 1
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dbs"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ms-continuation", "page-2")
                .set_body_json(json!({
                    "_rid": "",
                    "Databases": [database("first", "AAAA"), database("second", "BBBB")],
                    "_count": 2
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let databases: Vec<Database> = blocking(move || client(&uri).list(&Link::root())).await.unwrap();

    let ids: Vec<_> = databases.iter().map(|db| db.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_read_feed_reports_page_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dbs/mydb/colls"))
        .and(header("x-ms-max-item-count", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ms-continuation", "next")
                .insert_header("x-ms-request-charge", "2.38")
                .set_body_json(json!({
                    "DocumentCollections": [{ "id": "mystore", "partitionKey": { "paths": ["/address/postalCode"], "kind": "Hash" } }],
                    "_count": 1
                })),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let page = blocking(move || {
        let client = client(&uri);
        let options = RequestOptions {
            max_item_count: Some(1),
            ..Default::default()
        };
        client.read_feed::<Collection>(&Link::database("mydb"), &options)
    })
    .await
    .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(
        page.items[0].partition_key.as_ref().unwrap().paths,
        vec!["/address/postalCode".to_string()]
    );
    assert_eq!(page.continuation.as_deref(), Some("next"));
    assert_eq!(page.request_charge, 2.38);
}

#[tokio::test]
async fn test_create_collection_sends_throughput() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dbs/mydb/colls"))
        .and(header("x-ms-offer-throughput", "1000"))
        .and(body_json(json!({
            "id": "MyCollection1",
            "partitionKey": { "paths": ["/partitionKey"], "kind": "Hash" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "MyCollection1",
            "partitionKey": { "paths": ["/partitionKey"], "kind": "Hash" },
            "_rid": "AAAAAA==",
            "_self": "dbs/AAAA/colls/AAAAAA==/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let created = blocking(move || {
        let client = client(&uri);
        client.create(
            &Link::database("mydb"),
            &Collection::new("MyCollection1", "/partitionKey"),
            &RequestOptions::throughput(1000),
        )
    })
    .await
    .unwrap();

    assert_eq!(created.id, "MyCollection1");
    assert_eq!(created.system.resource_id, "AAAAAA==");
}

#[tokio::test]
async fn test_document_requests_carry_partition_key() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/dbs/mydb/colls/mystore/docs/MY-NEW-CUSTOMER-1"))
        .and(header("x-ms-documentdb-partitionkey", "[\"11229\"]"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    blocking(move || {
        let client = client(&uri);
        client.delete(
            &Link::database("mydb").collection("mystore").document("MY-NEW-CUSTOMER-1"),
            &RequestOptions::partition_key("11229"),
        )
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_query_posts_sql_with_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dbs/mydb/colls/mystore/docs"))
        .and(header("content-type", "application/query+json"))
        .and(header("x-ms-documentdb-isquery", "True"))
        .and(header("x-ms-documentdb-query-enablecrosspartition", "True"))
        .and(body_json(json!({
            "query": "SELECT * FROM c WHERE STARTSWITH(c.name, @prefix)",
            "parameters": [{ "name": "@prefix", "value": "John" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Documents": [{ "id": "MY-NEW-CUSTOMER-1", "name": "John Doe" }],
            "_count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let docs: Vec<Value> = blocking(move || {
        let client = client(&uri);
        let query = Query::new("SELECT * FROM c WHERE STARTSWITH(c.name, @prefix)").with_parameter("@prefix", "John");
        client.query_all(
            &Link::database("mydb").collection("mystore"),
            ResourceType::Documents,
            &query,
            &RequestOptions::cross_partition(),
        )
    })
    .await
    .unwrap();

    assert_eq!(docs, vec![json!({ "id": "MY-NEW-CUSTOMER-1", "name": "John Doe" })]);
}

#[tokio::test]
async fn test_execute_stored_procedure_passes_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dbs/mydb/colls/mystore/sprocs/spHelloWorld"))
        .and(header("x-ms-documentdb-partitionkey", "[\"\"]"))
        .and(body_json(json!([])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("Hello, World")))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let greeting: String = blocking(move || {
        let client = client(&uri);
        client.execute_stored_procedure(
            &Link::database("mydb").collection("mystore").stored_procedure("spHelloWorld"),
            &[],
            &RequestOptions::partition_key(""),
        )
    })
    .await
    .unwrap();

    assert_eq!(greeting, "Hello, World");
}

#[tokio::test]
async fn test_service_error_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dbs/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "NotFound",
            "message": "Entity with the specified id does not exist in the system.\r\nActivityId: 1234"
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || client(&uri).read::<Database>(&Link::database("missing"), &RequestOptions::default()))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(!err.is_conflict());
    assert_eq!(
        err.to_string(),
        "404 Not Found (NotFound): Entity with the specified id does not exist in the system."
    );
}

#[tokio::test]
async fn test_resource_token_is_sent_as_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dbs/mydb/colls/mystore"))
        .and(header("authorization", "type%3Dresource%26ver%3D1.0%26sig%3Dabc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "mystore" })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let collection = blocking(move || -> cosmos_demos::api::Result<Collection> {
        let client = CosmosClient::with_resource_token(&uri, "type=resource&ver=1.0&sig=abc")?;
        client.read(&Link::database("mydb").collection("mystore"), &RequestOptions::default())
    })
    .await
    .unwrap();

    assert_eq!(collection.id, "mystore");
}

#[test]
fn test_unreachable_endpoint_is_a_transport_error() {
    let client = CosmosClient::new("http://127.0.0.1:1/", KEY).unwrap();

    let err = client.list::<Database>(&Link::root()).unwrap_err();

    assert!(matches!(err, CosmosError::Transport { .. }));
    assert_eq!(err.to_string(), "request GET dbs could not be sent");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_invalid_settings_are_rejected_up_front() {
    assert!(matches!(
        CosmosClient::new("not a url", KEY),
        Err(CosmosError::InvalidEndpoint { .. })
    ));
    assert!(matches!(
        CosmosClient::new("https://localhost:8081/", "not base64!"),
        Err(CosmosError::InvalidKey(_))
    ));
}

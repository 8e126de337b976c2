//! End-to-end tests for the resource operations: create, retrieve, update,
//! delete, list pagination, and custom paths, all running through a fully
//! connected [`Client`] against a mock server.

use sequoia::{Client, ClientConfig, ClientId, ClientSecret, Error, HttpMethod, RegistryUrl, Value};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests whose URL does not carry the named query parameter.
struct NoQueryParam(&'static str);

impl Match for NoQueryParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == self.0)
    }
}

/// Matches requests that do not carry the named header.
struct NoHeader(&'static str);

impl Match for NoHeader {
    fn matches(&self, request: &Request) -> bool {
        !request
            .headers
            .keys()
            .any(|key| key.to_string().eq_ignore_ascii_case(self.0))
    }
}

/// Mounts the discovery and token endpoints every connected client needs.
async fn start_sequoia() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/acme/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "services": [
                {"name": "identity", "location": server.uri()},
                {"name": "metadata", "location": server.uri()}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/descriptor/raw/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Metadata",
            "description": "Metadata and catalog data",
            "resourcefuls": {
                "contents": {
                    "pluralName": "contents",
                    "hyphenatedPluralName": "contents",
                    "path": "/data"
                }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "test-token"})),
        )
        .mount(&server)
        .await;

    server
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .client_id(ClientId::new("test-client").unwrap())
        .client_secret(ClientSecret::new("test-secret").unwrap())
        .registry_url(RegistryUrl::new(server.uri()).unwrap())
        .owner("acme")
        .build()
        .unwrap()
}

async fn connect(server: &MockServer) -> Client {
    Client::connect(config_for(server)).await.unwrap()
}

#[tokio::test]
async fn test_create_wraps_body_and_unwraps_single_item() {
    let server = start_sequoia().await;
    Mock::given(method("POST"))
        .and(path("/data/contents"))
        .and(header("Content-Type", "application/vnd.piksel+json"))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param("owner", "acme"))
        .and(body_json(json!({"contents": [{"title": "foo"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": "c1", "title": "foo"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let created = client
        .resource("metadata", "contents")
        .unwrap()
        .create(Value::from_json(json!({"title": "foo"})))
        .await
        .unwrap();

    assert_eq!(created, Value::from_json(json!({"id": "c1", "title": "foo"})));
}

#[tokio::test]
async fn test_retrieve_addresses_item_by_primary_key() {
    let server = start_sequoia().await;
    Mock::given(method("GET"))
        .and(path("/data/contents/c1"))
        .and(query_param("owner", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": "c1", "title": "foo"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let item = client
        .resource("metadata", "contents")
        .unwrap()
        .retrieve("c1")
        .await
        .unwrap();

    assert_eq!(item.get("id"), Some(&Value::String("c1".to_string())));
}

#[tokio::test]
async fn test_update_puts_enveloped_body() {
    let server = start_sequoia().await;
    Mock::given(method("PUT"))
        .and(path("/data/contents/c1"))
        .and(body_json(json!({"contents": [{"title": "bar"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": "c1", "title": "bar"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let updated = client
        .resource("metadata", "contents")
        .unwrap()
        .update("c1", Value::from_json(json!({"title": "bar"})))
        .await
        .unwrap();

    assert_eq!(updated.get("title"), Some(&Value::String("bar".to_string())));
}

#[tokio::test]
async fn test_delete_sends_no_body_and_tolerates_empty_reply() {
    let server = start_sequoia().await;
    Mock::given(method("DELETE"))
        .and(path("/data/contents/c1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    client
        .resource("metadata", "contents")
        .unwrap()
        .delete("c1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_follows_continue_cursor_across_pages() {
    let server = start_sequoia().await;

    // First page carries a relative continuation cursor; its query is merged
    // into the accumulated parameters of the next request.
    Mock::given(method("GET"))
        .and(path("/data/contents"))
        .and(query_param("continue", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": 1}],
            "meta": {"continue": "/data/contents?page=2"}
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/contents"))
        .and(query_param("continue", "true"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": 2}],
            "meta": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let items = client
        .resource("metadata", "contents")
        .unwrap()
        .list()
        .collect_items()
        .await
        .unwrap();

    assert_eq!(
        items,
        vec![
            Value::from_json(json!({"id": 1})),
            Value::from_json(json!({"id": 2})),
        ]
    );
}

#[tokio::test]
async fn test_list_without_meta_yields_single_page() {
    let server = start_sequoia().await;
    Mock::given(method("GET"))
        .and(path("/data/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let mut pages = client.resource("metadata", "contents").unwrap().list();

    assert_eq!(pages.try_next().await.unwrap().unwrap().len(), 1);
    assert!(pages.try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_builder_params_are_sent_with_every_page() {
    let server = start_sequoia().await;
    Mock::given(method("GET"))
        .and(path("/data/contents"))
        .and(query_param("perPage", "2"))
        .and(query_param("continue", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let items = client
        .resource("metadata", "contents")
        .unwrap()
        .param("perPage", "2")
        .list()
        .collect_items()
        .await
        .unwrap();

    assert!(items.is_empty());
}

#[tokio::test]
async fn test_without_owner_suppresses_owner_param() {
    let server = start_sequoia().await;
    Mock::given(method("GET"))
        .and(path("/data/contents/c1"))
        .and(NoQueryParam("owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": "c1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    client
        .resource("metadata", "contents")
        .unwrap()
        .without_owner()
        .retrieve("c1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_without_token_suppresses_authorization_header() {
    let server = start_sequoia().await;
    Mock::given(method("GET"))
        .and(path("/data/contents/c1"))
        .and(NoHeader("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{"id": "c1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    client
        .resource("metadata", "contents")
        .unwrap()
        .without_token()
        .retrieve("c1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_custom_path_bypasses_resource_binding() {
    let server = start_sequoia().await;
    Mock::given(method("POST"))
        .and(path("/jobs/transcode"))
        .and(body_json(json!({"contentRef": "c1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let reply = client
        .request()
        .unwrap()
        .extend("metadata")
        .unwrap()
        .custom(
            HttpMethod::Post,
            "/jobs/transcode",
            Some(Value::from_json(json!({"contentRef": "c1"}))),
        )
        .await
        .unwrap();

    assert_eq!(reply.get("accepted"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn test_error_status_surfaces_status_and_body() {
    let server = start_sequoia().await;
    Mock::given(method("GET"))
        .and(path("/data/contents/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let result = client
        .resource("metadata", "contents")
        .unwrap()
        .retrieve("missing")
        .await;

    assert!(matches!(
        result,
        Err(Error::Response { status: 404, ref body, .. }) if body == "not found"
    ));
}

#[tokio::test]
async fn test_extending_a_bound_builder_is_already_built() {
    let server = start_sequoia().await;
    let client = connect(&server).await;

    let result = client
        .resource("metadata", "contents")
        .unwrap()
        .extend("more");
    assert!(matches!(result, Err(Error::RequestAlreadyBuilt)));
}

#[tokio::test]
async fn test_unknown_resource_fails_at_operation_time() {
    let server = start_sequoia().await;
    let client = connect(&server).await;

    let result = client
        .resource("metadata", "bogus")
        .unwrap()
        .retrieve("c1")
        .await;
    assert!(matches!(
        result,
        Err(Error::ResourceNotFound { name }) if name == "bogus"
    ));
}

#[tokio::test]
async fn test_datetime_fields_decode_to_typed_values() {
    let server = start_sequoia().await;
    Mock::given(method("GET"))
        .and(path("/data/contents/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contents": [{
                "id": "c1",
                "createdAt": "2020-03-02T14:00:00.000Z",
                "window": "PT2H30M"
            }]
        })))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let item = client
        .resource("metadata", "contents")
        .unwrap()
        .retrieve("c1")
        .await
        .unwrap();

    assert!(matches!(item.get("createdAt"), Some(Value::DateTime(_))));
    assert!(matches!(item.get("window"), Some(Value::Duration(_))));
}

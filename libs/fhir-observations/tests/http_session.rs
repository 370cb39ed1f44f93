use ferrum_observations::{
    Error, HttpSession, ObservationClient, ObservationsConfig, PatientSession, RequestOptions,
    StaticSessionProvider, ValueSetCatalog,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn searchset(entries: serde_json::Value, next: Option<String>) -> serde_json::Value {
    let mut links = vec![json!({"relation": "self", "url": "http://example.org/fhir/Observation"})];
    if let Some(next) = next {
        links.push(json!({"relation": "next", "url": next}));
    }
    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "link": links,
        "entry": entries
    })
}

async fn mount_two_pages(server: &MockServer) {
    let next = format!("{}/fhir/Observation?_getpages=abc&page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/fhir/Observation"))
        .and(query_param("category", "vital-signs"))
        .and(query_param("patient", "smart-1288992"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            json!([
                {"resource": {"resourceType": "Observation", "id": "page1-a", "valueInteger": 1}},
                {"resource": {"resourceType": "OperationOutcome", "issue": []}}
            ]),
            Some(next),
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fhir/Observation"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            json!([
                {"resource": {"resourceType": "Observation", "id": "page2-a", "valueInteger": 2}}
            ]),
            None,
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sends_patient_scoped_authorized_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fhir/Observation"))
        .and(query_param("code", "http://loinc.org|8867-4"))
        .and(query_param("_sort", "-date"))
        .and(query_param("_count", "1"))
        .and(query_param("patient", "smart-1288992"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("accept", "application/fhir+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            json!([{
                "resource": {
                    "resourceType": "Observation",
                    "id": "hr",
                    "status": "final",
                    "valueQuantity": {"value": 72, "unit": "beats/minute"}
                }
            }]),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let session = HttpSession::new(format!("{}/fhir", server.uri()))
        .unwrap()
        .with_access_token("secret-token")
        .with_patient("smart-1288992");
    let client = ObservationClient::new(
        Arc::new(StaticSessionProvider::new(Arc::new(session))),
        Arc::new(ValueSetCatalog::new()),
    );

    let lookup = client.get_observation("8867-4").await.unwrap();
    assert_eq!(
        lookup.observation().and_then(|o| o.id.as_deref()),
        Some("hr")
    );
}

#[tokio::test]
async fn follows_next_links_without_limit() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let session = HttpSession::new(format!("{}/fhir", server.uri()))
        .unwrap()
        .with_patient("smart-1288992");

    let pages = session
        .request(
            "Observation?category=vital-signs&_sort=date&_count=100",
            &RequestOptions::unlimited(),
        )
        .await
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].entries().len(), 2);
    assert_eq!(pages[1].entries().len(), 1);
}

#[tokio::test]
async fn stops_at_page_limit() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let session = HttpSession::new(format!("{}/fhir", server.uri()))
        .unwrap()
        .with_patient("smart-1288992");

    let pages = session
        .request(
            "Observation?category=vital-signs&_sort=date&_count=100",
            &RequestOptions { page_limit: 1 },
        )
        .await
        .unwrap();

    assert_eq!(pages.len(), 1);
}

#[tokio::test]
async fn next_link_back_to_fetched_page_stops_paging() {
    let server = MockServer::start().await;
    let query = "Observation?category=laboratory&_sort=date&_count=100";
    let self_url = format!("{}/fhir/{}", server.uri(), query);

    Mock::given(method("GET"))
        .and(path("/fhir/Observation"))
        .and(query_param("category", "laboratory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(searchset(
            json!([
                {"resource": {"resourceType": "Observation", "id": "loop", "valueInteger": 1}}
            ]),
            Some(self_url),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let session = HttpSession::new(format!("{}/fhir", server.uri())).unwrap();

    let pages = session
        .request(query, &RequestOptions::unlimited())
        .await
        .unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].entries().len(), 1);
}

#[tokio::test]
async fn client_reads_only_first_page() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let config = ObservationsConfig::from_toml_str(&format!(
        r#"
        [server]
        base_url = "{}/fhir"
        patient_id = "smart-1288992"
        "#,
        server.uri()
    ))
    .unwrap();
    let client = ObservationClient::from_config(&config, Arc::new(ValueSetCatalog::new())).unwrap();

    let ids: Vec<_> = client
        .get_observations_by_category("vital-signs", None, None)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|o| o.id)
        .collect();

    assert_eq!(ids, vec!["page1-a"]);
}

#[tokio::test]
async fn error_status_carries_outcome_diagnostics() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fhir/Observation"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "resourceType": "OperationOutcome",
            "issue": [{"severity": "error", "code": "login", "diagnostics": "Invalid bearer token"}]
        })))
        .mount(&server)
        .await;

    let session = HttpSession::new(format!("{}/fhir", server.uri())).unwrap();
    let client = ObservationClient::new(
        Arc::new(StaticSessionProvider::new(Arc::new(session))),
        Arc::new(ValueSetCatalog::new()),
    );

    let err = client
        .get_observations("8867-4", "code", None, None)
        .await
        .unwrap_err();

    match err {
        Error::Status {
            status,
            diagnostics,
            ..
        } => {
            assert_eq!(status, 401);
            assert_eq!(diagnostics, "Invalid bearer token");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_searchset_is_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fhir/Observation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": 0
        })))
        .mount(&server)
        .await;

    let session = HttpSession::new(format!("{}/fhir", server.uri())).unwrap();
    let client = ObservationClient::new(
        Arc::new(StaticSessionProvider::new(Arc::new(session))),
        Arc::new(ValueSetCatalog::new()),
    );

    let lookup = client.get_observation("0000-0").await.unwrap();
    assert!(!lookup.is_found());

    let list = client
        .get_observations_by_category("imaging", None, None)
        .await
        .unwrap();
    assert!(list.is_empty());
}

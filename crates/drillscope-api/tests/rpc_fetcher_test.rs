// Integration tests for `RpcClient` and `RpcFetcher` using wiremock.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drillscope_api::{Error, HierarchySpec, LevelSpec, Row, RpcClient, RpcFetcher, TransportConfig};
use drillscope_core::{
    ChildState, DrillController, DrillOutcome, FetchRequest, NodeFetcher, NodePath, QueryContext,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RpcClient) {
    let server = MockServer::start().await;
    let client = RpcClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn regional() -> HierarchySpec {
    HierarchySpec::new(
        "regional",
        vec![
            LevelSpec::new("sales_by_region", "region_id").with_label("region_name"),
            LevelSpec::new("sales_by_team", "team_id")
                .with_label("team_name")
                .with_parents(["p_region"]),
        ],
    )
}

fn path_of(s: &str) -> NodePath {
    s.parse().unwrap()
}

// ── Client ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_call_sends_api_key_headers() {
    let server = MockServer::start().await;
    let key = SecretString::from("anon-key-123".to_owned());
    let client = RpcClient::from_api_key(&server.uri(), &key, &TransportConfig::default()).unwrap();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_region"))
        .and(header("apikey", "anon-key-123"))
        .and(header("authorization", "Bearer anon-key-123"))
        .and(body_json(json!({"p_search": "acme"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "region_id": "north", "sales": 10 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut args = Row::new();
    args.insert("p_search".into(), json!("acme"));
    let rows = client.call("sales_by_region", &args).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["region_id"], json!("north"));
}

#[tokio::test]
async fn test_rpc_error_body_is_parsed() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_region"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "invalid input syntax for type date",
            "code": "22007",
            "details": null,
            "hint": "use YYYY-MM-DD",
        })))
        .mount(&server)
        .await;

    let err = client.call("sales_by_region", &Row::new()).await.unwrap_err();
    match err {
        Error::Rpc {
            message,
            code,
            status,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("22007"));
            assert!(message.starts_with("invalid input syntax"));
            assert!(message.contains("hint: use YYYY-MM-DD"));
        }
        other => panic!("expected Rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_region"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})),
        )
        .mount(&server)
        .await;

    let err = client.call("sales_by_region", &Row::new()).await.unwrap_err();
    assert!(
        matches!(err, Error::Authentication { ref message } if message == "Invalid API key"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_object_body_is_a_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/total_sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 5})))
        .mount(&server)
        .await;

    let err = client.call("total_sales", &Row::new()).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}

// ── Fetcher ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetcher_binds_ancestors_and_filters() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_team"))
        .and(body_json(json!({
            "p_region": "north",
            "p_exclusions": ["S01", "S02"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "team_id": "teamA", "team_name": "Team A", "sales": 700.0 },
            { "team_id": 7, "team_name": null, "sales": 12.5 },
            { "team_name": "no key" },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = RpcFetcher::new(client, regional()).unwrap();
    let context = Arc::new(QueryContext::new().with_exclusions(["S01", "S02"]));
    let nodes = fetcher
        .fetch_children(FetchRequest::new(path_of("north"), context))
        .await
        .unwrap();

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].key.as_str(), "teamA");
    assert_eq!(nodes[0].label.as_deref(), Some("Team A"));
    assert_eq!(nodes[0].metrics["sales"], json!(700.0));
    assert_eq!(nodes[1].key.as_str(), "7");
    assert_eq!(nodes[1].label, None);
}

#[tokio::test]
async fn test_depth_beyond_levels_is_empty_without_io() {
    let (server, client) = setup().await;
    let fetcher = RpcFetcher::new(client, regional()).unwrap();

    let nodes = fetcher
        .fetch_children(FetchRequest::new(path_of("north/teamA"), Arc::default()))
        .await
        .unwrap();

    assert!(nodes.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_hierarchy_is_rejected() {
    let (_server, client) = setup().await;
    let err = RpcFetcher::new(client, HierarchySpec::new("empty", Vec::new())).unwrap_err();
    assert!(matches!(err, Error::Hierarchy { .. }));
}

// ── End to end through the controller ───────────────────────────────

#[tokio::test]
async fn test_controller_drills_through_rpc_levels() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_region"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "region_id": "north", "region_name": "North", "sales": 1200.5 },
            { "region_id": "south", "region_name": "South", "sales": 880.0 },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_team"))
        .and(body_json(json!({"p_region": "north"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "team_id": "teamA", "team_name": "Team A", "sales": 700.0 },
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = RpcFetcher::new(client, regional()).unwrap();
    let config = fetcher.drill_config();
    let ctrl = DrillController::new(fetcher, config).unwrap();

    ctrl.load_root().await.unwrap();
    assert_eq!(
        ctrl.select_node(&path_of("north")).await.unwrap(),
        DrillOutcome::Fetched { children: 1 }
    );
    // Re-entering a cached branch must not hit the backend.
    ctrl.select_breadcrumb(0).unwrap();
    assert_eq!(
        ctrl.select_node(&path_of("north")).await.unwrap(),
        DrillOutcome::CacheHit
    );

    let team = ctrl.node(&path_of("north/teamA")).unwrap();
    assert!(team.is_terminal);
    assert_eq!(ctrl.breadcrumbs()[0].label, "North");
    assert!(matches!(
        ctrl.child_state(&path_of("north")).unwrap(),
        ChildState::Loaded(ref nodes) if nodes.len() == 1
    ));
}

#[tokio::test]
async fn test_backend_failure_is_recorded_on_node() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_region"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "region_id": "north" },
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/sales_by_team"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream timeout"))
        .mount(&server)
        .await;

    let fetcher = RpcFetcher::new(client, regional()).unwrap();
    let config = fetcher.drill_config();
    let ctrl = DrillController::new(fetcher, config).unwrap();
    ctrl.load_root().await.unwrap();

    let outcome = ctrl.select_node(&path_of("north")).await.unwrap();
    let DrillOutcome::Failed { error } = &outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(error.message.contains("HTTP 500"));
    assert!(error.message.contains("upstream timeout"));
}

mod common;

use axum::http::StatusCode;
use common::{ENV_PAT, ORG, PROJECT, app, call_json, config, get, post_json};
use devops_backlog::api::azure_devops::basic_auth_header;
use devops_backlog::Config;
use httpmock::prelude::*;
use serde_json::{Value, json};

fn wiql_path() -> String {
    format!("/{ORG}/{PROJECT}/_apis/wit/wiql")
}

fn details_path() -> String {
    format!("/{ORG}/{PROJECT}/_apis/wit/workitems")
}

fn work_item(id: u64, kind: &str, parent: Option<u64>) -> Value {
    let mut item = json!({
        "id": id,
        "fields": {
            "System.Id": id,
            "System.Title": format!("Item {id}"),
            "System.TeamProject": PROJECT,
            "System.State": "Active",
            "System.WorkItemType": kind,
            "System.CreatedBy": {"displayName": "Criador"},
            "System.AssignedTo": {"displayName": "Dev"},
            "System.CreatedDate": "2024-05-10T00:00:00Z",
            "System.ChangedDate": "2024-05-11T00:00:00Z",
            "Microsoft.VSTS.Scheduling.CompletedWork": 5.0,
            "Microsoft.VSTS.Scheduling.OriginalEstimate": 8.0
        }
    });
    if let Some(parent) = parent {
        item["relations"] = json!([{
            "rel": "System.LinkTypes.Hierarchy-Reverse",
            "url": format!("https://dev.azure.com/{ORG}/_apis/wit/workItems/{parent}"),
            "attributes": {"isLocked": false, "name": "Parent"}
        }]);
    }
    item
}

#[tokio::test]
async fn post_backlog_returns_categorized_items() {
    let server = MockServer::start_async().await;
    let wiql = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(wiql_path())
                .query_param("api-version", "7.0")
                .header("authorization", basic_auth_header("fake-pat"))
                .body_contains("[System.TeamProject] = 'meu-projeto'")
                .body_contains("[System.CreatedDate] >= '2024-05-01'")
                .body_contains("[System.CreatedDate] <= '2024-05-31'");
            then.status(200).json_body(json!({
                "queryType": "flat",
                "workItems": [
                    {"id": 1, "url": "https://fake-url.com/wi/1"},
                    {"id": 2, "url": "https://fake-url.com/wi/2"},
                    {"id": 3, "url": "https://fake-url.com/wi/3"}
                ]
            }));
        })
        .await;
    let details = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(details_path())
                .query_param("$expand", "relations")
                .query_param_exists("ids");
            then.status(200).json_body(json!({
                "count": 3,
                "value": [
                    work_item(1, "Feature", None),
                    work_item(2, "Task", Some(1)),
                    work_item(3, "Bug", None)
                ]
            }));
        })
        .await;

    let app = app(config(&server.base_url()));
    let (status, body) = call_json(
        &app,
        post_json(
            "/backlog",
            &json!({
                "project_name": PROJECT,
                "organization": ORG,
                "pat": "fake-pat",
                "year": 2024,
                "month": 5
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["total_items"], 3);
    assert_eq!(body["parents"].as_array().unwrap().len(), 1);
    assert_eq!(body["children"].as_array().unwrap().len(), 2);
    assert_eq!(body["parents"][0]["id"], 1);
    assert_eq!(body["parents"][0]["created_by"], "Criador");
    assert_eq!(body["parents"][0]["created_date"], "10/05/2024");

    let task = &body["children"][0];
    assert_eq!(task["id"], 2);
    assert_eq!(task["parent_id"], 1);
    assert!(task["parent_link"].as_str().unwrap().ends_with("/workItems/1"));
    assert!(
        task["web_url"]
            .as_str()
            .unwrap()
            .ends_with("/minha-org/meu-projeto/_workitems/edit/2")
    );

    let metadata = &body["metadata"];
    assert_eq!(metadata["start_date"], "2024-05-01");
    assert_eq!(metadata["end_date"], "2024-05-31");
    assert_eq!(metadata["organization"], ORG);
    assert_eq!(metadata["project"], PROJECT);
    assert_eq!(metadata["total_parents"], 1);
    assert_eq!(metadata["total_children"], 2);
    assert!(metadata["applied_filters"].is_null());
    let keys: Vec<&str> = metadata
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    for key in [
        "start_date",
        "end_date",
        "organization",
        "project",
        "total_parents",
        "total_children",
    ] {
        assert!(keys.contains(&key), "metadata is missing {key}: {keys:?}");
    }
    assert!(!keys.contains(&"parents_count"));

    wiql.assert_async().await;
    details.assert_async().await;
}

#[tokio::test]
async fn get_backlog_turns_query_filters_into_wiql() {
    let server = MockServer::start_async().await;
    let wiql = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(wiql_path())
                .header("authorization", basic_auth_header(ENV_PAT))
                .body_contains("[System.WorkItemType] IN ('Bug', 'Task')")
                .body_contains("[System.State] IN ('New', 'Active')")
                .body_contains("[System.Tags] CONTAINS 'high_priority'");
            then.status(200).json_body(json!({"workItems": []}));
        })
        .await;
    let details = server
        .mock_async(|when, then| {
            when.method(GET).path(details_path());
            then.status(200).json_body(json!({"value": []}));
        })
        .await;

    let app = app(config(&server.base_url()));
    let (status, body) = call_json(
        &app,
        get("/backlog?project_name=meu-projeto&work_item_types=Bug,Task&states=New,Active&tags=high_priority"),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["total_items"], 0);
    assert_eq!(body["metadata"]["start_date"], "none");
    assert_eq!(body["metadata"]["end_date"], "none");
    assert_eq!(
        body["metadata"]["applied_filters"]["work_item_types"],
        json!(["Bug", "Task"])
    );
    assert_eq!(body["metadata"]["applied_filters"]["tags"], "high_priority");

    wiql.assert_async().await;
    assert_eq!(details.hits_async().await, 0);
}

#[tokio::test]
async fn get_backlog_converts_numeric_query_params() {
    let server = MockServer::start_async().await;
    let wiql = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(wiql_path())
                .body_contains("[System.CreatedDate] >= '2023-11-01'")
                .body_contains("[System.CreatedDate] <= '2023-11-30'");
            then.status(200).json_body(json!({"workItems": []}));
        })
        .await;

    let app = app(config(&server.base_url()));
    let (status, _) = call_json(
        &app,
        get("/backlog?project_name=meu-projeto&organization=minha-org&year=2023&month=11"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    wiql.assert_async().await;
}

#[tokio::test]
async fn details_are_fetched_in_batches() {
    let server = MockServer::start_async().await;
    let ids: Vec<Value> = (1..=250).map(|id| json!({"id": id})).collect();
    server
        .mock_async(|when, then| {
            when.method(POST).path(wiql_path());
            then.status(200).json_body(json!({"workItems": ids}));
        })
        .await;
    let details = server
        .mock_async(|when, then| {
            when.method(GET).path(details_path()).query_param_exists("ids");
            then.status(200)
                .json_body(json!({"value": [work_item(1, "Task", None)]}));
        })
        .await;

    let app = app(config(&server.base_url()));
    let (status, body) = call_json(&app, get("/backlog?project_name=meu-projeto")).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(details.hits_async().await, 2);
    assert_eq!(body["total_items"], 2);
}

#[tokio::test]
async fn project_falls_back_to_environment() {
    let server = MockServer::start_async().await;
    let wiql = server
        .mock_async(|when, then| {
            when.method(POST).path("/minha-org/default-project/_apis/wit/wiql");
            then.status(200).json_body(json!({"workItems": []}));
        })
        .await;

    let cfg = Config {
        azure_devops_project: "default-project".to_string(),
        ..config(&server.base_url())
    };
    let (status, body) = call_json(&app(cfg), get("/backlog")).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["metadata"]["project"], "default-project");
    wiql.assert_async().await;
}

#[tokio::test]
async fn missing_project_is_unprocessable() {
    let server = MockServer::start_async().await;
    let app = app(config(&server.base_url()));

    let (status, body) = call_json(&app, get("/backlog?year=2023&month=11")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("project_name"));
}

#[tokio::test]
async fn malformed_body_is_unprocessable() {
    let server = MockServer::start_async().await;
    let app = app(config(&server.base_url()));

    let (status, body) = call_json(
        &app,
        post_json("/backlog", &json!({"project_name": PROJECT, "year": "next"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn missing_pat_is_a_bad_request() {
    let server = MockServer::start_async().await;
    let wiql = server
        .mock_async(|when, then| {
            when.method(POST).path(wiql_path());
            then.status(401).body("unauthorized");
        })
        .await;

    let cfg = Config {
        azure_devops_pat: None,
        ..config(&server.base_url())
    };
    let (status, body) = call_json(
        &app(cfg),
        post_json(
            "/backlog",
            &json!({"project_name": PROJECT, "organization": ORG, "year": 2024, "month": 5}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"detail": "Personal Access Token must be provided in the request or set in the environment"})
    );
    assert_eq!(wiql.hits_async().await, 0);
}

#[tokio::test]
async fn missing_organization_is_a_bad_request() {
    let server = MockServer::start_async().await;
    let cfg = Config {
        azure_devops_organization: String::new(),
        ..config(&server.base_url())
    };
    let (status, body) = call_json(&app(cfg), get("/backlog?project_name=meu-projeto")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("organization must be provided"));
}

#[tokio::test]
async fn invalid_dates_are_rejected() {
    let server = MockServer::start_async().await;
    let app = app(config(&server.base_url()));

    let (status, body) = call_json(
        &app,
        post_json(
            "/backlog",
            &json!({
                "organization": ORG,
                "pat": "fake-pat",
                "project_name": "test_project",
                "start_date": "2023-13-01",
                "end_date": "2023-12-01"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Invalid date format"));
}

#[tokio::test]
async fn upstream_not_found_is_propagated() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(wiql_path());
            then.status(404)
                .body("TF200016: The following project does not exist: meu-projeto");
        })
        .await;

    let app = app(config(&server.base_url()));
    let (status, body) = call_json(&app, get("/backlog?project_name=meu-projeto")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("querying work items"));
    assert!(detail.contains("TF200016"));
}

#[tokio::test]
async fn upstream_server_errors_are_retried() {
    let server = MockServer::start_async().await;
    let wiql = server
        .mock_async(|when, then| {
            when.method(POST).path(wiql_path());
            then.status(503).body("service unavailable");
        })
        .await;

    let cfg = Config {
        retry_max_times: 2,
        ..config(&server.base_url())
    };
    let (status, _) = call_json(&app(cfg), get("/backlog?project_name=meu-projeto")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    wiql.assert_hits_async(3).await;
}

#[tokio::test]
async fn unreachable_upstream_is_service_unavailable() {
    // Nothing listens on the discard port.
    let cfg = config("http://127.0.0.1:9");
    let (status, body) = call_json(&app(cfg), get("/backlog?project_name=meu-projeto")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("Connection error"));
}

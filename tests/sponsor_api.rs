//! Sponsor portal against a mock dashboard backend

use std::sync::Arc;

use portal_sync::config::SponsorSettings;
use portal_sync::{
    Asset, ClientConfig, CollectingNotifier, LoadOutcome, PortalClient, RemovalPhase, SponsorPortal,
    SponsorRef,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const LOAD: &str = "/sponsors/dashboard-api/load-resources.json";
const SAVE: &str = "/sponsors/dashboard-api/add-resource.json";
const REMOVE: &str = "/sponsors/dashboard-api/remove-asset.json";

/// Confirms whatever payload was sent, assigning id 7 on first save
struct EchoDetail;

impl Respond for EchoDetail {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let id = match body["detail_id"].as_i64() {
            Some(-1) | None => 7,
            Some(id) => id,
        };
        ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "detail": {"id": id, "payload": body["payload"]}
        }))
    }
}

fn portal(server: &MockServer) -> (SponsorPortal, Arc<CollectingNotifier>) {
    let client = PortalClient::new(ClientConfig {
        base_url: server.uri(),
        ..Default::default()
    })
    .unwrap();
    let notifier = Arc::new(CollectingNotifier::new());
    let portal = SponsorPortal::new(
        client,
        &SponsorSettings::default(),
        SponsorRef::new(1, "acme"),
        "resources",
        notifier.clone(),
    );
    (portal, notifier)
}

fn payload(files: &[(&str, &str)]) -> String {
    let files: Vec<Value> = files
        .iter()
        .map(|(name, url)| json!({"name": name, "url": url}))
        .collect();
    json!({"data": {"description": "Widgets", "url": ""}, "files": files}).to_string()
}

fn sent_saves(requests: &[Request]) -> Vec<Value> {
    requests
        .iter()
        .filter(|r| r.url.path() == SAVE)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn load_decodes_first_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOAD))
        .and(body_json(json!({
            "sponsor_id": 1,
            "sponsor_slug": "acme",
            "detail_type": "resources"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "details": [{"id": 5, "payload": payload(&[("logo.png", "https://cdn.test/logo.png")])}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (portal, _) = portal(&server);
    assert_eq!(portal.load().await, LoadOutcome::Restored);

    let state = portal.state();
    assert_eq!(state.record.id, Some(5));
    assert_eq!(state.dynamic_value("description"), "Widgets");
    assert_eq!(portal.assets(), vec![Asset::new("logo.png", "https://cdn.test/logo.png")]);
}

#[tokio::test]
async fn first_save_creates_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOAD))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "details": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SAVE))
        .respond_with(EchoDetail)
        .mount(&server)
        .await;

    let (portal, notifier) = portal(&server);
    assert_eq!(portal.load().await, LoadOutcome::Empty);
    portal.set_field("url", "https://acme.test");
    portal.save(false).await.unwrap();
    portal.save(true).await.unwrap();

    assert_eq!(portal.state().record.id, Some(7));
    assert_eq!(portal.state().dynamic_value("url"), "https://acme.test");
    // silent second save
    assert_eq!(notifier.drain().len(), 1);

    let saves = sent_saves(&server.received_requests().await.unwrap());
    assert_eq!(saves[0]["detail_id"], -1);
    assert_eq!(saves[0]["complete"], "yes");
    assert_eq!(saves[1]["detail_id"], 7);
}

#[tokio::test]
async fn add_two_then_remove_one_leaves_the_other() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SAVE))
        .respond_with(EchoDetail)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REMOVE))
        .and(body_json(json!({"sponsor_id": 1, "sponsor_slug": "acme", "asset_url": "a"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (portal, notifier) = portal(&server);
    portal.toggle_upload_form();
    portal.add_uploaded(vec![Asset::new("a.pdf", "a")]).await.unwrap();
    portal.add_uploaded(vec![Asset::new("b.pdf", "b")]).await.unwrap();
    assert!(!portal.is_upload_form_open());

    portal.request_removal(&Asset::new("a.pdf", "a")).unwrap();
    portal.confirm_removal().await.unwrap();

    let urls: Vec<String> = portal.assets().into_iter().map(|a| a.url).collect();
    assert_eq!(urls, vec!["b"]);
    assert_eq!(portal.removal_phase(), RemovalPhase::Done);

    let messages: Vec<String> = notifier.drain().into_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec![
            "Successfully uploaded 1 file(s)",
            "Successfully uploaded 1 file(s)",
            "Successfully removed file",
        ]
    );

    let saves = sent_saves(&server.received_requests().await.unwrap());
    let last: Value = serde_json::from_str(saves[2]["payload"].as_str().unwrap()).unwrap();
    assert_eq!(last["files"], json!([{"name": "b.pdf", "url": "b"}]));
}

#[tokio::test]
async fn failed_delete_keeps_assets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOAD))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "details": [{"id": 5, "payload": payload(&[("a.pdf", "a")])}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REMOVE))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "not found"})),
        )
        .mount(&server)
        .await;

    let (portal, notifier) = portal(&server);
    portal.load().await;
    portal.request_removal(&Asset::new("a.pdf", "a")).unwrap();
    assert!(portal.confirm_removal().await.is_err());

    let state = portal.state();
    assert_eq!(portal.assets(), vec![Asset::new("a.pdf", "a")]);
    assert!(!state.is_loading);
    assert_eq!(portal.removal_phase(), RemovalPhase::Idle);
    assert_eq!(notifier.errors(), vec!["Failed to remove file: not found"]);
    assert!(sent_saves(&server.received_requests().await.unwrap()).is_empty());
}

#[tokio::test]
async fn rejected_save_without_message_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SAVE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let (portal, notifier) = portal(&server);
    portal.set_field("description", "New");
    assert!(portal.save(false).await.is_err());

    assert_eq!(portal.state().dynamic_value("description"), "New");
    assert_eq!(portal.state().record.id, None);
    assert_eq!(notifier.errors(), vec!["An error occurred"]);
}

#[tokio::test]
async fn failed_load_is_reported_apart_from_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOAD))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (portal, notifier) = portal(&server);
    assert_eq!(portal.load().await, LoadOutcome::Failed);
    assert_eq!(portal.state().record.id, None);
    assert!(notifier.snapshot().is_empty());
}

#[tokio::test]
async fn array_payload_in_save_response_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOAD))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "details": [{"id": 5, "payload": payload(&[("a.pdf", "a")])}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SAVE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "detail": {"id": 5, "payload": "[]"}
        })))
        .mount(&server)
        .await;

    let (portal, notifier) = portal(&server);
    portal.load().await;
    let before = portal.state().record;

    let err = portal.save(false).await.unwrap_err();
    assert!(matches!(err, portal_sync::SyncError::Protocol { .. }));
    assert_eq!(portal.state().record, before);
    assert_eq!(notifier.errors(), vec!["An error occurred"]);
}

//! Boundary tests: naming translation and failure shape across the
//! display-layer interface.
//!
//! The transport marshals JSON; these tests verify that camelCase request
//! parameters land in snake_case engine parameters, that payload fields and
//! variant names serialize with their explicit camelCase mapping, and that
//! failures cross as tagged data rather than error types.

mod common;

use common::{MemoryStore, ScriptedFocus, StaticProcesses, build_engine, process};
use drswatch::api::{self, Reply, Request};
use drswatch::engine::Engine;

fn engine() -> (Engine, MemoryStore) {
    let store = MemoryStore::new();
    let processes = StaticProcesses::new(vec![process(10, "game.exe")]);
    let focus = ScriptedFocus::new(None);
    let engine = build_engine(&store, &processes, &focus);
    (engine, store)
}

fn request(json: &str) -> Request {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn create_profile_accepts_camel_case_parameters() {
    let (engine, _store) = engine();

    let reply = api::dispatch(
        &engine,
        request(r#"{"request": "create_profile", "executable": "game.exe", "profileName": "Game"}"#),
    )
    .await;
    assert_eq!(reply, Reply::Ack);

    let reply = api::dispatch(&engine, request(r#"{"request": "get_all_applications"}"#)).await;
    let Reply::Applications(entries) = reply else {
        panic!("expected applications, got {reply:?}");
    };
    assert_eq!(entries[0].profile_name, "Game");
}

#[tokio::test]
async fn payload_fields_serialize_camel_case() {
    let (engine, store) = engine();
    store.seed("Game Profile", "game.exe", true);

    let reply = api::dispatch(&engine, request(r#"{"request": "get_running_processes"}"#)).await;
    let value = serde_json::to_value(&reply).unwrap();

    assert_eq!(value["kind"], "processes");
    let row = &value["body"][0];
    assert_eq!(row["processName"], "game.exe");
    assert_eq!(row["hasProfile"], true);
    assert_eq!(row["profileName"], "Game Profile");
    assert_eq!(row["blacklist"], "blacklisted");
    // The engine-side spelling must not leak through.
    assert!(row.get("process_name").is_none());
    assert!(row.get("has_profile").is_none());
}

#[tokio::test]
async fn status_request_reports_availability_as_data() {
    let (engine, store) = engine();

    let reply = api::dispatch(&engine, request(r#"{"request": "check_nvapi_status"}"#)).await;
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["kind"], "status");
    assert_eq!(value["body"]["available"], true);

    store.set_available(false);
    let reply = api::dispatch(&engine, request(r#"{"request": "check_nvapi_status"}"#)).await;
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["body"]["available"], false);
    assert!(value["body"]["error"].is_string());
}

#[tokio::test]
async fn unavailable_store_crosses_as_tagged_failure_not_error() {
    let (engine, store) = engine();
    store.set_available(false);

    let reply = api::dispatch(&engine, request(r#"{"request": "get_running_processes"}"#)).await;
    let value = serde_json::to_value(&reply).unwrap();

    assert_eq!(value["kind"], "failure");
    assert_eq!(value["body"]["code"], "storeUnavailable");
    assert!(!value["body"]["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn blacklist_round_trip_through_the_boundary() {
    let (engine, store) = engine();
    store.seed("Game Profile", "game.exe", false);

    let reply = api::dispatch(
        &engine,
        request(r#"{"request": "blacklist_application", "executable": "game.exe"}"#),
    )
    .await;
    let Reply::Blacklist(result) = reply else {
        panic!("expected blacklist result, got {reply:?}");
    };
    assert!(result.success);

    let reply = api::dispatch(
        &engine,
        request(r#"{"request": "unblacklist_application", "executable": "game.exe"}"#),
    )
    .await;
    let Reply::Blacklist(result) = reply else {
        panic!("expected blacklist result, got {reply:?}");
    };
    assert!(result.success);

    // Unknown executable: a structured non-success, still not a failure.
    let reply = api::dispatch(
        &engine,
        request(r#"{"request": "blacklist_application", "executable": "ghost.exe"}"#),
    )
    .await;
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["kind"], "blacklist");
    assert_eq!(value["body"]["success"], false);
    assert_eq!(value["body"]["executable"], "ghost.exe");
}

#[tokio::test]
async fn focus_reply_distinguishes_none_from_unprofiled() {
    let store = MemoryStore::new();
    store.seed("A Profile", "a.exe", false);
    let processes = StaticProcesses::new(vec![]);
    let focus = ScriptedFocus::new(None);
    let engine = build_engine(&store, &processes, &focus);

    let reply = api::dispatch(&engine, request(r#"{"request": "get_focus_application"}"#)).await;
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["kind"], "focus");
    assert!(value["body"].is_null());

    focus.set(Some(common::focus_info(1, "a.exe")));
    let reply = api::dispatch(&engine, request(r#"{"request": "get_focus_application"}"#)).await;
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["body"]["isInStore"], true);
    assert_eq!(value["body"]["blacklist"], "notBlacklisted");
}

#[tokio::test]
async fn reload_settings_acks() {
    let (engine, _store) = engine();
    let reply = api::dispatch(&engine, request(r#"{"request": "reload_settings"}"#)).await;
    assert_eq!(reply, Reply::Ack);
}

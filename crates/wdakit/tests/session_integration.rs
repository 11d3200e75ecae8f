//! Integration tests for session and element scoped routes.
//!
//! These tests verify the end-to-end flow:
//!   Session/Element -> Endpoint -> Transport -> mock agent -> Envelope
//!
//! Sessions are attached by id, so no `POST /session` is scripted.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{envelope, error_envelope, MockAgent};

use wdakit::action::{FingerAction, PressOptions, TouchActions, TouchOptions, W3CActions};
use wdakit::model::{AppState, Direction};
use wdakit::{AppLaunchOptions, Locator, Session, WdaError};

const W3C_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

fn element_value(id: &str) -> serde_json::Value {
    json!({ "ELEMENT": id, W3C_KEY: id })
}

async fn session_with(responses: Vec<String>) -> (MockAgent, Session) {
    let agent = MockAgent::start(responses).await;
    let session = agent.client().attach_session("S");
    (agent, session)
}

// ---------------------------------------------------------------------------
// Finding elements
// ---------------------------------------------------------------------------

#[tokio::test]
async fn find_element_posts_locator() {
    let (agent, session) = session_with(vec![envelope(element_value("E1"), Some("S"))]).await;
    let element = session
        .find_element(&Locator::AccessibilityId("login".into()))
        .await
        .unwrap();
    assert_eq!(element.id(), "E1");

    let req = agent.request(0).await;
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/session/S/element");
    assert_eq!(req.json(), json!({"using": "accessibility id", "value": "login"}));
}

#[tokio::test]
async fn find_element_agent_not_found_maps_to_no_such_element() {
    let (_agent, session) = session_with(vec![error_envelope(
        "no such element",
        "unable to find an element using 'name', value 'Missing'",
    )])
    .await;
    let err = session
        .find_element(&Locator::Name("Missing".into()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some("no such element"));
    match err {
        WdaError::NoSuchElement { using, value } => {
            assert_eq!(using, "name");
            assert_eq!(value, "Missing");
        }
        other => panic!("expected NoSuchElement, got: {other:?}"),
    }
}

#[tokio::test]
async fn find_element_other_agent_errors_pass_through() {
    let (_agent, session) =
        session_with(vec![error_envelope("invalid session id", "Session does not exist")]).await;
    let err = session
        .find_element(&Locator::Name("x".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, WdaError::Agent(_)), "{err:?}");
    assert_eq!(err.kind(), Some("invalid session id"));
}

#[tokio::test]
async fn find_elements_empty_list_is_not_found() {
    let (_agent, session) = session_with(vec![envelope(json!([]), Some("S"))]).await;
    let err = session
        .find_elements(&Locator::ClassName("XCUIElementTypeCell".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, WdaError::NoSuchElement { .. }), "{err:?}");
}

#[tokio::test]
async fn find_elements_returns_every_id() {
    let (agent, session) = session_with(vec![envelope(
        json!([element_value("E1"), element_value("E2")]),
        Some("S"),
    )])
    .await;
    let elements = session
        .find_elements(&Locator::Predicate("type == 'XCUIElementTypeCell'".into()))
        .await
        .unwrap();
    let ids: Vec<&str> = elements.iter().map(|e| e.id()).collect();
    assert_eq!(ids, ["E1", "E2"]);
    assert_eq!(agent.request(0).await.path, "/session/S/elements");
}

#[tokio::test]
async fn element_scoped_routes() {
    let (agent, session) = session_with(vec![
        envelope(element_value("E1"), Some("S")),
        envelope(element_value("E2"), Some("S")),
        envelope(json!(null), Some("S")),
        envelope(json!("Sign in"), Some("S")),
        envelope(json!({"x": 10.0, "y": 20.0, "width": 100.0, "height": 40.0}), Some("S")),
    ])
    .await;

    let form = session.find_element(&Locator::Id("form".into())).await.unwrap();
    let button = form
        .find_element(&Locator::ClassChain("**/XCUIElementTypeButton".into()))
        .await
        .unwrap();
    button.click().await.unwrap();
    assert_eq!(button.text().await.unwrap(), "Sign in");
    let rect = button.rect().await.unwrap();
    assert_eq!(rect.center(), (60.0, 40.0));

    let paths: Vec<String> = agent.requests().await.into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        [
            "/session/S/element",
            "/session/S/element/E1/element",
            "/session/S/element/E2/click",
            "/session/S/element/E2/text",
            "/session/S/element/E2/rect",
        ]
    );
}

#[tokio::test]
async fn element_validation_rejects_before_sending() {
    let (agent, session) = session_with(vec![envelope(element_value("E1"), Some("S"))]).await;
    let element = session.find_element(&Locator::Name("map".into())).await.unwrap();

    let err = element.tap_with_number_of_taps(11, 1).await.unwrap_err();
    assert!(matches!(err, WdaError::InvalidArgument(_)), "{err:?}");
    let err = element.rotate(7.0, None).await.unwrap_err();
    assert!(matches!(err, WdaError::InvalidArgument(_)), "{err:?}");

    assert_eq!(agent.requests().await.len(), 1);
}

#[tokio::test]
async fn pinch_by_actions_moves_both_fingers_onto_element() {
    let (agent, session) = session_with(vec![
        envelope(element_value("E1"), Some("S")),
        envelope(json!({"x": 0.0, "y": 0.0, "width": 300.0, "height": 200.0}), Some("S")),
    ])
    .await;
    let element = session.find_element(&Locator::Name("photo".into())).await.unwrap();
    element.pinch_to_zoom_out_by_actions(None).await.unwrap();

    let req = agent.request(2).await;
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/session/S/actions");
    let body = req.json();
    let sources = body["actions"].as_array().unwrap();
    let ids: Vec<&str> = sources.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["finger1", "finger2"]);

    let origin = json!({ W3C_KEY: "E1" });
    assert_eq!(
        sources[0]["actions"][0],
        json!({"type": "pointerMove", "x": -6.0, "y": -4.0, "origin": origin})
    );
    assert_eq!(
        sources[1]["actions"][0],
        json!({"type": "pointerMove", "x": 6.0, "y": 4.0, "origin": origin})
    );
    for source in sources {
        let moves: Vec<&serde_json::Value> = source["actions"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|a| a["type"] == "pointerMove")
            .collect();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[1]["x"], json!(0.0));
        assert_eq!(moves[1]["y"], json!(0.0));
        assert_eq!(moves[1]["origin"], origin);
    }
}

#[tokio::test]
async fn element_screenshot_without_value_is_missing_field() {
    let (_agent, session) = session_with(vec![
        envelope(element_value("E1"), Some("S")),
        envelope(json!(null), Some("S")),
    ])
    .await;
    let element = session.find_element(&Locator::Name("logo".into())).await.unwrap();
    let err = element.screenshot().await.unwrap_err();
    assert!(
        matches!(err, WdaError::MissingField { field: "value", .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn element_swipe_sends_direction() {
    let (agent, session) = session_with(vec![
        envelope(element_value("E1"), Some("S")),
        envelope(json!(null), Some("S")),
    ])
    .await;
    let element = session.find_element(&Locator::Name("list".into())).await.unwrap();
    element.swipe(Direction::Up).await.unwrap();

    let req = agent.request(1).await;
    assert_eq!(req.path, "/session/S/wda/element/E1/swipe");
    assert_eq!(req.json(), json!({"direction": "up"}));
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn perform_actions_posts_all_sources() {
    let (agent, session) = session_with(vec![envelope(json!(null), Some("S"))]).await;
    let actions = W3CActions::new()
        .finger(FingerAction::new().tap(10.0, 20.0, None))
        .send_keys("a")
        .finger(FingerAction::new().tap(30.0, 40.0, None));
    session.perform_actions(&actions).await.unwrap();

    let req = agent.request(0).await;
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/session/S/actions");
    let body = req.json();
    let sources = body["actions"].as_array().unwrap();
    let ids: Vec<&str> = sources.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["finger1", "keyboard1", "finger2"]);
    assert_eq!(sources[0]["parameters"], json!({"pointerType": "touch"}));
    assert_eq!(
        sources[1]["actions"],
        json!([{"type": "keyDown", "value": "a"}, {"type": "keyUp", "value": "a"}])
    );
}

#[tokio::test]
async fn perform_touch_actions_posts_millisecond_waits() {
    let (agent, session) = session_with(vec![envelope(json!(null), Some("S"))]).await;
    let actions = TouchActions::new()
        .press(PressOptions::new().xy(5.0, 6.0))
        .wait(2.0)
        .move_to(TouchOptions::new().xy(50.0, 60.0))
        .release();
    session.perform_touch_actions(&actions).await.unwrap();

    let req = agent.request(0).await;
    assert_eq!(req.path, "/session/S/wda/touch/multi/perform");
    let body = req.json();
    assert_eq!(body["actions"][1], json!({"action": "wait", "options": {"ms": 2000}}));
    assert_eq!(body["actions"][3], json!({"action": "release"}));
}

#[tokio::test]
async fn coordinate_tap_uses_wda_route() {
    let (agent, session) = session_with(vec![envelope(json!(null), Some("S"))]).await;
    session.tap(100.0, 200.0).await.unwrap();
    let req = agent.request(0).await;
    assert_eq!(req.path, "/session/S/wda/tap/0");
    assert_eq!(req.json(), json!({"x": 100.0, "y": 200.0}));
}

#[tokio::test]
async fn swipe_up_crosses_window_centre() {
    let (agent, session) = session_with(vec![
        envelope(json!({"width": 400.0, "height": 800.0}), Some("S")),
        envelope(json!(null), Some("S")),
    ])
    .await;
    session.swipe_up().await.unwrap();

    assert_eq!(agent.request(0).await.path, "/session/S/window/size");
    let drag = agent.request(1).await;
    assert_eq!(drag.path, "/session/S/wda/dragfromtoforduration");
    assert_eq!(
        drag.json(),
        json!({"fromX": 200.0, "fromY": 500.0, "toX": 200.0, "toY": 300.0, "duration": 0.0})
    );
}

// ---------------------------------------------------------------------------
// Apps, keys and alerts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn app_launch_defaults_to_waiting_for_quiescence() {
    let (agent, session) = session_with(vec![
        envelope(json!(null), Some("S")),
        envelope(json!(null), Some("S")),
    ])
    .await;
    session.app_launch("com.example.app", None).await.unwrap();
    session
        .app_launch(
            "com.example.app",
            Some(AppLaunchOptions::new().arg("-debug").env("MODE", "test")),
        )
        .await
        .unwrap();

    assert_eq!(agent.request(0).await.path, "/session/S/wda/apps/launch");
    assert_eq!(
        agent.request(0).await.json(),
        json!({"bundleId": "com.example.app", "shouldWaitForQuiescence": true})
    );
    assert_eq!(
        agent.request(1).await.json(),
        json!({"bundleId": "com.example.app", "arguments": ["-debug"], "environment": {"MODE": "test"}})
    );
}

#[tokio::test]
async fn app_deactivate_raises_short_durations() {
    let (agent, session) = session_with(vec![]).await;
    session.app_deactivate(Some(1.0)).await.unwrap();
    session.app_deactivate(Some(5.0)).await.unwrap();
    session.app_deactivate(None).await.unwrap();

    let reqs = agent.requests().await;
    assert_eq!(reqs[0].path, "/session/S/wda/deactivateApp");
    assert_eq!(reqs[0].json(), json!({"duration": 3.0}));
    assert_eq!(reqs[1].json(), json!({"duration": 5.0}));
    assert_eq!(reqs[2].json(), json!({}));
}

#[tokio::test]
async fn app_state_is_decoded() {
    let (_agent, session) = session_with(vec![envelope(json!(4), Some("S"))]).await;
    let state = session.app_state("com.example.app").await.unwrap();
    assert_eq!(state, AppState::RunningForeground);
}

#[tokio::test]
async fn send_keys_splits_text() {
    let (agent, session) = session_with(vec![envelope(json!(null), Some("S"))]).await;
    session.send_keys("hi", None).await.unwrap();
    let req = agent.request(0).await;
    assert_eq!(req.path, "/session/S/wda/keys");
    assert_eq!(req.json(), json!({"value": ["h", "i"], "frequency": 60}));
}

#[tokio::test]
async fn alert_accept_with_label() {
    let (agent, session) = session_with(vec![
        envelope(json!(null), Some("S")),
        envelope(json!(null), Some("S")),
    ])
    .await;
    session.alert_accept(Some("Allow")).await.unwrap();
    session.alert_dismiss(None).await.unwrap();

    assert_eq!(agent.request(0).await.path, "/session/S/alert/accept");
    assert_eq!(agent.request(0).await.json(), json!({"name": "Allow"}));
    assert_eq!(agent.request(1).await.path, "/session/S/alert/dismiss");
    assert_eq!(agent.request(1).await.json(), json!({}));
}

#[tokio::test]
async fn screen_metrics_are_decoded() {
    let (agent, session) = session_with(vec![]).await;
    agent
        .route(
            "GET",
            "/session/S/wda/screen",
            envelope(
                json!({"statusBarSize": {"width": 390.0, "height": 47.0}, "scale": 3.0}),
                Some("S"),
            ),
        )
        .await;

    assert_eq!(session.scale().await.unwrap(), 3.0);
    let bar = session.status_bar_size().await.unwrap();
    assert_eq!((bar.width, bar.height), (390.0, 47.0));
    assert_eq!(agent.requests().await.len(), 2);
}

// ---------------------------------------------------------------------------
// Waiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wait_polls_until_condition_holds() {
    let (agent, session) = session_with(vec![
        envelope(json!(false), Some("S")),
        envelope(json!(false), Some("S")),
        envelope(json!(true), Some("S")),
    ])
    .await;
    session
        .wait_with_timeout_and_interval(
            Duration::from_secs(5),
            Duration::from_millis(10),
            |s| async move { s.is_locked().await },
        )
        .await
        .unwrap();
    assert_eq!(agent.requests().await.len(), 3);
}

#[tokio::test]
async fn wait_returns_agent_error_without_retrying() {
    let (agent, session) =
        session_with(vec![error_envelope("invalid session id", "Session does not exist")]).await;
    let err = session
        .wait_with_timeout_and_interval(
            Duration::from_secs(5),
            Duration::from_millis(10),
            |s| async move { s.is_locked().await },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some("invalid session id"));
    assert_eq!(agent.requests().await.len(), 1);
}

#[tokio::test]
async fn wait_times_out() {
    let (_agent, session) = session_with(vec![]).await;
    let err = session
        .wait_with_timeout_and_interval(
            Duration::from_millis(50),
            Duration::from_millis(10),
            |s| async move { s.is_locked().await },
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
}

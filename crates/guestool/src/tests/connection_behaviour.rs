//! End-to-end tests of the agent against a scripted management host.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use crate::bootstrap::{Agent, StaticConfigLoader, bootstrap_with};
use crate::connection::ConnectionState;
use crate::dispatch::{
    BYE, DispatchError, Message, OperationTable, REPORT_ACTION, REPORT_INFO, from_async_fn,
    from_fn,
};
use crate::host::{Checker, Matcher, MatcherManager, MatcherState, Rule};

use super::support::{
    FakeHost, HealthEvent, RecordingHealthReporter, config_for, disabled_config, refused_url,
};

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    agent: Agent,
    reporter: Arc<RecordingHealthReporter>,
    greeter: Arc<Matcher>,
}

fn info_table() -> OperationTable {
    OperationTable::new()
        .with(
            "slow",
            from_async_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, DispatchError>("slow")
            }),
        )
        .with("fast", from_fn(|_| Ok::<_, DispatchError>("fast")))
}

fn launch(config: guestool_config::Config) -> Harness {
    launch_with(config, info_table())
}

fn launch_with(config: guestool_config::Config, info: OperationTable) -> Harness {
    let manager = Arc::new(MatcherManager::new());
    let greeter = Matcher::new(
        "greeter",
        "greeter.handlers",
        MatcherState::message(Rule::from(Checker::startswith(["hello"], false)), 10, false),
    );
    manager.register(Arc::clone(&greeter));
    let reporter = Arc::new(RecordingHealthReporter::default());
    let agent = bootstrap_with(
        &StaticConfigLoader(config),
        reporter.clone(),
        manager,
        info,
    )
    .expect("bootstrap should succeed");
    agent.start();
    Harness {
        agent,
        reporter,
        greeter,
    }
}

// Takes 300ms and raises `finished` only if it runs to the end.
fn lengthy_info(finished: &Arc<AtomicBool>) -> OperationTable {
    let finished = Arc::clone(finished);
    OperationTable::new().with(
        "lengthy",
        from_async_fn(move |_| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                finished.store(true, Ordering::SeqCst);
                Ok::<_, DispatchError>("done")
            }
        }),
    )
}

async fn wait_closed(agent: &Agent) {
    tokio::time::timeout(WAIT, agent.closed())
        .await
        .expect("agent did not close in time");
}

#[tokio::test]
async fn handshake_then_list_matchers() {
    let host = FakeHost::bind().await;
    let harness = launch(config_for(host.url()));
    let mut session = host.accept().await;

    let hello = session.complete_handshake().await;
    assert_eq!(hello.opnm, "/greet/hello");
    assert_eq!(hello.opct, json!({}));
    harness
        .reporter
        .wait_until(|events| events.contains(&HealthEvent::Connected))
        .await;
    assert_eq!(harness.agent.state(), ConnectionState::Active);

    let response = session
        .request("list-1", "/action/matcher/list", json!({}))
        .await;
    assert_eq!(response.opid, "list-1");
    assert_eq!(response.opnm, REPORT_ACTION);
    let ids = response.opct.as_array().expect("id array").clone();
    assert_eq!(ids.len(), 1);

    let described = session
        .request("info-1", "/action/matcher/info", json!({ "id": ids[0] }))
        .await;
    assert_eq!(described.opct["plugin_name"], "greeter");
    assert_eq!(described.opct["rule"]["match_type"], "startswith");
    assert_eq!(described.opct["priority"], 10);

    harness.agent.stop().await;
    assert_eq!(harness.agent.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn hack_over_the_wire_changes_the_live_matcher() {
    let host = FakeHost::bind().await;
    let harness = launch(config_for(host.url()));
    let mut session = host.accept().await;
    session.complete_handshake().await;

    let listed = session.request("1", "/action/matcher/list", json!({})).await;
    let id = listed.opct[0].clone();
    let change = json!({
        "type": "message",
        "rule": {"match_type": "regex", "pattern": "^ping$", "flags": 2},
        "priority": 4,
        "block": true,
    });
    let reply = session
        .request("2", "/action/matcher/hack", json!({ "id": id, "change": change }))
        .await;

    assert_eq!(reply.opct, json!({ "id": id, "status": "hacked" }));
    assert_eq!(harness.greeter.priority(), 4);
    assert!(harness.greeter.block());
    assert!(harness.greeter.check(&crate::host::Event::message("PING")));
    harness.agent.stop().await;
}

#[tokio::test]
async fn unknown_verbs_are_answered_and_the_connection_stays_open() {
    let host = FakeHost::bind().await;
    let harness = launch(config_for(host.url()));
    let mut session = host.accept().await;
    session.complete_handshake().await;

    let info = session.request("a", "/info/cpu2", json!({})).await;
    assert_eq!(
        info,
        Message::new("a", REPORT_INFO, json!({"error": "unknown info type"}))
    );

    let action = session.request("b", "/action/matcher/zap", json!({})).await;
    assert_eq!(
        action,
        Message::new("b", REPORT_ACTION, json!({"error": "unknown action type"}))
    );

    let stray = session.request("c", "/event/report/info", json!({})).await;
    assert_eq!(stray.opnm, REPORT_ACTION);
    assert_eq!(stray.opct, json!({"error": "unknown action type"}));

    session.send_text("this is not json").await;
    let still_open = session.request("d", "/info/fast", Value::Null).await;
    assert_eq!(still_open.opct, json!("fast"));
    assert_eq!(harness.agent.state(), ConnectionState::Active);
    harness.agent.stop().await;
}

#[tokio::test]
async fn slow_requests_do_not_block_fast_ones() {
    let host = FakeHost::bind().await;
    let harness = launch(config_for(host.url()));
    let mut session = host.accept().await;
    session.complete_handshake().await;

    session
        .send(&Message::new("slow-1", "/info/slow", Value::Null))
        .await;
    session
        .send(&Message::new("fast-1", "/info/fast", Value::Null))
        .await;

    let first = session.recv().await;
    let second = session.recv().await;
    assert_eq!(first.opid, "fast-1");
    assert_eq!(second.opid, "slow-1");
    assert_eq!(second.opct, json!("slow"));
    harness.agent.stop().await;
}

#[tokio::test]
async fn bye_is_echoed_before_closing() {
    let host = FakeHost::bind().await;
    let harness = launch(config_for(host.url()));
    let mut session = host.accept().await;
    session.complete_handshake().await;

    let bye = format!(r#"{{ "opid": "bye-1", "opnm": "{BYE}", "opct": {{}} }}"#);
    session.send_text(&bye).await;

    assert_eq!(session.recv_text().await.as_deref(), Some(bye.as_str()));
    assert!(session.closes().await, "agent should close after bye");
    wait_closed(&harness.agent).await;
    let events = harness.reporter.events();
    assert!(events.contains(&HealthEvent::Disconnected), "{events:?}");
    assert!(harness.reporter.connection_failure().is_none(), "{events:?}");
}

#[tokio::test]
async fn handshake_mismatch_closes_without_retry() {
    let host = FakeHost::bind().await;
    let harness = launch(config_for(host.url()));
    let mut session = host.accept().await;

    let _hello = session.recv().await;
    session
        .send(&Message::new("someone-else", "/greet/hello", json!({})))
        .await;

    assert!(session.closes().await, "agent should close on mismatch");
    wait_closed(&harness.agent).await;
    let failure = harness
        .reporter
        .connection_failure()
        .expect("failure reported");
    assert!(failure.contains("handshake mismatch"), "{failure}");
    assert_eq!(harness.reporter.count(&HealthEvent::Connecting), 1);
    assert!(!harness.reporter.events().contains(&HealthEvent::Connected));
}

#[tokio::test]
async fn handshake_timeout_closes_without_retry() {
    let host = FakeHost::bind().await;
    let mut config = config_for(host.url());
    config.handshake_timeout_ms = 100;
    let harness = launch(config);
    let mut session = host.accept().await;

    let _hello = session.recv().await;

    wait_closed(&harness.agent).await;
    let failure = harness
        .reporter
        .connection_failure()
        .expect("failure reported");
    assert!(failure.contains("handshake not echoed"), "{failure}");
    assert!(session.closes().await);
    assert_eq!(harness.reporter.count(&HealthEvent::Connecting), 1);
}

#[tokio::test]
async fn refused_connections_are_retried_until_the_host_appears() {
    let url = refused_url().await;
    let harness = launch(config_for(&url));

    harness
        .reporter
        .wait_until(|events| {
            events
                .iter()
                .filter(|event| **event == HealthEvent::ConnectionRefused)
                .count()
                >= 2
        })
        .await;

    let address = url.trim_start_matches("ws://");
    let host = FakeHost::bind_to(address).await;
    let mut session = host.accept().await;
    session.complete_handshake().await;
    harness
        .reporter
        .wait_until(|events| events.contains(&HealthEvent::Connected))
        .await;
    harness.agent.stop().await;
}

#[tokio::test]
async fn stop_cancels_a_pending_retry() {
    let url = refused_url().await;
    let harness = launch(config_for(&url));
    harness
        .reporter
        .wait_until(|events| events.contains(&HealthEvent::ConnectionRefused))
        .await;

    tokio::time::timeout(WAIT, harness.agent.stop())
        .await
        .expect("stop should not wait for the retry delay");
    harness.agent.stop().await;

    assert_eq!(harness.agent.state(), ConnectionState::Closed);
    let attempts = harness.reporter.count(&HealthEvent::Connecting);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.reporter.count(&HealthEvent::Connecting), attempts);
}

#[tokio::test]
async fn disabled_agent_never_connects() {
    let harness = launch(disabled_config());

    wait_closed(&harness.agent).await;
    let events = harness.reporter.events();
    assert!(events.contains(&HealthEvent::AgentDisabled), "{events:?}");
    assert!(!events.contains(&HealthEvent::Connecting), "{events:?}");
}

#[tokio::test]
async fn bye_cancels_requests_still_in_flight() {
    let finished = Arc::new(AtomicBool::new(false));
    let host = FakeHost::bind().await;
    let harness = launch_with(config_for(host.url()), lengthy_info(&finished));
    let mut session = host.accept().await;
    session.complete_handshake().await;

    session
        .send(&Message::new("lengthy-1", "/info/lengthy", Value::Null))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let bye = Message::new("bye-1", BYE, json!({}));
    session.send(&bye).await;

    assert_eq!(session.recv().await, bye, "only the bye echo is sent");
    assert!(session.closes().await, "no response for the lengthy request");
    wait_closed(&harness.agent).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst), "handler kept running");
}

#[tokio::test]
async fn host_drop_cancels_requests_still_in_flight() {
    let finished = Arc::new(AtomicBool::new(false));
    let host = FakeHost::bind().await;
    let harness = launch_with(config_for(host.url()), lengthy_info(&finished));
    let mut session = host.accept().await;
    session.complete_handshake().await;

    session
        .send(&Message::new("lengthy-1", "/info/lengthy", Value::Null))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(session);

    wait_closed(&harness.agent).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst), "handler kept running");
    assert!(
        harness.reporter.events().contains(&HealthEvent::Disconnected),
        "{:?}",
        harness.reporter.events()
    );
}

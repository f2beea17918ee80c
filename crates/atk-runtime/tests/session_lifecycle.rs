//! Session lifecycle across pipeline failures
//!
//! Interceptions must be gone after a session ends, whether the pipeline
//! returned, failed, or panicked.

use atk_core::{CallArgs, CallOutcome, InterceptionSpec, MethodTag};
use atk_runtime::{FnEndpoint, InterceptionSession, RemoteAgent, Switchboard};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};

const AGENT: &str = "demo.agents.agent1";

fn switchboard_with_original() -> Switchboard {
    let switchboard = Switchboard::new();
    switchboard.bind(AGENT, MethodTag::Invoke, FnEndpoint::constant(json!("original")));
    switchboard.bind(AGENT, MethodTag::AInvoke, FnEndpoint::constant(json!("original-async")));
    switchboard
}

fn mocked(method: MethodTag) -> InterceptionSpec {
    InterceptionSpec::unconditional(AGENT, method, json!("mocked"))
}

/// Panicking pipeline still leaves the address un-mocked
#[test]
fn panic_inside_session_restores_original() {
    let switchboard = switchboard_with_original();
    let agent = RemoteAgent::new(&switchboard, AGENT);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _session = InterceptionSession::open(&switchboard, vec![mocked(MethodTag::Invoke)])
            .expect("session opens");
        assert_eq!(agent.invoke(json!({})).unwrap(), json!("mocked"));
        panic!("pipeline blew up");
    }));

    assert!(result.is_err());
    assert_eq!(agent.invoke(json!({})).unwrap(), json!("original"));
    assert!(switchboard.active_session().is_none());
}

/// Failed pipeline result does not skip teardown
#[test]
fn failing_pipeline_then_close_restores_original() {
    let switchboard = switchboard_with_original();
    let agent = RemoteAgent::new(&switchboard, AGENT);
    let session = InterceptionSession::open(&switchboard, vec![mocked(MethodTag::Invoke)]).unwrap();

    let run: Result<Value, String> = agent
        .invoke(json!({"step": 1}))
        .map_err(|e| e.to_string())
        .and_then(|_| Err("downstream failure".to_string()));
    assert!(run.is_err());

    let ledger = session.close().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.records()[0].outcome, CallOutcome::Answered);
    assert_eq!(agent.invoke(json!({})).unwrap(), json!("original"));
}

/// Async interceptions resolve on a plain executor, no runtime needed
#[test]
fn async_interception_resolves_on_block_on() {
    let switchboard = switchboard_with_original();
    let agent = RemoteAgent::new(&switchboard, AGENT);
    let session = InterceptionSession::open(&switchboard, vec![mocked(MethodTag::AInvoke)]).unwrap();

    let reply = futures::executor::block_on(agent.ainvoke(json!({"q": 1}))).unwrap();
    assert_eq!(reply, json!("mocked"));

    let ledger = session.close().unwrap();
    assert_eq!(ledger.records()[0].method, MethodTag::AInvoke);
    let reply = futures::executor::block_on(agent.ainvoke(json!({}))).unwrap();
    assert_eq!(reply, json!("original-async"));
}

/// Sessions run back to back on the same switchboard keep separate ledgers
#[test]
fn consecutive_sessions_have_independent_ledgers() {
    let switchboard = switchboard_with_original();
    for expected in 1..=3_usize {
        let session = InterceptionSession::open(&switchboard, vec![mocked(MethodTag::Invoke)]).unwrap();
        for _ in 0..expected {
            switchboard
                .dispatch(AGENT, MethodTag::Invoke, &CallArgs::single(json!(expected)))
                .unwrap();
        }
        let ledger = session.close().unwrap();
        assert_eq!(ledger.len(), expected);
        assert_eq!(ledger.records()[0].sequence, 0);
    }
}

/// Calls reaching the original binding are not recorded
#[tokio::test]
async fn original_calls_are_not_intercepted() {
    let switchboard = switchboard_with_original();
    let agent = RemoteAgent::new(&switchboard, AGENT);
    let session = InterceptionSession::open(&switchboard, vec![mocked(MethodTag::Invoke)]).unwrap();

    assert_eq!(agent.ainvoke(json!({})).await.unwrap(), json!("original-async"));
    assert_eq!(agent.invoke(json!({})).unwrap(), json!("mocked"));

    let ledger = session.close().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.records()[0].method, MethodTag::Invoke);
}

//! End-to-end node scenarios against the simulated stack, in virtual time.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use ttgo_lorawan_node::config::{
    NodeConfig, ENV_ACTIVATION, ENV_APP_EUI, ENV_APP_KEY, ENV_APP_SKEY, ENV_DEV_ADDR, ENV_DEV_EUI,
    ENV_NWK_SKEY, ENV_PERIOD_SECS,
};
use ttgo_lorawan_node::lorawan::{
    CounterPayload, JoinOutcome, SimulatedStack, StackCall, StopReason, TxOutcome, JOIN_BACKOFF,
    SETTLE_DELAY,
};
use ttgo_lorawan_node::{run_node_with, NodeOptions, TokioAlarm};

const PERIOD: Duration = Duration::from_secs(20);

fn config(vars: &[(&str, &str)]) -> NodeConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    NodeConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn abp() -> NodeConfig {
    config(&[
        (ENV_ACTIVATION, "abp"),
        (ENV_DEV_ADDR, "260B1234"),
        (ENV_APP_SKEY, "000102030405060708090A0B0C0D0E0F"),
        (ENV_NWK_SKEY, "F0E0D0C0B0A090807060504030201000"),
        (ENV_PERIOD_SECS, "20"),
    ])
}

fn otaa() -> NodeConfig {
    config(&[
        (ENV_ACTIVATION, "otaa"),
        (ENV_DEV_EUI, "70B3D57ED0012345"),
        (ENV_APP_EUI, "0000000000000001"),
        (ENV_APP_KEY, "2B7E151628AED2A6ABF7158809CF4F3C"),
        (ENV_PERIOD_SECS, "20"),
    ])
}

fn options(config: &NodeConfig, uplinks: u32) -> NodeOptions {
    let mut options = NodeOptions::for_config(config);
    options.scheduler = options.scheduler.with_max_uplinks(uplinks);
    options
}

fn offsets(times: &[Instant], start: Instant) -> Vec<Duration> {
    times.iter().map(|t| *t - start).collect()
}

#[tokio::test(start_paused = true)]
async fn abp_three_uplinks() {
    let stack = SimulatedStack::new();
    let log = stack.log();
    let config = abp();
    let options = options(&config, 3);
    let start = Instant::now();

    let handle = run_node_with(config, options, stack, TokioAlarm::new(), CounterPayload::default())
        .await
        .unwrap();
    let report = handle.join().await.unwrap();

    assert_eq!(report.reason, StopReason::UplinkLimit);
    assert_eq!(report.stats.alarms_armed, 3);
    assert_eq!(report.stats.sends(), 3);
    assert_eq!(log.join_count(), 1);

    let first = SETTLE_DELAY + PERIOD;
    assert_eq!(
        offsets(&log.send_times(), start),
        vec![first, first + PERIOD, first + PERIOD * 2]
    );

    let payloads: Vec<_> = log
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            StackCall::Send(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(
        payloads,
        vec![b"ping:1".to_vec(), b"ping:2".to_vec(), b"ping:3".to_vec()]
    );
}

#[tokio::test(start_paused = true)]
async fn otaa_join_fails_twice() {
    let stack =
        SimulatedStack::new().with_join_outcomes([JoinOutcome::Failed, JoinOutcome::Failed]);
    let log = stack.log();
    let config = otaa();
    let options = options(&config, 1);
    let start = Instant::now();

    let handle = run_node_with(config, options, stack, TokioAlarm::new(), CounterPayload::default())
        .await
        .unwrap();
    handle.join().await.unwrap();

    assert_eq!(
        offsets(&log.join_times(), start),
        vec![Duration::ZERO, JOIN_BACKOFF, JOIN_BACKOFF * 2]
    );
    assert_eq!(
        offsets(&log.send_times(), start),
        vec![JOIN_BACKOFF * 2 + SETTLE_DELAY + PERIOD]
    );
}

#[tokio::test(start_paused = true)]
async fn trigger_during_send_is_deferred() {
    let send = Duration::from_secs(5);
    let stack = SimulatedStack::new().with_send_latency(send);
    let log = stack.log();
    let config = abp();
    let options = options(&config, 3);
    let start = Instant::now();

    let handle = run_node_with(config, options, stack, TokioAlarm::new(), CounterPayload::default())
        .await
        .unwrap();
    let first = SETTLE_DELAY + PERIOD;

    // Two seconds into the first send
    tokio::time::sleep_until(start + first + Duration::from_secs(2)).await;
    assert!(handle.trigger());

    let report = handle.join().await.unwrap();
    assert_eq!(log.max_in_flight(), 1);
    // The trigger waits for a full period after the first send start; the
    // alarm armed after the first send never adds an uplink of its own.
    let second = first + PERIOD;
    assert_eq!(
        offsets(&log.send_times(), start),
        vec![first, second, second + send + PERIOD]
    );
    assert_eq!(report.stats.stale_ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_uplinks_keep_the_cadence() {
    let stack = SimulatedStack::new().with_send_outcomes([
        TxOutcome::Busy,
        TxOutcome::NotJoined,
        TxOutcome::Error,
    ]);
    let log = stack.log();
    let config = abp();
    let options = options(&config, 4);
    let start = Instant::now();

    let handle = run_node_with(config, options, stack, TokioAlarm::new(), CounterPayload::default())
        .await
        .unwrap();
    let report = handle.join().await.unwrap();

    let stats = report.stats;
    assert_eq!(
        (stats.tx_busy, stats.tx_not_joined, stats.tx_error, stats.tx_ok),
        (1, 1, 1, 1)
    );
    let first = SETTLE_DELAY + PERIOD;
    assert_eq!(
        offsets(&log.send_times(), start),
        vec![first, first + PERIOD, first + PERIOD * 2, first + PERIOD * 3]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_cycles_push_the_schedule_back() {
    let send = Duration::from_secs(3);
    let rx = Duration::from_secs(2);
    let stack = SimulatedStack::new()
        .with_send_latency(send)
        .with_completion_latency(rx);
    let log = stack.log();
    let config = abp();
    let options = options(&config, 3);
    let start = Instant::now();

    let handle = run_node_with(config, options, stack, TokioAlarm::new(), CounterPayload::default())
        .await
        .unwrap();
    handle.join().await.unwrap();

    let first = SETTLE_DELAY + PERIOD;
    let cycle = send + rx + PERIOD;
    assert_eq!(
        offsets(&log.send_times(), start),
        vec![first, first + cycle, first + cycle * 2]
    );
}

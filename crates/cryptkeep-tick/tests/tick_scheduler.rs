//! Integration tests for the fixed-period tick scheduler.
//!
//! Time is paused so `sleep_until` resolves as soon as the runtime is idle.

use std::time::Duration;

use cryptkeep_tick::{TickConfig, TickPolicy, TickScheduler};

// =========================================================================
// Helpers
// =========================================================================

fn every_50ms() -> TickConfig {
    TickConfig::every("test", Duration::from_millis(50)).with_jitter(Duration::ZERO)
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn test_every_uses_skip_policy_and_small_jitter() {
    let cfg = TickConfig::every("positions", Duration::from_millis(16));
    assert_eq!(cfg.policy, TickPolicy::Skip);
    assert_eq!(cfg.initial_jitter, Duration::from_millis(2));
    assert_eq!(cfg.label, "positions");
}

#[test]
fn test_new_clamps_zero_period() {
    let s = TickScheduler::new(TickConfig::every("zero", Duration::ZERO));
    assert_eq!(s.period(), TickConfig::MIN_PERIOD);
}

#[test]
fn test_new_scheduler_has_no_ticks() {
    let s = TickScheduler::new(every_50ms());
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.label(), "test");
    assert_eq!(s.metrics().total_ticks, 0);
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_after_one_period() {
    let start = tokio::time::Instant::now();
    let mut s = TickScheduler::new(every_50ms());

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.period, Duration::from_millis(50));
    assert!(!info.overrun);
    assert_eq!(start.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_increment_monotonically() {
    let mut s = TickScheduler::new(every_50ms());
    for expected in 1..=5 {
        assert_eq!(s.wait_for_tick().await.tick, expected);
    }
    assert_eq!(s.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_jitter_delays_first_tick_within_bound() {
    let start = tokio::time::Instant::now();
    let mut s = TickScheduler::new(
        TickConfig::every("jitter", Duration::from_millis(50)).with_jitter(Duration::from_millis(5)),
    );
    s.wait_for_tick().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed <= Duration::from_millis(55));
}

// =========================================================================
// Overrun policies
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_reports_skipped_ticks_after_stall() {
    let mut s = TickScheduler::new(every_50ms());
    s.wait_for_tick().await;

    // Stall for three periods before waiting again.
    tokio::time::advance(Duration::from_millis(200)).await;
    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 3);
    assert_eq!(s.metrics().total_overruns, 1);

    // Next tick is a full period after the late one.
    let before = tokio::time::Instant::now();
    s.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_drop_policy_keeps_cadence_after_stall() {
    let mut s = TickScheduler::new(every_50ms().with_policy(TickPolicy::Drop));
    s.wait_for_tick().await;

    tokio::time::advance(Duration::from_millis(120)).await;
    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 0);

    // Planned at 150ms; we are at 170ms, so it fires immediately.
    let before = tokio::time::Instant::now();
    s.wait_for_tick().await;
    assert_eq!(before.elapsed(), Duration::ZERO);
}

// =========================================================================
// Budget
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_tick_is_noop() {
    let mut s = TickScheduler::new(every_50ms());
    s.record_tick_end();
    assert_eq!(s.metrics().max_tick_time, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_tracks_body_time() {
    let mut s = TickScheduler::new(every_50ms());
    s.wait_for_tick().await;
    // The budget is measured on the wall clock, not tokio's paused clock.
    std::thread::sleep(Duration::from_micros(100));
    s.record_tick_end();

    let m = s.metrics();
    assert!(m.max_tick_time > Duration::ZERO);
    assert!(m.budget_utilization > 0.0);
    assert!(m.budget_utilization < 1.0);
}

// =========================================================================
// Usage pattern: loop until stopped
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_stops_on_signal() {
    let mut s = TickScheduler::new(every_50ms());
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(160)).await;
        tx.send(()).await.ok();
    });

    let mut fired = 0;
    loop {
        tokio::select! {
            Some(()) = rx.recv() => break,
            info = s.wait_for_tick() => {
                fired += 1;
                s.record_tick_end();
                assert_eq!(info.tick, fired);
            }
        }
    }
    assert_eq!(fired, 3);
}

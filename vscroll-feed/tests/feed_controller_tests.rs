//! Feed controller integration tests
//!
//! Drives FeedController directly with scripted probes and recording players.
//! Every test runs on a paused tokio clock, so tick timing is exact.
//!
//! Covers:
//! - Resume from the stored position after scrolling away and back
//! - Explicit replay resetting position tracking
//! - Probe results and player reports arriving after deactivation
//! - Position independence between feed items
//! - Completion/error notifications firing at most once per play-through

mod helpers;

use helpers::{harness, harness_with, settle, test_options, Call};
use vscroll_common::events::FeedEvent;
use vscroll_common::{PlaybackOffset, VideoId};
use vscroll_feed::error::ProbeError;
use vscroll_feed::playback::{Delivery, PlayState, SessionOptions};
use vscroll_feed::{Error, FeedOp, SessionState};

const PLAYING: SessionState = SessionState::Attached(PlayState::Playing);
const PAUSED: SessionState = SessionState::Attached(PlayState::Paused);

// ================================================================================================
// Basic lifecycle
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_first_activation_plays_from_start() {
    let mut h = harness(&["v1"]);

    assert!(h.controller.activate(0).unwrap());
    assert_eq!(h.controller.session_state(0), Some(SessionState::Probing));
    settle().await;
    assert_eq!(h.loader.request_count("v1"), 1);

    assert!(h.loader.resolve_ready("v1"));
    assert_eq!(h.pump().await, 1);

    assert_eq!(h.controller.session_state(0), Some(PLAYING));
    // No stored entry: no seek before play
    assert_eq!(h.players.latest("v1").calls(), vec![Call::Attach, Call::Play]);
    assert_eq!(h.stored("v1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_record_position_while_playing() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let player = h.players.latest("v1");

    player.set_position(1.0);
    h.advance_secs(1).await;
    assert_eq!(h.stored("v1"), Some(1.0));

    player.set_position(2.5);
    h.advance_secs(1).await;
    assert_eq!(h.stored("v1"), Some(2.5));
}

#[tokio::test(start_paused = true)]
async fn test_zero_tick_interval_still_records_position() {
    let options = SessionOptions {
        tick_interval: std::time::Duration::ZERO,
        ..test_options()
    };
    let mut h = harness_with(&["v1"], options);
    h.activate_ready(0, "v1").await;

    h.players.latest("v1").set_position(4.5);
    h.advance_secs(1).await;
    assert_eq!(h.stored("v1"), Some(4.5));
}

#[tokio::test(start_paused = true)]
async fn test_probe_failure_notifies_error_once_without_playing() {
    let mut h = harness(&["v1", "v2", "v3"]);

    h.controller.activate(2).unwrap();
    settle().await;
    assert!(h.loader.resolve_failed("v3", "image/jpeg"));
    h.pump().await;

    assert_eq!(h.controller.session_state(2), Some(SessionState::Failed));
    assert_eq!(h.notify.errors(2), 1);
    assert_eq!(h.notify.completed(2), 0);
    let calls = h.players.latest("v3").calls();
    assert!(!calls.contains(&Call::Play));
    assert!(!calls.contains(&Call::Attach));

    // Ticks never run for a failed session
    h.advance_secs(3).await;
    assert_eq!(h.stored("v3"), None);
    assert_eq!(h.notify.errors(2), 1);
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_fails_session() {
    let options = SessionOptions {
        probe_timeout: std::time::Duration::from_secs(2),
        ..test_options()
    };
    let mut h = harness_with(&["slow"], options);

    h.controller.activate(0).unwrap();
    h.advance_secs(3).await;

    assert_eq!(h.controller.session_state(0), Some(SessionState::Failed));
    assert_eq!(h.notify.errors(0), 1);
    let readiness = h.controller.session(0).unwrap().readiness().to_string();
    assert!(readiness.contains("timed out"), "got {}", readiness);
}

// ================================================================================================
// Resume
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_reactivation_seeks_to_last_tick_before_play() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let player = h.players.latest("v1");

    for offset in [10.0, 25.0, 42.0] {
        player.set_position(offset);
        h.advance_secs(1).await;
    }
    assert_eq!(h.stored("v1"), Some(42.0));

    assert!(h.controller.deactivate(0).unwrap());
    assert_eq!(h.controller.session_state(0), Some(SessionState::Idle));
    // Deactivate keeps the last recorded tick
    assert_eq!(h.stored("v1"), Some(42.0));

    h.activate_ready(0, "v1").await;
    assert_eq!(
        player.calls_since_attach(),
        vec![Call::Attach, Call::Seek(42.0), Call::Play]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resume_survives_view_teardown() {
    let mut h = harness(&["v1", "v2"]);
    h.controller.view_appeared(0).unwrap();
    h.activate_ready(0, "v1").await;
    h.players.latest("v1").set_position(17.0);
    h.advance_secs(1).await;

    h.controller.deactivate(0).unwrap();
    assert!(h.controller.view_disappeared(0).unwrap());
    assert_eq!(h.controller.session_count(), 0);

    // A fresh view gets a fresh player, positioned from the store
    assert!(h.controller.view_appeared(0).unwrap());
    h.activate_ready(0, "v1").await;
    assert_eq!(h.players.created_count(), 2);
    assert_eq!(
        h.players.latest("v1").calls(),
        vec![Call::Attach, Call::Seek(17.0), Call::Play]
    );
}

// ================================================================================================
// Replay
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_replay_while_playing_restarts_tracking_from_zero() {
    let mut h = harness(&["v1", "v2", "v3", "v4"]);
    h.activate_ready(3, "v4").await;
    let player = h.players.latest("v4");
    player.set_position(33.0);
    h.advance_secs(1).await;
    assert_eq!(h.stored("v4"), Some(33.0));
    player.clear();

    assert!(h.controller.replay(3).unwrap());
    assert_eq!(player.calls(), vec![Call::Seek(0.0), Call::Play]);
    assert_eq!(h.stored("v4"), Some(0.0));

    player.set_position(0.8);
    h.advance_secs(1).await;
    let stored = h.stored("v4").unwrap();
    assert!((0.0..33.0).contains(&stored), "stored {}", stored);

    // Scrolling away and back resumes from the post-replay offset
    h.controller.deactivate(3).unwrap();
    h.activate_ready(3, "v4").await;
    assert_eq!(
        player.calls_since_attach(),
        vec![Call::Attach, Call::Seek(0.8), Call::Play]
    );
}

#[tokio::test(start_paused = true)]
async fn test_replay_after_completion_allows_second_notification() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let player = h.players.latest("v1");

    player.sink().unwrap().completed();
    h.pump().await;
    assert_eq!(h.controller.session_state(0), Some(SessionState::Ended));
    assert_eq!(h.notify.completed(0), 1);

    assert!(h.controller.replay(0).unwrap());
    assert_eq!(h.controller.session_state(0), Some(PLAYING));

    player.sink().unwrap().completed();
    h.pump().await;
    assert_eq!(h.notify.completed(0), 2);
    assert_eq!(h.notify.errors(0), 0);
}

#[tokio::test(start_paused = true)]
async fn test_end_report_queued_before_replay_is_discarded() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let player = h.players.latest("v1");

    // Player reaches the end, but the report is still queued when the user replays
    player.sink().unwrap().completed();
    settle().await;
    assert!(h.controller.replay(0).unwrap());

    assert_eq!(h.pump().await, 0);
    assert_eq!(h.controller.session_state(0), Some(PLAYING));
    assert_eq!(h.notify.completed(0), 0);

    // Ticks still flow for the new play-through
    player.set_position(2.0);
    h.advance_secs(1).await;
    assert_eq!(h.stored("v1"), Some(2.0));
}

#[tokio::test(start_paused = true)]
async fn test_failure_report_from_before_replay_is_stale() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let old_sink = h.players.latest("v1").sink().unwrap();

    assert!(h.controller.replay(0).unwrap());
    old_sink.failed("decoder error");
    assert_eq!(h.controller.process_next().await, Some(Delivery::Stale));
    assert_eq!(h.controller.session_state(0), Some(PLAYING));
    assert_eq!(h.notify.errors(0), 0);

    // The rebound sink still reaches the session
    h.players.latest("v1").sink().unwrap().completed();
    h.pump().await;
    assert_eq!(h.controller.session_state(0), Some(SessionState::Ended));
    assert_eq!(h.notify.completed(0), 1);
}

#[tokio::test(start_paused = true)]
async fn test_replay_ignored_when_disabled() {
    let options = SessionOptions {
        tap_to_replay: false,
        ..test_options()
    };
    let mut h = harness_with(&["v1"], options);
    h.activate_ready(0, "v1").await;
    h.players.latest("v1").clear();

    assert!(!h.controller.replay(0).unwrap());
    assert!(h.players.latest("v1").calls().is_empty());
}

// ================================================================================================
// Late arrivals
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_probe_resolving_after_deactivate_never_attaches() {
    let mut h = harness(&["v1", "v2"]);
    h.controller.activate(1).unwrap();
    settle().await;
    h.controller.deactivate(1).unwrap();

    // Canceled probes drop their loader future; a late answer goes nowhere
    h.loader.resolve_ready("v2");
    h.pump().await;
    h.advance_secs(2).await;

    assert_eq!(h.controller.session_state(1), Some(SessionState::Idle));
    let calls = h.players.latest("v2").calls();
    assert!(!calls.contains(&Call::Attach));
    assert!(!calls.contains(&Call::Play));
    assert!(!calls.iter().any(|c| matches!(c, Call::Seek(_))));
}

#[tokio::test(start_paused = true)]
async fn test_resolution_queued_before_deactivate_is_discarded() {
    let mut h = harness(&["v2"]);
    h.controller.activate(0).unwrap();
    settle().await;
    h.loader.resolve_ready("v2");
    // Resolution reaches the signal queue but is not applied yet
    settle().await;

    h.controller.deactivate(0).unwrap();
    assert_eq!(h.controller.process_pending(), 0);

    assert_eq!(h.controller.session_state(0), Some(SessionState::Idle));
    assert!(!h.players.latest("v2").calls().contains(&Call::Play));
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_after_deactivate_does_not_notify() {
    let mut h = harness(&["v1"]);
    h.controller.activate(0).unwrap();
    settle().await;
    h.loader.resolve_failed("v1", "HTTP 404");
    settle().await;
    h.controller.deactivate(0).unwrap();
    h.pump().await;

    assert_eq!(h.notify.errors(0), 0);
}

#[tokio::test(start_paused = true)]
async fn test_player_report_from_previous_activation_is_stale() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let old_sink = h.players.latest("v1").sink().unwrap();

    h.controller.deactivate(0).unwrap();
    h.activate_ready(0, "v1").await;

    old_sink.completed();
    settle().await;
    assert_eq!(h.controller.process_pending(), 0);
    assert_eq!(h.controller.session_state(0), Some(PLAYING));
    assert_eq!(h.notify.completed(0), 0);
}

#[tokio::test(start_paused = true)]
async fn test_signals_for_disposed_session_are_stale() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let sink = h.players.latest("v1").sink().unwrap();
    h.controller.view_disappeared(0).unwrap();

    sink.failed("decoder error");
    assert_eq!(h.controller.process_next().await, Some(Delivery::Stale));
    assert_eq!(h.notify.errors(0), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_deactivate() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let player = h.players.latest("v1");
    player.set_position(5.0);
    h.advance_secs(1).await;

    h.controller.deactivate(0).unwrap();
    player.set_position(99.0);
    h.advance_secs(3).await;

    assert_eq!(h.stored("v1"), Some(5.0));
}

// ================================================================================================
// Key independence
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_positions_are_tracked_per_item() {
    let mut h = harness(&["a", "b"]);
    h.activate_ready(0, "a").await;
    h.players.latest("a").set_position(8.0);
    h.advance_secs(1).await;
    h.controller.deactivate(0).unwrap();

    h.activate_ready(1, "b").await;
    h.players.latest("b").set_position(3.0);
    h.advance_secs(2).await;
    h.controller.replay(1).unwrap();

    assert_eq!(h.stored("a"), Some(8.0));
    assert_eq!(h.stored("b"), Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_locators_share_position() {
    let mut h = harness(&["same", "other", "same"]);
    h.activate_ready(0, "same").await;
    h.players.latest("same").set_position(12.0);
    h.advance_secs(1).await;
    h.controller.deactivate(0).unwrap();

    h.activate_ready(2, "same").await;
    assert_eq!(
        h.players.latest("same").calls(),
        vec![Call::Attach, Call::Seek(12.0), Call::Play]
    );
}

// ================================================================================================
// Terminal notifications
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_completion_then_failure_notifies_once() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let sink = h.players.latest("v1").sink().unwrap();

    sink.completed();
    sink.completed();
    sink.failed("late error");
    h.pump().await;

    assert_eq!(h.controller.session_state(0), Some(SessionState::Ended));
    assert_eq!(h.notify.completed(0), 1);
    assert_eq!(h.notify.errors(0), 0);
}

#[tokio::test(start_paused = true)]
async fn test_player_failure_moves_to_failed() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;

    h.players.latest("v1").sink().unwrap().failed("decoder error");
    h.pump().await;

    assert_eq!(h.controller.session_state(0), Some(SessionState::Failed));
    assert_eq!(h.notify.errors(0), 1);
    assert!(!h.controller.session(0).unwrap().is_ticking());
}

#[tokio::test(start_paused = true)]
async fn test_failed_session_retries_after_scrolling_back() {
    let mut h = harness(&["v1"]);
    h.controller.activate(0).unwrap();
    settle().await;
    h.loader.resolve(
        "v1",
        Err(ProbeError::Network("connection reset".to_string())),
    );
    h.pump().await;
    assert_eq!(h.controller.session_state(0), Some(SessionState::Failed));

    h.controller.deactivate(0).unwrap();
    h.activate_ready(0, "v1").await;

    assert_eq!(h.loader.request_count("v1"), 2);
    assert_eq!(h.controller.session_state(0), Some(PLAYING));
}

// ================================================================================================
// Host operations
// ================================================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_stops_ticks_and_resume_restarts_them() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let player = h.players.latest("v1");
    player.set_position(4.0);
    h.advance_secs(1).await;

    assert!(h.controller.pause(0).unwrap());
    assert_eq!(h.controller.session_state(0), Some(PAUSED));
    player.set_position(50.0);
    h.advance_secs(2).await;
    assert_eq!(h.stored("v1"), Some(4.0));

    assert!(h.controller.resume(0).unwrap());
    h.advance_secs(1).await;
    assert_eq!(h.stored("v1"), Some(50.0));
    assert!(!h.controller.resume(0).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_off_attaches_and_seeks_but_waits() {
    let options = SessionOptions {
        autoplay_on_ready: false,
        ..test_options()
    };
    let mut h = harness_with(&["v1"], options);
    h.store
        .set(&VideoId::new("v1"), PlaybackOffset::from_secs(6.0));

    h.activate_ready(0, "v1").await;
    assert_eq!(h.controller.session_state(0), Some(PAUSED));
    assert_eq!(
        h.players.latest("v1").calls(),
        vec![Call::Attach, Call::Seek(6.0)]
    );

    assert!(h.controller.resume(0).unwrap());
    assert_eq!(h.controller.session_state(0), Some(PLAYING));
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_index_is_rejected() {
    let mut h = harness(&["v1"]);
    for op in [
        FeedOp::ViewAppeared,
        FeedOp::ViewDisappeared,
        FeedOp::Activate,
        FeedOp::Deactivate,
        FeedOp::Replay,
        FeedOp::Pause,
        FeedOp::Resume,
    ] {
        let err = h.controller.apply(op, 5).unwrap_err();
        assert!(matches!(err, Error::UnknownItem(5)), "{} gave {}", op, err);
    }
    assert_eq!(h.controller.session_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_operations_without_session_are_noops() {
    let mut h = harness(&["v1"]);
    assert!(!h.controller.deactivate(0).unwrap());
    assert!(!h.controller.replay(0).unwrap());
    assert!(!h.controller.pause(0).unwrap());
    assert!(!h.controller.view_disappeared(0).unwrap());

    assert!(h.controller.view_appeared(0).unwrap());
    assert!(!h.controller.view_appeared(0).unwrap());
    assert_eq!(h.controller.session_state(0), Some(SessionState::Idle));
}

#[tokio::test(start_paused = true)]
async fn test_view_disappeared_releases_player() {
    let mut h = harness(&["v1"]);
    h.activate_ready(0, "v1").await;
    let player = h.players.latest("v1");
    player.clear();

    assert!(h.controller.view_disappeared(0).unwrap());
    assert_eq!(
        player.calls(),
        vec![Call::Pause, Call::CancelLoading, Call::Detach]
    );
    assert_eq!(h.controller.session_state(0), None);
}

#[tokio::test(start_paused = true)]
async fn test_feed_events_follow_session_lifecycle() {
    let mut h = harness(&["v1"]);
    let mut events = h.controller.events().subscribe();

    h.activate_ready(0, "v1").await;
    h.players.latest("v1").set_position(2.0);
    h.advance_secs(1).await;
    h.controller.deactivate(0).unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
        if let FeedEvent::SessionDeactivated { last_position, .. } = event {
            assert_eq!(last_position.map(|p| p.as_secs()), Some(2.0));
        }
    }
    assert_eq!(
        kinds,
        vec![
            "session_activated",
            "probe_resolved",
            "playback_started",
            "position_recorded",
            "session_deactivated",
        ]
    );
}

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use data_runtime::ids::ArmorSlot;
use server_core::{InvalidateDecision, InvalidationScheduler, VisibilityStore};

const COOLDOWN: Duration = Duration::from_millis(150);

fn setup() -> (Arc<VisibilityStore>, InvalidationScheduler) {
    let store = Arc::new(VisibilityStore::new());
    let sched = InvalidationScheduler::new(Arc::clone(&store), COOLDOWN).unwrap();
    (store, sched)
}

#[test]
fn nothing_hidden_means_nothing_sent() {
    let (_store, sched) = setup();
    let (p, _rx) = common::player(1);
    let h = common::handle(&p);
    assert_eq!(sched.request(&h, true), InvalidateDecision::Ignored);
    assert_eq!(sched.request(&h, false), InvalidateDecision::Ignored);
    std::thread::sleep(Duration::from_millis(250));
    assert_eq!(p.invalidation_count(), 0);
    assert!(sched.last_executed(p.id).is_none());
}

#[test]
fn deferred_requests_inside_the_window_coalesce_into_one() {
    let (store, sched) = setup();
    let (p, _rx) = common::player(1);
    store.toggle_slot(p.id, ArmorSlot::Head);
    let h = common::handle(&p);

    assert_eq!(sched.request(&h, false), InvalidateDecision::Executed);
    assert_eq!(p.invalidation_count(), 1);

    let t0 = Instant::now();
    assert!(matches!(sched.request(&h, false), InvalidateDecision::Scheduled { delay } if delay <= COOLDOWN));
    let fire_at = sched.pending_fire_at(p.id).expect("armed");
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(sched.request(&h, false), InvalidateDecision::Coalesced);
    assert_eq!(sched.pending_fire_at(p.id), Some(fire_at));
    assert_eq!(p.invalidation_count(), 1);

    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(p.invalidation_count(), 2, "exactly one trailing execution");
    assert!(sched.pending_fire_at(p.id).is_none());
    let fired = p.invalidations.lock().unwrap()[1];
    let after = fired.duration_since(t0);
    assert!(after >= Duration::from_millis(100) && after < Duration::from_millis(400), "{after:?}");
    sched.shutdown();
}

#[test]
fn request_after_the_window_runs_right_away() {
    let (store, sched) = setup();
    let (p, _rx) = common::player(1);
    store.toggle_slot(p.id, ArmorSlot::Legs);
    let h = common::handle(&p);

    assert_eq!(sched.request(&h, false), InvalidateDecision::Executed);
    std::thread::sleep(COOLDOWN + Duration::from_millis(50));
    assert_eq!(sched.request(&h, false), InvalidateDecision::Executed);
    assert_eq!(p.invalidation_count(), 2);
    sched.shutdown();
}

#[test]
fn immediate_request_cancels_the_pending_one() {
    let (store, sched) = setup();
    let (p, _rx) = common::player(1);
    store.toggle_slot(p.id, ArmorSlot::Chest);
    let h = common::handle(&p);

    sched.request(&h, false);
    assert!(matches!(sched.request(&h, false), InvalidateDecision::Scheduled { .. }));
    assert_eq!(sched.request(&h, true), InvalidateDecision::Executed);
    assert_eq!(p.invalidation_count(), 2, "immediate runs synchronously on an inline world");
    assert!(sched.pending_fire_at(p.id).is_none());

    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(p.invalidation_count(), 2, "cancelled task must not fire");
    sched.shutdown();
}

#[test]
fn immediate_requests_ignore_the_cooldown() {
    let (store, sched) = setup();
    let (p, _rx) = common::player(1);
    store.toggle_slot(p.id, ArmorSlot::Hands);
    let h = common::handle(&p);
    for _ in 0..3 {
        assert_eq!(sched.request(&h, true), InvalidateDecision::Executed);
    }
    assert_eq!(p.invalidation_count(), 3);
    sched.shutdown();
}

#[test]
fn players_are_throttled_independently() {
    let (store, sched) = setup();
    let (a, _ra) = common::player(1);
    let (b, _rb) = common::player(2);
    store.toggle_slot(a.id, ArmorSlot::Head);
    store.toggle_slot(b.id, ArmorSlot::Head);
    let (ha, hb) = (common::handle(&a), common::handle(&b));

    assert_eq!(sched.request(&ha, false), InvalidateDecision::Executed);
    assert_eq!(sched.request(&hb, false), InvalidateDecision::Executed);
    assert!(matches!(sched.request(&ha, false), InvalidateDecision::Scheduled { .. }));
    assert!(sched.pending_fire_at(b.id).is_none());
    sched.shutdown();
}

#[test]
fn dispatch_failure_still_starts_the_cooldown() {
    let (store, sched) = setup();
    let p = common::worldless_player();
    store.toggle_slot(p.id, ArmorSlot::Head);
    let h = common::handle(&p);

    assert_eq!(sched.request(&h, false), InvalidateDecision::Executed);
    assert!(sched.last_executed(p.id).is_some());
    assert!(matches!(sched.request(&h, false), InvalidateDecision::Scheduled { .. }));
    assert_eq!(p.invalidation_count(), 0);
    sched.shutdown();
}

#[test]
fn host_error_during_invalidate_is_swallowed() {
    let (store, sched) = setup();
    let (p, _rx) = common::player(1);
    store.toggle_slot(p.id, ArmorSlot::Head);
    p.gone.store(true, std::sync::atomic::Ordering::SeqCst);
    let h = common::handle(&p);
    assert_eq!(sched.request(&h, true), InvalidateDecision::Executed);
    assert_eq!(p.invalidation_count(), 0);
    sched.shutdown();
}

#[test]
fn concurrent_standard_requests_arm_at_most_one_task() {
    let (store, sched) = setup();
    let sched = Arc::new(sched);
    let (p, _rx) = common::player(1);
    store.toggle_slot(p.id, ArmorSlot::Head);
    let h = common::handle(&p);
    sched.request(&h, false);

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let (sched, h) = (Arc::clone(&sched), Arc::clone(&h));
            std::thread::spawn(move || {
                (0..10)
                    .filter(|_| matches!(sched.request(&h, false), InvalidateDecision::Scheduled { .. }))
                    .count()
            })
        })
        .collect();
    let scheduled: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();
    assert_eq!(scheduled, 1);
    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(p.invalidation_count(), 2);
    sched.shutdown();
}

#[test]
fn forgetting_a_player_drops_state_and_cancels_the_pending_resync() {
    let (store, sched) = setup();
    let (p, _rx) = common::player(1);
    store.toggle_slot(p.id, ArmorSlot::Head);
    let h = common::handle(&p);

    sched.request(&h, false);
    assert!(matches!(sched.request(&h, false), InvalidateDecision::Scheduled { .. }));
    assert_eq!(sched.tracked(), 1);

    assert!(sched.forget(p.id));
    assert!(!sched.forget(p.id));
    assert_eq!(sched.tracked(), 0);
    assert!(sched.last_executed(p.id).is_none());

    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(p.invalidation_count(), 1, "armed resync was cancelled");
    // a returning player starts with a fresh window
    assert_eq!(sched.request(&h, false), InvalidateDecision::Executed);
    sched.shutdown();
}

//! Integration tests for the context hand-off between scheduler and agent loop
//!
//! Tests cover:
//! - Only contexts scheduled while the agent loop waits are delivered
//! - Delivery waits for the scheduled instant
//! - Blocking until a schedule or an interrupt
//! - Last-write-wins for pending contexts
//! - Interrupt is one-shot

use super::test_utils::{generate_context, sleep_ms, AsyncCall};
use nodeadmin::{Activity, ManagerError, NodeAgentContext, NodeAgentContextManager};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn create_manager() -> (Arc<NodeAgentContextManager>, Arc<NodeAgentContext>) {
    let initial = generate_context();
    let manager = Arc::new(NodeAgentContextManager::new(Arc::clone(&initial)));
    (manager, initial)
}

fn fetch_async(
    manager: &Arc<NodeAgentContextManager>,
) -> AsyncCall<Result<Arc<NodeAgentContext>, ManagerError>> {
    let manager = Arc::clone(manager);
    AsyncCall::spawn(move || manager.fetch_next_context())
}

#[test]
fn test_context_is_ignored_unless_scheduled_while_waiting() {
    let (manager, initial) = create_manager();

    let context1 = generate_context();
    manager.schedule(context1, Instant::now());
    assert!(NodeAgentContext::same(&initial, &manager.current_context()));

    let fetch = fetch_async(&manager);
    sleep_ms(20);
    assert!(!fetch.is_completed());

    let context2 = generate_context();
    manager.schedule(Arc::clone(&context2), Instant::now());

    let delivered = fetch.await_result().unwrap();
    assert!(NodeAgentContext::same(&context2, &delivered));
    assert!(NodeAgentContext::same(&context2, &manager.current_context()));
}

#[test]
fn test_returns_no_earlier_than_at_given_time() {
    let (manager, _) = create_manager();

    let fetch = fetch_async(&manager);
    sleep_ms(20);

    let context1 = generate_context();
    let return_at = Instant::now() + Duration::from_millis(500);
    manager.schedule(Arc::clone(&context1), return_at);

    let delivered = fetch.await_result().unwrap();
    assert!(NodeAgentContext::same(&context1, &delivered));
    assert!(NodeAgentContext::same(&context1, &manager.current_context()));
    // Accurate to a millisecond
    assert!(Instant::now() + Duration::from_millis(1) >= return_at);
}

#[test]
fn test_blocks_in_fetch_until_one_is_scheduled() {
    let (manager, _) = create_manager();

    let fetch = fetch_async(&manager);
    assert!(!fetch.is_completed());
    sleep_ms(10);
    assert!(!fetch.is_completed());

    let context1 = generate_context();
    manager.schedule(Arc::clone(&context1), Instant::now());

    let delivered = fetch.await_result().unwrap();
    assert!(NodeAgentContext::same(&context1, &delivered));
}

#[test]
fn test_blocks_in_fetch_until_interrupt() {
    let (manager, initial) = create_manager();

    let fetch = fetch_async(&manager);
    assert!(!fetch.is_completed());
    sleep_ms(10);
    assert!(!fetch.is_completed());

    manager.interrupt();

    assert_eq!(fetch.await_result().unwrap_err(), ManagerError::Interrupted);
    assert!(NodeAgentContext::same(&initial, &manager.current_context()));
}

#[test]
fn test_latest_schedule_wins_while_waiting_for_not_before() {
    let (manager, _) = create_manager();

    let fetch = fetch_async(&manager);
    sleep_ms(20);

    let delayed = generate_context();
    manager.schedule(delayed, Instant::now() + Duration::from_secs(30));
    sleep_ms(10);
    assert!(!fetch.is_completed());

    let immediate = generate_context();
    manager.schedule(Arc::clone(&immediate), Instant::now());

    let delivered = fetch.await_result().unwrap();
    assert!(NodeAgentContext::same(&immediate, &delivered));
    assert_eq!(manager.status().pending_in_ms, None);
}

#[test]
fn test_past_not_before_is_delivered_immediately() {
    let (manager, _) = create_manager();

    let fetch = fetch_async(&manager);
    sleep_ms(20);

    let context1 = generate_context();
    let scheduled_at = Instant::now();
    manager.schedule(Arc::clone(&context1), scheduled_at - Duration::from_millis(100));

    let delivered = fetch.await_result().unwrap();
    assert!(NodeAgentContext::same(&context1, &delivered));
    assert!(scheduled_at.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_manager_is_reusable_after_interrupt() {
    let (manager, _) = create_manager();

    let fetch = fetch_async(&manager);
    sleep_ms(10);
    manager.interrupt();
    assert_eq!(fetch.await_result().unwrap_err(), ManagerError::Interrupted);
    assert!(!manager.status().interrupt_pending);

    let fetch = fetch_async(&manager);
    sleep_ms(20);
    assert!(!fetch.is_completed(), "interrupt must only fail one wait");

    let context1 = generate_context();
    manager.schedule(Arc::clone(&context1), Instant::now());
    assert!(NodeAgentContext::same(&context1, &fetch.await_result().unwrap()));
}

#[test]
fn test_interrupt_without_waiter_fails_next_fetch() {
    let (manager, _) = create_manager();
    manager.interrupt();
    manager.schedule(generate_context(), Instant::now());

    assert_eq!(
        manager.fetch_next_context().unwrap_err(),
        ManagerError::Interrupted
    );
}

#[test]
fn test_each_fetch_needs_a_new_schedule() {
    let (manager, _) = create_manager();

    let fetch = fetch_async(&manager);
    sleep_ms(20);
    let context1 = generate_context();
    manager.schedule(Arc::clone(&context1), Instant::now());
    assert!(NodeAgentContext::same(&context1, &fetch.await_result().unwrap()));

    // The delivered entry was consumed; nothing is left for the next tick
    let fetch = fetch_async(&manager);
    sleep_ms(20);
    assert!(!fetch.is_completed());
    assert_eq!(manager.status().activity, Activity::Idle);

    manager.interrupt();
    assert!(fetch.await_result().is_err());
    assert!(NodeAgentContext::same(&context1, &manager.current_context()));
}

#[test]
fn test_convergence_generation_alternates_idle_and_active() {
    let (manager, _) = create_manager();

    for round in 1..=3u64 {
        let fetch = fetch_async(&manager);
        sleep_ms(10);
        let status = manager.status();
        assert_eq!(status.activity, Activity::Idle);
        assert_eq!(status.convergence_generation, 2 * round - 1);

        manager.schedule(generate_context(), Instant::now());
        fetch.await_result().unwrap();
        let status = manager.status();
        assert_eq!(status.activity, Activity::Active);
        assert_eq!(status.convergence_generation, 2 * round);
    }
}

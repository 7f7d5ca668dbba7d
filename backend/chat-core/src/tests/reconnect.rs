use crate::channel::reconnect::ReconnectState;
use crate::config::ReconnectPolicy;

use std::time::Duration;

/// **VALUE**: Verifies `nextDelay = base * 2^k` after k failures and the cap at 5.
///
/// **WHY THIS MATTERS**: The whole retry schedule is derived from this one function.
///
/// **BUG THIS CATCHES**: Would catch an advance that allows a sixth retry or doubles
/// from the wrong exponent.
#[test]
fn given_default_policy_when_advancing_repeatedly_then_doubles_until_cap() {
    // GIVEN: The default policy (1s base, 5 attempts)
    let policy = ReconnectPolicy::default();
    let mut state = ReconnectState::initial(&policy);
    assert_eq!(state.attempt, 0);
    assert_eq!(state.next_delay, Duration::from_secs(1));

    // WHEN: Advancing until it refuses
    let mut delays = Vec::new();
    while let Some(next) = state.advance(&policy) {
        assert!(next.attempt <= 5);
        delays.push(next.next_delay.as_secs());
        state = next;
    }

    // THEN: Five retries with doubling delays
    assert_eq!(delays, vec![2, 4, 8, 16, 32]);
    assert_eq!(state.attempt, 5);
    assert!(state.advance(&policy).is_none());
}

/// **VALUE**: Verifies that a zero-attempt policy gives up on the first failure.
#[test]
fn given_zero_attempts_when_advancing_then_gives_up_immediately() {
    let policy = ReconnectPolicy::new(Duration::from_millis(500), 0);
    assert!(ReconnectState::initial(&policy).advance(&policy).is_none());
}

/// **VALUE**: Verifies that huge exponents saturate instead of overflowing.
///
/// **BUG THIS CATCHES**: Would catch a shift overflow panic with a large configured cap.
#[test]
fn given_large_attempt_count_when_advancing_then_delay_saturates() {
    // GIVEN: A state far along the schedule
    let policy = ReconnectPolicy::new(Duration::from_secs(1), 100);
    let state = ReconnectState {
        attempt: 40,
        next_delay: Duration::from_secs(1),
    };

    // WHEN: Advancing
    let next = state.advance(&policy).expect("cap not reached");

    // THEN: No panic, delay is enormous but finite
    assert_eq!(next.attempt, 41);
    assert!(next.next_delay >= Duration::from_secs(u64::from(u32::MAX)));
}

use crate::ipc::connection_state::ConnectionState;

/// **VALUE**: Verifies that only `Connected` counts as connected.
///
/// **WHY THIS MATTERS**: Sessions and the serve loop stop as soon as the channel
/// is not connected. A half-open `Connecting` state must not look usable.
#[test]
fn given_each_state_when_checking_is_connected_then_only_connected_is_true() {
    assert!(!ConnectionState::Disconnected.is_connected());
    assert!(!ConnectionState::Connecting.is_connected());
    assert!(ConnectionState::Connected.is_connected());
}

#[test]
fn given_default_when_created_then_disconnected() {
    assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    assert_eq!(ConnectionState::default().to_string(), "disconnected");
}

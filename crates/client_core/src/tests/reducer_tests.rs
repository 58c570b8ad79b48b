use super::*;
use shared::domain::ToolId;

fn record(id: &str, status: ToolStatus) -> ToolRecord {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": "Drill",
        "status": status,
    }))
    .expect("record")
}

fn loaded(id: &str, status: ToolStatus) -> SessionState {
    let mut state = SessionState::default();
    state.reduce(SessionAction::IdentifierEdited(id.to_string()));
    state.reduce(SessionAction::LookupStarted {
        identifier: id.to_string(),
    });
    state.reduce(SessionAction::LookupResolved {
        identifier: id.to_string(),
        record: record(id, status),
    });
    state
}

#[test]
fn editing_to_empty_clears_record_and_feedback() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    assert!(state.last_message.is_some());

    assert_eq!(
        state.reduce(SessionAction::IdentifierEdited("   ".to_string())),
        Reduction::Applied
    );
    assert_eq!(state.identifier, "");
    assert!(state.record.is_none());
    assert!(state.last_message.is_none());
    assert!(state.last_error.is_none());
}

#[test]
fn unchanged_identifier_is_ignored() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    assert_eq!(
        state.reduce(SessionAction::IdentifierEdited(" T-0042 ".to_string())),
        Reduction::Ignored
    );
    assert!(state.record.is_some());
}

#[test]
fn editing_identifier_drops_record_of_previous_tool() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    state.reduce(SessionAction::IdentifierEdited("T-0043".to_string()));
    assert!(state.record.is_none());
    assert!(state.wants_retry());
}

#[test]
fn stale_lookup_results_are_discarded() {
    let mut state = SessionState::default();
    state.reduce(SessionAction::IdentifierEdited("T-1".to_string()));
    state.reduce(SessionAction::LookupStarted {
        identifier: "T-1".to_string(),
    });
    state.reduce(SessionAction::IdentifierEdited("T-2".to_string()));
    state.reduce(SessionAction::LookupStarted {
        identifier: "T-2".to_string(),
    });

    assert_eq!(
        state.reduce(SessionAction::LookupResolved {
            identifier: "T-2".to_string(),
            record: record("T-2", ToolStatus::Lent),
        }),
        Reduction::Applied
    );
    assert_eq!(
        state.reduce(SessionAction::LookupResolved {
            identifier: "T-1".to_string(),
            record: record("T-1", ToolStatus::Available),
        }),
        Reduction::Stale
    );
    assert_eq!(
        state.reduce(SessionAction::LookupFailed {
            identifier: "T-1".to_string(),
            error: SessionError::LookupNetwork("timeout".to_string()),
        }),
        Reduction::Stale
    );

    let current = state.record.as_ref().expect("record");
    assert_eq!(current.id, ToolId::from("T-2"));
    assert!(state.pending.is_idle());
    assert!(state.last_error.is_none());
}

#[test]
fn lookup_failure_clears_record_but_keeps_identifier() {
    let mut state = SessionState::default();
    state.reduce(SessionAction::IdentifierEdited("T-404".to_string()));
    state.reduce(SessionAction::LookupStarted {
        identifier: "T-404".to_string(),
    });
    state.reduce(SessionAction::LookupFailed {
        identifier: "T-404".to_string(),
        error: SessionError::LookupNotFound(ToolId::from("T-404")),
    });

    assert_eq!(state.identifier, "T-404");
    assert!(state.record.is_none());
    assert!(state
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("T-404")));
    assert!(state.wants_retry());
}

#[test]
fn lookup_due_during_transition_is_deferred() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    state.reduce(SessionAction::TransitionStarted {
        target: ToolStatus::Lent,
    });

    assert_eq!(
        state.reduce(SessionAction::LookupStarted {
            identifier: "T-0042".to_string(),
        }),
        Reduction::Deferred
    );
    assert_eq!(
        state.pending,
        PendingOperation::Transition {
            target: ToolStatus::Lent
        }
    );

    state.reduce(SessionAction::TransitionSucceeded {
        record: record("T-0042", ToolStatus::Lent),
    });
    assert_eq!(state.take_deferred_lookup(), Some("T-0042".to_string()));
    assert_eq!(state.take_deferred_lookup(), None);
}

#[test]
fn transition_success_replaces_record_and_names_tool() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    state.reduce(SessionAction::TransitionStarted {
        target: ToolStatus::Lent,
    });
    assert_eq!(
        state.reduce(SessionAction::TransitionSucceeded {
            record: record("T-0042", ToolStatus::Lent),
        }),
        Reduction::Applied
    );

    assert_eq!(
        state.record.as_ref().map(|r| r.status),
        Some(ToolStatus::Lent)
    );
    assert!(state.pending.is_idle());
    assert!(state
        .last_message
        .as_deref()
        .is_some_and(|m| m.contains("Drill")));
}

#[test]
fn transition_result_for_a_replaced_identifier_is_stale() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    state.reduce(SessionAction::TransitionStarted {
        target: ToolStatus::Lent,
    });
    state.reduce(SessionAction::IdentifierEdited("T-0050".to_string()));

    assert_eq!(
        state.reduce(SessionAction::TransitionSucceeded {
            record: record("T-0042", ToolStatus::Lent),
        }),
        Reduction::Stale
    );
    assert!(state.record.is_none());
    assert!(state.pending.is_idle());
}

#[test]
fn transition_failure_keeps_record() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    state.reduce(SessionAction::TransitionStarted {
        target: ToolStatus::Lent,
    });
    state.reduce(SessionAction::TransitionFailed {
        error: SessionError::TransitionRejected("tool is reserved".to_string()),
    });

    assert_eq!(
        state.record.as_ref().map(|r| r.status),
        Some(ToolStatus::Available)
    );
    assert_eq!(state.last_error.as_deref(), Some("tool is reserved"));
}

#[test]
fn decoded_code_sets_identifier_and_ends_scan() {
    let mut state = SessionState::default();
    state.reduce(SessionAction::ScanActivated);
    assert!(state.scanning_active);

    state.reduce(SessionAction::CodeDecoded("T-0042\n".to_string()));
    assert!(!state.scanning_active);
    assert_eq!(state.identifier, "T-0042");
}

#[test]
fn closed_session_ignores_everything() {
    let mut state = loaded("T-0042", ToolStatus::Available);
    state.reduce(SessionAction::Closed);
    assert!(state.is_closed());

    assert_eq!(
        state.reduce(SessionAction::IdentifierEdited(String::new())),
        Reduction::Ignored
    );
    assert_eq!(state.identifier, "T-0042");
}

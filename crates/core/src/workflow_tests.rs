use super::*;

#[test]
fn path_key_joins_with_dots() {
    assert_eq!(WorkflowState::path_key(&[1, 0]), "1.0");
    assert_eq!(WorkflowState::path_key(&[]), "");
}

#[test]
fn terminal_statuses() {
    assert!(WorkflowStatus::Completed.is_terminal());
    assert!(WorkflowStatus::Failed.is_terminal());
    assert!(WorkflowStatus::Cancelled.is_terminal());
    assert!(!WorkflowStatus::Running.is_terminal());
    assert!(!WorkflowStatus::PendingMerge.is_terminal());
}

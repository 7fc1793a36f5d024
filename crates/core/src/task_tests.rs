use super::*;

#[test]
fn glob_match_supports_leading_and_trailing_wildcard() {
    assert!(glob_match("grimoire:*", "grimoire:implement"));
    assert!(glob_match("*-fix", "hotfix-fix"));
    assert!(!glob_match("grimoire:*", "other:implement"));
    assert!(glob_match("exact", "exact"));
    assert!(!glob_match("exact", "exact2"));
}

#[test]
fn tag_filter_any_all_not() {
    let tags: BTreeSet<String> = ["a", "b", "grimoire:x"].iter().map(|s| s.to_string()).collect();
    let filter = TagFilter {
        any: vec!["a".into()],
        all: vec!["a".into(), "b".into()],
        not: vec!["c".into()],
    };
    assert!(filter.matches(&tags));

    let veto = TagFilter {
        not: vec!["b".into()],
        ..Default::default()
    };
    assert!(!veto.matches(&tags));
}

#[test]
fn status_transitions_follow_scheduler_diagram() {
    assert!(TaskStatus::Open.can_transition_to(TaskStatus::InProgress));
    assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::PendingMerge));
    assert!(TaskStatus::PendingMerge.can_transition_to(TaskStatus::Blocked));
    assert!(!TaskStatus::Closed.can_transition_to(TaskStatus::InProgress));
    assert!(TaskStatus::Blocked.can_transition_to(TaskStatus::SoftDeleted));
}

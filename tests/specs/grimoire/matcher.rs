//! Grimoire matcher resolution: direct-tag shortcut, rule pipeline, parent
//! inheritance, and default fallback (spec.md §4.2, `/tasks/{id}/grimoire-match`).

use crate::prelude::*;

#[test]
fn default_fallback_is_quick_fix_with_no_matcher_config() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task("untagged", &[]);

    let matched = ws
        .coven()
        .args(&["task", "grimoire-match", &id])
        .passes()
        .json();
    assert_eq!(matched["grimoire"], "quick-fix");
    assert_eq!(matched["source"], "default");
}

#[test]
fn direct_tag_shortcut_overrides_the_default() {
    let ws = Workspace::new();
    ws.daemon_start_paused();
    let id = ws.create_task(
        "explicit grimoire",
        &["--tag", "grimoire:implement-with-tests"],
    );

    let matched = ws
        .coven()
        .args(&["task", "grimoire-match", &id])
        .passes()
        .json();
    assert_eq!(matched["grimoire"], "implement-with-tests");
    assert_eq!(matched["source"], "direct-tag");
}

#[test]
fn rule_pipeline_matches_in_order() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoire-matchers.yaml",
        r#"
rules:
  - any_tags: ["bug"]
    grimoire: quick-fix
  - any_tags: ["feature"]
    grimoire: implement-with-tests
default_grimoire: quick-fix
"#,
    );
    ws.daemon_start_paused();

    let bug_task = ws.create_task("squash it", &["--tag", "bug"]);
    let feature_task = ws.create_task("ship it", &["--tag", "feature"]);

    let bug_match = ws
        .coven()
        .args(&["task", "grimoire-match", &bug_task])
        .passes()
        .json();
    assert_eq!(bug_match["grimoire"], "quick-fix");
    assert_eq!(bug_match["source"], "rule");
    assert_eq!(bug_match["rule_index"], 0);

    let feature_match = ws
        .coven()
        .args(&["task", "grimoire-match", &feature_task])
        .passes()
        .json();
    assert_eq!(feature_match["grimoire"], "implement-with-tests");
    assert_eq!(feature_match["rule_index"], 1);
}

#[test]
fn child_inherits_parent_resolution_when_no_rule_or_tag_matches() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoire-matchers.yaml",
        r#"
rules:
  - any_tags: ["feature"]
    grimoire: implement-with-tests
default_grimoire: quick-fix
"#,
    );
    let agent = ws.fake_agent("fake-agent.sh", "echo '{\"done\": true}'");
    ws.configure_agent(&agent);
    // Inheritance (spec.md §4.2) is resolved from the parent's *actual*
    // launched workflow, not by re-resolving the parent's own match, so the
    // scheduler must be left running long enough to claim and launch one.
    ws.daemon_start();

    let parent = ws.create_task("epic", &["--tag", "feature"]);
    assert!(
        wait_for(|| ws.workflow_for_task(&parent).is_some()),
        "scheduler should launch a workflow for the ready parent task"
    );

    let child = ws.create_task("subtask", &["--parent", &parent]);

    let child_match = ws
        .coven()
        .args(&["task", "grimoire-match", &child])
        .passes()
        .json();
    assert_eq!(child_match["grimoire"], "implement-with-tests");
    assert_eq!(child_match["source"], "inherited");
}

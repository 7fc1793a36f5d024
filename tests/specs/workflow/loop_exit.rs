//! Loop steps: `on_success: exit_loop` breaks out early, and exhausting
//! `max_iterations` applies `on_max_iterations` instead (spec.md §8
//! scenario 3, `WorkflowRunner::run_loop`).

use crate::prelude::*;

#[test]
fn successful_iteration_exits_the_loop_and_reaches_merge() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoires/loop-exit.yaml",
        r#"
name: loop-exit
steps:
  - name: attempt
    type: loop
    max_iterations: 3
    on_max_iterations: block
    steps:
      - name: run-tests
        type: script
        command: "exit 0"
        on_success: exit_loop
  - name: merge
    type: merge
    require_review: false
"#,
    );
    ws.daemon_start();

    let task = ws.create_task("tests pass first try", &["--tag", "grimoire:loop-exit"]);

    assert!(
        wait_for(|| ws.workflow_status_for_task(&task) == "completed"),
        "a loop iteration reporting exit_loop should short-circuit to the merge step"
    );
    assert_eq!(ws.task_status(&task), "closed");

    let workflow = ws.workflow_for_task(&task).unwrap();
    assert_eq!(workflow["loop_iterations"]["0"], 1);
}

#[test]
fn exhausting_max_iterations_applies_on_max_iterations() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoires/loop-exhaust.yaml",
        r#"
name: loop-exhaust
steps:
  - name: attempt
    type: loop
    max_iterations: 2
    on_max_iterations: block
    steps:
      - name: run-tests
        type: script
        command: "exit 1"
        on_fail: continue
  - name: merge
    type: merge
    require_review: false
"#,
    );
    ws.daemon_start();

    let task = ws.create_task("tests never pass", &["--tag", "grimoire:loop-exhaust"]);

    assert!(
        wait_for(|| ws.workflow_status_for_task(&task) == "blocked"),
        "exhausting max_iterations without exit_loop should block per on_max_iterations"
    );
    assert_eq!(ws.task_status(&task), "blocked");

    let workflow = ws.workflow_for_task(&task).unwrap();
    assert_eq!(workflow["loop_iterations"]["0"], 2);
}

//! A failing script step's `on_fail` policy decides whether the workflow
//! (and its task) blocks for human attention or the run presses on
//! (spec.md §8 scenario 2, `ScriptStep::on_fail` / `execute_script_step`).

use crate::prelude::*;

#[test]
fn on_fail_block_stops_the_workflow_and_blocks_the_task() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoires/script-block.yaml",
        r#"
name: script-block
steps:
  - name: run-check
    type: script
    command: "exit 1"
    on_fail: block
"#,
    );
    ws.daemon_start();

    let task = ws.create_task("doomed check", &["--tag", "grimoire:script-block"]);

    assert!(
        wait_for(|| ws.workflow_status_for_task(&task) == "blocked"),
        "a script step with on_fail: block should leave the workflow blocked"
    );
    assert_eq!(ws.task_status(&task), "blocked");

    let workflow = ws.workflow_for_task(&task).unwrap();
    let results = &workflow["step_results"]["run-check"];
    assert_eq!(results["success"], false);
    assert_eq!(results["exit_code"], 1);
}

#[test]
fn on_fail_continue_lets_a_failing_script_fall_through_to_merge() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoires/script-continue.yaml",
        r#"
name: script-continue
steps:
  - name: run-check
    type: script
    command: "exit 1"
    on_fail: continue
  - name: merge
    type: merge
    require_review: false
"#,
    );
    ws.daemon_start();

    let task = ws.create_task("tolerant check", &["--tag", "grimoire:script-continue"]);

    assert!(
        wait_for(|| ws.workflow_status_for_task(&task) == "completed"),
        "on_fail: continue should let the run reach the unreviewed merge and finish"
    );
    assert_eq!(ws.task_status(&task), "closed");
}

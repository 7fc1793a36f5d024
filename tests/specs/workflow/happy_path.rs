//! The straight-line grimoire: one agent step, then a merge step that
//! requires human review before the task closes (spec.md §8 scenario 1,
//! `WorkflowRunner::run_merge_step`'s `require_review: true` branch).

use crate::prelude::*;

#[test]
fn agent_step_then_reviewed_merge_closes_the_task() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoires/happy-path.yaml",
        r#"
name: happy-path
steps:
  - name: implement
    type: agent
    spell: |
      Implement the task and report back.
  - name: merge
    type: merge
"#,
    );
    let agent = ws.raw_agent_script(
        "fake-agent.sh",
        "#!/bin/sh\necho '{\"summary\": \"implemented\"}'\n",
    );
    ws.configure_agent(&agent);
    ws.daemon_start();

    let task = ws.create_task("ship it", &["--tag", "grimoire:happy-path"]);

    assert!(
        wait_for(|| ws.workflow_status_for_task(&task) == "pending_merge"),
        "workflow should suspend for merge review after the agent step completes"
    );
    assert_eq!(ws.task_status(&task), "pending-merge");

    let workflow = ws.workflow_for_task(&task).expect("workflow should exist");
    let workflow_id = workflow["id"].as_str().unwrap().to_string();
    assert_eq!(workflow["grimoire_name"], "happy-path");

    ws.coven()
        .args(&["workflow", "approve-merge", &workflow_id])
        .passes()
        .stdout_has("approved merge");

    assert!(
        wait_for(|| ws.workflow_status_for_task(&task) == "completed"),
        "workflow should complete once the approved merge step re-runs"
    );
    assert_eq!(ws.task_status(&task), "closed");
}

#[test]
fn rejected_merge_blocks_the_task() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoires/happy-path.yaml",
        r#"
name: happy-path
steps:
  - name: implement
    type: agent
    spell: |
      Implement the task and report back.
  - name: merge
    type: merge
"#,
    );
    let agent = ws.raw_agent_script(
        "fake-agent.sh",
        "#!/bin/sh\necho '{\"summary\": \"implemented\"}'\n",
    );
    ws.configure_agent(&agent);
    ws.daemon_start();

    let task = ws.create_task("ship it", &["--tag", "grimoire:happy-path"]);
    assert!(wait_for(|| ws.workflow_status_for_task(&task) == "pending_merge"));

    let workflow_id = ws
        .workflow_for_task(&task)
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    ws.coven()
        .args(&["workflow", "reject-merge", &workflow_id, "--reason", "needs more work"])
        .passes();

    assert!(wait_for(|| ws.workflow_status_for_task(&task) == "blocked"));
    assert_eq!(ws.task_status(&task), "blocked");
}

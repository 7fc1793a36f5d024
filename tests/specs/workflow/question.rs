//! An agent step whose output is classified as an interactive question
//! suspends for a human answer, which is delivered back to the still-running
//! process's stdin (spec.md §8 scenario 4, §4.10 question router).

use crate::prelude::*;

#[test]
fn detected_question_is_answered_and_the_agent_finishes() {
    let ws = Workspace::new();
    ws.file(
        ".coven/grimoires/question-flow.yaml",
        r#"
name: question-flow
steps:
  - name: implement
    type: agent
    spell: |
      Implement the task, asking first if unsure.
"#,
    );
    // Asks a yes/no question, then blocks on a line read until `send_answer`
    // writes the reply into this same process's still-open stdin
    // (`ProcessAgentAdapter` never closes it; the prompt itself arrived as
    // argv, not over stdin).
    let agent = ws.raw_agent_script(
        "fake-agent.sh",
        r#"#!/bin/sh
echo "Proceed with migration? (y/n)"
read -r answer
echo '{"summary": "answered '"$answer"'"}'
"#,
    );
    ws.configure_agent(&agent);
    ws.daemon_start();

    let task = ws.create_task("risky migration", &["--tag", "grimoire:question-flow"]);

    assert!(
        wait_for(|| {
            let pending = ws
                .coven()
                .args(&["question", "list", "--pending"])
                .passes()
                .json();
            !pending.as_array().unwrap().is_empty()
        }),
        "the agent's yes/no prompt should be detected as a pending question"
    );

    let pending = ws
        .coven()
        .args(&["question", "list", "--pending", "--task-id", &task])
        .passes()
        .json();
    let questions = pending.as_array().unwrap();
    assert_eq!(questions.len(), 1);
    let question = &questions[0];
    assert_eq!(question["kind"], "confirmation");
    assert!(question["text"].as_str().unwrap().contains("Proceed with migration"));
    let options: Vec<&str> = question["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_str().unwrap())
        .collect();
    assert_eq!(options, vec!["yes", "no"]);
    let question_id = question["id"].as_str().unwrap().to_string();

    ws.coven()
        .args(&["question", "answer", &question_id, "yes"])
        .passes()
        .stdout_has("answered");

    assert!(
        wait_for(|| ws.workflow_status_for_task(&task) == "completed"),
        "delivering the answer should let the agent process exit and the step complete"
    );
    assert_eq!(ws.task_status(&task), "closed");

    let answered = ws
        .coven()
        .args(&["question", "get", &question_id])
        .passes()
        .json();
    assert_eq!(answered["answer"], "yes");
    assert!(!answered["answered_at"].is_null());
}

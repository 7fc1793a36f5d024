// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the render [`Value`] context a spell, script command, or `when`
//! guard sees: the task, every completed step's result (addressable by step
//! name, and by its custom `output:` name when a step renames it), `previous`,
//! and `loop_entry`.

use coven_core::{Grimoire, Step, StepKind, StepResult, Task, Value, WorkflowState};
use indexmap::IndexMap;

/// Converts a finished step's result into the value templates address as
/// `.<step-name>` / `.previous`: the fixed fields plus the agent's own
/// `outputs` map flattened alongside them.
pub fn step_result_to_value(result: &StepResult) -> Value {
    let mut m = IndexMap::new();
    m.insert("success".to_string(), Value::Bool(result.success));
    m.insert("failed".to_string(), Value::Bool(!result.success));
    m.insert(
        "exit_code".to_string(),
        result
            .exit_code
            .map(|c| Value::Number(c as f64))
            .unwrap_or(Value::Null),
    );
    m.insert("summary".to_string(), Value::String(result.summary.clone()));
    m.insert(
        "raw_output".to_string(),
        Value::String(result.raw_output.clone()),
    );
    m.insert(
        "error".to_string(),
        result
            .error
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    m.insert("skipped".to_string(), Value::Bool(result.skipped));
    for (k, v) in &result.outputs {
        m.insert(k.clone(), v.clone());
    }
    Value::Map(m)
}

fn task_to_value(task: &Task) -> Value {
    let mut m = IndexMap::new();
    m.insert("id".to_string(), Value::String(task.id.to_string()));
    m.insert("title".to_string(), Value::String(task.title.clone()));
    m.insert("body".to_string(), Value::String(task.body.clone()));
    m.insert(
        "status".to_string(),
        Value::String(task.status.to_string()),
    );
    m.insert(
        "priority".to_string(),
        Value::Number(task.priority as f64),
    );
    m.insert(
        "tags".to_string(),
        Value::List(task.tags.iter().map(|t| Value::String(t.clone())).collect()),
    );
    m.insert(
        "parent".to_string(),
        task.parent
            .as_ref()
            .map(|p| Value::String(p.to_string()))
            .unwrap_or(Value::Null),
    );
    m.insert("depth".to_string(), Value::Number(task.depth as f64));
    Value::Map(m)
}

/// Finds a step's resolved output variable name (`output:` field for agent
/// steps, step name otherwise), walking nested loop steps too.
fn collect_output_aliases(steps: &[Step], out: &mut Vec<(String, String)>) {
    for step in steps {
        if let StepKind::Agent(agent) = &step.kind {
            if let Some(output) = &agent.output {
                if output != &step.name {
                    out.push((output.clone(), step.name.clone()));
                }
            }
        }
        if let StepKind::Loop(body) = &step.kind {
            collect_output_aliases(&body.steps, out);
        }
    }
}

/// Builds the full render context for one step: `task`, every completed
/// step's result keyed by name (and aliased under any custom `output:`
/// name), the workflow's flattened custom `outputs`, plus `previous` and
/// `loop_entry` when present.
pub fn build_context(
    task: &Task,
    wf: &WorkflowState,
    grimoire: &Grimoire,
    previous: Option<&Value>,
    loop_entry: Option<&Value>,
) -> Value {
    let mut m = IndexMap::new();
    m.insert("task".to_string(), task_to_value(task));

    for (name, result) in &wf.step_results {
        m.insert(name.clone(), step_result_to_value(result));
    }
    let mut aliases = Vec::new();
    collect_output_aliases(&grimoire.steps, &mut aliases);
    for (alias, step_name) in aliases {
        if let Some(v) = m.get(&step_name).cloned() {
            m.insert(alias, v);
        }
    }
    for (name, value) in &wf.step_outputs {
        m.entry(name.clone()).or_insert_with(|| value.clone());
    }
    if let Some(previous) = previous {
        m.insert("previous".to_string(), previous.clone());
    }
    if let Some(loop_entry) = loop_entry {
        m.insert("loop_entry".to_string(), loop_entry.clone());
    }
    Value::Map(m)
}

use super::*;

#[test]
fn parses_short_durations() {
    assert_eq!(parse_short_duration("15m"), Some(Duration::from_secs(900)));
    assert_eq!(parse_short_duration("5m"), Some(Duration::from_secs(300)));
    assert_eq!(parse_short_duration("2h"), Some(Duration::from_secs(7200)));
    assert_eq!(parse_short_duration("90s"), Some(Duration::from_secs(90)));
    assert_eq!(parse_short_duration("bogus"), None);
}

#[test]
fn deserializes_grimoire_yaml_schema() {
    let yaml = r#"
name: implement-with-tests
steps:
  - name: implement
    type: agent
    spell: implement
    timeout: 15m
  - name: test-loop
    type: loop
    max_iterations: 3
    on_max_iterations: block
    steps:
      - name: run-tests
        type: script
        command: "npm test"
        on_fail: continue
        on_success: exit_loop
      - name: fix-tests
        type: agent
        spell: fix-tests
        when: "{{.previous.failed}}"
        input:
          test_output: "{{.run-tests.output}}"
  - name: merge
    type: merge
    require_review: true
"#;
    let grimoire: Grimoire = serde_yaml::from_str(yaml).expect("parses");
    assert_eq!(grimoire.name, "implement-with-tests");
    assert_eq!(grimoire.steps.len(), 3);
    match &grimoire.steps[0].kind {
        StepKind::Agent(a) => assert_eq!(a.timeout, Some(Duration::from_secs(900))),
        _ => panic!("expected agent step"),
    }
    match &grimoire.steps[1].kind {
        StepKind::Loop(l) => assert_eq!(l.steps.len(), 2),
        _ => panic!("expected loop step"),
    }
}

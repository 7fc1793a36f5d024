// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spell template rendering: variable substitution, strict-boolean conditionals,
//! iteration, a small helper surface, and cycle/depth-guarded partial inclusion.
//!
//! Grounded on `oj-runbook::template`'s `${var}` interpolation module, generalized
//! from a flat regex substitution into a small recursive-descent parser over
//! `{{ ... }}` tokens — the richer surface (`if`/`range`/`include`) spec.md §4.3
//! calls for doesn't fit a single regex pass the way `oj`'s `${var}` substitution
//! does.

use coven_core::{CovenError, Result, Value};
use tracing::warn;

/// Maximum `{{include}}` nesting depth (spec.md §4.3, §5 limits).
pub const MAX_INCLUDE_DEPTH: usize = 5;

/// How a rendered value is stringified into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Prompt/spell text: values are substituted verbatim.
    Plain,
    /// Script step commands: values are POSIX single-quote shell-escaped
    /// unless the expression is wrapped in `{{raw .x}}`.
    ShellQuoted,
}

/// Resolves a spell/partial name to its template source, user-first-then-builtin.
/// Implemented by `coven-grimoire`'s spell loader; kept as a trait here so the
/// renderer has no dependency on loader internals.
pub trait SpellResolver {
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Escape a string for safe use as a single POSIX shell word.
pub fn escape_for_shell(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

// ---------------------------------------------------------------------------
// Lexing: split template source into literal text and `{{ ... }}` actions.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum RawTag {
    Text(String),
    If(String),
    Else,
    Range(String),
    End,
    Include(String),
    Expr(String),
}

fn lex(template: &str) -> Result<Vec<RawTag>> {
    let mut tags = Vec::new();
    let mut rest = template;
    loop {
        match rest.find("{{") {
            None => {
                if !rest.is_empty() {
                    tags.push(RawTag::Text(rest.to_string()));
                }
                break;
            }
            Some(start) => {
                if start > 0 {
                    tags.push(RawTag::Text(rest[..start].to_string()));
                }
                let after = &rest[start + 2..];
                let end = after
                    .find("}}")
                    .ok_or_else(|| CovenError::TemplateParse("unterminated {{ tag".into()))?;
                let inner = after[..end].trim();
                tags.push(classify_tag(inner)?);
                rest = &after[end + 2..];
            }
        }
    }
    Ok(tags)
}

fn classify_tag(inner: &str) -> Result<RawTag> {
    if let Some(rest) = inner.strip_prefix("if ") {
        return Ok(RawTag::If(rest.trim().to_string()));
    }
    if inner == "else" {
        return Ok(RawTag::Else);
    }
    if let Some(rest) = inner.strip_prefix("range ") {
        return Ok(RawTag::Range(rest.trim().to_string()));
    }
    if inner == "end" {
        return Ok(RawTag::End);
    }
    if let Some(rest) = inner.strip_prefix("include ") {
        return Ok(RawTag::Include(rest.trim().to_string()));
    }
    if inner.is_empty() {
        return Err(CovenError::TemplateParse("empty {{ }} tag".into()));
    }
    Ok(RawTag::Expr(inner.to_string()))
}

// ---------------------------------------------------------------------------
// Parsing: flat tag stream -> AST, matching `if`/`range` blocks to their `end`.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Var(Expr),
    If {
        cond: Expr,
        then: Vec<Node>,
        else_: Vec<Node>,
    },
    Range {
        items: Expr,
        body: Vec<Node>,
    },
    Include {
        name: Expr,
        pairs: Vec<(String, Expr)>,
    },
}

#[derive(Debug, Clone)]
enum Expr {
    /// `.a.b.c` — resolved against the innermost scope.
    CurrentPath(String),
    /// `$.a.b.c` — resolved against the root scope.
    RootPath(String),
    StrLit(String),
    NumLit(f64),
    BoolLit(bool),
    Call(String, Vec<Expr>),
}

fn parse(tags: &[RawTag]) -> Result<Vec<Node>> {
    let mut pos = 0;
    let nodes = parse_block(tags, &mut pos)?;
    if pos != tags.len() {
        return Err(CovenError::TemplateParse(
            "unexpected {{else}}/{{end}} without matching opener".into(),
        ));
    }
    Ok(nodes)
}

/// Parses nodes until EOF, a bare `{{else}}`, or a bare `{{end}}` (neither consumed).
fn parse_block(tags: &[RawTag], pos: &mut usize) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while *pos < tags.len() {
        match &tags[*pos] {
            RawTag::Else | RawTag::End => break,
            RawTag::Text(s) => {
                nodes.push(Node::Text(s.clone()));
                *pos += 1;
            }
            RawTag::Expr(e) => {
                nodes.push(Node::Var(parse_expr(e)?));
                *pos += 1;
            }
            RawTag::If(cond) => {
                let cond = parse_expr(cond)?;
                *pos += 1;
                let then = parse_block(tags, pos)?;
                let mut else_ = Vec::new();
                if matches!(tags.get(*pos), Some(RawTag::Else)) {
                    *pos += 1;
                    else_ = parse_block(tags, pos)?;
                }
                match tags.get(*pos) {
                    Some(RawTag::End) => *pos += 1,
                    _ => return Err(CovenError::TemplateParse("{{if}} missing {{end}}".into())),
                }
                nodes.push(Node::If { cond, then, else_ });
            }
            RawTag::Range(path) => {
                let items = parse_expr(path)?;
                *pos += 1;
                let body = parse_block(tags, pos)?;
                match tags.get(*pos) {
                    Some(RawTag::End) => *pos += 1,
                    _ => return Err(CovenError::TemplateParse("{{range}} missing {{end}}".into())),
                }
                nodes.push(Node::Range { items, body });
            }
            RawTag::Include(src) => {
                let (name, pairs) = parse_include(src)?;
                nodes.push(Node::Include { name, pairs });
                *pos += 1;
            }
        }
    }
    Ok(nodes)
}

/// Splits `{{ ... }}` action content into whitespace-separated words, respecting
/// double-quoted string literals.
fn split_words(s: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut chars = s.chars().peekable();
    let mut current = String::new();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            } else if c == '"' {
                in_quotes = false;
                words.push(format!("\"{current}\""));
                current.clear();
            } else {
                current.push(c);
            }
        } else if c == '"' {
            if !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
            in_quotes = true;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
        } else {
            current.push(c);
        }
    }
    if in_quotes {
        return Err(CovenError::TemplateParse("unterminated string literal".into()));
    }
    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}

fn parse_atom(word: &str) -> Expr {
    if let Some(s) = word.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return Expr::StrLit(s.to_string());
    }
    if let Some(rest) = word.strip_prefix("$.") {
        return Expr::RootPath(rest.to_string());
    }
    if word == "$" {
        return Expr::RootPath(String::new());
    }
    if let Some(rest) = word.strip_prefix('.') {
        return Expr::CurrentPath(rest.to_string());
    }
    if word == "true" {
        return Expr::BoolLit(true);
    }
    if word == "false" {
        return Expr::BoolLit(false);
    }
    if let Ok(n) = word.parse::<f64>() {
        return Expr::NumLit(n);
    }
    Expr::StrLit(word.to_string())
}

/// A bare expression is either a single atom (`.path`, `"str"`, `true`) or a
/// helper call: `helper_name arg1 arg2 ...`.
fn parse_expr(s: &str) -> Result<Expr> {
    let words = split_words(s)?;
    if words.is_empty() {
        return Err(CovenError::TemplateParse("empty expression".into()));
    }
    if words.len() == 1 {
        return Ok(parse_atom(&words[0]));
    }
    let name = words[0].clone();
    let args = words[1..].iter().map(|w| parse_atom(w)).collect();
    Ok(Expr::Call(name, args))
}

/// `{{include "name" "k1" v1 "k2" v2 ...}}`
fn parse_include(s: &str) -> Result<(Expr, Vec<(String, Expr)>)> {
    let words = split_words(s)?;
    if words.is_empty() {
        return Err(CovenError::TemplateParse("{{include}} requires a name".into()));
    }
    let name = parse_atom(&words[0]);
    let rest = &words[1..];
    if rest.len() % 2 != 0 {
        return Err(CovenError::TemplateParse(
            "{{include}} key/value arguments must be paired".into(),
        ));
    }
    let mut pairs = Vec::new();
    for chunk in rest.chunks(2) {
        let key = chunk[0]
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(&chunk[0])
            .to_string();
        pairs.push((key, parse_atom(&chunk[1])));
    }
    Ok((name, pairs))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// A rendered value plus whether it was produced by `{{raw ...}}` (opts out of
/// shell quoting in [`RenderMode::ShellQuoted`]).
struct Evaluated {
    value: Value,
    raw: bool,
}

fn lookup(scopes: &[&Value], path: &str, strict: bool, from_root: bool) -> Result<Value> {
    let root = if from_root {
        scopes.first()
    } else {
        scopes.last()
    };
    let Some(root) = root else {
        return Ok(Value::Null);
    };
    if path.is_empty() {
        return Ok((*root).clone());
    }
    match root.get_path(path) {
        Some(v) => Ok(v.clone()),
        None if strict => Err(CovenError::TemplateRender(format!("missing key: {path}"))),
        None => Ok(Value::Null),
    }
}

fn eval(expr: &Expr, scopes: &[&Value], strict: bool) -> Result<Evaluated> {
    match expr {
        Expr::CurrentPath(p) => Ok(Evaluated {
            value: lookup(scopes, p, strict, false)?,
            raw: false,
        }),
        Expr::RootPath(p) => Ok(Evaluated {
            value: lookup(scopes, p, strict, true)?,
            raw: false,
        }),
        Expr::StrLit(s) => Ok(Evaluated {
            value: Value::String(s.clone()),
            raw: false,
        }),
        Expr::NumLit(n) => Ok(Evaluated {
            value: Value::Number(*n),
            raw: false,
        }),
        Expr::BoolLit(b) => Ok(Evaluated {
            value: Value::Bool(*b),
            raw: false,
        }),
        Expr::Call(name, args) => eval_call(name, args, scopes, strict),
    }
}

fn eval_call(name: &str, args: &[Expr], scopes: &[&Value], strict: bool) -> Result<Evaluated> {
    let values: Result<Vec<Value>> = args
        .iter()
        .map(|a| eval(a, scopes, strict).map(|e| e.value))
        .collect();
    let values = values?;
    match name {
        "raw" => {
            let v = values
                .first()
                .cloned()
                .ok_or_else(|| CovenError::TemplateRender("raw requires an argument".into()))?;
            Ok(Evaluated { value: v, raw: true })
        }
        "default" => {
            let (a, b) = (
                values.first().cloned().unwrap_or(Value::Null),
                values.get(1).cloned().unwrap_or(Value::Null),
            );
            let value = if a.is_truthy() { a } else { b };
            Ok(Evaluated { value, raw: false })
        }
        "join" => {
            let list = values.first().and_then(|v| v.as_list()).unwrap_or(&[]);
            let sep = values
                .get(1)
                .map(|v| v.to_string())
                .unwrap_or_else(|| ", ".to_string());
            let joined = list.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(&sep);
            Ok(Evaluated {
                value: Value::String(joined),
                raw: false,
            })
        }
        "upper" => string_helper(&values, |s| s.to_uppercase()),
        "lower" => string_helper(&values, |s| s.to_lowercase()),
        "trim" => string_helper(&values, |s| s.trim().to_string()),
        "quote" => string_helper(&values, |s| format!("\"{}\"", s.replace('"', "\\\""))),
        "indent" => {
            let n = values
                .first()
                .map(|v| v.to_string().parse::<usize>().unwrap_or(0))
                .unwrap_or(0);
            let text = values.get(1).map(|v| v.to_string()).unwrap_or_default();
            let pad = " ".repeat(n);
            let indented = text
                .lines()
                .map(|l| format!("{pad}{l}"))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(Evaluated {
                value: Value::String(indented),
                raw: false,
            })
        }
        other => Err(CovenError::TemplateRender(format!("unknown helper: {other}"))),
    }
}

fn string_helper(values: &[Value], f: impl Fn(String) -> String) -> Result<Evaluated> {
    let s = values.first().map(|v| v.to_string()).unwrap_or_default();
    Ok(Evaluated {
        value: Value::String(f(s)),
        raw: false,
    })
}

struct Engine<'a> {
    resolver: &'a dyn SpellResolver,
    mode: RenderMode,
    strict: bool,
    chain: Vec<String>,
}

impl<'a> Engine<'a> {
    fn render_nodes(&mut self, nodes: &[Node], scopes: &mut Vec<&Value>, out: &mut String) -> Result<()> {
        for node in nodes {
            self.render_node(node, scopes, out)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node, scopes: &mut Vec<&Value>, out: &mut String) -> Result<()> {
        match node {
            Node::Text(s) => out.push_str(s),
            Node::Var(expr) => {
                let evaluated = eval(expr, scopes, self.strict)?;
                self.push_value(&evaluated, out);
            }
            Node::If { cond, then, else_ } => {
                let evaluated = eval(cond, scopes, self.strict)?;
                let b = evaluated.value.as_strict_bool().ok_or_else(|| {
                    CovenError::TemplateTypeMismatch(format!(
                        "{{{{if}}}} condition did not evaluate to a boolean: {}",
                        evaluated.value
                    ))
                })?;
                if b {
                    self.render_nodes(then, scopes, out)?;
                } else {
                    self.render_nodes(else_, scopes, out)?;
                }
            }
            Node::Range { items, body } => {
                let evaluated = eval(items, scopes, self.strict)?;
                let list = evaluated.value.as_list().map(|l| l.to_vec()).unwrap_or_default();
                for item in &list {
                    scopes.push(item);
                    let result = self.render_nodes(body, scopes, out);
                    scopes.pop();
                    result?;
                }
            }
            Node::Include { name, pairs } => {
                let name_val = eval(name, scopes, self.strict)?.value;
                let name_str = name_val.to_string();
                if self.chain.contains(&name_str) {
                    return Err(CovenError::IncludeCycle(self.chain.join(" -> ") + " -> " + &name_str));
                }
                if self.chain.len() >= MAX_INCLUDE_DEPTH {
                    return Err(CovenError::IncludeDepthExceeded);
                }
                let source = self
                    .resolver
                    .resolve(&name_str)
                    .ok_or_else(|| CovenError::SpellNotFound(name_str.clone()))?;

                let mut child = scopes.last().copied().cloned().unwrap_or(Value::map());
                for (key, value_expr) in pairs {
                    let v = eval(value_expr, scopes, self.strict)?.value;
                    child.set_path(key, v);
                }

                self.chain.push(name_str);
                let tags = lex(&source)?;
                let nodes = parse(&tags)?;
                let mut child_scopes = vec![&child];
                self.render_nodes(&nodes, &mut child_scopes, out)?;
                self.chain.pop();
            }
        }
        Ok(())
    }

    fn push_value(&self, evaluated: &Evaluated, out: &mut String) {
        let rendered = evaluated.value.to_string();
        match self.mode {
            RenderMode::Plain => out.push_str(&rendered),
            RenderMode::ShellQuoted => {
                if evaluated.raw {
                    warn!(value = %rendered, "raw shell interpolation used, bypassing quoting");
                    out.push_str(&rendered);
                } else {
                    out.push_str(&escape_for_shell(&rendered));
                }
            }
        }
    }
}

/// Render `template` against `ctx`, resolving `{{include}}` partials via `resolver`.
///
/// `strict` controls whether a missing key is an error (script/agent steps,
/// per spec.md §4.3) or resolves to null.
pub fn render(
    template: &str,
    ctx: &Value,
    mode: RenderMode,
    strict: bool,
    resolver: &dyn SpellResolver,
) -> Result<String> {
    let tags = lex(template)?;
    let nodes = parse(&tags)?;
    let mut engine = Engine {
        resolver,
        mode,
        strict,
        chain: Vec::new(),
    };
    let mut out = String::new();
    let mut scopes = vec![ctx];
    engine.render_nodes(&nodes, &mut scopes, &mut out)?;
    Ok(out)
}

/// Renders a strict-boolean `when`/`if` guard expression standalone (no surrounding text).
///
/// Accepts either a bare expression (`.previous.failed`) or a single `{{ ... }}`
/// tag (`"{{.previous.failed}}"`, the form grimoire YAML step `when` fields use).
pub fn render_condition(expr: &str, ctx: &Value) -> Result<bool> {
    let trimmed = expr.trim();
    let inner = trimmed
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
        .unwrap_or(trimmed);
    let parsed = parse_expr(inner.trim())?;
    let evaluated = eval(&parsed, &[ctx], true)?;
    evaluated.value.as_strict_bool().ok_or_else(|| {
        CovenError::TemplateTypeMismatch(format!(
            "condition did not evaluate to a boolean: {}",
            evaluated.value
        ))
    })
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;

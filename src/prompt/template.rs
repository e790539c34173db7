//! Prompt template rendering.
//!
//! Supports `{{field}}` / `{{{field}}}` interpolation with dotted paths and
//! `{{#each field}} … {{/each}}` iteration over arrays (nesting allowed). Inside a block
//! `{{this}}` is the current element. There is no other control flow; callers pre-compute
//! anything conditional into the input. Rendering is a pure function of
//! `(template, input)`.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unclosed tag starting at byte {0}")]
    UnclosedTag(usize),

    #[error("Unsupported tag: {{{{{0}}}}}")]
    UnsupportedTag(String),

    #[error("Unbalanced block: {0}")]
    UnbalancedBlock(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Variable {0} is not an array")]
    NotIterable(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Var(String),
    EachOpen(String),
    EachClose,
}

impl Token {
    fn is_block(&self) -> bool {
        matches!(self, Token::EachOpen(_) | Token::EachClose)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Each { path: String, body: Vec<Node> },
}

fn tokenize(template: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = template;
    let mut offset = 0usize;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(rest[..start].to_string()));
        }
        let (open_len, close) = if rest[start..].starts_with("{{{") {
            (3, "}}}")
        } else {
            (2, "}}")
        };
        let body_start = start + open_len;
        let end = rest[body_start..]
            .find(close)
            .ok_or(TemplateError::UnclosedTag(offset + start))?;
        let inner = rest[body_start..body_start + end].trim();

        let token = if let Some(path) = inner.strip_prefix("#each") {
            let path = path.trim();
            if path.is_empty() {
                return Err(TemplateError::UnsupportedTag(inner.to_string()));
            }
            Token::EachOpen(path.to_string())
        } else if inner == "/each" {
            Token::EachClose
        } else if inner.is_empty() || inner.starts_with('#') || inner.starts_with('/') {
            return Err(TemplateError::UnsupportedTag(inner.to_string()));
        } else {
            Token::Var(inner.to_string())
        };
        tokens.push(token);

        let consumed = body_start + end + close.len();
        offset += consumed;
        rest = &rest[consumed..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }

    strip_standalone_blocks(&mut tokens);
    Ok(tokens)
}

/// A block tag alone on its line does not leave a blank line behind.
///
/// Standalone tags are found on the untrimmed tokens first so that trimming
/// one tag never hides the line boundary of its neighbour.
fn strip_standalone_blocks(tokens: &mut [Token]) {
    let standalone: Vec<usize> = (0..tokens.len())
        .filter(|&i| tokens[i].is_block() && is_standalone(tokens, i))
        .collect();

    for i in standalone {
        if i > 0 {
            if let Token::Text(t) = &mut tokens[i - 1] {
                let keep = t.rfind('\n').map(|nl| nl + 1).unwrap_or(0);
                t.truncate(keep);
            }
        }
        if let Some(Token::Text(t)) = tokens.get_mut(i + 1) {
            let cut = t.find('\n').map(|nl| nl + 1).unwrap_or(t.len());
            t.drain(..cut);
        }
    }
}

fn is_standalone(tokens: &[Token], i: usize) -> bool {
    let prev_ok = match i.checked_sub(1).map(|p| &tokens[p]) {
        None => true,
        Some(Token::Text(t)) => match t.rfind('\n') {
            Some(nl) => t[nl + 1..].chars().all(|c| c == ' ' || c == '\t'),
            None => i == 1 && t.chars().all(|c| c == ' ' || c == '\t'),
        },
        Some(_) => false,
    };
    let next_ok = match tokens.get(i + 1) {
        None => true,
        Some(Token::Text(t)) => match t.find('\n') {
            Some(nl) => t[..nl].chars().all(|c| c == ' ' || c == '\t' || c == '\r'),
            None => i + 2 == tokens.len() && t.chars().all(|c| c == ' ' || c == '\t'),
        },
        Some(_) => false,
    };
    prev_ok && next_ok
}

fn parse(tokens: Vec<Token>) -> Result<Vec<Node>, TemplateError> {
    let mut stack: Vec<(String, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();

    for token in tokens {
        match token {
            Token::Text(t) if t.is_empty() => {}
            Token::Text(t) => current.push(Node::Text(t)),
            Token::Var(v) => current.push(Node::Var(v)),
            Token::EachOpen(path) => {
                stack.push((path, std::mem::take(&mut current)));
            }
            Token::EachClose => {
                let (path, parent) = stack
                    .pop()
                    .ok_or_else(|| TemplateError::UnbalancedBlock("{{/each}} without {{#each}}".into()))?;
                let body = std::mem::replace(&mut current, parent);
                current.push(Node::Each { path, body });
            }
        }
    }

    if let Some((path, _)) = stack.pop() {
        return Err(TemplateError::UnbalancedBlock(format!(
            "{{{{#each {}}}}} is never closed",
            path
        )));
    }
    Ok(current)
}

fn lookup<'a>(scopes: &[&'a Value], path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;

    let mut value = if first == "this" {
        *scopes.last()?
    } else {
        scopes.iter().rev().find_map(|scope| scope.get(first))?
    };
    for segment in segments {
        value = value.get(segment)?;
    }
    Some(value)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            out.push_str(&value.to_string())
        }
    }
}

fn render_nodes(nodes: &[Node], scopes: &mut Vec<&Value>, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Var(path) => {
                let value = lookup(scopes, path)
                    .ok_or_else(|| TemplateError::UnknownVariable(path.clone()))?;
                write_value(out, value);
            }
            Node::Each { path, body } => {
                let value = lookup(scopes, path)
                    .ok_or_else(|| TemplateError::UnknownVariable(path.clone()))?;
                let items = value
                    .as_array()
                    .ok_or_else(|| TemplateError::NotIterable(path.clone()))?;
                for item in items {
                    scopes.push(item);
                    let result = render_nodes(body, scopes, out);
                    scopes.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

/// Render `template` against `input`.
pub fn render(template: &str, input: &Value) -> Result<String, TemplateError> {
    let nodes = parse(tokenize(template)?)?;
    let mut out = String::with_capacity(template.len());
    let mut scopes = vec![input];
    render_nodes(&nodes, &mut scopes, &mut out)?;
    Ok(out)
}

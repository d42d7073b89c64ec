/*
 * localize/eval.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Evaluation of the UI-description markup subset.
 */

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{LocalizeError, Result};
use crate::diagnostics::escape_html;

/// Per-call evaluation scope: context data plus the active catalog.
pub(super) struct Scope<'a> {
    data: &'a Map<String, Value>,
    catalog: Option<&'a BTreeMap<String, String>>,
}

struct Tag<'t> {
    name: &'t str,
    attrs: Vec<Attr<'t>>,
    self_closing: bool,
    /// Bytes consumed, including the closing `>`.
    len: usize,
}

impl<'t> Tag<'t> {
    fn attr(&self, name: &str) -> Option<&Attr<'t>> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

struct Attr<'t> {
    name: &'t str,
    value: AttrValue<'t>,
    raw: &'t str,
}

enum AttrValue<'t> {
    Bare,
    Quoted(&'t str),
    Expr(&'t str),
}

impl<'a> Scope<'a> {
    pub(super) fn new(
        data: &'a Map<String, Value>,
        catalog: Option<&'a BTreeMap<String, String>>,
    ) -> Self {
        Self { data, catalog }
    }

    pub(super) fn evaluate(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let Some(next) = rest.find(['<', '{']) else {
                out.push_str(rest);
                break;
            };
            out.push_str(&rest[..next]);
            pos += next;
            let rest = &text[pos..];

            if rest.starts_with("{/*") {
                let end = rest.find("*/}").ok_or(LocalizeError::Unterminated {
                    construct: "comment",
                    offset: pos,
                })?;
                pos += end + 3;
            } else if rest.starts_with('{') {
                let end = matching_brace(rest).ok_or(LocalizeError::Unterminated {
                    construct: "expression",
                    offset: pos,
                })?;
                let value = self.eval_expr(&rest[1..end])?;
                out.push_str(&escape_html(&self.content_text(&value)?));
                pos += end + 1;
            } else if rest.starts_with("<!--") {
                let end = rest.find("-->").map_or(rest.len(), |e| e + 3);
                out.push_str(&rest[..end]);
                pos += end;
            } else {
                match parse_tag(rest, pos)? {
                    Some(tag) => pos += self.render_tag(&tag, text, pos, &mut out)?,
                    None => {
                        out.push('<');
                        pos += 1;
                    }
                }
            }
        }

        Ok(out)
    }

    /// Render the tag starting at `pos` and return how many bytes it used.
    fn render_tag(&self, tag: &Tag<'_>, text: &str, pos: usize, out: &mut String) -> Result<usize> {
        match tag.name {
            "Trans" => {
                let (body, consumed) = self.element_body(tag, text, pos, "Trans")?;
                out.push_str(&self.render_trans(tag, body)?);
                Ok(consumed)
            }
            "Plural" | "Select" | "SelectOrdinal" => {
                let (_, consumed) = self.element_body(tag, text, pos, tag.name)?;
                out.push_str(&self.render_choice(tag)?);
                Ok(consumed)
            }
            name if name.starts_with(|c: char| c.is_ascii_uppercase()) => {
                Err(LocalizeError::UnknownComponent(name.to_string()))
            }
            _ => {
                self.emit_tag(tag, &text[pos..pos + tag.len], out)?;
                Ok(tag.len)
            }
        }
    }

    fn element_body<'t>(
        &self,
        tag: &Tag<'_>,
        text: &'t str,
        pos: usize,
        name: &str,
    ) -> Result<(&'t str, usize)> {
        if tag.self_closing {
            return Ok(("", tag.len));
        }
        let body_start = pos + tag.len;
        let close = format!("</{}>", name);
        let body_len = text[body_start..]
            .find(&close)
            .ok_or(LocalizeError::Unterminated {
                construct: "component",
                offset: pos,
            })?;
        Ok((
            &text[body_start..body_start + body_len],
            tag.len + body_len + close.len(),
        ))
    }

    fn emit_tag(&self, tag: &Tag<'_>, source: &str, out: &mut String) -> Result<()> {
        if !tag.attrs.iter().any(|a| matches!(a.value, AttrValue::Expr(_))) {
            out.push_str(source);
            return Ok(());
        }

        out.push('<');
        out.push_str(tag.name);
        for attr in &tag.attrs {
            out.push(' ');
            match attr.value {
                AttrValue::Expr(expr) => {
                    let value = self.eval_expr(expr)?;
                    out.push_str(attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape_html(&self.content_text(&value)?));
                    out.push('"');
                }
                _ => out.push_str(attr.raw),
            }
        }
        out.push_str(if tag.self_closing { " />" } else { ">" });
        Ok(())
    }

    fn render_trans(&self, tag: &Tag<'_>, body: &str) -> Result<String> {
        let id = tag.attr("id").and_then(|a| match a.value {
            AttrValue::Quoted(id) => Some(id),
            _ => None,
        });
        let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");

        let translated = self.catalog.and_then(|catalog| {
            id.and_then(|id| catalog.get(id))
                .or_else(|| catalog.get(&normalized))
        });
        let message = match translated {
            Some(message) => message.as_str(),
            None if body.is_empty() => id.unwrap_or_default(),
            None => body,
        };
        self.evaluate(message)
    }

    fn render_choice(&self, tag: &Tag<'_>) -> Result<String> {
        let component = match tag.name {
            "Plural" => "Plural",
            "Select" => "Select",
            _ => "SelectOrdinal",
        };
        let value_attr = tag.attr("value").ok_or(LocalizeError::MissingAttribute {
            component,
            attribute: "value",
        })?;
        let value = match value_attr.value {
            AttrValue::Expr(expr) => self.eval_expr(expr)?,
            AttrValue::Quoted(s) => Value::String(s.to_string()),
            AttrValue::Bare => Value::Null,
        };
        let missing_other = LocalizeError::MissingAttribute {
            component,
            attribute: "other",
        };

        let form = if component == "Select" {
            let key = self.content_text(&value)?;
            let attr = tag
                .attr(&key)
                .filter(|a| a.name != "value")
                .or_else(|| tag.attr("other"))
                .ok_or(missing_other)?;
            self.attr_text(attr)?
        } else {
            let n = as_number(&value)
                .ok_or_else(|| LocalizeError::UnsupportedExpression(format!("{} is not a number", value)))?;
            let shown = number_text(n);
            let category = if component == "Plural" {
                plural_category(n)
            } else {
                ordinal_category(n)
            };
            let attr = tag
                .attr(&format!("_{}", shown))
                .or_else(|| if n == 0.0 { tag.attr("zero") } else { None })
                .or_else(|| tag.attr(category))
                .or_else(|| tag.attr("other"))
                .ok_or(missing_other)?;
            replace_count(&self.attr_text(attr)?, &shown)
        };

        self.evaluate(&form)
    }

    fn attr_text(&self, attr: &Attr<'_>) -> Result<String> {
        match attr.value {
            AttrValue::Quoted(s) => Ok(s.to_string()),
            AttrValue::Expr(expr) => Ok(escape_html(&self.content_text(&self.eval_expr(expr)?)?)),
            AttrValue::Bare => Ok(String::new()),
        }
    }

    fn eval_expr(&self, expr: &str) -> Result<Value> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Value::Null);
        }
        if let Some(s) = string_literal(expr) {
            return Ok(Value::String(s));
        }
        match expr {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" | "undefined" => return Ok(Value::Null),
            _ => {}
        }
        if expr.starts_with(|c: char| c.is_ascii_digit() || c == '-')
            && let Ok(n) = expr.parse::<f64>()
        {
            return Ok(match expr.parse::<i64>() {
                Ok(i) => Value::from(i),
                Err(_) => Value::from(n),
            });
        }

        let segments =
            parse_path(expr).ok_or_else(|| LocalizeError::UnsupportedExpression(expr.to_string()))?;
        let (root, members) = segments
            .split_first()
            .ok_or_else(|| LocalizeError::UnsupportedExpression(expr.to_string()))?;
        let root_key = match root {
            Segment::Key(key) => key.as_str(),
            Segment::Index(_) => return Err(LocalizeError::UnsupportedExpression(expr.to_string())),
        };
        let mut current = self
            .data
            .get(root_key)
            .ok_or_else(|| LocalizeError::UnknownIdentifier(root_key.to_string()))?;

        for member in members {
            let next = match (member, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(i), Value::Array(items)) => items.get(*i),
                (Segment::Key(key), Value::Array(items)) if key == "length" => {
                    return Ok(Value::from(items.len()));
                }
                _ => None,
            };
            match next {
                Some(value) => current = value,
                // Missing members are undefined and render as nothing.
                None => return Ok(Value::Null),
            }
        }
        Ok(current.clone())
    }

    fn content_text(&self, value: &Value) -> Result<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.as_f64().map_or_else(|| n.to_string(), number_text)),
            Value::Bool(_) | Value::Null => Ok(String::new()),
            Value::Array(items) => items.iter().map(|v| self.content_text(v)).collect(),
            Value::Object(_) => Err(LocalizeError::ObjectInContent(value.to_string())),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn parse_path(expr: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = expr;

    let (ident, after) = take_ident(rest)?;
    segments.push(Segment::Key(ident.to_string()));
    rest = after;

    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let (ident, after) = take_ident(after_dot)?;
            segments.push(Segment::Key(ident.to_string()));
            rest = after;
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let close = after_bracket.find(']')?;
            let inner = after_bracket[..close].trim();
            let segment = match string_literal(inner) {
                Some(key) => Segment::Key(key),
                None => Segment::Index(inner.parse().ok()?),
            };
            segments.push(segment);
            rest = &after_bracket[close + 1..];
        } else {
            return None;
        }
    }
    Some(segments)
}

fn take_ident(s: &str) -> Option<(&str, &str)> {
    let first = s.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return None;
    }
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

fn string_literal(expr: &str) -> Option<String> {
    let quote = expr.chars().next()?;
    if !matches!(quote, '"' | '\'' | '`') || expr.len() < 2 || !expr.ends_with(quote) {
        return None;
    }
    let inner = &expr[1..expr.len() - 1];
    if quote == '`' && inner.contains("${") {
        return None;
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            if c == quote {
                return None;
            }
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => return None,
        }
    }
    Some(out)
}

/// Index of the `}` closing the `{` at the start of `s`.
fn matching_brace(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Parse a start tag at the beginning of `rest`. Returns `None` when `rest`
/// does not start a tag (closing tags, doctype, a lone `<`).
fn parse_tag(rest: &str, offset: usize) -> Result<Option<Tag<'_>>> {
    let bytes = rest.as_bytes();
    if bytes.len() < 2 || !bytes[1].is_ascii_alphabetic() {
        return Ok(None);
    }
    let unterminated = || LocalizeError::Unterminated {
        construct: "tag",
        offset,
    };

    let mut i = 1;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = &rest[1..i];
    let mut attrs = Vec::new();

    loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i) {
            None => return Err(unterminated()),
            Some(b'>') => {
                return Ok(Some(Tag {
                    name,
                    attrs,
                    self_closing: false,
                    len: i + 1,
                }));
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                return Ok(Some(Tag {
                    name,
                    attrs,
                    self_closing: true,
                    len: i + 2,
                }));
            }
            Some(_) => {}
        }

        let start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>')
            && !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
        {
            i += 1;
        }
        if i == start {
            i += 1;
        }
        let attr_name = &rest[start..i];

        let mut j = skip_whitespace(bytes, i);
        if bytes.get(j) != Some(&b'=') {
            attrs.push(Attr {
                name: attr_name,
                value: AttrValue::Bare,
                raw: attr_name,
            });
            continue;
        }
        j = skip_whitespace(bytes, j + 1);

        let value = match bytes.get(j) {
            None => return Err(unterminated()),
            Some(&q) if q == b'"' || q == b'\'' => {
                let close = rest[j + 1..].find(q as char).ok_or_else(unterminated)? + j + 1;
                let value = AttrValue::Quoted(&rest[j + 1..close]);
                j = close + 1;
                value
            }
            Some(b'{') => {
                let close = matching_brace(&rest[j..]).ok_or_else(unterminated)? + j;
                let value = AttrValue::Expr(&rest[j + 1..close]);
                j = close + 1;
                value
            }
            Some(_) => {
                let value_start = j;
                while j < bytes.len()
                    && !bytes[j].is_ascii_whitespace()
                    && bytes[j] != b'>'
                    && !(bytes[j] == b'/' && bytes.get(j + 1) == Some(&b'>'))
                {
                    j += 1;
                }
                AttrValue::Quoted(&rest[value_start..j])
            }
        };
        attrs.push(Attr {
            name: attr_name,
            value,
            raw: &rest[start..j],
        });
        i = j;
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn plural_category(n: f64) -> &'static str {
    if n == 1.0 { "one" } else { "other" }
}

fn ordinal_category(n: f64) -> &'static str {
    if n.fract() != 0.0 {
        return "other";
    }
    let n = n.abs() as i64;
    match (n % 10, n % 100) {
        (1, m) if m != 11 => "one",
        (2, m) if m != 12 => "two",
        (3, m) if m != 13 => "few",
        _ => "other",
    }
}

/// Replace `#` with the count, leaving numeric character references alone.
fn replace_count(form: &str, shown: &str) -> String {
    let mut out = String::with_capacity(form.len());
    let mut previous = None;
    for c in form.chars() {
        if c == '#' && previous != Some('&') {
            out.push_str(shown);
        } else {
            out.push(c);
        }
        previous = Some(c);
    }
    out
}

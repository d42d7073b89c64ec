/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render failures as displayable HTML documents.
 */

//! Diagnostics formatter.
//!
//! Turns a [`RenderFailure`] into an HTML page shown in place of the
//! preview. Formatting never fails: every failure shape, including lines
//! that fall outside the context text, produces a readable page.
//!
//! For structured compiler errors each block carries an excerpt of the
//! context text around the reported line:
//!
//! ```text
//! lines [line - 4, line + 2), clamped to the text, 1-based line marked
//! ```

use std::fmt::Write;

use crate::render::{CompileError, RenderFailure};

const BODY_STYLE: &str = "background:#AD2222; padding: 20px; color: white";
const CODE_STYLE: &str = "font-family: monospace; margin-top: 0.5rem; color: #322; \
     background-color: #EEE; padding: 1rem; border-radius: 4px";
const HIGHLIGHT_STYLE: &str = "background-color: #ff8787";

/// A window of source lines around a reported line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    /// 1-based number of the first line in `lines`.
    pub first_line: usize,
    pub lines: Vec<String>,
    /// Index into `lines` of the offending line.
    pub highlighted: usize,
}

impl Excerpt {
    /// Cut the window for 1-based `line` out of `text`. Returns `None` when
    /// the line does not exist in `text`.
    pub fn around(text: &str, line: usize) -> Option<Self> {
        let lines: Vec<&str> = text.split('\n').collect();
        if line == 0 || line > lines.len() {
            return None;
        }
        let start = line.saturating_sub(4);
        let end = (line + 2).min(lines.len());
        Some(Self {
            first_line: start + 1,
            lines: lines[start..end].iter().copied().map(String::from).collect(),
            highlighted: line - 1 - start,
        })
    }
}

/// Format `failure` as a full HTML page.
///
/// `context` is the text that the failure's line numbers refer to; when
/// the failure carries its own (see [`RenderFailure::context_text`]) that
/// text is used instead. `base_href` becomes the page's `<base>`.
pub fn format_failure(
    failure: &RenderFailure,
    context: Option<&str>,
    base_href: Option<&str>,
) -> String {
    match failure {
        RenderFailure::Compilation { errors, .. } => {
            format_compile_errors(errors, failure.context_text().or(context), base_href)
        }
        RenderFailure::TemplateExpansion(error) | RenderFailure::Localization(error) => {
            format_generic(error, base_href)
        }
        RenderFailure::EmptyOutput | RenderFailure::Message(_) => {
            format_message(&failure.to_string(), base_href)
        }
    }
}

/// Page for an ordered list of positioned errors.
pub fn format_compile_errors(
    errors: &[CompileError],
    context: Option<&str>,
    base_href: Option<&str>,
) -> String {
    let mut body = String::from("<h1 style=\"margin-bottom: 0.5rem;\">Errors rendering MJML</h1>\n");
    for error in errors {
        let _ = write!(body, "{}", error_block(error, context));
    }
    page(&body, base_href)
}

/// Page for a single error whose detail is shown as-is.
pub fn format_generic(error: &CompileError, base_href: Option<&str>) -> String {
    let mut body = String::from("<h1 style=\"margin-bottom: 0.5rem;\">Error</h1>\n");
    if let Some(line) = error.line {
        let _ = writeln!(body, "<h3>Line {}</h3>", line);
    }
    let _ = writeln!(
        body,
        "<p style=\"margin-bottom: 1rem\">{}</p>",
        escape_html(&error.message)
    );
    if let Some(detail) = &error.detail {
        let _ = writeln!(
            body,
            "<div style=\"white-space: pre-wrap; {}\">{}</div>",
            CODE_STYLE, detail
        );
    }
    page(&body, base_href)
}

/// Page for a bare message.
pub fn format_message(message: &str, base_href: Option<&str>) -> String {
    let body = format!(
        "<h1 style=\"margin-bottom: 0.5rem;\">Error</h1>\n<p style=\"margin-bottom: 1rem\">{}</p>\n",
        escape_html(message)
    );
    page(&body, base_href)
}

fn error_block(error: &CompileError, context: Option<&str>) -> String {
    let mut block = String::from("<div class=\"diagnostic\" style=\"margin-bottom: 1rem\">\n");
    if let Some(line) = error.line {
        let _ = writeln!(block, "<h3>Line {}</h3>", line);
    }
    let _ = writeln!(block, "<h4>Error: {}</h4>", escape_html(&error.message));

    let excerpt = context
        .zip(error.line)
        .and_then(|(text, line)| Excerpt::around(text, line));
    if let Some(excerpt) = excerpt {
        let _ = writeln!(block, "<div class=\"excerpt\" style=\"{}\">", CODE_STYLE);
        for (index, line) in excerpt.lines.iter().enumerate() {
            let number = excerpt.first_line + index;
            if index == excerpt.highlighted {
                let _ = writeln!(
                    block,
                    "<div class=\"offending\" data-line=\"{}\" style=\"white-space: pre-wrap;{}\">{}</div>",
                    number,
                    HIGHLIGHT_STYLE,
                    escape_html(line)
                );
            } else {
                let _ = writeln!(
                    block,
                    "<div data-line=\"{}\" style=\"white-space: pre-wrap;\">{}</div>",
                    number,
                    escape_html(line)
                );
            }
        }
        block.push_str("</div>\n");
    }
    block.push_str("</div>\n");
    block
}

fn page(body: &str, base_href: Option<&str>) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    if let Some(href) = base_href {
        let _ = writeln!(out, "<base href=\"{}\">", escape_html(href));
    }
    let _ = write!(
        out,
        "</head>\n<body style=\"{}\">\n{}</body>\n</html>\n",
        BODY_STYLE, body
    );
    out
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

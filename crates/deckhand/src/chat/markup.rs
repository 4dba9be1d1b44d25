//! The assistant's lightweight reply markup: `**bold**` spans and `* ` bullets.

use regex::Regex;
use std::sync::LazyLock;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Paragraph(Vec<Span>),
    Bullet(Vec<Span>),
    Blank,
}

pub fn parse(text: &str) -> Vec<Line> {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                Line::Blank
            } else if let Some(item) = trimmed.strip_prefix("* ") {
                Line::Bullet(spans(item))
            } else {
                Line::Paragraph(spans(line))
            }
        })
        .collect()
}

pub fn spans(line: &str) -> Vec<Span> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in BOLD.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Span {
                text: line[last..whole.start()].to_string(),
                bold: false,
            });
        }
        out.push(Span {
            text: inner.as_str().to_string(),
            bold: true,
        });
        last = whole.end();
    }
    if last < line.len() {
        out.push(Span {
            text: line[last..].to_string(),
            bold: false,
        });
    }
    out
}

/// Plain-text rendering for terminals: bold markers dropped, bullets as `•`.
pub fn to_plain(text: &str) -> String {
    parse(text)
        .iter()
        .map(|line| match line {
            Line::Blank => String::new(),
            Line::Paragraph(spans) => join(spans),
            Line::Bullet(spans) => format!("  \u{2022} {}", join(spans)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn join(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

//! CSS text output.
//!
//! Output is compact and deterministic: `a { color: red; }`, rules separated
//! by a single space. [`annotate_sources`] writes the same text while stamping
//! every rule with the byte range it occupies.

use crate::cssom::{CssRule, Declarations, RuleKind, StyleSheet};
use aerial_common::{SourceLocation, SourceRange};

/// Byte span of one written rule: outer range plus the range between braces
#[derive(Debug, Clone, Copy)]
struct Span {
    outer: SourceRange,
    inner: SourceRange,
}

pub fn css_text(sheet: &StyleSheet) -> String {
    let mut out = String::new();
    write_rules(&mut out, &sheet.rules, &mut Vec::new());
    out
}

pub fn rule_text(rule: &CssRule) -> String {
    let mut out = String::new();
    write_rule(&mut out, rule, &mut Vec::new());
    out
}

/// Text between the braces of a declaration block, including the padding
/// spaces: `" color: red; "`, or `" "` when empty
pub fn declarations_body(style: &Declarations) -> String {
    if style.is_empty() {
        return " ".to_string();
    }

    let decls: Vec<String> = style
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect();
    format!(" {} ", decls.join(" "))
}

/// Text between the braces of any rule: its declarations, or its nested
/// rules padded by a space on each side
pub fn rule_body(rule: &CssRule) -> String {
    let mut out = String::new();
    write_body(&mut out, rule, &mut Vec::new());
    out
}

/// Serialize the sheet and record provenance on it and every rule.
///
/// Positions are offset by `base`, so a sheet embedded in a larger document
/// can be stamped with document offsets.
pub fn annotate_sources(sheet: &mut StyleSheet, uri: &str, base: usize) -> String {
    let mut out = String::new();
    let mut spans = Vec::new();
    write_rules(&mut out, &sheet.rules, &mut spans);

    let mut spans = spans.into_iter();
    stamp_rules(&mut sheet.rules, uri, base, &mut spans);
    sheet.source =
        Some(SourceLocation::new(uri, base, base + out.len()).with_inner(base, base + out.len()));
    out
}

/// Remove all whitespace, for comparing CSS text regardless of formatting
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn write_rules(out: &mut String, rules: &[CssRule], spans: &mut Vec<Span>) {
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_rule(out, rule, spans);
    }
}

// pre-order: a rule's span is pushed before its children's
fn write_rule(out: &mut String, rule: &CssRule, spans: &mut Vec<Span>) {
    let start = out.len();
    let slot = spans.len();
    spans.push(Span {
        outer: SourceRange::new(start, start),
        inner: SourceRange::new(start, start),
    });

    match &rule.kind {
        RuleKind::Style { selector, .. } => out.push_str(selector),
        RuleKind::Media { condition, .. } => {
            out.push_str("@media ");
            out.push_str(condition);
        }
        RuleKind::Keyframes { name, .. } => {
            out.push_str("@keyframes ");
            out.push_str(name);
        }
        RuleKind::FontFace { .. } => out.push_str("@font-face"),
        RuleKind::Unknown { name, prelude, .. } => {
            out.push('@');
            out.push_str(name);
            if !prelude.is_empty() {
                out.push(' ');
                out.push_str(prelude);
            }
        }
    }

    out.push_str(" {");
    let inner_start = out.len();
    write_body(out, rule, spans);
    let inner_end = out.len();
    out.push('}');

    spans[slot] = Span {
        outer: SourceRange::new(start, out.len()),
        inner: SourceRange::new(inner_start, inner_end),
    };
}

fn write_body(out: &mut String, rule: &CssRule, spans: &mut Vec<Span>) {
    if let Some(style) = rule.declarations() {
        out.push_str(&declarations_body(style));
    } else if let Some(rules) = rule.rules() {
        out.push(' ');
        write_rules(out, rules, spans);
        if !rules.is_empty() {
            out.push(' ');
        }
    }
}

fn stamp_rules(rules: &mut [CssRule], uri: &str, base: usize, spans: &mut impl Iterator<Item = Span>) {
    for rule in rules {
        if let Some(span) = spans.next() {
            rule.source = Some(
                SourceLocation::new(uri, base + span.outer.start, base + span.outer.end)
                    .with_inner(base + span.inner.start, base + span.inner.end),
            );
        }
        if let Some(children) = rule.rules_mut() {
            stamp_rules(children, uri, base, spans);
        }
    }
}

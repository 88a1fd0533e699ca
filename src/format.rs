//! Response formatting
//!
//! Pure text transforms, kept strictly separate from routing decisions:
//! the router never reads presentational output. `format` turns raw LLM
//! text into display text (markup stripping, bullet hierarchy, decorative
//! marker); `render_for_platform` then applies each platform's dialect
//! and length constraints.

use crate::platform::Platform;
use rand::Rng;

/// Presentation category of a reply, selects the decorative marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Greeting,
    Recommendation,
    FollowUp,
    Goodbye,
    General,
}

/// SMS hard length cap (plain-text single segment)
pub const SMS_MAX_LEN: usize = 160;
const SMS_TRUNCATE_AT: usize = 155;

const GREETING_MARKS: [&str; 4] = ["👋", "😊", "🤖", "✨"];
const GOODBYE_MARKS: [&str; 4] = ["👋", "😊", "🎯", "✨"];

/// Every decorative marker `decorate` may attach; used to keep the
/// transform a fixed point on already-decorated text
const ALL_MARKS: [char; 7] = ['👋', '😊', '🤖', '✨', '💡', '📝', '🎯'];

/// Format raw LLM output into display-ready text
///
/// Strips internal control markers and bold/heading markup, restructures
/// bullets into a two-level hierarchy, collapses whitespace runs, and
/// attaches a decorative marker for the response kind. Presentation only:
/// factual content passes through unaltered, and formatting markup-free
/// text a second time yields the same result.
pub fn format(raw: &str, kind: ResponseKind, model_name: Option<&str>) -> String {
    let cleaned = strip_markup(raw, model_name);
    let structured = restructure_bullets(&cleaned);
    let collapsed = collapse_whitespace(&structured);
    decorate(collapsed, kind)
}

/// Remove control markers and markup the LLM was told not to emit anyway
fn strip_markup(raw: &str, model_name: Option<&str>) -> String {
    let mut text = raw
        .replace("##PROCEED##", "")
        .replace("##HOLD##", "")
        .replace("**", "")
        .replace("##", "");

    // Legacy decoration some prompts produced around the model name
    if let Some(name) = model_name {
        text = text.replace(&format!("🎯 {name} 🎯"), name);
    }

    // Trailing horizontal-rule residue
    let trimmed = text.trim_end();
    let text = trimmed.strip_suffix("--").unwrap_or(trimmed);
    text.trim().to_string()
}

/// Normalize heterogeneous bullets into a two-level hierarchy
///
/// A bulleted segment ending in a colon opens a group: the segments that
/// follow become indented `◦` sub-bullets until the next colon-terminated
/// segment. Text before the first bullet stays a plain paragraph.
fn restructure_bullets(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_group = false;

    for line in text.lines() {
        if !line.contains('•') && !line.contains('◦') {
            if !line.trim().is_empty() {
                in_group = false;
            }
            out.push(line.trim_end().to_string());
            continue;
        }

        let mut pieces = line.split(['•', '◦']);
        let lead = pieces.next().unwrap_or("").trim();
        if !lead.is_empty() {
            in_group = false;
            out.push(lead.to_string());
        }
        for piece in pieces {
            let item = piece.trim();
            if item.is_empty() {
                continue;
            }
            if item.ends_with(':') {
                out.push(String::new());
                out.push(format!("• {item}"));
                in_group = true;
            } else if in_group {
                out.push(format!("  ◦ {item}"));
            } else {
                out.push(format!("• {item}"));
            }
        }
    }

    out.join("\n")
}

/// Collapse runs of spaces within lines and runs of blank lines
fn collapse_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_pending = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            blank_pending = !lines.is_empty();
            continue;
        }
        if blank_pending {
            lines.push(String::new());
            blank_pending = false;
        }
        let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.starts_with('◦') {
            lines.push(format!("  {collapsed}"));
        } else {
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

fn starts_with_mark(text: &str) -> bool {
    text.chars().next().is_some_and(|c| ALL_MARKS.contains(&c))
}

fn ends_with_mark(text: &str) -> bool {
    text.chars().last().is_some_and(|c| ALL_MARKS.contains(&c))
}

fn pick(marks: &[&'static str]) -> &'static str {
    let idx = rand::rng().random_range(0..marks.len());
    marks[idx]
}

/// Attach the decorative marker for the response kind
///
/// Already-decorated text is left alone, keeping `format` a fixed point.
fn decorate(text: String, kind: ResponseKind) -> String {
    match kind {
        ResponseKind::Greeting if !starts_with_mark(&text) => {
            format!("{} {}", pick(&GREETING_MARKS), text)
        }
        ResponseKind::Recommendation if !starts_with_mark(&text) => format!("💡 {text}"),
        ResponseKind::FollowUp if !starts_with_mark(&text) => format!("📝 {text}"),
        ResponseKind::Goodbye if !ends_with_mark(&text) => {
            format!("{} {}", text, pick(&GOODBYE_MARKS))
        }
        _ => text,
    }
}

/// Render display text under a platform's formatting constraints
pub fn render_for_platform(text: &str, platform: Platform) -> String {
    match platform {
        Platform::Web => text.to_string(),
        Platform::WhatsApp => text.replace("***", "*"),
        Platform::Telegram => telegram_html(text),
        Platform::Sms => sms_plain(text),
    }
}

/// Convert `***emphasis***` pairs into Telegram HTML bold-italic
fn telegram_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open = false;
    let mut rest = text;
    while let Some(pos) = rest.find("***") {
        out.push_str(&rest[..pos]);
        out.push_str(if open { "</i></b>" } else { "<b><i>" });
        open = !open;
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    if open {
        // Unbalanced marker: close the tag rather than emit broken HTML
        out.push_str("</i></b>");
    }
    out
}

/// Plain text, no emoji, dash bullets, hard length cap
fn sms_plain(text: &str) -> String {
    let stripped: String = text
        .replace("***", "")
        .chars()
        .filter_map(|c| match c {
            '•' | '◦' => Some('-'),
            '✨' | '⚠' | '\u{fe0f}' => None,
            c if (c as u32) >= 0x1F000 => None,
            c => Some(c),
        })
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= SMS_MAX_LEN {
        collapsed
    } else {
        let head: String = collapsed.chars().take(SMS_TRUNCATE_AT).collect();
        format!("{head}...")
    }
}

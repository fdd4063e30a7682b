//! Conversion of a Markdown subset to Slack `mrkdwn` formatting.
//!
//! The model answers in standard Markdown; Slack uses its own markup
//! (`*bold*`, `_italic_`, `<url|title>` links). This module rewrites the
//! common constructs and leaves code block contents untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)`{3,}([^\n`]*)\n(.*?)`{3,}").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.*)$").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\*\*(.+?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\*([^*]+?)\*").unwrap());
static STRIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)~~(.+?)~~").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^( *)- (.*)$").unwrap());
static STRONG_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@@STRONG(\d+)@@").unwrap());
static CODE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@@CODEBLOCK(\d+)@@").unwrap());

/// Convert Markdown to Slack `mrkdwn`.
///
/// Code blocks are extracted first and reinserted verbatim at the end (minus
/// any language spec on the opening fence). Bold spans and headings are held
/// as tokens while single-star italics are rewritten, since both render as
/// `*text*` in Slack and would otherwise be mangled by the italic pass.
pub fn markdown_to_mrkdwn(text: &str) -> String {
    // Pull out code blocks so no further transformation touches them.
    let mut code_blocks: Vec<String> = Vec::new();
    let text = CODE_BLOCK.replace_all(text, |caps: &Captures| {
        code_blocks.push(caps[2].to_string());
        format!("@@CODEBLOCK{}@@", code_blocks.len() - 1)
    });

    // Headings become bold lines; nested `**` inside a heading is dropped.
    let mut strong_spans: Vec<String> = Vec::new();
    let text = HEADING.replace_all(&text, |caps: &Captures| {
        strong_spans.push(caps[1].trim().replace("**", ""));
        format!("@@STRONG{}@@", strong_spans.len() - 1)
    });

    let text = BOLD.replace_all(&text, |caps: &Captures| {
        strong_spans.push(caps[1].to_string());
        format!("@@STRONG{}@@", strong_spans.len() - 1)
    });

    let text = ITALIC.replace_all(&text, "_${1}_");
    let text = STRIKE.replace_all(&text, "~$1~");
    let text = LINK.replace_all(&text, "<$2|$1>");

    // `- item` lists become bullet lines; each 2 leading spaces nest one tab.
    let text = BULLET.replace_all(&text, |caps: &Captures| {
        let depth = caps[1].len() / 2;
        let bullet = if depth == 0 { "•" } else { "◦" };
        format!("{}{} {}", "\t".repeat(depth), bullet, &caps[2])
    });

    // The input itself can contain token-shaped text; anything that does not
    // resolve to a span we extracted above is passed through verbatim.
    let text = STRONG_TOKEN.replace_all(&text, |caps: &Captures| {
        match caps[1].parse::<usize>().ok().and_then(|idx| strong_spans.get(idx)) {
            Some(span) => format!("*{span}*"),
            None => caps[0].to_string(),
        }
    });

    CODE_TOKEN
        .replace_all(&text, |caps: &Captures| {
            match caps[1].parse::<usize>().ok().and_then(|idx| code_blocks.get(idx)) {
                Some(block) => format!("```\n{block}```"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

//! Jira wiki markup to chat markdown.
//!
//! Rules run in a fixed order over the whole string; later rules see the
//! output of earlier ones.

use crate::models::ThumbnailSource;
use regex::{Captures, Regex};
use std::sync::OnceLock;

const CAMERA: &str = ":camera:";

struct Rules {
    heading: Regex,
    strikethrough: Regex,
    inline_code: Regex,
    code_block: Regex,
    quote_block: Regex,
    link: Regex,
    color: Regex,
    superscript: Regex,
    plus: Regex,
    thumbnail: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| {
        let compile = |pattern: &str| Regex::new(pattern).expect("markup pattern must compile");
        Rules {
            heading: compile(r"(?m)^h\d\.[ \t]([^\n]+)"),
            // Inner edges must be non-blank so "a - b - c" and bullet lists survive.
            strikethrough: compile(r"\B-([^-\s](?:[^-\n]*[^-\s])?)-\B"),
            inline_code: compile(r"\B\{\{(.+?)\}\}\B"),
            code_block: compile(r"(?s)\{code(?::[^}]*)?\}\n?(.*?)\n?\{code\}"),
            quote_block: compile(r"(?s)\{quote\}\n?(.*?)\n?\{quote\}"),
            link: compile(r"\[([^\[\]|\n]+)\|([^\]\n]+)\]"),
            color: compile(r"(?s)\{color:#[^}]+\}(.*?)\{color\}"),
            superscript: compile(r"\B\^([^\^\s](?:[^\^\n]*[^\^\s])?)\^\B"),
            plus: compile(r"\B\+([^\+\s](?:[^\+\n]*[^\+\s])?)\+\B"),
            thumbnail: compile(r"!([^|!\n]+)\|thumbnail!"),
        }
    })
}

/// Converts a Jira body into chat markdown. `attachments` resolves
/// `!file|thumbnail!` references to their thumbnail URLs.
pub fn translate(body: Option<&str>, attachments: Option<&[ThumbnailSource]>) -> String {
    let body = match body {
        Some(body) if !body.is_empty() => body,
        _ => return String::new(),
    };
    let rules = rules();

    let text = rules
        .heading
        .replace_all(body, |caps: &Captures| format!("*{}*", caps[1].trim()));
    let text = rules.strikethrough.replace_all(&text, "~${1}~");
    let text = rules.inline_code.replace_all(&text, "`${1}`");
    let text = rules.code_block.replace_all(&text, "```\n${1}\n```");
    let text = rules.quote_block.replace_all(&text, "```\n${1}\n```");
    let text = rules.link.replace_all(&text, "[${1}](${2})");
    let text = rules.color.replace_all(&text, "${1}");
    let text = rules.superscript.replace_all(&text, "${1}");
    let text = rules.plus.replace_all(&text, "${1}");
    let text = rules.thumbnail.replace_all(&text, |caps: &Captures| {
        thumbnail_link(&caps[1], attachments)
    });

    text.into_owned()
}

fn thumbnail_link(filename: &str, attachments: Option<&[ThumbnailSource]>) -> String {
    attachments
        .and_then(|list| list.iter().find(|a| a.filename == filename))
        .map(|a| format!("[{}]({})", CAMERA, a.thumbnail))
        .unwrap_or_else(|| CAMERA.to_string())
}

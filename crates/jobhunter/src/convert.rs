//! Text and markup conversion utilities

use pulldown_cmark::{html, Options, Parser};

/// Normalize extracted page text
///
/// Splits into lines, trims each line, drops empty lines and joins the
/// rest with `\n`. Applying it twice yields the same result.
pub fn clean_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to at most `max_chars` characters without splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Strip a surrounding Markdown code fence from model output
///
/// Handles ```` ```json ````, ```` ```markdown ```` and bare fences. Text
/// without a leading fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the info string (language tag) on the opening line
    let body = match rest.find('\n') {
        Some(newline) if !rest[..newline].contains(char::is_whitespace) => &rest[newline + 1..],
        Some(_) | None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or_else(|| body.trim())
}

/// Convert Markdown to an HTML fragment
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

//! Notification rendering to Telegram HTML.

use anifeed_core::activity::Notification;

/// Telegram's caption limit for `sendPhoto`.
pub(crate) const CAPTION_LIMIT: usize = 1024;

/// Telegram's text limit for `sendMessage`.
pub(crate) const MESSAGE_LIMIT: usize = 4096;

/// Escape text for Telegram's HTML parse mode.
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the HTML body of an activity notification.
///
/// The note is the only free-form field; it is shortened so the whole body
/// fits inside a photo caption.
pub(crate) fn render_notification(n: &Notification) -> String {
    let handle = escape_html(&n.account_handle);
    let title = escape_html(&n.media_title);
    let linked_title = match &n.media_url {
        Some(url) => format!("<a href=\"{}\">{title}</a>", escape_html(url)),
        None => title,
    };

    let mut lines = vec![
        format!(
            "<b><a href=\"{}\">{handle}</a>'s activity</b>",
            escape_html(&n.account_url)
        ),
        format!("{} <b>{linked_title}</b>", escape_html(&n.headline())),
    ];
    if let Some(score) = n.score {
        lines.push(format!("Score: {}/10", format_score(score)));
    }
    if let Some(repeat) = n.repeat_count {
        lines.push(format!("Rewatched: {repeat}x"));
    }
    let footer = format!(
        "<i>From AniList · {}</i>",
        n.created_at.format("%Y-%m-%d %H:%M UTC")
    );

    let fixed_len: usize = lines.iter().map(|l| l.chars().count() + 1).sum::<usize>()
        + footer.chars().count();
    if let Some(note) = &n.note {
        let budget = CAPTION_LIMIT.saturating_sub(fixed_len + 16);
        let note = truncate_chars(note.trim(), budget);
        if !note.is_empty() {
            lines.push(format!("<i>Note:</i> {}", escape_html(&note)));
        }
    }
    lines.push(footer);
    lines.join("\n")
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score:.1}")
    }
}

/// Shorten to at most `max` characters, marking the cut with an ellipsis.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Split text into chunks of at most `max_len` bytes, preferring newline
/// boundaries and never cutting a UTF-8 character.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}

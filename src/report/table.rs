//! Terminal table rendering for the cached feed.
//!
//! One line per item in cached order: position, id, location, url.
//! Missing optional fields show as `-`.

use std::borrow::Cow;

use crate::feed::CachedFeed;

pub fn render(feed: &CachedFeed) -> String {
    let (items, timestamp) = match feed {
        CachedFeed::Empty => return String::from("Cache is empty.\n"),
        CachedFeed::Found { items, timestamp } => (items, timestamp),
    };

    let mut output = String::new();

    output.push_str(&format!(
        "cached at {} ({} items)\n",
        timestamp.format("%Y-%m-%d %H:%M:%S%.f UTC"),
        items.len()
    ));
    output.push_str(&"-".repeat(100));
    output.push('\n');

    for (position, item) in items.iter().enumerate() {
        output.push_str(&format!(
            "{:>4}  {}  {:20}  {}\n",
            position,
            item.id,
            clip(item.location.as_deref().unwrap_or("-"), 20),
            item.url
        ));

        if let Some(description) = item.description.as_deref().filter(|d| !d.is_empty()) {
            output.push_str(&format!("      {}\n", clip(description, 90)));
        }
    }

    output
}

/// Cut `text` to at most `width` characters, marking the cut with `…`.
fn clip(text: &str, width: usize) -> Cow<'_, str> {
    if text.char_indices().nth(width).is_none() {
        return Cow::Borrowed(text);
    }
    let end = text
        .char_indices()
        .nth(width.saturating_sub(1))
        .map_or(text.len(), |(index, _)| index);
    Cow::Owned(format!("{}…", &text[..end]))
}

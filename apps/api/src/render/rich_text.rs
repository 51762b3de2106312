use serde::Serialize;

/// One line of free text after bullet detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "lowercase")]
pub enum RichLine {
    Bullet(String),
    Plain(String),
}

const BULLET_MARKERS: [char; 3] = ['•', '-', '*'];

fn is_bullet(line: &str) -> bool {
    line.trim_start().starts_with(BULLET_MARKERS)
}

/// Splits text into lines. When any line starts with a bullet marker the text is
/// treated as a list: markers are stripped and blank items dropped. Otherwise the
/// whole text is one plain line with its line breaks kept.
pub fn parse_rich_text(text: &str) -> Vec<RichLine> {
    if text.trim().is_empty() {
        return vec![];
    }
    if !text.lines().any(is_bullet) {
        return vec![RichLine::Plain(text.trim().to_string())];
    }

    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if is_bullet(trimmed) {
                let content = trimmed.trim_start_matches(BULLET_MARKERS).trim_start();
                (!content.is_empty()).then(|| RichLine::Bullet(content.to_string()))
            } else {
                (!trimmed.is_empty()).then(|| RichLine::Plain(trimmed.to_string()))
            }
        })
        .collect()
}

//! Bullet and numbered list continuation for note text.

const BULLET: &str = "- ";
const STRIKE: &str = "~~";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListItem {
    Bullet,
    Numbered(u64),
}

/// Classifies one line. A numbered prefix that does not fit in a `u64` is
/// treated as plain text.
pub fn list_item_kind(line: &str) -> Option<ListItem> {
    if line.starts_with(BULLET) {
        return Some(ListItem::Bullet);
    }
    let (head, _) = line.split_once(". ")?;
    if head.is_empty() || !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse::<u64>().ok().map(ListItem::Numbered)
}

/// Rewrites every empty line that follows a list item into the next marker
/// of that list.
pub fn continue_list(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 2 {
        return text.to_string();
    }

    let mut state: Option<ListItem> = None;
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for line in lines {
        if line.is_empty() {
            match state {
                Some(ListItem::Bullet) => out.push(BULLET.to_string()),
                Some(ListItem::Numbered(n)) => {
                    let next = n.saturating_add(1);
                    out.push(format!("{next}. "));
                    state = Some(ListItem::Numbered(next));
                }
                None => out.push(String::new()),
            }
            continue;
        }
        state = list_item_kind(line);
        out.push(line.to_string());
    }

    out.join("\n")
}

/// Wraps every list item line in strikethrough markers.
pub fn strike_completed(text: &str) -> String {
    text.split('\n')
        .map(|line| match list_item_kind(line) {
            // Struck lines start with the marker, so they are never list items again.
            Some(_) => format!("{STRIKE}{line}{STRIKE}"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

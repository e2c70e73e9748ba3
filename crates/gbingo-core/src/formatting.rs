//! Formatting utilities (Telegram HTML text for draws, history and reports).

use std::collections::BTreeMap;

use crate::game::{Number, Position};

pub const HISTORY_HEADER: &str = "📜 Drawn numbers:";
pub const ROW_SEPARATOR: &str = "\n--------\n";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render one row of numbers: `3; 17; 42`.
pub fn format_row(row: &[Number]) -> String {
    row.iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn format_rows(rows: &[Vec<Number>]) -> String {
    rows.iter()
        .map(|r| format_row(r))
        .collect::<Vec<_>>()
        .join(ROW_SEPARATOR)
}

/// Message announcing a fresh draw.
pub fn draw_text(rows: &[Vec<Number>]) -> String {
    let n = rows.len();
    let noun = if n == 1 { "row" } else { "rows" };
    format!("Opened {n} {noun}:\n\n{}", format_rows(rows))
}

/// Full history board text, trimmed from the oldest side to fit `limit` bytes.
///
/// Dropped rows are announced right below the header; row numbering used by
/// search is not affected.
pub fn history_text(rows: &[Vec<Number>], limit: usize) -> String {
    let lines: Vec<String> = rows.iter().map(|r| format_row(r)).collect();
    if lines.is_empty() {
        return HISTORY_HEADER.to_string();
    }

    let full_len = HISTORY_HEADER.len()
        + 1
        + lines.iter().map(|l| l.len()).sum::<usize>()
        + ROW_SEPARATOR.len() * (lines.len() - 1);
    if full_len <= limit {
        return format!("{HISTORY_HEADER}\n{}", lines.join(ROW_SEPARATOR));
    }

    // Walk back from the newest row while the tail still fits.
    let mut start = lines.len();
    let mut used = 0usize;
    while start > 0 {
        let add = lines[start - 1].len()
            + if start == lines.len() {
                0
            } else {
                ROW_SEPARATOR.len()
            };
        let omitted = start - 1;
        let notice = if omitted > 0 {
            omitted_notice(omitted).len() + 1
        } else {
            0
        };
        if HISTORY_HEADER.len() + 1 + notice + used + add > limit {
            break;
        }
        used += add;
        start -= 1;
    }

    let notice = omitted_notice(start);
    if start == lines.len() {
        return format!("{HISTORY_HEADER}\n{notice}");
    }
    format!(
        "{HISTORY_HEADER}\n{notice}\n{}",
        lines[start..].join(ROW_SEPARATOR)
    )
}

fn omitted_notice(rows: usize) -> String {
    let noun = if rows == 1 { "row" } else { "rows" };
    format!("… {rows} earlier {noun} not shown")
}

pub fn search_text(target: Number, hits: &[Position]) -> String {
    if hits.is_empty() {
        return format!("❌ Number {target} has not been drawn yet.");
    }
    let lines = hits
        .iter()
        .map(|p| format!("Row {}, position {}", p.row, p.position))
        .collect::<Vec<_>>()
        .join("\n");
    format!("🔎 Number {target} was drawn:\n{lines}")
}

pub fn frequency_text(freq: &BTreeMap<Number, usize>) -> String {
    let lines = freq
        .iter()
        .map(|(n, c)| format!("{n}: {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("📊 Draw frequency:\n{lines}")
}

/// Split plain text into chunks of at most `limit` bytes, preferring line
/// boundaries.
pub fn split_text_chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut chunk = String::new();
    for line in text.split('\n') {
        let needed = if chunk.is_empty() {
            line.len()
        } else {
            chunk.len() + 1 + line.len()
        };
        if needed <= limit {
            if !chunk.is_empty() {
                chunk.push('\n');
            }
            chunk.push_str(line);
            continue;
        }

        if !chunk.is_empty() {
            out.push(std::mem::take(&mut chunk));
        }
        let mut rest = line;
        while rest.len() > limit {
            let (head, tail) = split_utf8_prefix(rest, limit);
            out.push(head.to_string());
            rest = tail;
        }
        chunk.push_str(rest);
    }
    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}

fn split_utf8_prefix(s: &str, max_bytes: usize) -> (&str, &str) {
    let mut idx = max_bytes.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    if idx == 0 {
        // Avoid an empty head (and an endless loop) on a single wide char.
        idx = s.char_indices().nth(1).map(|(i, _)| i).unwrap_or(s.len());
    }
    s.split_at(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn rows_use_semicolons_and_dashed_separators() {
        let rows = vec![vec![1, 2, 3], vec![4]];
        assert_eq!(format_rows(&rows), "1; 2; 3\n--------\n4");
    }

    #[test]
    fn draw_text_counts_rows() {
        assert_eq!(draw_text(&[vec![5, 6]]), "Opened 1 row:\n\n5; 6");
        assert!(draw_text(&[vec![1], vec![2]]).starts_with("Opened 2 rows:"));
    }

    #[test]
    fn empty_history_is_just_the_header() {
        assert_eq!(history_text(&[], 4096), HISTORY_HEADER);
    }

    #[test]
    fn short_history_is_rendered_in_full() {
        let text = history_text(&[vec![1, 2], vec![3]], 4096);
        assert_eq!(text, format!("{HISTORY_HEADER}\n1; 2\n--------\n3"));
    }

    #[test]
    fn long_history_drops_oldest_rows() {
        let rows: Vec<Vec<Number>> = (1..=200).map(|n| vec![n; 10]).collect();
        let text = history_text(&rows, 500);
        assert!(text.len() <= 500, "len {}", text.len());
        assert!(text.starts_with(HISTORY_HEADER));
        assert!(text.contains("earlier rows not shown"));
        assert!(text.ends_with(&format_row(&[200; 10])));
        assert!(!text.contains(&format_row(&[1; 10])));
    }

    #[test]
    fn search_text_hit_and_miss() {
        let hits = [
            Position { row: 1, position: 2 },
            Position { row: 4, position: 1 },
        ];
        assert_eq!(
            search_text(9, &hits),
            "🔎 Number 9 was drawn:\nRow 1, position 2\nRow 4, position 1"
        );
        assert_eq!(search_text(9, &[]), "❌ Number 9 has not been drawn yet.");
    }

    #[test]
    fn frequency_text_lists_values_in_order() {
        let freq: BTreeMap<Number, usize> = [(2, 1), (1, 2)].into_iter().collect();
        assert_eq!(frequency_text(&freq), "📊 Draw frequency:\n1: 2\n2: 1");
    }

    #[test]
    fn split_prefers_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_text_chunks(text, 9), vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn split_breaks_overlong_lines_on_char_boundaries() {
        let text = "ééééé";
        let chunks = split_text_chunks(text, 3);
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(chunks.concat(), text);
    }
}

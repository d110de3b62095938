//! Text layout for the answer overlay
//!
//! The overlay sizes itself from its content before the window is
//! realised, so wrapping has to be computed here rather than read back
//! from the control. The model is a fixed-pitch estimate: one column
//! per character at roughly 8 px, word wrap with hard breaks for runs
//! longer than a line (CJK answers arrive without spaces).

/// Pixel padding on every side of the answer text.
pub const PADDING: i32 = 12;

/// Row advance of the answer font, including leading.
pub const LINE_HEIGHT: i32 = 20;

/// Character columns available at the given overlay width.
pub fn columns_for_width(width: i32) -> usize {
    (width / 8).max(20) as usize
}

/// Height in pixels the wrapped text needs at the given overlay width.
pub fn content_height(text: &str, width: i32) -> i32 {
    let lines = wrap_text(text, columns_for_width(width));
    lines.len() as i32 * LINE_HEIGHT + PADDING * 2
}

/// Greedy word wrap. Explicit newlines are kept, blank lines survive as
/// empty rows, and a single word wider than `columns` is broken at the
/// column boundary.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut rows = Vec::new();

    for raw in text.split('\n') {
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() {
            rows.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;
        for word in raw.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 {
                if current_len + 1 + word_len <= columns {
                    current.push(' ');
                    current.push_str(word);
                    current_len += 1 + word_len;
                    continue;
                }
                rows.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if word_len <= columns {
                current.push_str(word);
                current_len = word_len;
            } else {
                let (rest, rest_len) = break_word(word, columns, &mut rows);
                current = rest;
                current_len = rest_len;
            }
        }
        if current_len > 0 {
            rows.push(current);
        }
    }

    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

/// Pushes full-width slices of `word` and returns the remainder.
fn break_word(word: &str, columns: usize, rows: &mut Vec<String>) -> (String, usize) {
    let chars: Vec<char> = word.chars().collect();
    let mut start = 0;
    while chars.len() - start > columns {
        rows.push(chars[start..start + columns].iter().collect());
        start += columns;
    }
    let rest: String = chars[start..].iter().collect();
    let rest_len = chars.len() - start;
    (rest, rest_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_row() {
        assert_eq!(wrap_text("hello world", 40), vec!["hello world"]);
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let rows = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(rows, vec!["alpha beta", "gamma delta"]);
        for row in &rows {
            assert!(row.chars().count() <= 11);
        }
    }

    #[test]
    fn breaks_unspaced_runs_at_column_width() {
        let rows = wrap_text("aaaaabbbbbccccc", 5);
        assert_eq!(rows, vec!["aaaaa", "bbbbb", "ccccc"]);
    }

    #[test]
    fn cjk_counts_characters_not_bytes() {
        let rows = wrap_text("这是一段没有空格的中文回答", 4);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], "这是一段");
        assert_eq!(rows[3], "答");
    }

    #[test]
    fn keeps_blank_lines() {
        let rows = wrap_text("first\n\nsecond", 40);
        assert_eq!(rows, vec!["first", "", "second"]);
    }

    #[test]
    fn empty_text_still_occupies_a_row() {
        assert_eq!(wrap_text("", 40), vec![""]);
        assert_eq!(content_height("", 420), LINE_HEIGHT + PADDING * 2);
    }

    #[test]
    fn columns_floor_at_twenty() {
        assert_eq!(columns_for_width(420), 52);
        assert_eq!(columns_for_width(120), 20);
        assert_eq!(columns_for_width(0), 20);
    }

    #[test]
    fn taller_content_for_longer_text() {
        let short = content_height("one line", 420);
        let long = content_height(&"word ".repeat(200), 420);
        assert!(long > short);
        assert_eq!(short, LINE_HEIGHT + PADDING * 2);
    }

    #[test]
    fn narrower_width_means_more_rows() {
        let text = "the quick brown fox jumps over the lazy dog";
        assert!(content_height(text, 160) > content_height(text, 420));
    }
}

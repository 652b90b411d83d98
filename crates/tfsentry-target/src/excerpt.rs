use tfsentry_types::{CodeLine, CodeLines};

/// Source lines `start..=end` (1-based) of a scanned file, all marked as the cause.
///
/// Returns `None` when the range is empty or falls outside the file.
pub fn code_excerpt(source: &str, start: u32, end: u32) -> Option<CodeLines> {
    if start == 0 {
        return None;
    }
    let end = end.max(start);

    let lines: Vec<CodeLine> = source
        .lines()
        .enumerate()
        .map(|(idx, text)| (idx as u32 + 1, text))
        .filter(|(number, _)| (start..=end).contains(number))
        .map(|(number, text)| CodeLine {
            number,
            content: text.to_string(),
            is_cause: true,
            annotation: String::new(),
            truncated: false,
            first_cause: number == start,
            last_cause: number == end,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(CodeLines { lines })
    }
}

//! Program text to command lines.

/// Split raw program text into command lines.
///
/// Lines are split on `\n`, `\r\n` and bare `\r`, trimmed, and dropped when
/// nothing remains. Order is preserved.
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

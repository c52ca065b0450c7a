//! Pull ABC notation out of a model response.

const FENCE_OPEN: &str = "```abc";
const FENCE_CLOSE: &str = "```";

/// Body of the first ` ```abc ` block, or the whole message when there is
/// no closed block. Blank lines are dropped and commas inside double
/// quotes removed, since chord symbols like `"C,maj"` confuse ABC tools.
pub fn extract_notation(message: &str) -> String {
    let notation = fenced_block(message).unwrap_or(message);

    let lines: Vec<&str> = notation.lines().filter(|line| !line.trim().is_empty()).collect();
    strip_quoted_commas(&lines.join("\n"))
}

fn fenced_block(message: &str) -> Option<&str> {
    let start = message.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let len = message[start..].find(FENCE_CLOSE)?;
    Some(&message[start..start + len])
}

/// Only closed quote pairs count; a stray trailing quote leaves the rest
/// of the text alone.
fn strip_quoted_commas(text: &str) -> String {
    let parts: Vec<&str> = text.split('"').collect();
    let last = parts.len() - 1;

    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 1 && i < last {
                part.replace(',', "")
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fenced_block() {
        let message = "Here you go:\n```abc\nX:1\n\nK:C\nCDE|\n```\nEnjoy!";
        assert_eq!(extract_notation(message), "X:1\nK:C\nCDE|");
    }

    #[test]
    fn test_first_block_wins() {
        let message = "```abc\nX:1\n```\n```abc\nX:2\n```";
        assert_eq!(extract_notation(message), "X:1");
    }

    #[test]
    fn test_no_fence_uses_whole_message() {
        assert_eq!(extract_notation("X:1\n\n  \nK:C\n"), "X:1\nK:C");
    }

    #[test]
    fn test_unclosed_fence_uses_whole_message() {
        assert_eq!(extract_notation("```abc\nX:1"), "```abc\nX:1");
    }

    #[test]
    fn test_commas_inside_quotes() {
        assert_eq!(extract_notation("\"C,maj\"C, \"G,,7\"G,"), "\"Cmaj\"C, \"G7\"G,");
    }

    #[test]
    fn test_unpaired_quote_keeps_commas() {
        assert_eq!(extract_notation("\"Am\"A, \"D,"), "\"Am\"A, \"D,");
    }
}

//! Search-result context snippets

/// Characters kept on each side of the match
pub const CONTEXT_RADIUS: usize = 100;
/// Characters kept when the query does not occur in the content
pub const FALLBACK_CHARS: usize = 200;
const ELLIPSIS: &str = "...";

/// Text around the first case-insensitive occurrence of `query` in `content`.
///
/// The window starts up to 100 characters before the match and ends 100
/// characters after the match start, with `...` on each truncated side.
/// A title-only hit has no offset in the content, so the first 200
/// characters are returned followed by `...`.
pub fn match_context(content: &str, query: &str) -> String {
    let chars: Vec<char> = content.chars().collect();

    let Some(pos) = match_offset(content, query) else {
        let head: String = chars.iter().take(FALLBACK_CHARS).collect();
        return format!("{}{}", head, ELLIPSIS);
    };

    let start = pos.saturating_sub(CONTEXT_RADIUS);
    let end = (pos + CONTEXT_RADIUS).min(chars.len());

    let mut context = String::new();
    if start > 0 {
        context.push_str(ELLIPSIS);
    }
    context.extend(&chars[start..end]);
    if end < chars.len() {
        context.push_str(ELLIPSIS);
    }
    context
}

/// Character offset of the first case-insensitive match
fn match_offset(content: &str, query: &str) -> Option<usize> {
    if query.is_empty() {
        return None;
    }
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    let hay: Vec<char> = content.chars().collect();

    (0..hay.len()).find(|&i| {
        let mut folded = hay[i..].iter().flat_map(|c| c.to_lowercase());
        needle.iter().all(|n| folded.next() == Some(*n))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_in_the_middle() {
        let content = format!("{}Polymer{}", "a".repeat(150), "b".repeat(150));
        let context = match_context(&content, "polymer");

        assert!(context.starts_with("..."));
        assert!(context.ends_with("..."));
        let inner = &context[3..context.len() - 3];
        assert_eq!(inner.chars().count(), 200);
        assert!(inner.contains("Polymer"));
    }

    #[test]
    fn test_match_near_start_has_no_leading_marker() {
        let context = match_context("Graphene lattice with a short body", "GRAPHENE");
        assert_eq!(context, "Graphene lattice with a short body");
    }

    #[test]
    fn test_title_only_hit_falls_back_to_head() {
        let content = "z".repeat(250);
        let context = match_context(&content, "missing");
        assert_eq!(context, format!("{}...", "z".repeat(200)));

        assert_eq!(match_context("short", "missing"), "short...");
    }

    #[test]
    fn test_multibyte_content_is_sliced_on_char_boundaries() {
        let content = format!("{}Ünïcode{}", "é".repeat(120), "ø".repeat(120));
        let context = match_context(&content, "ünïcode");
        assert!(context.contains("Ünïcode"));
        assert!(context.starts_with("...") && context.ends_with("..."));
    }
}

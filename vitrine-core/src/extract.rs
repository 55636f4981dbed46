//! Extraction layer: finds tagged fenced code blocks in assistant text.
//!
//! The chat layer hands over whole assistant messages; artifacts are the
//! fenced blocks opened with the artifact language identifier. Extraction
//! has no opinion on how the text was produced; an unterminated trailing
//! fence (mid-stream output) simply does not match yet.

use once_cell::sync::Lazy;
use regex::Regex;

/// Language identifier that marks a fenced block as an artifact.
pub const DEFAULT_ARTIFACT_TAG: &str = "artifact";

/// Raw text of one fenced code block tagged as an artifact. Owned and
/// passed by value across the bridge, never by shared reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub code: String,
}

static DEFAULT_FENCE: Lazy<Regex> = Lazy::new(|| fence_regex(DEFAULT_ARTIFACT_TAG));

fn fence_regex(tag: &str) -> Regex {
    // Opening fence with the tag on its own line, then everything up to a
    // closing fence on its own line.
    Regex::new(&format!(
        r"(?ms)^```{}[ \t]*\r?\n(.*?)^```[ \t]*\r?$",
        regex::escape(tag)
    ))
    .expect("fence pattern is valid")
}

/// Every artifact block in `text`, in document order.
pub fn extract_artifacts(text: &str, tag: &str) -> Vec<ArtifactSource> {
    let custom;
    let fence = if tag == DEFAULT_ARTIFACT_TAG {
        &*DEFAULT_FENCE
    } else {
        custom = fence_regex(tag);
        &custom
    };
    fence
        .captures_iter(text)
        .map(|captures| ArtifactSource {
            code: captures[1]
                .strip_suffix('\n')
                .map(|s| s.strip_suffix('\r').unwrap_or(s))
                .unwrap_or(&captures[1])
                .to_string(),
        })
        .collect()
}

/// [`extract_artifacts`] with the default tag.
pub fn extract_default(text: &str) -> Vec<ArtifactSource> {
    extract_artifacts(text, DEFAULT_ARTIFACT_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_a_tagged_block_between_prose() {
        let text = "Here you go:\n\n```artifact\nreturn <text>hey</text>\n```\n\nEnjoy!";
        let found = extract_default(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "return <text>hey</text>");
    }

    #[test]
    fn preserves_document_order_for_multiple_blocks() {
        let text = "```artifact\nfirst\n```\nmiddle\n```artifact\nsecond\n```\n";
        let codes: Vec<String> = extract_default(text).into_iter().map(|a| a.code).collect();
        assert_eq!(codes, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn ignores_other_fence_languages() {
        let text = "```lua\nreturn 1\n```\n";
        assert!(extract_default(text).is_empty());
        assert_eq!(extract_artifacts(text, "lua").len(), 1);
    }

    #[test]
    fn ignores_unterminated_trailing_fences() {
        let text = "streaming...\n```artifact\nreturn <text>partial";
        assert!(extract_default(text).is_empty());
    }

    #[test]
    fn handles_crlf_fences() {
        let text = "```artifact\r\nreturn 1\r\n```\r\n";
        let found = extract_default(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "return 1");
    }
}

//! Markdown scanning for rive blocks
//!
//! Walks a note's markdown and returns every fenced code block tagged `rive`,
//! with its raw text, byte range and ordinal position. Also pulls
//! `rive.`-prefixed frontmatter entries out so they can override block
//! configuration per note.

use std::collections::BTreeMap;
use std::ops::Range;

/// Language tag that marks a fenced block as ours.
pub const BLOCK_LANG: &str = "rive";

/// One fenced ```rive block found in a note.
#[derive(Debug, Clone, PartialEq)]
pub struct RiveBlockSource {
    /// Zero-based position among the note's rive blocks.
    pub ordinal: usize,
    /// Raw text between the fences.
    pub text: String,
    /// Byte range of the whole fenced block in the note source.
    pub range: Range<usize>,
}

/// Scan a note for ```rive blocks, in document order.
pub fn extract_rive_blocks(content: &str) -> Vec<RiveBlockSource> {
    use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

    // Frontmatter enabled so a fence inside it is not mistaken for a block.
    let mut options = Options::empty();
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let parser = Parser::new_ext(content, options);

    let mut blocks = Vec::new();
    let mut block_start = 0;
    let mut in_rive_block = false;
    let mut text = String::new();

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                if is_rive_tag(&lang) {
                    in_rive_block = true;
                    block_start = range.start;
                    text.clear();
                }
            }
            Event::Text(chunk) if in_rive_block => {
                text.push_str(&chunk);
            }
            Event::End(TagEnd::CodeBlock) if in_rive_block => {
                blocks.push(RiveBlockSource {
                    ordinal: blocks.len(),
                    text: std::mem::take(&mut text),
                    range: block_start..range.end,
                });
                in_rive_block = false;
            }
            _ => {}
        }
    }

    blocks
}

/// First token of the fence info string is the language.
fn is_rive_tag(info: &str) -> bool {
    info.split_whitespace()
        .next()
        .map(|tag| tag.eq_ignore_ascii_case(BLOCK_LANG))
        .unwrap_or(false)
}

/// Collect `rive.foo` / `rive-foo` frontmatter entries with the prefix
/// stripped, so the keys line up with block configuration keys.
///
/// Only flat `key: value` lines are recognized; nested YAML is ignored.
pub fn frontmatter_overrides(content: &str) -> BTreeMap<String, String> {
    use pulldown_cmark::{Event, MetadataBlockKind, Options, Parser, Tag, TagEnd};

    let mut options = Options::empty();
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let parser = Parser::new_ext(content, options);

    let mut overrides = BTreeMap::new();
    let mut in_metadata = false;

    for event in parser {
        match event {
            Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)) => {
                in_metadata = true;
            }
            Event::End(TagEnd::MetadataBlock(_)) => break,
            Event::Text(text) if in_metadata => {
                collect_overrides(&text, &mut overrides);
            }
            _ => {}
        }
    }

    overrides
}

fn collect_overrides(text: &str, overrides: &mut BTreeMap<String, String>) {
    let line_re = regex_lite::Regex::new(r"^([\w.-]+)\s*:\s*(.+)$").unwrap();

    for line in text.lines().map(str::trim) {
        let Some(caps) = line_re.captures(line) else {
            continue;
        };
        let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let stripped = key
            .strip_prefix("rive.")
            .or_else(|| key.strip_prefix("rive-"));
        if let Some(stripped) = stripped {
            if !stripped.is_empty() {
                overrides.insert(stripped.to_string(), unquote(value).to_string());
            }
        }
    }
}

/// Strip one layer of matching YAML quotes.
fn unquote(value: &str) -> &str {
    let v = value.trim();
    let bytes = v.as_bytes();
    if v.len() >= 2
        && ((bytes[0] == b'"' && bytes[v.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[v.len() - 1] == b'\''))
    {
        return &v[1..v.len() - 1];
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: &str = "\
# Demo

```rive
src: animations/walk.riv
autoplay: false
```

Some prose in between.

```rust
fn not_ours() {}
```

```rive
other.riv
```
";

    #[test]
    fn finds_rive_blocks_in_document_order() {
        let blocks = extract_rive_blocks(NOTE);
        assert_eq!(blocks.len(), 2);

        assert_eq!(blocks[0].ordinal, 0);
        assert!(blocks[0].text.contains("animations/walk.riv"));
        assert_eq!(blocks[1].ordinal, 1);
        assert_eq!(blocks[1].text.trim(), "other.riv");
    }

    #[test]
    fn ranges_cover_the_whole_fence() {
        let blocks = extract_rive_blocks(NOTE);
        let first = &NOTE[blocks[0].range.clone()];
        assert!(first.starts_with("```rive"));
        assert!(first.trim_end().ends_with("```"));
    }

    #[test]
    fn other_languages_and_indented_code_are_ignored() {
        let blocks = extract_rive_blocks("```rust\nlet x = 1;\n```\n\n    indented code\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn tag_matching_is_case_insensitive_and_ignores_attributes() {
        let blocks = extract_rive_blocks("```Rive autoplay\nsrc: a.riv\n```\n");
        assert_eq!(blocks.len(), 1);

        // `riveish` is a different language.
        let blocks = extract_rive_blocks("```riveish\nsrc: a.riv\n```\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn frontmatter_keys_need_the_prefix() {
        let note = "\
---
title: My note
rive.autoplay: false
rive-assetsBase: \"animations\"
rive.: empty
---

body
";
        let overrides = frontmatter_overrides(note);
        assert_eq!(overrides.get("autoplay").map(String::as_str), Some("false"));
        assert_eq!(
            overrides.get("assetsBase").map(String::as_str),
            Some("animations")
        );
        assert!(!overrides.contains_key("title"));
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn notes_without_frontmatter_have_no_overrides() {
        assert!(frontmatter_overrides("# Just a heading\n").is_empty());
        assert!(frontmatter_overrides("").is_empty());
    }

    #[test]
    fn overrides_feed_straight_into_config_parsing() {
        use crate::core::config::{parse_with_overrides, ConfigDefaults};

        let note = "\
---
rive.autoplay: false
---

```rive
src: a.riv
```
";
        let overrides = frontmatter_overrides(note);
        let blocks = extract_rive_blocks(note);
        let cfg = parse_with_overrides(&blocks[0].text, &overrides, &ConfigDefaults::default());
        assert_eq!(cfg.src, "a.riv");
        assert!(!cfg.autoplay);
    }
}

//! Markdown document parser.

use super::{decode_utf8, DocumentParser};
use crate::error::IngestResult;
use fieldguide_core::Page;
use pulldown_cmark::{Event, Parser, Tag};

/// Parser for Markdown files. The rendered text becomes a single page.
pub struct MarkdownParser {
    /// Whether to keep code fences around code blocks.
    preserve_code_blocks: bool,
}

impl MarkdownParser {
    /// Create a new markdown parser.
    pub fn new() -> Self {
        Self {
            preserve_code_blocks: true,
        }
    }

    /// Extract readable text from markdown.
    fn extract_text(&self, markdown: &str) -> String {
        let mut text = String::new();

        for event in Parser::new(markdown) {
            match event {
                Event::End(Tag::Heading(_, _, _)) | Event::End(Tag::Paragraph) => {
                    text.push_str("\n\n");
                }
                Event::Start(Tag::CodeBlock(_)) if self.preserve_code_blocks => {
                    text.push_str("\n```\n");
                }
                Event::End(Tag::CodeBlock(_)) if self.preserve_code_blocks => {
                    text.push_str("```\n\n");
                }
                Event::End(Tag::List(_)) => text.push('\n'),
                Event::Start(Tag::Item) => text.push_str("- "),
                Event::End(Tag::Item) => text.push('\n'),
                Event::Text(t) => text.push_str(&t),
                Event::Code(code) => {
                    text.push('`');
                    text.push_str(&code);
                    text.push('`');
                }
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                _ => {}
            }
        }

        text.trim().to_string()
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for MarkdownParser {
    fn load_pages(&self, name: &str, bytes: &[u8]) -> IngestResult<Vec<Page>> {
        let content = decode_utf8(name, bytes)?;
        Ok(vec![Page::new(name, 1, self.extract_text(&content))])
    }

    fn extensions(&self) -> &[&str] {
        &["md", "markdown", "mdown", "mkd"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown() {
        let markdown = r#"# Safety Valve

Inspect the valve **monthly**.

## Procedure

```
open drain
```

- Vent the receiver
- Lift the lever
"#;

        let pages = MarkdownParser::new()
            .load_pages("valve.md", markdown.as_bytes())
            .unwrap();

        assert_eq!(pages.len(), 1);
        let text = &pages[0].text;
        assert!(text.starts_with("Safety Valve"));
        assert!(text.contains("Inspect the valve monthly."));
        assert!(text.contains("```\nopen drain\n```"));
        assert!(text.contains("- Vent the receiver"));
        assert!(!text.contains('#'));
    }
}

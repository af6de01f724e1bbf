//! Splitting markdown (and MDX) documents into heading-delimited sections.
//!
//! Only top-level blocks matter: every heading starts a new section and
//! anything before the first heading forms a section of its own. MDX-only
//! constructs (JSX blocks, `import`/`export` statements, `{expression}`
//! paragraphs) and front matter are dropped. Section content is the original
//! markdown source of the kept blocks, so code fences survive verbatim.

use std::collections::HashMap;
use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag};

/// One section of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownSection {
    pub heading: Option<String>,
    pub slug: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading,
    Html,
    FrontMatter,
    Other,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    range: Range<usize>,
    /// Plain text of a heading block.
    title: String,
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

fn top_level_blocks(source: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut depth = 0usize;

    for (event, range) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    let kind = match tag {
                        Tag::Heading { .. } => BlockKind::Heading,
                        Tag::HtmlBlock => BlockKind::Html,
                        Tag::MetadataBlock(_) => BlockKind::FrontMatter,
                        _ => BlockKind::Other,
                    };
                    blocks.push(Block { kind, range, title: String::new() });
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) if depth > 0 => {
                if let Some(block) = blocks.last_mut().filter(|b| b.kind == BlockKind::Heading) {
                    block.title.push_str(&text);
                }
            }
            // Leaf blocks such as thematic breaks.
            _ if depth == 0 => {
                blocks.push(Block { kind: BlockKind::Other, range, title: String::new() });
            }
            _ => {}
        }
    }

    blocks
}

/// `<Component ...>`, `</Component>` or a fragment `<>`.
fn is_jsx(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('<') else {
        return false;
    };
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    rest.chars()
        .next()
        .is_some_and(|c| c == '>' || c.is_ascii_uppercase())
}

fn is_esm(text: &str) -> bool {
    text.starts_with("import ") || text.starts_with("export ")
}

fn is_expression(text: &str) -> bool {
    text.starts_with('{') && text.ends_with('}')
}

impl Block {
    fn source<'s>(&self, source: &'s str) -> &'s str {
        source[self.range.clone()]
            .trim_start_matches(['\n', '\r'])
            .trim_end()
    }

    fn is_dropped(&self, text: &str) -> bool {
        let trimmed = text.trim_start();
        match self.kind {
            BlockKind::FrontMatter => true,
            BlockKind::Html => is_jsx(trimmed),
            BlockKind::Other => is_esm(trimmed) || is_expression(trimmed),
            BlockKind::Heading => false,
        }
    }
}

/// GitHub-compatible heading slugs, de-duplicated per document.
#[derive(Debug, Default)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    pub fn slug(&mut self, heading: &str) -> String {
        let base = slugify(heading);
        let mut result = base.clone();

        while self.occurrences.contains_key(&result) {
            let count = {
                let n = self.occurrences.entry(base.clone()).or_insert(0);
                *n += 1;
                *n
            };
            result = format!("{base}-{count}");
        }

        self.occurrences.insert(result.clone(), 0);
        result
    }
}

fn slugify(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

struct SectionBuilder<'s> {
    heading: Option<String>,
    slug: Option<String>,
    parts: Vec<&'s str>,
}

impl SectionBuilder<'_> {
    fn finish(self) -> MarkdownSection {
        MarkdownSection { heading: self.heading, slug: self.slug, content: self.parts.join("\n\n") }
    }
}

/// Split `source` into sections. A document with nothing left after MDX
/// removal yields no sections.
pub fn split_sections(source: &str) -> Vec<MarkdownSection> {
    let mut slugger = Slugger::default();
    let mut sections = Vec::new();
    let mut current: Option<SectionBuilder<'_>> = None;

    for block in top_level_blocks(source) {
        let text = block.source(source);
        if text.is_empty() || block.is_dropped(text) {
            continue;
        }

        if block.kind == BlockKind::Heading || current.is_none() {
            if let Some(done) = current.take() {
                sections.push(done.finish());
            }

            let heading = Some(block.title.trim().to_string()).filter(|h| !h.is_empty());
            let slug = heading.as_deref().map(|h| slugger.slug(h));
            current = Some(SectionBuilder { heading, slug, parts: Vec::new() });
        }

        if let Some(section) = current.as_mut() {
            section.parts.push(text);
        }
    }

    sections.extend(current.map(SectionBuilder::finish));
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_every_heading() {
        let doc = "Intro text.\n\n# Getting Started\n\nInstall it.\n\n## Configure\n\n- one\n- two\n";
        let sections = split_sections(doc);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[0].content, "Intro text.");
        assert_eq!(sections[1].heading.as_deref(), Some("Getting Started"));
        assert_eq!(sections[1].slug.as_deref(), Some("getting-started"));
        assert_eq!(sections[1].content, "# Getting Started\n\nInstall it.");
        assert_eq!(sections[2].content, "## Configure\n\n- one\n- two");
    }

    #[test]
    fn duplicate_headings_get_numbered_slugs() {
        let doc = "# Usage\n\na\n\n# Usage\n\nb\n\n# Usage\n\nc\n";
        let slugs: Vec<String> = split_sections(doc).into_iter().filter_map(|s| s.slug).collect();
        assert_eq!(slugs, vec!["usage", "usage-1", "usage-2"]);
    }

    #[test]
    fn mdx_constructs_are_removed() {
        let doc = "import Callout from './callout'\n\n# Title\n\n<Callout type=\"info\">\nhidden\n</Callout>\n\nReal text.\n\n{props.footer}\n";
        let sections = split_sections(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "# Title\n\nReal text.");
    }

    #[test]
    fn plain_html_is_kept() {
        let doc = "# Title\n\n<div align=\"center\">\nlogo\n</div>\n";
        let sections = split_sections(doc);
        assert!(sections[0].content.contains("<div align=\"center\">"));
    }

    #[test]
    fn front_matter_is_dropped() {
        let doc = "---\ntitle: Guide\n---\n\n# Guide\n\nBody.\n";
        let sections = split_sections(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading.as_deref(), Some("Guide"));
    }

    #[test]
    fn code_fences_survive_verbatim() {
        let doc = "# Example\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n";
        let sections = split_sections(doc);
        assert!(sections[0].content.ends_with("```rust\nfn main() {\n    println!(\"hi\");\n}\n```"));
    }

    #[test]
    fn heading_text_includes_inline_code() {
        let sections = split_sections("## The `rank` function\n\ntext\n");
        assert_eq!(sections[0].heading.as_deref(), Some("The rank function"));
        assert_eq!(sections[0].slug.as_deref(), Some("the-rank-function"));
    }

    #[test]
    fn empty_and_mdx_only_documents_have_no_sections() {
        assert!(split_sections("").is_empty());
        assert!(split_sections("  \n\n").is_empty());
        assert!(split_sections("export const meta = {}\n").is_empty());
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("API (v2)!"), "api-v2");
        assert_eq!(slugify("Hello  World"), "hello--world");
        assert_eq!(slugify("snake_case-name"), "snake_case-name");
    }
}

//! Markdown to HTML for gallery READMEs and weblog posts
//!
//! Raw HTML in the source passes through untouched; the files are written
//! by the site owner.

use pulldown_cmark::{html, Options, Parser};

/// Render CommonMark plus tables, footnotes, strikethrough and task lists
pub fn render(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markup() {
        let out = render("# Trip\n\nSome *nice* photos.");
        assert!(out.contains("<h1>Trip</h1>"));
        assert!(out.contains("<em>nice</em>"));
    }

    #[test]
    fn test_extensions_enabled() {
        assert!(render("~~old~~").contains("<del>old</del>"));
        assert!(render("| a | b |\n|---|---|\n| 1 | 2 |").contains("<table>"));
    }

    #[test]
    fn test_fenced_code_keeps_language_class() {
        let out = render("```rust\nfn main() {}\n```");
        assert!(out.contains(r#"<code class="language-rust">"#));
    }
}

use pulldown_cmark::{Options, Parser, html};

/// Render card markup to HTML. Called at response time only; the stored
/// content is never replaced by its rendering.
pub fn markdown_to_html(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

//! Turning a page version into HTML

use lodestar_utils::html::{escape_html, purify_html};
use pulldown_cmark::{Options, Parser, html};

/// Markup a page body is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatting {
	Html,
	RichText,
	Markdown,
	Rst,
}

impl Formatting {
	/// Stored formatting name; anything unknown is treated as HTML
	pub fn from_name(name: &str) -> Self {
		match name {
			"Rich Text" => Self::RichText,
			"Markdown" => Self::Markdown,
			"RST" => Self::Rst,
			_ => Self::Html,
		}
	}
}

/// Render a body; non-raw output is purified
pub fn render(formatting: &str, body: &str, raw: bool) -> String {
	let rendered = match Formatting::from_name(formatting) {
		Formatting::Html | Formatting::RichText => body.to_string(),
		Formatting::Markdown => markdown_to_html(body),
		Formatting::Rst => format!("<pre>{}</pre>", escape_html(body)),
	};
	if raw { rendered } else { purify_html(&rendered) }
}

fn markdown_to_html(body: &str) -> String {
	let mut options = Options::empty();
	options.insert(Options::ENABLE_TABLES);
	options.insert(Options::ENABLE_STRIKETHROUGH);
	let parser = Parser::new_ext(body, options);
	let mut out = String::with_capacity(body.len() * 3 / 2);
	html::push_html(&mut out, parser);
	out
}

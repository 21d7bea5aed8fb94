//! Escaping and purification of stored markup

use std::sync::OnceLock;

/// Escape HTML special characters
///
/// ```
/// use lodestar_utils::html::escape_html;
///
/// assert_eq!(escape_html("<b>\"hi\"</b>"), "&lt;b&gt;&quot;hi&quot;&lt;/b&gt;");
/// ```
pub fn escape_html(input: &str) -> String {
	input
		.replace('&', "&amp;")
		.replace('<', "&lt;")
		.replace('>', "&gt;")
		.replace('"', "&quot;")
		.replace('\'', "&#x27;")
}

/// Elements removed together with everything inside them
const DROPPED_WITH_CONTENT: [&str; 6] = ["script", "style", "iframe", "object", "embed", "applet"];

/// Attributes kept on every allowed element
const GENERIC_ATTRIBUTES: [&str; 3] = ["class", "id", "title"];

/// URL schemes links and images may use; relative URLs always pass
const URL_SCHEMES: [&str; 4] = ["http", "https", "mailto", "tel"];

static CLEANER: OnceLock<ammonia::Builder<'static>> = OnceLock::new();

fn cleaner() -> &'static ammonia::Builder<'static> {
	CLEANER.get_or_init(|| {
		let mut builder = ammonia::Builder::default();
		builder
			.add_clean_content_tags(DROPPED_WITH_CONTENT)
			.add_generic_attributes(GENERIC_ATTRIBUTES)
			.url_schemes(URL_SCHEMES.into_iter().collect())
			.link_rel(None);
		builder
	})
}

/// Remove active content from user-authored HTML
///
/// The input is parsed as an HTML fragment and rebuilt from an allow list:
/// script, style and embedding elements go with their content, unknown
/// elements are unwrapped, event handler attributes are dropped and only
/// `http`, `https`, `mailto`, `tel` and relative URLs survive.
///
/// ```
/// use lodestar_utils::html::purify_html;
///
/// let dirty = r#"<p onclick="steal()">Hi<script>alert(1)</script></p>"#;
/// assert_eq!(purify_html(dirty), "<p>Hi</p>");
/// ```
pub fn purify_html(input: &str) -> String {
	cleaner().clean(input).to_string()
}

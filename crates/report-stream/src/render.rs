//! Markdown to HTML for finished reports.

use pulldown_cmark::{Options, Parser, html};

/// Block elements that get `dir="auto"` so mixed RTL/LTR lines align per line.
const AUTO_DIR_TAGS: [&str; 10] = ["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "th", "td"];

/// Renders report markdown (tables and strikethrough enabled) to an HTML
/// fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    add_auto_dir(&out)
}

/// Wraps a rendered report in a standalone right-to-left HTML document.
pub fn html_document(title: &str, markdown: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html dir=\"rtl\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<article dir=\"rtl\">\n{}</article>\n</body>\n</html>\n",
        escape_text(title),
        markdown_to_html(markdown)
    )
}

fn add_auto_dir(html: &str) -> String {
    let mut out = html.to_string();
    for tag in AUTO_DIR_TAGS {
        out = out
            .replace(&format!("<{tag}>"), &format!("<{tag} dir=\"auto\">"))
            .replace(&format!("<{tag} "), &format!("<{tag} dir=\"auto\" "));
    }
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_paragraphs_get_auto_direction() {
        let html = markdown_to_html("# تحلیل بازار\n\nRent yield is *low*.\n\n- one\n- two\n");
        assert!(html.contains("<h1 dir=\"auto\">تحلیل بازار</h1>"));
        assert!(html.contains("<p dir=\"auto\">Rent yield is <em>low</em>.</p>"));
        assert!(html.contains("<li dir=\"auto\">one</li>"));
        assert!(html.contains("<ul>"));
    }

    #[test]
    fn tables_are_rendered_with_directional_cells() {
        let html = markdown_to_html("| phase | signal |\n|---|:---:|\n| boom | volume |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th dir=\"auto\">phase</th>"));
        assert!(html.contains("<td dir=\"auto\" style=\"text-align: center\">volume</td>"));
        assert!(!html.contains("<thead dir"));
    }

    #[test]
    fn code_blocks_are_left_alone() {
        let html = markdown_to_html("```\n<p>raw</p>\n```\n");
        assert!(html.contains("<pre><code>&lt;p&gt;raw&lt;/p&gt;\n</code></pre>"));
    }

    #[test]
    fn document_escapes_title() {
        let doc = html_document("a < b", "text");
        assert!(doc.contains("<title>a &lt; b</title>"));
        assert!(doc.contains("<p dir=\"auto\">text</p>"));
        assert!(doc.starts_with("<!DOCTYPE html>"));
    }
}

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};

/// Renders the HTML stored in descriptions and comments as plain text lines.
///
/// Block elements start new lines, `<li>` items get a bullet, links keep
/// their target. Runs of whitespace collapse to one space and blank lines
/// never repeat.
pub fn html_to_text(html: &str) -> Vec<String> {
    let document = Html::parse_fragment(html);
    let mut converter = TextConverter::default();
    for node in document.tree.root().children() {
        converter.process_node(node);
    }
    converter.finish()
}

#[derive(Default)]
struct TextConverter {
    lines: Vec<String>,
    current: String,
    list_depth: usize,
    in_pre: bool,
}

impl TextConverter {
    fn add_text(&mut self, text: &str) {
        if self.in_pre {
            for (i, part) in text.split('\n').enumerate() {
                if i > 0 {
                    self.finish_line();
                }
                self.current.push_str(part);
            }
            return;
        }

        let mut words = text.split_whitespace().peekable();
        if words.peek().is_none() {
            if !text.is_empty() && !self.current.is_empty() && !self.current.ends_with(' ') {
                self.current.push(' ');
            }
            return;
        }

        if text.starts_with(char::is_whitespace)
            && !self.current.is_empty()
            && !self.current.ends_with(' ')
        {
            self.current.push(' ');
        }
        let joined = words.collect::<Vec<_>>().join(" ");
        self.current.push_str(&joined);
        if text.ends_with(char::is_whitespace) {
            self.current.push(' ');
        }
    }

    fn finish_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        let line = if self.in_pre {
            line
        } else {
            line.trim_end().to_string()
        };
        if line.is_empty() && self.lines.last().is_none_or(|l| l.is_empty()) {
            return;
        }
        self.lines.push(line);
    }

    fn break_block(&mut self) {
        if !self.current.trim().is_empty() {
            self.finish_line();
        } else {
            self.current.clear();
        }
    }

    fn process_element(&mut self, element: ElementRef) {
        let tag_name = element.value().name();

        let is_block = matches!(
            tag_name,
            "div"
                | "p"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "li"
                | "ul"
                | "ol"
                | "tr"
                | "table"
                | "blockquote"
                | "pre"
        );

        match tag_name {
            "br" => {
                self.finish_line();
                return;
            }
            "script" | "style" => return,
            _ => {}
        }

        if is_block {
            self.break_block();
        }

        match tag_name {
            "li" => {
                let indent = "  ".repeat(self.list_depth.saturating_sub(1));
                self.current.push_str(&indent);
                self.current.push_str("• ");
            }
            "ul" | "ol" => self.list_depth += 1,
            "pre" => self.in_pre = true,
            "td" | "th" if !self.current.trim().is_empty() => {
                self.current.truncate(self.current.trim_end().len());
                self.current.push_str(" | ");
            }
            _ => {}
        }

        for child in element.children() {
            self.process_node(child);
        }

        match tag_name {
            "ul" | "ol" => self.list_depth = self.list_depth.saturating_sub(1),
            "pre" => {
                self.finish_line();
                self.in_pre = false;
            }
            "a" => {
                if let Some(href) = element.value().attr("href") {
                    let text: String = element.text().collect();
                    if !href.is_empty() && text.trim() != href {
                        self.current.push_str(&format!(" ({})", href));
                    }
                }
            }
            "img" => {
                if let Some(alt) = element.value().attr("alt").filter(|a| !a.is_empty()) {
                    self.current.push_str(&format!("[{}]", alt));
                }
            }
            _ => {}
        }

        if is_block {
            self.break_block();
            if matches!(tag_name, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote") {
                self.finish_line();
            }
        }
    }

    fn process_node(&mut self, node: NodeRef<Node>) {
        match node.value() {
            Node::Text(text) => self.add_text(&text.text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.process_element(element);
                }
            }
            _ => {
                for child in node.children() {
                    self.process_node(child);
                }
            }
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.break_block();
        while self.lines.last().is_some_and(|l| l.trim().is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_text("Just text"), vec!["Just text"]);
        assert!(html_to_text("").is_empty());
        assert!(html_to_text("<div>  </div>").is_empty());
    }

    /// # Paragraphs And Breaks
    ///
    /// Tests line structure for block elements and `<br>`.
    ///
    /// ## Test Scenario
    /// - Two paragraphs, the second with inline formatting and a break
    ///
    /// ## Expected Outcome
    /// - Paragraphs separated by one blank line, inline tags flattened
    #[test]
    fn test_paragraphs_and_breaks() {
        let lines = html_to_text("<p>First paragraph</p><p>Hello <b>world</b>!<br>Next line</p>");
        assert_eq!(
            lines,
            vec!["First paragraph", "", "Hello world!", "Next line"]
        );
    }

    /// # Lists And Links
    ///
    /// Tests bullets for list items and link targets.
    ///
    /// ## Test Scenario
    /// - A list with a nested list and a link whose text differs from its href
    ///
    /// ## Expected Outcome
    /// - Bullets with nesting indent; the href follows the link text
    #[test]
    fn test_lists_and_links() {
        let html = r#"<ul><li>One</li><li>Two<ul><li>Nested</li></ul></li></ul><div>See <a href="https://x.test/1">ticket</a></div>"#;
        assert_eq!(
            html_to_text(html),
            vec!["• One", "• Two", "  • Nested", "See ticket (https://x.test/1)"]
        );
    }

    /// # Entities And Whitespace
    ///
    /// Tests entity decoding and whitespace collapsing.
    ///
    /// ## Test Scenario
    /// - Text with &amp;, &lt;, non-collapsed spaces and newlines
    ///
    /// ## Expected Outcome
    /// - Decoded characters, single spaces
    #[test]
    fn test_entities_and_whitespace() {
        assert_eq!(
            html_to_text("<div>a &amp; b\n   &lt;c&gt;</div>"),
            vec!["a & b <c>"]
        );
    }

    #[test]
    fn test_pre_keeps_lines() {
        assert_eq!(
            html_to_text("<pre>let x = 1;\n  x + 1</pre>"),
            vec!["let x = 1;", "  x + 1"]
        );
    }
}

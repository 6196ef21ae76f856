//! Minimal HTML tree. Text and attribute values are always escaped when
//! rendered; only `'static` markup can bypass escaping.

const VOID_TAGS: [&str; 5] = ["br", "hr", "input", "meta", "link"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Static(&'static str),
}

impl Node {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    pub fn render_into(&self, out: &mut String) {
        match self {
            Self::Element(element) => element.render_into(out),
            Self::Text(text) => out.push_str(&escape_html(text)),
            Self::Static(markup) => out.push_str(markup),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    /// Adds a boolean attribute (`checked`, `disabled`, ...) when `on`.
    pub fn flag(self, name: &'static str, on: bool) -> Self {
        if on {
            self.attr(name, name)
        } else {
            self
        }
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        let class = class.into();
        if class.is_empty() {
            self
        } else {
            self.attr("class", class)
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_html(value));
            out.push('"');
        }
        out.push('>');

        if VOID_TAGS.contains(&self.tag) {
            return;
        }

        for child in &self.children {
            child.render_into(out);
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

pub fn el(tag: &'static str) -> Element {
    Element::new(tag)
}

pub fn text(text: impl Into<String>) -> Node {
    Node::Text(text.into())
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_attributes_are_escaped() {
        let html = el("td")
            .attr("data-nome", "O'Brien \"Jr\"")
            .text("<script>alert(1)</script> & co")
            .render();

        assert_eq!(
            html,
            "<td data-nome=\"O&#39;Brien &quot;Jr&quot;\">&lt;script&gt;alert(1)&lt;/script&gt; &amp; co</td>"
        );
    }

    #[test]
    fn void_tags_have_no_closing_tag() {
        let html = el("input")
            .attr("type", "checkbox")
            .flag("checked", true)
            .flag("disabled", false)
            .render();

        assert_eq!(html, "<input type=\"checkbox\" checked=\"checked\">");
    }

    #[test]
    fn nested_children_render_in_order() {
        let html = el("tr")
            .child(el("td").text("a"))
            .children(vec![text("b"), Node::Static("<td>c</td>")])
            .class("")
            .render();

        assert_eq!(html, "<tr><td>a</td>b<td>c</td></tr>");
    }
}

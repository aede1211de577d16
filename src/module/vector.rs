//! Vector documents produced by the tracer and assembled by the station.
//!
pub mod compose;
pub mod fragment;

/// Raw tracer output for one capture, before any physical dimensions are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    pub svg: String,
}

impl VectorPath {
    pub fn new(svg: String) -> Self {
        Self { svg }
    }

    /// Whether the document carries any drawable path data.
    pub fn is_empty(&self) -> bool {
        !self.svg.contains("<path") && !self.svg.contains(":path")
    }
}

/// Minimal SVG text surgery: root tag lookup, attribute access and namespace cleanup.
///
/// Tracer output is small and regular, so the document is treated as text and only
/// the root element and tag headers are touched. Element content passes through.
pub mod svg {

    /// Byte span of the root `<svg ...>` start tag and of the matching end tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Root {
        /// Start of `<svg`.
        pub open_start: usize,
        /// One past the `>` closing the start tag.
        pub open_end: usize,
        /// Start of `</svg>`, or the document end when missing.
        pub close_start: usize,
    }

    impl Root {
        /// The start tag text, `<svg ...>`.
        pub fn tag<'a>(&self, doc: &'a str) -> &'a str {
            &doc[self.open_start..self.open_end]
        }

        /// Everything between the start and end tag.
        pub fn content<'a>(&self, doc: &'a str) -> &'a str {
            &doc[self.open_end..self.close_start]
        }
    }

    /// Finds the root svg element, accepting prefixed names such as `<ns0:svg`.
    pub fn root(doc: &str) -> Option<Root> {
        let mut offset = 0;
        while let Some(pos) = doc[offset..].find('<') {
            let start = offset + pos;
            let rest = &doc[start..];
            let name = tag_name(rest);
            if local_name(name) == "svg" && !name.starts_with(|c: char| matches!(c, '!' | '?' | '/')) {
                let open_end = start + tag_end(rest)?;
                let closing = format!("</{}>", name);
                let close_start = doc[open_end..]
                    .rfind(&closing)
                    .map(|p| open_end + p)
                    .unwrap_or(doc.len());
                return Some(Root {
                    open_start: start,
                    open_end,
                    close_start,
                });
            }
            offset = start + 1;
        }
        None
    }

    /// Value of attribute `name` in a start tag.
    pub fn get_attr(tag: &str, name: &str) -> Option<String> {
        attributes(tag)
            .into_iter()
            .find(|(k, _, _)| k == name)
            .map(|(_, v, _)| v)
    }

    /// Returns `tag` with attribute `name` set to `value`, appended when absent.
    pub fn set_attr(tag: &str, name: &str, value: &str) -> String {
        let name_end = tag_name(tag).len() + 1;
        let mut attrs = attributes(tag);
        match attrs.iter_mut().find(|(k, _, _)| k == name) {
            Some(attr) => attr.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string(), '"')),
        }
        let self_closing = tag.trim_end().ends_with("/>");
        let mut out = String::from(&tag[..name_end]);
        for (k, v, q) in &attrs {
            out.push_str(&format!(" {}={}{}{}", k, q, v, q));
        }
        out.push_str(if self_closing { "/>" } else { ">" });
        out
    }

    /// Splits a length such as `12.5cm` into its number and unit.
    pub fn parse_length(value: &str) -> Option<(f64, String)> {
        let value = value.trim();
        let split = value
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e'))
            .unwrap_or(value.len());
        // An `e` directly before a unit letter belongs to the unit ("em", "ex").
        let (num, unit) = match value[..split].strip_suffix('e') {
            Some(num) if split < value.len() => (num, &value[num.len()..]),
            _ => (&value[..split], &value[split..]),
        };
        let num: f64 = num.parse().ok()?;
        Some((num, unit.trim().to_string()))
    }

    /// Renders a number without trailing zeros, four decimals at most.
    pub fn format_number(value: f64) -> String {
        let text = format!("{:.4}", value);
        let text = text.trim_end_matches('0').trim_end_matches('.');
        match text {
            "-0" | "" => "0".to_string(),
            t => t.to_string(),
        }
    }

    /// Drops namespace declarations and `svg:` / `nsN:` element prefixes from markup.
    pub fn strip_namespaces(markup: &str) -> String {
        let mut out = String::with_capacity(markup.len());
        let mut rest = markup;
        while let Some(pos) = rest.find('<') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];
            if rest.starts_with("<!--") || rest.starts_with("<?") || rest.starts_with("<!") {
                let end = match rest.starts_with("<!--") {
                    true => rest.find("-->").map(|e| e + 3),
                    false => rest.find('>').map(|e| e + 1),
                }
                .unwrap_or(rest.len());
                if !rest.starts_with("<?xml") && !rest.starts_with("<!DOCTYPE") {
                    out.push_str(&rest[..end]);
                }
                rest = &rest[end..];
                continue;
            }
            let Some(end) = tag_end(rest) else {
                out.push_str(rest);
                return out;
            };
            out.push_str(&clean_tag(&rest[..end]));
            rest = &rest[end..];
        }
        out.push_str(rest);
        out
    }

    fn clean_tag(tag: &str) -> String {
        let name = tag_name(tag);
        let closing = name.starts_with('/');
        let bare = name.trim_start_matches('/');
        let local = match bare.split_once(':') {
            Some((prefix, local)) if is_decoration(prefix) => local,
            _ => bare,
        };
        let mut out = String::from(if closing { "</" } else { "<" });
        out.push_str(local);
        if closing {
            out.push('>');
            return out;
        }
        for (k, v, q) in attributes(tag) {
            if k == "xmlns" || k.starts_with("xmlns:") {
                continue;
            }
            let k = match k.split_once(':') {
                Some((prefix, local)) if is_decoration(prefix) => local.to_string(),
                _ => k,
            };
            out.push_str(&format!(" {}={}{}{}", k, q, v, q));
        }
        out.push_str(if tag.trim_end().ends_with("/>") { "/>" } else { ">" });
        out
    }

    fn is_decoration(prefix: &str) -> bool {
        prefix == "svg"
            || (prefix.len() > 2
                && prefix.starts_with("ns")
                && prefix[2..].chars().all(|c| c.is_ascii_digit()))
    }

    fn tag_name(tag: &str) -> &str {
        let body = &tag[1..];
        let end = body
            .find(|c: char| c.is_whitespace() || c == '>' || (c == '/' && !body.starts_with('/')))
            .unwrap_or(body.len());
        &body[..end]
    }

    fn local_name(name: &str) -> &str {
        name.rsplit(':').next().unwrap_or(name)
    }

    /// Offset one past the `>` ending the tag at the start of `text`, skipping quoted values.
    fn tag_end(text: &str) -> Option<usize> {
        let mut quote: Option<char> = None;
        for (i, c) in text.char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, '>') => return Some(i + 1),
                _ => {}
            }
        }
        None
    }

    /// `(name, value, quote)` triples of a start tag, in order.
    fn attributes(tag: &str) -> Vec<(String, String, char)> {
        let name_len = tag_name(tag).len() + 1;
        let inner = tag[name_len..]
            .trim_end()
            .trim_end_matches('>')
            .trim_end_matches('/');
        let mut attrs = Vec::new();
        let mut rest = inner;
        loop {
            rest = rest.trim_start();
            let Some(eq) = rest.find('=') else { break };
            let key = rest[..eq].trim().to_string();
            let after = rest[eq + 1..].trim_start();
            let Some(q) = after.chars().next().filter(|c| *c == '"' || *c == '\'') else {
                break;
            };
            let Some(close) = after[1..].find(q) else { break };
            attrs.push((key, after[1..1 + close].to_string(), q));
            rest = &after[close + 2..];
        }
        attrs
    }

}

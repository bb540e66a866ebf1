//! Minimal XML helpers for Atom feeds. Nested same-name tags are handled by
//! depth counting; namespace-qualified names (`arxiv:doi`) are matched
//! verbatim, case-insensitively.

use super::html::find_tag_end;
use super::{collapse_whitespace, decode_entities, tag_name_of};

fn is_open_of(body: &str, tag: &str) -> bool {
    let (name, closing) = tag_name_of(body);
    !closing && name.eq_ignore_ascii_case(tag) && !body.starts_with('!') && !body.starts_with('?')
}

/// Outer-XML of every `<tag>` element, in document order.
pub fn elements_by_tag_name(xml: &str, tag: &str) -> Vec<String> {
    if tag.trim().is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut i = 0;
    while let Some(lt) = xml[i..].find('<').map(|p| i + p) {
        let Some(gt) = find_tag_end(xml, lt) else {
            break;
        };
        let body = &xml[lt + 1..gt];

        if !is_open_of(body, tag) {
            i = gt + 1;
            continue;
        }

        if body.trim_end().ends_with('/') {
            out.push(xml[lt..gt + 1].to_string());
            i = gt + 1;
            continue;
        }

        // Depth-count to the matching close tag.
        let mut depth = 1usize;
        let mut j = gt + 1;
        let mut end = xml.len();
        while j < xml.len() {
            let Some(next_lt) = xml[j..].find('<').map(|p| j + p) else {
                break;
            };
            let Some(next_gt) = find_tag_end(xml, next_lt) else {
                break;
            };
            let inner = &xml[next_lt + 1..next_gt];
            let (name, closing) = tag_name_of(inner);
            if name.eq_ignore_ascii_case(tag) {
                if closing {
                    depth -= 1;
                    if depth == 0 {
                        end = next_gt + 1;
                        break;
                    }
                } else if !inner.trim_end().ends_with('/') {
                    depth += 1;
                }
            }
            j = next_gt + 1;
        }

        out.push(xml[lt..end].to_string());
        i = gt + 1;
    }

    out
}

/// Decoded, collapsed text of the first `<tag>` element, nested tags
/// stripped. Empty string when the tag is absent.
pub fn text_content(xml: &str, tag: &str) -> String {
    let Some(outer) = elements_by_tag_name(xml, tag).into_iter().next() else {
        return String::new();
    };

    // Drop the open tag and the close tag, then strip whatever markup is left.
    let inner_start = match find_tag_end(&outer, 0) {
        Some(gt) => gt + 1,
        None => return String::new(),
    };
    let inner_end = outer.rfind("</").unwrap_or(outer.len());
    if inner_start >= inner_end {
        return String::new();
    }

    let mut text = String::new();
    let inner = &outer[inner_start..inner_end];
    let mut i = 0;
    while i < inner.len() {
        match inner[i..].find('<') {
            Some(p) => {
                text.push_str(&inner[i..i + p]);
                match find_tag_end(inner, i + p) {
                    Some(gt) => i = gt + 1,
                    None => break,
                }
            }
            None => {
                text.push_str(&inner[i..]);
                break;
            }
        }
    }

    collapse_whitespace(&decode_entities(&text))
}

/// Value of `attr` on the first `<tag>` element, entities decoded.
pub fn element_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let outer = elements_by_tag_name(xml, tag).into_iter().next()?;
    attribute_of(&outer, attr)
}

/// Value of `attr` on the leading open tag of `element`.
pub fn attribute_of(element: &str, attr: &str) -> Option<String> {
    let gt = find_tag_end(element, 0)?;
    let body = &element[1..gt];
    let needle = format!("{}=", attr);
    let mut search = 0;
    while let Some(pos) = super::find_ci(&body[search..], &needle).map(|p| search + p) {
        // Require a boundary before the attribute name.
        let ok_start = pos == 0
            || body.as_bytes()[pos - 1].is_ascii_whitespace();
        if !ok_start {
            search = pos + needle.len();
            continue;
        }
        let rest = &body[pos + needle.len()..];
        let rest = rest.trim_start();
        let value = match rest.as_bytes().first() {
            Some(&q @ (b'"' | b'\'')) => {
                let rest = &rest[1..];
                match rest.find(q as char) {
                    Some(end) => &rest[..end],
                    None => rest,
                }
            }
            _ => rest
                .split(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                .next()
                .unwrap_or(""),
        };
        return Some(decode_entities(value));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>First  paper</title>
    <author><name>Ada Lovelace</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/1234.5678" rel="related"/>
  </entry>
  <entry>
    <title>Second &amp; last</title>
  </entry>
</feed>"#;

    #[test]
    fn lists_entries() {
        let entries = elements_by_tag_name(FEED, "entry");
        assert_eq!(entries.len(), 2);
        assert!(entries[0].contains("First"));
        assert!(entries[1].contains("Second"));
    }

    #[test]
    fn text_content_decodes_and_collapses() {
        let entries = elements_by_tag_name(FEED, "entry");
        assert_eq!(text_content(&entries[0], "title"), "First paper");
        assert_eq!(text_content(&entries[1], "title"), "Second & last");
        assert_eq!(text_content(&entries[1], "summary"), "");
    }

    #[test]
    fn nested_same_name_tags_depth_count() {
        let xml = "<item><item>inner</item>outer</item>";
        let items = elements_by_tag_name(xml, "item");
        assert_eq!(items[0], xml);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn reads_attributes_including_self_closing() {
        let entries = elements_by_tag_name(FEED, "entry");
        assert_eq!(
            element_attribute(&entries[0], "link", "href").as_deref(),
            Some("http://arxiv.org/pdf/1234.5678")
        );
        assert_eq!(
            element_attribute(&entries[0], "link", "title").as_deref(),
            Some("pdf")
        );
    }

    #[test]
    fn nested_text_strips_inner_tags() {
        let xml = "<author><name>Ada</name> <name>Grace</name></author>";
        assert_eq!(text_content(xml, "author"), "Ada Grace");
    }
}

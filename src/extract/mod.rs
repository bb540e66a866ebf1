//! Pure string primitives for pulling structure out of upstream markup.
//!
//! Engines that return full HTML documents go through `scraper`; these
//! helpers exist for the payloads that are *not* well-formed documents —
//! Google's progressive `_fmt:prog` fragments, Atom XML, snippet cleanup.
//! Every function here is I/O-free and total: malformed input yields empty
//! output, never a panic.

mod html;
mod xml;

pub use html::find_elements;
pub use xml::{attribute_of, element_attribute, elements_by_tag_name, text_content};

/// Named entities we decode; everything else passes through untouched.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("mdash", "\u{2014}"),
    ("ndash", "\u{2013}"),
    ("hellip", "\u{2026}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("laquo", "\u{00AB}"),
    ("raquo", "\u{00BB}"),
    ("middot", "\u{00B7}"),
    ("bull", "\u{2022}"),
    ("copy", "\u{00A9}"),
    ("reg", "\u{00AE}"),
    ("trade", "\u{2122}"),
    ("deg", "\u{00B0}"),
    ("times", "\u{00D7}"),
    ("divide", "\u{00F7}"),
    ("euro", "\u{20AC}"),
    ("pound", "\u{00A3}"),
    ("yen", "\u{00A5}"),
    ("cent", "\u{00A2}"),
    ("sect", "\u{00A7}"),
    ("para", "\u{00B6}"),
];

fn lookup_named(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
}

/// Decode named, decimal (`&#N;`) and hex (`&#xH;`) entities. Unknown
/// entities and out-of-range code points pass through verbatim.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'&' {
            let ch_len = utf8_len(bytes[i]);
            out.push_str(&s[i..(i + ch_len).min(bytes.len())]);
            i += ch_len;
            continue;
        }

        // Entities are short; cap the lookahead so a stray '&' is cheap.
        let end = bytes[i + 1..]
            .iter()
            .take(32)
            .position(|&b| b == b';')
            .map(|p| i + 1 + p);
        let Some(end) = end else {
            out.push('&');
            i += 1;
            continue;
        };

        let body = &s[i + 1..end];
        let decoded = if let Some(num) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X"))
        {
            u32::from_str_radix(num, 16).ok().and_then(decode_codepoint)
        } else if let Some(num) = body.strip_prefix('#') {
            num.parse::<u32>().ok().and_then(decode_codepoint)
        } else {
            lookup_named(body).map(|v| v.to_string())
        };

        match decoded {
            Some(text) => {
                out.push_str(&text);
                i = end + 1;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out
}

fn decode_codepoint(cp: u32) -> Option<String> {
    if cp == 0 || cp > 0x10FFFF {
        return None;
    }
    char::from_u32(cp).map(|c| c.to_string())
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        b if b >= 0xC0 => 2,
        _ => 1,
    }
}

/// Close tags that imply a visual break; replaced by a space so words from
/// adjacent blocks don't run together.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "th", "table",
    "section", "article", "header", "footer", "blockquote",
];

/// Strip tags and decode entities, yielding collapsed plain text.
///
/// `<script>`/`<style>` blocks are dropped whole; block-level close tags and
/// `<br>` become spaces.
pub fn extract_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let bytes = html.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            let ch_len = utf8_len(bytes[i]);
            out.push_str(&html[i..(i + ch_len).min(bytes.len())]);
            i += ch_len;
            continue;
        }

        // Comments.
        if html[i..].starts_with("<!--") {
            i = match html[i..].find("-->") {
                Some(p) => i + p + 3,
                None => bytes.len(),
            };
            continue;
        }

        let Some(tag_end) = html::find_tag_end(html, i) else {
            // Unterminated tag: drop the rest.
            break;
        };
        let tag_body = &html[i + 1..tag_end];
        let (name, closing) = tag_name_of(tag_body);
        let lower = name.to_ascii_lowercase();

        if !closing && (lower == "script" || lower == "style") {
            let close = format!("</{}", lower);
            let rest = &html[tag_end + 1..];
            i = match find_ci(rest, &close) {
                Some(p) => {
                    let after = tag_end + 1 + p;
                    match html[after..].find('>') {
                        Some(gt) => after + gt + 1,
                        None => bytes.len(),
                    }
                }
                None => bytes.len(),
            };
            continue;
        }

        if lower == "br" || (closing && BLOCK_TAGS.contains(&lower.as_str())) {
            out.push(' ');
        }
        i = tag_end + 1;
    }

    collapse_whitespace(&decode_entities(&out))
}

/// Collapse any whitespace run to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn tag_name_of(tag_body: &str) -> (&str, bool) {
    let body = tag_body.trim_start();
    let (body, closing) = match body.strip_prefix('/') {
        Some(rest) => (rest.trim_start(), true),
        None => (body, false),
    };
    let end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(body.len());
    (&body[..end], closing)
}

/// Case-insensitive substring find.
pub(crate) fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    (0..=h.len() - n.len()).find(|&i| {
        h[i..i + n.len()]
            .iter()
            .zip(n)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&quot;x&quot; &#39;y&#39;"), "\"x\" 'y'");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&#x1F600;"), "\u{1F600}");
    }

    #[test]
    fn unknown_entities_pass_through() {
        assert_eq!(decode_entities("&bogus; &#0; &#x110000;"), "&bogus; &#0; &#x110000;");
    }

    #[test]
    fn unterminated_entity_is_literal() {
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
    }

    #[test]
    fn extract_text_strips_script_and_style() {
        let html = "<p>hello</p><script>var x = '<b>no</b>';</script><style>p{}</style><p>world</p>";
        assert_eq!(extract_text(html), "hello world");
    }

    #[test]
    fn extract_text_breaks_on_block_tags_and_br() {
        assert_eq!(extract_text("<div>a</div><div>b</div>"), "a b");
        assert_eq!(extract_text("a<br>b"), "a b");
        assert_eq!(extract_text("<span>a</span><span>b</span>"), "ab");
    }

    #[test]
    fn extract_text_survives_malformed_input() {
        assert_eq!(extract_text("<div unterminated"), "");
        assert_eq!(extract_text(""), "");
    }

    #[test]
    fn collapse_squeezes_runs() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}

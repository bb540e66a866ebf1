use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, Template};
use crate::extract;

use super::{Engine, EngineRequest};

pub struct Arxiv;

fn entry_authors(entry: &str) -> Vec<String> {
    extract::elements_by_tag_name(entry, "author")
        .iter()
        .map(|a| extract::text_content(a, "name"))
        .filter(|n| !n.is_empty())
        .collect()
}

/// The PDF link is the `<link>` whose `title` attribute is `pdf`.
fn pdf_link(entry: &str) -> Option<String> {
    extract::elements_by_tag_name(entry, "link")
        .iter()
        .find(|link| extract::attribute_of(link, "title").as_deref() == Some("pdf"))
        .and_then(|link| extract::attribute_of(link, "href"))
}

impl Engine for Arxiv {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn shortcut(&self) -> &'static str {
        "ax"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Science]
    }

    fn timeout_ms(&self) -> u64 {
        6_000
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://export.arxiv.org/api/query")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("search_query", &format!("all:{}", query));
            qp.append_pair("start", &((params.page - 1) * 10).to_string());
            qp.append_pair("max_results", "10");
            qp.append_pair("sortBy", "relevance");
        }

        Ok(EngineRequest::get(url.to_string()).header("User-Agent", super::random_user_agent()))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();

        for entry in extract::elements_by_tag_name(body, "entry") {
            let abs_url = extract::text_content(&entry, "id");
            let title = extract::text_content(&entry, "title");
            if abs_url.is_empty() || title.is_empty() {
                continue;
            }

            let doi = extract::text_content(&entry, "arxiv:doi");
            let journal = extract::text_content(&entry, "arxiv:journal_ref");

            out.results.push(EngineResult {
                // Prefer the PDF when the feed links one.
                url: pdf_link(&entry).unwrap_or_else(|| abs_url.clone()),
                title,
                content: extract::text_content(&entry, "summary"),
                category: Category::Science,
                template: Some(Template::Paper),
                authors: entry_authors(&entry),
                published_at: Some(extract::text_content(&entry, "published"))
                    .filter(|p| !p.is_empty()),
                doi: if doi.is_empty() { None } else { Some(doi) },
                journal: if journal.is_empty() {
                    None
                } else {
                    Some(journal)
                },
                ..Default::default()
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <title>Attention  Is All
      You Need</title>
    <summary>We propose a new architecture.</summary>
    <published>2021-01-01T00:00:00Z</published>
    <author><name>Jane Doe</name></author>
    <author><name>John Smith</name></author>
    <arxiv:doi>10.1234/example</arxiv:doi>
    <arxiv:journal_ref>NeurIPS 2021</arxiv:journal_ref>
    <link href="http://arxiv.org/abs/2101.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2101.00001v1" rel="related" type="application/pdf"/>
  </entry>
</feed>"#;

    #[test]
    fn parses_atom_entries() {
        let parsed = Arxiv.parse_response(FEED, &EngineParams::default()).unwrap();
        assert_eq!(parsed.results.len(), 1);
        let r = &parsed.results[0];
        assert_eq!(r.title, "Attention Is All You Need");
        assert_eq!(r.url, "http://arxiv.org/pdf/2101.00001v1");
        assert_eq!(r.authors, vec!["Jane Doe", "John Smith"]);
        assert_eq!(r.doi.as_deref(), Some("10.1234/example"));
        assert_eq!(r.journal.as_deref(), Some("NeurIPS 2021"));
        assert_eq!(r.template, Some(Template::Paper));
    }

    #[test]
    fn malformed_feed_yields_empty() {
        let parsed = Arxiv
            .parse_response("<html>rate limited</html>", &EngineParams::default())
            .unwrap();
        assert!(parsed.results.is_empty());
    }
}

use anyhow::{anyhow, Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::core::AppState;

const MAX_DEFINITIONS: usize = 5;
const MAX_SYNONYMS: usize = 10;
const MAX_EXAMPLES: usize = 3;

/// Match `define WORD` / `meaning of WORD`.
pub fn detect(query: &str) -> Option<String> {
    let patterns = [
        r"(?i)^\s*define\s+([a-z][a-z'-]*)\s*$",
        r"(?i)^\s*(?:the\s+)?meaning\s+of\s+([a-z][a-z'-]*)\s*$",
    ];
    for pat in patterns {
        if let Ok(re) = regex::Regex::new(pat) {
            if let Some(caps) = re.captures(query) {
                return Some(caps[1].to_lowercase());
            }
        }
    }
    None
}

#[derive(Debug, Serialize)]
pub struct DefinitionSense {
    pub part_of_speech: String,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DictionaryAnswer {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    pub definitions: Vec<DefinitionSense>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub examples: Vec<String>,
}

pub async fn lookup(state: &AppState, word: &str) -> Result<DictionaryAnswer> {
    let url = format!(
        "https://api.dictionaryapi.dev/api/v2/entries/en/{}",
        utf8_percent_encode(word, NON_ALPHANUMERIC)
    );

    let body: serde_json::Value = state
        .http_client
        .get(&url)
        .send()
        .await
        .context("dictionary provider unreachable")?
        .error_for_status()
        .context("word not found")?
        .json()
        .await
        .context("dictionary provider returned malformed json")?;

    let entry = body
        .get(0)
        .ok_or_else(|| anyhow!("empty dictionary response"))?;

    let mut answer = DictionaryAnswer {
        word: entry
            .get("word")
            .and_then(|w| w.as_str())
            .unwrap_or(word)
            .to_string(),
        phonetic: entry
            .get("phonetic")
            .and_then(|p| p.as_str())
            .map(|p| p.to_string()),
        definitions: Vec::new(),
        synonyms: Vec::new(),
        antonyms: Vec::new(),
        examples: Vec::new(),
    };

    let meanings = entry
        .get("meanings")
        .and_then(|m| m.as_array())
        .cloned()
        .unwrap_or_default();
    for meaning in &meanings {
        let pos = meaning
            .get("partOfSpeech")
            .and_then(|p| p.as_str())
            .unwrap_or("")
            .to_string();

        for list in ["synonyms", "antonyms"] {
            let bucket = if list == "synonyms" {
                &mut answer.synonyms
            } else {
                &mut answer.antonyms
            };
            if let Some(values) = meaning.get(list).and_then(|s| s.as_array()) {
                for v in values.iter().filter_map(|v| v.as_str()) {
                    if bucket.len() < MAX_SYNONYMS && !bucket.iter().any(|b| b == v) {
                        bucket.push(v.to_string());
                    }
                }
            }
        }

        let definitions = meaning
            .get("definitions")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();
        for def in definitions {
            let Some(text) = def.get("definition").and_then(|d| d.as_str()) else {
                continue;
            };
            let example = def
                .get("example")
                .and_then(|e| e.as_str())
                .map(|e| e.to_string());
            if let Some(ex) = &example {
                if answer.examples.len() < MAX_EXAMPLES {
                    answer.examples.push(ex.clone());
                }
            }
            if answer.definitions.len() < MAX_DEFINITIONS {
                answer.definitions.push(DefinitionSense {
                    part_of_speech: pos.clone(),
                    definition: text.to_string(),
                    example,
                });
            }
        }
    }

    if answer.definitions.is_empty() {
        return Err(anyhow!("no definitions for '{}'", word));
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_define_and_meaning_forms() {
        assert_eq!(detect("define serendipity").as_deref(), Some("serendipity"));
        assert_eq!(detect("meaning of ubiquitous").as_deref(), Some("ubiquitous"));
        assert_eq!(detect("the meaning of life").as_deref(), Some("life"));
        assert_eq!(detect("Define Hyphen-ated").as_deref(), Some("hyphen-ated"));
        assert_eq!(detect("define two words"), None);
        assert_eq!(detect("definition rust"), None);
    }
}

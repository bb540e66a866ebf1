use anyhow::{anyhow, Result};
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;

/// Friendly names and common abbreviations mapped to IANA identifiers.
const TZ_TABLE: &[(&str, &str)] = &[
    ("utc", "UTC"),
    ("gmt", "Etc/GMT"),
    ("est", "America/New_York"),
    ("edt", "America/New_York"),
    ("cst", "America/Chicago"),
    ("cdt", "America/Chicago"),
    ("mst", "America/Denver"),
    ("mdt", "America/Denver"),
    ("pst", "America/Los_Angeles"),
    ("pdt", "America/Los_Angeles"),
    ("bst", "Europe/London"),
    ("cet", "Europe/Paris"),
    ("cest", "Europe/Paris"),
    ("ist", "Asia/Kolkata"),
    ("jst", "Asia/Tokyo"),
    ("kst", "Asia/Seoul"),
    ("aest", "Australia/Sydney"),
    ("nzst", "Pacific/Auckland"),
    ("london", "Europe/London"),
    ("paris", "Europe/Paris"),
    ("berlin", "Europe/Berlin"),
    ("madrid", "Europe/Madrid"),
    ("rome", "Europe/Rome"),
    ("amsterdam", "Europe/Amsterdam"),
    ("stockholm", "Europe/Stockholm"),
    ("moscow", "Europe/Moscow"),
    ("istanbul", "Europe/Istanbul"),
    ("dubai", "Asia/Dubai"),
    ("delhi", "Asia/Kolkata"),
    ("mumbai", "Asia/Kolkata"),
    ("singapore", "Asia/Singapore"),
    ("hong kong", "Asia/Hong_Kong"),
    ("beijing", "Asia/Shanghai"),
    ("shanghai", "Asia/Shanghai"),
    ("tokyo", "Asia/Tokyo"),
    ("seoul", "Asia/Seoul"),
    ("sydney", "Australia/Sydney"),
    ("melbourne", "Australia/Melbourne"),
    ("auckland", "Pacific/Auckland"),
    ("new york", "America/New_York"),
    ("nyc", "America/New_York"),
    ("boston", "America/New_York"),
    ("toronto", "America/Toronto"),
    ("chicago", "America/Chicago"),
    ("denver", "America/Denver"),
    ("los angeles", "America/Los_Angeles"),
    ("san francisco", "America/Los_Angeles"),
    ("seattle", "America/Los_Angeles"),
    ("vancouver", "America/Vancouver"),
    ("mexico city", "America/Mexico_City"),
    ("sao paulo", "America/Sao_Paulo"),
    ("buenos aires", "America/Argentina/Buenos_Aires"),
    ("cairo", "Africa/Cairo"),
    ("lagos", "Africa/Lagos"),
    ("nairobi", "Africa/Nairobi"),
    ("johannesburg", "Africa/Johannesburg"),
];

/// Match `time in LOCATION` / `what time is it in LOCATION`.
pub fn detect(query: &str) -> Option<String> {
    let patterns = [
        r"(?i)^\s*time\s+in\s+(.+?)\s*\??\s*$",
        r"(?i)^\s*what(?:'s|\s+is)?\s+(?:the\s+)?time(?:\s+now)?(?:\s+is\s+it)?\s+in\s+(.+?)\s*\??\s*$",
        r"(?i)^\s*what\s+time\s+is\s+it\s+in\s+(.+?)\s*\??\s*$",
    ];
    for pat in patterns {
        if let Ok(re) = regex::Regex::new(pat) {
            if let Some(caps) = re.captures(query) {
                let loc = caps[1].trim().to_string();
                if !loc.is_empty() {
                    return Some(loc);
                }
            }
        }
    }
    None
}

/// IANA-style capitalization for a free-form guess: `new york` never parses,
/// but `America/New_York` style segments might.
fn iana_guess(location: &str) -> String {
    location
        .split('/')
        .map(|segment| {
            segment
                .trim()
                .replace(' ', "_")
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join("_")
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn resolve(location: &str) -> Option<Tz> {
    let key = location.trim().to_lowercase();
    if let Some((_, iana)) = TZ_TABLE.iter().find(|(name, _)| *name == key) {
        return iana.parse().ok();
    }
    location
        .trim()
        .parse::<Tz>()
        .ok()
        .or_else(|| iana_guess(location).parse().ok())
}

#[derive(Debug, Serialize)]
pub struct TimeAnswer {
    pub location: String,
    pub time: String,
    pub date: String,
    pub timezone: String,
    pub offset: String,
}

pub fn lookup(location: &str) -> Result<TimeAnswer> {
    let tz = resolve(location).ok_or_else(|| anyhow!("unknown timezone '{}'", location))?;
    let now = Utc::now().with_timezone(&tz);

    Ok(TimeAnswer {
        location: location.to_string(),
        time: now.format("%H:%M").to_string(),
        date: now.format("%A, %B %-d, %Y").to_string(),
        timezone: tz.name().to_string(),
        offset: format!("UTC{}", now.format("%:z")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_time_queries() {
        assert_eq!(detect("time in Tokyo").as_deref(), Some("Tokyo"));
        assert_eq!(detect("what time is it in new york?").as_deref(), Some("new york"));
        assert_eq!(detect("what's the time in London").as_deref(), Some("London"));
        assert_eq!(detect("time zones explained"), None);
    }

    #[test]
    fn resolves_table_names_and_codes() {
        assert_eq!(resolve("jst").unwrap().name(), "Asia/Tokyo");
        assert_eq!(resolve("PST").unwrap().name(), "America/Los_Angeles");
        assert_eq!(resolve("new york").unwrap().name(), "America/New_York");
        assert_eq!(resolve("utc").unwrap().name(), "UTC");
    }

    #[test]
    fn falls_back_to_raw_iana_ids() {
        assert_eq!(resolve("Europe/Lisbon").unwrap().name(), "Europe/Lisbon");
        assert_eq!(resolve("europe/lisbon").unwrap().name(), "Europe/Lisbon");
        assert!(resolve("Atlantis/Nowhere").is_none());
    }

    #[test]
    fn lookup_produces_all_fields() {
        let answer = lookup("Tokyo").unwrap();
        assert_eq!(answer.timezone, "Asia/Tokyo");
        assert!(answer.offset.starts_with("UTC+"));
        assert_eq!(answer.time.len(), 5);
        assert!(lookup("not a real place").is_err());
    }
}

use std::env;
use std::time::Duration;

/// Port precedence: `--port` flag → `VEILSEARCH_PORT` → `PORT` → 5000.
pub fn resolve_port() -> u16 {
    port_from_args(env::args())
        .or_else(port_from_env)
        .unwrap_or(5000)
}

fn port_from_args(mut args: impl Iterator<Item = String>) -> Option<u16> {
    while let Some(arg) = args.next() {
        if arg == "--port" {
            if let Some(port) = args.next().and_then(|v| v.parse::<u16>().ok()) {
                return Some(port);
            }
        } else if let Some(value) = arg.strip_prefix("--port=") {
            if let Ok(port) = value.parse::<u16>() {
                return Some(port);
            }
        }
    }
    None
}

fn port_from_env() -> Option<u16> {
    for k in ["VEILSEARCH_PORT", "PORT"] {
        if let Ok(v) = env::var(k) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

pub fn http_timeout() -> Duration {
    let secs = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
}

pub fn http_connect_timeout() -> Duration {
    let secs = env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    Duration::from_secs(secs)
}

pub fn outbound_limit() -> usize {
    env::var("OUTBOUND_LIMIT")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(32)
}

pub fn accept_language() -> String {
    env::var("SEARCH_ACCEPT_LANGUAGE").unwrap_or_else(|_| "en-US,en;q=0.9".to_string())
}

/// Per-engine timeout: `SEARCH_ENGINE_TIMEOUT_MS_{NAME}` → engine default,
/// floored at 250 ms.
pub fn engine_timeout(engine: &str, builtin_ms: u64) -> Duration {
    let key = format!(
        "SEARCH_ENGINE_TIMEOUT_MS_{}",
        engine.to_ascii_uppercase().replace('-', "_")
    );
    let ms = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| {
            env::var("SEARCH_ENGINE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
        })
        .unwrap_or(builtin_ms);
    Duration::from_millis(ms.max(250))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_timeout_floors_at_250ms() {
        let d = engine_timeout("nonexistent_engine_xyz", 100);
        assert!(d >= Duration::from_millis(250));
    }

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn port_flag_accepts_both_spellings() {
        assert_eq!(port_from_args(args(&["veilsearch", "--port", "8080"])), Some(8080));
        assert_eq!(port_from_args(args(&["veilsearch", "--port=9090"])), Some(9090));
        assert_eq!(port_from_args(args(&["veilsearch"])), None);
        assert_eq!(port_from_args(args(&["veilsearch", "--port", "junk"])), None);
    }
}

use tracing::debug;

use crate::core::config;
use crate::core::types::{EngineParams, EngineResults};

use super::engines::{detect_block_reason, Engine, EngineError, HttpMethod};

/// An engine failure tagged with the engine that produced it.
#[derive(Debug, thiserror::Error)]
#[error("engine '{engine}' failed: {source}")]
pub struct ExecuteError {
    pub engine: &'static str,
    #[source]
    pub source: EngineError,
}

/// Run one engine end to end: build the request, perform it under the
/// engine's timeout, and parse the body. Results come back tagged with the
/// engine name; a zero score is replaced by the engine weight.
pub async fn execute_engine(
    client: &reqwest::Client,
    engine: &dyn Engine,
    query: &str,
    params: &EngineParams,
) -> Result<EngineResults, ExecuteError> {
    let fail = |source| ExecuteError {
        engine: engine.name(),
        source,
    };

    let request = engine
        .build_request(query, params)
        .map_err(|e| fail(EngineError::Fatal(e.to_string())))?;

    let timeout = config::engine_timeout(engine.name(), engine.timeout_ms());
    let body = tokio::time::timeout(timeout, fetch(client, &request))
        .await
        .map_err(|_| fail(EngineError::Timeout(timeout.as_millis() as u64)))?
        .map_err(|e| fail(e))?;

    let mut parsed = engine
        .parse_response(&body, params)
        .map_err(|e| fail(EngineError::Fatal(e.to_string())))?;

    debug!(
        "engine '{}' parsed {} results",
        engine.name(),
        parsed.results.len()
    );

    for result in &mut parsed.results {
        result.engine = engine.name().to_string();
        if result.score == 0.0 {
            result.score = engine.weight();
        }
    }

    Ok(parsed)
}

async fn fetch(
    client: &reqwest::Client,
    request: &super::engines::EngineRequest,
) -> Result<String, EngineError> {
    let mut req = match request.method {
        HttpMethod::Get => client.get(&request.url),
        HttpMethod::Post => client.post(&request.url),
    };

    let mut has_user_agent = false;
    for (k, v) in &request.headers {
        if k.eq_ignore_ascii_case("user-agent") {
            has_user_agent = true;
        }
        req = req.header(k.as_str(), v.as_str());
    }
    if !has_user_agent {
        req = req.header("User-Agent", super::engines::random_user_agent());
    }
    for (k, v) in super::engines::stealth_headers() {
        if !request.headers.iter().any(|(h, _)| h.eq_ignore_ascii_case(&k)) {
            req = req.header(k, v);
        }
    }

    if !request.cookies.is_empty() {
        let jar = request
            .cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        req = req.header("Cookie", jar);
    }

    if let Some(body) = &request.body {
        req = req.body(body.clone());
    }

    let resp = req
        .send()
        .await
        .map_err(|e| EngineError::Transient(e.to_string()))?;
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if let Some(reason) = detect_block_reason(status, &body) {
        return Err(EngineError::Blocked { reason });
    }
    if !status.is_success() {
        return Err(EngineError::Status(status.as_u16()));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_error_names_the_engine() {
        let e = ExecuteError {
            engine: "google",
            source: EngineError::Status(500),
        };
        assert_eq!(e.to_string(), "engine 'google' failed: upstream status 500");
    }
}

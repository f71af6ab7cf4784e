use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_non_empty_string_field(llm, "llm.base_url", "base_url")?;
        validate_non_empty_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_nullable_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.dimension", "dimension", 1, 100_000)?;
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 2_048)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 100)?;
        validate_f64_field(
            retrieval,
            "retrieval.score_threshold",
            "score_threshold",
            0.0,
            1.0,
        )?;
    }

    if let Some(collections) = expect_optional_object(root, "collections")? {
        validate_non_empty_string_field(collections, "collections.news_path", "news_path")?;
        validate_non_empty_string_field(
            collections,
            "collections.guideline_path",
            "guideline_path",
        )?;
    }

    if let Some(ingestion) = expect_optional_object(root, "ingestion")? {
        for (prefix, size_key, overlap_key) in [
            ("news", "news_chunk_size", "news_chunk_overlap"),
            ("guideline", "guideline_chunk_size", "guideline_chunk_overlap"),
        ] {
            validate_u64_field(
                ingestion,
                &format!("ingestion.{}", size_key),
                size_key,
                1,
                1_000_000,
            )?;
            validate_u64_field(
                ingestion,
                &format!("ingestion.{}", overlap_key),
                overlap_key,
                0,
                1_000_000,
            )?;
            let size = ingestion.get(size_key).and_then(|v| v.as_u64());
            let overlap = ingestion.get(overlap_key).and_then(|v| v.as_u64());
            if let (Some(size), Some(overlap)) = (size, overlap) {
                if overlap >= size {
                    return Err(ApiError::BadRequest(format!(
                        "Invalid config at 'ingestion': {} chunk overlap must be smaller than chunk size",
                        prefix
                    )));
                }
            }
        }
        validate_u64_field(
            ingestion,
            "ingestion.page_timeout_secs",
            "page_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_non_empty_string_field(agent, "agent.system_prompt_path", "system_prompt_path")?;
        validate_u64_field(agent, "agent.max_steps", "max_steps", 1, 50)?;
        validate_u64_field(agent, "agent.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(session) = expect_optional_object(root, "session")? {
        validate_nullable_u64_field(session, "session.idle_ttl_secs", "idle_ttl_secs", 1, 31_536_000)?;
        validate_nullable_u64_field(session, "session.max_messages", "max_messages", 2, 1_000_000)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_nullable_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    match section.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(_) => validate_u64_field(section, path, key, min, max),
    }
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_nullable_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    match section.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(_) => validate_optional_string_field(section, path, key),
    }
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: ApiError) -> String {
        err.to_string()
    }

    #[test]
    fn accepts_empty_and_full_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "server": { "host": "0.0.0.0", "port": 8000 },
            "llm": { "base_url": "https://api.openai.com", "api_key": null, "temperature": 0.2 },
            "embedding": { "model": "text-embedding-3-small", "dimension": 1536 },
            "retrieval": { "top_k": 5, "score_threshold": 0.3 },
            "ingestion": { "news_chunk_size": 500, "news_chunk_overlap": 100 },
            "agent": { "max_steps": 6 },
            "session": { "idle_ttl_secs": null, "max_messages": 200 }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_wrong_types_with_path() {
        let err = validate_config(&json!({ "retrieval": { "top_k": "five" } })).unwrap_err();
        assert!(message(err).contains("retrieval.top_k"));

        let err = validate_config(&json!({ "llm": [] })).unwrap_err();
        assert!(message(err).contains("'llm'"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(validate_config(&json!({ "retrieval": { "score_threshold": -0.1 } })).is_err());
        assert!(validate_config(&json!({ "agent": { "max_steps": 0 } })).is_err());
        assert!(validate_config(&json!({ "session": { "max_messages": 1 } })).is_err());
        let err = validate_config(&json!({ "session": { "idle_ttl_secs": 10_000_000_000_000_000_u64 } }))
            .unwrap_err();
        assert!(message(err).contains("session.idle_ttl_secs"));
        assert!(validate_config(&json!({ "session": { "idle_ttl_secs": 31_536_000 } })).is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let err = validate_config(&json!({
            "ingestion": { "guideline_chunk_size": 100, "guideline_chunk_overlap": 100 }
        }))
        .unwrap_err();
        assert!(message(err).contains("guideline chunk overlap"));
    }
}

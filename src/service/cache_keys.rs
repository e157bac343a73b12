//! Cache key generation for LLM exchanges

use sha2::{Digest, Sha256};

use crate::model::AnalysisRequest;

/// Generate the cache key hash for an exchange
///
/// The key covers everything that shapes the model reply:
/// - exchange kind (initial, basic, counter-narrative)
/// - resolved model id
/// - prompt version (hash of system prompt + user prompt, which embed
///   source, metadata and perspective)
pub fn exchange_cache_key(kind: &str, model_id: &str, system: &str, prompt: &str) -> String {
    let prompt_version = hash_string(&format!("{}\n{}", system, prompt));
    hash_string(&format!("{}|{}|{}", kind, model_id, prompt_version))
}

/// Cache key for an analysis exchange
///
/// Prompts embed a truncated source, so the full source length is part of the key
/// to keep `contentLength` correct for sources that differ only past the cut.
pub fn analysis_cache_key(
    kind: &str,
    model_id: &str,
    system: &str,
    prompt: &str,
    source_chars: usize,
) -> String {
    exchange_cache_key(&format!("{}:{}", kind, source_chars), model_id, system, prompt)
}

/// Short fingerprint of a request, for log correlation
pub fn request_fingerprint(request: &AnalysisRequest) -> String {
    let metadata = serde_json::to_string(&request.metadata).unwrap_or_default();
    let digest = hash_string(&format!(
        "{}|{}|{}|{}",
        request.model, request.perspective, metadata, request.source
    ));
    digest[..12].to_string()
}

fn hash_string(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

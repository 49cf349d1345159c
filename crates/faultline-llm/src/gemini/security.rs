//! Redaction of Gemini error text before it reaches logs or the user

use crate::util::truncate_safe;

const MAX_ERROR_LEN: usize = 300;

/// Gemini `error.status` codes and reasons, grouped by what we tell the user
const AUTH_MARKERS: &[&str] = &[
    "api_key_invalid",
    "unauthenticated",
    "permission_denied",
    "api key not valid",
    "api key expired",
];
const QUOTA_MARKERS: &[&str] = &["resource_exhausted", "quota", "rate limit"];
const REGION_MARKERS: &[&str] = &["user location is not supported"];
const SERVER_MARKERS: &[&str] = &["internal", "unavailable", "deadline_exceeded", "overloaded"];

/// Google API keys start with this prefix and run 39 characters
const KEY_PREFIX: &str = "AIza";
const KEY_LEN: usize = 39;

/// Collapse a Gemini error into text safe to surface.
///
/// Credential, quota, region and server failures become fixed messages.
/// Anything else keeps its text with API keys masked, cut to 300 bytes.
pub(crate) fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(AUTH_MARKERS) {
        return "Gemini rejected the API key. Check GEMINI_API_KEY.".to_string();
    }
    if has(QUOTA_MARKERS) {
        return "Gemini quota exhausted. Please try again later.".to_string();
    }
    if has(REGION_MARKERS) {
        return "The Gemini API is not available in this region.".to_string();
    }
    if has(SERVER_MARKERS) {
        return "Gemini server error. Please try again later.".to_string();
    }

    let masked = mask_embedded_keys(error);
    if masked.len() > MAX_ERROR_LEN {
        format!("{}...(truncated)", truncate_safe(&masked, MAX_ERROR_LEN))
    } else {
        masked
    }
}

/// Replace anything shaped like a Google API key with a placeholder
fn mask_embedded_keys(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(KEY_PREFIX) {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let key_len = candidate
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .count();
        if key_len >= KEY_LEN {
            out.push_str("AIza***");
        } else {
            out.push_str(&candidate[..key_len]);
        }
        rest = &candidate[key_len..];
    }
    out.push_str(rest);
    out
}

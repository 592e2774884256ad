//! Collection name resolution for search requests.
//!
//! The model often names a collection the way the user did ("notes") while
//! the store holds the prefixed name ("kimi_agent_notes").

/// Collection name the demo data set is stored under.
pub const SAMPLE_DATA_COLLECTION: &str = "kimi_agent_sample_data";

/// Map a requested collection name onto an existing one.
///
/// Tried in order: the name itself, the prefixed name, and for
/// `sample_data` the well-known demo collection. If nothing matches the
/// request is returned unchanged and the search reports it as missing.
pub fn resolve_collection(requested: &str, existing: &[String], prefix: &str) -> String {
    let exists = |name: &str| existing.iter().any(|e| e == name);

    if exists(requested) {
        return requested.to_string();
    }

    let prefixed = format!("{}{}", prefix, requested);
    if exists(&prefixed) {
        return prefixed;
    }

    if requested == "sample_data" && exists(SAMPLE_DATA_COLLECTION) {
        return SAMPLE_DATA_COLLECTION.to_string();
    }

    requested.to_string()
}

//! Stream name composition and parsing.
//!
//! Stream names follow the format `{category}:{version}-{thread_id}`.
//! A *category* is the `{category}:{version}` prefix shared by every stream
//! belonging to the same logical group of threads.
//!
//! # Example
//!
//! ```rust
//! use eventagent::store::stream::{build_stream_name, generate_thread_id, parse_stream_name};
//!
//! let thread_id = generate_thread_id();
//! let stream_name = build_stream_name("agent", "v0", &thread_id).unwrap();
//! let (category, version, tid) = parse_stream_name(&stream_name).unwrap();
//! assert_eq!(category, "agent");
//! assert_eq!(version, "v0");
//! assert_eq!(tid, thread_id);
//! ```

use crate::store::error::StoreError;
use uuid::Uuid;

/// Default stream category used by [`crate::engine::session::start_session`].
pub const DEFAULT_CATEGORY: &str = "agent";
/// Default stream version used by [`crate::engine::session::start_session`].
pub const DEFAULT_VERSION: &str = "v0";

/// Generate a fresh thread identifier in canonical hyphenated UUID form.
pub fn generate_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// Compose a fully qualified stream name from its three parts.
///
/// # Errors
///
/// Returns [`StoreError::InvalidArgument`] if any part is empty, if
/// `category` contains `:`, or if `version` contains `-`.
pub fn build_stream_name(
    category: &str,
    version: &str,
    thread_id: &str,
) -> Result<String, StoreError> {
    if category.trim().is_empty() {
        return Err(StoreError::InvalidArgument("category cannot be empty".into()));
    }
    if version.trim().is_empty() {
        return Err(StoreError::InvalidArgument("version cannot be empty".into()));
    }
    if thread_id.trim().is_empty() {
        return Err(StoreError::InvalidArgument("thread_id cannot be empty".into()));
    }
    if category.contains(':') {
        return Err(StoreError::InvalidArgument(
            "category cannot contain ':' character".into(),
        ));
    }
    if version.contains('-') {
        return Err(StoreError::InvalidArgument(
            "version cannot contain '-' character".into(),
        ));
    }
    Ok(format!("{}:{}-{}", category, version, thread_id))
}

/// Split a stream name back into `(category, version, thread_id)`.
///
/// # Errors
///
/// Returns [`StoreError::InvalidArgument`] if the name does not match the
/// `{category}:{version}-{thread_id}` shape or any component is empty.
pub fn parse_stream_name(stream_name: &str) -> Result<(String, String, String), StoreError> {
    if stream_name.trim().is_empty() {
        return Err(StoreError::InvalidArgument("stream_name cannot be empty".into()));
    }

    let (category, rest) = stream_name.split_once(':').ok_or_else(|| {
        StoreError::InvalidArgument(format!(
            "invalid stream name format: '{}'. expected category:version-thread_id",
            stream_name
        ))
    })?;

    let (version, thread_id) = rest.split_once('-').ok_or_else(|| {
        StoreError::InvalidArgument(format!(
            "invalid stream name format: '{}'. expected category:version-thread_id",
            stream_name
        ))
    })?;

    if category.trim().is_empty() {
        return Err(StoreError::InvalidArgument("category component cannot be empty".into()));
    }
    if version.trim().is_empty() {
        return Err(StoreError::InvalidArgument("version component cannot be empty".into()));
    }
    if thread_id.trim().is_empty() {
        return Err(StoreError::InvalidArgument("thread_id component cannot be empty".into()));
    }

    Ok((category.to_string(), version.to_string(), thread_id.to_string()))
}

/// Derive the category prefix (`{category}:{version}`) for a stream name.
pub fn category_of(stream_name: &str) -> Result<String, StoreError> {
    let (category, version, _) = parse_stream_name(stream_name)?;
    Ok(format!("{}:{}", category, version))
}

//! Category reads and consumer-group partitioning.

use crate::store::error::StoreError;

/// Parameters for [`crate::store::EventStore::read_category`].
///
/// Construct with [`CategoryQuery::new`] and adjust the optional fields
/// with the builder methods before passing to `read_category`.
#[derive(Debug, Clone)]
pub struct CategoryQuery<'a> {
    pub category: &'a str,
    pub from_global_position: i64,
    pub batch_size: i64,
    pub correlation: Option<&'a str>,
    pub consumer_group_member: Option<i64>,
    pub consumer_group_size: Option<i64>,
    pub condition: Option<&'a str>,
}

impl<'a> CategoryQuery<'a> {
    /// Start a query at `from_global_position` with the default batch size.
    pub fn new(category: &'a str, from_global_position: i64) -> Self {
        Self {
            category,
            from_global_position,
            batch_size: 1000,
            correlation: None,
            consumer_group_member: None,
            consumer_group_size: None,
            condition: None,
        }
    }

    /// Override the default batch size of 1000.
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Filter to events carrying this correlation tag in metadata.
    pub fn with_correlation(mut self, correlation: &'a str) -> Self {
        self.correlation = Some(correlation);
        self
    }

    /// Restrict this read to one member of a consumer group. Both
    /// `member` and `size` must be set together.
    pub fn with_consumer_group(mut self, member: i64, size: i64) -> Self {
        self.consumer_group_member = Some(member);
        self.consumer_group_size = Some(size);
        self
    }

    /// Attach an opaque, backend-specific server-side filter string.
    pub fn with_condition(mut self, condition: &'a str) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Validate the query shape before sending it to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] if `category` is empty, if
    /// exactly one of `consumer_group_member`/`consumer_group_size` is set,
    /// or if `from_global_position`/`batch_size` are negative.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.category.trim().is_empty() {
            return Err(StoreError::InvalidArgument("category cannot be empty".into()));
        }
        if self.from_global_position < 0 {
            return Err(StoreError::InvalidArgument(
                "from_global_position cannot be negative".into(),
            ));
        }
        if self.batch_size <= 0 {
            return Err(StoreError::InvalidArgument("batch_size must be positive".into()));
        }
        if self.consumer_group_member.is_some() != self.consumer_group_size.is_some() {
            return Err(StoreError::InvalidArgument(
                "consumer_group_member and consumer_group_size must both be set or both be unset"
                    .into(),
            ));
        }
        if let Some(size) = self.consumer_group_size {
            if size <= 0 {
                return Err(StoreError::InvalidArgument(
                    "consumer_group_size must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a hash of a string, used to deterministically assign a
/// stream to a consumer-group member.
pub fn fnv1a_64(input: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The consumer-group member index (`0..group_size`) that owns `stream_name`.
///
/// Stable across restarts and implementations, since it is defined purely
/// in terms of the 64-bit FNV-1a hash of the stream name.
pub fn consumer_group_member_for(stream_name: &str, group_size: u64) -> u64 {
    fnv1a_64(stream_name) % group_size
}

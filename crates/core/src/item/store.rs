//! Managed item storage trait and types.

use std::fmt;

use super::{ManagedCertificateItem, ManagedItemType};

/// Error type for managed item storage.
#[derive(Debug)]
pub enum ItemStoreError {
    /// Item not found.
    NotFound(String),
    /// Stored data could not be decoded.
    Corrupt { item_id: String, reason: String },
    /// Database error.
    Database(String),
}

impl fmt::Display for ItemStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStoreError::NotFound(id) => write!(f, "Managed item not found: {}", id),
            ItemStoreError::Corrupt { item_id, reason } => {
                write!(f, "Managed item {} is corrupt: {}", item_id, reason)
            }
            ItemStoreError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for ItemStoreError {}

/// Filter for listing managed items.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Only items included in auto renewal.
    pub auto_renew_only: bool,
    /// Filter by item type.
    pub item_type: Option<ManagedItemType>,
    /// Maximum number of results (0 = unlimited).
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl ItemFilter {
    /// Create a filter matching every item.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_renew_only(mut self) -> Self {
        self.auto_renew_only = true;
        self
    }

    pub fn with_item_type(mut self, item_type: ManagedItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Persistence for managed certificate items.
///
/// `list` returns items in fleet iteration order (creation order), which is
/// the order renewal passes process them in.
pub trait ManagedItemStore: Send + Sync {
    /// Insert or replace an item.
    fn save(&self, item: &ManagedCertificateItem) -> Result<(), ItemStoreError>;

    /// Get an item by ID.
    fn get(&self, id: &str) -> Result<Option<ManagedCertificateItem>, ItemStoreError>;

    /// List items matching the filter.
    fn list(&self, filter: &ItemFilter) -> Result<Vec<ManagedCertificateItem>, ItemStoreError>;

    /// Count items matching the filter.
    fn count(&self, filter: &ItemFilter) -> Result<i64, ItemStoreError>;

    /// Delete an item, returning it.
    fn delete(&self, id: &str) -> Result<ManagedCertificateItem, ItemStoreError>;
}

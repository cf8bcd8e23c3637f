//! Managed certificate items and their persistence.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteItemStore;
pub use store::{ItemFilter, ItemStoreError, ManagedItemStore};
pub use types::{
    is_valid_domain, ChallengeType, CreateItemRequest, ManagedCertificateItem, ManagedItemType,
    RequestConfig,
};

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod error;
pub mod profiles;
pub mod records;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use catalog::{Catalog, MediaAsset, NewCatalogProduct};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use profiles::{
    load_profiles, parse_profiles, validate_profile, ProfileConfig, ProfilesFile, REQUIRED_FIELD,
};
pub use records::{ExtractedRecord, ProductFilter, StoreStats, StoredProduct};
pub use store::RecordStore;

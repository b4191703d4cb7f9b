pub mod assets;
pub mod error;
pub mod mapper;

pub use assets::{media_file_name, AssetDownloader};
pub use error::ImportError;
pub use mapper::{ImportMapper, ImportOptions, ImportSummary};

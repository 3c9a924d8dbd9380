mod collections;
mod config;
mod extract;
mod ingest;
mod search;
mod serve;
mod status;

pub use collections::CollectionsCommand;
pub use config::ConfigCommand;
pub use extract::ExtractArgs;
pub use ingest::IngestArgs;
pub use search::SearchArgs;
pub use serve::ServeArgs;

pub use collections::handle_collections;
pub use config::handle_config;
pub use extract::handle_extract;
pub use ingest::handle_ingest;
pub use search::handle_search;
pub use serve::handle_serve;
pub use status::handle_status;

//! MongoDB implementation of the match store.

mod config;
mod connection;
mod error;
mod store;

pub use config::MongoConfig;
pub use error::{MongoDaoError, MongoResult};
pub use store::MongoMatchStore;

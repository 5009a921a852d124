pub mod config;
pub mod error;
pub mod matcher;
pub mod types;

pub use config::Config;
pub use error::{AuthError, ChannelError, FetchError, StoreError};
pub use types::*;

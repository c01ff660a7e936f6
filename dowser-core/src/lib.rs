mod adapter;
mod bulk;
mod command;
mod connection;
mod error;
mod events;
mod metadata;
mod provider;
mod query;
mod record;
mod registry;
mod source_info;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use adapter::*;
pub use bulk::*;
pub use command::*;
pub use connection::*;
pub use error::*;
pub use events::*;
pub use metadata::*;
pub use provider::*;
pub use query::*;
pub use record::*;
pub use registry::*;
pub use source_info::*;
pub use transaction::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;

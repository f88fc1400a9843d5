//! Record types shared by the store, the capture path and the CLI.

mod tags;
mod types;

pub use tags::{MAX_TAG_LEN, TagSet};
pub use types::{CommandRecord, Shell};

//! Storage engine: the paged channel store and its searches.

pub mod channel;
pub mod page;
mod search;

pub use channel::{ChannelStats, ChannelStore};
pub use page::{read_page, PageFile, PageHeader, PageStore};

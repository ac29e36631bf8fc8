//! Mailing lists. Small enough to re-read in full every run.

use super::{Incremental, StreamStrategy};
use crate::session::{Filter, Operation};
use crate::sync::window::TimeWindow;

pub const TABLE: &str = "list";

#[derive(Debug, Clone, Copy, Default)]
pub struct ListStream;

impl StreamStrategy for ListStream {
    fn table(&self) -> &'static str {
        TABLE
    }

    fn operation(&self) -> Operation {
        Operation::ReadLists
    }

    fn incremental(&self) -> Option<Incremental> {
        None
    }

    fn filter(&self, _window: Option<&TimeWindow>, _page_size: u32) -> Filter {
        Filter::All
    }
}

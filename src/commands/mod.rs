mod ask;
pub use ask::ask;

mod list;
pub use list::list;

pub mod browser;
pub mod extract;
#[cfg(test)]
pub mod fake;
pub mod layout;
pub mod pagination;
pub mod related;
pub mod traits;
pub mod types;

pub use browser::TrendsBrowser;
pub use pagination::PaginationDriver;
pub use related::related_for_rows;
pub use types::TrendsQuery;

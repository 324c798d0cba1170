pub mod model;
pub mod resolver;

pub use model::{CommitRecord, DropSummary, PullRecord, Resolution};
pub use resolver::{resolve, ResolveOptions};

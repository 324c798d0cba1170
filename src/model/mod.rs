mod repository;
mod result;
mod target;

pub use repository::Repository;
pub use result::{Error, Result};
pub use target::Target;

pub mod constants;
pub mod listing;
pub mod loader;
pub mod runtime;

pub use self::loader::{load, parse, Program};
pub use self::runtime::Computer;

mod interface;
mod rollback;
mod system;

pub use interface::*;
pub use rollback::*;
pub use system::*;

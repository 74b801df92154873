mod atomic;
mod backoff;
mod interface;
mod lock;
pub(crate) mod mutex;
mod state;
mod status;
#[cfg(test)]
mod tests;

pub use atomic::*;
pub use backoff::*;
pub use interface::*;
pub use lock::*;
pub(crate) use mutex::{Mutex, RwLock};
pub use state::SequenceReset;
pub(crate) use state::{GeneratorState, Outcome, Rules};
pub use status::*;

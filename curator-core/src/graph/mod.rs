pub mod dot;
pub mod store;

pub use dot::{parse_dot, write_dot};
pub use store::{GraphStore, ListenerId, StoreEvent, StoreOp, Subscription};

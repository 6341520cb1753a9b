mod client;
mod handler;
mod protocol;
mod storage;

pub use handler::rpc_handler;
pub use storage::{Command as StoreCommand, PeerStore};

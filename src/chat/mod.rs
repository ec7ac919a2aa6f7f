pub mod store;
pub mod types;

pub use store::{AuthState, ChatStore, ChatTransport, LocalInbox, LocalTransport, StoreEvent};
pub use types::{ChatPeer, Message, OutgoingMessage};

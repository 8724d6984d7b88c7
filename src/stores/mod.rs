// Session state and the signals the UI shell renders from

pub mod session;
pub mod session_storage;
pub mod signals;

pub use session::{IdentityProvider, SessionGate};
pub use session_storage::{BlobStore, BrowserSessionStore, MemoryBlobStore, PaymentSession};

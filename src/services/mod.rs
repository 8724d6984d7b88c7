// Backend access and payment orchestration

pub mod actor;
pub mod backend;
pub mod merchant;
pub mod normalizer;
pub mod payment_flow;
pub mod payment_methods;
pub mod qr;
pub mod wire;

pub use actor::{ActorHandle, ActorTransport, GatewayTransport};
pub use backend::IrisBackend;
pub use normalizer::{safe_call, unwrap_result, TaggedVariant, WireResult};
pub use payment_flow::{Conversion, FlowPhase, FlowState, PaymentFlow};
pub use payment_methods::PaymentMethodCatalog;
pub use qr::classify;

pub mod bridge;
pub mod config;
pub mod connections;
pub mod layout;
pub mod paging;
pub mod session;
pub mod surface;

pub use bridge::{BackendError, ExecutionBackend, ResultDelivery, ResultSink, SaveFormat};
pub use connections::{
    ActivateOutcome, AddOutcome, ConfigError, Connection, ConnectionId, ConnectionSpec,
};
pub use layout::{LayoutKind, LayoutNode};
pub use session::{Session, SessionError, SessionOptions};
pub use surface::{
    BufferHandle, DeliveryOutcome, Generation, SurfaceError, SurfaceProvider, WindowHandle,
    WindowOpener,
};

// Tether - An interceptor-driven request dispatcher for Rust
//
// This library routes requests, uploads, downloads and socket connections
// through a host-supplied platform, with layered configuration and
// request/response interceptors.

// Re-export the client
pub use tether_client::*;

// Diagnostic console output
pub use tether_log as log;

// Re-export optional crates
#[cfg(feature = "testing")]
pub use tether_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Adapter,
        BasicAuth,
        HostResponse,
        Method,
        Platform,
        // Task hooks
        RequestTaskSpec,
        RequestConfig,
        RequestInterceptor,
        RequestKind,
        Response,
        ResponseInterceptor,
        Result,
        SocketTaskSpec,
        TaskSpec,
        Tether,
        TetherError,
        TransferTaskSpec,
        create_instance,
        shared_instance,
    };
}

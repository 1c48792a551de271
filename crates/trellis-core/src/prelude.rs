pub use trellis_types::error::{Error, TrResult};
pub use trellis_types::types::Timestamp;
pub use trellis_types::user::{LogoutPayload, User};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4

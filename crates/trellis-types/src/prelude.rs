pub use crate::error::{Error, TrResult};
pub use crate::types::Timestamp;
pub use crate::user::{LogoutPayload, User};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4

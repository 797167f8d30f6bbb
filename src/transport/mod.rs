//! Input and output transports. Only the local filesystem today.

/// Filesystem reads and writes shared by every pipeline stage.
pub mod fs;

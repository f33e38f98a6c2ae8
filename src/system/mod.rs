//! # System Interaction Layer
//!
//! Everything that talks to the operating system or to the outside world.
//!
//! ## Modules
//!
//! - **`process`**: Launches engine executables, streams their output to subscribers
//!   and kills them (including leftover descendants) on request.
//! - **`platform`**: Detects the operating system family and architecture.
//! - **`remote`**: Builds request URLs for the remote catalog of downloadable engines.

/// Operating system family and architecture.
pub mod platform;
pub mod process;
/// Remote catalog URLs.
pub mod remote;

//! Profile storage for ear-dojo.
//!
//! This module provides local profile persistence, the remote document
//! store, and the session outcome log, with file-based and in-memory
//! backends.

pub mod file;
pub mod memory;
pub mod outcome;
pub mod remote;
pub mod traits;

pub use file::FileProfileStore;
pub use memory::{MemoryProfileStore, MemoryRemoteStore};
pub use outcome::{ModeTag, SessionOutcome, OUTCOME_SCHEMA_VERSION};
pub use remote::DirectoryRemoteStore;
pub use traits::{IdentityProvider, ProfileStore, RemoteStore, StaticIdentity};

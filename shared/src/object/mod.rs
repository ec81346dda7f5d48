//! Versioned distributed objects.
//!
//! A `Master` owns the authoritative state and turns modifications into
//! numbered versions. `Replica`s on other processes receive the instance data
//! and every delta in order, and expose a version only once their owner syncs
//! to it. The `ObjectSession` moves the data between them.

pub mod barrier;
pub mod dirty_bits;
pub mod error;
pub mod master;
pub mod object_version;
pub mod replica;
pub mod session;
pub mod versioned;

pub use barrier::{Barrier, BarrierData};
pub use dirty_bits::DirtyBits;
pub use error::ObjectError;
pub use master::{Commit, Master};
pub use object_version::{ObjectId, ObjectVersion, VERSION_FIRST, VERSION_NONE};
pub use replica::{Replica, ReplicaSink};
pub use session::ObjectSession;
pub use versioned::{ObjectDelta, Versioned};

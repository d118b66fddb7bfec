//! Fixed-width record pools with recyclable proxy references.
//!
//! Records live back to back in one growable byte array and are reached
//! through slot indices, generation-checked handles, or flyweight
//! [`ObjRef`] proxies that are rebound instead of allocated.
//!
//! # Architecture
//!
//! ```text
//! Pool (RefPool impl)
//! ├── MemPool (slot allocator: liveness, generations, LIFO free list)
//! │   └── StorageArray (Vec<u8>, fixed record width, ~1.5x growth)
//! └── RefRecycler (crossbeam MPMC queue of released ObjRefs)
//! ```
//!
//! Fields are declared as typed [`Field`] descriptors at fixed byte
//! offsets and stored big-endian, so [`raw`] can write records verbatim.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod layout;
pub mod mempool;
pub mod pool;
pub mod positions;
pub mod proxy;
pub mod raw;
pub mod storage;

pub use config::PoolConfig;
pub use layout::{Field, PositionLayout, Primitive};
pub use mempool::{LiveSlots, MemPool};
pub use pool::{Pool, RefCursor};
pub use positions::PoolPositions;
pub use proxy::{ObjRef, RefRecycler};
pub use raw::RawError;
pub use storage::StorageArray;

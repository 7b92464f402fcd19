//! Wire protocol for constraint-container state.
//!
//! A partitioned model exchanges its constraint bookkeeping as a
//! binary snapshot: the three constraint stores travel **by full
//! value** (every constraint object with its tag, node references, and
//! coefficient matrix), while the two active-case registries travel
//! **by tag list only** - cases are shared catalog entries addressed by
//! identifier, so the receiver re-mounts them from its own local
//! [`CaseCatalog`].
//!
//! # File Format
//!
//! A snapshot consists of:
//! 1. **Magic bytes**: `FEC1` (4 bytes)
//! 2. **Version**: `u32` little-endian (4 bytes)
//! 3. **Flags**: `u32` little-endian (4 bytes) - reserved
//! 4. **Payload**: bincode-encoded [`WireState`]
//!
//! # Example
//!
//! ```
//! use fea_constraint::SpConstraint;
//! use fea_domain::ConstraintDomain;
//! use fea_domain::Node;
//! use fea_types::{ConstraintTag, NodeId};
//! use fea_wire::{apply_state, load_state_bytes, save_state_bytes, snapshot, CaseCatalog};
//!
//! let mut sender = ConstraintDomain::new();
//! sender.add_node(Node::planar(NodeId::new(1), 0.0, 0.0)).unwrap();
//! sender
//!     .add_sp(SpConstraint::fixed(ConstraintTag::new(1), NodeId::new(1), 0))
//!     .unwrap();
//!
//! let bytes = save_state_bytes(&snapshot(&sender)).unwrap();
//!
//! let mut receiver = ConstraintDomain::new();
//! receiver.add_node(Node::planar(NodeId::new(1), 0.0, 0.0)).unwrap();
//! apply_state(&mut receiver, &CaseCatalog::new(), load_state_bytes(&bytes).unwrap());
//! assert_eq!(receiver.num_sps(), 1);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod codec;
mod error;
mod state;

pub use codec::{
    load_state_bytes, load_state_reader, save_state_bytes, save_state_writer, StateHeader,
    STATE_HEADER_SIZE, STATE_MAGIC, STATE_VERSION,
};
pub use error::WireError;
pub use state::{apply_state, snapshot, CaseCatalog, WireState};

/// Result type for wire-protocol operations.
pub type Result<T> = std::result::Result<T, WireError>;

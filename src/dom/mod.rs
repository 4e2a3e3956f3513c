//! # Node Tree
//!
//! The mutable HTML node tree the binder operates on. Templates are parsed with
//! html5ever and converted into [`Node`] handles; bound instances are deep clones.
//!
//! ## Key Invariants
//!
//! 1. **Structural clone only**: [`Node::deep_clone`] copies tag names, attributes
//!    and children. In-memory properties, the bound-data slot and event listeners
//!    are never carried over to the clone.
//! 2. **Weak parents**: a child refers to its parent weakly, so dropping the root
//!    handle of a detached tree frees the whole tree.
//! 3. **Attributes are the source of truth**: class list, inline style and dataset
//!    entries are views over the `class`, `style` and `data-*` attributes.

mod event;
mod node;
mod parse;
mod selector;
mod serialize;
mod style;

pub use event::{Event, Listener};
pub use node::{Node, NodeKind, WeakNode};
pub use parse::parse_fragment;
pub use selector::{SelectorError, SelectorList};
pub(crate) use style::dataset_attribute;

#![warn(clippy::pedantic)]

pub mod error;
pub mod entity;
pub mod string_table;
pub mod header_block;
pub mod node;
pub mod dense;
pub mod way;
pub mod relation;
pub mod primitive_block;
pub mod proto;

pub use dense::DenseNodes;
pub use entity::{EntityKind, Path, Point, RestrictionCandidate, Tags, UNSET};
pub use error::TypeError;
pub use header_block::{HeaderBBox, HeaderBlock};
pub use node::Node;
pub use primitive_block::{PrimitiveBlock, PrimitiveGroup};
pub use relation::{MemberType, Relation};
pub use string_table::StringTable;
pub use way::Way;

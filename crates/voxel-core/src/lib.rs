//! Voxel Core -- shared value types for converting Minecraft datapack
//! resources between their data-driven JSON form and the Voxel editor form.
//!
//! # Key Types
//!
//! - [`identifier::Identifier`] -- `namespace:resource` scoped to a registry,
//!   with tag-aware display and file-path derivation.
//! - [`element::DataDrivenRegistryElement`] -- a canonical resource file.
//! - [`element::VoxelElement`] -- contract every flattened editor shape meets.
//! - [`tags::TagsComparator`] -- recursive, cycle-safe tag resolution within
//!   one tag registry.
//! - [`unknown::extract_unknown_fields`] -- splits unmodeled keys off a JSON
//!   object so they survive a round trip.
//! - [`resolver`] -- dotted-path access to a Voxel element's JSON view.
//! - [`differ`] / [`logger::ChangeLogger`] -- structural diffs of snapshots
//!   and the migration logs built from them.

pub mod differ;
pub mod element;
pub mod identifier;
pub mod logger;
pub mod resolver;
pub mod tags;
pub mod unknown;

//! Voxel Schema -- per-concept conversion between canonical datapack JSON
//! and the flattened Voxel editor form.
//!
//! # Conversion Contract
//!
//! Every concept provides an [`analyser::Analyser`]: a parser that never
//! mutates its input and a compiler that overlays Voxel fields on a clone of
//! the original file, so content the schema does not model survives. Keys a
//! parser does not know are kept in an `unknownFields` bag and written back
//! on compile.
//!
//! # Key Types
//!
//! - [`analyser::Concept`] -- the four concepts and their registries.
//! - [`enchantment::EnchantmentProps`] -- enchantments with derived
//!   [`enchantment::EnchantmentMode`].
//! - [`structure_set::StructureSetProps`] -- structure sets with flattened
//!   placement.
//! - [`recipe::RecipeProps`] -- every recipe type as a slot map.
//! - [`loot_table::LootTableProps`] -- pools with flattened items and groups.
//! - [`datapack::Datapack`] / [`datapack::MemoryDatapack`] -- file access.
//! - [`pipeline`] -- registry-wide parse and compile.
//! - [`config::SessionConfig`] -- settings loaded from RON, TOML, or JSON.

pub mod analyser;
pub mod config;
pub mod datapack;
pub mod enchantment;
mod fields;
pub mod loot_table;
pub mod pipeline;
pub mod recipe;
pub mod structure_set;

pub use analyser::{Analyser, Concept, ConvertError, ParserParams};
pub use config::{ConfigError, SessionConfig};
pub use datapack::{Datapack, MemoryDatapack};
pub use fields::SingleOrMany;
pub use pipeline::{CompiledRegistry, compile_registry, parse_registry};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use voxel_actions::{Action, Session};
use voxel_core::identifier::Identifier;
use voxel_core::tags::TagsComparator;
use voxel_schema::analyser::ConvertError;
use voxel_schema::datapack::ElementLabel;
use voxel_schema::enchantment::EnchantmentAnalyser;
use voxel_schema::loot_table::LootTableAnalyser;
use voxel_schema::pipeline::{compile_registry_json, parse_registry_json};
use voxel_schema::recipe::RecipeAnalyser;
use voxel_schema::structure_set::StructureSetAnalyser;
use voxel_schema::{
    Analyser, CompiledRegistry, Concept, Datapack, MemoryDatapack, SessionConfig, compile_registry,
    parse_registry,
};

#[derive(Parser, Debug)]
#[command(name = "voxel", about = "Convert datapack JSON to and from the Voxel editor format")]
#[command(version)]
pub struct Cli {
    /// Settings file (.ron, .toml or .json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Pack format used by version-gated actions; overrides the config and pack.mcmeta
    #[arg(long, global = true)]
    pub pack_format: Option<u32>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a datapack into Voxel views, keyed by concept then element
    Parse {
        /// Datapack root directory
        #[arg(short, long)]
        pack: PathBuf,
        /// Only these concepts (defaults to the configured ones)
        #[arg(long, value_delimiter = ',')]
        concept: Option<Vec<String>>,
        /// Write the views here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Compile Voxel views back into a datapack directory
    Compile {
        #[arg(short, long)]
        pack: PathBuf,
        /// Views file as written by `parse`
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory (defaults to the pack itself)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Parse and recompile every concept, reporting elements that change
    Roundtrip {
        #[arg(short, long)]
        pack: PathBuf,
        /// Fail when any element changes
        #[arg(long)]
        strict: bool,
    },
    /// Apply a JSON list of actions to one element and write the result
    Edit {
        #[arg(short, long)]
        pack: PathBuf,
        #[arg(long)]
        concept: String,
        /// Element reference (`minecraft:sharpness`)
        #[arg(short, long)]
        element: String,
        /// JSON file holding an array of actions
        #[arg(short, long)]
        actions: PathBuf,
        /// Write the migration log here
        #[arg(long)]
        log: Option<PathBuf>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print every value a tag resolves to, following nested tags
    ResolveTag {
        #[arg(short, long)]
        pack: PathBuf,
        /// Registry the tag lists (`item`, `enchantment`, ...)
        #[arg(short, long)]
        registry: String,
        /// Tag reference, with or without `#`
        tag: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => voxel_schema::config::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if cli.pack_format.is_some() {
        config.version = cli.pack_format;
    }

    match cli.command {
        Command::Parse { pack, concept, out } => {
            let datapack = load_pack(&pack, &mut config)?;
            let concepts = match concept {
                Some(names) => names
                    .iter()
                    .map(|n| Concept::from_name(n))
                    .collect::<Result<Vec<_>, _>>()?,
                None => config.concepts.clone(),
            };
            let views = parse_views(&datapack, &concepts, &config)?;
            let text = serde_json::to_string_pretty(&views)?;
            match out {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{text}"),
            }
        }
        Command::Compile { pack, input, out } => {
            let mut datapack = load_pack(&pack, &mut config)?;
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let views: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", input.display()))?;

            let mut compiled = Vec::new();
            for (name, elements) in views {
                let concept = Concept::from_name(&name)?;
                let registry =
                    compile_registry_json(concept, &datapack, elements.into_values().collect())?;
                report(concept, &registry);
                compiled.push(registry);
            }
            for registry in &compiled {
                registry.write_into(&mut datapack)?;
            }
            datapack.write_dir(out.as_deref().unwrap_or(&pack))?;
        }
        Command::Roundtrip { pack, strict } => {
            let datapack = load_pack(&pack, &mut config)?;
            let mut changed = 0;
            for concept in &config.concepts {
                let views = match parse_registry_json(
                    *concept,
                    &datapack,
                    config.configurator_subdir.as_deref(),
                ) {
                    Ok(views) => views,
                    Err(ConvertError::NoElements { .. }) => continue,
                    Err(e) => return Err(e.into()),
                };
                let registry =
                    compile_registry_json(*concept, &datapack, views.into_values().collect())?;
                changed += report(*concept, &registry);
            }
            if strict && changed > 0 {
                bail!("{changed} element(s) changed during the round trip");
            }
        }
        Command::Edit {
            pack,
            concept,
            element,
            actions,
            log,
            out,
        } => {
            let mut datapack = load_pack(&pack, &mut config)?;
            let text = std::fs::read_to_string(&actions)
                .with_context(|| format!("reading {}", actions.display()))?;
            let actions: Vec<Action> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", actions.display()))?;

            let concept = Concept::from_name(&concept)?;
            let key = Identifier::of(&element, concept.registry()).to_unique_key();
            let edit = Edit {
                key: &key,
                actions: &actions,
                config: &config,
            };
            let (registry, migration) = match concept {
                Concept::Enchantment => edit.run::<EnchantmentAnalyser>(&datapack)?,
                Concept::StructureSet => edit.run::<StructureSetAnalyser>(&datapack)?,
                Concept::Recipe => edit.run::<RecipeAnalyser>(&datapack)?,
                Concept::LootTable => edit.run::<LootTableAnalyser>(&datapack)?,
            };
            report(concept, &registry);
            registry.write_into(&mut datapack)?;
            datapack.write_dir(out.as_deref().unwrap_or(&pack))?;
            if let Some(path) = log {
                std::fs::write(&path, serde_json::to_string_pretty(&migration)?)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
        }
        Command::ResolveTag {
            pack,
            registry,
            tag,
        } => {
            let datapack = load_pack(&pack, &mut config)?;
            let tags = datapack.tag_registry(&registry)?;
            let comparator = TagsComparator::new(&tags)?;
            let identifier = Identifier::of(&tag, &format!("tags/{registry}"));
            for value in comparator.get_recursive_values(&identifier) {
                println!("{value}");
            }
        }
    }
    Ok(())
}

/// Read the pack directory and fill in the version from `pack.mcmeta` when
/// neither the config nor the command line set one.
fn load_pack(root: &Path, config: &mut SessionConfig) -> Result<MemoryDatapack> {
    let datapack = MemoryDatapack::from_dir(root)
        .with_context(|| format!("reading datapack {}", root.display()))?;
    if config.version.is_none() {
        config.version = datapack.pack_format()?;
    }
    log::debug!("{} files, pack format {:?}", datapack.len(), config.version);
    Ok(datapack)
}

fn parse_views(
    datapack: &MemoryDatapack,
    concepts: &[Concept],
    config: &SessionConfig,
) -> Result<BTreeMap<String, BTreeMap<String, Value>>> {
    let mut views = BTreeMap::new();
    for concept in concepts {
        match parse_registry_json(*concept, datapack, config.configurator_subdir.as_deref()) {
            Ok(elements) => {
                log::info!("{}: {} element(s)", concept.name(), elements.len());
                views.insert(concept.name().to_string(), elements);
            }
            Err(e @ ConvertError::NoElements { .. }) => {
                log::warn!("{}: {}", e.warning_key().unwrap_or("no_elements"), e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(views)
}

/// Log the per-element labels of a compiled registry; returns how many
/// elements are not unchanged.
fn report(concept: Concept, registry: &CompiledRegistry) -> usize {
    let mut changed = 0;
    for labeled in &registry.labels {
        if labeled.label != ElementLabel::Unchanged {
            changed += 1;
            log::info!(
                "{} {}: {:?}",
                concept.name(),
                labeled.identifier.reference(),
                labeled.label
            );
        }
    }
    log::info!(
        "{}: {} element(s), {} changed, {} tag file(s)",
        concept.name(),
        registry.elements.len(),
        changed,
        registry.tags.len()
    );
    changed
}

// ===========================================================================
// Edit
// ===========================================================================

struct Edit<'a> {
    key: &'a str,
    actions: &'a [Action],
    config: &'a SessionConfig,
}

impl Edit<'_> {
    fn run<A>(
        &self,
        datapack: &MemoryDatapack,
    ) -> Result<(CompiledRegistry, voxel_core::logger::MigrationLog)>
    where
        A: Analyser,
        A::Voxel: Send,
    {
        let parsed = parse_registry::<A, _>(datapack, self.config.configurator_subdir.as_deref())?;
        let mut session = Session::from_config(self.config).with_elements(parsed.into_values());
        if session.get(self.key).is_none() {
            bail!("no element {} in the pack", self.key);
        }

        let applied = session.apply_actions(self.key, self.actions)?;
        log::info!("{}: {applied} of {} action(s) applied", self.key, self.actions.len());

        let migration = session.logger().export();
        let elements = session.into_elements();
        let registry = compile_registry::<A, _>(datapack, &elements)?;
        Ok((registry, migration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::parse_from([
            "voxel",
            "-vv",
            "parse",
            "--pack",
            "pack",
            "--concept",
            "recipe,loot_table",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Parse { concept, .. } => {
                assert_eq!(concept, Some(vec!["recipe".to_string(), "loot_table".to_string()]));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from([
            "voxel",
            "resolve-tag",
            "--pack",
            "pack",
            "--registry",
            "item",
            "#minecraft:planks",
            "--pack-format",
            "48",
        ]);
        assert_eq!(cli.pack_format, Some(48));
        assert!(matches!(cli.command, Command::ResolveTag { .. }));
    }

    #[test]
    fn parse_views_skips_empty_concepts() {
        let mut pack = MemoryDatapack::new();
        pack.insert_json(
            "data/test/recipe/stick.json",
            &serde_json::json!({
                "type": "minecraft:crafting_shaped",
                "pattern": ["#", "#"],
                "key": {"#": "#minecraft:planks"},
                "result": {"id": "minecraft:stick", "count": 4}
            }),
        )
        .unwrap();
        let config = SessionConfig::default();
        let views = parse_views(&pack, &Concept::ALL, &config).unwrap();
        assert_eq!(views.len(), 1);
        assert!(views["recipe"].contains_key("test:stick$recipe"));
    }
}

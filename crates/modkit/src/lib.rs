#![deny(warnings)]

//! Rhai-based event packs.
//!
//! A pack is a directory holding `metadata.yaml` and `script.rhai`. The script
//! evaluates to a map (or an array of maps) describing events that fire on a
//! given tick. When the script yields nothing, a `scheduled_event` block in
//! the metadata is used instead.

use rhai::{Dynamic, Engine};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sim_core::{EffectDelta, EffectKey, EventKind, ScheduledEvent, UnknownEffectKey};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

/// Highest metadata schema this build understands.
pub const ENGINE_SCHEMA_VERSION: u32 = 1;

const METADATA_FILE: &str = "metadata.yaml";
const SCRIPT_FILE: &str = "script.rhai";

/// Metadata for an event pack.
#[derive(Debug, Clone, Deserialize)]
pub struct PackMeta {
    pub id: String,
    pub name: String,
    pub version: String,
    pub engine_schema_version: u32,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("pack {pack} targets engine schema {found}, supported is {supported}")]
    Schema {
        pack: String,
        found: u32,
        supported: u32,
    },
    #[error("script of pack {pack} failed: {message}")]
    Script { pack: String, message: String },
    #[error("pack {pack}: {source}")]
    UnknownKey {
        pack: String,
        #[source]
        source: UnknownEffectKey,
    },
    #[error("pack {pack}: {message}")]
    Invalid { pack: String, message: String },
}

impl PackError {
    fn invalid(pack: &str, message: impl Into<String>) -> Self {
        PackError::Invalid {
            pack: pack.to_string(),
            message: message.into(),
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PackError + '_ {
    move |source| PackError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Loaded pack with metadata and script path.
#[derive(Debug, Clone)]
pub struct LoadedPack {
    pub meta: PackMeta,
    pub dir: PathBuf,
    pub script_path: PathBuf,
    pub script_mtime: SystemTime,
}

/// Loads event packs from a root directory and evaluates them into
/// [`ScheduledEvent`]s.
pub struct PackLoader {
    root: PathBuf,
    engine: Engine,
    packs: Vec<LoadedPack>,
}

impl PackLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            engine: new_engine(),
            packs: vec![],
        }
    }

    /// Packs found by the last [`PackLoader::load_all`], ordered by directory name.
    pub fn packs(&self) -> &[LoadedPack] {
        &self.packs
    }

    /// Scan the root for pack directories. Directories missing either file are skipped.
    pub fn load_all(&mut self) -> Result<usize, PackError> {
        let entries = fs::read_dir(&self.root).map_err(io_error(&self.root))?;
        self.packs.clear();
        for ent in entries {
            let ent = ent.map_err(io_error(&self.root))?;
            let dir = ent.path();
            if !dir.is_dir() {
                continue;
            }
            let meta_path = dir.join(METADATA_FILE);
            let script_path = dir.join(SCRIPT_FILE);
            if !meta_path.exists() || !script_path.exists() {
                debug!(dir = %dir.display(), "not an event pack");
                continue;
            }
            let meta_text = fs::read_to_string(&meta_path).map_err(io_error(&meta_path))?;
            let meta: PackMeta =
                serde_yaml::from_str(&meta_text).map_err(|source| PackError::Metadata {
                    path: meta_path.clone(),
                    source,
                })?;
            if meta.engine_schema_version > ENGINE_SCHEMA_VERSION {
                return Err(PackError::Schema {
                    pack: meta.id,
                    found: meta.engine_schema_version,
                    supported: ENGINE_SCHEMA_VERSION,
                });
            }
            let mtime = script_mtime(&script_path)?;
            self.packs.push(LoadedPack {
                meta,
                dir,
                script_path,
                script_mtime: mtime,
            });
        }
        self.packs.sort_by(|a, b| a.dir.cmp(&b.dir));
        info!(root = %self.root.display(), packs = self.packs.len(), "event packs loaded");
        Ok(self.packs.len())
    }

    /// Ids of packs whose script changed on disk since it was last seen.
    pub fn reload_if_changed(&mut self) -> Result<Vec<String>, PackError> {
        let mut changed = Vec::new();
        for p in &mut self.packs {
            let mtime = script_mtime(&p.script_path)?;
            if mtime > p.script_mtime {
                info!(pack = %p.meta.id, "script changed");
                p.script_mtime = mtime;
                changed.push(p.meta.id.clone());
            }
        }
        Ok(changed)
    }

    /// Evaluate every loaded pack. The result is ordered by tick, then pack.
    pub fn scheduled_events(&self) -> Result<Vec<ScheduledEvent>, PackError> {
        let mut events = Vec::new();
        for p in &self.packs {
            events.extend(self.evaluate(p)?);
        }
        events.sort_by_key(|e| e.at_tick);
        Ok(events)
    }

    /// Events of one pack: the script's, or the metadata fallback.
    pub fn evaluate(&self, pack: &LoadedPack) -> Result<Vec<ScheduledEvent>, PackError> {
        let script = fs::read_to_string(&pack.script_path).map_err(io_error(&pack.script_path))?;
        let events = eval_script(&self.engine, &pack.meta.id, &script)?;
        if !events.is_empty() {
            return Ok(events);
        }
        let meta_path = pack.dir.join(METADATA_FILE);
        let text = fs::read_to_string(&meta_path).map_err(io_error(&meta_path))?;
        let fallback = metadata_event(&pack.meta.id, &text).map_err(|e| match e {
            PackError::Metadata { source, .. } => PackError::Metadata {
                path: meta_path.clone(),
                source,
            },
            other => other,
        })?;
        Ok(fallback.into_iter().collect())
    }
}

fn script_mtime(path: &Path) -> Result<SystemTime, PackError> {
    Ok(fs::metadata(path)
        .map_err(io_error(path))?
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH))
}

/// Load and evaluate every pack under `root`.
pub fn load_event_packs<P: AsRef<Path>>(root: P) -> Result<Vec<ScheduledEvent>, PackError> {
    let mut loader = PackLoader::new(root);
    loader.load_all()?;
    loader.scheduled_events()
}

/// Returns a Rhai engine with the limits used for pack scripts.
pub fn new_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(100_000);
    engine.set_max_expr_depths(64, 32);
    engine.set_max_string_size(4_096);
    engine.set_max_array_size(256);
    engine.set_max_map_size(64);
    engine.on_print(|text| debug!(target: "modkit::script", "{text}"));
    engine
}

/// Evaluate a pack script. `()` yields no events; a map yields one; an
/// array of maps yields one per element.
pub fn eval_script(
    engine: &Engine,
    pack: &str,
    source: &str,
) -> Result<Vec<ScheduledEvent>, PackError> {
    let script_error = |message: String| PackError::Script {
        pack: pack.to_string(),
        message,
    };
    let ast = engine
        .compile(source)
        .map_err(|e| script_error(e.to_string()))?;
    let value = engine
        .eval_ast::<Dynamic>(&ast)
        .map_err(|e| script_error(e.to_string()))?;
    if value.is_unit() {
        return Ok(vec![]);
    }
    if value.is_map() {
        let map = value
            .try_cast::<rhai::Map>()
            .ok_or_else(|| PackError::invalid(pack, "script result is not a map"))?;
        return Ok(vec![event_from_map(pack, &map)?]);
    }
    if value.is_array() {
        let items = value
            .try_cast::<rhai::Array>()
            .ok_or_else(|| PackError::invalid(pack, "script result is not an array"))?;
        return items
            .into_iter()
            .map(|item| {
                item.try_cast::<rhai::Map>()
                    .ok_or_else(|| PackError::invalid(pack, "array elements must be maps"))
                    .and_then(|map| event_from_map(pack, &map))
            })
            .collect();
    }
    Err(PackError::invalid(
        pack,
        format!("script must return a map, an array or (), got {}", value.type_name()),
    ))
}

/// Build an event from a script map.
pub fn event_from_map(pack: &str, map: &rhai::Map) -> Result<ScheduledEvent, PackError> {
    let mut draft = EventDraft::default();
    for (key, value) in map {
        match key.as_str() {
            "tick" => {
                let tick = value
                    .clone()
                    .try_cast::<rhai::INT>()
                    .ok_or_else(|| PackError::invalid(pack, "tick must be an integer"))?;
                draft.tick = Some(
                    u64::try_from(tick)
                        .map_err(|_| PackError::invalid(pack, "tick must not be negative"))?,
                );
            }
            "kind" => draft.kind = Some(text_field(pack, "kind", value)?),
            "title" => draft.title = Some(text_field(pack, "title", value)?),
            "description" => draft.description = text_field(pack, "description", value)?,
            other => {
                let amount = amount(value).ok_or_else(|| {
                    PackError::invalid(pack, format!("{other} must be a number"))
                })?;
                draft.effects.push((other.to_string(), amount));
            }
        }
    }
    draft.finish(pack)
}

fn text_field(pack: &str, field: &str, value: &Dynamic) -> Result<String, PackError> {
    value
        .clone()
        .try_cast::<String>()
        .ok_or_else(|| PackError::invalid(pack, format!("{field} must be a string")))
}

fn amount(value: &Dynamic) -> Option<Decimal> {
    if let Some(i) = value.clone().try_cast::<rhai::INT>() {
        return Some(Decimal::from(i));
    }
    if let Some(d) = value.clone().try_cast::<Decimal>() {
        return Some(d);
    }
    if let Some(f) = value.clone().try_cast::<rhai::FLOAT>() {
        return Decimal::from_f64(f);
    }
    value
        .clone()
        .try_cast::<String>()
        .and_then(|s| Decimal::from_str(s.trim()).ok())
}

#[derive(Default)]
struct EventDraft {
    tick: Option<u64>,
    kind: Option<String>,
    title: Option<String>,
    description: String,
    effects: Vec<(String, Decimal)>,
}

impl EventDraft {
    fn finish(self, pack: &str) -> Result<ScheduledEvent, PackError> {
        let at_tick = self
            .tick
            .ok_or_else(|| PackError::invalid(pack, "missing tick"))?;
        if at_tick == 0 {
            return Err(PackError::invalid(pack, "tick must be at least 1"));
        }
        let kind = self
            .kind
            .ok_or_else(|| PackError::invalid(pack, "missing kind"))?;
        let kind = EventKind::from_str(&kind)
            .map_err(|_| PackError::invalid(pack, format!("unknown event kind {kind}")))?;
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PackError::invalid(pack, "missing title"))?;
        let mut effects = EffectDelta::default();
        for (key, value) in self.effects {
            let key = EffectKey::from_str(&key).map_err(|source| PackError::UnknownKey {
                pack: pack.to_string(),
                source,
            })?;
            effects.set(key, value);
        }
        Ok(ScheduledEvent {
            at_tick,
            kind,
            title,
            description: self.description,
            effects,
        })
    }
}

/// Parse the optional `scheduled_event` block of a metadata file.
pub fn metadata_event(pack: &str, metadata: &str) -> Result<Option<ScheduledEvent>, PackError> {
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct EventBlock {
        tick: u64,
        kind: String,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        effects: serde_yaml::Mapping,
    }
    #[derive(Deserialize)]
    struct MetaFile {
        #[serde(default)]
        scheduled_event: Option<EventBlock>,
    }
    let file: MetaFile = serde_yaml::from_str(metadata).map_err(|source| PackError::Metadata {
        path: PathBuf::from(METADATA_FILE),
        source,
    })?;
    let Some(block) = file.scheduled_event else {
        return Ok(None);
    };
    let mut effects = Vec::with_capacity(block.effects.len());
    for (key, value) in &block.effects {
        let key = key
            .as_str()
            .ok_or_else(|| PackError::invalid(pack, "effect keys must be strings"))?;
        let amount = yaml_amount(value)
            .ok_or_else(|| PackError::invalid(pack, format!("{key} must be a number")))?;
        effects.push((key.to_string(), amount));
    }
    EventDraft {
        tick: Some(block.tick),
        kind: Some(block.kind),
        title: Some(block.title),
        description: block.description,
        effects,
    }
    .finish(pack)
    .map(Some)
}

fn yaml_amount(value: &serde_yaml::Value) -> Option<Decimal> {
    match value {
        serde_yaml::Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        serde_yaml::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

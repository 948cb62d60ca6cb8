//! Reading collections and actors from the command line.

use std::path::Path;

use anyhow::Context;
use clap::Args;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use avo_core::{Actor, Collection, Permission};

/// Who performs the command.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// Profile id of the acting user
    #[arg(long, env = "AVO_PROFILE_ID")]
    pub profile_id: Uuid,

    /// Display name used on edit locks
    #[arg(long)]
    pub display_name: Option<String>,

    /// Granted permission, e.g. edit-own-collections (repeatable)
    #[arg(long = "permission", value_parser = parse_upper_snake::<Permission>)]
    pub permissions: Vec<Permission>,
}

impl ActorArgs {
    pub fn to_actor(&self) -> Actor {
        let mut actor = Actor::new(self.profile_id);
        actor.display_name = self.display_name.clone();
        actor.permissions.extend(self.permissions.iter().copied());
        actor
    }
}

/// Parse a `SCREAMING_SNAKE_CASE` enum written in any case, with `-` or `_`.
pub fn parse_upper_snake<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let normalized = raw.trim().to_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| format!("unknown value: {}", raw))
}

/// Load a collection snapshot from a JSON file.
pub fn read_collection(path: &Path) -> anyhow::Result<Collection> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid collection", path.display()))
}

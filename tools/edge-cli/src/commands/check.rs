//! Configuration check command.

use anyhow::Result;
use edge_executor::{CompiledConfig, PrecacheSource};
use serde::Serialize;

use super::CheckArgs;
use crate::context::Context;

#[derive(Debug, Serialize)]
struct Summary {
    strategy: String,
    cache_key: String,
    routes: usize,
    precache: PrecacheSummary,
    activate_event: Option<String>,
    cache_keys: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum PrecacheSummary {
    Routes(usize),
    Manifest(String),
}

impl Summary {
    fn of(config: &CompiledConfig) -> Self {
        let precache = match config.precache().source() {
            PrecacheSource::Routes(routes) => PrecacheSummary::Routes(routes.len()),
            PrecacheSource::Manifest { url, .. } => PrecacheSummary::Manifest(url.clone()),
        };

        let mut cache_keys: Vec<String> = config.cache_keys().into_iter().collect();
        cache_keys.sort();

        Self {
            strategy: config.root().strategy().name().to_string(),
            cache_key: config.root().cache_key().to_string(),
            routes: config.routes().len(),
            precache,
            activate_event: config.activate().event_type().map(str::to_string),
            cache_keys,
        }
    }
}

/// Run the check command.
pub async fn run(_args: CheckArgs, ctx: &Context) -> Result<()> {
    let config = ctx.compiled()?;
    let summary = Summary::of(&config);

    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    if let Some(path) = &ctx.config_path {
        ctx.output.success(&format!("{} compiles", path.display()));
    }

    ctx.output.header("Configuration");
    ctx.output.kv("Default strategy", &summary.strategy);
    ctx.output.kv("Default cache", &summary.cache_key);
    ctx.output.kv("Routes", &summary.routes.to_string());
    match &summary.precache {
        PrecacheSummary::Routes(count) => ctx.output.kv("Precache", &format!("{} route(s)", count)),
        PrecacheSummary::Manifest(url) => ctx.output.kv("Precache", &format!("manifest {}", url)),
    }
    if let Some(event) = &summary.activate_event {
        ctx.output.kv("Activate event", event);
    }

    ctx.output.header("Cache partitions");
    for key in &summary.cache_keys {
        ctx.output.list_item(key);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_executor::ConfigFile;

    #[test]
    fn test_summary_lists_partitions() {
        let config = ConfigFile::from_toml_str(
            r#"
            strategy = "cache-first"
            methods = ["GET"]

            [precache]
            routes = ["/", "/app.js"]

            [[routes]]
            path_pattern = "^/api/"
            cache_name = "api"
            "#,
        )
        .unwrap()
        .compile()
        .unwrap();

        let summary = Summary::of(&config);
        assert_eq!(summary.strategy, "cache-first");
        assert_eq!(summary.routes, 1);
        assert!(matches!(summary.precache, PrecacheSummary::Routes(2)));
        assert_eq!(summary.cache_keys, vec!["sw-api", "sw-default"]);
    }
}

//! Route listing command.

use anyhow::Result;
use edge_executor::{CompiledConfig, PrecacheSource, RouteConfig};
use serde::Serialize;

use super::RoutesArgs;
use crate::context::Context;

const WIDTHS: [usize; 5] = [6, 14, 32, 24, 20];

#[derive(Debug, Serialize)]
struct RouteRow {
    index: String,
    methods: String,
    pattern: String,
    strategy: String,
    cache_key: String,
}

impl RouteRow {
    fn new(index: impl Into<String>, route: &RouteConfig) -> Self {
        let methods = if route.methods().is_empty() {
            "-".to_string()
        } else {
            route
                .methods()
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };

        Self {
            index: index.into(),
            methods,
            pattern: route.path_pattern().as_str().to_string(),
            strategy: route.strategy().name().to_string(),
            cache_key: route.cache_key().to_string(),
        }
    }

    fn cols(&self) -> [&str; 5] {
        [
            &self.index,
            &self.methods,
            &self.pattern,
            &self.strategy,
            &self.cache_key,
        ]
    }
}

/// Routes in match order, ending with the fallback.
fn rows(config: &CompiledConfig, precache: bool) -> Vec<RouteRow> {
    let mut rows: Vec<RouteRow> = config
        .routes()
        .iter()
        .enumerate()
        .map(|(i, route)| RouteRow::new(i.to_string(), route))
        .collect();
    rows.push(RouteRow::new("*", config.root()));

    if precache {
        if let PrecacheSource::Routes(routes) = config.precache().source() {
            rows.extend(
                routes
                    .iter()
                    .enumerate()
                    .map(|(i, route)| RouteRow::new(format!("p{}", i), route)),
            );
        }
    }

    rows
}

/// Run the routes command.
pub async fn run(args: RoutesArgs, ctx: &Context) -> Result<()> {
    let config = ctx.compiled()?;
    let rows = rows(&config, args.precache);

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    if args.precache {
        if let PrecacheSource::Manifest { url, .. } = config.precache().source() {
            ctx.output
                .warn(&format!("Precache routes come from {} at install time", url));
        }
    }

    ctx.output
        .table_row(&["#", "METHODS", "PATTERN", "STRATEGY", "CACHE"], &WIDTHS);
    ctx.output.table_row(&[&"-".repeat(100)], &[100]);
    for row in &rows {
        ctx.output.table_row(&row.cols(), &WIDTHS);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_executor::ConfigFile;

    #[test]
    fn test_rows_end_with_fallback() {
        let config = ConfigFile::from_toml_str(
            r#"
            methods = ["GET", "HEAD"]

            [precache]
            routes = ["/offline.html"]

            [[routes]]
            path_pattern = "\\.css$"
            strategy = "cache-first"

            [[routes]]
            path = "/health"
            strategy = "network-only"
            "#,
        )
        .unwrap()
        .compile()
        .unwrap();

        let rows = rows(&config, true);
        let patterns: Vec<_> = rows.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["\\.css$", "/health$", ".*$", "/offline\\.html$"]);
        assert_eq!(rows[0].methods, "GET,HEAD");
        assert_eq!(rows[0].strategy, "cache-first");
        assert_eq!(rows[2].index, "*");
        assert_eq!(rows[3].index, "p0");
        assert_eq!(rows[3].strategy, "network-first");
    }
}

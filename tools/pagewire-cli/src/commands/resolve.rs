//! Resolve command.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use pagewire_query::{QueryRegistry, Resolved};
use serde::Serialize;

use super::ResolveArgs;
use crate::context::Context;

#[derive(Debug, Serialize)]
struct Resolution {
    path: String,
    pattern: String,
    kind: String,
    params: BTreeMap<String, String>,
    cache_key: Vec<String>,
    method: String,
    url: String,
}

impl Resolution {
    fn new(path: &str, resolved: &Resolved) -> Self {
        let request = resolved.query.request_spec();
        Self {
            path: path.to_string(),
            pattern: resolved.descriptor.pattern.as_str().to_string(),
            kind: resolved.descriptor.kind.to_string(),
            params: resolved
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            cache_key: resolved.query.cache_key().parts().to_vec(),
            method: request.options.method.to_string(),
            url: request.url,
        }
    }
}

/// Run the resolve command.
pub fn run(args: ResolveArgs, ctx: &Context) -> Result<()> {
    let registry = QueryRegistry::with_defaults();
    let Some(resolved) = registry.resolve(&args.path) else {
        bail!("No page query registered for {}", args.path);
    };
    let resolution = Resolution::new(&args.path, &resolved);

    if ctx.output.is_json() {
        ctx.output.json(&resolution);
        return Ok(());
    }

    ctx.output.header(&resolution.path);
    ctx.output.kv("pattern", &resolution.pattern);
    ctx.output.kv("query", &resolution.kind);
    for (name, value) in &resolution.params {
        ctx.output.kv(&format!("params.{}", name), value);
    }
    ctx.output.kv("cache key", &resolved.query.cache_key().serialized());
    ctx.output
        .kv("request", &format!("{} {}", resolution.method, resolution.url));
    Ok(())
}

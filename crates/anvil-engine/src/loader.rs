//! Manifest loading
//!
//! Turns parsed `anvil.toml` declarations into registry state: variables
//! (platform-conditional values picked once, against the build host),
//! flags, targets, recipes and imports. All `${VAR}` substitution happens
//! here, at declaration time; nothing downstream re-resolves variables.
//!
//! Variable values may reference the seeded builtin variables
//! (`${PLATFORM}`, `${DEBUG}`, ...); targets, flags, commands and the
//! default target may reference any variable of their namespace. Relative
//! concrete paths resolve against the manifest's directory.

use crate::error::{EngineError, EngineResult};
use crate::recipe::{CommandRecipe, Recipe};
use crate::registry::Registry;
use crate::target::{is_virtual_name, NAMESPACE_SEPARATOR};
use anvil_config::{
    ConfigError, FlagCategory, HostPlatform, NamespaceManifest, RecipeDecl, VarMap,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load a manifest (and, recursively, its imports) into the registry.
///
/// Returns the namespace name. Loading the same manifest file twice is a
/// no-op that returns the existing namespace, which is what makes imports
/// idempotent.
pub fn load_project(
    registry: &mut Registry,
    manifest_path: &Path,
    seed: &VarMap,
    platform: HostPlatform,
) -> EngineResult<String> {
    let canonical = manifest_path
        .canonicalize()
        .map_err(|e| EngineError::io(manifest_path, e))?;

    if let Some(existing) = registry.namespace_for_manifest(&canonical) {
        return Ok(existing.to_string());
    }

    let manifest = NamespaceManifest::load_from_file(&canonical)?;
    let dir = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let name = manifest.name.clone();
    let ns = registry.add_namespace(&name)?;
    ns.set_root_dir(&dir);
    // Registered before imports run, so import cycles terminate.
    registry.record_manifest(canonical, &name);

    // Variables: builtin seed first, then the manifest's own. Manifest
    // values may reference the seed.
    {
        let ns = registry.get_mut(&name)?;
        ns.extend_vars(seed);
        for (var_name, value) in &manifest.vars {
            if let Some(raw) = value.resolve(platform) {
                let resolved = substitute(raw, seed)?;
                ns.set_var(var_name, resolved);
            }
        }
    }

    // Imports, in declaration order.
    for import in &manifest.import {
        let import_path = if import.is_absolute() {
            import.clone()
        } else {
            dir.join(import)
        };
        import_namespace(registry, &name, &import_path, seed, platform)?;
    }

    // Flags, resolved against the full variable map.
    let vars = registry.get(&name)?.vars().clone();
    {
        let ns = registry.get_mut(&name)?;
        for (category_name, value) in &manifest.flags {
            let category = FlagCategory::from_name(category_name)?;
            if let Some(values) = value.resolve(platform) {
                let resolved = values
                    .iter()
                    .map(|v| substitute(v, &vars))
                    .collect::<EngineResult<Vec<_>>>()?;
                ns.append_flags(category, resolved);
            }
        }
    }

    // Targets. Names are resolved first (substitution + path rooting needs
    // shared registry access for qualified references), then applied.
    struct Resolved {
        target: String,
        deps: Vec<String>,
        depfile: Option<String>,
        recipe: Option<Recipe>,
    }

    let mut resolved = Vec::with_capacity(manifest.targets.len());
    for decl in &manifest.targets {
        resolved.push(Resolved {
            target: resolve_name(&decl.name, &vars, &dir, registry)?,
            deps: decl
                .deps
                .iter()
                .map(|dep| resolve_name(dep, &vars, &dir, registry))
                .collect::<EngineResult<Vec<_>>>()?,
            depfile: decl
                .depfile
                .as_ref()
                .map(|record| resolve_name(record, &vars, &dir, registry))
                .transpose()?,
            recipe: decl
                .recipe
                .as_ref()
                .map(|recipe| build_recipe(recipe, &vars, &dir, registry))
                .transpose()?,
        });
    }
    let default = manifest
        .default
        .as_ref()
        .map(|target| resolve_name(target, &vars, &dir, registry))
        .transpose()?;

    {
        let ns = registry.get_mut(&name)?;
        for decl in resolved {
            ns.graph_mut().declare(&decl.target)?;
            for producer in &decl.deps {
                ns.add_dep(&decl.target, producer)?;
            }
            if let Some(record) = decl.depfile {
                ns.set_depfile(&decl.target, record)?;
            }
            if let Some(recipe) = decl.recipe {
                ns.set_recipe(&decl.target, recipe)?;
            }
        }
        if let Some(target) = default {
            ns.set_default_target(&target)?;
        }
    }

    Ok(name)
}

/// Import the manifest at `path` into namespace `into`.
///
/// Loads the source (once per registry) and records the import: the
/// source's flags merge into the importer and its targets become
/// resolvable as `source|target` from the importer's scope.
pub fn import_namespace(
    registry: &mut Registry,
    into: &str,
    path: &Path,
    seed: &VarMap,
    platform: HostPlatform,
) -> EngineResult<String> {
    let source = load_project(registry, path, seed, platform)?;
    let source_flags = registry.get(&source)?.flags().clone();
    registry.get_mut(into)?.record_import(&source, &source_flags);
    Ok(source)
}

fn build_recipe(
    decl: &RecipeDecl,
    vars: &VarMap,
    dir: &Path,
    registry: &Registry,
) -> EngineResult<Recipe> {
    match decl {
        RecipeDecl::Command {
            command,
            timeout_secs,
        } => {
            let command = substitute(command, vars)?;
            let mut recipe = CommandRecipe::new(command);
            if let Some(secs) = timeout_secs {
                recipe = recipe.with_timeout(Duration::from_secs(*secs));
            }
            Ok(Recipe::Command(recipe))
        }
        RecipeDecl::Copy { .. } => Ok(Recipe::Copy),
        RecipeDecl::Delete { delete } => {
            let paths = delete
                .iter()
                .map(|p| Ok(PathBuf::from(resolve_name(p, vars, dir, registry)?)))
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(Recipe::Delete(paths))
        }
    }
}

/// Substitute then absolutize a target/path name.
///
/// Local concrete names root at this manifest's directory; the target part
/// of a qualified reference roots at the referenced namespace's directory,
/// which exists by the time targets are processed because imports run first.
fn resolve_name(
    name: &str,
    vars: &VarMap,
    dir: &Path,
    registry: &Registry,
) -> EngineResult<String> {
    let name = substitute(name, vars)?;
    if let Some((ns, rest)) = name.split_once(NAMESPACE_SEPARATOR) {
        if is_virtual_name(rest) || Path::new(rest).is_absolute() {
            return Ok(name);
        }
        let root = registry.get(ns)?.root_dir().map(Path::to_path_buf);
        return Ok(match root {
            Some(root) => format!(
                "{}{}{}",
                ns,
                NAMESPACE_SEPARATOR,
                root.join(rest).to_string_lossy()
            ),
            None => name,
        });
    }
    if is_virtual_name(&name) || Path::new(&name).is_absolute() {
        return Ok(name);
    }
    Ok(dir.join(&name).to_string_lossy().into_owned())
}

/// Expand `${VAR}` references; unknown names fail with `UndefinedVariable`.
pub fn substitute(input: &str, vars: &VarMap) -> EngineResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            EngineError::Config(ConfigError::ValidationError(format!(
                "unclosed '${{' in '{}'",
                input
            )))
        })?;
        out.push_str(vars.get(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

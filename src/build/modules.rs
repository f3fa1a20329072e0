//! Ordering of installed modules for the generator config.

use crate::metadata::ModuleInfo;
use std::collections::HashMap;

/// Module names ordered by dependency depth, then by name.
///
/// A module without installed dependencies has depth 0; every other module
/// sits one level below its deepest dependency. Dependencies that are not
/// installed are ignored, and a dependency cycle is cut where it closes.
pub fn order_by_depth(modules: &[ModuleInfo]) -> Vec<String> {
    let by_name: HashMap<&str, &ModuleInfo> =
        modules.iter().map(|module| (module.name.as_str(), module)).collect();
    let mut depths: HashMap<&str, usize> = HashMap::new();

    for module in modules {
        let mut visiting = Vec::new();
        depth_of(&module.name, &by_name, &mut depths, &mut visiting);
    }

    let mut ordered: Vec<(usize, &str)> = modules
        .iter()
        .map(|module| (depths[module.name.as_str()], module.name.as_str()))
        .collect();
    ordered.sort_unstable();
    ordered.dedup();
    ordered.into_iter().map(|(_, name)| name.to_owned()).collect()
}

fn depth_of<'a>(
    name: &'a str,
    by_name: &HashMap<&'a str, &'a ModuleInfo>,
    depths: &mut HashMap<&'a str, usize>,
    visiting: &mut Vec<&'a str>,
) -> usize {
    if let Some(&depth) = depths.get(name) {
        return depth;
    }
    let Some(&module) = by_name.get(name) else {
        return 0;
    };
    if visiting.contains(&name) {
        return 0;
    }

    visiting.push(name);
    let depth = module
        .depends
        .iter()
        .filter(|dep| by_name.contains_key(dep.as_str()))
        .map(|dep| depth_of(dep, by_name, depths, visiting) + 1)
        .max()
        .unwrap_or(0);
    visiting.pop();

    depths.insert(name, depth);
    depth
}

//! The ports tree's one-line-per-port index (`--index`, §6).
//!
//! Each line's dependency fields are not a port's *direct* dependencies
//! of that kind but the transitive closure reached by walking Lib+Run
//! edges outward from them — the same "what do I need installed to use
//! this" widening `port.py`'s `__recurse_depends` performs, since a
//! build dependency that itself has runtime libraries pulls those in
//! too. The Lib+Run closure of a single origin is the only one ever
//! reused across other origins' index lines, so it is the only one
//! memoized here.

use std::collections::{HashMap, HashSet};

use crate::core::{DependKind, Origin, World};

const WWW_PREFIX: &str = "WWW:";

/// Builds the full index text for every port currently present in
/// `world` (i.e. every origin that reached a constructed `Port`),
/// sorted by origin for reproducible output.
pub fn generate(world: &World) -> String {
    let mut memo: HashMap<Origin, Vec<String>> = HashMap::new();
    let mut origins: Vec<&Origin> = world.ports.keys().collect();
    origins.sort();

    let mut out = String::new();
    for origin in origins {
        out.push_str(&index_line(world, origin, &mut memo));
        out.push('\n');
    }
    out
}

fn index_line(world: &World, origin: &Origin, memo: &mut HashMap<Origin, Vec<String>>) -> String {
    let port = &world.ports[origin];
    let attrs = &port.attrs;

    let portdir = format!("{}/{}", world.tree_root.trim_end_matches('/'), origin);
    let www = www_from_descr(&attrs.descr).unwrap_or_default();

    let field = |kind: DependKind| -> String {
        let direct: Vec<Origin> = attrs.depends_of(kind).iter().map(|e| e.origin.clone()).collect();
        join_sorted_dedup(transitive_pkgnames(world, &direct, memo))
    };

    [
        attrs.pkgname.clone(),
        portdir,
        attrs.prefix.clone(),
        attrs.comment.clone(),
        attrs.descr.clone(),
        attrs.maintainer.clone(),
        attrs.categories.join(" "),
        field(DependKind::Build),
        field(DependKind::Run),
        www,
        field(DependKind::Extract),
        field(DependKind::Patch),
        field(DependKind::Fetch),
    ]
    .join("|")
}

/// The transitive Lib+Run closure of `roots`, as sorted deduplicated
/// `PKGNAME`s.
fn transitive_pkgnames(
    world: &World,
    roots: &[Origin],
    memo: &mut HashMap<Origin, Vec<String>>,
) -> Vec<String> {
    let mut names: HashSet<String> = HashSet::new();
    for root in roots {
        for name in closure_of(world, root, memo) {
            names.insert(name.clone());
        }
    }
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort();
    names.dedup();
    names
}

/// The memoized Lib+Run closure *of a single origin*, including its own
/// `PKGNAME`.
fn closure_of<'a>(
    world: &World,
    origin: &Origin,
    memo: &'a mut HashMap<Origin, Vec<String>>,
) -> &'a [String] {
    if !memo.contains_key(origin) {
        let mut seen: HashSet<Origin> = HashSet::new();
        let mut stack = vec![origin.clone()];
        let mut names: HashSet<String> = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(port) = world.ports.get(&current) {
                names.insert(port.attrs.pkgname.clone());
            }
            if let Some(handler) = world.depends.get(&current) {
                for kind in [DependKind::Lib, DependKind::Run] {
                    stack.extend(handler.dependencies_of(kind).iter().cloned());
                }
            }
        }
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        memo.insert(origin.clone(), names);
    }
    memo.get(origin).map(Vec::as_slice).unwrap_or(&[])
}

fn join_sorted_dedup(mut names: Vec<String>) -> String {
    names.sort();
    names.dedup();
    names.join(" ")
}

/// Scans a `DESCR_FILE`'s contents for the first `^WWW:\s*(.*)$` line,
/// prefixing `http://` when the captured value has no scheme, matching
/// `port.py`'s plain-text scan rather than reaching for a regex crate
/// over one fixed prefix.
fn www_from_descr(descr_path: &str) -> Option<String> {
    if descr_path.is_empty() {
        return None;
    }
    let text = std::fs::read_to_string(descr_path).ok()?;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(WWW_PREFIX) {
            let value = rest.trim();
            if value.is_empty() {
                continue;
            }
            return Some(if value.contains("://") {
                value.to_string()
            } else {
                format!("http://{value}")
            });
        }
    }
    None
}

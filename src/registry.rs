//! Build registry
//!
//! Owns every processed unit keyed by canonical path, plus the include
//! edges between them. Edges are stored on both ends: `includes` on the
//! includer, `included_by` on the target. A unit is present (ends up in the
//! artifact) while something includes it or it is the entry.
//!
//! Cascades over the graph use explicit worklists; include graphs can be deep
//! and may contain cycles.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::module_id::ModuleId;

/// One processed file
#[derive(Debug, Clone)]
pub struct Unit {
    path: PathBuf,
    module_id: ModuleId,
    body: String,
    /// Target -> every include site of it is `_once`
    includes: IndexMap<PathBuf, bool>,
    included_by: BTreeSet<PathBuf>,
    entry: bool,
}

impl Unit {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Module definition emitted into the artifact
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Files this unit includes, in source order
    pub fn includes(&self) -> impl Iterator<Item = &Path> {
        self.includes.keys().map(PathBuf::as_path)
    }

    /// Whether every include of `target` in this unit is a `_once` one
    pub fn includes_once(&self, target: &Path) -> bool {
        self.includes.get(target).copied().unwrap_or(false)
    }

    /// Files currently including this unit
    pub fn included_by(&self) -> impl Iterator<Item = &Path> {
        self.included_by.iter().map(PathBuf::as_path)
    }

    pub fn is_entry(&self) -> bool {
        self.entry
    }

    /// The entry counts as permanently included
    pub fn is_present(&self) -> bool {
        self.entry || !self.included_by.is_empty()
    }
}

/// Path -> unit map in first-registration order
#[derive(Debug, Default)]
pub struct Registry {
    units: IndexMap<PathBuf, Unit>,
    entry: Option<PathBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&Unit> {
        self.units.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.units.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn entry(&self) -> Option<&Path> {
        self.entry.as_deref()
    }

    /// All units in build order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units that belong in the artifact, in build order
    pub fn present_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|unit| unit.is_present())
    }

    /// Store the result of processing `path`.
    ///
    /// A new unit is appended to the build order. Reprocessing keeps the
    /// unit's position and incoming edges but forgets its outgoing ones; the
    /// caller re-links whatever the new content includes. Returns `true` if
    /// the unit is new.
    pub fn register(&mut self, path: &Path, module_id: ModuleId, body: String) -> bool {
        if let Some(unit) = self.units.get_mut(path) {
            unit.module_id = module_id;
            unit.body = body;
            let old = std::mem::take(&mut unit.includes);
            for target in old.into_keys() {
                if let Some(target) = self.units.get_mut(&target) {
                    target.included_by.remove(path);
                }
            }
            return false;
        }

        self.units.insert(
            path.to_path_buf(),
            Unit {
                path: path.to_path_buf(),
                module_id,
                body,
                includes: IndexMap::new(),
                included_by: BTreeSet::new(),
                entry: false,
            },
        );
        true
    }

    /// Record that `from` includes `to`, through a `_once` form or not.
    ///
    /// Both units must be registered. Linking twice keeps one edge, which
    /// stays `_once` only if every link was. If `to` was not present before,
    /// its own includes are revived as well.
    pub fn link(&mut self, from: &Path, to: &Path, once: bool) {
        if !self.units.contains_key(to) {
            return;
        }
        match self.units.get_mut(from) {
            Some(unit) => {
                unit.includes
                    .entry(to.to_path_buf())
                    .and_modify(|all_once| *all_once &= once)
                    .or_insert(once);
            }
            None => return,
        }
        let Some(target) = self.units.get_mut(to) else {
            return;
        };
        let was_present = target.is_present();
        target.included_by.insert(from.to_path_buf());
        if !was_present {
            self.register_includes(to);
        }
    }

    /// Re-add `path` as an includer of everything it includes.
    ///
    /// Targets that become present again have their own includes re-added,
    /// undoing a `remove_abandoned` cascade.
    pub fn register_includes(&mut self, path: &Path) {
        let mut work = vec![path.to_path_buf()];
        while let Some(current) = work.pop() {
            for target in self.includes_of(&current) {
                let Some(unit) = self.units.get_mut(&target) else {
                    continue;
                };
                let was_present = unit.is_present();
                if unit.included_by.insert(current.clone()) && !was_present {
                    work.push(target);
                }
            }
        }
    }

    /// Withdraw `path` from everything it includes.
    ///
    /// A target left without includers withdraws from its own includes in
    /// turn. Outgoing edge sets are kept so `register_includes` can restore
    /// them.
    pub fn remove_abandoned(&mut self, path: &Path) {
        let mut work = vec![path.to_path_buf()];
        while let Some(current) = work.pop() {
            for target in self.includes_of(&current) {
                let Some(unit) = self.units.get_mut(&target) else {
                    continue;
                };
                if unit.included_by.remove(&current) && !unit.is_present() {
                    work.push(target);
                }
            }
        }
    }

    /// Put back a unit saved before a failed reprocess.
    ///
    /// Edges linked since the snapshot are withdrawn, then the saved module,
    /// body and includes are wired up again. Incoming edges and the entry pin
    /// are left as they are.
    pub fn restore(&mut self, saved: Unit) {
        let path = saved.path.clone();
        if !self.units.contains_key(&path) {
            return;
        }
        self.remove_abandoned(&path);
        if let Some(unit) = self.units.get_mut(&path) {
            unit.module_id = saved.module_id;
            unit.body = saved.body;
            unit.includes = saved.includes;
        }
        self.register_includes(&path);
    }

    /// Shortest chain of non-`_once` includes leading from `from` to `to`.
    ///
    /// The chain starts with `from` and ends with `to`. A plain include of
    /// `from` by `to` would then close a cycle nothing stops at run time.
    pub fn unguarded_path(&self, from: &Path, to: &Path) -> Option<Vec<PathBuf>> {
        let mut parents: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut seen = HashSet::from([from.to_path_buf()]);
        let mut queue = VecDeque::from([from.to_path_buf()]);
        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut chain = vec![current];
                let mut cursor = to;
                while let Some(parent) = parents.get(cursor) {
                    chain.push(parent.clone());
                    cursor = parent.as_path();
                }
                chain.reverse();
                return Some(chain);
            }
            let Some(unit) = self.units.get(&current) else {
                continue;
            };
            for (target, once) in &unit.includes {
                if !*once && seen.insert(target.clone()) {
                    parents.insert(target.clone(), current.clone());
                    queue.push_back(target.clone());
                }
            }
        }
        None
    }

    /// Pin `path` as the entry, unpinning the previous one.
    ///
    /// Returns `false` if `path` has no unit.
    pub fn put_entry(&mut self, path: &Path) -> bool {
        if !self.units.contains_key(path) {
            return false;
        }
        if let Some(previous) = self.entry.take() {
            if let Some(unit) = self.units.get_mut(&previous) {
                unit.entry = false;
            }
        }
        if let Some(unit) = self.units.get_mut(path) {
            unit.entry = true;
        }
        self.entry = Some(path.to_path_buf());
        true
    }

    /// Drop a unit and every edge touching it
    pub fn remove(&mut self, path: &Path) -> Option<Unit> {
        let unit = self.units.shift_remove(path)?;
        for target in unit.includes.keys() {
            if let Some(target) = self.units.get_mut(target) {
                target.included_by.remove(path);
            }
        }
        for includer in &unit.included_by {
            if let Some(includer) = self.units.get_mut(includer) {
                includer.includes.shift_remove(path);
            }
        }
        if self.entry.as_deref() == Some(path) {
            self.entry = None;
        }
        Some(unit)
    }

    /// Remove every unit that is no longer part of the build.
    ///
    /// Non-present units are removed until a pass removes nothing. Once an
    /// entry is pinned, groups of units that only include each other (an
    /// orphaned `_once` cycle) are removed too. Returns the removed paths in
    /// removal order.
    pub fn prune(&mut self) -> Vec<PathBuf> {
        let mut pruned = Vec::new();
        loop {
            let doomed: Vec<PathBuf> = self
                .units
                .values()
                .filter(|unit| !unit.is_present())
                .map(|unit| unit.path.clone())
                .collect();
            if doomed.is_empty() {
                break;
            }
            for path in doomed {
                self.remove(&path);
                pruned.push(path);
            }
        }

        if let Some(entry) = self.entry.clone() {
            let live = self.reachable_from(&entry);
            let orphaned: Vec<PathBuf> = self
                .units
                .keys()
                .filter(|path| !live.contains(*path))
                .cloned()
                .collect();
            for path in orphaned {
                self.remove(&path);
                pruned.push(path);
            }
        }
        pruned
    }

    fn includes_of(&self, path: &Path) -> Vec<PathBuf> {
        self.units
            .get(path)
            .map(|unit| unit.includes.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn reachable_from(&self, root: &Path) -> HashSet<PathBuf> {
        let mut seen = HashSet::new();
        let mut work = vec![root.to_path_buf()];
        while let Some(current) = work.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            work.extend(self.includes_of(&current));
        }
        seen
    }
}

//! Collected-type registry.
//!
//! Name-keyed side tables of the functions, classes, records and aliases
//! discovered while normalizing. An entry is claimed (provisional) before the
//! recognizer descends into the type's members and finalized afterwards; a
//! rediscovery while the entry is provisional yields a `Reference` instead of
//! recursing again. First write wins.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ExtractError;
use crate::node::Node;
use crate::raw::RawType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectedKind {
    Function,
    Class,
    Record,
    Alias,
}

impl CollectedKind {
    pub const ALL: [CollectedKind; 4] = [
        CollectedKind::Class,
        CollectedKind::Record,
        CollectedKind::Function,
        CollectedKind::Alias,
    ];
}

impl fmt::Display for CollectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectedKind::Function => "function",
            CollectedKind::Class => "class",
            CollectedKind::Record => "record",
            CollectedKind::Alias => "alias",
        })
    }
}

/// Outcome of a registry probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Nothing under that name. After [`Registry::claim`] the caller now owns
    /// the provisional entry and must finalize or abandon it.
    Vacant,
    /// Provisional entry; the type is being built further up the call tree.
    InProgress,
    Done(Node),
}

#[derive(Debug, Clone)]
struct Entry {
    source: RawType,         // the descriptor the entry was claimed for
    node: Option<Node>,      // None while provisional
    claimed_at: u64,         // position in claim order, across all tables
}

#[derive(Debug, Default)]
pub struct Registry {
    next_claim: u64,
    functions: IndexMap<String, Entry>,
    classes: IndexMap<String, Entry>,
    records: IndexMap<String, Entry>,
    aliases: IndexMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    fn table(&self, kind: CollectedKind) -> &IndexMap<String, Entry> {
        match kind {
            CollectedKind::Function => &self.functions,
            CollectedKind::Class => &self.classes,
            CollectedKind::Record => &self.records,
            CollectedKind::Alias => &self.aliases,
        }
    }

    fn table_mut(&mut self, kind: CollectedKind) -> &mut IndexMap<String, Entry> {
        match kind {
            CollectedKind::Function => &mut self.functions,
            CollectedKind::Class => &mut self.classes,
            CollectedKind::Record => &mut self.records,
            CollectedKind::Alias => &mut self.aliases,
        }
    }

    /// Read-only probe, used when only a name is known.
    pub fn lookup(&self, kind: CollectedKind, name: &str) -> Lookup {
        match self.table(kind).get(name) {
            None => Lookup::Vacant,
            Some(Entry { node: None, .. }) => Lookup::InProgress,
            Some(Entry { node: Some(node), .. }) => Lookup::Done(node.clone()),
        }
    }

    /// Read-check-insert in one step: installs a provisional entry when the
    /// name is free. A name already claimed for a different descriptor is a
    /// conflict.
    pub fn claim(&mut self, kind: CollectedKind, name: &str, source: &RawType) -> Result<Lookup, ExtractError> {
        if !self.table(kind).contains_key(name) {
            let claimed_at = self.next_claim;
            self.next_claim += 1;
            self.table_mut(kind)
                .insert(name.to_string(), Entry { source: source.clone(), node: None, claimed_at });
            return Ok(Lookup::Vacant);
        }
        match self.table(kind).get(name) {
            None => Ok(Lookup::Vacant),
            Some(entry) if entry.source != *source => Err(ExtractError::RegistryConflict {
                kind,
                name: name.to_string(),
            }),
            Some(Entry { node: None, .. }) => Ok(Lookup::InProgress),
            Some(Entry { node: Some(node), .. }) => Ok(Lookup::Done(node.clone())),
        }
    }

    /// Completes a provisional entry and returns the stored node. Finalizing
    /// an already finalized name is a no-op when the shapes agree.
    pub fn finalize(&mut self, kind: CollectedKind, name: &str, node: Node) -> Result<Node, ExtractError> {
        let Some(entry) = self.table_mut(kind).get_mut(name) else {
            return Err(ExtractError::Unclaimed { kind, name: name.to_string() });
        };
        if let Some(existing) = &entry.node {
            return if *existing == node {
                Ok(existing.clone())
            } else {
                Err(ExtractError::RegistryConflict { kind, name: name.to_string() })
            };
        }
        entry.node = Some(node.clone());
        Ok(node)
    }

    /// Drops a provisional entry whose build failed, together with every
    /// entry claimed after it. Those were built inside the failed build and
    /// may hold `Reference`s to the dropped name. Finalized entries stay.
    pub fn abandon(&mut self, kind: CollectedKind, name: &str) {
        let cutoff = match self.table(kind).get(name) {
            Some(Entry { node: None, claimed_at, .. }) => *claimed_at,
            _ => return,
        };
        for kind in CollectedKind::ALL {
            self.table_mut(kind).retain(|_, entry| entry.claimed_at < cutoff);
        }
    }

    pub fn get(&self, kind: CollectedKind, name: &str) -> Option<&Node> {
        self.table(kind).get(name).and_then(|e| e.node.as_ref())
    }

    /// Finalized entries of one kind, in discovery order.
    pub fn iter(&self, kind: CollectedKind) -> impl Iterator<Item = (&str, &Node)> {
        self.table(kind)
            .iter()
            .filter_map(|(k, e)| e.node.as_ref().map(|n| (k.as_str(), n)))
    }

    pub fn catalog(&self) -> Catalog {
        let collect = |kind: CollectedKind| {
            self.iter(kind)
                .map(|(k, n)| (k.to_string(), n.clone()))
                .collect::<IndexMap<_, _>>()
        };
        Catalog {
            functions: collect(CollectedKind::Function),
            classes: collect(CollectedKind::Class),
            records: collect(CollectedKind::Record),
            aliases: collect(CollectedKind::Alias),
        }
    }
}

/// Flattened snapshot of everything collected so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub functions: IndexMap<String, Node>,
    pub classes: IndexMap<String, Node>,
    pub records: IndexMap<String, Node>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub aliases: IndexMap<String, Node>,
}

impl Catalog {
    pub fn get(&self, kind: CollectedKind, name: &str) -> Option<&Node> {
        match kind {
            CollectedKind::Function => self.functions.get(name),
            CollectedKind::Class => self.classes.get(name),
            CollectedKind::Record => self.records.get(name),
            CollectedKind::Alias => self.aliases.get(name),
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.classes.len() + self.records.len() + self.aliases.len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

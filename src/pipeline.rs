//! Recognition pipeline.
//!
//! A [`Pipeline`] owns an ordered list of [`Recognizer`]s and a collected-type
//! [`Registry`]. `normalize` walks the list once, returns the first claim, and
//! falls back to `Node::Unknown`. Recognizers recurse into nested type
//! arguments through the `&Pipeline` they are handed, so recursion depth
//! follows the nesting depth of the raw type.

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use crate::error::ExtractError;
use crate::node::{Node, ReferenceNode};
use crate::options::OptionSet;
use crate::raw::RawType;
use crate::recognizers;
use crate::registry::{Catalog, CollectedKind, Lookup, Registry};

/// What a recognizer hands back: `Ok(None)` declines, `Ok(Some(_))` claims,
/// `Err(_)` is malformed input inside the recognizer's own domain.
pub type Recognized = Result<Option<Node>, ExtractError>;

/// Parameter names never emitted by [`Pipeline::params_to_nodes`].
pub const RESERVED_PARAMS: [&str; 3] = ["self", "return", "_cls"];

/// One predicate+constructor unit of the pipeline.
///
/// Must decline (not fail) on raw types outside its domain, must be
/// deterministic, and may only mutate state through the registry helpers on
/// [`Pipeline`]. Plain functions of the right shape implement it.
pub trait Recognizer: Send + Sync {
    fn try_match(&self, raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Recognizer for F
where
    F: Fn(&RawType, &Pipeline, &OptionSet) -> Recognized + Send + Sync,
{
    fn try_match(&self, raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
        self(raw, pipeline, options)
    }
}

pub struct Pipeline {
    recognizers: Vec<Box<dyn Recognizer>>,
    definitions: IndexMap<String, RawType>,
    registry: Mutex<Registry>,
    // held for a whole collected build; only the building thread sees its
    // provisional entries
    building: ReentrantMutex<()>,
}

impl Default for Pipeline {
    fn default() -> Self { Self::standard() }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("recognizers", &self.recognizer_names())
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Pipeline {
    /// Pipeline with a caller-chosen recognizer order.
    pub fn new(recognizers: Vec<Box<dyn Recognizer>>) -> Self {
        Self {
            recognizers,
            definitions: IndexMap::new(),
            registry: Mutex::new(Registry::new()),
            building: ReentrantMutex::new(()),
        }
    }

    /// The stock recognizer order.
    pub fn standard() -> Self {
        Self::new(recognizers::standard())
    }

    /// Appends a recognizer after the existing ones.
    pub fn push(mut self, recognizer: impl Recognizer + 'static) -> Self {
        self.recognizers.push(Box::new(recognizer));
        self
    }

    /// Inserts a recognizer at `index`, giving it priority over everything after it.
    pub fn insert(mut self, index: usize, recognizer: impl Recognizer + 'static) -> Self {
        let index = index.min(self.recognizers.len());
        self.recognizers.insert(index, Box::new(recognizer));
        self
    }

    /// Descriptors that `RawType::Ref` handles resolve against.
    pub fn with_definitions(mut self, definitions: IndexMap<String, RawType>) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn definition(&self, name: &str) -> Option<&RawType> {
        self.definitions.get(name)
    }

    pub fn recognizer_names(&self) -> Vec<&str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    /// Turns one raw type into exactly one node.
    pub fn normalize(&self, raw: &RawType, options: &OptionSet) -> Result<Node, ExtractError> {
        for recognizer in &self.recognizers {
            if let Some(node) = recognizer.try_match(raw, self, options)? {
                trace!(recognizer = recognizer.name(), raw = %raw.label(), "claimed");
                return Ok(node);
            }
        }
        debug!(raw = %raw.label(), "no recognizer claimed type; using unknown");
        Ok(Node::Unknown)
    }

    /// Normalizes a callable's parameters in `ordered_names` order, skipping
    /// [`RESERVED_PARAMS`]. A name missing from `params` has no annotation and
    /// is normalized as `RawType::Empty`.
    pub fn params_to_nodes(
        &self,
        params: &HashMap<String, RawType>,
        ordered_names: &[String],
        options: &OptionSet,
    ) -> Result<IndexMap<String, Node>, ExtractError> {
        let mut out = IndexMap::with_capacity(ordered_names.len());
        for name in ordered_names {
            if RESERVED_PARAMS.contains(&name.as_str()) {
                continue;
            }
            let raw = params.get(name).unwrap_or(&RawType::Empty);
            out.insert(name.clone(), self.normalize(raw, options)?);
        }
        Ok(out)
    }

    // -------------------- registry --------------------

    /// Builds a registry-backed node with the provisional-entry protocol.
    ///
    /// A finalized entry is returned as-is, a provisional one as a
    /// `Reference`, and otherwise `build` runs with the name claimed. A failed
    /// build releases the claim before the error propagates.
    ///
    /// Builds on other threads wait for the current one to finish, so a
    /// provisional entry is only ever seen by the cycle that claimed it.
    pub fn collect<F>(&self, kind: CollectedKind, name: &str, source: &RawType, build: F) -> Result<Node, ExtractError>
    where
        F: FnOnce() -> Result<Node, ExtractError>,
    {
        let _building = self.building.lock();
        // the registry lock is never held across `build`, which re-enters `normalize`
        let claim = self.registry.lock().claim(kind, name, source)?;
        match claim {
            Lookup::Done(node) => return Ok(node),
            Lookup::InProgress => {
                trace!(%kind, name, "cycle; emitting reference");
                return Ok(Node::Reference(ReferenceNode { name: name.to_string(), target: kind }));
            }
            Lookup::Vacant => {}
        }
        match build() {
            Ok(node) => {
                debug!(%kind, name, "collected");
                self.registry.lock().finalize(kind, name, node)
            }
            Err(error) => {
                self.registry.lock().abandon(kind, name);
                Err(error)
            }
        }
    }

    /// Read-only registry probe by name across `kinds`, first hit wins.
    pub fn lookup(&self, kinds: &[CollectedKind], name: &str) -> Option<Node> {
        let _building = self.building.lock();
        let registry = self.registry.lock();
        kinds.iter().find_map(|&kind| match registry.lookup(kind, name) {
            Lookup::Vacant => None,
            Lookup::InProgress => Some(Node::Reference(ReferenceNode { name: name.to_string(), target: kind })),
            Lookup::Done(node) => Some(node),
        })
    }

    pub fn collected(&self, kind: CollectedKind, name: &str) -> Option<Node> {
        self.registry.lock().get(kind, name).cloned()
    }

    pub fn catalog(&self) -> Catalog {
        self.registry.lock().catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ClassNode;
    use crate::options::ExtractOption;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn int() -> RawType { RawType::builtin("int") }
    fn str_() -> RawType { RawType::builtin("str") }

    #[test]
    fn dict_of_str_to_list_of_int() {
        let raw = RawType::generic("dict", vec![str_(), RawType::generic("list", vec![int()])]);
        let node = Pipeline::standard().normalize(&raw, &OptionSet::default()).unwrap();
        assert_eq!(node, Node::dict(Node::builtin("str"), Node::list(Node::builtin("int"))));
    }

    #[test]
    fn unrecognized_types_fall_back_to_unknown() {
        let pipeline = Pipeline::standard();
        for raw in [RawType::Empty, RawType::Any, RawType::Opaque { repr: "<x>".into() }, RawType::reference("nowhere.X")] {
            assert_eq!(pipeline.normalize(&raw, &OptionSet::default()).unwrap(), Node::Unknown);
        }
        let bare = Pipeline::new(Vec::new());
        assert_eq!(bare.normalize(&int(), &OptionSet::default()).unwrap(), Node::Unknown);
    }

    #[test]
    fn first_claim_short_circuits() {
        static LATER_CALLS: AtomicUsize = AtomicUsize::new(0);

        fn shadow_ints(raw: &RawType, _: &Pipeline, _: &OptionSet) -> Recognized {
            Ok(matches!(raw, RawType::Builtin { name } if name == "int").then(|| Node::builtin("integer")))
        }
        fn counting(_: &RawType, _: &Pipeline, _: &OptionSet) -> Recognized {
            LATER_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        let pipeline = Pipeline::standard().insert(0, shadow_ints).insert(1, counting);
        let node = pipeline.normalize(&int(), &OptionSet::default()).unwrap();
        assert_eq!(node, Node::builtin("integer"));
        assert_eq!(LATER_CALLS.load(Ordering::SeqCst), 0);

        let node = pipeline.normalize(&str_(), &OptionSet::default()).unwrap();
        assert_eq!(node, Node::builtin("str"));
        assert_eq!(LATER_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recognizer_errors_propagate() {
        let raw = RawType::generic("list", vec![RawType::generic("dict", vec![int()])]);
        let err = Pipeline::standard().normalize(&raw, &OptionSet::default()).unwrap_err();
        assert_eq!(err, ExtractError::Arity { origin: "dict".into(), expected: "2", found: 1 });
    }

    #[test]
    fn normalize_is_idempotent() {
        let pipeline = Pipeline::standard();
        let raw = RawType::class("a.Point", [("x", int()), ("tags", RawType::generic("list", vec![str_()]))]);
        let first = pipeline.normalize(&raw, &OptionSet::default()).unwrap();
        let second = pipeline.normalize(&raw, &OptionSet::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(Pipeline::standard().normalize(&raw, &OptionSet::default()).unwrap(), first);
    }

    #[test]
    fn self_referential_class_terminates() {
        let tree = RawType::class("a.Tree", [
            ("value", int()),
            ("children", RawType::generic("list", vec![RawType::reference("a.Tree")])),
        ]);
        let pipeline = Pipeline::standard();
        let node = pipeline.normalize(&tree, &OptionSet::default()).unwrap();

        let Node::Class(ClassNode { fields, .. }) = &node else { panic!("expected class, got {node:?}") };
        assert_eq!(fields["children"], Node::list(Node::reference("a.Tree", CollectedKind::Class)));
        assert_eq!(pipeline.collected(CollectedKind::Class, "a.Tree"), Some(node));
    }

    #[test]
    fn mutually_referential_definitions_terminate() {
        let definitions: IndexMap<String, RawType> = [
            ("a.Author".to_string(), RawType::class("a.Author", [("books", RawType::generic("list", vec![RawType::reference("a.Book")]))])),
            ("a.Book".to_string(), RawType::class("a.Book", [("author", RawType::reference("a.Author"))])),
        ].into_iter().collect();
        let pipeline = Pipeline::standard().with_definitions(definitions);
        let author = pipeline.normalize(&RawType::reference("a.Author"), &OptionSet::default()).unwrap();

        let Node::Class(author) = author else { panic!("expected class") };
        let Node::List(books) = &author.fields["books"] else { panic!("expected list") };
        let Node::Class(book) = books.element.as_ref() else { panic!("expected class") };
        assert_eq!(book.fields["author"], Node::reference("a.Author", CollectedKind::Class));

        let catalog = pipeline.catalog();
        assert_eq!(catalog.classes.keys().collect::<Vec<_>>(), vec!["a.Author", "a.Book"]);
    }

    #[test]
    fn params_follow_the_given_order_and_skip_reserved_names() {
        let params: HashMap<String, RawType> = [
            ("a".to_string(), int()),
            ("c".to_string(), str_()),
            ("b".to_string(), RawType::None),
            ("self".to_string(), RawType::builtin("object")),
            ("return".to_string(), int()),
        ].into_iter().collect();
        let names: Vec<String> = ["self", "b", "a", "c", "_cls"].iter().map(|s| s.to_string()).collect();

        let nodes = Pipeline::standard().params_to_nodes(&params, &names, &OptionSet::default()).unwrap();
        assert_eq!(nodes.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(nodes["b"], Node::None);
        assert_eq!(nodes["a"], Node::builtin("int"));
    }

    #[test]
    fn missing_annotation_is_not_none() {
        let names = vec!["x".to_string()];
        let nodes = Pipeline::standard().params_to_nodes(&HashMap::new(), &names, &OptionSet::default()).unwrap();
        assert_eq!(nodes["x"], Node::Unknown);
    }

    #[test]
    fn options_reach_nested_positions() {
        let options = OptionSet::default().with(ExtractOption::CollapseOptional);
        let raw = RawType::generic("list", vec![RawType::union(vec![int(), RawType::None])]);
        let node = Pipeline::standard().normalize(&raw, &options).unwrap();
        assert_eq!(node.to_string(), "List[Optional[int]]");
    }

    #[test]
    fn failed_build_releases_the_claim() {
        let bad = RawType::class("a.Bad", [("x", RawType::generic("list", vec![int(), int()]))]);
        let pipeline = Pipeline::standard();
        assert!(pipeline.normalize(&bad, &OptionSet::default()).is_err());
        assert!(pipeline.catalog().is_empty());
        assert_eq!(pipeline.lookup(&[CollectedKind::Class], "a.Bad"), None);
    }

    #[test]
    fn failed_build_drops_what_it_collected() {
        let definitions: IndexMap<String, RawType> = [
            ("a.Outer".to_string(), RawType::class("a.Outer", [
                ("inner", RawType::reference("a.Inner")),
                ("bad", RawType::generic("list", vec![int(), int()])),
            ])),
            ("a.Inner".to_string(), RawType::class("a.Inner", [("back", RawType::reference("a.Outer"))])),
        ].into_iter().collect();
        let pipeline = Pipeline::standard().with_definitions(definitions);
        assert!(pipeline.normalize(&RawType::reference("a.Outer"), &OptionSet::default()).is_err());
        assert!(pipeline.catalog().is_empty());
    }

    #[test]
    fn threads_sharing_a_pipeline_agree() {
        fn slow(raw: &RawType, _: &Pipeline, _: &OptionSet) -> Recognized {
            let RawType::Builtin { name } = raw else { return Ok(None) };
            if name != "slow" {
                return Ok(None);
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
            Ok(Some(Node::builtin("slow")))
        }

        let pipeline = Pipeline::standard().insert(0, slow);
        let raw = RawType::class("a.P", [("x", RawType::builtin("slow"))]);
        let (a, b) = std::thread::scope(|scope| {
            let a = scope.spawn(|| pipeline.normalize(&raw, &OptionSet::default()).unwrap());
            let b = scope.spawn(|| pipeline.normalize(&raw, &OptionSet::default()).unwrap());
            (a.join().unwrap(), b.join().unwrap())
        });
        assert!(matches!(a, Node::Class(_)), "{a:?}");
        assert_eq!(a, b);
        assert_eq!(pipeline.catalog().classes.len(), 1);
    }

    #[test]
    fn standard_order_is_stable() {
        let pipeline = Pipeline::standard();
        let names = pipeline.recognizer_names();
        let short: Vec<&str> = names.iter().map(|n| n.rsplit("::").next().unwrap()).collect();
        assert_eq!(short.first(), Some(&"enum_found"));
        assert_eq!(short.last(), Some(&"builtin_found"));
        assert_eq!(short.len(), 16);
    }
}

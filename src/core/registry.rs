//! Hierarchical logger registry
//!
//! Loggers are identified by `/`-delimited names and form a virtual tree: the
//! parent of `"a/b/c"` is the nearest registered node among `"a/b"`, `"a"` and
//! finally the root `""`. Nothing stores parent links, so nodes can be created
//! in any order.
//!
//! A logging call walks from its node toward the root. Each visited node whose
//! threshold admits the record and which has at least one handler passes the
//! record to all of its handlers; the walk continues while `use_parent` holds.
//!
//! Lock order: a walk holds at most one lock at a time. It snapshots a node
//! under the node lock, releases it, looks the parent up under the registry
//! lock, releases that, then moves on. Handlers run with no lock held.

use super::formatter::SourceTrimmer;
use super::handler::HandlerRef;
use super::level::Level;
use super::record::{Location, LogRecord};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Separator between name segments
pub const NAME_SEPARATOR: char = '/';

/// Name of the root logger
pub const ROOT_NAME: &str = "";

struct NodeState {
    level: Level,
    handlers: HashMap<String, HandlerRef>,
    use_parent: bool,
}

struct Node {
    name: String,
    state: Mutex<NodeState>,
}

impl Node {
    fn new(name: &str, use_parent: bool) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(NodeState {
                level: Level::Off,
                handlers: HashMap::new(),
                use_parent,
            }),
        }
    }

    fn handlers(&self) -> Vec<HandlerRef> {
        self.state.lock().handlers.values().cloned().collect()
    }
}

struct RegistryInner {
    nodes: Mutex<HashMap<String, Arc<Node>>>,
    trimmer: RwLock<SourceTrimmer>,
}

impl RegistryInner {
    /// Nearest registered ancestor of `name`. The root has none.
    fn parent_of(&self, name: &str) -> Option<Arc<Node>> {
        if name == ROOT_NAME {
            return None;
        }

        let nodes = self.nodes.lock();
        let mut current = name;
        while let Some(pos) = current.rfind(NAME_SEPARATOR) {
            current = &current[..pos];
            if let Some(node) = nodes.get(current) {
                return Some(Arc::clone(node));
            }
        }
        nodes.get(ROOT_NAME).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<Node>> {
        self.nodes.lock().values().cloned().collect()
    }
}

/// Owner of the logger tree
///
/// Cheap to clone; clones share the same tree.
///
/// # Example
/// ```
/// use rust_hierlog::prelude::*;
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let memory = Arc::new(MemoryHandler::new());
///
/// let root = registry.logger("");
/// root.set_level(Level::Info);
/// root.add_handler("memory", memory.clone());
///
/// registry.logger("server/http").info("listening");
/// registry.logger("server/http").debug("not admitted");
///
/// assert_eq!(memory.len(), 1);
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Registry with a bare root: threshold `OFF`, no handlers.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_NAME.to_string(), Arc::new(Node::new(ROOT_NAME, false)));

        Self {
            inner: Arc::new(RegistryInner {
                nodes: Mutex::new(nodes),
                trimmer: RwLock::new(SourceTrimmer::new()),
            }),
        }
    }

    /// Registry whose root admits `INFO` and writes to the console through a
    /// handler registered as `"console"`.
    #[cfg(feature = "console")]
    pub fn with_console_defaults() -> Self {
        let registry = Self::new();
        let root = registry.root();
        root.set_level(Level::Info);
        root.add_handler("console", Arc::new(crate::handlers::new_console_handler()));
        registry
    }

    /// Get the logger called `name`, creating it on first use.
    ///
    /// New loggers start with threshold `OFF`, no handlers and `use_parent`
    /// set, so by default they defer entirely to their ancestors.
    pub fn logger(&self, name: &str) -> Logger {
        let node = {
            let mut nodes = self.inner.nodes.lock();
            Arc::clone(
                nodes
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(Node::new(name, true))),
            )
        };

        Logger {
            node,
            registry: Arc::clone(&self.inner),
        }
    }

    pub fn root(&self) -> Logger {
        self.logger(ROOT_NAME)
    }

    /// Flush every handler bound anywhere in the tree.
    ///
    /// Works on a snapshot of the tree: loggers or handlers added while this
    /// runs may or may not be flushed.
    pub fn flush_all(&self) {
        for node in self.inner.snapshot() {
            for handler in node.handlers() {
                handler.flush();
            }
        }
    }

    /// Flush and close every handler bound anywhere in the tree.
    ///
    /// A handler bound to several loggers is closed once. The handlers stay
    /// registered; further output to them is ignored.
    pub fn close_all(&self) {
        let mut seen: HashSet<*const ()> = HashSet::new();
        for node in self.inner.snapshot() {
            for handler in node.handlers() {
                if seen.insert(Arc::as_ptr(&handler) as *const ()) {
                    handler.close();
                }
            }
        }
    }

    /// Strip `root` from source paths of records created from now on.
    pub fn set_source_root(&self, root: impl Into<String>) {
        *self.inner.trimmer.write() = SourceTrimmer::with_root(root);
    }

    /// Names of all registered loggers, sorted.
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.nodes.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("loggers", &self.inner.nodes.lock().len())
            .finish()
    }
}

/// Handle to one node of a [`Registry`]
#[derive(Clone)]
pub struct Logger {
    node: Arc<Node>,
    registry: Arc<RegistryInner>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn handler(&self, id: &str) -> Option<HandlerRef> {
        self.node.state.lock().handlers.get(id).cloned()
    }

    /// Bind `handler` under `id`, returning the handler it replaces.
    pub fn add_handler(&self, id: impl Into<String>, handler: HandlerRef) -> Option<HandlerRef> {
        self.node.state.lock().handlers.insert(id.into(), handler)
    }

    pub fn remove_handler(&self, id: &str) -> Option<HandlerRef> {
        self.node.state.lock().handlers.remove(id)
    }

    pub fn level(&self) -> Level {
        self.node.state.lock().level
    }

    pub fn set_level(&self, level: Level) {
        self.node.state.lock().level = level;
    }

    pub fn use_parent(&self) -> bool {
        self.node.state.lock().use_parent
    }

    pub fn set_use_parent(&self, use_parent: bool) {
        self.node.state.lock().use_parent = use_parent;
    }

    /// Would a record at `level` reach at least one handler?
    ///
    /// Only logger thresholds are considered; handler levels are not.
    pub fn is_loggable(&self, level: Level) -> bool {
        let mut current = Arc::clone(&self.node);
        loop {
            let (admitted, use_parent) = {
                let state = current.state.lock();
                (
                    state.level.admits(level) && !state.handlers.is_empty(),
                    state.use_parent,
                )
            };

            if admitted {
                return true;
            }
            if !use_parent {
                return false;
            }
            match self.registry.parent_of(&current.name) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Log with the caller's source location.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.log_with(level, Location::caller(), || message.to_string());
    }

    /// Log with an explicit source location.
    pub fn log_at(&self, level: Level, location: Location, message: &str) {
        self.log_with(level, location, || message.to_string());
    }

    /// Log with an explicit source location. `message` is only evaluated if
    /// some logger on the way to the root admits the record.
    pub fn log_with<F>(&self, level: Level, location: Location, message: F)
    where
        F: FnOnce() -> String,
    {
        let mut message = Some(message);
        let mut record: Option<LogRecord> = None;
        let mut current = Arc::clone(&self.node);

        loop {
            let (threshold, handlers, use_parent) = {
                let state = current.state.lock();
                let handlers: Vec<HandlerRef> = if state.handlers.is_empty() {
                    Vec::new()
                } else {
                    state.handlers.values().cloned().collect()
                };
                (state.level, handlers, state.use_parent)
            };

            if threshold.admits(level) && !handlers.is_empty() {
                let record = record.get_or_insert_with(|| {
                    let text = message.take().map(|f| f()).unwrap_or_default();
                    let trimmer = self.registry.trimmer.read();
                    LogRecord::new(level, trimmer.trim(location.file), location.line, &text)
                });
                for handler in &handlers {
                    handler.output(record);
                }
            }

            if !use_parent {
                return;
            }
            match self.registry.parent_of(&current.name) {
                Some(parent) => current = parent,
                None => return,
            }
        }
    }

    #[track_caller]
    pub fn err(&self, message: impl fmt::Display) {
        self.log(Level::Err, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.node.state.lock();
        f.debug_struct("Logger")
            .field("name", &self.node.name)
            .field("level", &state.level)
            .field("handlers", &state.handlers.len())
            .field("use_parent", &state.use_parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::Handler;
    use crate::handlers::MemoryHandler;
    use std::cell::Cell;

    fn memory() -> Arc<MemoryHandler> {
        Arc::new(MemoryHandler::new())
    }

    #[test]
    fn test_new_logger_defaults() {
        let registry = Registry::new();
        let logger = registry.logger("a/b");
        assert_eq!(logger.name(), "a/b");
        assert_eq!(logger.level(), Level::Off);
        assert!(logger.use_parent());
        assert!(logger.handler("x").is_none());

        assert!(!registry.root().use_parent());
    }

    #[test]
    fn test_same_name_same_node() {
        let registry = Registry::new();
        registry.logger("svc").set_level(Level::Debug);
        assert_eq!(registry.logger("svc").level(), Level::Debug);
        assert_eq!(registry.logger_names(), vec!["".to_string(), "svc".to_string()]);
    }

    #[test]
    fn test_hierarchy_delivery() {
        let registry = Registry::new();
        let handler = memory();

        let ancestor = registry.logger("a/b");
        ancestor.set_level(Level::Warn);
        ancestor.set_use_parent(false);
        ancestor.add_handler("mem", handler.clone());

        let leaf = registry.logger("a/b/c/d");
        leaf.err("broken");
        assert_eq!(handler.len(), 1);

        leaf.info("ignored");
        assert_eq!(handler.len(), 1);

        let records = handler.records();
        assert_eq!(records[0].level, Level::Err);
        assert_eq!(records[0].message, "broken");
        assert!(records[0].file.ends_with("registry.rs"));
    }

    #[test]
    fn test_parent_resolution_skips_missing_nodes() {
        let registry = Registry::new();
        let handler = memory();
        let root = registry.root();
        root.set_level(Level::All);
        root.add_handler("mem", handler.clone());

        registry.logger("x/y/z").debug("to root");
        registry.logger("plain").debug("to root too");
        assert_eq!(handler.len(), 2);
    }

    #[test]
    fn test_every_admitting_node_outputs() {
        let registry = Registry::new();
        let upper = memory();
        let lower = memory();

        let root = registry.root();
        root.set_level(Level::Err);
        root.add_handler("upper", upper.clone());

        let child = registry.logger("app");
        child.set_level(Level::All);
        child.add_handler("lower", lower.clone());

        child.warn("warning");
        child.err("error");

        assert_eq!(lower.len(), 2);
        assert_eq!(upper.len(), 1);
    }

    #[test]
    fn test_use_parent_false_stops_walk() {
        let registry = Registry::new();
        let handler = memory();
        let root = registry.root();
        root.set_level(Level::All);
        root.add_handler("mem", handler.clone());

        let child = registry.logger("quiet");
        child.set_use_parent(false);
        child.err("nobody hears");
        assert!(handler.is_empty());
        assert!(!child.is_loggable(Level::Err));
    }

    #[test]
    fn test_is_loggable() {
        let registry = Registry::new();
        let logger = registry.logger("a/b");
        assert!(!logger.is_loggable(Level::Err));

        let root = registry.root();
        root.set_level(Level::Info);
        assert!(!logger.is_loggable(Level::Err), "no handler yet");

        root.add_handler("mem", memory());
        assert!(logger.is_loggable(Level::Info));
        assert!(!logger.is_loggable(Level::Debug));
    }

    #[test]
    fn test_message_is_lazy() {
        let registry = Registry::new();
        let evaluated = Cell::new(false);
        registry
            .logger("lazy")
            .log_with(Level::Info, Location::new("src/x.rs", 1), || {
                evaluated.set(true);
                String::new()
            });
        assert!(!evaluated.get());
    }

    #[test]
    fn test_record_built_once_per_call() {
        let registry = Registry::new();
        let first = memory();
        let second = memory();
        let root = registry.root();
        root.set_level(Level::All);
        root.add_handler("one", first.clone());
        root.add_handler("two", second.clone());

        let calls = Cell::new(0);
        root.log_with(Level::Info, Location::new("src/x.rs", 9), || {
            calls.set(calls.get() + 1);
            "hello".to_string()
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(first.records(), second.records());
        assert_eq!(first.records()[0].line, 9);
    }

    #[test]
    fn test_add_and_remove_handler() {
        let registry = Registry::new();
        let logger = registry.logger("h");
        let first = memory();
        let second = memory();

        assert!(logger.add_handler("mem", first.clone()).is_none());
        let replaced = logger.add_handler("mem", second.clone());
        assert!(replaced.is_some());
        assert!(logger.handler("mem").is_some());

        assert!(logger.remove_handler("mem").is_some());
        assert!(logger.remove_handler("mem").is_none());
    }

    #[test]
    fn test_source_root_is_trimmed() {
        let registry = Registry::new();
        registry.set_source_root("/build/project");
        let handler = memory();
        let root = registry.root();
        root.set_level(Level::All);
        root.add_handler("mem", handler.clone());

        root.log_at(
            Level::Info,
            Location::new("/build/project/src/main.rs", 12),
            "started",
        );
        assert_eq!(handler.records()[0].file, "src/main.rs");
    }

    #[test]
    fn test_close_all_closes_shared_handler() {
        let registry = Registry::new();
        let shared = memory();
        registry.root().add_handler("mem", shared.clone());
        registry.logger("a").add_handler("mem", shared.clone());

        registry.flush_all();
        registry.close_all();
        assert!(shared.is_closed());
        registry.root().err("after close");
        assert!(shared.is_empty());
    }

    #[derive(Default)]
    struct CloseCounter {
        closes: std::sync::atomic::AtomicUsize,
    }

    impl Handler for CloseCounter {
        fn level(&self) -> Level {
            Level::All
        }

        fn set_level(&self, _level: Level) {}

        fn output(&self, _record: &LogRecord) {}

        fn flush(&self) {}

        fn close(&self) {
            self.closes
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_close_all_closes_each_handler_once() {
        let registry = Registry::new();
        let shared = Arc::new(CloseCounter::default());
        let own = Arc::new(CloseCounter::default());
        for name in ["", "a", "a/b", "c"] {
            registry.logger(name).add_handler("shared", shared.clone());
        }
        registry.logger("c").add_handler("own", own.clone());

        registry.close_all();
        assert_eq!(shared.closes.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(own.closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskmaster::errors::{BuildError, ExitRequest, TaskmasterError};
use taskmaster::node::{Executor, Node, NodeId};

use crate::fake_executor::FakeExecutor;

/// An error type with no special meaning to the scheduler and an empty
/// message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OtherError;

impl fmt::Display for OtherError {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

impl std::error::Error for OtherError {}

/// A scripted failure for one of the node's hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    User(String),
    Stop(String),
    Exit(i32),
    Build { errstr: String, status: i32 },
    Other,
    Io(String),
}

impl Failure {
    pub fn to_error(&self) -> anyhow::Error {
        match self {
            Failure::User(msg) => TaskmasterError::User(msg.clone()).into(),
            Failure::Stop(msg) => TaskmasterError::Stop(msg.clone()).into(),
            Failure::Exit(status) => ExitRequest(*status).into(),
            Failure::Build { errstr, status } => {
                BuildError::new(errstr.clone()).with_status(*status).into()
            }
            Failure::Other => OtherError.into(),
            Failure::Io(msg) => std::io::Error::other(msg.clone()).into(),
        }
    }
}

/// Shared record of what fake nodes were asked to do, in order.
///
/// Events are `"<name> <what>"` strings, e.g. `"n1 built"`.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<String>>>,
    active_builds: Arc<AtomicUsize>,
    peak_builds: Arc<AtomicUsize>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, what: &str) {
        self.events.lock().unwrap().push(format!("{name} {what}"));
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Names of nodes with a `what` event, in order.
    pub fn names(&self, what: &str) -> Vec<String> {
        let suffix = format!(" {what}");
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_suffix(&suffix).map(str::to_string))
            .collect()
    }

    pub fn built(&self) -> Vec<String> {
        self.names("built")
    }

    pub fn visited(&self) -> Vec<String> {
        self.names("visited")
    }

    pub fn count(&self, what: &str) -> usize {
        self.names(what).len()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Highest number of builds that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_builds.load(Ordering::SeqCst)
    }

    fn enter_build(&self) {
        let now = self.active_builds.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_builds.fetch_max(now, Ordering::SeqCst);
    }

    fn leave_build(&self) {
        self.active_builds.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A scriptable node.
///
/// Defaults: has a builder, is out of date, is not cached, has no children.
/// Every hook records itself in the shared [`Journal`].
#[derive(Debug)]
pub struct FakeNode {
    name: String,
    journal: Journal,
    kids: Mutex<Vec<NodeId>>,
    scans: Mutex<Vec<NodeId>>,
    scanned: AtomicBool,
    side_effects: Mutex<Vec<NodeId>>,
    alternates: Mutex<(Vec<NodeId>, Option<String>)>,
    disambiguates_to: Mutex<Option<NodeId>>,
    has_builder: AtomicBool,
    always_build: AtomicBool,
    current: AtomicBool,
    cached: AtomicBool,
    binfo: AtomicBool,
    prepared: AtomicBool,
    postprocessed: AtomicBool,
    implicit_resets: AtomicUsize,
    build_delay: Mutex<Option<Duration>>,
    children_failure: Mutex<Option<Failure>>,
    ready_failure: Mutex<Option<Failure>>,
    prepare_failure: Mutex<Option<Failure>>,
    build_failure: Mutex<Option<Failure>>,
    removal_failure: Mutex<Option<String>>,
    targets: Arc<Mutex<Vec<NodeId>>>,
    prerequisites: Arc<Mutex<Vec<NodeId>>>,
    action_side_effects: Arc<Mutex<Vec<NodeId>>>,
    executor_failure: Arc<Mutex<Option<Failure>>>,
}

impl FakeNode {
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            kids: Mutex::new(Vec::new()),
            scans: Mutex::new(Vec::new()),
            scanned: AtomicBool::new(false),
            side_effects: Mutex::new(Vec::new()),
            alternates: Mutex::new((Vec::new(), None)),
            disambiguates_to: Mutex::new(None),
            has_builder: AtomicBool::new(true),
            always_build: AtomicBool::new(false),
            current: AtomicBool::new(false),
            cached: AtomicBool::new(false),
            binfo: AtomicBool::new(false),
            prepared: AtomicBool::new(false),
            postprocessed: AtomicBool::new(false),
            implicit_resets: AtomicUsize::new(0),
            build_delay: Mutex::new(None),
            children_failure: Mutex::new(None),
            ready_failure: Mutex::new(None),
            prepare_failure: Mutex::new(None),
            build_failure: Mutex::new(None),
            removal_failure: Mutex::new(None),
            targets: Arc::new(Mutex::new(Vec::new())),
            prerequisites: Arc::new(Mutex::new(Vec::new())),
            action_side_effects: Arc::new(Mutex::new(Vec::new())),
            executor_failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_kids(self, kids: &[NodeId]) -> Self {
        self.set_kids(kids);
        self
    }

    pub fn set_kids(&self, kids: &[NodeId]) {
        *self.kids.lock().unwrap() = kids.to_vec();
    }

    /// Children that only appear once the node has been scanned.
    pub fn set_scans(&self, scans: &[NodeId]) {
        *self.scans.lock().unwrap() = scans.to_vec();
    }

    /// Executor targets. Empty means just this node.
    pub fn set_targets(&self, targets: &[NodeId]) {
        *self.targets.lock().unwrap() = targets.to_vec();
    }

    pub fn set_prerequisites(&self, prerequisites: &[NodeId]) {
        *self.prerequisites.lock().unwrap() = prerequisites.to_vec();
    }

    pub fn set_side_effects(&self, side_effects: &[NodeId]) {
        *self.side_effects.lock().unwrap() = side_effects.to_vec();
    }

    pub fn set_action_side_effects(&self, side_effects: &[NodeId]) {
        *self.action_side_effects.lock().unwrap() = side_effects.to_vec();
    }

    pub fn set_alternates(&self, alternates: &[NodeId], message: Option<&str>) {
        *self.alternates.lock().unwrap() = (alternates.to_vec(), message.map(str::to_string));
    }

    pub fn set_disambiguates_to(&self, other: NodeId) {
        *self.disambiguates_to.lock().unwrap() = Some(other);
    }

    pub fn set_has_builder(&self, value: bool) {
        self.has_builder.store(value, Ordering::SeqCst);
    }

    pub fn set_always_build(&self, value: bool) {
        self.always_build.store(value, Ordering::SeqCst);
    }

    pub fn set_current(&self, value: bool) {
        self.current.store(value, Ordering::SeqCst);
    }

    pub fn set_cached(&self, value: bool) {
        self.cached.store(value, Ordering::SeqCst);
    }

    pub fn set_build_delay(&self, delay: Duration) {
        *self.build_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_children(&self, failure: Failure) {
        *self.children_failure.lock().unwrap() = Some(failure);
    }

    pub fn fail_ready(&self, failure: Failure) {
        *self.ready_failure.lock().unwrap() = Some(failure);
    }

    pub fn fail_prepare(&self, failure: Failure) {
        *self.prepare_failure.lock().unwrap() = Some(failure);
    }

    pub fn fail_executor_prepare(&self, failure: Failure) {
        *self.executor_failure.lock().unwrap() = Some(failure);
    }

    pub fn fail_build(&self, failure: Failure) {
        *self.build_failure.lock().unwrap() = Some(failure);
    }

    /// Make removal of a retrieved file fail with `message`.
    pub fn fail_removal(&self, message: &str) {
        *self.removal_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn was_prepared(&self) -> bool {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn was_postprocessed(&self) -> bool {
        self.postprocessed.load(Ordering::SeqCst)
    }

    /// Whether build info gathered in `prepare` is still held.
    pub fn has_binfo(&self) -> bool {
        self.binfo.load(Ordering::SeqCst)
    }

    pub fn implicit_resets(&self) -> usize {
        self.implicit_resets.load(Ordering::SeqCst)
    }

    fn scripted(slot: &Mutex<Option<Failure>>) -> anyhow::Result<()> {
        match slot.lock().unwrap().as_ref() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl Node for FakeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> anyhow::Result<Vec<NodeId>> {
        Self::scripted(&self.children_failure)?;
        if !self.scanned.swap(true, Ordering::SeqCst) {
            let scans = std::mem::take(&mut *self.scans.lock().unwrap());
            self.kids.lock().unwrap().extend(scans);
            self.journal.record(&self.name, "scanned");
        }
        Ok(self.kids.lock().unwrap().clone())
    }

    fn executor(&self, this: NodeId) -> Arc<dyn Executor> {
        Arc::new(FakeExecutor {
            this,
            targets: Arc::clone(&self.targets),
            prerequisites: Arc::clone(&self.prerequisites),
            action_side_effects: Arc::clone(&self.action_side_effects),
            prepare_failure: Arc::clone(&self.executor_failure),
        })
    }

    fn side_effects(&self) -> Vec<NodeId> {
        self.side_effects.lock().unwrap().clone()
    }

    fn alter_targets(&self) -> (Vec<NodeId>, Option<String>) {
        self.alternates.lock().unwrap().clone()
    }

    fn disambiguate(&self, this: NodeId) -> NodeId {
        self.disambiguates_to.lock().unwrap().unwrap_or(this)
    }

    fn has_builder(&self) -> bool {
        self.has_builder.load(Ordering::SeqCst)
    }

    fn always_build(&self) -> bool {
        self.always_build.load(Ordering::SeqCst)
    }

    fn is_up_to_date(&self) -> anyhow::Result<bool> {
        Self::scripted(&self.ready_failure)?;
        Ok(self.current.load(Ordering::SeqCst))
    }

    fn prepare(&self) -> anyhow::Result<()> {
        Self::scripted(&self.prepare_failure)?;
        self.prepared.store(true, Ordering::SeqCst);
        self.binfo.store(true, Ordering::SeqCst);
        self.journal.record(&self.name, "prepared");
        Ok(())
    }

    fn build(&self) -> anyhow::Result<()> {
        self.journal.enter_build();
        let delay = *self.build_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.journal.leave_build();
        Self::scripted(&self.build_failure)?;
        self.journal.record(&self.name, "built");
        Ok(())
    }

    fn retrieve_from_cache(&self) -> bool {
        let cached = self.cached.load(Ordering::SeqCst);
        if cached {
            self.journal.record(&self.name, "retrieved");
        }
        cached
    }

    fn remove_retrieved(&self) -> std::io::Result<()> {
        if let Some(message) = self.removal_failure.lock().unwrap().as_ref() {
            return Err(std::io::Error::other(message.clone()));
        }
        self.journal.record(&self.name, "removed");
        Ok(())
    }

    fn push_to_cache(&self) {
        self.journal.record(&self.name, "pushed");
    }

    fn built(&self) {
        self.binfo.store(false, Ordering::SeqCst);
        self.journal.record(&self.name, "finalized");
    }

    fn reset_implicit_deps(&self) {
        self.implicit_resets.fetch_add(1, Ordering::SeqCst);
    }

    fn visited(&self) {
        self.journal.record(&self.name, "visited");
    }

    fn release_target_info(&self) {
        self.journal.record(&self.name, "released");
    }

    fn postprocess(&self) {
        self.postprocessed.store(true, Ordering::SeqCst);
    }
}

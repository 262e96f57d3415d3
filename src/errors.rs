// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Node behaviours (scanning, readiness checks, building) return
//! `anyhow::Result` so implementors can use `?` freely. The scheduler lifts
//! those into [`TaskmasterError`] with [`TaskmasterError::lift`], which
//! recovers a typed error if one was wrapped inside the `anyhow::Error`.

use std::sync::Arc;

use thiserror::Error;

use crate::node::NodeId;

#[derive(Error, Debug)]
pub enum TaskmasterError {
    /// A user-facing failure that must surface unchanged.
    #[error("{0}")]
    User(String),

    /// A failure that forces the build to stop, even in keep-going mode.
    #[error("{0}")]
    Stop(String),

    /// A node asked for the whole process to exit with a status.
    #[error("explicit exit requested by '{name}' (status {status})")]
    ExplicitExit {
        node: NodeId,
        name: String,
        status: i32,
    },

    /// A cycle closed while the walk was registering a waiting parent.
    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    /// The end-of-run sweep found nodes that never left the pending set.
    #[error("Found dependency cycle(s):\n{0}")]
    CycleCleanup(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// A non-error payload that was recorded in a task's exception slot.
    #[error("{0}")]
    Captured(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskmasterError {
    /// Recover the typed error carried by `err`, or keep it as `Other`.
    pub fn lift(err: anyhow::Error) -> Self {
        let err = match err.downcast::<TaskmasterError>() {
            Ok(typed) => return typed,
            Err(err) => err,
        };
        match err.downcast::<BuildError>() {
            Ok(build) => TaskmasterError::Build(build),
            Err(err) => TaskmasterError::Other(err),
        }
    }

    /// Lift `err`, translating an [`ExitRequest`] into
    /// [`TaskmasterError::ExplicitExit`] attributed to `node`.
    pub fn lift_for(node: NodeId, name: &str, err: anyhow::Error) -> Self {
        if let Some(ExitRequest(status)) = err.downcast_ref::<ExitRequest>() {
            return TaskmasterError::ExplicitExit {
                node,
                name: name.to_string(),
                status: *status,
            };
        }
        Self::lift(err)
    }

    /// Status requested by an explicit exit, if this is one.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            TaskmasterError::ExplicitExit { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure must halt the build even when keep-going.
    pub fn forces_stop(&self) -> bool {
        matches!(
            self,
            TaskmasterError::Stop(_) | TaskmasterError::ExplicitExit { .. }
        )
    }
}

/// A failed build step, attributed to the node that was being built.
#[derive(Error, Debug, Clone)]
#[error("{errstr}")]
pub struct BuildError {
    pub node: Option<NodeId>,
    pub name: String,
    pub errstr: String,
    pub status: i32,
    /// The underlying failure when this error wraps one.
    pub exc_info: Option<Arc<anyhow::Error>>,
}

impl BuildError {
    pub fn new(errstr: impl Into<String>) -> Self {
        Self {
            node: None,
            name: String::new(),
            errstr: errstr.into(),
            status: 2,
            exc_info: None,
        }
    }

    pub fn with_status(mut self, status: i32) -> Self {
        self.status = status;
        self
    }

    pub fn for_node(mut self, node: NodeId, name: impl Into<String>) -> Self {
        self.node = Some(node);
        self.name = name.into();
        self
    }

    /// Wrap an arbitrary failure as `"<Kind> : <message>"`.
    pub fn wrap(node: NodeId, name: &str, err: anyhow::Error) -> Self {
        let errstr = format!("{} : {}", error_kind(&err), err);
        Self {
            node: Some(node),
            name: name.to_string(),
            errstr,
            status: 2,
            exc_info: Some(Arc::new(err)),
        }
    }
}

/// Raised by a node to request that the whole process exit.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("exit requested with status {0}")]
pub struct ExitRequest(pub i32);

/// Short type label for an error: the leading identifier of the root
/// cause's `Debug` output, e.g. `OtherError` for a unit struct.
fn error_kind(err: &anyhow::Error) -> String {
    let root = err.root_cause();
    if root.downcast_ref::<std::io::Error>().is_some() {
        return "IOError".to_string();
    }
    let debug = format!("{root:?}");
    let label: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if label.is_empty() {
        "Error".to_string()
    } else {
        label
    }
}

pub type Result<T> = std::result::Result<T, TaskmasterError>;

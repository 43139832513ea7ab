//! Tick-delayed node conversions.
//!
//! Conversions never happen inside a resolution call: the resolver schedules a
//! [`ConversionTask`] and the host drains the queue with [`Scheduler::advance`]
//! once per tick, on the same thread that resolves harvests.
//!
//! # Invariants
//!
//! - `schedule` never runs a task, even with a zero delay
//! - Tasks due on the same tick run in scheduling order
//! - A task re-reads the node when it fires and does nothing if the node is
//!   gone or has become a different resource

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ActorId, Location, NodeState, ResourceType};
use crate::ports::WorldPort;

/// Handle for a scheduled task.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A pending node conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionTask {
    /// Actor whose harvest scheduled the task.
    pub actor: ActorId,
    /// Node to convert.
    pub location: Location,
    /// Resource the node must still be when the task fires.
    pub expected: ResourceType,
    /// State written on success. The node's current flags are kept.
    pub into: NodeState,
}

/// Why a fired task did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No node at the location any more.
    NodeMissing,
    /// The node is now a different resource.
    NodeChanged,
}

/// What happened to one fired task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskReport {
    /// The node was converted.
    Applied {
        /// Task that ran.
        id: TaskId,
        /// Converted node.
        location: Location,
    },
    /// The task found nothing to convert.
    Skipped {
        /// Task that ran.
        id: TaskId,
        /// Why nothing happened.
        reason: SkipReason,
    },
}

impl TaskReport {
    /// Id of the task this report describes.
    #[must_use]
    pub fn id(&self) -> TaskId {
        match self {
            Self::Applied { id, .. } | Self::Skipped { id, .. } => *id,
        }
    }
}

/// Tick-keyed queue of conversion tasks.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: u64,
    next_id: u64,
    queue: BTreeMap<(u64, TaskId), ConversionTask>,
}

impl Scheduler {
    /// Creates an empty scheduler at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Number of tasks waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether no task is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues `task` to fire `delay` ticks from now.
    ///
    /// A zero delay fires on the next [`advance`](Self::advance).
    pub fn schedule(&mut self, delay: u64, task: ConversionTask) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let due = self.now.saturating_add(delay);
        debug!(%id, due, location = %task.location, "conversion scheduled");
        self.queue.insert((due, id), task);
        id
    }

    /// Removes a pending task. Returns whether it was still queued.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let key = self.queue.keys().find(|(_, queued)| *queued == id).copied();
        key.is_some_and(|key| self.queue.remove(&key).is_some())
    }

    /// Removes every pending task scheduled by `actor`. Returns the count.
    pub fn cancel_actor(&mut self, actor: ActorId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|_, task| task.actor != actor);
        before - self.queue.len()
    }

    /// Runs every task due at the current tick, then moves the clock forward.
    pub fn advance(&mut self, world: &mut dyn WorldPort) -> Vec<TaskReport> {
        let mut reports = Vec::new();

        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > self.now {
                break;
            }
            let ((_, id), task) = entry.remove_entry();
            reports.push(Self::fire(id, task, world));
        }

        self.now += 1;
        reports
    }

    fn fire(id: TaskId, task: ConversionTask, world: &mut dyn WorldPort) -> TaskReport {
        let Some(current) = world.node_at(task.location) else {
            debug!(%id, location = %task.location, "conversion skipped: node missing");
            return TaskReport::Skipped {
                id,
                reason: SkipReason::NodeMissing,
            };
        };

        if current.resource != task.expected {
            debug!(
                %id,
                location = %task.location,
                expected = %task.expected,
                found = %current.resource,
                "conversion skipped: node changed"
            );
            return TaskReport::Skipped {
                id,
                reason: SkipReason::NodeChanged,
            };
        }

        let into = task.into.with_flags(current.flags);
        world.set_node_state(task.location, into);
        TaskReport::Applied {
            id,
            location: task.location,
        }
    }
}

//! Network cloudlet: an ordered list of tasks bound to one VM.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::task::{CloudletTask, TaskState};

/// Unique VM identifier.
pub type VmId = u32;

/// Unique cloudlet identifier.
pub type CloudletId = u32;

/// Status of a network cloudlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    /// Built by the broker, not yet handed to the engine.
    Created,
    /// Handed to the engine, not yet activated.
    Submitted,
    /// Between first task activation and last task completion.
    Running,
    /// All tasks completed in order. Terminal.
    Finished,
    /// The owning VM was destroyed or the broker withdrew the cloudlet. Terminal.
    Cancelled,
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "created"),
            CloudletStatus::Submitted => write!(f, "submitted"),
            CloudletStatus::Running => write!(f, "running"),
            CloudletStatus::Finished => write!(f, "finished"),
            CloudletStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A multi-stage distributed-application job executed on one VM.
///
/// Tasks execute strictly in list order; the current task index only moves
/// forward and the cloudlet is finished exactly when it reaches the task count.
/// Partial progress (current task, bytes sent and received) is inspectable
/// mid-run.
pub struct NetworkCloudlet {
    /// Unique cloudlet identifier, assigned by the broker.
    pub id: CloudletId,
    /// VM this cloudlet is bound to.
    pub vm_id: VmId,
    /// Required number of processing elements.
    pub pes: u32,
    tasks: Vec<CloudletTask>,
    current_task: usize,
    status: CloudletStatus,
    submit_time: f64,
    start_time: f64,
    finish_time: f64,
    bytes_sent: u64,
    bytes_received: u64,
    pub(crate) last_update_time: f64,
}

impl NetworkCloudlet {
    /// Creates an empty cloudlet bound to the given VM.
    pub fn new(id: CloudletId, vm_id: VmId, pes: u32) -> Self {
        Self {
            id,
            vm_id,
            pes,
            tasks: Vec::new(),
            current_task: 0,
            status: CloudletStatus::Created,
            submit_time: -1.,
            start_time: -1.,
            finish_time: -1.,
            bytes_sent: 0,
            bytes_received: 0,
            last_update_time: -1.,
        }
    }

    /// Appends a task to the end of the task list.
    pub fn add_task(&mut self, task: CloudletTask) {
        self.tasks.push(task);
    }

    /// Appends a task, builder-style.
    pub fn with_task(mut self, task: CloudletTask) -> Self {
        self.tasks.push(task);
        self
    }

    /// Number of tasks in the cloudlet.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Index of the current task; equals [`Self::task_count`] once finished.
    pub fn current_task_index(&self) -> usize {
        self.current_task
    }

    /// Returns the current task, or `None` if all tasks have completed.
    pub fn current_task(&self) -> Option<&CloudletTask> {
        self.tasks.get(self.current_task)
    }

    pub(crate) fn current_task_mut(&mut self) -> Option<&mut CloudletTask> {
        self.tasks.get_mut(self.current_task)
    }

    /// Returns the task at the given index.
    pub fn task(&self, index: usize) -> &CloudletTask {
        &self.tasks[index]
    }

    /// Observable state of the task at the given index.
    pub fn task_state(&self, index: usize) -> TaskState {
        if index < self.current_task {
            TaskState::Done
        } else if index > self.current_task {
            TaskState::Pending
        } else {
            match &self.tasks[index] {
                CloudletTask::Receive { .. } => TaskState::Waiting,
                _ => TaskState::Running,
            }
        }
    }

    /// Moves to the next task. The index only advances forward.
    pub(crate) fn advance_task(&mut self) {
        self.current_task += 1;
    }

    /// Whether every task has completed, in order.
    pub fn finished(&self) -> bool {
        self.current_task == self.tasks.len()
    }

    /// Current cloudlet status.
    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: CloudletStatus) {
        self.status = status;
    }

    pub(crate) fn mark_submitted(&mut self, time: f64) {
        self.status = CloudletStatus::Submitted;
        self.submit_time = time;
    }

    pub(crate) fn mark_started(&mut self, time: f64) {
        self.status = CloudletStatus::Running;
        self.start_time = time;
    }

    pub(crate) fn mark_finished(&mut self, time: f64) {
        self.status = CloudletStatus::Finished;
        self.finish_time = time;
    }

    /// Time the cloudlet was handed to the engine, `-1` if not yet.
    pub fn submit_time(&self) -> f64 {
        self.submit_time
    }

    /// Time the first task was activated, `-1` if not yet.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Time the last task completed, `-1` if not yet.
    pub fn finish_time(&self) -> f64 {
        self.finish_time
    }

    /// Total bytes emitted by send tasks so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Total bytes delivered to receive tasks so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub(crate) fn add_bytes_sent(&mut self, bytes: u64) {
        self.bytes_sent += bytes;
    }

    pub(crate) fn add_bytes_received(&mut self, bytes: u64) {
        self.bytes_received += bytes;
    }
}

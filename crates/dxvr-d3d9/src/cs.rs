//! Command stream.
//!
//! Device calls record commands into the current chunk. [`CommandStream::dispatch`] closes the
//! chunk and queues it for execution; executing a chunk submits it to the GPU timeline and
//! stamps every image it touches with the resulting sequence number. Queued chunks execute
//! when the queue grows past its limit or when someone synchronizes with the stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ash::vk;
use tracing::trace;

use crate::image::{Access, Image};
use crate::lock_unpoisoned;
use crate::timeline::GpuTimeline;

#[derive(Debug, Clone)]
pub(crate) enum Command {
    Clear {
        image: Arc<Image>,
    },
    TransitionLayout {
        image: Arc<Image>,
        range: vk::ImageSubresourceRange,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    },
    Resolve {
        src: Arc<Image>,
        dst: Arc<Image>,
    },
    Present {
        image: Arc<Image>,
    },
}

impl Command {
    fn accesses(&self) -> Vec<(&Arc<Image>, Access)> {
        match self {
            Command::Clear { image } | Command::TransitionLayout { image, .. } => {
                vec![(image, Access::Write)]
            }
            Command::Resolve { src, dst } => vec![(src, Access::Read), (dst, Access::Write)],
            Command::Present { image } => vec![(image, Access::Read)],
        }
    }
}

#[derive(Debug)]
struct CsChunk {
    seq: u64,
    commands: Vec<Command>,
}

#[derive(Debug)]
struct CsState {
    recording: Vec<Command>,
    recording_seq: u64,
    queued: VecDeque<CsChunk>,
    executed_seq: u64,
}

#[derive(Debug)]
pub struct CommandStream {
    state: Mutex<CsState>,
    max_queued_chunks: usize,
}

impl CommandStream {
    pub fn new(max_queued_chunks: usize) -> Self {
        Self {
            state: Mutex::new(CsState {
                recording: Vec::new(),
                recording_seq: 1,
                queued: VecDeque::new(),
                executed_seq: 0,
            }),
            max_queued_chunks: max_queued_chunks.max(1),
        }
    }

    /// Record a command into the current chunk and return that chunk's sequence number.
    pub(crate) fn record(&self, command: Command) -> u64 {
        let mut state = lock_unpoisoned(&self.state);
        state.recording.push(command);
        state.recording_seq
    }

    /// Sequence number the current (not yet dispatched) chunk will carry.
    pub fn recording_sequence(&self) -> u64 {
        lock_unpoisoned(&self.state).recording_seq
    }

    /// Sequence number of the last chunk that was executed.
    pub fn executed_sequence(&self) -> u64 {
        lock_unpoisoned(&self.state).executed_seq
    }

    pub fn queued_chunks(&self) -> usize {
        lock_unpoisoned(&self.state).queued.len()
    }

    pub fn recorded_commands(&self) -> usize {
        lock_unpoisoned(&self.state).recording.len()
    }

    /// Close the current chunk and queue it. Empty chunks are not queued.
    pub(crate) fn dispatch(&self, timeline: &GpuTimeline) {
        let mut state = lock_unpoisoned(&self.state);
        if state.recording.is_empty() {
            return;
        }
        let chunk = CsChunk {
            seq: state.recording_seq,
            commands: std::mem::take(&mut state.recording),
        };
        state.recording_seq += 1;
        trace!(seq = chunk.seq, commands = chunk.commands.len(), "dispatch cs chunk");
        state.queued.push_back(chunk);

        while state.queued.len() > self.max_queued_chunks {
            if let Some(chunk) = state.queued.pop_front() {
                Self::execute(&mut state, chunk, timeline);
            }
        }
    }

    /// Execute queued chunks up to and including `through`.
    pub(crate) fn synchronize(&self, timeline: &GpuTimeline, through: u64) {
        let mut state = lock_unpoisoned(&self.state);
        while state.queued.front().is_some_and(|chunk| chunk.seq <= through) {
            if let Some(chunk) = state.queued.pop_front() {
                Self::execute(&mut state, chunk, timeline);
            }
        }
    }

    /// Execute every queued chunk.
    pub(crate) fn synchronize_all(&self, timeline: &GpuTimeline) {
        self.synchronize(timeline, u64::MAX);
    }

    fn execute(state: &mut CsState, chunk: CsChunk, timeline: &GpuTimeline) {
        let seq = timeline.submit();
        for command in &chunk.commands {
            if let Command::TransitionLayout {
                image,
                range,
                old_layout,
                new_layout,
            } = command
            {
                trace!(
                    image = ?image.handle(),
                    ?old_layout,
                    ?new_layout,
                    levels = range.level_count,
                    layers = range.layer_count,
                    "image barrier"
                );
            }
            for (image, access) in command.accesses() {
                image.track_use(access, seq);
            }
        }
        state.executed_seq = chunk.seq;
        trace!(chunk = chunk.seq, gpu_seq = seq, "executed cs chunk");
    }
}

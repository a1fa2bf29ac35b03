//! Sample Store Module
//!
//! Process-wide cache mapping a sample id to its decoded PCM frames. A
//! sample becomes available asynchronously, well after the voices that
//! reference it have already been built and started rendering — the store
//! is the hand-off point where a late-arriving dump "rehomes" every live
//! voice's read cursor as if the sample had always been there.

use std::collections::HashMap;

/// One sample's decoded mono frames, normalized to `[-1, 1]`.
pub type SampleFrames = Vec<f32>;

/// A process-wide sample cache.
///
/// Entries only ever arrive via [`SampleStore::dump`]; nothing in this
/// crate parses sample data itself (see the generator/collaborator
/// contract). A sample id absent from the store means "not loaded yet",
/// not "invalid id" — voices referencing it stay silent rather than
/// erroring.
#[derive(Debug, Default)]
pub struct SampleStore {
    frames: HashMap<u64, SampleFrames>,
}

/// What a voice must do after its sample's frames arrive, computed by
/// [`rehome_cursor`] from the voice's own timing fields. The caller
/// (voice/channel code) applies these back onto the voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RehomeResult {
    pub end: f32,
    pub cursor: f32,
    pub finished: bool,
}

impl SampleStore {
    pub fn new() -> Self {
        Self {
            frames: HashMap::new(),
        }
    }

    /// Looks up a sample's frames, if loaded.
    pub fn get(&self, sample_id: u64) -> Option<&SampleFrames> {
        self.frames.get(&sample_id)
    }

    /// True once `sample_id`'s frames have arrived.
    pub fn contains(&self, sample_id: u64) -> bool {
        self.frames.contains_key(&sample_id)
    }

    /// Inserts a sample's frames. Call [`rehome_cursor`] for every live
    /// voice referencing `sample_id` afterward to put its cursor where it
    /// would have been had the sample been present from the start.
    pub fn dump(&mut self, sample_id: u64, frames: SampleFrames) {
        self.frames.insert(sample_id, frames);
    }

    /// Drops every cached sample. Only safe to call when no voices are
    /// live (a live voice holding a cursor into a just-dropped sample has
    /// nothing stopping it from reading garbage otherwise).
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Computes where a voice's cursor/end should land once its sample's
/// frames have just arrived, given the voice was already "playing"
/// (silently) since `start_time`.
///
/// `end_addr_offset`/`end_addr_coarse_offset` are the voice's
/// `endAddrsOffset`/`endAddrsCoarseOffset` generator values; `loop_start`/
/// `loop_end` are the voice's already-resolved loop bounds in frames.
#[allow(clippy::too_many_arguments)]
pub fn rehome_cursor(
    frame_count: usize,
    end_addr_offset: i32,
    end_addr_coarse_offset: i32,
    playback_step: f32,
    output_rate: f32,
    start_time: f64,
    now: f64,
    looping: bool,
    loop_start: f32,
    loop_end: f32,
) -> RehomeResult {
    let end = (frame_count as f32 - 1.0) + end_addr_offset as f32 + 32768.0 * end_addr_coarse_offset as f32;
    let mut cursor = playback_step * output_rate * (now - start_time) as f32;
    let mut finished = false;

    if !looping {
        if cursor >= end {
            cursor = end;
            finished = true;
        }
    } else if cursor > loop_end {
        let span = loop_end - loop_start;
        cursor = (cursor % span) + loop_start - 1.0;
    }

    RehomeResult {
        end,
        cursor,
        finished,
    }
}

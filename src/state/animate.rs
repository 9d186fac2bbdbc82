//! Animation Scheduler - Time-driven animation lifecycle.
//!
//! Animations are slots in a [`HandlePool`] with their timing in a parallel
//! array and their callbacks in another. The scheduler never reads a clock:
//! the owning loop calls [`AnimationScheduler::tick()`] (or the three phases
//! `update()`, `advance()`, `clean()` separately) once per frame with the
//! current monotonic time.
//!
//! # State machine
//!
//! ```text
//! Scheduled --(time >= start)--> Playing --(last play-through done)--> Stopped
//!                                   |  ^                                  |
//!                          pause()  v  | resume()          removed on next clean
//!                                 Paused                   unless KEEP_ONCE_PLAYED
//! ```
//!
//! The `started` and `stopped` edges are each reported exactly once. The update
//! that reports `stopped` also reports the animation as active with factor
//! exactly 1.0, so an easing mapping 1.0 to 1.0 lands on the final value. If
//! start and stop fall into the same update, both edges come together.
//!
//! # Reentrancy
//!
//! Callbacks are owned by the scheduler and run while it's mutably borrowed.
//! A callback reaching back into the same scheduler has to go through shared
//! ownership (`Rc<RefCell<_>>`), where the borrow is already taken and the
//! attempt panics instead of corrupting the sweep.
//!
//! # Example
//!
//! ```ignore
//! use spark_layers::state::{animate::AnimationScheduler, easing};
//!
//! let mut animations = AnimationScheduler::new();
//! animations.create(
//!     move |factor| set_opacity(factor),
//!     easing::cubic_out,
//!     now,
//!     Nanoseconds::from_millis(250),
//!     1,
//!     AnimationFlags::empty(),
//!     None,
//! )?;
//!
//! // Once per frame
//! animations.tick(now);
//! ```

use tracing::trace;

use super::easing::Easing;
use crate::engine::handle::{AnimationHandle, AnimationKind, DataHandle, NodeHandle};
use crate::engine::registry::HandlePool;
use crate::error::Result;
use crate::types::{AnimationFlags, AnimatorUpdates, Nanoseconds};

// =============================================================================
// TYPES
// =============================================================================

/// External entity an animation lives and dies with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    Node(NodeHandle),
    Data(DataHandle),
}

/// Lifecycle state derived from the animation timing and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationState {
    /// Start time not reached yet.
    Scheduled,
    Playing,
    /// Factor frozen at the pause time.
    Paused,
    /// All play-throughs done or stopped explicitly.
    Stopped,
}

enum AnimationCallback {
    Eased {
        callback: Box<dyn FnMut(f32)>,
        easing: Easing,
    },
    Once(Box<dyn FnMut()>),
}

bitflags::bitflags! {
    /// Edges already reported for an animation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Reported: u8 {
        const STARTED = 1 << 0;
        const STOPPED = 1 << 1;
        const PAUSE_APPLIED = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Animation {
    start: Nanoseconds,
    duration: Nanoseconds,
    /// Zero repeats indefinitely.
    repeat_count: u32,
    flags: AnimationFlags,
    attachment: Option<Attachment>,
    paused: Option<Nanoseconds>,
    stopped: Option<Nanoseconds>,
    reported: Reported,
}

impl Animation {
    fn end(&self) -> Nanoseconds {
        self.start
            .saturating_add(self.duration.saturating_mul(i64::from(self.repeat_count)))
    }

    fn state_at(&self, time: Nanoseconds) -> AnimationState {
        if self.stopped.is_some_and(|stopped| stopped <= time) {
            return AnimationState::Stopped;
        }
        if time < self.start {
            return AnimationState::Scheduled;
        }
        if self.repeat_count != 0 {
            // A pause freezes progress, so only the time played counts
            let reached = match self.paused {
                Some(paused) if paused <= time => paused,
                _ => time,
            };
            if reached >= self.end() {
                return AnimationState::Stopped;
            }
        }
        if self.paused.is_some_and(|paused| paused <= time) {
            return AnimationState::Paused;
        }
        AnimationState::Playing
    }

    /// Normalized elapsed time of the current play-through, before easing.
    fn factor_at(&self, time: Nanoseconds) -> f32 {
        let time = match self.paused {
            Some(paused) if paused < time => paused,
            _ => time,
        };
        if self.duration == Nanoseconds::ZERO {
            return 1.0;
        }
        let elapsed = (time.get().saturating_sub(self.start.get())).max(0);
        if self.repeat_count != 0 && Nanoseconds(elapsed) >= self.end() - self.start {
            return 1.0;
        }
        ((elapsed % self.duration.get()) as f64 / self.duration.get() as f64) as f32
    }

    /// An explicit stop at or before the start means the animation never played.
    fn played(&self) -> bool {
        self.reported.contains(Reported::STARTED)
            || self.stopped.is_none_or(|stopped| stopped > self.start)
    }

    /// Set an edge flag, returning whether it wasn't set before.
    fn report(&mut self, edge: Reported) -> bool {
        let first = !self.reported.contains(edge);
        self.reported.insert(edge);
        first
    }
}

/// Per-id output of [`AnimationScheduler::update()`].
///
/// All vectors are resized to the scheduler capacity on every update.
#[derive(Debug, Clone, Default)]
pub struct UpdateMasks {
    pub active: Vec<bool>,
    pub started: Vec<bool>,
    pub stopped: Vec<bool>,
    pub remove: Vec<bool>,
    /// Normalized elapsed time for active ids, before easing.
    pub factors: Vec<f32>,
}

impl UpdateMasks {
    fn reset(&mut self, len: usize) {
        for mask in [
            &mut self.active,
            &mut self.started,
            &mut self.stopped,
            &mut self.remove,
        ] {
            mask.clear();
            mask.resize(len, false);
        }
        self.factors.clear();
        self.factors.resize(len, 0.0);
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Owns a set of animations and drives them through their lifecycle.
pub struct AnimationScheduler {
    pool: HandlePool<AnimationKind>,
    animations: Vec<Animation>,
    callbacks: Vec<Option<AnimationCallback>>,
    time: Nanoseconds,
    masks: UpdateMasks,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self {
            pool: HandlePool::new(),
            animations: Vec::new(),
            callbacks: Vec::new(),
            time: Nanoseconds::MIN,
            masks: UpdateMasks::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Creation / removal
    // -------------------------------------------------------------------------

    /// Create an animation calling `callback` with the eased factor while it plays.
    ///
    /// # Arguments
    ///
    /// * `callback` - Receives `easing(normalized_elapsed)` on every active update
    /// * `easing` - Easing function, expected to map 1.0 to 1.0
    /// * `start` - Time the first play-through begins
    /// * `duration` - Length of one play-through, must be positive
    /// * `repeat_count` - Number of play-throughs, 0 for indefinitely
    /// * `flags` - Behavior flags
    /// * `attachment` - Node or data the animation is removed together with
    ///
    /// # Errors
    ///
    /// If the animation id space is exhausted.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        callback: impl FnMut(f32) + 'static,
        easing: Easing,
        start: Nanoseconds,
        duration: Nanoseconds,
        repeat_count: u32,
        flags: AnimationFlags,
        attachment: Option<Attachment>,
    ) -> Result<AnimationHandle> {
        assert!(
            duration > Nanoseconds::ZERO,
            "AnimationScheduler::create(): expected a positive duration, got {duration}"
        );
        self.insert(
            AnimationCallback::Eased {
                callback: Box::new(callback),
                easing,
            },
            Animation {
                start,
                duration,
                repeat_count,
                flags,
                attachment,
                ..Animation::default()
            },
        )
    }

    /// Create a zero-duration animation calling `callback` exactly once at `start`.
    ///
    /// # Errors
    ///
    /// If the animation id space is exhausted.
    pub fn create_once(
        &mut self,
        callback: impl FnMut() + 'static,
        start: Nanoseconds,
        flags: AnimationFlags,
        attachment: Option<Attachment>,
    ) -> Result<AnimationHandle> {
        self.insert(
            AnimationCallback::Once(Box::new(callback)),
            Animation {
                start,
                duration: Nanoseconds::ZERO,
                repeat_count: 1,
                flags,
                attachment,
                ..Animation::default()
            },
        )
    }

    fn insert(
        &mut self,
        callback: AnimationCallback,
        animation: Animation,
    ) -> Result<AnimationHandle> {
        let handle = self.pool.create()?;
        let id = handle.id() as usize;
        if id == self.animations.len() {
            self.animations.push(animation);
            self.callbacks.push(Some(callback));
        } else {
            self.animations[id] = animation;
            self.callbacks[id] = Some(callback);
        }
        Ok(handle)
    }

    /// Remove an animation.
    ///
    /// The callback, and everything it captured, is dropped before this returns.
    ///
    /// # Panics
    ///
    /// If `handle` isn't valid.
    pub fn remove(&mut self, handle: AnimationHandle) {
        assert!(
            self.pool.is_valid(handle),
            "AnimationScheduler::remove(): invalid handle {handle}"
        );
        let id = handle.id() as usize;
        self.callbacks[id] = None;
        self.animations[id] = Animation::default();
        self.pool.remove(handle);
    }

    /// Remove every live animation whose bit is set in `remove`.
    ///
    /// Same synchronous release as [`remove()`](Self::remove) for each.
    pub fn clean(&mut self, remove: &[bool]) {
        for (id, _) in remove.iter().enumerate().filter(|(_, bit)| **bit) {
            if let Some(handle) = self.pool.handle_of(id as u32) {
                self.remove(handle);
            }
        }
    }

    /// Remove animations attached to nodes whose bit is set in `removed_nodes`.
    ///
    /// # Returns
    ///
    /// Number of animations removed.
    pub fn clean_nodes(&mut self, removed_nodes: &[bool]) -> usize {
        self.clean_attached(|attachment| match attachment {
            Attachment::Node(node) => removed_nodes.get(node.id() as usize) == Some(&true),
            Attachment::Data(_) => false,
        })
    }

    /// Remove animations attached to data whose bit is set in `removed_data`.
    ///
    /// # Returns
    ///
    /// Number of animations removed.
    pub fn clean_data(&mut self, removed_data: &[bool]) -> usize {
        self.clean_attached(|attachment| match attachment {
            Attachment::Data(data) => removed_data.get(data.id() as usize) == Some(&true),
            Attachment::Node(_) => false,
        })
    }

    fn clean_attached(&mut self, removed: impl Fn(Attachment) -> bool) -> usize {
        let doomed: Vec<AnimationHandle> = self
            .pool
            .iter()
            .filter(|handle| {
                self.animations[handle.id() as usize]
                    .attachment
                    .is_some_and(&removed)
            })
            .collect();
        for &handle in &doomed {
            self.remove(handle);
        }
        doomed.len()
    }

    // -------------------------------------------------------------------------
    // Playback control
    // -------------------------------------------------------------------------

    /// Restart an animation from scratch at `time`.
    pub fn play(&mut self, handle: AnimationHandle, time: Nanoseconds) {
        let animation = self.animation_mut(handle, "play");
        animation.start = time;
        animation.paused = None;
        animation.stopped = None;
        animation.reported = Reported::empty();
    }

    /// Freeze an animation at `time`.
    ///
    /// The frozen factor is delivered once by the first update at or after `time`.
    pub fn pause(&mut self, handle: AnimationHandle, time: Nanoseconds) {
        let animation = self.animation_mut(handle, "pause");
        animation.paused = Some(time);
        animation.reported.remove(Reported::PAUSE_APPLIED);
    }

    /// Continue a paused animation from where it was frozen.
    ///
    /// The start is shifted by the time spent paused. No-op if not paused.
    pub fn resume(&mut self, handle: AnimationHandle, time: Nanoseconds) {
        let animation = self.animation_mut(handle, "resume");
        if let Some(paused) = animation.paused.take() {
            if time > paused {
                animation.start += time - paused;
            }
            animation.reported.remove(Reported::PAUSE_APPLIED);
        }
    }

    /// Stop an animation at `time`, before its natural end.
    pub fn stop(&mut self, handle: AnimationHandle, time: Nanoseconds) {
        self.animation_mut(handle, "stop").stopped = Some(time);
    }

    fn animation_mut(&mut self, handle: AnimationHandle, operation: &str) -> &mut Animation {
        assert!(
            self.pool.is_valid(handle),
            "AnimationScheduler::{operation}(): invalid handle {handle}"
        );
        &mut self.animations[handle.id() as usize]
    }

    // -------------------------------------------------------------------------
    // Per-frame sweep
    // -------------------------------------------------------------------------

    /// Compute transitions from the previous update time to `time`.
    ///
    /// Fills `masks` and returns which follow-up phases have work. `time` has
    /// to be monotonic across calls.
    pub fn update(&mut self, time: Nanoseconds, masks: &mut UpdateMasks) -> AnimatorUpdates {
        assert!(
            time >= self.time,
            "AnimationScheduler::update(): expected a time at least {}, got {time}",
            self.time
        );
        self.time = time;

        let capacity = self.pool.capacity();
        masks.reset(capacity);
        let mut updates = AnimatorUpdates::empty();

        for id in 0..capacity {
            if !self.pool.is_used(id as u32) {
                continue;
            }
            let animation = &mut self.animations[id];

            match animation.state_at(time) {
                AnimationState::Scheduled => {}
                AnimationState::Playing => {
                    if animation.report(Reported::STARTED) {
                        trace!(id, %time, "animation started");
                        masks.started[id] = true;
                    }
                    masks.active[id] = true;
                    masks.factors[id] = animation.factor_at(time);
                }
                AnimationState::Paused => {
                    if animation.report(Reported::STARTED) {
                        masks.started[id] = true;
                    }
                    if animation.report(Reported::PAUSE_APPLIED) {
                        masks.active[id] = true;
                        masks.factors[id] = animation.factor_at(time);
                    }
                }
                AnimationState::Stopped => {
                    let played = animation.played();
                    if animation.report(Reported::STOPPED) && played {
                        if animation.report(Reported::STARTED) {
                            masks.started[id] = true;
                        }
                        trace!(id, %time, "animation stopped");
                        masks.stopped[id] = true;
                        masks.active[id] = true;
                        masks.factors[id] = 1.0;
                    }
                    if !animation.flags.contains(AnimationFlags::KEEP_ONCE_PLAYED) {
                        masks.remove[id] = true;
                        updates |= AnimatorUpdates::CLEAN;
                    }
                }
            }

            if masks.active[id] {
                updates |= AnimatorUpdates::ADVANCE;
            }
        }

        updates
    }

    /// Run callbacks for every id with its `active` bit set.
    ///
    /// Eased callbacks receive `easing(factors[id])`. Call-once callbacks run
    /// on the update carrying their `started` bit.
    pub fn advance(
        &mut self,
        active: &[bool],
        started: &[bool],
        stopped: &[bool],
        factors: &[f32],
    ) {
        let capacity = self.pool.capacity();
        assert!(
            active.len() >= capacity
                && started.len() >= capacity
                && stopped.len() >= capacity
                && factors.len() >= capacity,
            "AnimationScheduler::advance(): expected masks of at least {capacity} items"
        );

        for id in 0..capacity {
            if !active[id] {
                continue;
            }
            match self.callbacks[id].as_mut() {
                Some(AnimationCallback::Eased { callback, easing }) => {
                    callback(easing(factors[id]))
                }
                Some(AnimationCallback::Once(callback)) => {
                    if started[id] {
                        callback();
                    }
                }
                None => {}
            }
        }
    }

    /// Update, advance and clean in one go, using internal scratch masks.
    pub fn tick(&mut self, time: Nanoseconds) -> AnimatorUpdates {
        let mut masks = std::mem::take(&mut self.masks);
        let updates = self.update(time, &mut masks);
        if updates.contains(AnimatorUpdates::ADVANCE) {
            self.advance(&masks.active, &masks.started, &masks.stopped, &masks.factors);
        }
        if updates.contains(AnimatorUpdates::CLEAN) {
            self.clean(&masks.remove);
        }
        self.masks = masks;
        updates
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn is_valid(&self, handle: AnimationHandle) -> bool {
        self.pool.is_valid(handle)
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn used_count(&self) -> usize {
        self.pool.used_count()
    }

    /// Time of the last update.
    pub fn time(&self) -> Nanoseconds {
        self.time
    }

    /// State as of the last update time.
    pub fn state(&self, handle: AnimationHandle) -> AnimationState {
        self.animation(handle, "state").state_at(self.time)
    }

    /// Normalized elapsed time as of the last update time, before easing.
    pub fn factor(&self, handle: AnimationHandle) -> f32 {
        let animation = self.animation(handle, "factor");
        match animation.state_at(self.time) {
            AnimationState::Scheduled => 0.0,
            AnimationState::Stopped => 1.0,
            AnimationState::Playing | AnimationState::Paused => animation.factor_at(self.time),
        }
    }

    pub fn start(&self, handle: AnimationHandle) -> Nanoseconds {
        self.animation(handle, "start").start
    }

    pub fn duration(&self, handle: AnimationHandle) -> Nanoseconds {
        self.animation(handle, "duration").duration
    }

    pub fn repeat_count(&self, handle: AnimationHandle) -> u32 {
        self.animation(handle, "repeat_count").repeat_count
    }

    pub fn flags(&self, handle: AnimationHandle) -> AnimationFlags {
        self.animation(handle, "flags").flags
    }

    pub fn attachment(&self, handle: AnimationHandle) -> Option<Attachment> {
        self.animation(handle, "attachment").attachment
    }

    fn animation(&self, handle: AnimationHandle, operation: &str) -> &Animation {
        assert!(
            self.pool.is_valid(handle),
            "AnimationScheduler::{operation}(): invalid handle {handle}"
        );
        &self.animations[handle.id() as usize]
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

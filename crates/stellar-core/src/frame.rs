//! Double-buffered frame exchange.
//!
//! Two fixed [`FrameData`] slots and an atomic front index. The producer
//! (simulation side) always writes the back slot and flips the index only
//! after a complete, successful build. The consumer (render side) only ever
//! reads the front slot. Both slots sit behind their own mutex so a reader and
//! a writer never touch the same slot at once.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::layout::FrameUniforms;
use crate::pack::InstanceBuffer;

/// Everything the rasterizer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameData {
    pub instances: InstanceBuffer,
    pub uniforms: FrameUniforms,
    /// Publish sequence number, assigned by the exchange.
    pub frame_index: u64,
}

#[derive(Debug, Default)]
struct Slot {
    data: FrameData,
    ready: bool,
}

#[derive(Debug, Default)]
struct Shared {
    slots: [Mutex<Slot>; 2],
    front: AtomicUsize,
    published: AtomicU64,
}

impl Shared {
    #[inline]
    fn lock(&self, i: usize) -> MutexGuard<'_, Slot> {
        // A panic mid-build leaves `ready == false`, so the data is safe to reuse.
        self.slots[i].lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate(&self) {
        let front = self.front.load(Ordering::Acquire);
        self.lock(front).ready = false;
    }
}

/// Creates a connected producer/consumer pair.
pub fn frame_exchange() -> (FrameProducer, FrameConsumer) {
    let shared = Arc::new(Shared::default());
    (
        FrameProducer {
            shared: Arc::clone(&shared),
        },
        FrameConsumer { shared },
    )
}

/// Simulation-side handle. Not `Clone`: there is exactly one writer.
#[derive(Debug)]
pub struct FrameProducer {
    shared: Arc<Shared>,
}

impl FrameProducer {
    /// Builds the next frame into the back slot and publishes it on success.
    ///
    /// If `build` fails the slot is left not-ready, the previously published
    /// frame stays visible, and the error is returned. On success returns the
    /// new frame's sequence number.
    pub fn publish<E>(&mut self, build: impl FnOnce(&mut FrameData) -> Result<(), E>) -> Result<u64, E> {
        let front = self.shared.front.load(Ordering::Acquire);
        let back = 1 - front;

        let mut slot = self.shared.lock(back);
        slot.ready = false;
        build(&mut slot.data)?;

        let seq = self.shared.published.load(Ordering::Relaxed) + 1;
        slot.data.frame_index = seq;
        slot.ready = true;

        // Flip while still holding the slot; readers re-check `front` after locking.
        self.shared.front.store(back, Ordering::Release);
        self.shared.published.store(seq, Ordering::Release);
        Ok(seq)
    }

    /// Number of frames published so far.
    #[inline]
    pub fn published(&self) -> u64 {
        self.shared.published.load(Ordering::Acquire)
    }

    /// Withdraws the visible frame; readers see nothing until the next publish.
    pub fn invalidate(&self) {
        self.shared.invalidate();
    }
}

/// Render-side handle.
#[derive(Debug, Clone)]
pub struct FrameConsumer {
    shared: Arc<Shared>,
}

impl FrameConsumer {
    /// Locks and returns the latest complete frame, or `None` if nothing is visible.
    ///
    /// Hold the returned view only for the duration of the upload.
    pub fn latest(&self) -> Option<FrameView<'_>> {
        // The producer can flip at most once per completed build, so two tries suffice
        // unless it is publishing faster than we lock; then skip this frame.
        for _ in 0..2 {
            let front = self.shared.front.load(Ordering::Acquire);
            let slot = self.shared.lock(front);
            if self.shared.front.load(Ordering::Acquire) != front {
                continue;
            }
            return slot.ready.then_some(FrameView { slot });
        }
        None
    }

    /// Sequence number of the most recent publish (0 before the first).
    #[inline]
    pub fn published(&self) -> u64 {
        self.shared.published.load(Ordering::Acquire)
    }

    /// Withdraws the visible frame (e.g. on resize).
    pub fn invalidate(&self) {
        self.shared.invalidate();
    }
}

/// Read guard over the front slot.
pub struct FrameView<'a> {
    slot: MutexGuard<'a, Slot>,
}

impl Deref for FrameView<'_> {
    type Target = FrameData;

    #[inline]
    fn deref(&self) -> &FrameData {
        &self.slot.data
    }
}

impl std::fmt::Debug for FrameView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameView")
            .field("frame_index", &self.slot.data.frame_index)
            .field("instances", &self.slot.data.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::InstanceRecord;

    fn fill(n: usize, time: f32) -> impl FnOnce(&mut FrameData) -> Result<(), ()> {
        move |f| {
            f.instances.clear();
            for _ in 0..n {
                f.instances.push(InstanceRecord::default());
            }
            f.uniforms.time = time;
            Ok(())
        }
    }

    #[test]
    fn nothing_visible_before_first_publish() {
        let (_p, c) = frame_exchange();
        assert!(c.latest().is_none());
        assert_eq!(c.published(), 0);
    }

    #[test]
    fn publish_makes_frame_visible() {
        let (mut p, c) = frame_exchange();
        assert_eq!(p.publish(fill(3, 1.0)), Ok(1));
        let f = c.latest().unwrap();
        assert_eq!(f.instances.len(), 3);
        assert_eq!(f.uniforms.time, 1.0);
        assert_eq!(f.frame_index, 1);
    }

    #[test]
    fn failed_build_is_never_exposed() {
        let (mut p, c) = frame_exchange();
        p.publish(fill(2, 1.0)).unwrap();

        let err = p.publish(|f: &mut FrameData| {
            f.instances.clear();
            f.uniforms.time = 99.0;
            Err("boom")
        });
        assert_eq!(err, Err("boom"));

        let f = c.latest().unwrap();
        assert_eq!(f.uniforms.time, 1.0);
        assert_eq!(f.instances.len(), 2);
        assert_eq!(c.published(), 1);
    }

    #[test]
    fn writer_alternates_slots() {
        let (mut p, c) = frame_exchange();
        p.publish(fill(1, 1.0)).unwrap();
        {
            // Reader holds frame 1 while the writer builds frame 2 in the other slot.
            let held = c.latest().unwrap();
            p.publish(fill(2, 2.0)).unwrap();
            assert_eq!(held.uniforms.time, 1.0);
        }
        assert_eq!(c.latest().unwrap().uniforms.time, 2.0);
    }

    #[test]
    fn invalidate_hides_frame_until_next_publish() {
        let (mut p, c) = frame_exchange();
        p.publish(fill(1, 1.0)).unwrap();
        c.invalidate();
        assert!(c.latest().is_none());
        p.publish(fill(1, 2.0)).unwrap();
        assert!(c.latest().is_some());
    }

    #[test]
    fn frames_cross_threads_intact() {
        let (mut p, c) = frame_exchange();

        let writer = std::thread::spawn(move || {
            for i in 1..=500u32 {
                let n = (i % 17) as usize;
                p.publish(|f: &mut FrameData| {
                    f.instances.clear();
                    for _ in 0..n {
                        f.instances.push(InstanceRecord {
                            seed: i as f32,
                            ..InstanceRecord::default()
                        });
                    }
                    f.uniforms.time = i as f32;
                    Ok::<(), ()>(())
                })
                .unwrap();
            }
        });

        let mut last = 0u64;
        while !writer.is_finished() || last < 500 {
            if let Some(f) = c.latest() {
                // Every record belongs to the same build as the uniforms.
                let t = f.uniforms.time;
                assert_eq!(f.instances.len(), (t as u32 % 17) as usize);
                assert!(f.instances.as_slice().iter().all(|r| r.seed == t));
                assert!(f.frame_index >= last);
                last = f.frame_index;
            }
            if writer.is_finished() && last == c.published() {
                break;
            }
        }
        writer.join().unwrap();
        assert_eq!(c.published(), 500);
    }
}

//! Generational handle registry backing the checked API.
//!
//! A handle packs three fields into a `usize`, low bits first: `slot index
//! + 1`, the registry tag, and the slot generation. Releasing an object bumps
//! the slot generation, so every handle that named it turns stale instead of
//! aliasing whatever takes the slot next. A slot whose generation cannot grow
//! any further is retired for good.
//!
//! The registry is thread-local. Every registry draws a process-unique tag
//! the first time it issues a handle, so two threads never hand out the same
//! value and a handle taken to another thread is simply unknown there. No
//! locking is involved.

use std::any::Any;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::native::{NativeBuffer, NativePerson};
use crate::types::Options;

const INDEX_BITS: u32 = usize::BITS * 5 / 16;
const TAG_BITS: u32 = usize::BITS * 5 / 16;
const GENERATION_SHIFT: u32 = INDEX_BITS + TAG_BITS;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;
const TAG_MASK: usize = (1 << TAG_BITS) - 1;
const MAX_TAG: usize = TAG_MASK;
const MAX_GENERATION: usize = usize::MAX >> GENERATION_SHIFT;

/// Most slots a handle can address.
pub const MAX_SLOTS: usize = INDEX_MASK;

/// Tags are never handed out twice, even after the owning thread exits.
static NEXT_TAG: AtomicUsize = AtomicUsize::new(1);

fn next_tag() -> Result<usize> {
    let tag = NEXT_TAG.fetch_add(1, Ordering::Relaxed);
    if tag > MAX_TAG {
        return Err(Error::AllocationFailed("registry tags exhausted".to_string()));
    }
    Ok(tag)
}

/// An object kind that can live in the registry.
pub trait Object: Any {
    /// Name used in `WrongKind` errors and logs.
    const KIND: &'static str;
}

impl Object for NativePerson {
    const KIND: &'static str = "person";
}

impl Object for NativeBuffer {
    const KIND: &'static str = "buffer";
}

struct Entry {
    kind: &'static str,
    object: Box<dyn Any>,
}

#[derive(Default)]
struct Slot {
    generation: usize,
    retired: bool,
    entry: Option<Entry>,
}

enum Lookup {
    Live(usize),
    Destroyed,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Unpacked {
    tag: usize,
    index: usize,
    generation: usize,
}

fn pack(tag: usize, index: usize, generation: usize) -> usize {
    (generation << GENERATION_SHIFT) | (tag << INDEX_BITS) | (index + 1)
}

fn unpack(raw: usize) -> Option<Unpacked> {
    match raw & INDEX_MASK {
        0 => None,
        low => Some(Unpacked {
            tag: (raw >> INDEX_BITS) & TAG_MASK,
            index: low - 1,
            generation: raw >> GENERATION_SHIFT,
        }),
    }
}

/// Slot table of live objects.
pub struct Registry {
    tag: Option<usize>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
    options: Options,
    init_count: usize,
}

impl Registry {
    pub fn new(options: Options) -> Self {
        Self {
            tag: None,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            options: options.clamped(),
            init_count: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of live handles.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Take ownership of `object` and issue a handle for it.
    pub fn insert<T: Object>(&mut self, object: Box<T>) -> Result<usize> {
        if self.live >= self.options.max_handles {
            return Err(Error::AllocationFailed(format!(
                "handle table full ({} live)",
                self.live
            )));
        }

        let tag = match self.tag {
            Some(tag) => tag,
            None => {
                let tag = next_tag()?;
                self.tag = Some(tag);
                tag
            }
        };

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots
                    .try_reserve(1)
                    .map_err(|e| Error::AllocationFailed(format!("handle table: {}", e)))?;
                // Room for every slot on the free list, so release never allocates.
                let needed = (self.slots.len() + 1).saturating_sub(self.free.len());
                self.free
                    .try_reserve(needed)
                    .map_err(|e| Error::AllocationFailed(format!("handle table: {}", e)))?;
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.entry = Some(Entry {
            kind: T::KIND,
            object,
        });
        self.live += 1;

        let raw = pack(tag, index, slot.generation);
        log::debug!("registered {} handle {:#x}", T::KIND, raw);
        Ok(raw)
    }

    fn locate(&self, raw: usize) -> Lookup {
        let Some(Unpacked {
            tag,
            index,
            generation,
        }) = unpack(raw)
        else {
            return Lookup::Unknown;
        };
        if self.tag != Some(tag) {
            return Lookup::Unknown;
        }
        let Some(slot) = self.slots.get(index) else {
            return Lookup::Unknown;
        };

        if slot.entry.is_some() && generation == slot.generation {
            Lookup::Live(index)
        } else if generation < slot.generation || (slot.retired && generation == slot.generation)
        {
            Lookup::Destroyed
        } else {
            Lookup::Unknown
        }
    }

    fn live_index<T: Object>(&self, raw: usize, destroyed: Error) -> Result<usize> {
        match self.locate(raw) {
            Lookup::Live(index) => {
                let kind = self.slots[index].entry.as_ref().map(|e| e.kind);
                match kind {
                    Some(kind) if kind == T::KIND => Ok(index),
                    other => Err(Error::WrongKind {
                        expected: T::KIND.to_string(),
                        found: other.unwrap_or("nothing").to_string(),
                    }),
                }
            }
            Lookup::Destroyed => Err(destroyed),
            Lookup::Unknown => Err(Error::InvalidHandle),
        }
    }

    pub fn get<T: Object>(&self, raw: usize) -> Result<&T> {
        let index = self.live_index::<T>(raw, Error::UseAfterFree)?;
        self.slots[index]
            .entry
            .as_ref()
            .and_then(|e| e.object.downcast_ref::<T>())
            .ok_or(Error::InvalidHandle)
    }

    pub fn get_mut<T: Object>(&mut self, raw: usize) -> Result<&mut T> {
        let index = self.live_index::<T>(raw, Error::UseAfterFree)?;
        self.slots[index]
            .entry
            .as_mut()
            .and_then(|e| e.object.downcast_mut::<T>())
            .ok_or(Error::InvalidHandle)
    }

    /// Release the object behind `raw` and hand it back to the caller.
    pub fn remove<T: Object>(&mut self, raw: usize) -> Result<Box<T>> {
        let index = self.live_index::<T>(raw, Error::DoubleFree)?;
        let slot = &mut self.slots[index];
        let entry = slot.entry.take().ok_or(Error::InvalidHandle)?;

        if slot.generation == MAX_GENERATION {
            slot.retired = true;
        } else {
            slot.generation += 1;
            self.free.push(index);
        }
        self.live -= 1;
        log::debug!("released {} handle {:#x}", T::KIND, raw);

        entry.object.downcast::<T>().map_err(|_| Error::InvalidHandle)
    }

    pub(crate) fn configure(&mut self, options: &Options) {
        self.options = options.clamped();
    }

    pub(crate) fn acquire(&mut self) {
        self.init_count += 1;
    }

    /// Balance one `acquire`. The last release refuses while handles live.
    pub(crate) fn release(&mut self) -> Result<()> {
        if self.init_count <= 1 && self.live > 0 {
            return Err(Error::HandlesOutstanding(self.live));
        }
        self.init_count = self.init_count.saturating_sub(1);
        Ok(())
    }
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::new(Options::default()));
}

/// Run `f` against the calling thread's registry.
///
/// Once the thread has begun tearing down its locals the registry and every
/// object in it are gone; each handle then reports `InvalidHandle`.
pub(crate) fn with_registry<R>(f: impl FnOnce(&mut Registry) -> Result<R>) -> Result<R> {
    REGISTRY
        .try_with(|cell| f(&mut cell.borrow_mut()))
        .unwrap_or(Err(Error::InvalidHandle))
}

/// Whether the calling thread's registry still exists.
pub(crate) fn registry_alive() -> bool {
    REGISTRY.try_with(|_| ()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::try_box;
    use pretty_assertions::assert_eq;

    fn person(name: &str, age: i32) -> Box<NativePerson> {
        try_box(NativePerson::new(name, age).unwrap()).unwrap()
    }

    fn registry(max_handles: usize) -> Registry {
        Registry::new(Options { max_handles })
    }

    #[test]
    fn test_pack_unpack() {
        assert_eq!(unpack(0), None);
        assert_ne!(pack(0, 0, 0), 0);
        assert_eq!(
            unpack(pack(3, 41, 7)),
            Some(Unpacked {
                tag: 3,
                index: 41,
                generation: 7
            })
        );
        let top = unpack(pack(MAX_TAG, MAX_SLOTS - 1, MAX_GENERATION)).unwrap();
        assert_eq!(top.tag, MAX_TAG);
        assert_eq!(top.index, MAX_SLOTS - 1);
        assert_eq!(top.generation, MAX_GENERATION);
    }

    #[test]
    fn test_registries_never_share_handles() {
        let mut a = registry(8);
        let mut b = registry(8);
        let ha = a.insert(person("a", 1)).unwrap();
        let hb = b.insert(person("b", 2)).unwrap();
        assert_ne!(ha, hb);
        assert_eq!(unpack(ha).unwrap().index, unpack(hb).unwrap().index);

        assert_eq!(a.get::<NativePerson>(hb).unwrap_err(), Error::InvalidHandle);
        assert_eq!(
            b.remove::<NativePerson>(ha).unwrap_err(),
            Error::InvalidHandle
        );
        assert_eq!(b.get::<NativePerson>(hb).unwrap().age(), 2);
        assert_eq!(b.live(), 1);
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        let r = registry(8);
        assert_eq!(
            r.get::<NativePerson>(pack(1, 0, 0)).unwrap_err(),
            Error::InvalidHandle
        );
    }

    #[test]
    fn test_insert_get_remove() {
        let mut r = registry(8);
        let h = r.insert(person("gopher", 10)).unwrap();
        assert_eq!(r.live(), 1);
        assert_eq!(r.get::<NativePerson>(h).unwrap().name(), "gopher");

        r.get_mut::<NativePerson>(h).unwrap().set_age(11);
        let p = r.remove::<NativePerson>(h).unwrap();
        assert_eq!(p.age(), 11);
        assert_eq!(r.live(), 0);
    }

    #[test]
    fn test_stale_handle_errors() {
        let mut r = registry(8);
        let h = r.insert(person("gopher", 10)).unwrap();
        r.remove::<NativePerson>(h).unwrap();

        assert_eq!(r.remove::<NativePerson>(h).unwrap_err(), Error::DoubleFree);
        assert_eq!(r.get::<NativePerson>(h).unwrap_err(), Error::UseAfterFree);
        assert_eq!(
            r.get_mut::<NativePerson>(h).unwrap_err(),
            Error::UseAfterFree
        );
    }

    #[test]
    fn test_never_issued() {
        let mut r = registry(8);
        assert_eq!(r.get::<NativePerson>(0).unwrap_err(), Error::InvalidHandle);
        let h = r.insert(person("gopher", 10)).unwrap();
        let u = unpack(h).unwrap();
        assert_eq!(
            r.get::<NativePerson>(pack(u.tag, 5, 0)).unwrap_err(),
            Error::InvalidHandle
        );
        assert_eq!(
            r.remove::<NativePerson>(pack(u.tag, u.index, u.generation + 1))
                .unwrap_err(),
            Error::InvalidHandle
        );
        assert_eq!(r.live(), 1);
    }

    #[test]
    fn test_wrong_kind_leaves_object() {
        let mut r = registry(8);
        let h = r.insert(try_box(NativeBuffer::new(4).unwrap()).unwrap()).unwrap();

        let err = r.remove::<NativePerson>(h).unwrap_err();
        assert_eq!(
            err,
            Error::WrongKind {
                expected: "person".into(),
                found: "buffer".into()
            }
        );
        assert_eq!(r.get::<NativeBuffer>(h).unwrap().size(), 4);
    }

    #[test]
    fn test_reused_slot_gets_new_handle() {
        let mut r = registry(8);
        let old = r.insert(person("a", 1)).unwrap();
        r.remove::<NativePerson>(old).unwrap();

        let new = r.insert(person("b", 2)).unwrap();
        assert_ne!(old, new);
        assert_eq!(unpack(old).unwrap().index, unpack(new).unwrap().index);
        assert_eq!(r.get::<NativePerson>(old).unwrap_err(), Error::UseAfterFree);
        assert_eq!(r.get::<NativePerson>(new).unwrap().name(), "b");
    }

    #[test]
    fn test_capacity_exhaustion_recovers() {
        let mut r = registry(2);
        let a = r.insert(person("a", 1)).unwrap();
        let _b = r.insert(person("b", 2)).unwrap();
        assert!(r.insert(person("c", 3)).unwrap_err().is_allocation_failed());

        r.remove::<NativePerson>(a).unwrap();
        assert!(r.insert(person("c", 3)).is_ok());
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let mut r = registry(8);
        let h = r.insert(person("a", 1)).unwrap();
        let Unpacked { tag, index, .. } = unpack(h).unwrap();

        r.slots[index].generation = MAX_GENERATION;
        let last = pack(tag, index, MAX_GENERATION);
        r.remove::<NativePerson>(last).unwrap();

        assert_eq!(r.remove::<NativePerson>(last).unwrap_err(), Error::DoubleFree);
        let next = r.insert(person("b", 2)).unwrap();
        assert_ne!(unpack(next).unwrap().index, index);
    }

    #[test]
    fn test_release_refuses_with_live_handles() {
        let mut r = registry(8);
        r.acquire();
        let h = r.insert(person("a", 1)).unwrap();
        assert_eq!(r.release().unwrap_err(), Error::HandlesOutstanding(1));

        r.remove::<NativePerson>(h).unwrap();
        assert!(r.release().is_ok());
    }

    #[test]
    fn test_nested_acquire() {
        let mut r = registry(8);
        r.acquire();
        r.acquire();
        let _h = r.insert(person("a", 1)).unwrap();
        assert!(r.release().is_ok());
        assert!(r.release().is_err());
    }
}

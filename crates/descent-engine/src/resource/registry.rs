use std::collections::{HashMap, HashSet, VecDeque};

use slotmap::{SlotMap, new_key_type};

use crate::error::{ResourceCreationError, ResourceError};
use crate::text::GlyphMetrics;

use super::descriptor::{BufferUsage, GpuResourceDescriptor, TextureFormat};
use super::handle::{ContextId, GpuResource, NativeHandle, ResourceKind};

new_key_type! {
    /// Registry slot of one GPU resource.
    pub struct ResourceKey;
}

/// Metadata recorded at creation time, queryable without touching the GPU.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceInfo {
    Texture {
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    Shader {
        vertex_entry: String,
        fragment_entry: String,
    },
    Buffer {
        usage: BufferUsage,
        size: u64,
    },
    FontAtlas {
        width: u32,
        height: u32,
        metrics: GlyphMetrics,
    },
}

/// Observable state of a handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceState {
    Live { ref_count: u32 },
    /// Native object destroyed by context teardown.
    Invalid,
    /// Last reference released; the slot is gone.
    Released,
}

/// Tombstones kept before the oldest are forgotten.
pub const DEFAULT_TOMBSTONE_LIMIT: usize = 1 << 16;

#[derive(Debug)]
enum Slot {
    Live {
        native: NativeHandle,
        ref_count: u32,
        info: ResourceInfo,
    },
    Invalid,
}

#[derive(Debug)]
struct Entry {
    kind: ResourceKind,
    context: ContextId,
    slot: Slot,
}

/// Book-keeping for every GPU object across all contexts.
///
/// Native creation and destruction are passed in as closures so the
/// registry stays independent of any graphics backend. Invalidated entries
/// stay as small tombstones so stale handles keep failing with
/// `UseAfterInvalidation` instead of looking released. Only the newest
/// `tombstone_limit` are kept; handles older than that report `Released`.
/// `invalidated` holds one id per torn-down context and is never pruned,
/// so a dead context can never be reused.
#[derive(Debug)]
pub struct ResourceRegistry {
    entries: SlotMap<ResourceKey, Entry>,
    // Creation order, walked on teardown.
    by_context: HashMap<ContextId, Vec<ResourceKey>>,
    invalidated: HashSet<ContextId>,
    // Invalidation order, oldest first.
    tombstones: VecDeque<ResourceKey>,
    tombstone_limit: usize,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self {
            entries: SlotMap::with_key(),
            by_context: HashMap::new(),
            invalidated: HashSet::new(),
            tombstones: VecDeque::new(),
            tombstone_limit: DEFAULT_TOMBSTONE_LIMIT,
        }
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tombstone_limit(mut self, limit: usize) -> Self {
        self.tombstone_limit = limit;
        self
    }

    /// Creates the native object through `create` and registers it with a
    /// reference count of one. Nothing is registered when `create` fails.
    pub fn acquire<F>(
        &mut self,
        context: ContextId,
        desc: &GpuResourceDescriptor,
        create: F,
    ) -> Result<GpuResource, ResourceError>
    where
        F: FnOnce(&GpuResourceDescriptor) -> Result<NativeHandle, String>,
    {
        if self.invalidated.contains(&context) {
            return Err(ResourceError::ContextUnavailable(context));
        }

        let kind = desc.kind();
        let native = create(desc).map_err(|diagnostic| ResourceCreationError {
            kind,
            label: desc.label().map(str::to_string),
            diagnostic,
        })?;

        let key = self.entries.insert(Entry {
            kind,
            context,
            slot: Slot::Live {
                native,
                ref_count: 1,
                info: desc.info(),
            },
        });
        self.by_context.entry(context).or_default().push(key);

        log::debug!("acquired {kind} {key:?} in {context} (native {})", native.0);
        Ok(GpuResource { key, context, kind })
    }

    /// Adds an owner. Returns the new count.
    pub fn retain(&mut self, res: GpuResource) -> Result<u32, ResourceError> {
        let entry = self.entry_mut(res)?;
        match &mut entry.slot {
            Slot::Live { ref_count, .. } => {
                *ref_count = ref_count
                    .checked_add(1)
                    .ok_or(ResourceError::RefCountOverflow { kind: entry.kind })?;
                Ok(*ref_count)
            }
            Slot::Invalid => Err(ResourceError::UseAfterInvalidation { kind: entry.kind }),
        }
    }

    /// Drops an owner. At zero the native object is handed to `destroy` and
    /// the slot is removed. Returns the remaining count.
    pub fn release<F>(&mut self, res: GpuResource, destroy: F) -> Result<u32, ResourceError>
    where
        F: FnOnce(NativeHandle),
    {
        let entry = self.entry_mut(res)?;
        let kind = entry.kind;
        let (native, remaining) = match &mut entry.slot {
            Slot::Live {
                native, ref_count, ..
            } => {
                *ref_count -= 1;
                (*native, *ref_count)
            }
            Slot::Invalid => return Err(ResourceError::UseAfterInvalidation { kind }),
        };

        if remaining == 0 {
            self.entries.remove(res.key);
            if let Some(keys) = self.by_context.get_mut(&res.context) {
                keys.retain(|k| *k != res.key);
            }
            destroy(native);
            log::debug!("released {kind} {:?} (native {})", res.key, native.0);
        }
        Ok(remaining)
    }

    /// Native object behind a live handle.
    pub fn resolve(&self, res: GpuResource) -> Result<NativeHandle, ResourceError> {
        let entry = self.entry(res)?;
        match entry.slot {
            Slot::Live { native, .. } => Ok(native),
            Slot::Invalid => Err(ResourceError::UseAfterInvalidation { kind: entry.kind }),
        }
    }

    /// Like `resolve`, also checking kind and owning context.
    pub fn resolve_for(
        &self,
        res: GpuResource,
        context: ContextId,
        accept: impl Fn(ResourceKind) -> bool,
        expected: ResourceKind,
    ) -> Result<NativeHandle, ResourceError> {
        let native = self.resolve(res)?;
        if res.context != context {
            return Err(ResourceError::ForeignContext {
                resource: res.context,
                context,
            });
        }
        if !accept(res.kind) {
            return Err(ResourceError::WrongKind {
                expected,
                actual: res.kind,
            });
        }
        Ok(native)
    }

    pub fn info(&self, res: GpuResource) -> Result<&ResourceInfo, ResourceError> {
        let entry = self.entry(res)?;
        match &entry.slot {
            Slot::Live { info, .. } => Ok(info),
            Slot::Invalid => Err(ResourceError::UseAfterInvalidation { kind: entry.kind }),
        }
    }

    pub fn state(&self, res: GpuResource) -> ResourceState {
        match self.entries.get(res.key) {
            None => ResourceState::Released,
            Some(Entry {
                slot: Slot::Live { ref_count, .. },
                ..
            }) => ResourceState::Live {
                ref_count: *ref_count,
            },
            Some(Entry {
                slot: Slot::Invalid,
                ..
            }) => ResourceState::Invalid,
        }
    }

    /// Live resources owned by `context`.
    pub fn live_count(&self, context: ContextId) -> usize {
        self.by_context.get(&context).map_or(0, Vec::len)
    }

    /// Destroys every live resource of `context` regardless of reference
    /// count and marks the handles invalid. Runs once per context; later
    /// calls are no-ops. Returns the number of destroyed objects.
    pub fn invalidate_all<F>(&mut self, context: ContextId, mut destroy: F) -> usize
    where
        F: FnMut(NativeHandle),
    {
        if !self.invalidated.insert(context) {
            log::warn!("{context} already invalidated, skipping");
            return 0;
        }

        let keys = self.by_context.remove(&context).unwrap_or_default();
        let mut destroyed = 0;
        for key in keys {
            let Some(entry) = self.entries.get_mut(key) else {
                continue;
            };
            if let Slot::Live {
                native, ref_count, ..
            } = entry.slot
            {
                if ref_count > 0 {
                    log::debug!(
                        "force-destroying {} {key:?} with {ref_count} outstanding reference(s)",
                        entry.kind
                    );
                }
                destroy(native);
                entry.slot = Slot::Invalid;
                self.tombstones.push_back(key);
                destroyed += 1;
            }
        }
        self.prune_tombstones();

        log::debug!("invalidated {destroyed} resource(s) of {context}");
        destroyed
    }

    /// Tombstones currently remembered.
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    fn prune_tombstones(&mut self) {
        let excess = self.tombstones.len().saturating_sub(self.tombstone_limit);
        for key in self.tombstones.drain(..excess) {
            self.entries.remove(key);
        }
        if excess > 0 {
            log::debug!("forgot {excess} old tombstone(s)");
        }
    }

    pub fn is_invalidated(&self, context: ContextId) -> bool {
        self.invalidated.contains(&context)
    }

    fn entry(&self, res: GpuResource) -> Result<&Entry, ResourceError> {
        self.entries
            .get(res.key)
            .ok_or(ResourceError::UseAfterRelease)
    }

    fn entry_mut(&mut self, res: GpuResource) -> Result<&mut Entry, ResourceError> {
        self.entries
            .get_mut(res.key)
            .ok_or(ResourceError::UseAfterRelease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BufferDescriptor, ShaderDescriptor};

    const CTX: ContextId = ContextId::from_raw(1);
    const OTHER: ContextId = ContextId::from_raw(2);

    struct Natives {
        next: u64,
        destroyed: Vec<NativeHandle>,
    }

    impl Natives {
        fn new() -> Self {
            Self {
                next: 100,
                destroyed: Vec::new(),
            }
        }

        fn create(
            &mut self,
        ) -> impl FnOnce(&GpuResourceDescriptor) -> Result<NativeHandle, String> + use<> {
            self.next += 1;
            let h = NativeHandle(self.next);
            move |_| Ok(h)
        }

        fn destroy_count(&self, h: NativeHandle) -> usize {
            self.destroyed.iter().filter(|d| **d == h).count()
        }
    }

    fn shader() -> GpuResourceDescriptor {
        GpuResourceDescriptor::Shader(ShaderDescriptor::sprite())
    }

    fn buffer() -> GpuResourceDescriptor {
        GpuResourceDescriptor::Buffer(BufferDescriptor::indices(&[0, 1, 2, 0]))
    }

    #[test]
    fn acquire_starts_at_one_reference() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        let res = reg.acquire(CTX, &shader(), n.create()).unwrap();
        assert_eq!(res.kind(), ResourceKind::Shader);
        assert_eq!(reg.state(res), ResourceState::Live { ref_count: 1 });
        assert_eq!(reg.live_count(CTX), 1);
    }

    #[test]
    fn native_destroyed_exactly_once_at_zero() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        let res = reg.acquire(CTX, &buffer(), n.create()).unwrap();
        let native = reg.resolve(res).unwrap();

        assert_eq!(reg.retain(res), Ok(2));
        assert_eq!(reg.retain(res), Ok(3));
        for expected in [2, 1] {
            assert_eq!(reg.release(res, |h| n.destroyed.push(h)), Ok(expected));
            assert_eq!(n.destroy_count(native), 0);
        }
        assert_eq!(reg.release(res, |h| n.destroyed.push(h)), Ok(0));
        assert_eq!(n.destroy_count(native), 1);

        assert_eq!(
            reg.release(res, |h| n.destroyed.push(h)),
            Err(ResourceError::UseAfterRelease)
        );
        assert_eq!(reg.retain(res), Err(ResourceError::UseAfterRelease));
        assert_eq!(n.destroy_count(native), 1);
        assert_eq!(reg.state(res), ResourceState::Released);
        assert_eq!(reg.live_count(CTX), 0);
    }

    #[test]
    fn failed_creation_registers_nothing() {
        let mut reg = ResourceRegistry::new();
        let err = reg
            .acquire(CTX, &shader(), |_| Err("compile error at 3:7".to_string()))
            .unwrap_err();
        match err {
            ResourceError::Creation(e) => {
                assert_eq!(e.kind, ResourceKind::Shader);
                assert_eq!(e.diagnostic, "compile error at 3:7");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(reg.live_count(CTX), 0);
    }

    #[test]
    fn invalidate_all_destroys_regardless_of_count() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        let a = reg.acquire(CTX, &shader(), n.create()).unwrap();
        let b = reg.acquire(CTX, &buffer(), n.create()).unwrap();
        let other = reg.acquire(OTHER, &buffer(), n.create()).unwrap();
        reg.retain(a).unwrap();
        let (na, nb) = (reg.resolve(a).unwrap(), reg.resolve(b).unwrap());

        let destroyed = reg.invalidate_all(CTX, |h| n.destroyed.push(h));
        assert_eq!(destroyed, 2);
        assert_eq!(n.destroyed, vec![na, nb]);

        let invalid = ResourceError::UseAfterInvalidation {
            kind: ResourceKind::Shader,
        };
        assert_eq!(reg.retain(a), Err(invalid.clone()));
        assert_eq!(reg.release(a, |h| n.destroyed.push(h)), Err(invalid.clone()));
        assert_eq!(reg.resolve(a), Err(invalid));
        assert_eq!(reg.state(b), ResourceState::Invalid);
        assert_eq!(n.destroy_count(na), 1);

        assert_eq!(reg.state(other), ResourceState::Live { ref_count: 1 });
        assert_eq!(reg.live_count(OTHER), 1);
    }

    #[test]
    fn invalidate_all_runs_once() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        reg.acquire(CTX, &shader(), n.create()).unwrap();
        assert_eq!(reg.invalidate_all(CTX, |h| n.destroyed.push(h)), 1);
        assert_eq!(reg.invalidate_all(CTX, |h| n.destroyed.push(h)), 0);
        assert_eq!(n.destroyed.len(), 1);

        let err = reg.acquire(CTX, &shader(), n.create()).unwrap_err();
        assert_eq!(err, ResourceError::ContextUnavailable(CTX));
    }

    #[test]
    fn released_resources_are_not_destroyed_again_on_teardown() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        let a = reg.acquire(CTX, &shader(), n.create()).unwrap();
        let na = reg.resolve(a).unwrap();
        reg.release(a, |h| n.destroyed.push(h)).unwrap();
        reg.invalidate_all(CTX, |h| n.destroyed.push(h));
        assert_eq!(n.destroy_count(na), 1);
        assert_eq!(reg.retain(a), Err(ResourceError::UseAfterRelease));
    }

    #[test]
    fn retain_refuses_to_overflow() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        let res = reg.acquire(CTX, &buffer(), n.create()).unwrap();
        if let Slot::Live { ref_count, .. } = &mut reg.entries[res.key].slot {
            *ref_count = u32::MAX - 1;
        }
        assert_eq!(reg.retain(res), Ok(u32::MAX));
        assert_eq!(
            reg.retain(res),
            Err(ResourceError::RefCountOverflow {
                kind: ResourceKind::Buffer
            })
        );
        assert_eq!(reg.state(res), ResourceState::Live { ref_count: u32::MAX });
    }

    #[test]
    fn old_tombstones_are_forgotten() {
        let mut reg = ResourceRegistry::new().with_tombstone_limit(2);
        let mut n = Natives::new();
        let contexts: Vec<ContextId> = (10..13).map(ContextId::from_raw).collect();
        let handles: Vec<GpuResource> = contexts
            .iter()
            .map(|&ctx| reg.acquire(ctx, &shader(), n.create()).unwrap())
            .collect();
        for &ctx in &contexts {
            reg.invalidate_all(ctx, |h| n.destroyed.push(h));
        }

        assert_eq!(reg.tombstone_count(), 2);
        assert_eq!(reg.state(handles[0]), ResourceState::Released);
        assert_eq!(reg.retain(handles[0]), Err(ResourceError::UseAfterRelease));
        assert_eq!(reg.state(handles[1]), ResourceState::Invalid);
        assert_eq!(reg.state(handles[2]), ResourceState::Invalid);
        assert_eq!(n.destroyed.len(), 3);

        // Forgetting a tombstone does not revive its context.
        assert_eq!(
            reg.acquire(contexts[0], &shader(), n.create()).unwrap_err(),
            ResourceError::ContextUnavailable(contexts[0])
        );
    }

    #[test]
    fn resolve_for_checks_context_and_kind() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        let res = reg.acquire(CTX, &buffer(), n.create()).unwrap();

        let err = reg
            .resolve_for(res, OTHER, |k| k == ResourceKind::Buffer, ResourceKind::Buffer)
            .unwrap_err();
        assert!(matches!(err, ResourceError::ForeignContext { .. }));

        let err = reg
            .resolve_for(res, CTX, ResourceKind::samplable, ResourceKind::Texture)
            .unwrap_err();
        assert_eq!(
            err,
            ResourceError::WrongKind {
                expected: ResourceKind::Texture,
                actual: ResourceKind::Buffer
            }
        );
    }

    #[test]
    fn info_reports_creation_metadata() {
        let mut reg = ResourceRegistry::new();
        let mut n = Natives::new();
        let res = reg.acquire(CTX, &buffer(), n.create()).unwrap();
        assert_eq!(
            reg.info(res).unwrap(),
            &ResourceInfo::Buffer {
                usage: BufferUsage::Index,
                size: 8
            }
        );
    }
}

use crate::device::{Device, TextureId};
use crate::error::{Error, Result};

/// Texture ids assigned to texture units for the current batch.
///
/// Slot 0 is reserved for the fallback (white) texture and survives every
/// reset. Lookups are a linear scan; slot counts are small (≤ 32).
#[derive(Debug, Clone)]
pub struct TextureSlots {
    ids: Vec<TextureId>,
    capacity: usize,
}

impl TextureSlots {
    /// Creates a table of `capacity` slots with `fallback` in slot 0.
    pub fn new(capacity: usize, fallback: TextureId) -> Self {
        let mut ids = Vec::with_capacity(capacity);
        ids.push(fallback);
        Self { ids, capacity }
    }

    /// Slot holding `id`, if assigned in this batch.
    pub fn find(&self, id: TextureId) -> Option<u32> {
        self.ids.iter().position(|&t| t == id).map(|i| i as u32)
    }

    /// Slot the next `push` will use.
    #[inline]
    pub fn next_slot(&self) -> u32 {
        self.ids.len() as u32
    }

    /// Records `id` in the next free slot and returns it.
    ///
    /// # Panics
    /// If the table is full or `id` is already present.
    pub fn push(&mut self, id: TextureId) -> u32 {
        assert!(!self.is_full(), "texture slot table overflow (capacity {})", self.capacity);
        assert!(self.find(id).is_none(), "texture {id} already has a slot");
        let slot = self.next_slot();
        self.ids.push(id);
        slot
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ids.len() >= self.capacity
    }

    /// Assigned slots, including the fallback.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn fallback(&self) -> TextureId {
        self.ids[0]
    }

    /// Drops every slot but the fallback and re-binds the fallback to unit 0.
    ///
    /// The table is truncated even when the bind fails.
    pub fn reset<D: Device + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        self.ids.truncate(1);
        let fallback = self.fallback();
        device
            .bind_texture(0, fallback)
            .map_err(|e| Error::device(format!("couldn't bind fallback texture {fallback} to unit 0"), e))
    }
}

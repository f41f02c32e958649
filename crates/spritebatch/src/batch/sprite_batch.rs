use std::fmt;

use crate::coords::{Color, Rect, Vec2, Viewport};
use crate::device::{BufferId, Device, FilterMode, TextureId};
use crate::error::{Error, ErrorKind, Result};
use crate::shader::Shader;
use crate::texture::Texture;

use super::geometry::GeometryBuffer;
use super::shaders::sprite_shader_sources;
use super::slots::TextureSlots;
use super::vertex::{quad, FLAT_COLOR_INDEX};

/// Sprite capacity used by [`SpriteBatch::init`].
pub const DEFAULT_MAX_SPRITES: usize = 1000;

/// Largest capacity whose vertex indices fit in `u32`.
pub const MAX_SPRITES: usize = u32::MAX as usize / 4;

/// Parameters for [`SpriteBatch::init_with`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Quads buffered before a flush is forced.
    pub max_sprites: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 600,
            max_sprites: DEFAULT_MAX_SPRITES,
        }
    }
}

/// Counters accumulated across flushes.
///
/// Every flush counts, including empty ones; `draw_calls` and `quads` only
/// count draws the device accepted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub flushes: u64,
    pub draw_calls: u64,
    pub quads: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FlushReason {
    BufferFull,
    SlotsFull,
    End,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlushReason::BufferFull => "buffer full",
            FlushReason::SlotsFull => "texture slots full",
            FlushReason::End => "end",
        })
    }
}

/// GPU and CPU state owned by an initiated batch.
#[derive(Debug)]
struct Resources {
    geometry: GeometryBuffer,
    slots: TextureSlots,
    shader: Shader,
    white: Texture,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
}

impl Resources {
    fn create<D: Device + ?Sized>(device: &mut D, capacity: usize, max_slots: u32) -> Result<Self> {
        let geometry = GeometryBuffer::new(capacity);
        let (vertex_buffer, index_buffer) = create_buffers(device, &geometry)?;

        let mut shader = Shader::from_sources(sprite_shader_sources(max_slots));
        let mut white = Texture::new();
        let fallback = match prepare_program(device, &mut shader, &mut white, max_slots) {
            Ok(id) => id,
            Err(e) => {
                white.cleanup(device);
                shader.cleanup(device);
                device.delete_buffer(index_buffer);
                device.delete_buffer(vertex_buffer);
                return Err(e);
            }
        };

        Ok(Self {
            geometry,
            slots: TextureSlots::new(max_slots as usize, fallback),
            shader,
            white,
            vertex_buffer,
            index_buffer,
        })
    }

    fn release<D: Device + ?Sized>(mut self, device: &mut D) {
        self.white.cleanup(device);
        self.shader.cleanup(device);
        device.delete_buffer(self.index_buffer);
        device.delete_buffer(self.vertex_buffer);
    }

    /// Draws the buffered quads, then resets the geometry and the slot table
    /// whatever the outcome. Returns the first error.
    fn flush<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        stats: &mut BatchStats,
        reason: FlushReason,
    ) -> Result<()> {
        let quads = self.geometry.len();
        let textures = self.slots.len();

        let drawn = if quads > 0 { self.draw(device) } else { Ok(()) };
        let reset = self.slots.reset(device);
        self.geometry.reset();

        stats.flushes += 1;
        if quads > 0 && drawn.is_ok() {
            stats.draw_calls += 1;
            stats.quads += quads as u64;
        }

        let result = drawn.and(reset);
        match &result {
            Ok(()) => log::debug!("SpriteBatch: flushed {quads} quads, {textures} textures ({reason})"),
            Err(e) => log::warn!("SpriteBatch: flush failed ({reason}), {quads} quads discarded: {e}"),
        }
        result
    }

    fn draw<D: Device + ?Sized>(&self, device: &mut D) -> Result<()> {
        self.shader.bind(device)?;
        device
            .write_vertices(self.vertex_buffer, self.geometry.vertices())
            .map_err(|e| Error::device("couldn't upload sprite vertices", e))?;
        device
            .draw_indexed(self.vertex_buffer, self.index_buffer, self.geometry.index_count())
            .map_err(|e| Error::device("couldn't draw sprite batch", e))
    }
}

fn create_buffers<D: Device + ?Sized>(
    device: &mut D,
    geometry: &GeometryBuffer,
) -> Result<(BufferId, BufferId)> {
    let vertices = device
        .create_vertex_buffer(geometry.capacity() * 4)
        .map_err(|e| Error::device("couldn't create vertex buffer", e))?;
    match device.create_index_buffer(geometry.indices()) {
        Ok(indices) => Ok((vertices, indices)),
        Err(e) => {
            device.delete_buffer(vertices);
            Err(Error::device("couldn't create index buffer", e))
        }
    }
}

/// Links the sprite program, maps sampler `i` to unit `i` and binds the white
/// fallback to unit 0. Returns the fallback id.
fn prepare_program<D: Device + ?Sized>(
    device: &mut D,
    shader: &mut Shader,
    white: &mut Texture,
    max_slots: u32,
) -> Result<TextureId> {
    shader.init(device)?;
    for slot in 0..max_slots {
        shader.set_int(device, &format!("textures[{slot}]"), slot as i32)?;
    }

    white.load(device, &[255, 255, 255], 1, 1, 3, FilterMode::Nearest)?;
    white.activate_and_bind(device, 0)?;
    white.id().ok_or_else(|| Error::not_initiated("fallback texture"))
}

/// Batched sprite renderer.
///
/// Lifecycle: `init` → (`begin` → draws → `end`)* → `cleanup`. Draw calls
/// buffer quads and flush automatically when the geometry buffer or the
/// texture slot table is full, so submission order is preserved across any
/// number of draw calls.
///
/// Textures passed to [`draw_sprite`](Self::draw_sprite) are borrowed; the
/// batch never releases them.
#[derive(Debug, Default)]
pub struct SpriteBatch {
    viewport: Viewport,
    state: Option<Resources>,
    begun: bool,
    stats: BatchStats,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initiates the batch with a [`DEFAULT_MAX_SPRITES`] capacity.
    pub fn init<D: Device + ?Sized>(&mut self, device: &mut D, width: u32, height: u32) -> Result<()> {
        self.init_with(
            device,
            BatchConfig {
                viewport_width: width,
                viewport_height: height,
                max_sprites: DEFAULT_MAX_SPRITES,
            },
        )
    }

    /// Allocates buffers, links the sprite program and binds the fallback
    /// texture. On failure nothing stays allocated and the call may be retried.
    pub fn init_with<D: Device + ?Sized>(&mut self, device: &mut D, config: BatchConfig) -> Result<()> {
        if self.state.is_some() {
            return Err(Error::new(ErrorKind::AlreadyLoaded, "sprite batch already initiated"));
        }

        let viewport = Viewport::new(config.viewport_width, config.viewport_height);
        if !viewport.is_valid() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("viewport {}x{} is empty", viewport.width, viewport.height),
            ));
        }
        if config.max_sprites == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "sprite capacity must be positive"));
        }
        if config.max_sprites > MAX_SPRITES {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("sprite capacity {} exceeds {MAX_SPRITES}", config.max_sprites),
            ));
        }

        let max_slots = device.max_texture_slots();
        if max_slots == 0 {
            return Err(Error::new(ErrorKind::GraphicsDevice, "device exposes no texture units"));
        }

        let resources = Resources::create(device, config.max_sprites, max_slots)?;
        log::info!(
            "SpriteBatch: initiated ({} sprites, {max_slots} texture slots, viewport {}x{})",
            config.max_sprites,
            viewport.width,
            viewport.height,
        );

        self.viewport = viewport;
        self.state = Some(resources);
        self.begun = false;
        Ok(())
    }

    /// Releases every resource the batch owns. Pending quads are dropped.
    pub fn cleanup<D: Device + ?Sized>(&mut self, device: &mut D) {
        if let Some(resources) = self.state.take() {
            resources.release(device);
        }
        self.begun = false;
        self.stats = BatchStats::default();
    }

    /// Viewport width used by later draws.
    pub fn set_width(&mut self, width: u32) -> Result<()> {
        if width == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "viewport width must be positive"));
        }
        self.viewport.width = width;
        Ok(())
    }

    /// Viewport height used by later draws.
    pub fn set_height(&mut self, height: u32) -> Result<()> {
        if height == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "viewport height must be positive"));
        }
        self.viewport.height = height;
        Ok(())
    }

    /// Sets the colour used by [`clear`](Self::clear). Alpha is always 1.
    pub fn set_clear_color<D: Device + ?Sized>(&mut self, device: &mut D, color: impl Into<Color>) -> Result<()> {
        self.resources()?;
        device.set_clear_color(color.into().opaque().to_array());
        Ok(())
    }

    pub fn clear<D: Device + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        self.resources()?;
        device
            .clear()
            .map_err(|e| Error::device("couldn't clear render target", e))
    }

    pub fn begin(&mut self) -> Result<()> {
        self.resources()?;
        self.begun = true;
        Ok(())
    }

    /// Queues `source` (texture pixels, top-left origin) of `texture` to be
    /// drawn at `dest` (viewport pixels, top-left origin).
    pub fn draw_sprite<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        texture: &Texture,
        source: Rect,
        dest: Rect,
    ) -> Result<()> {
        let Some(res) = self.state.as_mut() else {
            return Err(Error::not_initiated("sprite batch"));
        };
        if !self.begun {
            return Err(not_begun());
        }
        let id = texture
            .id()
            .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "texture not loaded"))?;
        check_finite(source)?;
        check_finite(dest)?;
        if res.slots.capacity() < 2 {
            return Err(Error::new(
                ErrorKind::GraphicsDevice,
                "device has no texture unit left for sprites",
            ));
        }

        if res.geometry.is_full() {
            res.flush(device, &mut self.stats, FlushReason::BufferFull)?;
        }

        let slot = match res.slots.find(id) {
            Some(slot) => slot,
            None => {
                if res.slots.is_full() {
                    res.flush(device, &mut self.stats, FlushReason::SlotsFull)?;
                }
                texture.activate_and_bind(device, res.slots.next_slot())?;
                res.slots.push(id)
            }
        };

        let (tw, th) = (texture.width() as f32, texture.height() as f32);
        let uv = |p: Vec2| Vec2::new(p.x / tw, 1.0 - p.y / th);

        res.geometry.append(quad(
            self.viewport.to_ndc(dest.min()),
            self.viewport.to_ndc(dest.max()),
            uv(source.min()),
            uv(source.max()),
            Color::WHITE,
            slot as f32,
        ));
        Ok(())
    }

    /// Queues a flat-coloured rect (viewport pixels, top-left origin).
    pub fn draw_rect<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        rect: Rect,
        color: impl Into<Color>,
    ) -> Result<()> {
        let Some(res) = self.state.as_mut() else {
            return Err(Error::not_initiated("sprite batch"));
        };
        if !self.begun {
            return Err(not_begun());
        }
        check_finite(rect)?;

        if res.geometry.is_full() {
            res.flush(device, &mut self.stats, FlushReason::BufferFull)?;
        }

        res.geometry.append(quad(
            self.viewport.to_ndc(rect.min()),
            self.viewport.to_ndc(rect.max()),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 0.0),
            color.into(),
            FLAT_COLOR_INDEX,
        ));
        Ok(())
    }

    /// Flushes pending quads and leaves the begun state, even if the flush fails.
    pub fn end<D: Device + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        let Some(res) = self.state.as_mut() else {
            return Err(Error::not_initiated("sprite batch"));
        };
        if !self.begun {
            return Err(not_begun());
        }
        self.begun = false;
        res.flush(device, &mut self.stats, FlushReason::End)
    }

    #[inline]
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Returns the counters and resets them.
    pub fn take_stats(&mut self) -> BatchStats {
        std::mem::take(&mut self.stats)
    }

    /// Quads buffered since the last flush.
    pub fn sprite_count(&self) -> usize {
        self.state.as_ref().map_or(0, |r| r.geometry.len())
    }

    /// Texture slots in use, including the fallback in slot 0.
    pub fn texture_count(&self) -> usize {
        self.state.as_ref().map_or(0, |r| r.slots.len())
    }

    pub fn capacity(&self) -> usize {
        self.state.as_ref().map_or(0, |r| r.geometry.capacity())
    }

    pub fn max_texture_slots(&self) -> usize {
        self.state.as_ref().map_or(0, |r| r.slots.capacity())
    }

    #[inline]
    pub fn is_initiated(&self) -> bool {
        self.state.is_some()
    }

    #[inline]
    pub fn is_begun(&self) -> bool {
        self.begun
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn resources(&self) -> Result<&Resources> {
        self.state.as_ref().ok_or_else(|| Error::not_initiated("sprite batch"))
    }
}

fn not_begun() -> Error {
    Error::new(ErrorKind::NotBegun, "sprite batch not begun")
}

fn check_finite(rect: Rect) -> Result<()> {
    if rect.is_finite() {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::InvalidArgument, format!("rect {rect:?} is not finite")))
    }
}

//! Textures uploaded through a [`Device`].

use std::path::Path;

use crate::device::{Device, FilterMode, TextureDesc, TextureId};
use crate::error::{Error, ErrorKind, Result};

/// A 2D texture owned by the caller.
///
/// Pixel rows are expected bottom-up (the first row is the bottom of the
/// image); [`load_file`](Self::load_file) flips decoded images accordingly.
/// Sprite source rects still use top-left pixel coordinates.
///
/// The GPU object is not released on drop; call [`cleanup`](Self::cleanup)
/// with the device it was loaded on.
#[derive(Debug, Default)]
pub struct Texture {
    id: Option<TextureId>,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads raw RGB (`channels == 3`) or RGBA (`channels == 4`) bytes.
    pub fn load<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
        filter: FilterMode,
    ) -> Result<()> {
        if self.id.is_some() {
            return Err(Error::new(ErrorKind::AlreadyLoaded, "texture already loaded"));
        }
        if channels != 3 && channels != 4 {
            return Err(Error::new(
                ErrorKind::UnsupportedTextureFormat,
                format!("texture has unsupported format ({channels} channels)"),
            ));
        }
        if width == 0 || height == 0 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("texture size {width}x{height} is empty"),
            ));
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("texture data is {} bytes, expected {expected}", pixels.len()),
            ));
        }

        let rgba = if channels == 3 { expand_rgb(pixels) } else { pixels.to_vec() };
        let desc = TextureDesc { width, height, filter };
        let id = device
            .create_texture(&desc, &rgba)
            .map_err(|e| Error::device("couldn't load texture in GPU", e))?;

        self.id = Some(id);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Decodes an image file and uploads it, flipped vertically.
    pub fn load_file<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        path: impl AsRef<Path>,
        filter: FilterMode,
    ) -> Result<()> {
        let path = path.as_ref();
        if self.id.is_some() {
            return Err(Error::new(ErrorKind::AlreadyLoaded, "texture already loaded"));
        }

        let image = image::open(path)
            .map_err(|e| {
                Error::new(
                    ErrorKind::FileRead,
                    format!("couldn't get texture data from file \"{}\": {e}", path.display()),
                )
            })?
            .flipv();

        let (width, height) = (image.width(), image.height());
        let (pixels, channels) = match image.color().channel_count() {
            3 => (image.to_rgb8().into_raw(), 3),
            4 => (image.to_rgba8().into_raw(), 4),
            n => {
                return Err(Error::new(
                    ErrorKind::UnsupportedTextureFormat,
                    format!("\"{}\" has unsupported format ({n} channels)", path.display()),
                ));
            }
        };

        log::debug!("Texture: decoded \"{}\" ({width}x{height}, {channels} channels)", path.display());
        self.load(device, &pixels, width, height, channels, filter)
    }

    /// Activates texture unit `slot` and binds this texture to it.
    pub fn activate_and_bind<D: Device + ?Sized>(&self, device: &mut D, slot: u32) -> Result<()> {
        let id = self.id.ok_or_else(|| Error::not_initiated("texture"))?;
        device
            .bind_texture(slot, id)
            .map_err(|e| Error::device(format!("couldn't bind texture {id} to unit {slot}"), e))
    }

    /// Releases the GPU texture; the texture can be loaded again afterwards.
    pub fn cleanup<D: Device + ?Sized>(&mut self, device: &mut D) {
        if let Some(id) = self.id.take() {
            device.delete_texture(id);
        }
        self.width = 0;
        self.height = 0;
    }

    #[inline]
    pub fn id(&self) -> Option<TextureId> {
        self.id
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.id.is_some()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
}

fn expand_rgb(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .flat_map(|px| [px[0], px[1], px[2], 255])
        .collect()
}

//! Offscreen demo for the sprite batch.
//!
//! Renders a few frames into a headless render target, mixing flat rects with
//! sprites drawn from more textures than the device has slots, and logs the
//! batch counters per frame. Image paths given on the command line are loaded
//! as extra sprite textures.

use anyhow::Context;
use spritebatch::device::{Device, FilterMode, Gpu, GpuInit};
use spritebatch::logging::{init_logging, LoggingConfig};
use spritebatch::{BatchConfig, Color, Rect, SpriteBatch, Texture};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const FRAMES: u32 = 3;
const TILE: f32 = 48.0;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let mut gpu = pollster::block_on(Gpu::headless(GpuInit::default()))
        .context("failed to create headless GPU device")?;
    let target = gpu.create_render_target(WIDTH, HEIGHT);
    gpu.set_render_target(Some(target.create_view(&wgpu::TextureViewDescriptor::default())));

    let slots = gpu.max_texture_slots();
    let mut textures = checkerboards(&mut gpu, slots as usize + 2)?;
    for path in std::env::args().skip(1) {
        let mut tex = Texture::new();
        tex.load_file(&mut gpu, &path, FilterMode::Linear)
            .with_context(|| format!("failed to load {path}"))?;
        textures.push(tex);
    }

    let mut batch = SpriteBatch::new();
    batch
        .init_with(
            &mut gpu,
            BatchConfig { viewport_width: WIDTH, viewport_height: HEIGHT, max_sprites: 64 },
        )
        .context("failed to initiate sprite batch")?;
    batch.set_clear_color(&mut gpu, [0.08, 0.09, 0.12])?;

    for frame in 0..FRAMES {
        render_frame(&mut batch, &mut gpu, &textures, frame)
            .with_context(|| format!("frame {frame} failed"))?;
        let stats = batch.take_stats();
        log::info!(
            "frame {frame}: {} flushes, {} draw calls, {} quads",
            stats.flushes,
            stats.draw_calls,
            stats.quads
        );
    }

    batch.cleanup(&mut gpu);
    for mut tex in textures {
        tex.cleanup(&mut gpu);
    }
    Ok(())
}

fn render_frame(
    batch: &mut SpriteBatch,
    gpu: &mut Gpu,
    textures: &[Texture],
    frame: u32,
) -> spritebatch::Result<()> {
    batch.clear(gpu)?;
    batch.begin()?;

    let cols = (WIDTH as f32 / TILE) as u32;
    let rows = (HEIGHT as f32 / TILE) as u32;
    for row in 0..rows {
        for col in 0..cols {
            let dest = Rect::new(col as f32 * TILE, row as f32 * TILE, TILE - 4.0, TILE - 4.0);
            let i = (row * cols + col + frame) as usize;
            if i % 3 == 0 {
                let shade = (col as f32 / cols as f32, row as f32 / rows as f32, 0.6);
                batch.draw_rect(gpu, dest, Color::rgba(shade.0, shade.1, shade.2, 0.8))?;
            } else {
                let tex = &textures[i % textures.len()];
                let source = Rect::new(0.0, 0.0, tex.width() as f32, tex.height() as f32);
                batch.draw_sprite(gpu, tex, source, dest)?;
            }
        }
    }

    batch.end(gpu)
}

/// Builds `count` checkerboard textures with distinct tints.
fn checkerboards(gpu: &mut Gpu, count: usize) -> anyhow::Result<Vec<Texture>> {
    const SIZE: u32 = 16;
    (0..count)
        .map(|n| {
            let tint = [(n * 67 % 256) as u8, (n * 131 % 256) as u8, (n * 29 % 256) as u8];
            let pixels: Vec<u8> = (0..SIZE * SIZE)
                .flat_map(|p| {
                    let (x, y) = (p % SIZE, p / SIZE);
                    if (x / 4 + y / 4) % 2 == 0 { tint } else { [255, 255, 255] }
                })
                .collect();

            let mut tex = Texture::new();
            tex.load(gpu, &pixels, SIZE, SIZE, 3, FilterMode::Nearest)
                .with_context(|| format!("failed to create checkerboard {n}"))?;
            Ok(tex)
        })
        .collect()
}

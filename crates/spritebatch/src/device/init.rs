/// Creation parameters for [`Gpu`](super::Gpu).
///
/// Keep this small; add fields only for concrete backend requirements.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Adapter preference.
    pub power_preference: wgpu::PowerPreference,

    /// Required wgpu features. The sprite pipeline needs none.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Color format of render targets created by the device.
    pub target_format: wgpu::TextureFormat,

    /// Upper bound on texture units exposed to the batch.
    ///
    /// The effective count is also capped by the device's per-stage texture
    /// and sampler limits.
    pub max_texture_slots: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            max_texture_slots: 16,
        }
    }
}

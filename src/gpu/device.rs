//! Process-wide `wgpu` device and the opaque per-surface renderer seam.
//!
//! Grounded on the prior `EngineState`/`State` GPU-resource-creation
//! chain (`engine.rs`, `state.rs`): one `Instance`/`Adapter`/`Device`/`Queue`
//! shared by everything, plus one presentable `Surface` for the OS window.
//! Unlike that prior design, the window surface here is used only as the final
//! composite target — every [`crate::surfaces::Surface`] renders into its own
//! off-screen `wgpu::Texture` first (see SPEC_FULL.md §4.3's native-host
//! note), because there is one OS window standing in for what the original
//! system modeled as twenty DOM canvases.

use std::sync::Arc;

use winit::window::Window;

use crate::error::HostError;

/// Shared GPU plumbing. Created once in [`crate::app::App::resumed`]
/// and handed by reference to the [`crate::gpu::pool::ContextPool`].
pub struct GpuHost
{
        pub instance: wgpu::Instance,
        pub adapter: wgpu::Adapter,
        pub device: wgpu::Device,
        pub queue: wgpu::Queue,
        pub surface: wgpu::Surface<'static>,
        pub surface_format: wgpu::TextureFormat,
        pub surface_config: wgpu::SurfaceConfiguration,
}

impl GpuHost
{
        pub async fn new(window: Arc<Window>) -> anyhow::Result<Self>
        {
                let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                        backends: wgpu::Backends::PRIMARY,
                        ..Default::default()
                });

                let surface = instance.create_surface(window.clone())?;

                let adapter = instance
                        .request_adapter(&wgpu::RequestAdapterOptions {
                                power_preference: wgpu::PowerPreference::HighPerformance,
                                compatible_surface: Some(&surface),
                                force_fallback_adapter: false,
                        })
                        .await
                        .map_err(|e| anyhow::anyhow!(e))?;

                let (device, queue) = adapter
                        .request_device(&wgpu::DeviceDescriptor {
                                label: Some("visualizer-host-device"),
                                required_features: wgpu::Features::empty(),
                                required_limits: wgpu::Limits::default(),
                                memory_hints: wgpu::MemoryHints::Performance,
                                trace: wgpu::Trace::Off,
                        })
                        .await?;

                let size = window.inner_size();
                let caps = surface.get_capabilities(&adapter);
                let surface_format =
                        caps.formats.iter().find(|f| f.is_srgb()).copied().unwrap_or(caps.formats[0]);

                let surface_config = wgpu::SurfaceConfiguration {
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_DST,
                        format: surface_format,
                        width: size.width.max(1),
                        height: size.height.max(1),
                        present_mode: caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
                        alpha_mode: caps.alpha_modes[0],
                        view_formats: vec![],
                        desired_maximum_frame_latency: 2,
                };

                surface.configure(&device, &surface_config);

                Ok(Self {
                        instance,
                        adapter,
                        device,
                        queue,
                        surface,
                        surface_format,
                        surface_config,
                })
        }

        pub fn resize(
                &mut self,
                width: u32,
                height: u32,
        )
        {
                if width == 0 || height == 0
                {
                        return;
                }
                self.surface_config.width = width;
                self.surface_config.height = height;
                self.surface.configure(&self.device, &self.surface_config);
        }

        /// Creates an off-screen render target backing one
        /// [`crate::surfaces::Surface`]. This is the GPU-level work behind
        /// `ContextPool::acquire` step 3 (SPEC_FULL.md §4.3).
        pub fn create_render_target(
                &self,
                label: &str,
                width: u32,
                height: u32,
        ) -> Result<(wgpu::Texture, wgpu::TextureView), HostError>
        {
                if width == 0 || height == 0
                {
                        return Err(HostError::SurfaceNotReady {
                                surface: label.to_string(),
                        });
                }

                let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                        label: Some(label),
                        size: wgpu::Extent3d {
                                width,
                                height,
                                depth_or_array_layers: 1,
                        },
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format: self.surface_format,
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                                | wgpu::TextureUsages::TEXTURE_BINDING
                                | wgpu::TextureUsages::COPY_SRC,
                        view_formats: &[],
                });

                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

                Ok((texture, view))
        }
}

/// The seam opaque per-engine renderers sit behind (SPEC_FULL.md §1 Non-goals
/// and §9 design note: engine shader programs are out of scope, represented
/// here by one concrete implementation exercising the same seam).
pub trait LayerRenderer
{
        /// Draws one frame of this layer into `view`, reading whatever of
        /// `params` it needs.
        fn draw(
                &mut self,
                device: &wgpu::Device,
                queue: &wgpu::Queue,
                view: &wgpu::TextureView,
                params: &crate::params::Params,
        );
}

/// Renders a single solid field derived from hue/intensity/saturation. Enough
/// to exercise every seam in the Context Pool, Engine Instance, and Router
/// without inventing the visual language SPEC_FULL.md explicitly disclaims.
#[derive(Debug, Default)]
pub struct SolidFieldRenderer;

impl SolidFieldRenderer
{
        /// HSV to linear-ish RGB, good enough for a clear color; not a
        /// color-management component.
        fn hue_to_rgb(
                hue: f64,
                saturation: f64,
                value: f64,
        ) -> (f64, f64, f64)
        {
                let c = value * saturation;
                let h_prime = (hue % 360.0) / 60.0;
                let x = c * (1.0 - (h_prime % 2.0 - 1.0).abs());
                let (r1, g1, b1) = match h_prime as i32
                {
                        0 => (c, x, 0.0),
                        1 => (x, c, 0.0),
                        2 => (0.0, c, x),
                        3 => (0.0, x, c),
                        4 => (x, 0.0, c),
                        _ => (c, 0.0, x),
                };
                let m = value - c;
                (r1 + m, g1 + m, b1 + m)
        }
}

impl LayerRenderer for SolidFieldRenderer
{
        fn draw(
                &mut self,
                device: &wgpu::Device,
                queue: &wgpu::Queue,
                view: &wgpu::TextureView,
                params: &crate::params::Params,
        )
        {
                let (r, g, b) = Self::hue_to_rgb(params.hue, params.saturation, params.intensity);

                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("layer-clear-encoder"),
                });

                {
                        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                                label: Some("layer-clear-pass"),
                                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                        view,
                                        resolve_target: None,
                                        ops: wgpu::Operations {
                                                load: wgpu::LoadOp::Clear(wgpu::Color {
                                                        r,
                                                        g,
                                                        b,
                                                        a: 1.0,
                                                }),
                                                store: wgpu::StoreOp::Store,
                                        },
                                        depth_slice: None,
                                })],
                                depth_stencil_attachment: None,
                                timestamp_writes: None,
                                occlusion_query_set: None,
                        });
                }

                queue.submit(Some(encoder.finish()));
        }
}

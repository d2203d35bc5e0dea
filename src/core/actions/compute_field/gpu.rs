use std::sync::mpsc;

use log::{debug, warn};
use wgpu::util::DeviceExt;

use crate::core::actions::cancellation::CancelToken;
use crate::core::actions::compute_field::backend_kind::BackendKind;
use crate::core::actions::compute_field::ports::field_backend::{
    BackendError, FieldBackend, FieldRegion,
};
use crate::core::actions::progress::ProgressListener;
use crate::core::data::field::{ComputeStatus, Field, FieldData, PENDING_SENTINEL};
use crate::core::data::iteration_params::{IterationParams, SeedMode};

/// One thread per output cell, 16x16 workgroups; each thread derives its
/// pixel from its global invocation id and writes only its own count, so
/// the kernel needs no synchronization at all.
const SHADER: &str = r#"
struct Params {
    xmin: f32,
    ymin: f32,
    step_x: f32,
    step_y: f32,
    span_x0: u32,
    span_y0: u32,
    span_w: u32,
    span_h: u32,
    max_iter: u32,
    mode: u32,
    horizon: f32,
    julia_re: f32,
    julia_im: f32,
    pad0: u32,
    pad1: u32,
    pad2: u32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read_write> counts: array<u32>;

@compute @workgroup_size(16, 16)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    if (gid.x >= params.span_w || gid.y >= params.span_h) {
        return;
    }

    let coord_re = params.xmin + f32(params.span_x0 + gid.x) * params.step_x;
    let coord_im = params.ymin + f32(params.span_y0 + gid.y) * params.step_y;

    var z_re: f32;
    var z_im: f32;
    var c_re: f32;
    var c_im: f32;
    if (params.mode == 0u) {
        z_re = 0.0;
        z_im = 0.0;
        c_re = coord_re;
        c_im = coord_im;
    } else {
        z_re = coord_re;
        z_im = coord_im;
        c_re = params.julia_re;
        c_im = params.julia_im;
    }

    var n: u32 = 0u;
    loop {
        if (n >= params.max_iter) {
            break;
        }
        let next_re = z_re * z_re - z_im * z_im + c_re;
        z_im = 2.0 * z_re * z_im + c_im;
        z_re = next_re;
        n = n + 1u;
        if (z_re * z_re + z_im * z_im > params.horizon) {
            break;
        }
    }

    counts[gid.y * params.span_w + gid.x] = n;
}
"#;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParams {
    xmin: f32,
    ymin: f32,
    step_x: f32,
    step_y: f32,
    span_x0: u32,
    span_y0: u32,
    span_w: u32,
    span_h: u32,
    max_iter: u32,
    mode: u32,
    horizon: f32,
    julia_re: f32,
    julia_im: f32,
    pad: [u32; 3],
}

/// Escape counts on the GPU via a wgpu compute pass.
///
/// The kernel iterates in f32 and emits counts only, so this backend is
/// restricted to unsmoothed rendering and is not expected to match the
/// f64 CPU backends bit-for-bit near the boundary. Construction fails
/// with [`BackendError::Unavailable`] when no adapter exists; the engine
/// then falls back to the vectorized backend.
#[derive(Debug)]
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuBackend {
    pub fn new() -> Result<Self, BackendError> {
        let instance = wgpu::Instance::default();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or_else(|| BackendError::Unavailable {
            backend: BackendKind::Gpu,
            reason: "no compatible adapter".to_string(),
        })?;

        debug!("gpu backend using adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("fractal-field-compute"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|e| BackendError::Unavailable {
            backend: BackendKind::Gpu,
            reason: e.to_string(),
        })?;

        Ok(Self { device, queue })
    }

    fn params_for(region: &FieldRegion, params: &IterationParams) -> GpuParams {
        let window = &region.window;
        let (mode, julia_re, julia_im) = match params.seed_mode() {
            SeedMode::Mandelbrot => (0, 0.0, 0.0),
            SeedMode::Julia { c } => (1, c.real as f32, c.imag as f32),
        };

        GpuParams {
            xmin: window.xmin() as f32,
            ymin: window.ymin() as f32,
            step_x: (window.delta() / f64::from(window.width())) as f32,
            step_y: (window.delta() / f64::from(window.height())) as f32,
            span_x0: region.span.x0,
            span_y0: region.span.y0,
            span_w: region.span.width,
            span_h: region.span.height,
            max_iter: params.max_iter(),
            mode,
            horizon: params.horizon() as f32,
            julia_re,
            julia_im,
            pad: [0; 3],
        }
    }
}

impl FieldBackend for GpuBackend {
    fn compute(
        &self,
        region: FieldRegion,
        params: &IterationParams,
        cancel: &dyn CancelToken,
        _progress: &dyn ProgressListener,
    ) -> Result<FieldData, BackendError> {
        let span = region.span;

        // a dispatch cannot be preempted; only the gap before it is a
        // cancellation point
        if cancel.is_cancelled() {
            return Ok(FieldData {
                escape: Field::filled(span.width, span.height, PENDING_SENTINEL),
                z_abs: Field::zeroed(span.width, span.height),
                dz_abs: None,
                status: ComputeStatus::Cancelled,
            });
        }

        let uniform = Self::params_for(&region, params);
        let cell_count = span.pixel_count();
        let buffer_size = (cell_count * std::mem::size_of::<u32>()) as wgpu::BufferAddress;

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("escape-counts"),
                source: wgpu::ShaderSource::Wgsl(SHADER.into()),
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("escape-counts"),
                layout: None,
                module: &shader,
                entry_point: "main",
            });

        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("params"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let counts_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("counts"),
            size: buffer_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("counts-staging"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("escape-counts"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: counts_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("escape-counts"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("escape-counts"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(span.width.div_ceil(16), span.height.div_ceil(16), 1);
        }
        encoder.copy_buffer_to_buffer(&counts_buffer, 0, &staging_buffer, 0, buffer_size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("gpu readback failed: {}", e);
                return Err(BackendError::Device {
                    backend: BackendKind::Gpu,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(BackendError::Device {
                    backend: BackendKind::Gpu,
                    reason: "device dropped the readback callback".to_string(),
                });
            }
        }

        let escape = {
            let mapped = slice.get_mapped_range();
            let counts: &[u32] = bytemuck::cast_slice(&mapped);
            Field::from_data(
                span.width,
                span.height,
                counts.iter().map(|&n| f64::from(n)).collect(),
            )
        };
        staging_buffer.unmap();

        Ok(FieldData {
            escape,
            z_abs: Field::zeroed(span.width, span.height),
            dz_abs: None,
            status: ComputeStatus::Complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actions::cancellation::NeverCancel;
    use crate::core::actions::progress::NoProgress;
    use crate::core::data::view_window::ViewWindow;

    // these tests exercise the real device and silently pass where the
    // host has none; availability reporting is covered either way
    fn backend_or_skip() -> Option<GpuBackend> {
        match GpuBackend::new() {
            Ok(backend) => Some(backend),
            Err(BackendError::Unavailable { .. }) => None,
            Err(e) => panic!("unexpected gpu error: {}", e),
        }
    }

    #[test]
    fn test_known_points_on_device() {
        let Some(backend) = backend_or_skip() else {
            return;
        };

        // 4x4 grid over [-2, 2): one unit per pixel, so pixel (2,2) sits
        // exactly at c = 0 and pixel (3,3) at c = 1 + 1i
        let window = ViewWindow::new(0.0, 0.0, 4.0, 4, 4).unwrap();
        let params = IterationParams::new(100, 4.0, SeedMode::Mandelbrot).unwrap();

        let data = backend
            .compute(FieldRegion::full(window), &params, &NeverCancel, &NoProgress)
            .unwrap();

        assert_eq!(data.escape.get(2, 2), 100.0);
        assert!(data.escape.get(3, 3) < 10.0);
    }

    #[test]
    fn test_cancelled_dispatch_returns_sentinels() {
        let Some(backend) = backend_or_skip() else {
            return;
        };

        let window = ViewWindow::new(0.0, 0.0, 4.0, 8, 8).unwrap();
        let params = IterationParams::new(50, 4.0, SeedMode::Mandelbrot).unwrap();

        let data = backend
            .compute(
                FieldRegion::full(window),
                &params,
                &(|| true),
                &NoProgress,
            )
            .unwrap();

        assert_eq!(data.status, ComputeStatus::Cancelled);
        assert!(data.escape.as_slice().iter().all(|&v| v == PENDING_SENTINEL));
    }
}

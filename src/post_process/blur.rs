//! Separable gaussian blur.
//!
//! Kernel sizes follow the usual "best kernel" rule: an odd tap count whose half
//! is even (`4k + 1`), so the weights split evenly across linear-filtered pairs.

use wgpu::util::DeviceExt;

use crate::post_process::{fullscreen_pipeline, texture_sampler_uniform_layout};

/// Capacity of the tap array in the blur uniform.
pub const MAX_BLUR_TAPS: usize = 64;
/// Largest kernel that fits into [`MAX_BLUR_TAPS`].
pub const MAX_KERNEL: u32 = 61;
const MIN_KERNEL: u32 = 3;

/// Snap an ideal kernel size to the nearest `4k + 1` size, at least 3 and at most 61.
pub fn nearest_best_kernel(ideal: f32) -> u32 {
    let v = ideal.round().max(0.0) as i64;
    let best = [v, v - 1, v + 1, v - 2, v + 2]
        .into_iter()
        .find(|&k| k > 0 && k % 2 != 0 && (k / 2) % 2 == 0)
        .unwrap_or(v);
    (best.max(MIN_KERNEL as i64) as u32).min(MAX_KERNEL)
}

fn gaussian_weight(x: f32) -> f32 {
    let sigma = 1.0 / 3.0;
    let denominator = (2.0 * std::f32::consts::PI).sqrt() * sigma;
    let exponent = -(x * x) / (2.0 * sigma * sigma);
    exponent.exp() / denominator
}

/// Taps of a normalized gaussian kernel as `(pixel offset, weight)`.
///
/// The gaussian uses sigma `1/3` over `[-1, 1]`, so the outermost taps carry
/// almost no weight whatever the kernel size.
pub fn gaussian_kernel(ideal: f32) -> Vec<(f32, f32)> {
    let n = nearest_best_kernel(ideal);
    let center = (n - 1) as f32 / 2.0;
    let mut taps = (0..n)
        .map(|i| {
            let u = i as f32 / (n - 1) as f32;
            (i as f32 - center, gaussian_weight(u * 2.0 - 1.0))
        })
        .collect::<Vec<_>>();
    let total: f32 = taps.iter().map(|(_, w)| w).sum();
    taps.iter_mut().for_each(|(_, w)| *w /= total);
    taps
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniform {
    pub direction: [f32; 2],
    pub texel: [f32; 2],
    pub tap_count: u32,
    _padding: [u32; 3],
    pub taps: [[f32; 4]; MAX_BLUR_TAPS],
}

impl BlurUniform {
    pub fn new(kernel: f32, direction: [f32; 2], size: [u32; 2]) -> Self {
        let mut taps = [[0.0; 4]; MAX_BLUR_TAPS];
        let kernel = gaussian_kernel(kernel);
        for (slot, (offset, weight)) in taps.iter_mut().zip(&kernel) {
            *slot = [*offset, *weight, 0.0, 0.0];
        }
        Self {
            direction,
            texel: texel_size(size),
            tap_count: kernel.len() as u32,
            _padding: [0; 3],
            taps,
        }
    }
}

pub(crate) fn texel_size(size: [u32; 2]) -> [f32; 2] {
    [1.0 / size[0].max(1) as f32, 1.0 / size[1].max(1) as f32]
}

/// One direction of a separable blur: reads `source`, writes the target it is run against.
#[derive(Debug)]
pub struct BlurPass {
    pub uniform: BlurUniform,
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl BlurPass {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        source: &wgpu::TextureView,
        uniform: BlurUniform,
        label: &str,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_bind_group(device, layout, sampler, source, &buffer, label);
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    /// Point the pass at a new source after a resize.
    pub fn rebind(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        source: &wgpu::TextureView,
        size: [u32; 2],
    ) {
        self.uniform.texel = texel_size(size);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        self.bind_group = mk_bind_group(device, layout, sampler, source, &self.buffer, "blur");
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    source: &wgpu::TextureView,
    buffer: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(source),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffer.as_entire_binding(),
            },
        ],
    })
}

pub fn mk_blur_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
) -> (wgpu::BindGroupLayout, wgpu::RenderPipeline) {
    let layout = texture_sampler_uniform_layout(device, "blur-bgl");
    let pipeline = fullscreen_pipeline(
        device,
        include_str!("blur.wgsl"),
        "fs_blur",
        &[&layout],
        format,
        "blur-pipeline",
    );
    (layout, pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_sizes_snap_to_four_k_plus_one() {
        assert_eq!(nearest_best_kernel(32.0), 33);
        assert_eq!(nearest_best_kernel(15.0), 13);
        assert_eq!(nearest_best_kernel(64.0), 61);
        assert_eq!(nearest_best_kernel(1.0), 3);
        assert_eq!(nearest_best_kernel(9.0), 9);
        for ideal in 0..200 {
            let k = nearest_best_kernel(ideal as f32);
            assert!(k == MIN_KERNEL || k % 4 == 1, "{ideal} -> {k}");
            assert!((MIN_KERNEL..=MAX_KERNEL).contains(&k));
        }
    }

    #[test]
    fn weights_are_normalized_and_symmetric() {
        for ideal in [3.0, 15.0, 32.0, 64.0] {
            let taps = gaussian_kernel(ideal);
            let sum: f32 = taps.iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-5);
            for (a, b) in taps.iter().zip(taps.iter().rev()) {
                assert_eq!(a.0, -b.0);
                assert!((a.1 - b.1).abs() < 1e-6);
            }
            let center = taps.len() / 2;
            assert!(taps.iter().all(|(_, w)| *w <= taps[center].1));
        }
    }

    #[test]
    fn uniform_carries_the_taps() {
        let uniform = BlurUniform::new(15.0, [1.0, 0.0], [200, 100]);
        assert_eq!(uniform.tap_count, 13);
        assert_eq!(uniform.texel, [0.005, 0.01]);
        assert_eq!(uniform.taps[0][0], -6.0);
        assert_eq!(uniform.taps[12][0], 6.0);
        assert_eq!(uniform.taps[13], [0.0; 4]);
        assert_eq!(std::mem::size_of::<BlurUniform>(), 32 + 16 * MAX_BLUR_TAPS);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! CPU frame compositor.

use blueprint_graph::{Compute, ComputeError, Computed, Mat, MatDataType, MatDevice};

/// One frame pasted onto the canvas at a pixel offset
#[derive(Debug, Clone)]
pub struct Layer {
    /// Source frame
    pub mat: Mat,
    /// Top-left corner on the canvas; may be negative or past the edge
    pub offset: [i64; 2],
}

/// Canvas description and the layers to draw on it, bottom first
#[derive(Debug, Clone)]
pub struct BlitJob {
    /// Canvas width in pixels
    pub width: usize,
    /// Canvas height in pixels
    pub height: usize,
    /// Channels per pixel; every layer must match
    pub channels: usize,
    /// Element type tag of the result
    pub data_type: MatDataType,
    /// Layers, drawn in order
    pub layers: Vec<Layer>,
}

/// Composites layers onto a zeroed canvas.
///
/// A blitter is bound to the device its frames are tagged with. Samples are
/// always processed in host memory.
#[derive(Debug)]
pub struct MatBlitter {
    device: MatDevice,
}

impl MatBlitter {
    /// Create a blitter for `device`
    pub fn new(device: MatDevice) -> Self {
        tracing::debug!("Creating blitter on {:?}", device);
        Self { device }
    }

    /// Device this blitter produces frames on
    pub fn device(&self) -> MatDevice {
        self.device
    }

    fn draw(&self, job: &BlitJob) -> Result<Mat, ComputeError> {
        let count = match Mat::sample_count(job.width, job.height, job.channels) {
            Some(count) if count > 0 => count,
            _ => {
                return Err(ComputeError::InvalidFormat(format!(
                    "unusable canvas {}x{}x{}",
                    job.width, job.height, job.channels
                )))
            }
        };
        for layer in &job.layers {
            if layer.mat.channels != job.channels {
                return Err(ComputeError::InvalidFormat(format!(
                    "layer has {} channels, canvas has {}",
                    layer.mat.channels, job.channels
                )));
            }
            if !layer.mat.is_consistent() {
                return Err(ComputeError::InvalidFormat(format!(
                    "layer size {}x{}x{} does not match its {} samples",
                    layer.mat.width,
                    layer.mat.height,
                    layer.mat.channels,
                    layer.mat.samples().len()
                )));
            }
        }

        let mut canvas = vec![0.0; count];
        for layer in &job.layers {
            paste(&mut canvas, job, layer);
        }

        let mut mat = Mat::from_samples(job.width, job.height, job.channels, canvas);
        mat.data_type = job.data_type;
        mat.device = self.device;
        Ok(mat)
    }
}

// Copies the visible rows of `layer` into `canvas`; the layer must be consistent
fn paste(canvas: &mut [f32], job: &BlitJob, layer: &Layer) {
    let src = &layer.mat;
    let [dx, dy] = layer.offset;
    let channels = job.channels;

    let x0 = dx.max(0);
    let x1 = dx.saturating_add(src.width as i64).min(job.width as i64);
    let y0 = dy.max(0);
    let y1 = dy.saturating_add(src.height as i64).min(job.height as i64);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let span = (x1 - x0) as usize * channels;
    for y in y0..y1 {
        let src_row = (y - dy) as usize * src.width + (x0 - dx) as usize;
        let dst_row = y as usize * job.width + x0 as usize;
        let from = &src.samples()[src_row * channels..src_row * channels + span];
        canvas[dst_row * channels..dst_row * channels + span].copy_from_slice(from);
    }
}

impl Compute for MatBlitter {
    type Input = BlitJob;
    type Output = Mat;

    fn compute(&mut self, input: &BlitJob) -> Result<Computed<Mat>, ComputeError> {
        Computed::measure(|| self.draw(input))
    }
}

use ndarray::Array4;
use rayon::prelude::*;

use crate::{error::PipelineError, types::Frame};

/// Side length of the square crop the scavenger model was trained on.
pub const VIDEO_PIXELS: u32 = 224;

const PREPROCESS_DIVISOR: f32 = 255.0 / 2.0;

/// Cut a centered `size`×`size` patch out of the frame and normalize it into
/// the (1, size, size, 3) float tensor the classifier expects.
///
/// The camera view is usually much larger than the training resolution, so
/// instead of squashing the whole frame we slice the center region, which is
/// where players hold the object. Channel values are mapped from [0, 255] to
/// roughly [-1, 1] via `(v - 127.5) / 127.5`.
///
/// Returns `FrameTooSmall` when the frame cannot contain the crop in either
/// dimension.
pub fn crop_and_normalize(frame: &Frame, size: u32) -> Result<Array4<f32>, PipelineError> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len {
        return Err(PipelineError::FrameBufferMismatch {
            got: frame.rgba.len(),
            expected: expected_len,
        });
    }

    if frame.width < size || frame.height < size {
        return Err(PipelineError::FrameTooSmall {
            width: frame.width,
            height: frame.height,
            required: size,
        });
    }

    let begin_y = (frame.height / 2 - size / 2) as usize;
    let begin_x = (frame.width / 2 - size / 2) as usize;
    let row_stride = frame.width as usize * 4;

    let normalized: Vec<f32> = (0..size as usize)
        .into_par_iter()
        .flat_map_iter(|row| {
            let offset = (begin_y + row) * row_stride + begin_x * 4;
            let row_slice = &frame.rgba[offset..offset + size as usize * 4];
            row_slice.chunks_exact(4).flat_map(|px| {
                [
                    (px[0] as f32 - PREPROCESS_DIVISOR) / PREPROCESS_DIVISOR,
                    (px[1] as f32 - PREPROCESS_DIVISOR) / PREPROCESS_DIVISOR,
                    (px[2] as f32 - PREPROCESS_DIVISOR) / PREPROCESS_DIVISOR,
                ]
            })
        })
        .collect();

    let tensor = Array4::from_shape_vec((1, size as usize, size as usize, 3), normalized)
        .expect("crop loop produced exactly size*size*3 values");

    Ok(tensor)
}

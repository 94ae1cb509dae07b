//! Sample format conversions.
//!
//! | Name      | Type  | Range                  |
//! |-----------|-------|------------------------|
//! | S16       | `i16` | \[-32768, 32767\]      |
//! | FloatS16  | `f32` | \[-32768.0, 32768.0\]  |
//!
//! Buffers inside the pipeline hold FloatS16 so that powers and thresholds
//! stay in the familiar 16-bit scale.

use crate::channel_buffer::ChannelBuffer;

/// Converts one S16 sample to FloatS16.
#[inline]
pub fn s16_to_float_s16(v: i16) -> f32 {
    f32::from(v)
}

/// Converts one FloatS16 sample to S16, saturating and rounding to nearest.
#[inline]
pub fn float_s16_to_s16(v: f32) -> i16 {
    let v = v.clamp(-32768.0, 32767.0);
    (v + f32::copysign(0.5, v)) as i16
}

pub fn s16_to_float_s16_slice(src: &[i16], dest: &mut [f32]) {
    debug_assert_eq!(src.len(), dest.len());
    for (d, &s) in dest.iter_mut().zip(src) {
        *d = s16_to_float_s16(s);
    }
}

pub fn float_s16_to_s16_slice(src: &[f32], dest: &mut [i16]) {
    debug_assert_eq!(src.len(), dest.len());
    for (d, &s) in dest.iter_mut().zip(src) {
        *d = float_s16_to_s16(s);
    }
}

/// Splits interleaved S16 audio into the full-band channels of `dest`.
///
/// `interleaved` must hold `dest.num_frames() * dest.num_channels()` samples.
pub fn deinterleave_to_float_s16(interleaved: &[i16], dest: &mut ChannelBuffer<f32>) {
    let num_channels = dest.num_channels();
    let num_frames = dest.num_frames();
    debug_assert_eq!(interleaved.len(), num_frames * num_channels);

    if num_channels == 1 {
        s16_to_float_s16_slice(interleaved, dest.bands_mut(0));
        return;
    }
    for ch in 0..num_channels {
        let channel = dest.bands_mut(ch);
        for (sample, &v) in channel
            .iter_mut()
            .zip(interleaved.iter().skip(ch).step_by(num_channels))
        {
            *sample = s16_to_float_s16(v);
        }
    }
}

/// Writes the full-band channels of `src` as interleaved S16 audio.
///
/// `interleaved` must hold `src.num_frames() * src.num_channels()` samples.
pub fn interleave_to_s16(src: &ChannelBuffer<f32>, interleaved: &mut [i16]) {
    let num_channels = src.num_channels();
    debug_assert_eq!(interleaved.len(), src.num_frames() * num_channels);

    if num_channels == 1 {
        float_s16_to_s16_slice(src.bands(0), interleaved);
        return;
    }
    for ch in 0..num_channels {
        for (slot, &v) in interleaved
            .iter_mut()
            .skip(ch)
            .step_by(num_channels)
            .zip(src.bands(ch))
        {
            *slot = float_s16_to_s16(v);
        }
    }
}

/// Mean of the squared samples, `0.0` for an empty slice.
#[inline]
pub fn mean_square(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|v| v * v).sum::<f32>() / samples.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_s16_to_s16_rounds_and_saturates() {
        assert_eq!(float_s16_to_s16(0.4), 0);
        assert_eq!(float_s16_to_s16(0.6), 1);
        assert_eq!(float_s16_to_s16(-0.6), -1);
        assert_eq!(float_s16_to_s16(40_000.0), i16::MAX);
        assert_eq!(float_s16_to_s16(-40_000.0), i16::MIN);
    }

    #[test]
    fn s16_values_survive_float_s16() {
        for v in [i16::MIN, -1234, -1, 0, 1, 4321, i16::MAX] {
            assert_eq!(float_s16_to_s16(s16_to_float_s16(v)), v);
        }
    }

    #[test]
    fn deinterleave_splits_channels() {
        let mut buf = ChannelBuffer::new(3, 2, 1);
        deinterleave_to_float_s16(&[1, -1, 2, -2, 3, -3], &mut buf);
        assert_eq!(buf.bands(0), &[1.0, 2.0, 3.0]);
        assert_eq!(buf.bands(1), &[-1.0, -2.0, -3.0]);
    }

    #[test]
    fn interleave_restores_layout() {
        let mut buf = ChannelBuffer::new(2, 3, 1);
        buf.bands_mut(0).copy_from_slice(&[1.0, 4.0]);
        buf.bands_mut(1).copy_from_slice(&[2.0, 5.0]);
        buf.bands_mut(2).copy_from_slice(&[3.0, 6.0]);
        let mut out = [0i16; 6];
        interleave_to_s16(&buf, &mut out);
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn mean_square_of_constant() {
        assert_eq!(mean_square(&[3.0, -3.0, 3.0, -3.0]), 9.0);
        assert_eq!(mean_square(&[]), 0.0);
    }
}

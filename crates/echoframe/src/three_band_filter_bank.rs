//! Three-band polyphase FIR filter bank with DCT modulation.
//!
//! Splits a 480-sample (48 kHz, 10 ms) frame into three 160-sample bands
//! covering 0-8, 8-16 and 16-24 kHz, and merges them back. Analysis followed
//! by synthesis delays the signal by 24 samples.

const SQRT_3: f32 = 1.732_050_8;

const STRIDE: usize = 4;
const FILTER_SIZE: usize = 4;
/// Input history each polyphase component carries between frames.
const MEMORY_SIZE: usize = FILTER_SIZE * STRIDE - 1;

/// Number of bands.
pub(crate) const NUM_BANDS: usize = 3;
/// Full-band frame length.
pub(crate) const FULL_BAND_SIZE: usize = 480;
/// Frame length of each band.
pub(crate) const SPLIT_BAND_SIZE: usize = FULL_BAND_SIZE / NUM_BANDS;

/// Of the `STRIDE * NUM_BANDS` polyphase components, the ones at these
/// indices have all-zero taps and are skipped.
const ZERO_FILTER_INDICES: [usize; 2] = [3, 9];
const NUM_NON_ZERO_FILTERS: usize = STRIDE * NUM_BANDS - ZERO_FILTER_INDICES.len();

#[rustfmt::skip]
const FILTER_COEFFS: [[f32; FILTER_SIZE]; NUM_NON_ZERO_FILTERS] = [
    [-0.00047749, -0.00496888,  0.16547118,  0.00425496],
    [-0.00173287, -0.01585778,  0.14989004,  0.00994113],
    [-0.00304815, -0.02536082,  0.12154542,  0.01157993],
    [-0.00346946, -0.02587886,  0.04760441,  0.00607594],
    [-0.00154717, -0.01136076,  0.01387458,  0.00186353],
    [ 0.00186353,  0.01387458, -0.01136076, -0.00154717],
    [ 0.00607594,  0.04760441, -0.02587886, -0.00346946],
    [ 0.00983212,  0.08543175, -0.02982767, -0.00383509],
    [ 0.00994113,  0.14989004, -0.01585778, -0.00173287],
    [ 0.00425496,  0.16547118, -0.00496888, -0.00047749],
];

#[rustfmt::skip]
const DCT_MODULATION: [[f32; NUM_BANDS]; NUM_NON_ZERO_FILTERS] = [
    [ 2.0,     2.0,  2.0    ],
    [ SQRT_3,  0.0, -SQRT_3 ],
    [ 1.0,    -2.0,  1.0    ],
    [-1.0,     2.0, -1.0    ],
    [-SQRT_3,  0.0,  SQRT_3 ],
    [-2.0,    -2.0, -2.0    ],
    [-SQRT_3,  0.0,  SQRT_3 ],
    [-1.0,     2.0, -1.0    ],
    [ 1.0,    -2.0,  1.0    ],
    [ SQRT_3,  0.0, -SQRT_3 ],
];

/// A polyphase component: which subsampling phase and input shift it serves,
/// and which row of the tables above it uses.
#[derive(Debug, Clone, Copy)]
struct Component {
    phase: usize,
    in_shift: usize,
    filter: usize,
}

/// The non-zero components in processing order.
const COMPONENTS: [Component; NUM_NON_ZERO_FILTERS] = {
    let mut out = [Component {
        phase: 0,
        in_shift: 0,
        filter: 0,
    }; NUM_NON_ZERO_FILTERS];
    let mut n = 0;
    let mut phase = 0;
    while phase < NUM_BANDS {
        let mut in_shift = 0;
        while in_shift < STRIDE {
            let index = phase + in_shift * NUM_BANDS;
            if index != ZERO_FILTER_INDICES[0] && index != ZERO_FILTER_INDICES[1] {
                let skipped = (index > ZERO_FILTER_INDICES[0]) as usize
                    + (index > ZERO_FILTER_INDICES[1]) as usize;
                out[n] = Component {
                    phase,
                    in_shift,
                    filter: index - skipped,
                };
                n += 1;
            }
            in_shift += 1;
        }
        phase += 1;
    }
    out
};

/// Sparse FIR over `input` preceded by `state`:
/// `out[k] = sum_i filter[i] * x[k - in_shift - i * STRIDE]`, where negative
/// indices read the tail of the previous frame held in `state`.
fn filter_core(
    filter: &[f32; FILTER_SIZE],
    input: &[f32; SPLIT_BAND_SIZE],
    in_shift: usize,
    output: &mut [f32; SPLIT_BAND_SIZE],
    state: &mut [f32; MEMORY_SIZE],
) {
    debug_assert!(in_shift < STRIDE);
    for (k, out) in output.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (i, &c) in filter.iter().enumerate() {
            let offset = in_shift + i * STRIDE;
            let x = if k >= offset {
                input[k - offset]
            } else {
                state[MEMORY_SIZE + k - offset]
            };
            acc += c * x;
        }
        *out = acc;
    }
    state.copy_from_slice(&input[SPLIT_BAND_SIZE - MEMORY_SIZE..]);
}

/// Analysis and synthesis state of one channel.
#[derive(Debug, Clone)]
pub(crate) struct ThreeBandFilterBank {
    analysis_state: [[f32; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
    synthesis_state: [[f32; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
}

impl ThreeBandFilterBank {
    pub(crate) fn new() -> Self {
        Self {
            analysis_state: [[0.0; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
            synthesis_state: [[0.0; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
        }
    }

    /// Splits one full-band frame into three bands.
    pub(crate) fn analysis(
        &mut self,
        input: &[f32; FULL_BAND_SIZE],
        output: &mut [[f32; SPLIT_BAND_SIZE]; NUM_BANDS],
    ) {
        for band in output.iter_mut() {
            band.fill(0.0);
        }

        let mut subsampled = [0.0; SPLIT_BAND_SIZE];
        let mut filtered = [0.0; SPLIT_BAND_SIZE];
        let mut current_phase = None;
        for component in &COMPONENTS {
            if current_phase != Some(component.phase) {
                // Every NUM_BANDS-th sample, newest phase first.
                let first = NUM_BANDS - 1 - component.phase;
                for (k, s) in subsampled.iter_mut().enumerate() {
                    *s = input[first + NUM_BANDS * k];
                }
                current_phase = Some(component.phase);
            }

            filter_core(
                &FILTER_COEFFS[component.filter],
                &subsampled,
                component.in_shift,
                &mut filtered,
                &mut self.analysis_state[component.filter],
            );

            for (band, &modulation) in output.iter_mut().zip(&DCT_MODULATION[component.filter]) {
                for (o, &f) in band.iter_mut().zip(&filtered) {
                    *o += modulation * f;
                }
            }
        }
    }

    /// Merges three bands into one full-band frame.
    pub(crate) fn synthesis(
        &mut self,
        input: &[[f32; SPLIT_BAND_SIZE]; NUM_BANDS],
        output: &mut [f32; FULL_BAND_SIZE],
    ) {
        output.fill(0.0);

        let mut modulated = [0.0; SPLIT_BAND_SIZE];
        let mut filtered = [0.0; SPLIT_BAND_SIZE];
        for component in &COMPONENTS {
            modulated.fill(0.0);
            for (band, &modulation) in input.iter().zip(&DCT_MODULATION[component.filter]) {
                for (m, &b) in modulated.iter_mut().zip(band) {
                    *m += modulation * b;
                }
            }

            filter_core(
                &FILTER_COEFFS[component.filter],
                &modulated,
                component.in_shift,
                &mut filtered,
                &mut self.synthesis_state[component.filter],
            );

            // Upsample, compensating the energy lost to subsampling.
            for (k, &f) in filtered.iter().enumerate() {
                output[component.phase + NUM_BANDS * k] += NUM_BANDS as f32 * f;
            }
        }
    }
}

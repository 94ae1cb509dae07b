//! Cascaded biquad (IIR) filter in direct form 1.

/// Coefficients of one second-order section, normalized so that `a0 == 1`.
///
/// `y[n] = b0 x[n] + b1 x[n-1] + b2 x[n-2] - a1 y[n-1] - a2 y[n-2]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiQuadCoefficients {
    pub b: [f32; 3],
    pub a: [f32; 2],
}

#[derive(Debug, Clone)]
struct BiQuad {
    coefficients: BiQuadCoefficients,
    x: [f32; 2],
    y: [f32; 2],
}

impl BiQuad {
    fn new(coefficients: BiQuadCoefficients) -> Self {
        Self {
            coefficients,
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    fn run(&mut self, samples: &mut [f32]) {
        let BiQuadCoefficients { b, a } = self.coefficients;
        let [mut x1, mut x2] = self.x;
        let [mut y1, mut y2] = self.y;
        for v in samples.iter_mut() {
            let x0 = *v;
            let y0 = b[0] * x0 + b[1] * x1 + b[2] * x2 - a[0] * y1 - a[1] * y2;
            *v = y0;
            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;
        }
        self.x = [x1, x2];
        self.y = [y1, y2];
    }
}

/// Second-order sections applied in series, each keeping its own state.
#[derive(Debug, Clone)]
pub struct CascadedBiQuadFilter {
    biquads: Vec<BiQuad>,
}

impl CascadedBiQuadFilter {
    pub fn new(coefficients: &[BiQuadCoefficients]) -> Self {
        Self {
            biquads: coefficients.iter().copied().map(BiQuad::new).collect(),
        }
    }

    /// Filters `x` into `y`. Both slices must have the same length.
    pub fn process(&mut self, x: &[f32], y: &mut [f32]) {
        debug_assert_eq!(x.len(), y.len());
        y.copy_from_slice(x);
        self.process_in_place(y);
    }

    /// Filters `samples` in place through every section.
    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        for biquad in &mut self.biquads {
            biquad.run(samples);
        }
    }

    /// Clears the delay lines of every section.
    pub fn reset(&mut self) {
        for biquad in &mut self.biquads {
            biquad.x = [0.0; 2];
            biquad.y = [0.0; 2];
        }
    }
}

// Linear-interpolation resampling for file and device sources

/// Resample a whole buffer from `from_rate` to `to_rate`
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            (1.0 - frac) * samples[idx] + frac * samples[next]
        })
        .collect()
}

/// Streaming variant of [`resample_linear`] for device input
///
/// Input arrives in arbitrary pieces through `push`; `pop` yields output
/// samples as soon as both neighbours of the interpolation point are known.
#[derive(Debug, Clone)]
pub struct StreamResampler {
    step: f64,
    cursor: f64,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Self {
        let step = if from_rate == 0 || to_rate == 0 {
            1.0
        } else {
            from_rate as f64 / to_rate as f64
        };
        Self {
            step,
            cursor: 0.0,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, input: &[f32]) {
        self.pending.extend_from_slice(input);
    }

    pub fn pop(&mut self) -> Option<f32> {
        let idx = self.cursor.floor() as usize;
        if idx + 1 >= self.pending.len() {
            self.compact();
            return None;
        }

        let frac = (self.cursor - idx as f64) as f32;
        let value = (1.0 - frac) * self.pending[idx] + frac * self.pending[idx + 1];
        self.cursor += self.step;
        Some(value)
    }

    pub fn reset(&mut self) {
        self.cursor = 0.0;
        self.pending.clear();
    }

    // Drop input samples the cursor has moved past
    fn compact(&mut self) {
        let consumed = (self.cursor.floor() as usize).min(self.pending.len());
        if consumed > 0 {
            self.pending.drain(..consumed);
            self.cursor -= consumed as f64;
        }
    }
}

/// Convert a normalized sample to 16-bit PCM with clipping
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

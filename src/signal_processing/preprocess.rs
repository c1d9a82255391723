use crate::slicing::SliceInfo;

/// Buffer length for a nominal period: `2^(floor(log2(period)) + zero_fill_factor)`.
///
/// `None` when the length does not fit in a `usize`.
pub fn zero_filled_length(period_length: f64, zero_fill_factor: u32) -> Option<usize> {
    let exponent = (period_length.max(1.0).log2().floor() as u32).checked_add(zero_fill_factor)?;
    1usize.checked_shl(exponent)
}

/// Copies one pulse window out of a record into a zero-filled scratch buffer,
/// removing its DC offset.
///
/// The buffer belongs to one corrector and is reused for every pulse it sees.
pub struct PulsePreprocessor {
    buffer: Vec<f64>,
    buffer_len: usize,
}

impl PulsePreprocessor {
    /// Create a preprocessor whose buffers hold `buffer_len` samples.
    pub fn new(buffer_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            buffer_len,
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Fill the buffer from `waveform[slice]` and return it.
    ///
    /// Samples beyond the buffer length are dropped with a warning; the tail
    /// past the copied range is zeroed.
    pub fn retrieve(&mut self, waveform: &[f64], slice: &SliceInfo) -> &mut [f64] {
        if self.buffer.len() != self.buffer_len {
            self.buffer = vec![0.0; self.buffer_len];
        }

        let mut length = slice.length;
        if length > self.buffer_len {
            log::warn!(
                "Pulse of {} samples truncated to buffer size {}",
                length,
                self.buffer_len
            );
            length = self.buffer_len;
        }
        let end = (slice.start_index + length).min(waveform.len());
        let source = &waveform[slice.start_index.min(end)..end];

        let dc = crate::signal_processing::math::mean(source);
        for (dst, &src) in self.buffer.iter_mut().zip(source) {
            *dst = src - dc;
        }
        self.buffer[source.len()..].fill(0.0);

        &mut self.buffer
    }
}

//! Energy-based voice activity detection.
//!
//! [`UtteranceDetector`] walks 16-bit PCM in 10 ms windows through a
//! `Quiet -> Starting -> Speaking -> Stopping -> Quiet` state machine and
//! hands back each finished utterance as one PCM buffer, ready for
//! [`crate::SpeechToText::transcribe`].

/// Tuning for [`UtteranceDetector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadParams {
    /// Normalized RMS (`0.0..=1.0`) at or above which a window counts as speech.
    pub threshold: f64,
    /// Speech needed before an utterance starts.
    pub start_secs: f64,
    /// Silence needed before an utterance ends.
    pub stop_secs: f64,
    /// Utterances are cut at this length even without a pause.
    pub max_utterance_secs: f64,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            start_secs: 0.2,
            stop_secs: 0.8,
            max_utterance_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Quiet,
    Starting,
    Speaking,
    Stopping,
}

/// Splits a mono PCM stream into utterances.
#[derive(Debug)]
pub struct UtteranceDetector {
    state: VadState,
    window_bytes: usize,
    start_windows: u32,
    stop_windows: u32,
    max_utterance_bytes: usize,
    threshold: f64,
    count: u32,
    pending: Vec<u8>,
    utterance: Vec<u8>,
}

impl UtteranceDetector {
    pub fn new(params: VadParams, sample_rate: u32) -> Self {
        // 10 ms analysis window.
        let window_samples = (sample_rate / 100).max(1);
        let windows_for = |secs: f64| ((secs * 100.0).round() as u32).max(1);
        let max_utterance_bytes = (params.max_utterance_secs * f64::from(sample_rate)) as usize * 2;

        Self {
            state: VadState::Quiet,
            window_bytes: window_samples as usize * 2,
            start_windows: windows_for(params.start_secs),
            stop_windows: windows_for(params.stop_secs),
            max_utterance_bytes: max_utterance_bytes.max(window_samples as usize * 2),
            threshold: params.threshold,
            count: 0,
            pending: Vec::new(),
            utterance: Vec::new(),
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    /// Feeds little-endian PCM16 bytes; returns every utterance completed by them.
    pub fn push(&mut self, pcm: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(pcm);

        let mut finished = Vec::new();
        let mut offset = 0;
        while self.pending.len() - offset >= self.window_bytes {
            let window = self.pending[offset..offset + self.window_bytes].to_vec();
            offset += self.window_bytes;
            if let Some(utterance) = self.advance(&window) {
                finished.push(utterance);
            }
        }
        self.pending.drain(..offset);

        finished
    }

    /// Drops buffered audio and returns to [`VadState::Quiet`].
    pub fn reset(&mut self) {
        self.state = VadState::Quiet;
        self.count = 0;
        self.pending.clear();
        self.utterance.clear();
    }

    fn advance(&mut self, window: &[u8]) -> Option<Vec<u8>> {
        let speaking = rms(window) >= self.threshold;

        match (self.state, speaking) {
            (VadState::Quiet, true) => {
                self.state = VadState::Starting;
                self.count = 1;
                self.utterance.extend_from_slice(window);
            }
            (VadState::Quiet, false) => {}
            (VadState::Starting, true) => {
                self.count += 1;
                self.utterance.extend_from_slice(window);
            }
            (VadState::Starting, false) => {
                self.state = VadState::Quiet;
                self.count = 0;
                self.utterance.clear();
            }
            (VadState::Speaking, true) => self.utterance.extend_from_slice(window),
            (VadState::Speaking, false) => {
                self.state = VadState::Stopping;
                self.count = 1;
                self.utterance.extend_from_slice(window);
            }
            (VadState::Stopping, true) => {
                self.state = VadState::Speaking;
                self.count = 0;
                self.utterance.extend_from_slice(window);
            }
            (VadState::Stopping, false) => {
                self.count += 1;
                self.utterance.extend_from_slice(window);
            }
        }

        if self.state == VadState::Starting && self.count >= self.start_windows {
            self.state = VadState::Speaking;
            self.count = 0;
        }

        let stopped = self.state == VadState::Stopping && self.count >= self.stop_windows;
        let too_long = matches!(self.state, VadState::Speaking | VadState::Stopping)
            && self.utterance.len() >= self.max_utterance_bytes;
        if stopped || too_long {
            self.state = VadState::Quiet;
            self.count = 0;
            return Some(std::mem::take(&mut self.utterance));
        }

        None
    }
}

/// Converts samples to little-endian PCM16 bytes.
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Normalized RMS of a PCM16 buffer, in `0.0..=1.0`.
pub fn rms(pcm: &[u8]) -> f64 {
    let samples = pcm.len() / 2;
    if samples == 0 {
        return 0.0;
    }

    let sum_squares: f64 = pcm
        .chunks_exact(2)
        .map(|b| f64::from(i16::from_le_bytes([b[0], b[1]])))
        .map(|s| s * s)
        .sum();

    ((sum_squares / samples as f64).sqrt() / f64::from(i16::MAX)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn tone(ms: u32) -> Vec<u8> {
        pcm_bytes(&vec![8_000i16; (RATE / 1000 * ms) as usize])
    }

    fn silence(ms: u32) -> Vec<u8> {
        vec![0u8; (RATE / 1000 * ms) as usize * 2]
    }

    #[test]
    fn rms_of_silence_and_full_scale() {
        assert_eq!(rms(&silence(10)), 0.0);
        assert!((rms(&pcm_bytes(&[i16::MAX; 160])) - 1.0).abs() < 1e-9);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn speech_followed_by_pause_yields_one_utterance() {
        let mut vad = UtteranceDetector::new(VadParams::default(), RATE);

        assert!(vad.push(&silence(300)).is_empty());
        assert!(vad.push(&tone(500)).is_empty());
        assert_eq!(vad.state(), VadState::Speaking);

        let finished = vad.push(&silence(800));
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].len(), tone(500).len() + silence(800).len());
        assert_eq!(vad.state(), VadState::Quiet);
    }

    #[test]
    fn short_blip_is_discarded() {
        let mut vad = UtteranceDetector::new(VadParams::default(), RATE);

        assert!(vad.push(&tone(50)).is_empty());
        assert!(vad.push(&silence(2_000)).is_empty());
        assert_eq!(vad.state(), VadState::Quiet);
    }

    #[test]
    fn brief_pause_does_not_split_utterance() {
        let mut vad = UtteranceDetector::new(VadParams::default(), RATE);

        vad.push(&tone(400));
        vad.push(&silence(300));
        vad.push(&tone(400));
        let finished = vad.push(&silence(800));

        assert_eq!(finished.len(), 1);
    }

    #[test]
    fn long_speech_is_cut_at_max_length() {
        let params = VadParams {
            max_utterance_secs: 1.0,
            ..Default::default()
        };
        let mut vad = UtteranceDetector::new(params, RATE);

        let finished = vad.push(&tone(2_500));

        assert_eq!(finished.len(), 2);
        assert!(finished.iter().all(|u| u.len() == (RATE as usize) * 2));
    }

    #[test]
    fn partial_windows_carry_over_between_pushes() {
        let mut vad = UtteranceDetector::new(VadParams::default(), RATE);
        let audio = tone(300);

        for chunk in audio.chunks(7) {
            vad.push(chunk);
        }

        assert_eq!(vad.state(), VadState::Speaking);
        vad.reset();
        assert_eq!(vad.state(), VadState::Quiet);
    }
}

//! Interleaved 16-bit audio frame with the tags the pipeline reads.

use derive_more::Debug;

/// Speech classification attached to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechType {
    #[default]
    NormalSpeech,
    Plc,
    Cng,
    PlcCng,
    Undefined,
}

/// Voice activity marker attached to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadActivity {
    Active,
    Passive,
    #[default]
    Unknown,
}

/// One frame of interleaved S16 audio.
///
/// The sample storage is allocated once with a fixed capacity and reused for
/// every [`update_frame`](Self::update_frame). A frame updated without data
/// is muted and reads back as silence until it is written through
/// [`data_mut`](Self::data_mut).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    timestamp: u32,
    samples_per_channel: usize,
    sample_rate_hz: u32,
    num_channels: usize,
    speech_type: SpeechType,
    vad_activity: VadActivity,
    muted: bool,
    #[debug(skip)]
    data: Vec<i16>,
}

impl AudioFrame {
    /// Creates a muted, untagged frame able to hold `capacity` samples over
    /// all channels.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamp: 0,
            samples_per_channel: 0,
            sample_rate_hz: 0,
            num_channels: 0,
            speech_type: SpeechType::Undefined,
            vad_activity: VadActivity::Unknown,
            muted: true,
            data: vec![0; capacity],
        }
    }

    /// Retags the frame and, when `data` is given, copies
    /// `samples_per_channel * num_channels` interleaved samples from it.
    ///
    /// # Panics
    ///
    /// Panics if the tagged shape exceeds the frame capacity or `data` is
    /// shorter than the tagged shape.
    #[expect(
        clippy::too_many_arguments,
        reason = "mirrors the tag set every producer supplies at once"
    )]
    pub fn update_frame(
        &mut self,
        timestamp: u32,
        data: Option<&[i16]>,
        samples_per_channel: usize,
        sample_rate_hz: u32,
        speech_type: SpeechType,
        vad_activity: VadActivity,
        num_channels: usize,
    ) {
        let len = samples_per_channel * num_channels;
        assert!(
            len <= self.data.len(),
            "frame of {len} samples exceeds capacity {}",
            self.data.len()
        );
        self.timestamp = timestamp;
        self.samples_per_channel = samples_per_channel;
        self.sample_rate_hz = sample_rate_hz;
        self.speech_type = speech_type;
        self.vad_activity = vad_activity;
        self.num_channels = num_channels;

        match data {
            Some(src) => {
                self.data[..len].copy_from_slice(&src[..len]);
                self.muted = false;
            }
            None => {
                self.data[..len].fill(0);
                self.muted = true;
            }
        }
    }

    /// The tagged samples, `samples_per_channel * num_channels` of them.
    pub fn data(&self) -> &[i16] {
        &self.data[..self.samples_per_channel * self.num_channels]
    }

    /// Mutable access to the tagged samples. Unmutes the frame.
    pub fn data_mut(&mut self) -> &mut [i16] {
        self.muted = false;
        let len = self.samples_per_channel * self.num_channels;
        &mut self.data[..len]
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn speech_type(&self) -> SpeechType {
        self.speech_type
    }

    pub fn vad_activity(&self) -> VadActivity {
        self.vad_activity
    }

    pub fn muted(&self) -> bool {
        self.muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_copies_tagged_shape_only() {
        let mut frame = AudioFrame::with_capacity(8);
        let src = [1, 2, 3, 4, 5, 6, 7, 8];
        frame.update_frame(
            7,
            Some(&src),
            2,
            200,
            SpeechType::NormalSpeech,
            VadActivity::Active,
            2,
        );
        assert_eq!(frame.data(), &[1, 2, 3, 4]);
        assert_eq!(frame.timestamp(), 7);
        assert_eq!(frame.num_channels(), 2);
        assert_eq!(frame.speech_type(), SpeechType::NormalSpeech);
        assert_eq!(frame.vad_activity(), VadActivity::Active);
        assert!(!frame.muted());
    }

    #[test]
    fn update_without_data_mutes() {
        let mut frame = AudioFrame::with_capacity(4);
        frame.update_frame(
            0,
            Some(&[9, 9, 9, 9]),
            4,
            400,
            SpeechType::NormalSpeech,
            VadActivity::Active,
            1,
        );
        frame.update_frame(
            0,
            None,
            2,
            200,
            SpeechType::NormalSpeech,
            VadActivity::Active,
            1,
        );
        assert!(frame.muted());
        assert_eq!(frame.data(), &[0, 0]);

        frame.data_mut()[1] = 5;
        assert!(!frame.muted());
        assert_eq!(frame.data(), &[0, 5]);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn update_beyond_capacity_panics() {
        let mut frame = AudioFrame::with_capacity(4);
        frame.update_frame(
            0,
            None,
            3,
            300,
            SpeechType::NormalSpeech,
            VadActivity::Active,
            2,
        );
    }
}

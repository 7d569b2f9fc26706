//! Audio stream format and the buffer sizes derived from it.
//!
//! The Voice HAT codec is driven over I2S with plain interleaved PCM. The
//! driver never touches samples; it only needs the byte rate to size the
//! host's buffer hint and the silence block written when waking the DAC.

pub mod user_driver;

use serde::{Deserialize, Serialize};

/// Sample encoding on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Encoding {
    #[serde(rename = "pcm8")]
    #[strum(serialize = "pcm8")]
    Pcm8Bit,
    #[serde(rename = "pcm16")]
    #[strum(serialize = "pcm16")]
    Pcm16Bit,
    #[serde(rename = "pcm24")]
    #[strum(serialize = "pcm24")]
    Pcm24Bit,
    #[serde(rename = "pcm32")]
    #[strum(serialize = "pcm32")]
    Pcm32Bit,
    #[serde(rename = "float")]
    #[strum(serialize = "float")]
    PcmFloat,
}

impl Encoding {
    /// Bytes per sample of one channel.
    pub const fn bytes_per_sample(self) -> u32 {
        match self {
            Encoding::Pcm8Bit => 1,
            Encoding::Pcm16Bit => 2,
            Encoding::Pcm24Bit => 3,
            Encoding::Pcm32Bit | Encoding::PcmFloat => 4,
        }
    }
}

/// Channel layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub const fn count(self) -> u32 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// Format of the audio carried over the I2S bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Frames per second
    pub sample_rate: u32,
    pub encoding: Encoding,
    pub channels: ChannelLayout,
}

impl AudioFormat {
    /// 48 kHz, 16-bit, mono: the format the Voice HAT codec runs at.
    pub const VOICE_HAT: AudioFormat = AudioFormat {
        sample_rate: 48_000,
        encoding: Encoding::Pcm16Bit,
        channels: ChannelLayout::Mono,
    };

    pub const fn new(sample_rate: u32, encoding: Encoding, channels: ChannelLayout) -> Self {
        Self {
            sample_rate,
            encoding,
            channels,
        }
    }

    pub const fn bytes_per_frame(&self) -> u32 {
        self.encoding.bytes_per_sample() * self.channels.count()
    }

    pub const fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.bytes_per_frame() as usize
    }

    /// Buffer size handed to the host audio subsystem: 0.05 s of audio.
    pub const fn buffer_size_hint(&self) -> usize {
        self.bytes_per_second() / 20
    }

    /// Size of the silence block written when the DAC leaves standby:
    /// 0.5 s of audio.
    pub const fn flush_size(&self) -> usize {
        self.bytes_per_second() / 2
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::VOICE_HAT
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz {} {}",
            self.sample_rate, self.encoding, self.channels
        )
    }
}

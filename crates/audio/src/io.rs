use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded recording, samples stored channel after channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<AudioClip> {
        let path_ref = path.as_ref();
        let file =
            File::open(path_ref).with_context(|| format!("open audio file {:?}", path_ref))?;
        let extension = path_ref.extension().and_then(|ext| ext.to_str());
        Self::decode(Box::new(file), extension)
            .with_context(|| format!("decode audio file {:?}", path_ref))
    }

    /// Decodes an in-memory file, e.g. one fetched over the network.
    pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioClip> {
        Self::decode(Box::new(Cursor::new(bytes)), extension)
    }

    fn decode(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<AudioClip> {
        let mss = MediaSourceStream::new(source, Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| anyhow::anyhow!("no default track found"))?;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;
        let mut samples = Vec::new();
        let sample_rate = track.codec_params.sample_rate.unwrap_or(48_000);
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);

        loop {
            match format.next_packet() {
                Ok(packet) => match decoder.decode(&packet)? {
                    AudioBufferRef::F32(buf) => {
                        for ch in 0..buf.spec().channels.count() {
                            samples.extend_from_slice(buf.chan(ch));
                        }
                    }
                    AudioBufferRef::S16(buf) => {
                        for ch in 0..buf.spec().channels.count() {
                            samples.extend(
                                buf.chan(ch).iter().map(|&s| s as f32 / i16::MAX as f32),
                            );
                        }
                    }
                    other => {
                        let spec = *other.spec();
                        let frames = other.frames() as u64;
                        let mut out = SampleBuffer::<f32>::new(frames, spec);
                        out.copy_interleaved_ref(other);
                        samples.extend_from_slice(out.samples());
                    }
                },
                Err(err) => {
                    use symphonia::core::errors::Error as SymphError;
                    match err {
                        SymphError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            break;
                        }
                        SymphError::DecodeError(_) => {
                            // skip undecodable packet
                        }
                        _ => return Err(err.into()),
                    }
                }
            }
        }

        Ok(AudioClip {
            sample_rate,
            channels,
            samples,
        })
    }
}

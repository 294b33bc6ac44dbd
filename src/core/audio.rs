//! Song playback and the clock the renderer follows.
//!
//! The whole song is decoded and resampled to the output device's rate up front, then
//! streamed from memory by the cpal callback. The callback advances a sample cursor; the
//! render loop reads that cursor to get the playback position, so the position is
//! exactly what has been handed to the device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use lewton::inside_ogg::OggStreamReader;
use log::{error, info};
use rubato::{Resampler, SincFixedOut, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device")]
    NoOutputDevice,
    #[error("no usable output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
    #[error("unsupported output sample format {0}")]
    SampleFormat(SampleFormat),
    #[error("unsupported audio file {0}")]
    UnsupportedFormat(String),
    #[error("failed to open audio file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("failed to resample audio: {0}")]
    Resample(String),
}

/// Interleaved PCM with its format.
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub samples: Vec<i16>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl Pcm {
    #[inline(always)]
    pub fn frames(&self) -> usize {
        if self.channels == 0 { 0 } else { self.samples.len() / self.channels }
    }
}

/// State shared with the output callback.
struct Track {
    samples: Arc<[i16]>,
    cursor: AtomicUsize,
}

/// A song playing on the default output device.
pub struct Player {
    _stream: cpal::Stream,
    track: Arc<Track>,
    sample_rate: u32,
    channels: usize,
}

impl Player {
    /// Decodes `path`, opens the default output device and starts playback.
    pub fn start(path: &Path, volume: f32) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoOutputDevice)?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();
        let sample_rate = stream_config.sample_rate.0;
        let channels = usize::from(stream_config.channels);

        let pcm = decode_file(path)?;
        info!(
            "Decoded {} ({} Hz, {} ch, {:.1} s)",
            path.display(),
            pcm.sample_rate,
            pcm.channels,
            pcm.frames() as f64 / f64::from(pcm.sample_rate.max(1))
        );
        let mut samples = convert(&pcm, sample_rate, channels)?;
        apply_volume(&mut samples, volume);

        let track = Arc::new(Track {
            samples: samples.into(),
            cursor: AtomicUsize::new(0),
        });

        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, track.clone())?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, track.clone())?,
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, track.clone())?,
            other => return Err(AudioError::SampleFormat(other)),
        };
        stream.play()?;
        info!("Audio playback started ({sample_rate} Hz, {channels} ch).");

        Ok(Self {
            _stream: stream,
            track,
            sample_rate,
            channels,
        })
    }

    /// Milliseconds of audio handed to the device so far.
    pub fn position_ms(&self) -> i64 {
        let frames = self.track.cursor.load(Ordering::Acquire) / self.channels.max(1);
        (frames as u64 * 1000 / u64::from(self.sample_rate.max(1))) as i64
    }

    /// `true` until the last sample has been handed to the device.
    pub fn is_busy(&self) -> bool {
        self.track.cursor.load(Ordering::Acquire) < self.track.samples.len()
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    track: Arc<Track>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<i16>,
{
    device.build_output_stream(
        config,
        move |out: &mut [T], _| {
            let start = track.cursor.load(Ordering::Relaxed);
            let src = track.samples.get(start..).unwrap_or(&[]);
            let n = src.len().min(out.len());
            for (o, s) in out[..n].iter_mut().zip(src) {
                *o = T::from_sample(*s);
            }
            // underrun / end of song: silence
            for o in &mut out[n..] {
                *o = T::EQUILIBRIUM;
            }
            track.cursor.store(start + n, Ordering::Release);
        },
        |err| error!("Audio stream error: {}", err),
        None,
    )
}

/* ============================== Decoding ============================== */

pub fn decode_file(path: &Path) -> Result<Pcm, AudioError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => decode_mp3(File::open(path)?),
        "ogg" => decode_ogg(File::open(path)?),
        _ => Err(AudioError::UnsupportedFormat(path.display().to_string())),
    }
}

fn decode_mp3(file: File) -> Result<Pcm, AudioError> {
    let mut decoder = minimp3::Decoder::new(BufReader::new(file));
    let mut samples = Vec::new();
    let mut format: Option<(usize, u32)> = None;
    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 0 || frame.data.is_empty() {
                    continue;
                }
                let frame_format = (frame.channels, frame.sample_rate.max(1) as u32);
                match format {
                    None => format = Some(frame_format),
                    // Mid-stream format changes are rare; keep the first layout.
                    Some(f) if f != frame_format => continue,
                    Some(_) => {}
                }
                samples.extend_from_slice(&frame.data);
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => continue,
            Err(e) => return Err(AudioError::Decode(format!("{e:?}"))),
        }
    }
    let (channels, sample_rate) =
        format.ok_or_else(|| AudioError::Decode("no audio frames in mp3".to_string()))?;
    Ok(Pcm {
        samples,
        channels,
        sample_rate,
    })
}

fn decode_ogg(file: File) -> Result<Pcm, AudioError> {
    let mut ogg = OggStreamReader::new(BufReader::new(file))
        .map_err(|e| AudioError::Decode(e.to_string()))?;
    let channels = usize::from(ogg.ident_hdr.audio_channels);
    let sample_rate = ogg.ident_hdr.audio_sample_rate;
    let mut samples = Vec::new();
    while let Some(pkt) = ogg
        .read_dec_packet_itl()
        .map_err(|e| AudioError::Decode(e.to_string()))?
    {
        samples.extend_from_slice(&pkt);
    }
    Ok(Pcm {
        samples,
        channels,
        sample_rate,
    })
}

/* ========================= Resample + remap ========================= */

/// Resamples to `out_hz` and maps channels to `out_ch` (output channel `c` takes input
/// channel `c % in_ch`).
pub fn convert(pcm: &Pcm, out_hz: u32, out_ch: usize) -> Result<Vec<i16>, AudioError> {
    let in_ch = pcm.channels;
    if in_ch == 0 || out_ch == 0 {
        return Ok(Vec::new());
    }
    if pcm.sample_rate == out_hz {
        let mut out = Vec::with_capacity(pcm.frames() * out_ch);
        for frame in pcm.samples.chunks_exact(in_ch) {
            for c in 0..out_ch {
                out.push(frame[c % in_ch]);
            }
        }
        return Ok(out);
    }
    resample(pcm, out_hz, out_ch)
}

fn resample(pcm: &Pcm, out_hz: u32, out_ch: usize) -> Result<Vec<i16>, AudioError> {
    const OUT_FRAMES_PER_CALL: usize = 512;
    let in_ch = pcm.channels;
    let ratio = f64::from(out_hz) / f64::from(pcm.sample_rate.max(1));
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedOut::<f32>::new(ratio, 1.0, params, OUT_FRAMES_PER_CALL, in_ch)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let mut in_planar: Vec<Vec<f32>> = vec![Vec::with_capacity(pcm.frames()); in_ch];
    for frame in pcm.samples.chunks_exact(in_ch) {
        for (c, s) in frame.iter().enumerate() {
            in_planar[c].push(f32::from(*s) / 32768.0);
        }
    }

    let expected = (pcm.frames() as f64 * ratio).ceil() as usize;
    let mut out_data: Vec<i16> = Vec::with_capacity(expected * out_ch);
    let push_interleaved = |out: &[Vec<f32>], dst: &mut Vec<i16>| {
        if out.is_empty() {
            return;
        }
        for f in 0..out[0].len() {
            for c in 0..out_ch {
                let v = out[c % out.len()][f];
                dst.push((v * 32767.0).round().clamp(-32768.0, 32767.0) as i16);
            }
        }
    };

    let mut offset = 0usize;
    let total = pcm.frames();
    loop {
        let need = resampler.input_frames_next();
        if total - offset < need {
            break;
        }
        let input: Vec<&[f32]> = in_planar.iter().map(|ch| &ch[offset..offset + need]).collect();
        let out = resampler
            .process(input.as_slice(), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        offset += need;
        push_interleaved(&out, &mut out_data);
    }

    // Flush the short remainder, then the filter delay.
    if offset < total {
        let input: Vec<&[f32]> = in_planar.iter().map(|ch| &ch[offset..]).collect();
        let out = resampler
            .process_partial(Some(input.as_slice()), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        push_interleaved(&out, &mut out_data);
    }
    let tail = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| AudioError::Resample(e.to_string()))?;
    push_interleaved(&tail, &mut out_data);

    // The sinc filter delays the signal; keep the expected length so position stays in sync.
    let delay = resampler.output_delay() * out_ch;
    let keep = expected * out_ch;
    if out_data.len() > delay {
        out_data.drain(..delay);
    }
    out_data.truncate(keep);
    Ok(out_data)
}

pub fn apply_volume(samples: &mut [i16], volume: f32) {
    let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 1.0 };
    if (volume - 1.0).abs() < f32::EPSILON {
        return;
    }
    for s in samples {
        *s = (f32::from(*s) * volume).round() as i16;
    }
}

//! WAV file I/O. Samples are held as f32 in [-1.0, 1.0] in ndarray
//! containers regardless of the on-disk encoding.

use crate::error::{RemasterError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use ndarray::{Array1, Array2, Axis, s};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const I16_SCALE: f32 = 32767.0;

/// Sample encodings this crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Int16,
    Float32,
}

impl AudioFormat {
    fn from_spec(spec: &WavSpec) -> Result<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => Ok(AudioFormat::Int16),
            (SampleFormat::Float, 32) => Ok(AudioFormat::Float32),
            (format, bits) => Err(RemasterError::audio(format!(
                "unsupported sample encoding: {} bit {:?}",
                bits, format
            ))),
        }
    }

    fn to_spec(self, channels: u16, sample_rate: u32) -> WavSpec {
        let (sample_format, bits_per_sample) = match self {
            AudioFormat::Int16 => (SampleFormat::Int, 16),
            AudioFormat::Float32 => (SampleFormat::Float, 32),
        };
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Channel data. Stereo is frame-major: rows are frames, columns channels.
#[derive(Debug, Clone)]
pub enum AudioData {
    Mono(Array1<f32>),
    Stereo(Array2<f32>),
}

impl AudioData {
    /// Per-channel sample count.
    pub fn frames(&self) -> usize {
        match self {
            AudioData::Mono(d) => d.len(),
            AudioData::Stereo(d) => d.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channels(&self) -> u16 {
        match self {
            AudioData::Mono(_) => 1,
            AudioData::Stereo(_) => 2,
        }
    }

    /// Average the channels down to one.
    pub fn to_mono(&self) -> Array1<f32> {
        match self {
            AudioData::Mono(d) => d.clone(),
            AudioData::Stereo(d) => d.mean_axis(Axis(1)).unwrap_or_default(),
        }
    }

    /// Copy of the frame range `[start, end)`, all channels.
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioData {
        match self {
            AudioData::Mono(d) => AudioData::Mono(d.slice(s![start..end]).to_owned()),
            AudioData::Stereo(d) => AudioData::Stereo(d.slice(s![start..end, ..]).to_owned()),
        }
    }

    fn from_interleaved(channels: u16, mut samples: Vec<f32>) -> Result<AudioData> {
        if channels == 1 {
            return Ok(AudioData::Mono(Array1::from(samples)));
        }
        // A truncated final frame is dropped rather than rejected.
        let frames = samples.len() / 2;
        samples.truncate(frames * 2);
        let rows = Array2::from_shape_vec((frames, 2), samples)
            .map_err(|e| RemasterError::audio(format!("reshaping stereo samples: {}", e)))?;
        Ok(AudioData::Stereo(rows))
    }
}

/// One WAV file's worth of audio, decoded into memory.
#[derive(Debug, Clone)]
pub struct WavAudio {
    sample_rate: u32,
    format: AudioFormat,
    data: AudioData,
}

impl WavAudio {
    pub fn new_mono(sample_rate: u32, samples: Array1<f32>, format: AudioFormat) -> Self {
        WavAudio {
            sample_rate,
            format,
            data: AudioData::Mono(samples),
        }
    }

    pub fn new_stereo(sample_rate: u32, samples: Array2<f32>, format: AudioFormat) -> Result<Self> {
        if samples.ncols() != 2 {
            return Err(RemasterError::audio(format!(
                "stereo data needs 2 columns, got {}",
                samples.ncols()
            )));
        }
        Ok(WavAudio {
            sample_rate,
            format,
            data: AudioData::Stereo(samples),
        })
    }

    /// Wrap existing channel data without copying it.
    pub fn from_data(sample_rate: u32, data: AudioData, format: AudioFormat) -> Self {
        WavAudio {
            sample_rate,
            format,
            data,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            RemasterError::audio(format!("cannot open {}: {}", path.display(), e))
        })?;
        let mut reader = WavReader::new(file).map_err(|e| {
            RemasterError::audio(format!("{} is not a readable WAV: {}", path.display(), e))
        })?;

        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(RemasterError::audio("WAV header declares a sample rate of 0"));
        }
        if spec.channels == 0 || spec.channels > 2 {
            return Err(RemasterError::audio(format!(
                "only mono and stereo are supported, file has {} channels",
                spec.channels
            )));
        }
        let format = AudioFormat::from_spec(&spec)?;

        let samples = read_samples(&mut reader, format)?;
        let data = AudioData::from_interleaved(spec.channels, samples)?;

        Ok(WavAudio {
            sample_rate: spec.sample_rate,
            format,
            data,
        })
    }

    /// Write the audio to `path`. The bytes are staged in a temporary
    /// sibling file and renamed into place, so a crash mid-write never
    /// leaves a partial file at the destination.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| {
            RemasterError::audio(format!("cannot create {}: {}", parent.display(), e))
        })?;

        let mut staged = NamedTempFile::new_in(&parent).map_err(|e| {
            RemasterError::audio(format!(
                "cannot stage temp file in {}: {}",
                parent.display(),
                e
            ))
        })?;
        self.encode_into(staged.as_file_mut())?;
        staged.persist(path).map_err(|e| {
            RemasterError::audio(format!("cannot publish {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    fn encode_into(&self, file: &mut File) -> Result<()> {
        let spec = self.format.to_spec(self.channels(), self.sample_rate);
        let mut writer = WavWriter::new(file, spec)
            .map_err(|e| RemasterError::audio(format!("cannot start WAV writer: {}", e)))?;

        // Iterating a (frames, 2) array row by row yields the
        // interleaved order WAV expects.
        match &self.data {
            AudioData::Mono(d) => write_samples(&mut writer, d.iter().copied(), self.format)?,
            AudioData::Stereo(d) => write_samples(&mut writer, d.iter().copied(), self.format)?,
        }

        writer
            .finalize()
            .map_err(|e| RemasterError::audio(format!("finalizing WAV: {}", e)))
    }

    pub fn data(&self) -> &AudioData {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.data.channels()
    }

    /// Per-channel sample count.
    pub fn frames(&self) -> usize {
        self.data.frames()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    /// Mono copy of this audio. Stereo frames are averaged.
    pub fn downmix_to_mono(&self) -> WavAudio {
        match &self.data {
            AudioData::Mono(_) => self.clone(),
            AudioData::Stereo(_) => {
                WavAudio::new_mono(self.sample_rate, self.data.to_mono(), self.format)
            }
        }
    }
}

fn read_samples<R: std::io::Read>(reader: &mut WavReader<R>, format: AudioFormat) -> Result<Vec<f32>> {
    let decode_err =
        |e: hound::Error| RemasterError::audio(format!("bad sample in WAV stream: {}", e));
    match format {
        AudioFormat::Int16 => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / I16_SCALE).map_err(decode_err))
            .collect(),
        AudioFormat::Float32 => reader
            .samples::<f32>()
            .map(|s| s.map_err(decode_err))
            .collect(),
    }
}

fn write_samples<W, I>(writer: &mut WavWriter<W>, samples: I, format: AudioFormat) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
    I: Iterator<Item = f32>,
{
    for sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let written = match format {
            AudioFormat::Float32 => writer.write_sample(clamped),
            AudioFormat::Int16 => writer.write_sample((clamped * I16_SCALE) as i16),
        };
        written.map_err(|e| RemasterError::audio(format!("writing sample: {}", e)))?;
    }
    Ok(())
}

//! Reassembling enhanced chunks into one continuous track

use crate::audio::{AudioData, WavAudio};
use crate::error::{RemasterError, Result};
use ndarray::{Array1, Array2, s};

/// Concatenate chunks back to back in the order given.
///
/// Chunks must agree on sample rate and channel count; the enhancer is
/// expected to preserve both, so a disagreement means a chunk came back
/// mangled and the caller gets an error instead of a glitched track.
pub fn concat_chunks(chunks: &[WavAudio]) -> Result<WavAudio> {
    let first = chunks
        .first()
        .ok_or_else(|| RemasterError::audio("no chunks to concatenate"))?;

    let sample_rate = first.sample_rate();
    let channels = first.channels();
    let format = first.format();

    for (index, chunk) in chunks.iter().enumerate().skip(1) {
        if chunk.sample_rate() != sample_rate {
            return Err(RemasterError::audio(format!(
                "chunk {} has sample rate {} Hz but chunk 0 has {} Hz",
                index,
                chunk.sample_rate(),
                sample_rate
            )));
        }
        if chunk.channels() != channels {
            return Err(RemasterError::audio(format!(
                "chunk {} has {} channel(s) but chunk 0 has {}",
                index,
                chunk.channels(),
                channels
            )));
        }
    }

    let total_frames: usize = chunks.iter().map(|c| c.frames()).sum();

    let data = if channels == 1 {
        let mut joined = Array1::<f32>::zeros(total_frames);
        let mut offset = 0;
        for chunk in chunks {
            if let AudioData::Mono(d) = chunk.data() {
                joined.slice_mut(s![offset..offset + d.len()]).assign(d);
                offset += d.len();
            }
        }
        AudioData::Mono(joined)
    } else {
        let mut joined = Array2::<f32>::zeros((total_frames, 2));
        let mut offset = 0;
        for chunk in chunks {
            if let AudioData::Stereo(d) = chunk.data() {
                joined
                    .slice_mut(s![offset..offset + d.nrows(), ..])
                    .assign(d);
                offset += d.nrows();
            }
        }
        AudioData::Stereo(joined)
    };

    Ok(WavAudio::from_data(sample_rate, data, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use crate::pipeline::chunker;
    use ndarray::Array2;
    use std::path::Path;

    fn mono(sample_rate: u32, samples: Vec<f32>) -> WavAudio {
        WavAudio::new_mono(sample_rate, Array1::from(samples), AudioFormat::Float32)
    }

    #[test]
    fn test_concat_preserves_order_and_content() {
        let chunks = vec![
            mono(8000, vec![0.1, 0.2]),
            mono(8000, vec![0.3]),
            mono(8000, vec![0.4, 0.5, 0.6]),
        ];

        let joined = concat_chunks(&chunks).unwrap();
        assert_eq!(joined.frames(), 6);
        match joined.data() {
            AudioData::Mono(d) => {
                let expected = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
                for (got, want) in d.iter().zip(expected.iter()) {
                    assert!((got - want).abs() < 1e-6);
                }
            }
            _ => panic!("Expected mono output"),
        }
    }

    #[test]
    fn test_concat_stereo() {
        let a = WavAudio::new_stereo(
            8000,
            Array2::from_shape_vec((2, 2), vec![0.1, 0.2, 0.3, 0.4]).unwrap(),
            AudioFormat::Float32,
        )
        .unwrap();
        let b = WavAudio::new_stereo(
            8000,
            Array2::from_shape_vec((1, 2), vec![0.5, 0.6]).unwrap(),
            AudioFormat::Float32,
        )
        .unwrap();

        let joined = concat_chunks(&[a, b]).unwrap();
        assert_eq!(joined.frames(), 3);
        assert_eq!(joined.channels(), 2);
        match joined.data() {
            AudioData::Stereo(d) => {
                assert!((d[[2, 0]] - 0.5).abs() < 1e-6);
                assert!((d[[2, 1]] - 0.6).abs() < 1e-6);
            }
            _ => panic!("Expected stereo output"),
        }
    }

    #[test]
    fn test_concat_rejects_rate_mismatch() {
        let chunks = vec![mono(8000, vec![0.1]), mono(16000, vec![0.2])];
        let err = concat_chunks(&chunks).unwrap_err();
        match err {
            RemasterError::Audio(msg) => {
                assert!(msg.contains("16000"));
                assert!(msg.contains("chunk 1"));
            }
            other => panic!("Expected Audio error, got {:?}", other),
        }
    }

    #[test]
    fn test_concat_rejects_channel_mismatch() {
        let a = mono(8000, vec![0.1, 0.2]);
        let b = WavAudio::new_stereo(
            8000,
            Array2::from_shape_vec((1, 2), vec![0.3, 0.4]).unwrap(),
            AudioFormat::Float32,
        )
        .unwrap();

        assert!(concat_chunks(&[a, b]).is_err());
    }

    #[test]
    fn test_concat_rejects_empty_input() {
        assert!(concat_chunks(&[]).is_err());
    }

    #[test]
    fn test_chunk_then_concat_restores_original() {
        let samples: Vec<f32> = (0..2500).map(|i| (i as f32 / 2500.0) - 0.5).collect();
        let audio = mono(1000, samples.clone());

        let plan = chunker::plan(&audio, Path::new("in.wav"), 1.0).unwrap();
        let chunks: Vec<WavAudio> = plan
            .chunks
            .iter()
            .map(|c| {
                WavAudio::from_data(
                    audio.sample_rate(),
                    audio.data().slice_frames(c.start_frame, c.end_frame),
                    audio.format(),
                )
            })
            .collect();

        let joined = concat_chunks(&chunks).unwrap();
        assert_eq!(joined.frames(), audio.frames());
        match joined.data() {
            AudioData::Mono(d) => {
                for (got, want) in d.iter().zip(samples.iter()) {
                    assert!((got - want).abs() < 1e-6);
                }
            }
            _ => panic!("Expected mono output"),
        }
    }
}

//! Sample-wise stem mixing

use crate::audio::{AudioData, WavAudio};
use crate::error::{RemasterError, Result};
use ndarray::{Array1, Array2};

/// Mix named stems into a single track by sample-wise summation.
///
/// All stems must agree on sample rate and channel count; a disagreement is
/// a [`RemasterError::MixMismatch`], never a silent resample. The result
/// spans the longest stem, shorter stems are zero-filled, and summed
/// samples are clamped to `[-1.0, 1.0]`.
pub fn mix_stems(stems: &[(String, WavAudio)]) -> Result<WavAudio> {
    if stems.is_empty() {
        return Err(RemasterError::MixMismatch {
            reason: "no stems to mix".into(),
        });
    }

    let (first_name, first) = &stems[0];
    for (name, stem) in &stems[1..] {
        if stem.sample_rate() != first.sample_rate() {
            return Err(RemasterError::MixMismatch {
                reason: format!(
                    "stem '{}' is {} Hz but '{}' is {} Hz",
                    name,
                    stem.sample_rate(),
                    first_name,
                    first.sample_rate()
                ),
            });
        }
        if stem.channels() != first.channels() {
            return Err(RemasterError::MixMismatch {
                reason: format!(
                    "stem '{}' has {} channel(s) but '{}' has {}",
                    name,
                    stem.channels(),
                    first_name,
                    first.channels()
                ),
            });
        }
    }

    let longest = stems.iter().map(|(_, s)| s.frames()).max().unwrap_or(0);

    match first.data() {
        AudioData::Mono(_) => {
            let mut acc = Array1::<f32>::zeros(longest);
            for (_, stem) in stems {
                if let AudioData::Mono(d) = stem.data() {
                    let mut view = acc.slice_mut(ndarray::s![..d.len()]);
                    view += d;
                }
            }
            acc.mapv_inplace(|x| x.clamp(-1.0, 1.0));
            Ok(WavAudio::new_mono(first.sample_rate(), acc, first.format()))
        }
        AudioData::Stereo(_) => {
            let mut acc = Array2::<f32>::zeros((longest, 2));
            for (_, stem) in stems {
                if let AudioData::Stereo(d) = stem.data() {
                    let mut view = acc.slice_mut(ndarray::s![..d.nrows(), ..]);
                    view += d;
                }
            }
            acc.mapv_inplace(|x| x.clamp(-1.0, 1.0));
            WavAudio::new_stereo(first.sample_rate(), acc, first.format())
        }
    }
}

//! Audio probing.

use crate::error::{Result, TieralignError};
use std::path::Path;

/// Reads the duration of a WAV file in seconds from its header.
pub fn wav_duration_secs(path: &Path) -> Result<f64> {
    let reader = hound::WavReader::open(path).map_err(|e| TieralignError::Audio {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(TieralignError::Audio {
            path: path.to_path_buf(),
            message: "sample rate is zero".to_string(),
        });
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

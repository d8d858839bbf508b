//! Best-effort speed and ETA for a running job.
//!
//! Speed comes from the growth of the artifact on disk between two samples;
//! ETA from the rate at which the reported percentage advances.

use humansize::{format_size, DECIMAL};
use std::path::Path;

use crate::job::{ETA_CALCULATING, SPEED_PLACEHOLDER};

/// One observation of a job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the job's first sample.
    pub elapsed_secs: f64,
    pub percent: u8,
    /// Bytes of the artifact on disk, if it exists yet.
    pub bytes: Option<u64>,
}

/// Display strings derived from samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub speed: String,
    pub estimated_time: String,
}

#[derive(Debug, Default)]
pub struct ThroughputSampler {
    origin: Option<Sample>,
    previous: Option<Sample>,
}

impl ThroughputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample and return the metrics it implies.
    pub fn observe(&mut self, sample: Sample) -> Metrics {
        let origin = *self.origin.get_or_insert(sample);
        let speed = self
            .previous
            .and_then(|prev| bytes_per_sec(&prev, &sample))
            .map(format_speed)
            .unwrap_or_else(|| SPEED_PLACEHOLDER.to_string());
        let estimated_time = eta_secs(&origin, &sample)
            .map(format_eta)
            .unwrap_or_else(|| ETA_CALCULATING.to_string());
        self.previous = Some(sample);
        Metrics {
            speed,
            estimated_time,
        }
    }
}

/// Byte rate between two samples (None if either lacks a size or no time passed).
pub fn bytes_per_sec(prev: &Sample, cur: &Sample) -> Option<f64> {
    let dt = cur.elapsed_secs - prev.elapsed_secs;
    if dt <= 0.0 {
        return None;
    }
    let (Some(before), Some(after)) = (prev.bytes, cur.bytes) else {
        return None;
    };
    Some(after.saturating_sub(before) as f64 / dt)
}

/// Seconds remaining, extrapolated from percent-per-second since `origin`.
/// None until the percentage has moved.
pub fn eta_secs(origin: &Sample, cur: &Sample) -> Option<f64> {
    if cur.percent >= 100 {
        return Some(0.0);
    }
    let dt = cur.elapsed_secs - origin.elapsed_secs;
    let advanced = f64::from(cur.percent.saturating_sub(origin.percent));
    if dt <= 0.0 || advanced <= 0.0 {
        return None;
    }
    let rate = advanced / dt;
    Some(f64::from(100 - cur.percent) / rate)
}

/// `1.50 MB/s`; a zero rate reads as the placeholder.
pub fn format_speed(bytes_per_sec: f64) -> String {
    let rounded = bytes_per_sec.round();
    if rounded < 1.0 {
        return SPEED_PLACEHOLDER.to_string();
    }
    format!("{}/s", format_size(rounded as u64, DECIMAL))
}

/// `45s`, `2m 05s`, `1h 02m`.
pub fn format_eta(secs: f64) -> String {
    let secs = secs.max(0.0).round() as u64;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Total size of files in `dir` whose name starts with `stem` (the artifact and
/// any partial files next to it). None if there are none.
pub async fn artifact_bytes(dir: &Path, stem: &str) -> Option<u64> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut total = None;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if !entry.file_name().to_string_lossy().starts_with(stem) {
            continue;
        }
        if let Ok(meta) = entry.metadata().await {
            if meta.is_file() {
                *total.get_or_insert(0) += meta.len();
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(elapsed_secs: f64, percent: u8, bytes: Option<u64>) -> Sample {
        Sample {
            elapsed_secs,
            percent,
            bytes,
        }
    }

    #[test]
    fn first_sample_is_all_placeholders() {
        let mut sampler = ThroughputSampler::new();
        let m = sampler.observe(s(0.0, 10, Some(1000)));
        assert_eq!(m.speed, "0 MB/s");
        assert_eq!(m.estimated_time, "calculating...");
    }

    #[test]
    fn speed_and_eta_after_progress() {
        let mut sampler = ThroughputSampler::new();
        sampler.observe(s(0.0, 10, Some(0)));
        let m = sampler.observe(s(1.0, 20, Some(1_500_000)));
        assert!(m.speed.ends_with("MB/s"), "{}", m.speed);
        assert!(m.speed.starts_with("1.5"), "{}", m.speed);
        // 10%/s with 80% left
        assert_eq!(m.estimated_time, "8s");
    }

    #[test]
    fn no_bytes_means_placeholder_speed() {
        let mut sampler = ThroughputSampler::new();
        sampler.observe(s(0.0, 0, None));
        let m = sampler.observe(s(2.0, 50, None));
        assert_eq!(m.speed, "0 MB/s");
        assert_eq!(m.estimated_time, "2s");
    }

    #[test]
    fn stalled_percent_keeps_calculating() {
        let origin = s(0.0, 40, None);
        assert_eq!(eta_secs(&origin, &s(5.0, 40, None)), None);
        assert_eq!(eta_secs(&origin, &s(5.0, 100, None)), Some(0.0));
    }

    #[test]
    fn rate_needs_elapsed_time_and_sizes() {
        assert_eq!(bytes_per_sec(&s(1.0, 0, Some(0)), &s(1.0, 0, Some(10))), None);
        assert_eq!(bytes_per_sec(&s(0.0, 0, None), &s(1.0, 0, Some(10))), None);
        assert_eq!(
            bytes_per_sec(&s(0.0, 0, Some(10)), &s(2.0, 0, Some(30))),
            Some(10.0)
        );
    }

    #[test]
    fn eta_formats() {
        assert_eq!(format_eta(45.0), "45s");
        assert_eq!(format_eta(125.0), "2m 05s");
        assert_eq!(format_eta(3720.0), "1h 02m");
        assert_eq!(format_eta(-3.0), "0s");
    }

    #[test]
    fn zero_speed_is_placeholder() {
        assert_eq!(format_speed(0.0), "0 MB/s");
        assert_eq!(format_speed(0.2), "0 MB/s");
    }

    #[tokio::test]
    async fn artifact_bytes_sums_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(artifact_bytes(dir.path(), "job").await, None);
        tokio::fs::write(dir.path().join("job.mp4.part"), vec![0u8; 10])
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("job.f18"), vec![0u8; 5])
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("other.mp4"), vec![0u8; 100])
            .await
            .unwrap();
        assert_eq!(artifact_bytes(dir.path(), "job").await, Some(15));
        assert_eq!(artifact_bytes(&dir.path().join("missing"), "job").await, None);
    }
}

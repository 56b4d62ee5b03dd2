//! MOT16 sequence resolution.
//!
//! A sequence is named `MOT16-<NN>` and lives under `<home>/train/` or
//! `<home>/test/`:
//!
//! ```text
//! MOT16-10/
//!   seqinfo.ini     frameRate, seqLength, imDir
//!   gt/gt.txt       ground truth (train split only)
//!   img1/000001.jpg ...
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::detect::GroundTruthSource;
use crate::error::CounterError;
use crate::ingest::{FileConfig, FileSource, VideoSource};

const SPLITS: [&str; 2] = ["train", "test"];
const DEFAULT_IMAGE_DIR: &str = "img1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetId {
    pub dataset: String,
    pub sequence: u32,
}

impl DatasetId {
    /// Parse `<NAME>-<NUMBER>`. Only MOT16 is supported.
    pub fn parse(value: &str) -> Result<Self, CounterError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^([A-Za-z0-9]+)-(\d+)$").expect("dataset id pattern is valid")
        });
        let caps = pattern
            .captures(value.trim())
            .ok_or_else(|| CounterError::UnknownDataset(value.to_string()))?;
        let dataset = caps[1].to_string();
        if dataset != "MOT16" {
            return Err(CounterError::UnknownDataset(value.to_string()));
        }
        let sequence = caps[2]
            .parse()
            .map_err(|_| CounterError::UnknownDataset(value.to_string()))?;
        Ok(Self { dataset, sequence })
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.dataset, self.sequence)
    }
}

/// A resolved sequence on disk.
#[derive(Clone, Debug)]
pub struct Mot16Sequence {
    id: DatasetId,
    root: PathBuf,
    frame_rate: f64,
    seq_length: Option<u64>,
    image_dir: PathBuf,
}

impl Mot16Sequence {
    pub fn resolve(home: &Path, id: &DatasetId) -> Result<Self> {
        let name = id.to_string();
        let root = SPLITS
            .iter()
            .map(|split| home.join(split).join(&name))
            .find(|candidate| candidate.is_dir())
            .ok_or_else(|| {
                CounterError::configuration(format!(
                    "sequence {} not found under {}/{{train,test}}",
                    name,
                    home.display()
                ))
            })?;

        let info_path = root.join("seqinfo.ini");
        let raw = std::fs::read_to_string(&info_path)
            .with_context(|| format!("failed to read {}", info_path.display()))?;
        let info = parse_ini(&raw);

        let frame_rate: f64 = info
            .get("framerate")
            .ok_or_else(|| {
                CounterError::configuration(format!("{} has no frameRate", info_path.display()))
            })?
            .parse()
            .map_err(|_| {
                CounterError::configuration(format!(
                    "{} has an invalid frameRate",
                    info_path.display()
                ))
            })?;
        let seq_length = info.get("seqlength").and_then(|v| v.parse().ok());
        let image_dir = root.join(
            info.get("imdir")
                .map(String::as_str)
                .unwrap_or(DEFAULT_IMAGE_DIR),
        );

        log::info!(
            "resolved {} at {} ({} fps, {} frames)",
            name,
            root.display(),
            frame_rate,
            seq_length.map_or_else(|| "?".to_string(), |n: u64| n.to_string())
        );

        Ok(Self {
            id: id.clone(),
            root,
            frame_rate,
            seq_length,
            image_dir,
        })
    }

    pub fn video_name(&self) -> String {
        self.id.to_string()
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn seq_length(&self) -> Option<u64> {
        self.seq_length
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn ground_truth_path(&self) -> PathBuf {
        self.root.join("gt").join("gt.txt")
    }
}

/// A video opened for a run: frames plus the boxes that seed detect phases.
pub struct ResolvedVideo {
    pub name: String,
    pub frame_rate: f64,
    /// Known length, when the dataset records one.
    pub frame_count: Option<u64>,
    pub source: FileSource,
    pub ground_truth: GroundTruthSource,
}

impl ResolvedVideo {
    /// Open `video`, either a `stub://<name>` synthetic scene or a MOT16
    /// sequence under `dataset_home`.
    pub fn open(dataset_home: Option<&Path>, video: &str) -> Result<Self> {
        if let Some(name) = video.strip_prefix("stub://") {
            let source = FileSource::new(FileConfig {
                path: video.to_string(),
                ..FileConfig::default()
            })?;
            let ground_truth = source.synthetic_ground_truth().ok_or_else(|| {
                CounterError::configuration(format!("{} has no synthetic ground truth", video))
            })?;
            return Ok(Self {
                name: name.to_string(),
                frame_rate: source.frame_rate(),
                frame_count: None,
                source,
                ground_truth,
            });
        }

        let home = dataset_home.ok_or_else(|| {
            CounterError::configuration(format!("{} needs a dataset home", video))
        })?;
        let id = DatasetId::parse(video)?;
        let sequence = Mot16Sequence::resolve(home, &id)?;
        let gt_path = sequence.ground_truth_path();
        if !gt_path.is_file() {
            return Err(CounterError::configuration(format!(
                "{} has no ground truth at {}",
                sequence.video_name(),
                gt_path.display()
            ))
            .into());
        }
        let ground_truth = GroundTruthSource::from_path(&gt_path)?;
        let source = FileSource::new(FileConfig {
            path: sequence.image_dir().display().to_string(),
            frame_rate: sequence.frame_rate(),
        })?;
        Ok(Self {
            name: sequence.video_name(),
            frame_rate: sequence.frame_rate(),
            frame_count: sequence.seq_length(),
            source,
            ground_truth,
        })
    }
}

/// Flat `key=value` reader; section headers are ignored, keys lowercased.
fn parse_ini(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('[') && !line.starts_with(';'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQINFO: &str = "[Sequence]\nname=MOT16-10\nimDir=img1\nframeRate=30\nseqLength=654\nimWidth=1920\n";

    #[test]
    fn parses_supported_identifiers() {
        let id = DatasetId::parse("MOT16-10").unwrap();
        assert_eq!(id.sequence, 10);
        assert_eq!(id.to_string(), "MOT16-10");
        assert_eq!(DatasetId::parse("MOT16-2").unwrap().to_string(), "MOT16-02");
    }

    #[test]
    fn rejects_unknown_datasets() {
        for value in ["KITTI-01", "MOT16", "MOT16-x", "", "MOT17-04"] {
            let err = DatasetId::parse(value).unwrap_err();
            assert!(err.is_configuration(), "{value}");
        }
    }

    #[test]
    fn resolves_train_split_and_reads_seqinfo() -> Result<()> {
        let home = tempfile::tempdir()?;
        let seq = home.path().join("train").join("MOT16-10");
        std::fs::create_dir_all(seq.join("gt"))?;
        std::fs::write(seq.join("seqinfo.ini"), SEQINFO)?;

        let resolved = Mot16Sequence::resolve(home.path(), &DatasetId::parse("MOT16-10")?)?;
        assert_eq!(resolved.frame_rate(), 30.0);
        assert_eq!(resolved.seq_length(), Some(654));
        assert_eq!(resolved.image_dir(), seq.join("img1"));
        assert_eq!(resolved.ground_truth_path(), seq.join("gt").join("gt.txt"));
        assert_eq!(resolved.video_name(), "MOT16-10");
        Ok(())
    }

    #[test]
    fn missing_sequence_is_a_configuration_error() -> Result<()> {
        let home = tempfile::tempdir()?;
        let err = Mot16Sequence::resolve(home.path(), &DatasetId::parse("MOT16-04")?).unwrap_err();
        let typed = err.downcast_ref::<CounterError>().expect("typed error");
        assert!(typed.is_configuration());
        Ok(())
    }

    #[test]
    fn opens_synthetic_video_without_dataset_home() -> Result<()> {
        let video = ResolvedVideo::open(None, "stub://walkers")?;
        assert_eq!(video.name, "walkers");
        assert_eq!(video.frame_rate, 30.0);
        assert!(video.ground_truth.box_count() > 0);
        Ok(())
    }

    #[test]
    fn dataset_video_requires_home_and_ground_truth() -> Result<()> {
        let err = ResolvedVideo::open(None, "MOT16-10").err().expect("missing home");
        assert!(err
            .downcast_ref::<CounterError>()
            .is_some_and(CounterError::is_configuration));

        let home = tempfile::tempdir()?;
        let seq = home.path().join("test").join("MOT16-10");
        std::fs::create_dir_all(seq.join("img1"))?;
        std::fs::write(seq.join("seqinfo.ini"), SEQINFO)?;
        let err = ResolvedVideo::open(Some(home.path()), "MOT16-10")
            .err()
            .expect("test split has no gt");
        assert!(err.to_string().contains("no ground truth"));
        Ok(())
    }
}

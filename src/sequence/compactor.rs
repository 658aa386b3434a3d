use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{Result, SequenceError};
use crate::sequence::token::FrameToken;

/// A contiguous run of frames with a constant step.
///
/// Invariant: `start <= end` and `step >= 1`. A single frame is
/// `start == end, step == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    pub start: u64,
    pub end: u64,
    pub step: u64,
}

impl SequenceRange {
    pub fn single(frame: u64) -> Self {
        Self {
            start: frame,
            end: frame,
            step: 1,
        }
    }

    /// Number of frames covered by this range.
    pub fn len(&self) -> u64 {
        (self.end - self.start) / self.step + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the frames in this range, ascending.
    pub fn frames(&self) -> impl Iterator<Item = u64> {
        (self.start..=self.end).step_by(self.step as usize)
    }
}

impl fmt::Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else if self.step == 1 {
            write!(f, "{}-{}", self.start, self.end)
        } else {
            write!(f, "{}-{}x{}", self.start, self.end, self.step)
        }
    }
}

/// One frame sequence found in a directory scan.
///
/// Immutable once constructed; rebuilt from a fresh scan rather than patched
/// in place. `padding` is the zero-padded digit width shared by the group, or
/// 0 for an unpadded sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDescriptor {
    pub base: String,
    pub ext: String,
    pub padding: usize,
    pub ranges: Vec<SequenceRange>,
    pub missing: u64,
}

impl SequenceDescriptor {
    /// Expand back to the full set of frame numbers, ascending.
    pub fn frames(&self) -> impl Iterator<Item = u64> + '_ {
        self.ranges.iter().flat_map(|r| r.frames())
    }

    /// Total number of frames present on disk.
    pub fn frame_count(&self) -> u64 {
        self.ranges.iter().map(|r| r.len()).sum()
    }

    /// The file name of one frame of this sequence.
    pub fn file_name(&self, frame: u64) -> String {
        FrameToken {
            base: self.base.clone(),
            frame: Some(frame),
            padding: self.padding,
            ext: self.ext.clone(),
        }
        .file_name()
    }

    /// Compact range notation, e.g. `1-3,5-6,8` or `1-7x2`.
    pub fn frame_range(&self) -> String {
        self.ranges
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Padding token in `#`/`@` notation: one `#` per four digits when the
    /// width is a multiple of four, otherwise one `@` per digit. Unpadded
    /// sequences use a single `@`.
    pub fn pad_token(&self) -> String {
        if self.padding == 0 {
            "@".to_string()
        } else if self.padding % 4 == 0 {
            "#".repeat(self.padding / 4)
        } else {
            "@".repeat(self.padding)
        }
    }
}

impl fmt::Display for SequenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}.{}",
            self.base,
            self.frame_range(),
            self.pad_token(),
            self.ext
        )
    }
}

/// Fold an unordered collection of file names into sequence descriptors.
///
/// Names tokenize via [`FrameToken::parse`]; non-sequence files (no frame
/// number) are ignored. Groups form on (base, extension, padding class), so
/// `0005.exr` and `00005.exr` land in distinct groups rather than colliding.
/// The same frame appearing twice within one group is a
/// [`SequenceError::DuplicateFrame`]. Output is ordered lexicographically by
/// (base, extension) for deterministic results.
pub fn compact<I, S>(names: I) -> Result<Vec<SequenceDescriptor>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<(String, String, usize), Vec<u64>> = BTreeMap::new();

    for name in names {
        let name = name.as_ref();
        let token = FrameToken::parse(name)?;
        let Some(frame) = token.frame else {
            debug!("Skipping non-sequence file: {}", name);
            continue;
        };
        let class = token.padding_class();
        groups
            .entry((token.base, token.ext, class))
            .or_default()
            .push(frame);
    }

    let mut descriptors = Vec::with_capacity(groups.len());
    for ((base, ext, padding), mut frames) in groups {
        frames.sort_unstable();
        if let Some(dup) = frames.windows(2).find(|w| w[0] == w[1]) {
            return Err(SequenceError::DuplicateFrame {
                base,
                ext,
                frame: dup[0],
            }
            .into());
        }

        let ranges = fold_ranges(&frames);
        let missing = count_missing(&ranges);
        descriptors.push(SequenceDescriptor {
            base,
            ext,
            padding,
            ranges,
            missing,
        });
    }

    Ok(descriptors)
}

/// Split sorted, deduplicated frames into maximal constant-step runs.
///
/// Runs grow greedily from the left: each run adopts the step between its
/// first two frames and extends while consecutive differences match. A
/// leftover single frame becomes a one-frame range with step 1.
fn fold_ranges(frames: &[u64]) -> Vec<SequenceRange> {
    let mut ranges = Vec::new();
    let mut i = 0;

    while i < frames.len() {
        if i + 1 == frames.len() {
            ranges.push(SequenceRange::single(frames[i]));
            break;
        }

        let step = frames[i + 1] - frames[i];
        let mut j = i + 1;
        while j + 1 < frames.len() && frames[j + 1] - frames[j] == step {
            j += 1;
        }

        ranges.push(SequenceRange {
            start: frames[i],
            end: frames[j],
            step,
        });
        i = j + 1;
    }

    ranges
}

/// Frames absent in the holes between consecutive step-1 ranges. Stepped
/// ranges are intentional, not gapped, so they contribute nothing and break
/// the envelope.
fn count_missing(ranges: &[SequenceRange]) -> u64 {
    ranges
        .windows(2)
        .filter(|w| w[0].step == 1 && w[1].step == 1)
        .map(|w| w[1].start - w[0].end - 1)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(base: &str, frames: &[u64], padding: usize, ext: &str) -> Vec<String> {
        frames
            .iter()
            .map(|f| format!("{}{:0width$}.{}", base, f, ext, width = padding))
            .collect()
    }

    #[test]
    fn test_gapped_sequence_splits_into_ranges() {
        let descriptors = compact(names("bg.", &[1, 2, 3, 5, 6, 8], 4, "exr")).unwrap();
        assert_eq!(descriptors.len(), 1);

        let d = &descriptors[0];
        assert_eq!(
            d.ranges,
            vec![
                SequenceRange { start: 1, end: 3, step: 1 },
                SequenceRange { start: 5, end: 6, step: 1 },
                SequenceRange::single(8),
            ]
        );
        assert_eq!(d.missing, 2);
        assert_eq!(d.frame_range(), "1-3,5-6,8");
    }

    #[test]
    fn test_arithmetic_sequence_is_one_stepped_range() {
        let descriptors = compact(names("a.", &[1, 3, 5, 7], 4, "exr")).unwrap();
        let d = &descriptors[0];
        assert_eq!(
            d.ranges,
            vec![SequenceRange { start: 1, end: 7, step: 2 }]
        );
        assert_eq!(d.missing, 0);
        assert_eq!(d.frame_range(), "1-7x2");
    }

    #[test]
    fn test_round_trip_reproduces_frame_set() {
        let input = [1u64, 2, 3, 5, 6, 8, 10, 12, 14, 100];
        let descriptors = compact(names("x.", &input, 5, "dpx")).unwrap();
        let expanded: Vec<u64> = descriptors[0].frames().collect();
        assert_eq!(expanded, input);
    }

    #[test]
    fn test_duplicate_frame_is_an_error() {
        let result = compact(["a.0001.exr", "a.0002.exr", "a.0001.exr"]);
        assert!(matches!(
            result,
            Err(crate::PipelineError::Sequence(
                SequenceError::DuplicateFrame { frame: 1, .. }
            ))
        ));
    }

    #[test]
    fn test_different_padding_is_two_groups_not_a_conflict() {
        let descriptors = compact(["a.0005.exr", "a.00005.exr"]).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].padding, 4);
        assert_eq!(descriptors[1].padding, 5);
    }

    #[test]
    fn test_groups_order_lexicographically() {
        let descriptors =
            compact(["b.0001.exr", "a.0001.exr", "a.0001.png", "c.0001.exr"]).unwrap();
        let keys: Vec<(&str, &str)> = descriptors
            .iter()
            .map(|d| (d.base.as_str(), d.ext.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("a.", "exr"), ("a.", "png"), ("b.", "exr"), ("c.", "exr")]
        );
    }

    #[test]
    fn test_non_sequence_files_are_skipped() {
        let descriptors = compact(["notes.txt", "a.0001.exr", "a.0002.exr"]).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].frame_count(), 2);
    }

    #[test]
    fn test_unpadded_sequence_survives_width_change() {
        // 8..12 crosses a digit-width boundary; unpadded grouping keeps it whole.
        let descriptors =
            compact(["f.8.exr", "f.9.exr", "f.10.exr", "f.11.exr", "f.12.exr"]).unwrap();
        assert_eq!(descriptors.len(), 1);
        let d = &descriptors[0];
        assert_eq!(d.padding, 0);
        assert_eq!(
            d.ranges,
            vec![SequenceRange { start: 8, end: 12, step: 1 }]
        );
    }

    #[test]
    fn test_single_frame_descriptor() {
        let descriptors = compact(["a.0042.exr"]).unwrap();
        let d = &descriptors[0];
        assert_eq!(d.ranges, vec![SequenceRange::single(42)]);
        assert_eq!(d.missing, 0);
        assert_eq!(d.file_name(42), "a.0042.exr");
    }

    #[test]
    fn test_display_uses_pad_tokens() {
        let descriptors = compact(names("bg.", &[1, 2, 3], 4, "exr")).unwrap();
        assert_eq!(descriptors[0].to_string(), "bg.1-3#.exr");

        let descriptors = compact(names("bg.", &[1, 2, 3], 5, "exr")).unwrap();
        assert_eq!(descriptors[0].to_string(), "bg.1-3@@@@@.exr");
    }

    #[test]
    fn test_mixed_steps_split_into_constant_runs() {
        let descriptors = compact(names("m.", &[1, 2, 4, 6], 4, "exr")).unwrap();
        assert_eq!(
            descriptors[0].ranges,
            vec![
                SequenceRange { start: 1, end: 2, step: 1 },
                SequenceRange { start: 4, end: 6, step: 2 },
            ]
        );
        assert_eq!(descriptors[0].missing, 0);
    }
}

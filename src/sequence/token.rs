use crate::error::{Result, SequenceError};

/// A file name split into its sequence components.
///
/// `base` keeps everything up to (and including) any separator before the
/// frame digits, so `bg.0005.exr` tokenizes to base `bg.`, frame `5`,
/// padding `4`, extension `exr`. Padding is the literal digit count observed
/// in the name, which lets [`FrameToken::file_name`] reproduce zero-padding
/// verbatim on round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameToken {
    pub base: String,
    pub frame: Option<u64>,
    pub padding: usize,
    pub ext: String,
}

impl FrameToken {
    /// Tokenize a file name into (base, frame, padding, extension).
    ///
    /// Only the digit run immediately adjacent to the extension separator is
    /// treated as the frame number; digits embedded elsewhere in the name
    /// stay part of the base (`shot01_diffuse.0010.exr` keeps `shot01_` in
    /// its base). A name without any trailing digit run is a valid
    /// non-sequence file with `frame: None`. A name without an extension
    /// separator fails with [`SequenceError::MalformedName`].
    pub fn parse(name: &str) -> Result<Self> {
        let dot = name.rfind('.').ok_or_else(|| SequenceError::MalformedName {
            name: name.to_string(),
        })?;

        let (stem, ext) = (&name[..dot], &name[dot + 1..]);

        // Trailing digit run of the stem, if any.
        let digits_start = stem
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i);

        match digits_start {
            Some(start) if !stem[start..].is_empty() => {
                let digits = &stem[start..];
                // 20 digits overflow u64; treat absurd runs as plain base text.
                let Ok(frame) = digits.parse::<u64>() else {
                    return Ok(Self {
                        base: stem.to_string(),
                        frame: None,
                        padding: 0,
                        ext: ext.to_string(),
                    });
                };
                Ok(Self {
                    base: stem[..start].to_string(),
                    frame: Some(frame),
                    padding: digits.len(),
                    ext: ext.to_string(),
                })
            }
            _ => Ok(Self {
                base: stem.to_string(),
                frame: None,
                padding: 0,
                ext: ext.to_string(),
            }),
        }
    }

    /// Reconstruct the file name, preserving the observed zero-padding.
    pub fn file_name(&self) -> String {
        match self.frame {
            Some(frame) => format!(
                "{}{:0width$}.{}",
                self.base,
                frame,
                self.ext,
                width = self.padding
            ),
            None => format!("{}.{}", self.base, self.ext),
        }
    }

    /// Whether the literal digits pin the padding width.
    ///
    /// `0005` can only belong to a width-4 sequence; `1234` could belong to
    /// any sequence of width <= 4 and is treated as unpadded for grouping.
    pub fn is_zero_padded(&self) -> bool {
        match self.frame {
            Some(frame) => self.padding > frame.to_string().len(),
            None => false,
        }
    }

    /// Grouping width: the literal width when zero-padding pins it, 0 for
    /// unpadded literals.
    pub fn padding_class(&self) -> usize {
        if self.is_zero_padded() {
            self.padding
        } else {
            0
        }
    }
}

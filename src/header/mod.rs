//! Image-container header reading.
//!
//! Extracts structural metadata (resolution, channel list, compression,
//! color space) from the header of an OpenEXR-style container without
//! decoding any pixel data. The layout is: 4 magic bytes, a little-endian
//! i32 version word, then attribute records of the form
//! `name\0 type\0 size:i32 value[size]` terminated by a single null byte.
//! Every attribute advertises its byte length, so unknown attribute kinds
//! are skipped rather than breaking the parse.

use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{HeaderError, Result};

/// Magic signature of the container format.
pub const MAGIC: [u8; 4] = [0x76, 0x2f, 0x31, 0x01];

/// Supported format version (low byte of the version word).
const SUPPORTED_VERSION: i32 = 2;

/// Hard cap on header size; anything past this is treated as corrupt rather
/// than read.
const MAX_HEADER_BYTES: usize = 1 << 20;

/// Longest allowed attribute/channel name, per the format.
const MAX_NAME_LEN: usize = 255;

/// Per-channel pixel storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    UInt,
    Half,
    Float,
}

impl PixelType {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::UInt),
            1 => Some(Self::Half),
            2 => Some(Self::Float),
            _ => None,
        }
    }
}

/// One entry of the header's channel list, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub data_type: PixelType,
}

/// Scanline/tile compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Rle,
    Zips,
    Zip,
    Piz,
    Pxr24,
    B44,
    B44a,
    Dwaa,
    Dwab,
}

impl Compression {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Rle),
            2 => Some(Self::Zips),
            3 => Some(Self::Zip),
            4 => Some(Self::Piz),
            5 => Some(Self::Pxr24),
            6 => Some(Self::B44),
            7 => Some(Self::B44a),
            8 => Some(Self::Dwaa),
            9 => Some(Self::Dwab),
            _ => None,
        }
    }
}

/// Structural metadata of an image container, read from its header only.
///
/// Never partially populated: parsing either produces all mandatory fields
/// or fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub width: u32,
    pub height: u32,
    pub channels: Vec<ChannelInfo>,
    pub compression: Compression,
    pub color_space: Option<String>,
}

/// Read and parse the header of the container file at `path`.
///
/// The magic signature is validated before anything else is read; a file
/// that fails the check is rejected with [`HeaderError::InvalidSignature`]
/// without touching the rest of its bytes. At most [`MAX_HEADER_BYTES`] are
/// read from disk regardless of file size.
pub fn read_container_header<P: AsRef<Path>>(path: P) -> Result<ContainerHeader> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path)?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || magic != MAGIC {
        return Err(HeaderError::InvalidSignature {
            path: path.display().to_string(),
        }
        .into());
    }

    let mut buf = Vec::new();
    file.take(MAX_HEADER_BYTES as u64).read_to_end(&mut buf)?;
    debug!("Read {} header byte(s) from {:?}", buf.len(), path);

    let header = parse_header(&buf)?;
    info!(
        "Parsed header {:?}: {}x{}, {} channel(s), {:?}",
        path,
        header.width,
        header.height,
        header.channels.len(),
        header.compression
    );
    Ok(header)
}

/// Parse the post-magic header bytes: version word plus attribute list.
fn parse_header(buf: &[u8]) -> Result<ContainerHeader> {
    let mut cursor = Cursor::new(buf);

    let version = cursor.i32_le("version word")? & 0xff;
    if version != SUPPORTED_VERSION {
        return Err(HeaderError::UnsupportedVersion { version }.into());
    }

    let mut dimensions: Option<(u32, u32)> = None;
    let mut channels: Option<Vec<ChannelInfo>> = None;
    let mut compression: Option<Compression> = None;
    let mut color_space: Option<String> = None;

    loop {
        let name = cursor.cstring("attribute name")?;
        if name.is_empty() {
            // Lone null: end of the attribute list.
            break;
        }

        let attr_type = cursor.cstring("attribute type")?;
        let size = cursor.i32_le("attribute size")?;
        if size < 0 {
            return Err(HeaderError::MalformedAttribute {
                attribute: name,
                reason: format!("negative size {}", size),
            }
            .into());
        }
        let value = cursor.bytes(size as usize, &name)?;

        match (name.as_str(), attr_type.as_str()) {
            ("dataWindow", "box2i") => dimensions = Some(parse_data_window(value)?),
            ("channels", "chlist") => channels = Some(parse_channel_list(value)?),
            ("compression", "compression") => {
                let code = *value.first().ok_or_else(|| HeaderError::MalformedAttribute {
                    attribute: name.clone(),
                    reason: "empty value".to_string(),
                })?;
                compression =
                    Some(
                        Compression::from_code(code).ok_or(HeaderError::MalformedAttribute {
                            attribute: name,
                            reason: format!("unknown compression code {}", code),
                        })?,
                    );
            }
            ("colorSpace", "string") => {
                color_space = Some(String::from_utf8_lossy(value).into_owned());
            }
            _ => {
                // Forward compatibility: skip via the advertised length.
                debug!(
                    "Skipping attribute '{}' of type '{}' ({} byte(s))",
                    name, attr_type, size
                );
            }
        }
    }

    let (width, height) = dimensions.ok_or(HeaderError::IncompleteHeader {
        attribute: "dataWindow".to_string(),
    })?;
    let channels = channels.ok_or(HeaderError::IncompleteHeader {
        attribute: "channels".to_string(),
    })?;
    let compression = compression.ok_or(HeaderError::IncompleteHeader {
        attribute: "compression".to_string(),
    })?;

    Ok(ContainerHeader {
        width,
        height,
        channels,
        compression,
        color_space,
    })
}

/// box2i value: xmin, ymin, xmax, ymax as little-endian i32s.
fn parse_data_window(value: &[u8]) -> Result<(u32, u32)> {
    let mut cursor = Cursor::new(value);
    let x_min = cursor.i32_le("dataWindow")?;
    let y_min = cursor.i32_le("dataWindow")?;
    let x_max = cursor.i32_le("dataWindow")?;
    let y_max = cursor.i32_le("dataWindow")?;

    if x_max < x_min || y_max < y_min {
        return Err(HeaderError::MalformedAttribute {
            attribute: "dataWindow".to_string(),
            reason: format!("inverted window ({x_min},{y_min})-({x_max},{y_max})"),
        }
        .into());
    }

    // Widen before arithmetic: corrupt bounds like i32::MIN..0 would
    // overflow i32 and must reject, not panic.
    let width = i64::from(x_max) - i64::from(x_min) + 1;
    let height = i64::from(y_max) - i64::from(y_min) + 1;
    if width > i64::from(u32::MAX) || height > i64::from(u32::MAX) {
        return Err(HeaderError::MalformedAttribute {
            attribute: "dataWindow".to_string(),
            reason: format!("window extent {}x{} out of range", width, height),
        }
        .into());
    }

    Ok((width as u32, height as u32))
}

/// chlist value: repeated `name\0 pixel_type:i32 p_linear:u8 reserved[3]
/// x_sampling:i32 y_sampling:i32`, terminated by a null byte.
fn parse_channel_list(value: &[u8]) -> Result<Vec<ChannelInfo>> {
    let mut cursor = Cursor::new(value);
    let mut channels = Vec::new();

    loop {
        let name = cursor.cstring("channel name")?;
        if name.is_empty() {
            break;
        }

        let type_code = cursor.i32_le("channel pixel type")?;
        let data_type =
            PixelType::from_code(type_code).ok_or_else(|| HeaderError::MalformedAttribute {
                attribute: "channels".to_string(),
                reason: format!("unknown pixel type {} for '{}'", type_code, name),
            })?;

        // p_linear + reserved + sampling factors; structural reads only.
        cursor.bytes(4, "channel flags")?;
        cursor.i32_le("channel x sampling")?;
        cursor.i32_le("channel y sampling")?;

        channels.push(ChannelInfo { name, data_type });
    }

    if channels.is_empty() {
        return Err(HeaderError::MalformedAttribute {
            attribute: "channels".to_string(),
            reason: "empty channel list".to_string(),
        }
        .into());
    }

    Ok(channels)
}

/// Bounded reader over the in-memory header bytes.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, n: usize, what: &str) -> std::result::Result<&'a [u8], HeaderError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.out_of_bytes(what)),
        }
    }

    fn i32_le(&mut self, what: &str) -> std::result::Result<i32, HeaderError> {
        let raw = self.bytes(4, what)?;
        Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Null-terminated string, at most [`MAX_NAME_LEN`] bytes before the null.
    fn cstring(&mut self, what: &str) -> std::result::Result<String, HeaderError> {
        let remaining = &self.buf[self.pos..];
        let limit = remaining.len().min(MAX_NAME_LEN + 1);
        match remaining[..limit].iter().position(|&b| b == 0) {
            Some(null_at) => {
                let s = String::from_utf8_lossy(&remaining[..null_at]).into_owned();
                self.pos += null_at + 1;
                Ok(s)
            }
            None if remaining.len() > MAX_NAME_LEN => Err(HeaderError::MalformedAttribute {
                attribute: what.to_string(),
                reason: format!("name exceeds {} bytes", MAX_NAME_LEN),
            }),
            None => Err(self.out_of_bytes(what)),
        }
    }

    fn out_of_bytes(&self, what: &str) -> HeaderError {
        if self.buf.len() >= MAX_HEADER_BYTES {
            HeaderError::HeaderTooLarge {
                limit: MAX_HEADER_BYTES,
            }
        } else {
            HeaderError::Truncated {
                what: what.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// Builds header byte streams for tests, magic + version included.
    struct HeaderBuilder {
        bytes: Vec<u8>,
    }

    impl HeaderBuilder {
        fn new() -> Self {
            let mut bytes = MAGIC.to_vec();
            bytes.extend_from_slice(&2i32.to_le_bytes());
            Self { bytes }
        }

        fn attribute(mut self, name: &str, attr_type: &str, value: &[u8]) -> Self {
            self.bytes.extend_from_slice(name.as_bytes());
            self.bytes.push(0);
            self.bytes.extend_from_slice(attr_type.as_bytes());
            self.bytes.push(0);
            self.bytes.extend_from_slice(&(value.len() as i32).to_le_bytes());
            self.bytes.extend_from_slice(value);
            self
        }

        fn data_window(self, width: i32, height: i32) -> Self {
            let mut v = Vec::new();
            for n in [0, 0, width - 1, height - 1] {
                v.extend_from_slice(&n.to_le_bytes());
            }
            self.attribute("dataWindow", "box2i", &v)
        }

        fn channels(self, names: &[&str]) -> Self {
            let mut v = Vec::new();
            for name in names {
                v.extend_from_slice(name.as_bytes());
                v.push(0);
                v.extend_from_slice(&1i32.to_le_bytes()); // half
                v.extend_from_slice(&[0, 0, 0, 0]);
                v.extend_from_slice(&1i32.to_le_bytes());
                v.extend_from_slice(&1i32.to_le_bytes());
            }
            v.push(0);
            self.attribute("channels", "chlist", &v)
        }

        fn compression(self, code: u8) -> Self {
            self.attribute("compression", "compression", &[code])
        }

        fn write(mut self, dir: &std::path::Path, name: &str) -> PathBuf {
            self.bytes.push(0); // attribute list terminator
            let path = dir.join(name);
            std::fs::write(&path, &self.bytes).unwrap();
            path
        }

        fn write_unterminated(self, dir: &std::path::Path, name: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, &self.bytes).unwrap();
            path
        }
    }

    #[test]
    fn test_parse_complete_header() {
        let tmp = tempdir().unwrap();
        let path = HeaderBuilder::new()
            .data_window(1920, 1080)
            .channels(&["A", "B", "G", "R"])
            .compression(3)
            .attribute("colorSpace", "string", b"ACEScg")
            .write(tmp.path(), "frame.exr");

        let header = read_container_header(&path).unwrap();
        assert_eq!(header.width, 1920);
        assert_eq!(header.height, 1080);
        assert_eq!(header.compression, Compression::Zip);
        assert_eq!(header.color_space.as_deref(), Some("ACEScg"));
        let names: Vec<&str> = header.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "G", "R"]);
        assert!(header.channels.iter().all(|c| c.data_type == PixelType::Half));
    }

    #[test]
    fn test_invalid_signature_fails_fast() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("bogus.exr");
        std::fs::write(&path, b"not an image container at all").unwrap();

        let result = read_container_header(&path);
        assert!(matches!(
            result,
            Err(crate::PipelineError::Header(
                HeaderError::InvalidSignature { .. }
            ))
        ));
    }

    #[test]
    fn test_truncated_magic_is_invalid_signature() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("short.exr");
        std::fs::write(&path, &MAGIC[..2]).unwrap();

        let result = read_container_header(&path);
        assert!(matches!(
            result,
            Err(crate::PipelineError::Header(
                HeaderError::InvalidSignature { .. }
            ))
        ));
    }

    #[test]
    fn test_missing_channels_is_incomplete() {
        let tmp = tempdir().unwrap();
        let path = HeaderBuilder::new()
            .data_window(64, 64)
            .compression(0)
            .write(tmp.path(), "no_channels.exr");

        let result = read_container_header(&path);
        assert!(matches!(
            result,
            Err(crate::PipelineError::Header(HeaderError::IncompleteHeader { attribute }))
                if attribute == "channels"
        ));
    }

    #[test]
    fn test_unknown_attributes_are_skipped() {
        let tmp = tempdir().unwrap();
        let path = HeaderBuilder::new()
            .attribute("pixelAspectRatio", "float", &1.0f32.to_le_bytes())
            .attribute("owner", "string", b"lighting")
            .data_window(320, 240)
            .channels(&["R"])
            .compression(0)
            .write(tmp.path(), "extras.exr");

        let header = read_container_header(&path).unwrap();
        assert_eq!((header.width, header.height), (320, 240));
        assert_eq!(header.compression, Compression::None);
        assert_eq!(header.color_space, None);
    }

    #[test]
    fn test_truncated_attribute_list() {
        let tmp = tempdir().unwrap();
        let path = HeaderBuilder::new()
            .data_window(64, 64)
            .write_unterminated(tmp.path(), "cut.exr");

        let result = read_container_header(&path);
        assert!(matches!(
            result,
            Err(crate::PipelineError::Header(HeaderError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_extreme_data_window_does_not_panic() {
        let tmp = tempdir().unwrap();

        // Full i32 range: extent 2^32 cannot be a u32 dimension.
        let mut bounds = Vec::new();
        for n in [i32::MIN, 0, i32::MAX, 0] {
            bounds.extend_from_slice(&n.to_le_bytes());
        }
        let path = HeaderBuilder::new()
            .attribute("dataWindow", "box2i", &bounds)
            .channels(&["R"])
            .compression(0)
            .write(tmp.path(), "hostile.exr");

        let result = read_container_header(&path);
        assert!(matches!(
            result,
            Err(crate::PipelineError::Header(
                HeaderError::MalformedAttribute { .. }
            ))
        ));

        // Half the range still fits a u32 after widening; it must parse
        // rather than overflow in the subtraction.
        let mut bounds = Vec::new();
        for n in [i32::MIN, 0, 0, 0] {
            bounds.extend_from_slice(&n.to_le_bytes());
        }
        let path = HeaderBuilder::new()
            .attribute("dataWindow", "box2i", &bounds)
            .channels(&["R"])
            .compression(0)
            .write(tmp.path(), "wide.exr");

        let header = read_container_header(&path).unwrap();
        assert_eq!(header.width, 2_147_483_649);
        assert_eq!(header.height, 1);
    }

    #[test]
    fn test_unknown_compression_code() {
        let tmp = tempdir().unwrap();
        let path = HeaderBuilder::new()
            .data_window(64, 64)
            .channels(&["R"])
            .compression(99)
            .write(tmp.path(), "weird.exr");

        let result = read_container_header(&path);
        assert!(matches!(
            result,
            Err(crate::PipelineError::Header(
                HeaderError::MalformedAttribute { .. }
            ))
        ));
    }
}

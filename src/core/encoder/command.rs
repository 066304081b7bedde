//! Encoder backend driving ImageMagick and cwebp.

use super::process::run_with_timeout;
use super::{EncodeRequest, ImageBackend, ImageInfo, ThumbnailRequest};
use crate::core::variants::OutputFormat;
use crate::error::{EncodeError, IntrospectError};
use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// Ceiling for an `identify` fallback call
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Executables used by [`CommandBackend`]
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub magick: PathBuf,
    pub cwebp: PathBuf,
    pub identify: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            magick: PathBuf::from("magick"),
            cwebp: PathBuf::from("cwebp"),
            identify: PathBuf::from("identify"),
        }
    }
}

/// Production backend: header probing in-process, encoding through external tools
#[derive(Debug, Clone, Default)]
pub struct CommandBackend {
    tools: ToolPaths,
}

impl CommandBackend {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    /// Read the header with the `image` crate; no pixel decoding
    fn probe_header(path: &Path) -> Result<ImageInfo, IntrospectError> {
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|source| IntrospectError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let format = reader.format();
        let decoder = reader
            .into_decoder()
            .map_err(|e| IntrospectError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let (width, height) = decoder.dimensions();
        if width == 0 || height == 0 {
            return Err(IntrospectError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        Ok(ImageInfo {
            width,
            height,
            format: format.map(format_name).unwrap_or_else(|| "UNKNOWN".to_string()),
            colorspace: colorspace_name(decoder.color_type()).to_string(),
        })
    }

    /// Ask ImageMagick for formats the `image` crate can't parse
    fn identify(&self, path: &Path) -> Result<ImageInfo, IntrospectError> {
        let mut command = Command::new(&self.tools.identify);
        command
            .args(["-format", "%w %h %m %[colorspace]\n"])
            .arg(path);

        let output = run_with_timeout(command, &tool_name(&self.tools.identify), IDENTIFY_TIMEOUT)
            .map_err(|e| IntrospectError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        parse_identify(&output.stdout).ok_or_else(|| IntrospectError::Unreadable {
            path: path.to_path_buf(),
            reason: format!("unexpected identify output: {:?}", output.stdout.trim()),
        })
    }

    fn encode_command(&self, request: &EncodeRequest) -> (Command, String) {
        let quality = request.quality.to_string();
        match request.key.format {
            OutputFormat::Webp => {
                let mut command = Command::new(&self.tools.cwebp);
                command
                    .args(["-q", &quality])
                    .args(["-resize", &request.width.to_string(), "0"])
                    .args(["-metadata", "none"])
                    .args(["-method", "6"])
                    .arg(&request.source)
                    .arg("-o")
                    .arg(&request.target);
                (command, tool_name(&self.tools.cwebp))
            }
            OutputFormat::Avif | OutputFormat::Jpeg => {
                let mut command = Command::new(&self.tools.magick);
                command
                    .arg(&request.source)
                    .args(["-resize", &format!("{}x", request.width)])
                    .args(["-quality", &quality])
                    .arg("-strip");
                if request.key.format == OutputFormat::Jpeg {
                    command.args(["-interlace", "Plane"]);
                }
                command.arg(&request.target);
                (command, tool_name(&self.tools.magick))
            }
        }
    }
}

impl ImageBackend for CommandBackend {
    fn introspect(&self, path: &Path) -> Result<ImageInfo, IntrospectError> {
        match Self::probe_header(path) {
            Ok(info) => Ok(info),
            Err(IntrospectError::Unreadable { reason, .. }) => {
                debug!(
                    "Header probe failed for {} ({}), trying identify",
                    path.display(),
                    reason
                );
                self.identify(path)
            }
            Err(e) => Err(e),
        }
    }

    fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
        let (command, tool) = self.encode_command(request);
        run_with_timeout(command, &tool, request.timeout).map(|_| ())
    }

    fn thumbnail(&self, request: &ThumbnailRequest) -> Result<(), EncodeError> {
        let geometry = format!("{}x{}", request.width, request.height);
        let mut command = Command::new(&self.tools.magick);
        command
            .arg(&request.source)
            .args(["-resize", &format!("{}^", geometry)])
            .args(["-gravity", "center"])
            .args(["-crop", &format!("{}+0+0", geometry)])
            .arg("+repage")
            .args(["-quality", &request.quality.to_string()])
            .arg("-strip")
            .arg(&request.target);

        run_with_timeout(command, &tool_name(&self.tools.magick), request.timeout).map(|_| ())
    }
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format names in ImageMagick's `%m` style
fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Avif => "AVIF".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

fn colorspace_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => "Gray",
        _ => "sRGB",
    }
}

/// Parse `"<w> <h> <format> <colorspace>"`; multi-frame files print one line per frame
fn parse_identify(stdout: &str) -> Option<ImageInfo> {
    let line = stdout.lines().find(|l| !l.trim().is_empty())?;
    let mut parts = line.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    let format = parts.next()?.to_string();
    let colorspace = parts.next().unwrap_or("sRGB").to_string();

    if width == 0 || height == 0 {
        return None;
    }

    Some(ImageInfo {
        width,
        height,
        format,
        colorspace,
    })
}

//! Converter backed by LibreOffice and poppler-utils
//!
//! PPTX decks are converted to PDF once per modification time with
//! `libreoffice --headless --convert-to pdf`. Page counts come from
//! `pdfinfo`, single pages are rasterised on demand with `pdftoppm`.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

use tracing::{debug, info};

use super::{DeckFormat, RenderSize, SlideConverter, SlideImage};
use crate::config::RenderConfig;
use crate::error::ConvertError;

/// Tool invocations
#[derive(Debug)]
pub struct OfficeConverter {
    libreoffice: String,
    pdfinfo: String,
    pdftoppm: String,
    work_dir: PathBuf,
    next_raster: AtomicU64,
}

impl OfficeConverter {
    pub fn new(config: &RenderConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            libreoffice: config.libreoffice.clone(),
            pdfinfo: config.pdfinfo.clone(),
            pdftoppm: config.pdftoppm.clone(),
            work_dir: work_dir.into(),
            next_raster: AtomicU64::new(0),
        }
    }

    fn pdf_dir(&self) -> PathBuf {
        self.work_dir.join("pdf")
    }

    fn raster_dir(&self) -> PathBuf {
        self.work_dir.join("pages")
    }

    fn run(&self, tool: &str, args: &[&OsStr]) -> Result<Output, ConvertError> {
        debug!(tool, ?args, "Running converter");
        let output = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ConvertError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConvertError::ToolFailed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// PDF to count and rasterise; PPTX decks are converted first
    fn pdf_for(&self, source: &Path, format: DeckFormat) -> Result<PathBuf, ConvertError> {
        match format {
            DeckFormat::Pdf => Ok(source.to_path_buf()),
            DeckFormat::Pptx => self.convert_pptx(source),
        }
    }

    fn convert_pptx(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConvertError::MissingOutput(source.to_path_buf()))?;
        let modified = fs::metadata(source)?
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        // Keyed by mtime so an edited deck is converted again
        let dir = self.pdf_dir().join(format!("{stem}-{modified}"));
        let pdf = dir.join(format!("{stem}.pdf"));
        if pdf.is_file() {
            return Ok(pdf);
        }

        fs::create_dir_all(&dir)?;
        info!(source = %source.display(), "Converting presentation to PDF");
        self.run(
            &self.libreoffice,
            &[
                OsStr::new("--headless"),
                OsStr::new("--convert-to"),
                OsStr::new("pdf"),
                OsStr::new("--outdir"),
                dir.as_os_str(),
                source.as_os_str(),
            ],
        )?;

        if pdf.is_file() {
            Ok(pdf)
        } else {
            Err(ConvertError::MissingOutput(pdf))
        }
    }
}

/// Extract the `Pages:` field from `pdfinfo` output
pub fn parse_page_count(info: &str) -> Option<usize> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse().ok())
}

impl SlideConverter for OfficeConverter {
    fn page_count(&self, source: &Path, format: DeckFormat) -> Result<usize, ConvertError> {
        let pdf = self.pdf_for(source, format)?;
        let output = self.run(&self.pdfinfo, &[pdf.as_os_str()])?;
        let info = String::from_utf8_lossy(&output.stdout);
        parse_page_count(&info).ok_or_else(|| ConvertError::Malformed {
            tool: self.pdfinfo.clone(),
            detail: "no Pages field".to_string(),
        })
    }

    fn render_page(
        &self,
        source: &Path,
        format: DeckFormat,
        page: usize,
        size: RenderSize,
    ) -> Result<SlideImage, ConvertError> {
        let pdf = self.pdf_for(source, format)?;
        let dir = self.raster_dir();
        fs::create_dir_all(&dir)?;

        let id = self.next_raster.fetch_add(1, Ordering::Relaxed);
        let root = dir.join(format!("page-{id}"));
        let output = root.with_extension("png");

        // pdftoppm pages are one-based
        let number = (page + 1).to_string();
        let width = size.width.to_string();
        self.run(
            &self.pdftoppm,
            &[
                OsStr::new("-png"),
                OsStr::new("-f"),
                OsStr::new(&number),
                OsStr::new("-l"),
                OsStr::new(&number),
                OsStr::new("-singlefile"),
                OsStr::new("-scale-to-x"),
                OsStr::new(&width),
                OsStr::new("-scale-to-y"),
                OsStr::new("-1"),
                pdf.as_os_str(),
                root.as_os_str(),
            ],
        )?;

        let bytes = fs::read(&output).map_err(|_| ConvertError::MissingOutput(output.clone()))?;
        let _ = fs::remove_file(&output);
        super::decode(&bytes)
    }
}

//! PDF page rasterizer
//!
//! Renders each selected page to a JPEG, uploads it for a public URL and
//! embeds that URL, producing one `EmbeddingRecord` per page. A fixed pool of
//! workers pulls page numbers from a shared queue and runs each page end to
//! end; rendering happens inside `spawn_blocking` since it is synchronous CPU
//! work. Each worker re-opens the document from the shared bytes; page
//! handles are never shared across tasks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use mupdf::{Colorspace, Document, Matrix};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::{IngestError, IngestResult};
use super::upload::ImageUploader;
use super::{FileMetadata, FileRegistry, IngestConfig, IngestReport, PageFailure};
use crate::core::types::{truncate_file_name, EmbeddingRecord, MAX_FILE_NAME_CHARS};
use crate::embeddings::Embedder;

/// An uploaded PDF plus its provenance.
#[derive(Debug, Clone)]
pub struct PdfSource {
    /// Original file name (must end in `.pdf`)
    pub file_name: String,
    /// Raw PDF bytes
    pub bytes: Vec<u8>,
    /// Document id carried into every record
    pub file_id: String,
    /// Document URL carried into every record
    pub file_url: String,
}

impl PdfSource {
    /// Create a source with a fresh document id and no URL.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            file_id: Uuid::now_v7().to_string(),
            file_url: String::new(),
        }
    }

    /// Set the document id.
    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = file_id.into();
        self
    }

    /// Set the document URL.
    pub fn with_file_url(mut self, file_url: impl Into<String>) -> Self {
        self.file_url = file_url.into();
        self
    }
}

/// Converts PDFs into embedding records page by page.
pub struct PageRasterizer {
    config: IngestConfig,
    uploader: Arc<dyn ImageUploader>,
    embedder: Arc<dyn Embedder>,
    registry: Arc<dyn FileRegistry>,
}

/// Everything a worker needs to convert one page.
struct PageContext {
    bytes: Arc<Vec<u8>>,
    file_name: String,
    file_id: String,
    file_url: String,
    knowledge_base_id: String,
    dpi: u32,
    jpeg_quality: u8,
    uploader: Arc<dyn ImageUploader>,
    embedder: Arc<dyn Embedder>,
}

impl PageRasterizer {
    /// Create a rasterizer over the given collaborators.
    pub fn new(
        config: IngestConfig,
        uploader: Arc<dyn ImageUploader>,
        embedder: Arc<dyn Embedder>,
        registry: Arc<dyn FileRegistry>,
    ) -> Self {
        Self {
            config,
            uploader,
            embedder,
            registry,
        }
    }

    /// Convert the selected pages of `source` into embedding records.
    ///
    /// `pages` is a 1-based page list; `None` means all pages. Job-level
    /// preconditions (non-PDF input, out-of-range pages, unreadable
    /// document) fail before any page work starts. Per-page failures are
    /// collected in the report and never cancel sibling pages; a job where
    /// every attempted page failed is an error.
    pub async fn convert(
        &self,
        source: PdfSource,
        knowledge_base_id: &str,
        pages: Option<Vec<i32>>,
    ) -> IngestResult<IngestReport> {
        let start = Instant::now();

        if !source.file_name.to_ascii_lowercase().ends_with(".pdf")
            || !source.bytes.starts_with(b"%PDF-")
        {
            return Err(IngestError::InvalidFileType {
                name: source.file_name,
            });
        }

        info!(file = %source.file_name, kb = knowledge_base_id, "starting PDF conversion");

        let bytes = Arc::new(source.bytes);
        let total_pages = {
            let bytes = bytes.clone();
            tokio::task::spawn_blocking(move || page_count(&bytes))
                .await
                .map_err(|e| IngestError::UnreadablePdf {
                    reason: format!("task join error: {e}"),
                })??
        };

        let pages_to_convert = resolve_pages(pages, total_pages)?;
        let attempted = pages_to_convert.len();

        // Document bookkeeping is best-effort; ingesting page images is the
        // primary goal.
        let metadata = FileMetadata {
            file_name: source.file_name.clone(),
            file_size: bytes.len() as u64,
            file_url: source.file_url.clone(),
            file_type: ".pdf".to_string(),
            knowledge_base_id: knowledge_base_id.to_string(),
            uploaded_at: chrono::Utc::now(),
        };
        if let Err(e) = self.registry.record_file(&metadata).await {
            warn!(file = %source.file_name, "failed to record file metadata: {e}");
        }

        let jobs = Arc::new(Mutex::new(VecDeque::from(pages_to_convert)));
        let (result_tx, mut result_rx) = mpsc::channel(attempted.max(1));

        let workers = self.config.max_workers.clamp(1, attempted.max(1));
        for _ in 0..workers {
            let jobs = jobs.clone();
            let result_tx = result_tx.clone();
            let context = PageContext {
                bytes: bytes.clone(),
                file_name: source.file_name.clone(),
                file_id: source.file_id.clone(),
                file_url: source.file_url.clone(),
                knowledge_base_id: knowledge_base_id.to_string(),
                dpi: self.config.dpi,
                jpeg_quality: self.config.jpeg_quality,
                uploader: self.uploader.clone(),
                embedder: self.embedder.clone(),
            };
            tokio::spawn(async move {
                loop {
                    let page = jobs.lock().await.pop_front();
                    let Some(page) = page else { break };
                    let outcome = convert_page(&context, page).await;
                    if result_tx.send((page, outcome)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut records = Vec::with_capacity(attempted);
        let mut failures = Vec::new();
        while let Some((page, outcome)) = result_rx.recv().await {
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    error!(file = %source.file_name, page, "page conversion failed: {e}");
                    failures.push(PageFailure {
                        page,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if records.is_empty() && attempted > 0 {
            return Err(IngestError::AllPagesFailed { attempted });
        }

        let elapsed = start.elapsed();
        info!(
            file = %source.file_name,
            attempted,
            succeeded = records.len(),
            failed = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "PDF conversion finished"
        );

        Ok(IngestReport {
            records,
            failures,
            attempted,
            elapsed,
        })
    }
}

/// Resolve the requested page list against the document's page count.
fn resolve_pages(pages: Option<Vec<i32>>, total: i32) -> IngestResult<Vec<i32>> {
    match pages {
        None => Ok((1..=total).collect()),
        Some(requested) => {
            let invalid: Vec<i32> = requested
                .iter()
                .copied()
                .filter(|page| *page < 1 || *page > total)
                .collect();
            if !invalid.is_empty() {
                return Err(IngestError::PageOutOfRange {
                    pages: invalid,
                    total,
                });
            }
            Ok(requested)
        }
    }
}

/// Open the document once for its page count.
fn page_count(bytes: &[u8]) -> IngestResult<i32> {
    let document =
        Document::from_bytes(bytes, "application/pdf").map_err(|e| IngestError::UnreadablePdf {
            reason: e.to_string(),
        })?;
    document.page_count().map_err(|e| IngestError::UnreadablePdf {
        reason: e.to_string(),
    })
}

/// Convert one page end to end: render, encode, upload, embed.
async fn convert_page(context: &PageContext, page: i32) -> IngestResult<EmbeddingRecord> {
    let rendered = {
        let bytes = context.bytes.clone();
        let dpi = context.dpi;
        let quality = context.jpeg_quality;
        tokio::task::spawn_blocking(move || render_page(&bytes, page, dpi, quality))
            .await
            .map_err(|e| IngestError::Render {
                page,
                reason: format!("task join error: {e}"),
            })??
    };

    let image_url = context
        .uploader
        .upload(rendered.jpeg, "image/jpeg")
        .await?;
    let embedding = context.embedder.embed_image_url(&image_url).await?;

    Ok(EmbeddingRecord {
        embedding,
        image_url,
        image_width: rendered.width as i64,
        image_height: rendered.height as i64,
        file_id: context.file_id.clone(),
        file_name: truncate_file_name(&context.file_name, MAX_FILE_NAME_CHARS),
        file_page: page as i64,
        file_url: context.file_url.clone(),
        knowledge_base_id: context.knowledge_base_id.clone(),
        extra: Default::default(),
    })
}

/// A page rendered and encoded as JPEG.
struct RenderedPage {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

/// Render one page to an RGB raster and encode it as JPEG.
///
/// Re-opens the document so no mutable PDF state is shared between workers.
fn render_page(bytes: &[u8], page: i32, dpi: u32, quality: u8) -> IngestResult<RenderedPage> {
    let render_err = |reason: String| IngestError::Render { page, reason };

    let document = Document::from_bytes(bytes, "application/pdf")
        .map_err(|e| render_err(e.to_string()))?;
    let pdf_page = document
        .load_page(page - 1)
        .map_err(|e| render_err(e.to_string()))?;

    // The PDF native baseline is 72 DPI
    let zoom = dpi as f32 / 72.0;
    let matrix = Matrix::new_scale(zoom, zoom);
    let pixmap = pdf_page
        .to_pixmap(&matrix, &Colorspace::device_rgb(), 0.0, false)
        .map_err(|e| render_err(e.to_string()))?;

    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples().to_vec();

    let raster = image::RgbImage::from_raw(width, height, samples)
        .ok_or_else(|| render_err("pixmap samples do not match dimensions".to_string()))?;

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(raster.as_raw(), width, height, image::ColorType::Rgb8)
        .map_err(|e| render_err(e.to_string()))?;

    Ok(RenderedPage {
        jpeg,
        width,
        height,
    })
}

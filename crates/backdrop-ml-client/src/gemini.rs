//! Gemini image generation client.
//!
//! The input image is written to a temporary `.jpg`, uploaded through the
//! Files API, then referenced from a single `streamGenerateContent` call.
//! The server-sent event stream is parsed lazily and consumption stops at
//! the first chunk carrying inline image data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::future;
use futures_util::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MlError, MlResult};
use crate::traits::StyleTransfer;

/// Image-capable model used when none is configured.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Public Gemini endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// MIME type the upload is labelled with.
const UPLOAD_MIME: &str = "image/jpeg";

/// Prompt for the Jurassic explorer restyle.
pub const JURASSIC_EXPLORER_PROMPT: &str = "Analiza esta imagen y transforma EXACTAMENTE el rostro y pose de TODAS las personas manteniendo 100% fiel cada rostro original (ojos, nariz, boca, forma de cara, expresión, edad, género). CONSERVA las poses, posturas y posiciones corporales originales. Viste a cada persona con trajes de explorador del Jurásico (chaqueta de cuero marrón, botas altas, sombrero de explorador, cinturón con herramientas) manteniendo su pose original. Fondo: período Jurásico con dinosaurios, vegetación prehistórica y volcanes. Si hay múltiples personas, mantén la misma composición espacial original. Iluminación dramática y cinematográfica. Estilo realista como película de aventuras.";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; style transfer is disabled without one
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// API root (overridable for tests)
    pub base_url: String,
    /// Where the upload's temporary copy is written; system default if unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_IMAGE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temp_dir: None,
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: std::env::var("GEMINI_IMAGE_MODEL")
                .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            temp_dir: std::env::var("GEMINI_TEMP_DIR").ok().map(PathBuf::from),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

/// A file stored through the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// One streamed `GenerateContentResponse`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
}

impl GenerateChunk {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
    }

    /// Decoded image bytes from the first candidate, if it carries any.
    pub fn inline_image(&self) -> MlResult<Option<Vec<u8>>> {
        let Some(inline) = self
            .parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
        else {
            return Ok(None);
        };

        STANDARD
            .decode(inline.data.as_bytes())
            .map(Some)
            .map_err(|e| MlError::InvalidResponse(format!("inline image is not base64: {e}")))
    }

    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }
}

// =============================================================================
// Stream handling
// =============================================================================

/// Parse one SSE line. Non-data lines and empty payloads yield `None`.
fn parse_sse_line(line: &[u8]) -> Option<MlResult<GenerateChunk>> {
    let line = String::from_utf8_lossy(line);
    let payload = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    Some(serde_json::from_str(payload).map_err(MlError::from))
}

/// Turn an SSE byte stream into a lazy stream of chunks.
///
/// Bytes are only pulled from `body` when the consumer asks for the next
/// chunk. A transport error ends the stream after being yielded.
pub fn sse_chunks<S, B, E>(body: S) -> impl Stream<Item = MlResult<GenerateChunk>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<MlError>,
{
    let body = Box::pin(body);
    stream::unfold(
        (body, Vec::<u8>::new(), false),
        |(mut body, mut buffer, mut exhausted)| async move {
            loop {
                if let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    if let Some(item) = parse_sse_line(&line) {
                        return Some((item, (body, buffer, exhausted)));
                    }
                    continue;
                }

                if exhausted {
                    // Trailing line without a newline
                    let line = std::mem::take(&mut buffer);
                    return parse_sse_line(&line).map(|item| (item, (body, buffer, exhausted)));
                }

                match body.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(bytes.as_ref()),
                    Some(Err(e)) => {
                        buffer.clear();
                        return Some((Err(e.into()), (body, buffer, true)));
                    }
                    None => exhausted = true,
                }
            }
        },
    )
}

/// First image carried by `chunks`, polling no further than that chunk.
///
/// Text-only chunks are logged and skipped; an exhausted stream gives
/// `Ok(None)`.
pub async fn first_inline_image<S>(chunks: S) -> MlResult<Option<Vec<u8>>>
where
    S: Stream<Item = MlResult<GenerateChunk>>,
{
    let images = chunks.try_filter_map(|chunk| {
        if let Some(text) = chunk.text() {
            debug!(text = %text, "Gemini returned text");
        }
        future::ready(chunk.inline_image())
    });
    futures_util::pin_mut!(images);
    images.try_next().await
}

// =============================================================================
// Client
// =============================================================================

/// REST client for Gemini image generation.
pub struct GeminiImageClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiImageClient {
    pub fn new(config: GeminiConfig) -> MlResult<Self> {
        // No request timeout: generation can take minutes
        let http = Client::builder().build().map_err(MlError::Network)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Upload a file with the raw upload protocol.
    async fn upload(&self, api_key: &str, path: &Path) -> MlResult<UploadedFile> {
        let url = format!("{}/upload/v1beta/files", self.config.root());
        let body = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = body.len(), "Uploading image to Gemini");

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, UPLOAD_MIME)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::status("Gemini upload", status, &body));
        }

        let uploaded: UploadResponse = response.json().await?;
        debug!(uri = %uploaded.file.uri, "Image uploaded");
        Ok(uploaded.file)
    }

    /// Stream a generation request and return the first image produced.
    async fn generate(
        &self,
        api_key: &str,
        file: &UploadedFile,
        prompt: &str,
    ) -> MlResult<Option<Vec<u8>>> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            self.config.root(),
            self.config.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::File {
                        file_data: FileData {
                            mime_type: UPLOAD_MIME.to_string(),
                            file_uri: file.uri.clone(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("alt", "sse"), ("key", api_key)])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::status("Gemini", status, &body));
        }

        first_inline_image(sse_chunks(response.bytes_stream())).await
    }

    /// Full round trip; errors are returned rather than swallowed.
    pub async fn try_style_transfer(&self, image: &[u8], prompt: &str) -> MlResult<Option<Vec<u8>>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Ok(None);
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("backdrop-").suffix(".jpg");
        let temp = match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        tokio::fs::write(temp.path(), image).await?;

        let result = async {
            let file = self.upload(api_key, temp.path()).await?;
            self.generate(api_key, &file, prompt).await
        }
        .await;

        if let Err(e) = temp.close() {
            warn!(error = %e, "Failed to remove temporary upload file");
        }

        result
    }
}

#[async_trait]
impl StyleTransfer for GeminiImageClient {
    async fn style_transfer(&self, image: Vec<u8>, prompt: &str) -> Option<Vec<u8>> {
        if !self.is_configured() {
            warn!("GOOGLE_API_KEY not set, skipping style transfer");
            return None;
        }

        match self.try_style_transfer(&image, prompt).await {
            Ok(Some(bytes)) => {
                info!(model = %self.config.model, bytes = bytes.len(), "Styled image generated");
                Some(bytes)
            }
            Ok(None) => {
                warn!(model = %self.config.model, "Gemini returned no image");
                None
            }
            Err(e) => {
                warn!(model = %self.config.model, error = %e, "Style transfer failed");
                None
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

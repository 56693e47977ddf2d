//! End-to-end integration tests for edgequake-doctranslate.
//!
//! Most tests run the whole pipeline against an in-process translator or a
//! loopback HTTP server, so they need neither credentials nor network.
//! The live test at the bottom calls the real API and is gated behind the
//! `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Live:
//!   E2E_ENABLED=1 GOOGLE_APPLICATION_CREDENTIALS=key.json cargo test --test e2e live -- --nocapture

use async_trait::async_trait;
use base64::Engine;
use edgequake_doctranslate::{
    inspect, translate, translate_batch, translate_sync, translate_to_file, Credentials,
    DocumentKind, DocumentRequest, DocumentResponse, DocumentTranslator, OutputNaming, Stage,
    TranslateError, TranslationConfig, TranslationProgressCallback,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const JSON: &str = "content-type: application/json\r\n";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Records every request and answers with a fixed body and MIME type
/// (or echoes the request's when none is set).
#[derive(Default)]
struct FakeTranslator {
    requests: Mutex<Vec<DocumentRequest>>,
    reply: Option<(Vec<u8>, String)>,
}

impl FakeTranslator {
    fn replying(bytes: &[u8], mime: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Some((bytes.to_vec(), mime.to_string())),
        })
    }

    fn echo() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn requests(&self) -> Vec<DocumentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentTranslator for FakeTranslator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn translate_document(
        &self,
        request: &DocumentRequest,
    ) -> Result<DocumentResponse, TranslateError> {
        self.requests.lock().unwrap().push(request.clone());
        let (bytes, mime_type) = match self.reply {
            Some((ref b, ref m)) => (b.clone(), m.clone()),
            None => (request.content.clone(), request.mime_type.clone()),
        };
        Ok(DocumentResponse {
            bytes,
            mime_type,
            detected_language_code: Some("de".into()),
            model: None,
        })
    }
}

#[derive(Default)]
struct StageLog(Mutex<Vec<Stage>>);

impl TranslationProgressCallback for StageLog {
    fn on_stage(&self, _input: &str, stage: Stage) {
        self.0.lock().unwrap().push(stage);
    }
}

fn config_with(translator: Arc<FakeTranslator>, out_dir: &Path) -> TranslationConfig {
    TranslationConfig::builder()
        .translator(translator)
        .output_dir(out_dir)
        .build()
        .unwrap()
}

fn write_pdf(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.4\n1 0 obj <<>> endobj\ntrailer <<>>\n%%EOF\n").unwrap();
    path
}

fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_fn(w, h, |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
        .save(&path)
        .unwrap();
    path
}

fn s(p: &Path) -> &str {
    p.to_str().unwrap()
}

// ── Pipeline tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_is_submitted_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "document2.pdf");
    let fake = FakeTranslator::echo();
    let config = config_with(fake.clone(), &dir.path().join("outputs"));

    let out = translate_to_file(s(&pdf), &config).await.unwrap();

    let reqs = fake.requests();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].mime_type, "application/pdf");
    assert_eq!(reqs[0].content, std::fs::read(&pdf).unwrap());
    assert_eq!(reqs[0].target_language_code, "en-US");

    let written = out.written_to.clone().unwrap();
    assert_eq!(written, dir.path().join("outputs/translated_document.pdf"));
    assert_eq!(std::fs::read(&written).unwrap(), std::fs::read(&pdf).unwrap());
    assert_eq!(out.input_kind, DocumentKind::Pdf);
    assert!(!out.converted_from_image());
    assert_eq!(out.detected_language_code.as_deref(), Some("de"));
}

#[tokio::test]
async fn image_is_laid_out_as_pdf_before_submission() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "scan.png", 300, 200);
    let fake = FakeTranslator::echo();
    let stages = Arc::new(StageLog::default());
    let keep = dir.path().join("temp/temp_image.pdf");
    let config = TranslationConfig::builder()
        .translator(fake.clone())
        .output_dir(dir.path().join("outputs"))
        .keep_intermediate_pdf(&keep)
        .progress_callback(stages.clone())
        .build()
        .unwrap();

    let out = translate_to_file(s(&png), &config).await.unwrap();

    let reqs = fake.requests();
    assert_eq!(reqs[0].mime_type, "application/pdf");
    assert!(reqs[0].content.starts_with(b"%PDF"), "submitted bytes are not a PDF");
    assert_eq!(std::fs::read(&keep).unwrap(), reqs[0].content);

    assert!(out.converted_from_image());
    assert_eq!(out.input_mime_type, "image/png");
    assert_eq!(out.extension, "pdf");
    assert_eq!(out.stats.submitted_bytes, reqs[0].content.len());
    assert_eq!(
        *stages.0.lock().unwrap(),
        vec![Stage::Resolve, Stage::ConvertImage, Stage::Translate, Stage::Write]
    );
}

#[tokio::test]
async fn extension_follows_response_mime_type() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "letter.pdf");
    let fake = FakeTranslator::replying(b"PK\x03\x04docx", DOCX_MIME);
    let config = config_with(fake, &dir.path().join("outputs"));

    let out = translate_to_file(s(&pdf), &config).await.unwrap();

    let written = out.written_to.unwrap();
    assert_eq!(written.file_name().unwrap(), "translated_document.docx");
    assert_eq!(std::fs::read(written).unwrap(), b"PK\x03\x04docx");
}

#[tokio::test]
async fn translate_returns_bytes_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "a.pdf");
    let out_dir = dir.path().join("outputs");
    let config = config_with(FakeTranslator::replying(b"%PDF-x", "application/pdf"), &out_dir);

    let out = translate(s(&pdf), &config).await.unwrap();

    assert_eq!(out.bytes, b"%PDF-x");
    assert!(out.written_to.is_none());
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn unsupported_input_is_rejected_before_the_api() {
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, "hello").unwrap();
    let fake = FakeTranslator::echo();
    let config = config_with(fake.clone(), dir.path());

    let err = translate_to_file(s(&txt), &config).await.unwrap_err();

    assert!(
        matches!(err, TranslateError::UnsupportedMimeType { ref mime, .. } if mime.as_deref() == Some("text/plain")),
        "got: {err:?}"
    );
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(FakeTranslator::echo(), dir.path());
    let err = translate(s(&dir.path().join("nope.pdf")), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::FileNotFound { .. }), "got: {err:?}");
}

#[tokio::test]
async fn oversized_document_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "big.pdf");
    let fake = FakeTranslator::echo();
    let config = TranslationConfig::builder()
        .translator(fake.clone())
        .max_document_bytes(8)
        .build()
        .unwrap();

    let err = translate(s(&pdf), &config).await.unwrap_err();
    assert!(matches!(err, TranslateError::DocumentTooLarge { limit: 8, .. }), "got: {err:?}");
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn batch_with_fixed_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_pdf(dir.path(), "a.pdf");
    let b = write_pdf(dir.path(), "b.pdf");
    let config = config_with(FakeTranslator::echo(), dir.path());

    let err = translate_batch(&[s(&a), s(&b)], &config).await.unwrap_err();
    assert!(matches!(err, TranslateError::InvalidConfig(_)), "got: {err:?}");
}

#[tokio::test]
async fn batch_keeps_input_order_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_pdf(dir.path(), "a.pdf");
    let b = write_png(dir.path(), "b.png", 10, 40);
    let missing = dir.path().join("c.pdf");
    let out_dir = dir.path().join("out");
    let config = TranslationConfig::builder()
        .translator(FakeTranslator::echo())
        .output_dir(&out_dir)
        .naming(OutputNaming::FromInput)
        .concurrency(2)
        .build()
        .unwrap();

    let items = translate_batch(&[s(&a), s(&b), s(&missing)], &config)
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].input, s(&a));
    assert_eq!(items[1].input, s(&b));
    assert!(items[0].result.is_ok());
    assert!(items[1].result.is_ok());
    assert!(items[2].result.is_err());
    assert!(out_dir.join("a_translated.pdf").exists());
    assert!(out_dir.join("b_translated.pdf").exists());
}

#[test]
fn sync_wrapper_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "sync.pdf");
    let config = config_with(FakeTranslator::echo(), &dir.path().join("outputs"));

    let out = translate_sync(s(&pdf), &config).unwrap();
    assert!(out.written_to.unwrap().exists());
}

#[test]
fn inspect_reports_image_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "photo.png", 64, 48);

    let report = tokio_test::block_on(inspect(s(&png))).unwrap();
    assert_eq!(report.kind, Some(DocumentKind::Image));
    assert_eq!(report.image_dimensions, Some((64, 48)));
    assert_eq!(report.submitted_mime_type.as_deref(), Some("application/pdf"));
}

// ── Wire test against a loopback server ──────────────────────────────────────

/// Accept one HTTP request, return (request head, body) and answer with
/// `status`, the extra header lines in `headers` and `reply` as the body.
async fn serve_once(
    listener: tokio::net::TcpListener,
    status: &'static str,
    headers: &'static str,
    reply: Vec<u8>,
) -> (String, String) {
    let (mut sock, _) = listener.accept().await.unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = sock.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length: usize = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

    let head_out = format!(
        "HTTP/1.1 {status}\r\n{headers}content-length: {}\r\nconnection: close\r\n\r\n",
        reply.len()
    );
    sock.write_all(head_out.as_bytes()).await.unwrap();
    sock.write_all(&reply).await.unwrap();
    sock.shutdown().await.ok();
    (head, body)
}

#[tokio::test]
async fn google_client_speaks_translate_document() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let b64 = base64::engine::general_purpose::STANDARD;
    let reply = serde_json::json!({
        "documentTranslation": {
            "byteStreamOutputs": [b64.encode(b"%PDF-translated")],
            "mimeType": "application/pdf",
            "detectedLanguageCode": "ja"
        }
    })
    .to_string();
    let server = tokio::spawn(serve_once(listener, "200 OK", JSON, reply.into_bytes()));

    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let config = TranslationConfig::builder()
        .credentials(Credentials::AccessToken("test-token".into()))
        .project_id("demo-project")
        .endpoint(format!("http://{addr}"))
        .target_language("fr")
        .output_dir(dir.path().join("outputs"))
        .build()
        .unwrap();

    let out = translate_to_file(s(&pdf), &config).await.unwrap();
    let (head, body) = server.await.unwrap();

    assert!(
        head.starts_with("POST /v3/projects/demo-project/locations/global:translateDocument "),
        "head: {head}"
    );
    let head_lower = head.to_ascii_lowercase();
    assert!(head_lower.contains("authorization: bearer test-token"));
    assert!(head_lower.contains("x-goog-user-project: demo-project"));

    let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(sent["targetLanguageCode"], "fr");
    assert_eq!(sent["documentInputConfig"]["mimeType"], "application/pdf");
    let content = b64
        .decode(sent["documentInputConfig"]["content"].as_str().unwrap())
        .unwrap();
    assert_eq!(content, std::fs::read(&pdf).unwrap());
    assert!(sent.get("sourceLanguageCode").is_none());

    assert_eq!(out.bytes, b"%PDF-translated");
    assert_eq!(out.detected_language_code.as_deref(), Some("ja"));
    assert_eq!(
        std::fs::read(dir.path().join("outputs/translated_document.pdf")).unwrap(),
        b"%PDF-translated"
    );
}

#[tokio::test]
async fn google_client_maps_permission_denied() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = serde_json::json!({
        "error": {"code": 403, "message": "Cloud Translation API has not been used", "status": "PERMISSION_DENIED"}
    })
    .to_string();
    let server = tokio::spawn(serve_once(listener, "403 Forbidden", JSON, reply.into_bytes()));

    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let config = TranslationConfig::builder()
        .credentials(Credentials::AccessToken("t".into()))
        .project_id("p")
        .endpoint(format!("http://{addr}"))
        .build()
        .unwrap();

    let err = translate(s(&pdf), &config).await.unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, TranslateError::AuthError { .. }), "got: {err:?}");
    assert!(err.to_string().contains("has not been used"), "got: {err}");
}

#[tokio::test]
async fn google_client_reports_retry_after() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = serde_json::json!({
        "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
    })
    .to_string();
    let server = tokio::spawn(serve_once(
        listener,
        "429 Too Many Requests",
        "content-type: application/json\r\nretry-after: 7\r\n",
        reply.into_bytes(),
    ));

    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "doc.pdf");
    let config = TranslationConfig::builder()
        .credentials(Credentials::AccessToken("t".into()))
        .project_id("p")
        .endpoint(format!("http://{addr}"))
        .build()
        .unwrap();

    let err = translate(s(&pdf), &config).await.unwrap_err();
    server.await.unwrap();
    assert!(
        matches!(err, TranslateError::RateLimitExceeded { retry_after_secs: Some(7) }),
        "got: {err:?}"
    );
    assert!(err.is_retryable());
}

// ── URL inputs ───────────────────────────────────────────────────────────────

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    image::RgbImage::from_pixel(w, h, image::Rgb([200, 10, 10]))
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn url_without_extension_is_typed_by_content_type() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_once(
        listener,
        "200 OK",
        "content-type: image/png\r\n",
        png_bytes(30, 20),
    ));

    let dir = tempfile::tempdir().unwrap();
    let fake = FakeTranslator::echo();
    let config = config_with(fake.clone(), &dir.path().join("outputs"));

    let out = translate_to_file(format!("http://{addr}/scan"), &config)
        .await
        .unwrap();
    let (head, _) = server.await.unwrap();

    assert!(head.starts_with("GET /scan "), "head: {head}");
    assert_eq!(out.input_mime_type, "image/png");
    assert!(out.converted_from_image());
    let reqs = fake.requests();
    assert_eq!(reqs[0].mime_type, "application/pdf");
    assert!(reqs[0].content.starts_with(b"%PDF"));
    assert!(dir.path().join("outputs/translated_document.pdf").exists());
}

#[tokio::test]
async fn url_not_found_is_download_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_once(
        listener,
        "404 Not Found",
        "content-type: text/plain\r\n",
        b"no such document".to_vec(),
    ));

    let dir = tempfile::tempdir().unwrap();
    let fake = FakeTranslator::echo();
    let config = config_with(fake.clone(), dir.path());

    let err = translate(format!("http://{addr}/missing.pdf"), &config)
        .await
        .unwrap_err();
    server.await.unwrap();

    match err {
        TranslateError::DownloadFailed { ref reason, .. } => {
            assert!(reason.contains("404"), "got: {reason}")
        }
        ref other => panic!("unexpected {other:?}"),
    }
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn stalled_download_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and never answer.
    let server = tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        drop(sock);
    });

    let dir = tempfile::tempdir().unwrap();
    let config = TranslationConfig::builder()
        .translator(FakeTranslator::echo())
        .output_dir(dir.path())
        .download_timeout_secs(1)
        .build()
        .unwrap();

    let err = translate(format!("http://{addr}/slow.pdf"), &config)
        .await
        .unwrap_err();
    server.abort();
    assert!(
        matches!(err, TranslateError::DownloadTimeout { secs: 1, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn urls_sharing_a_download_name_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeTranslator::echo();
    let config = TranslationConfig::builder()
        .translator(fake.clone())
        .output_dir(dir.path())
        .naming(OutputNaming::FromInput)
        .build()
        .unwrap();

    let err = translate_batch(
        &["http://127.0.0.1:9/get?id=1", "http://127.0.0.1:9/get?id=2"],
        &config,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TranslateError::InvalidConfig(_)), "got: {err:?}");
    assert!(err.to_string().contains("downloaded_translated"), "got: {err}");
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn batch_keeps_one_intermediate_pdf_per_image() {
    let dir = tempfile::tempdir().unwrap();
    let images: Vec<PathBuf> = (0..8)
        .map(|i| write_png(dir.path(), &format!("img{i}.png"), 16 + i, 12))
        .collect();
    let inputs: Vec<&str> = images.iter().map(|p| s(p)).collect();
    let keep = dir.path().join("temp/temp_image.pdf");
    let fake = FakeTranslator::echo();
    let config = TranslationConfig::builder()
        .translator(fake.clone())
        .output_dir(dir.path().join("out"))
        .naming(OutputNaming::FromInput)
        .keep_intermediate_pdf(&keep)
        .concurrency(8)
        .build()
        .unwrap();

    let items = translate_batch(&inputs, &config).await.unwrap();

    for (i, item) in items.iter().enumerate() {
        assert!(item.result.is_ok(), "{}: {:?}", item.input, item.result);
        let kept = dir.path().join(format!("temp/temp_image_img{i}.pdf"));
        assert!(std::fs::read(&kept).unwrap().starts_with(b"%PDF"));
    }
    assert!(!keep.exists());
    assert_eq!(fake.requests().len(), 8);
}

// ── Live API ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_translate_image() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let png = write_png(dir.path(), "live.png", 400, 300);
    let config = TranslationConfig::builder()
        .target_language("fr")
        .output_dir(dir.path().join("outputs"))
        .build()
        .unwrap();

    let out = translate_to_file(s(&png), &config).await.unwrap();
    println!("{}", serde_json::to_string_pretty(&out).unwrap());
    assert!(!out.bytes.is_empty());
    assert!(out.written_to.unwrap().exists());
}

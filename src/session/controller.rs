use super::adjust::{AdjustmentJob, AdjustmentOutcome, Adjustments};
use super::status::{EditKind, RequestStatus};
use super::token::{Generation, Token};
use crate::codec::{download_filename, EncodedImage};
use crate::config::EditorConfig;
use crate::edit::{EditProvider, EditRequest, EditedImage, GeminiProvider};
use crate::error::{RetouchError, Result};
use crate::transform::{Crop, CropRegion, Resize, ResizeSpec, Transform};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File stem used for downloads.
pub const DOWNLOAD_STEM: &str = "edited-image";

/// An edit that has been started and is waiting for the provider.
#[derive(Debug)]
pub struct PendingEdit {
    kind: EditKind,
    token: Token,
    request: EditRequest,
}

impl PendingEdit {
    pub fn kind(&self) -> EditKind {
        self.kind
    }

    /// The exact request that will be sent.
    pub fn request(&self) -> &EditRequest {
        &self.request
    }
}

/// The current display image packaged for saving.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub image: EncodedImage,
}

/// State of one editing session.
pub struct Session {
    config: EditorConfig,
    provider: Option<Arc<dyn EditProvider>>,
    source: Option<EncodedImage>,
    cropped: Option<EncodedImage>,
    crop: Option<CropRegion>,
    resize: ResizeSpec,
    prompt: String,
    adjustments: Adjustments,
    edit_result: Option<EditedImage>,
    adjusted: Option<EncodedImage>,
    status: RequestStatus,
    // bumped when the source changes; edits started earlier are dropped
    sources: Generation,
    // bumped when the edit result or the adjustments change
    renders: Generation,
}

impl Session {
    /// A session whose provider is built from `config` on first use.
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            provider: None,
            source: None,
            cropped: None,
            crop: None,
            resize: ResizeSpec::default(),
            prompt: String::new(),
            adjustments: Adjustments::default(),
            edit_result: None,
            adjusted: None,
            status: RequestStatus::Idle,
            sources: Generation::default(),
            renders: Generation::default(),
        }
    }

    /// A session using an already-built provider.
    pub fn with_provider(config: EditorConfig, provider: Arc<dyn EditProvider>) -> Self {
        let mut session = Self::new(config);
        session.provider = Some(provider);
        session
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    // ----- source & crop -------------------------------------------------

    /// Replaces the source image and clears everything derived from the old one.
    pub fn load_source(&mut self, image: EncodedImage) -> Result<()> {
        let (width, height) = image.dimensions()?;
        self.clear_source();
        self.resize.rebase(width, height);
        tracing::debug!(width, height, mime_type = %image.mime_type, "source image loaded");
        self.source = Some(image);
        Ok(())
    }

    /// Drops the source together with crop, results and adjustments.
    pub fn clear_source(&mut self) {
        self.source = None;
        self.cropped = None;
        self.crop = None;
        self.resize.reset();
        self.adjustments = Adjustments::default();
        self.edit_result = None;
        self.adjusted = None;
        self.status = RequestStatus::Idle;
        self.sources.advance();
        self.renders.advance();
    }

    pub fn source(&self) -> Option<&EncodedImage> {
        self.source.as_ref()
    }

    /// The cropped image if there is one, else the source.
    pub fn working_image(&self) -> Option<&EncodedImage> {
        self.cropped.as_ref().or(self.source.as_ref())
    }

    pub fn crop_region(&self) -> Option<CropRegion> {
        self.crop
    }

    /// Crops the source (never an earlier crop) to `region` in source pixels.
    pub fn apply_crop(&mut self, region: CropRegion) -> Result<()> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| RetouchError::InvalidRequest("no image loaded".into()))?;
        let cropped = Crop::new(region)
            .with_jpeg_quality(self.config.jpeg_quality)
            .apply(source)?;
        let (width, height) = cropped.dimensions()?;
        self.resize.rebase(width, height);
        self.cropped = Some(cropped);
        self.crop = Some(region);
        Ok(())
    }

    /// Crops using a selection drawn on a preview shown at `display` size.
    pub fn apply_display_crop(&mut self, selection: CropRegion, display: (u32, u32)) -> Result<()> {
        let natural = self
            .source
            .as_ref()
            .ok_or_else(|| RetouchError::InvalidRequest("no image loaded".into()))?
            .dimensions()?;
        self.apply_crop(CropRegion::from_display(selection, display, natural)?)
    }

    /// Goes back to the uncropped source.
    pub fn clear_crop(&mut self) -> Result<()> {
        self.cropped = None;
        self.crop = None;
        if let Some(source) = &self.source {
            let (width, height) = source.dimensions()?;
            self.resize.rebase(width, height);
        }
        Ok(())
    }

    // ----- parameters ----------------------------------------------------

    pub fn resize(&self) -> &ResizeSpec {
        &self.resize
    }

    pub fn resize_mut(&mut self) -> &mut ResizeSpec {
        &mut self.resize
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn adjustments(&self) -> Adjustments {
        self.adjustments
    }

    /// Changes the adjustments and drops the now stale adjusted result.
    ///
    /// Nothing is re-rendered here: call [`Session::refresh_adjustment`] (or
    /// drive [`Session::begin_adjustment`] / [`Session::finish_adjustment`])
    /// to produce the new adjusted result. Until then the raw edit is shown.
    pub fn set_adjustments(&mut self, adjustments: Adjustments) {
        if adjustments != self.adjustments {
            self.adjustments = adjustments;
            self.adjusted = None;
            self.renders.advance();
        }
    }

    // ----- results -------------------------------------------------------

    pub fn edit_result(&self) -> Option<&EditedImage> {
        self.edit_result.as_ref()
    }

    /// The rendered adjustment, if one is current.
    pub fn adjusted_result(&self) -> Option<&EncodedImage> {
        self.adjusted.as_ref()
    }

    /// What the user sees: the adjusted result, falling back to the raw edit.
    pub fn display_image(&self) -> Option<&EncodedImage> {
        self.adjusted
            .as_ref()
            .or(self.edit_result.as_ref().map(|e| &e.image))
    }

    /// The display image with its download filename.
    pub fn download(&self) -> Option<Download> {
        self.display_image().map(|image| Download {
            filename: download_filename(DOWNLOAD_STEM, Some(&image.mime_type)),
            image: image.clone(),
        })
    }

    /// Writes the download into `dir` and returns the full path.
    pub fn save_download(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let download = self
            .download()
            .ok_or_else(|| RetouchError::InvalidRequest("nothing to download yet".into()))?;
        let path = dir.as_ref().join(&download.filename);
        download.image.save(&path)?;
        Ok(path)
    }

    // ----- remote edits --------------------------------------------------

    /// Sends the working image with the prompt; on success re-renders adjustments.
    pub async fn generate(&mut self) -> Result<()> {
        self.run_edit(EditKind::Generate).await
    }

    /// Sends the working image with the built-in enhancement instruction.
    pub async fn enhance(&mut self) -> Result<()> {
        self.run_edit(EditKind::Enhance).await
    }

    async fn run_edit(&mut self, kind: EditKind) -> Result<()> {
        let pending = self.begin_edit(kind)?;
        let provider = match self.resolve_provider() {
            Ok(provider) => provider,
            Err(e) => return self.complete_edit(pending, Err(e)),
        };
        tracing::debug!(%kind, provider = provider.name(), "edit request started");
        let result = provider.edit(&pending.request).await;
        self.complete_edit(pending, result)?;
        self.refresh_adjustment().await;
        Ok(())
    }

    fn resolve_provider(&mut self) -> Result<Arc<dyn EditProvider>> {
        if let Some(provider) = &self.provider {
            return Ok(Arc::clone(provider));
        }
        let provider: Arc<dyn EditProvider> = Arc::new(GeminiProvider::from_config(&self.config)?);
        self.provider = Some(Arc::clone(&provider));
        Ok(provider)
    }

    /// Validates inputs, builds the request and enters the in-flight state.
    ///
    /// Fails with [`RetouchError::Busy`] (status untouched) while another edit
    /// is in flight; other failures are recorded in the status. The previous
    /// result is cleared as soon as the inputs are valid, so a request that
    /// fails while preparing the image never leaves the old result on display.
    pub fn begin_edit(&mut self, kind: EditKind) -> Result<PendingEdit> {
        if self.status.is_busy() {
            return Err(RetouchError::Busy);
        }

        let (working, instruction) = match self.edit_inputs(kind) {
            Ok(inputs) => inputs,
            Err(e) => {
                self.status = RequestStatus::Error(kind.missing_input_message().to_string());
                return Err(e);
            }
        };

        self.edit_result = None;
        self.adjusted = None;
        self.renders.advance();

        let image = match self.prepare_image(&working) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(%kind, "could not prepare image for edit: {e}");
                self.status = RequestStatus::Error(kind.failure_message(&e));
                return Err(e);
            }
        };

        self.status = kind.in_flight();
        Ok(PendingEdit {
            kind,
            token: self.sources.current(),
            request: EditRequest::new(image, instruction),
        })
    }

    /// The working image and instruction, or `InvalidRequest` when either is missing.
    fn edit_inputs(&self, kind: EditKind) -> Result<(EncodedImage, String)> {
        let working = self
            .working_image()
            .ok_or_else(|| RetouchError::InvalidRequest("no image loaded".into()))?;

        let instruction = match kind {
            EditKind::Generate => self.prompt.trim().to_string(),
            EditKind::Enhance => self.config.enhance_prompt.clone(),
        };
        if instruction.is_empty() {
            return Err(RetouchError::InvalidRequest("prompt is empty".into()));
        }
        Ok((working.clone(), instruction))
    }

    /// Applies the resize target, if any, to the working image.
    fn prepare_image(&self, working: &EncodedImage) -> Result<EncodedImage> {
        let (width, height) = working.dimensions()?;
        match self.resize.target_for(width, height) {
            Some((w, h)) => {
                tracing::debug!(from = ?(width, height), to = ?(w, h), "resizing before edit");
                Resize::new(w, h)
                    .with_jpeg_quality(self.config.jpeg_quality)
                    .apply(working)
            }
            None => Ok(working.clone()),
        }
    }

    /// Records the provider's answer for `pending` and leaves the in-flight state.
    ///
    /// Answers for an edit started before the source was replaced or cleared
    /// are dropped.
    pub fn complete_edit(
        &mut self,
        pending: PendingEdit,
        result: Result<Option<EditedImage>>,
    ) -> Result<()> {
        if !self.sources.is_current(pending.token) {
            tracing::warn!(kind = %pending.kind, "dropping edit result for a replaced source image");
            return Ok(());
        }

        self.status = RequestStatus::Idle;
        let outcome = result.and_then(|image| image.ok_or(RetouchError::NoImage));
        match outcome {
            Ok(image) => {
                tracing::debug!(
                    kind = %pending.kind,
                    bytes = image.image.size(),
                    mime_type = %image.image.mime_type,
                    "edit result received"
                );
                self.edit_result = Some(image);
                self.renders.advance();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(kind = %pending.kind, "edit failed: {e}");
                self.status = RequestStatus::Error(pending.kind.failure_message(&e));
                Err(e)
            }
        }
    }

    // ----- adjustments ---------------------------------------------------

    /// Snapshots the edit result and adjustments for rendering.
    ///
    /// Starting a job supersedes any job started before it.
    pub fn begin_adjustment(&mut self) -> Option<AdjustmentJob> {
        let base = self.edit_result.as_ref()?.image.clone();
        Some(AdjustmentJob {
            token: self.renders.advance(),
            base,
            filter: self.adjustments.to_filter(self.config.jpeg_quality),
        })
    }

    /// Applies a finished job if it is still current; returns whether it was.
    ///
    /// A failed render clears the adjusted result so the raw edit is shown.
    pub fn finish_adjustment(&mut self, outcome: AdjustmentOutcome) -> bool {
        if !self.renders.is_current(outcome.token) {
            tracing::debug!("discarding superseded adjustment");
            return false;
        }
        match outcome.result {
            Ok(image) => self.adjusted = Some(image),
            Err(e) => {
                tracing::warn!("adjustment failed, showing unadjusted result: {e}");
                self.adjusted = None;
            }
        }
        true
    }

    /// Re-renders the adjusted result from the current edit result.
    pub async fn refresh_adjustment(&mut self) {
        if let Some(job) = self.begin_adjustment() {
            let outcome = job.run().await;
            self.finish_adjustment(outcome);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("source", &self.source)
            .field("crop", &self.crop)
            .field("resize", &self.resize)
            .field("prompt", &self.prompt)
            .field("adjustments", &self.adjustments)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditMetadata;
    use crate::test_helpers::{jpeg_image, png_image};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Reply {
        Image,
        Undecodable,
        Nothing,
        Fail,
    }

    struct MockProvider {
        calls: AtomicUsize,
        seen: Mutex<Vec<EditRequest>>,
        reply: Mutex<Reply>,
    }

    impl MockProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                reply: Mutex::new(reply),
            })
        }

        fn set_reply(&self, reply: Reply) {
            *self.reply.lock().unwrap() = reply;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> EditRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl EditProvider for MockProvider {
        async fn edit(&self, request: &EditRequest) -> Result<Option<EditedImage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            let image = match *self.reply.lock().unwrap() {
                Reply::Image => png_image(16, 12),
                Reply::Undecodable => EncodedImage::new(b"not really a png".to_vec(), "image/png"),
                Reply::Nothing => return Ok(None),
                Reply::Fail => {
                    return Err(RetouchError::Api {
                        status: 500,
                        message: "upstream exploded".into(),
                    })
                }
            };
            Ok(Some(EditedImage::new(image, EditMetadata::default())))
        }

        fn name(&self) -> &str {
            "mock"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn session_with(reply: Reply) -> (Session, Arc<MockProvider>) {
        let mock = MockProvider::new(reply);
        let session = Session::with_provider(EditorConfig::default(), mock.clone());
        (session, mock)
    }

    /// Exactly one of "result" and "error" after a finished request.
    fn assert_exclusive(session: &Session) {
        assert!(!session.status().is_busy());
        assert_ne!(
            session.edit_result().is_some(),
            session.status().error().is_some()
        );
    }

    #[tokio::test]
    async fn test_generate_success() {
        let (mut session, mock) = session_with(Reply::Image);
        session.load_source(png_image(40, 30)).unwrap();
        session.set_prompt("add a hat");

        session.generate().await.unwrap();

        assert_eq!(mock.calls(), 1);
        assert_eq!(session.status(), &RequestStatus::Idle);
        assert_exclusive(&session);
        assert_eq!(mock.last_request().instruction, "add a hat");
        assert_eq!(
            session.display_image(),
            Some(&session.edit_result().unwrap().image)
        );
    }

    #[tokio::test]
    async fn test_generate_resizes_by_percentage() {
        let (mut session, mock) = session_with(Reply::Image);
        session.load_source(png_image(400, 300)).unwrap();
        session.resize_mut().set_percentage(50);
        session.set_prompt("test");

        session.generate().await.unwrap();

        assert_eq!(mock.last_request().image.dimensions().unwrap(), (200, 150));
    }

    #[tokio::test]
    async fn test_failed_resize_clears_previous_result() {
        let (mut session, mock) = session_with(Reply::Image);
        session.load_source(png_image(40, 30)).unwrap();
        session.set_prompt("test");
        session.generate().await.unwrap();
        assert!(session.edit_result().is_some());

        // 1% of 40x30 rounds to 0x0
        session.resize_mut().set_percentage(1);
        let err = session.generate().await.unwrap_err();

        assert!(matches!(err, RetouchError::Canvas(_)));
        assert_eq!(mock.calls(), 1);
        assert!(session.edit_result().is_none());
        assert!(session.display_image().is_none());
        assert!(session.download().is_none());
        assert!(session
            .status()
            .error()
            .unwrap()
            .starts_with("Failed to generate image:"));
        assert_exclusive(&session);
    }

    #[tokio::test]
    async fn test_generate_uses_locked_pixel_target() {
        let (mut session, mock) = session_with(Reply::Image);
        session.load_source(jpeg_image(400, 300)).unwrap();
        session.resize_mut().set_width(100);
        assert_eq!(
            session.resize().target_for(400, 300),
            Some((100, 75))
        );
        session.set_prompt("test");

        session.generate().await.unwrap();

        let sent = mock.last_request().image;
        assert_eq!(sent.dimensions().unwrap(), (100, 75));
        assert_eq!(sent.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_call() {
        let config = EditorConfig::new().api_key_env(["RETOUCH_TEST_KEY_NEVER_SET"]);
        let mut session = Session::new(config);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");

        let err = session.generate().await.unwrap_err();

        assert!(matches!(err, RetouchError::Configuration(_)));
        assert!(session
            .status()
            .error()
            .unwrap()
            .starts_with("Failed to generate image: configuration error"));
        assert_exclusive(&session);
    }

    #[tokio::test]
    async fn test_remote_failure_then_retry() {
        let (mut session, mock) = session_with(Reply::Fail);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");

        let err = session.generate().await.unwrap_err();
        assert!(err.is_remote());
        assert!(session
            .status()
            .error()
            .unwrap()
            .contains("upstream exploded"));
        assert_exclusive(&session);

        mock.set_reply(Reply::Image);
        session.generate().await.unwrap();
        assert_eq!(mock.calls(), 2);
        assert_exclusive(&session);
    }

    #[tokio::test]
    async fn test_no_image_is_an_error() {
        let (mut session, _mock) = session_with(Reply::Nothing);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, RetouchError::NoImage));
        assert_exclusive(&session);
    }

    #[tokio::test]
    async fn test_generate_requires_image_and_prompt() {
        let (mut session, mock) = session_with(Reply::Image);
        session.set_prompt("test");
        assert!(matches!(
            session.generate().await.unwrap_err(),
            RetouchError::InvalidRequest(_)
        ));

        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("   ");
        assert!(session.generate().await.is_err());
        assert_eq!(
            session.status().error(),
            Some("Please upload an image and enter a prompt.")
        );
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_enhance_uses_builtin_instruction() {
        let (mut session, mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();

        session.enhance().await.unwrap();

        assert_eq!(
            mock.last_request().instruction,
            crate::config::DEFAULT_ENHANCE_PROMPT
        );
        assert_exclusive(&session);
    }

    #[test]
    fn test_second_edit_while_busy_is_rejected() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");

        let _pending = session.begin_edit(EditKind::Generate).unwrap();
        assert_eq!(session.status(), &RequestStatus::Generating);

        let err = session.begin_edit(EditKind::Enhance).unwrap_err();
        assert!(matches!(err, RetouchError::Busy));
        assert_eq!(session.status(), &RequestStatus::Generating);
    }

    #[test]
    fn test_new_edit_clears_previous_result() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");

        let pending = session.begin_edit(EditKind::Generate).unwrap();
        let edited = EditedImage::new(png_image(4, 4), EditMetadata::default());
        session.complete_edit(pending, Ok(Some(edited))).unwrap();
        assert!(session.edit_result().is_some());

        let _pending = session.begin_edit(EditKind::Enhance).unwrap();
        assert_eq!(session.status(), &RequestStatus::Enhancing);
        assert!(session.edit_result().is_none());
        assert!(session.display_image().is_none());
    }

    #[test]
    fn test_result_for_replaced_source_is_dropped() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");

        let pending = session.begin_edit(EditKind::Generate).unwrap();
        session.load_source(png_image(10, 10)).unwrap();
        assert_eq!(session.status(), &RequestStatus::Idle);

        let edited = EditedImage::new(png_image(4, 4), EditMetadata::default());
        session.complete_edit(pending, Ok(Some(edited))).unwrap();
        assert!(session.edit_result().is_none());
        assert_eq!(session.status(), &RequestStatus::Idle);
    }

    #[tokio::test]
    async fn test_clear_source_clears_derived_state() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(40, 30)).unwrap();
        session.apply_crop(CropRegion::new(0, 0, 20, 20)).unwrap();
        session.set_adjustments(Adjustments::default().with_contrast(140));
        session.set_prompt("test");
        session.generate().await.unwrap();
        assert!(session.adjusted_result().is_some());

        session.clear_source();

        assert!(session.source().is_none());
        assert!(session.working_image().is_none());
        assert!(session.crop_region().is_none());
        assert!(session.edit_result().is_none());
        assert!(session.adjusted_result().is_none());
        assert!(session.adjustments().is_identity());
        assert_eq!(session.resize().base(), None);
        assert_eq!(session.status(), &RequestStatus::Idle);
    }

    #[tokio::test]
    async fn test_crop_becomes_working_image() {
        let (mut session, mock) = session_with(Reply::Image);
        session.load_source(png_image(40, 30)).unwrap();
        session.apply_crop(CropRegion::new(5, 5, 20, 10)).unwrap();
        assert_eq!(session.resize().base(), Some((20, 10)));

        // re-crop starts from the source, not the previous crop
        session.apply_crop(CropRegion::new(0, 0, 30, 30)).unwrap();
        assert_eq!(session.working_image().unwrap().dimensions().unwrap(), (30, 30));

        session.set_prompt("test");
        session.generate().await.unwrap();
        assert_eq!(mock.last_request().image.dimensions().unwrap(), (30, 30));

        session.clear_crop().unwrap();
        assert_eq!(session.working_image(), session.source());
        assert_eq!(session.resize().base(), Some((40, 30)));
    }

    #[test]
    fn test_display_crop_scales_to_source() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(400, 300)).unwrap();
        session
            .apply_display_crop(CropRegion::new(0, 0, 100, 50), (200, 150))
            .unwrap();
        assert_eq!(session.crop_region(), Some(CropRegion::new(0, 0, 200, 100)));
    }

    #[tokio::test]
    async fn test_identity_adjustment_passes_through() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");
        session.generate().await.unwrap();

        let edited = session.edit_result().unwrap().image.clone();
        assert_eq!(session.adjusted_result(), Some(&edited));
    }

    #[tokio::test]
    async fn test_adjustment_recomputes_on_change() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");
        session.generate().await.unwrap();

        session.set_adjustments(Adjustments::default().with_contrast(170));
        // nothing is rendered until the caller refreshes
        assert!(session.adjusted_result().is_none());
        assert_eq!(
            session.display_image(),
            Some(&session.edit_result().unwrap().image)
        );
        session.refresh_adjustment().await;

        let adjusted = session.adjusted_result().unwrap();
        assert_ne!(adjusted, &session.edit_result().unwrap().image);
        assert_eq!(adjusted.dimensions().unwrap(), (16, 12));
    }

    #[tokio::test]
    async fn test_superseded_adjustment_is_discarded() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");
        session.generate().await.unwrap();

        session.set_adjustments(Adjustments::default().with_contrast(10));
        let stale = session.begin_adjustment().unwrap();
        session.set_adjustments(Adjustments::default().with_contrast(190));
        let fresh = session.begin_adjustment().unwrap();

        let fresh_out = fresh.run().await;
        let expected = fresh_out.result().unwrap().clone();
        let stale_out = stale.run().await;

        assert!(!session.finish_adjustment(stale_out));
        assert!(session.finish_adjustment(fresh_out));
        assert_eq!(session.adjusted_result(), Some(&expected));
    }

    #[tokio::test]
    async fn test_adjustment_for_old_result_is_discarded() {
        let (mut session, _mock) = session_with(Reply::Image);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");
        session.set_adjustments(Adjustments::default().with_contrast(150));
        session.generate().await.unwrap();

        let job = session.begin_adjustment().unwrap();
        session.generate().await.unwrap();
        let current = session.adjusted_result().cloned();

        assert!(!session.finish_adjustment(job.run().await));
        assert_eq!(session.adjusted_result().cloned(), current);
    }

    #[tokio::test]
    async fn test_failed_adjustment_falls_back_to_edit_result() {
        let (mut session, _mock) = session_with(Reply::Undecodable);
        session.load_source(png_image(8, 8)).unwrap();
        session.set_adjustments(Adjustments::default().with_contrast(150));
        session.set_prompt("test");

        session.generate().await.unwrap();

        assert!(session.adjusted_result().is_none());
        assert_eq!(
            session.display_image(),
            Some(&session.edit_result().unwrap().image)
        );
        assert_eq!(session.status(), &RequestStatus::Idle);
    }

    #[tokio::test]
    async fn test_download() {
        let (mut session, _mock) = session_with(Reply::Image);
        assert!(session.download().is_none());

        session.load_source(png_image(8, 8)).unwrap();
        session.set_prompt("test");
        session.generate().await.unwrap();

        let download = session.download().unwrap();
        assert_eq!(download.filename, "edited-image.png");

        let dir = tempfile::tempdir().unwrap();
        let path = session.save_download(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("edited-image.png"));
        assert_eq!(std::fs::read(&path).unwrap(), download.image.data);
    }
}

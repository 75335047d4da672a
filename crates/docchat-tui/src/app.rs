use std::path::PathBuf;

use docchat_core::{DocumentError, DocumentLoader, ResponseGenerator, ServiceError, Session};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Document,
}

/// State of the "Upload PDF" popup.
#[derive(Debug, Clone, Default)]
pub struct UploadPrompt {
    pub path: String,
    pub cursor: usize,
    pub error: Option<String>,
}

impl UploadPrompt {
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.path, self.cursor);
        self.path.insert(byte_pos, c);
        self.cursor += 1;
        self.error = None;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.path, self.cursor);
            self.path.remove(byte_pos);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.path.chars().count());
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation
    pub session: Session,
    pub input: String,
    pub input_cursor: usize, // in chars, not bytes
    pub warning: Option<String>,
    pub pending: Option<JoinHandle<Result<String, ServiceError>>>,

    // Transcript viewport
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Document sidebar
    pub doc_scroll: u16,
    pub document_error: Option<String>,
    pub upload: Option<UploadPrompt>,

    // Animation state
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub doc_area: Option<Rect>,

    pub generator: ResponseGenerator,
    pub loader: DocumentLoader,
}

impl App {
    pub fn new(generator: ResponseGenerator) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,

            session: Session::new(),
            input: String::new(),
            input_cursor: 0,
            warning: None,
            pending: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            doc_scroll: 0,
            document_error: None,
            upload: None,

            animation_frame: 0,

            chat_area: None,
            doc_area: None,

            generator,
            loader: DocumentLoader::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    /// Send the input line. Empty input only raises the warning.
    pub fn submit(&mut self) {
        let query = match self.session.begin_submission(&self.input) {
            Ok(query) => query,
            Err(err) => {
                self.warning = Some(err.to_string());
                return;
            }
        };

        self.warning = None;
        self.input.clear();
        self.input_cursor = 0;
        self.scroll_chat_to_bottom();

        let generator = self.generator.clone();
        self.pending = Some(tokio::spawn(async move { generator.generate(&query).await }));
    }

    /// Collect the answer once the request task has finished.
    pub async fn poll_pending(&mut self) {
        let finished = self.pending.as_ref().map(|h| h.is_finished()).unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(handle) = self.pending.take() {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    warn!(error = %join_err, "request task failed");
                    Err(ServiceError::Interrupted(join_err.to_string()))
                }
            };
            self.session.finish_submission(result);
            self.scroll_chat_to_bottom();
        }
    }

    // Input editing (cursor is a char index)
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
        self.warning = None;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input.chars().count());
    }

    pub fn move_cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    // Upload popup
    pub fn open_upload(&mut self) {
        self.upload = Some(UploadPrompt::default());
    }

    pub fn cancel_upload(&mut self) {
        self.upload = None;
    }

    /// Load the file named in the popup. A wrong extension or an unreadable
    /// path keeps the popup open; a broken PDF closes it and is reported in
    /// the sidebar.
    pub fn confirm_upload(&mut self) {
        let Some(prompt) = self.upload.as_mut() else {
            return;
        };

        let raw = prompt.path.trim();
        if raw.is_empty() {
            prompt.error = Some("Enter the path of a PDF file.".to_string());
            return;
        }
        let path = expand_home(raw);

        match self.loader.load_path(&path) {
            Ok(document) => {
                info!(document = %document.name, "document attached");
                self.session.attach_document(document);
                self.document_error = None;
                self.doc_scroll = 0;
                self.upload = None;
            }
            Err(DocumentError::NotPdf(_)) => {
                prompt.error = Some("Only .pdf files are accepted.".to_string());
            }
            // A mistyped path is fixed in the popup; the current document stays.
            Err(DocumentError::Io(err)) => {
                warn!(error = %err, path = %path.display(), "could not open upload");
                prompt.error = Some(format!("Could not open file: {}", err));
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "document upload failed");
                self.session.clear_document();
                self.document_error = Some(err.to_string());
                self.doc_scroll = 0;
                self.upload = None;
            }
        }
    }

    pub fn remove_document(&mut self) {
        self.session.clear_document();
        self.document_error = None;
        self.doc_scroll = 0;
    }

    // Scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Chat => self.chat_scroll = self.chat_scroll.saturating_add(lines),
            FocusPane::Document => self.doc_scroll = self.doc_scroll.saturating_add(lines),
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            FocusPane::Chat => self.chat_scroll = self.chat_scroll.saturating_sub(lines),
            FocusPane::Document => self.doc_scroll = self.doc_scroll.saturating_sub(lines),
        }
    }

    pub fn scroll_to_top(&mut self) {
        match self.focus {
            FocusPane::Chat => self.chat_scroll = 0,
            FocusPane::Document => self.doc_scroll = 0,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Chat => FocusPane::Document,
            FocusPane::Document => FocusPane::Chat,
        };
    }

    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll so the newest message (or the "Thinking..." line) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            60
        };

        let mut total_lines: u16 = 0;
        for msg in self.session.history() {
            total_lines = total_lines.saturating_add(1); // "You:" / "Assistant:"
            for line in msg.content.lines() {
                total_lines = total_lines.saturating_add(wrapped_height(line, wrap_width) as u16);
            }
            total_lines = total_lines.saturating_add(1); // spacer
        }
        if self.is_loading() {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

/// Rows a line takes when word-wrapped to `width`. Words that do not fit
/// on the current row move to the next one; words longer than a row are
/// broken across rows.
fn wrapped_height(line: &str, width: usize) -> usize {
    let width = width.max(1);
    let mut rows = 1;
    let mut col = 0;

    for word in line.split_whitespace() {
        let len = word.chars().count();
        let needed = if col == 0 { len } else { col + 1 + len };
        if needed <= width {
            col = needed;
            continue;
        }

        if col > 0 {
            rows += 1;
        }
        let extra_rows = (len - 1) / width;
        rows += extra_rows;
        col = len - extra_rows * width;
    }
    rows
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use docchat_core::{
        ChatMessage, ChatRole, CompletionService, DocumentFetcher, LoadedDocument, RandomVectorizer,
        VectorMatch, VectorStore,
    };
    use std::sync::Arc;
    use tempfile::tempdir;

    struct EmptyStore;

    #[async_trait]
    impl VectorStore for EmptyStore {
        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<VectorMatch>, ServiceError> {
            Ok(Vec::new())
        }
    }

    /// Answers with the prompt it received, or fails when told to.
    struct EchoCompletion {
        fail: bool,
    }

    #[async_trait]
    impl CompletionService for EchoCompletion {
        async fn complete(&self, messages: &[ChatMessage], _model: &str) -> Result<String, ServiceError> {
            if self.fail {
                return Err(ServiceError::EmptyCompletion);
            }
            Ok(format!("echo: {}", messages[0].content))
        }
    }

    pub(crate) fn test_app(fail: bool) -> App {
        let fetcher = DocumentFetcher::new(Arc::new(RandomVectorizer::new(8)), Arc::new(EmptyStore));
        let generator = ResponseGenerator::new(fetcher, Arc::new(EchoCompletion { fail }), "test-model");
        App::new(generator)
    }

    async fn wait_for_answer(app: &mut App) {
        if let Some(handle) = app.pending.as_ref() {
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
        }
        app.poll_pending().await;
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[tokio::test]
    async fn test_empty_submit_warns_without_touching_history() {
        let mut app = test_app(false);
        app.submit();
        assert_eq!(app.warning.as_deref(), Some("Please enter a message."));
        assert!(app.session.history().is_empty());
        assert!(app.pending.is_none());
    }

    #[tokio::test]
    async fn test_submit_round_trip() {
        let mut app = test_app(false);
        type_text(&mut app, "hello");
        app.submit();

        assert!(app.input.is_empty());
        assert!(app.is_loading());
        assert_eq!(app.session.history().len(), 1);

        wait_for_answer(&mut app).await;
        assert!(!app.is_loading());
        let history = app.session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert_eq!(history[1].content, "echo: hello\n\n");
    }

    #[tokio::test]
    async fn test_failure_is_shown_as_assistant_error() {
        let mut app = test_app(true);
        type_text(&mut app, "hello");
        app.submit();
        wait_for_answer(&mut app).await;

        let reply = &app.session.history()[1];
        assert_eq!(reply.role, ChatRole::Assistant);
        assert!(reply.content.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_n_submissions_give_2n_alternating_messages() {
        let mut app = test_app(false);
        for i in 0..3 {
            type_text(&mut app, &format!("q{i}"));
            app.submit();
            wait_for_answer(&mut app).await;
        }

        let history = app.session.history();
        assert_eq!(history.len(), 6);
        for (i, msg) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
            assert_eq!(msg.role, expected);
        }
    }

    #[tokio::test]
    async fn test_submit_while_pending_is_rejected() {
        let mut app = test_app(false);
        type_text(&mut app, "first");
        app.submit();
        type_text(&mut app, "second");
        app.submit();

        assert_eq!(app.session.history().len(), 1);
        assert_eq!(app.input, "second");
        assert!(app.warning.is_some());
        wait_for_answer(&mut app).await;
    }

    #[test]
    fn test_cursor_editing_is_utf8_safe() {
        let mut app = test_app(false);
        type_text(&mut app, "héllo");
        app.move_cursor_home();
        app.move_cursor_right();
        app.delete_at_cursor();
        assert_eq!(app.input, "hllo");
        app.move_cursor_end();
        app.delete_before_cursor();
        assert_eq!(app.input, "hll");
    }

    #[test]
    fn test_upload_rejects_non_pdf() {
        let mut app = test_app(false);
        app.open_upload();
        app.upload.as_mut().unwrap().path = "/tmp/notes.txt".to_string();
        app.confirm_upload();

        let prompt = app.upload.as_ref().expect("popup stays open");
        assert_eq!(prompt.error.as_deref(), Some("Only .pdf files are accepted."));
        assert!(app.session.document().is_none());
    }

    #[test]
    fn test_broken_pdf_reports_error_in_sidebar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let mut app = test_app(false);
        app.open_upload();
        app.upload.as_mut().unwrap().path = path.display().to_string();
        app.confirm_upload();

        assert!(app.upload.is_none());
        assert!(app.document_error.is_some());
        assert!(app.session.document().is_none());
        assert!(app.session.history().is_empty());
    }

    #[test]
    fn test_missing_file_keeps_popup_and_current_document() {
        let dir = tempdir().unwrap();
        let mut app = test_app(false);
        app.session.attach_document(LoadedDocument {
            name: "kept.pdf".to_string(),
            text: "kept text".to_string(),
            page_count: 1,
        });

        app.open_upload();
        app.upload.as_mut().unwrap().path = dir.path().join("typo.pdf").display().to_string();
        app.confirm_upload();

        let prompt = app.upload.as_ref().expect("popup stays open");
        assert!(prompt.error.as_deref().unwrap().starts_with("Could not open file"));
        assert_eq!(app.session.document().map(|d| d.name.as_str()), Some("kept.pdf"));
        assert!(app.document_error.is_none());
    }

    #[test]
    fn test_wrapped_height_follows_word_boundaries() {
        assert_eq!(wrapped_height("", 10), 1);
        assert_eq!(wrapped_height("aaaa bbbb", 10), 1);
        // 27 chars fit in 3 rows by count, but each word needs its own row
        assert_eq!(wrapped_height("aaaaaa bbbbbb cccccc dddddd", 10), 4);
        assert_eq!(wrapped_height("abcdefghijklmnopqrstuvwxy", 10), 3);
        assert_eq!(wrapped_height("ab abcdefghijklmnopqrstuvwxy", 10), 4);
    }

    #[test]
    fn test_scroll_to_bottom_counts_word_wrapped_rows() {
        let mut app = test_app(false);
        app.chat_width = 10;
        app.chat_height = 3;
        app.session.begin_submission("aaaaaa bbbbbb cccccc dddddd").unwrap();
        app.session.finish_submission(Ok("ok".to_string()));

        app.scroll_chat_to_bottom();
        // You: + 4 rows + spacer + Assistant: + 1 row + spacer = 9
        assert_eq!(app.chat_scroll, 6);
    }

    #[test]
    fn test_upload_prompt_editing() {
        let mut prompt = UploadPrompt::default();
        for c in "a.pdf".chars() {
            prompt.insert_char(c);
        }
        prompt.move_cursor_left();
        prompt.move_cursor_left();
        prompt.move_cursor_left();
        prompt.delete_before_cursor();
        assert_eq!(prompt.path, "apdf");
        assert_eq!(prompt.cursor, 1);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/file.pdf"), PathBuf::from("/abs/file.pdf"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/file.pdf"), home.join("file.pdf"));
        }
    }
}

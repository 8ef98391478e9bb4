use crate::auth;
use crate::backend::BackendClient;
use crate::event::AppEvent;
use crate::state::store;
use crate::state::{ChatMessage, ChatRole, PersistedState, UploadOutcome};
use crate::theme::Theme;
use crate::upload::SelectedFiles;
use eframe::egui::{self, ProgressBar, RichText, ScrollArea};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const CHAT_ERROR_MESSAGE: &str = "Error retrieving answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Login,
    Main,
}

#[derive(Debug, Clone, PartialEq)]
enum BatchSummary {
    AllSucceeded,
    Failed(Vec<(String, String)>),
}

pub struct RagdeskApp {
    rx: Receiver<AppEvent>,
    backend: BackendClient,
    theme: Theme,
    store_path: PathBuf,
    state: PersistedState,
    screen: Screen,

    username_input: String,
    password_input: String,
    login_error: Option<String>,

    selection: SelectedFiles,
    selection_warning: Option<String>,
    upload_progress: BTreeMap<String, u8>,
    uploading: bool,
    batch_failures: Vec<(String, String)>,
    batch_summary: Option<BatchSummary>,

    repo_url_input: String,
    repo_error: Option<String>,
    ingesting: bool,

    chat_input: String,
    transcript: Vec<ChatMessage>,
    chat_loading: bool,
    scroll_to_bottom: bool,

    diagnostics_log: Vec<String>,
}

impl RagdeskApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        backend: BackendClient,
        state: PersistedState,
        warnings: Vec<String>,
        store_path: PathBuf,
    ) -> Self {
        let screen = if state.is_authenticated() {
            Screen::Main
        } else {
            Screen::Login
        };

        let mut app = Self {
            rx,
            backend,
            theme: Theme::default(),
            store_path,
            state,
            screen,
            username_input: String::new(),
            password_input: String::new(),
            login_error: None,
            selection: SelectedFiles::default(),
            selection_warning: None,
            upload_progress: BTreeMap::new(),
            uploading: false,
            batch_failures: Vec::new(),
            batch_summary: None,
            repo_url_input: String::new(),
            repo_error: None,
            ingesting: false,
            chat_input: String::new(),
            transcript: Vec::new(),
            chat_loading: false,
            scroll_to_bottom: false,
            diagnostics_log: Vec::new(),
        };

        for warning in warnings {
            app.log_diagnostic(format!("state load warning: {warning}"));
        }

        app
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn persist(&mut self) {
        if let Err(err) = store::save_to(&self.store_path, &self.state) {
            log::warn!("failed to persist state: {err}");
            self.log_diagnostic(format!("failed to persist state: {err}"));
        }
    }

    fn submit_login(&mut self) {
        let username = self.username_input.clone();
        if auth::authenticate(&username, &self.password_input) {
            auth::login(&mut self.state, &username);
            self.persist();
            self.username_input.clear();
            self.password_input.clear();
            self.login_error = None;
            self.screen = Screen::Main;
        } else {
            self.login_error = Some("Invalid credentials".to_string());
        }
    }

    fn logout(&mut self) {
        auth::logout(&mut self.state);
        self.persist();
        self.screen = Screen::Login;
    }

    fn add_files(&mut self, paths: Vec<PathBuf>) {
        match self.selection.add_batch(paths) {
            Ok(()) => self.selection_warning = None,
            Err(rejection) => self.selection_warning = Some(rejection.to_string()),
        }
    }

    fn start_upload(&mut self) {
        if self.selection.is_empty() || self.uploading {
            return;
        }
        self.uploading = true;
        self.batch_failures.clear();
        self.batch_summary = None;
        self.selection_warning = None;
        self.backend.upload_batch(self.selection.to_vec());
    }

    fn submit_repo_url(&mut self) {
        if self.ingesting {
            return;
        }
        let url = self.repo_url_input.trim().to_string();
        if url.is_empty() {
            self.repo_error = Some("Enter a repository URL.".to_string());
            return;
        }
        self.repo_error = None;
        self.ingesting = true;
        self.backend.ingest_repository(url);
    }

    /// Any edit of the URL field invalidates the cached summary.
    fn repo_url_edited(&mut self) {
        if self.state.last_repo.is_some() {
            self.state.last_repo = None;
            self.persist();
        }
    }

    fn submit_question(&mut self, ctx: &egui::Context) {
        let question = self.chat_input.trim().to_string();
        if question.is_empty() {
            return;
        }

        self.transcript.push(ChatMessage {
            role: ChatRole::User,
            content: question.clone(),
        });
        self.chat_input.clear();
        self.chat_loading = true;
        self.scroll_to_bottom = true;
        self.backend.ask(question);
        ctx.request_repaint();
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event, Some(ctx)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent, ctx: Option<&egui::Context>) {
        match event {
            AppEvent::UploadStarted { file_name } => {
                self.upload_progress.insert(file_name, 0);
            }
            AppEvent::UploadProgress { file_name, percent } => {
                if let Some(entry) = self.upload_progress.get_mut(&file_name) {
                    *entry = percent;
                }
            }
            AppEvent::UploadFinished(record) => {
                self.upload_progress.remove(&record.file_name);
                if let UploadOutcome::Error { message } = &record.outcome {
                    self.batch_failures
                        .push((record.file_name.clone(), message.clone()));
                }
                self.state.push_history(record);
                self.persist();
            }
            AppEvent::BatchFinished => {
                self.uploading = false;
                self.selection.clear();
                self.upload_progress.clear();
                self.batch_summary = Some(if self.batch_failures.is_empty() {
                    BatchSummary::AllSucceeded
                } else {
                    BatchSummary::Failed(std::mem::take(&mut self.batch_failures))
                });
            }
            AppEvent::RepoIngested(summary) => {
                self.ingesting = false;
                self.repo_error = None;
                self.state.last_repo = Some(summary);
                self.persist();
            }
            AppEvent::RepoIngestFailed(message) => {
                self.ingesting = false;
                self.repo_error = Some(message);
            }
            AppEvent::RepoIngestTimedOut => {
                self.ingesting = false;
                self.repo_error = Some("Repository ingestion timed out.".to_string());
            }
            AppEvent::ChatAnswered(answer) => {
                self.transcript.push(ChatMessage {
                    role: ChatRole::Assistant,
                    content: answer,
                });
                self.chat_loading = false;
                self.scroll_to_bottom = true;
            }
            AppEvent::ChatFailed(message) => {
                self.log_diagnostic(format!("query error: {message}"));
                self.transcript.push(ChatMessage {
                    role: ChatRole::Assistant,
                    content: CHAT_ERROR_MESSAGE.to_string(),
                });
                self.chat_loading = false;
                self.scroll_to_bottom = true;
            }
        }

        if let Some(ctx) = ctx {
            ctx.request_repaint();
        }
    }

    fn collect_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|input| {
            input
                .raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if !dropped.is_empty() && !self.uploading {
            self.add_files(dropped);
        }
    }

    fn render_login(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.25);
                ui.set_max_width(360.0);
                self.theme.card_frame().show(ui, |ui| {
                    ui.heading("Welcome!");
                    ui.add_space(self.theme.spacing_8);

                    let mut submit = false;
                    let username = ui.add(
                        egui::TextEdit::singleline(&mut self.username_input)
                            .hint_text("Username")
                            .desired_width(f32::INFINITY),
                    );
                    let password = ui.add(
                        egui::TextEdit::singleline(&mut self.password_input)
                            .password(true)
                            .hint_text("Password")
                            .desired_width(f32::INFINITY),
                    );
                    let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if (username.lost_focus() || password.lost_focus()) && enter {
                        submit = true;
                    }
                    if ui
                        .add_sized([ui.available_width(), 32.0], egui::Button::new("Login"))
                        .clicked()
                    {
                        submit = true;
                    }

                    if let Some(error) = &self.login_error {
                        ui.label(RichText::new(error).color(self.theme.danger));
                    }
                    if submit {
                        self.submit_login();
                    }
                });
            });
        });
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Ragdesk");
                ui.separator();
                if let Some(session) = &self.state.session {
                    ui.label(RichText::new(session.username.clone()).color(self.theme.text_muted));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Logout").clicked() {
                        self.logout();
                    }
                });
            });
        });
    }

    fn render_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("ingest_panel")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| {
                ScrollArea::vertical()
                    .id_salt("ingest_panel_scroll")
                    .show(ui, |ui| {
                        self.render_upload_section(ui);
                        ui.separator();
                        self.render_repo_section(ui);
                    });
            });
    }

    fn render_upload_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Documents");
        ui.label(
            RichText::new("PDF, DOC, DOCX or TXT, up to 5 files")
                .small()
                .color(self.theme.text_muted),
        );

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.uploading, egui::Button::new("Select files..."))
                .clicked()
            {
                if let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Documents", &["pdf", "doc", "docx", "txt"])
                    .pick_files()
                {
                    self.add_files(paths);
                }
            }

            let can_upload = !self.selection.is_empty() && !self.uploading;
            let label = if self.uploading { "Uploading..." } else { "Upload" };
            if ui.add_enabled(can_upload, egui::Button::new(label)).clicked() {
                self.start_upload();
            }
        });
        ui.label(
            RichText::new("or drop files anywhere in the window")
                .small()
                .color(self.theme.text_muted),
        );

        if let Some(warning) = &self.selection_warning {
            ui.label(RichText::new(warning).color(self.theme.warning));
        }

        for file in self.selection.iter() {
            ui.horizontal(|ui| {
                ui.label(&file.name);
                ui.label(
                    RichText::new(file.kind.label())
                        .small()
                        .color(self.theme.text_muted),
                );
            });
        }

        for (file_name, percent) in &self.upload_progress {
            ui.label(RichText::new(file_name).small());
            ui.add(ProgressBar::new(*percent as f32 / 100.0).text(format!("{percent}%")));
        }

        match &self.batch_summary {
            Some(BatchSummary::AllSucceeded) => {
                ui.label(
                    RichText::new("All files uploaded successfully.").color(self.theme.success),
                );
            }
            Some(BatchSummary::Failed(failures)) => {
                ui.label(RichText::new("Some uploads failed:").color(self.theme.danger));
                for (file_name, message) in failures {
                    ui.label(
                        RichText::new(format!("{file_name}: {message}"))
                            .small()
                            .color(self.theme.danger),
                    );
                }
            }
            None => {}
        }

        if !self.state.upload_history.is_empty() {
            ui.add_space(self.theme.spacing_8);
            ui.strong("Recent uploads");
            for record in self.state.upload_history.iter().rev() {
                let when = record.timestamp.format("%Y-%m-%d %H:%M UTC");
                match &record.outcome {
                    UploadOutcome::Success { chunks, validation } => {
                        ui.label(
                            RichText::new(format!("{} uploaded", record.file_name))
                                .color(self.theme.success),
                        );
                        ui.label(
                            RichText::new(format!(
                                "{chunks} chunks, validation: {validation}, {when}"
                            ))
                            .small()
                            .color(self.theme.text_muted),
                        );
                    }
                    UploadOutcome::Error { message } => {
                        ui.label(
                            RichText::new(format!("{} failed", record.file_name))
                                .color(self.theme.danger),
                        );
                        ui.label(
                            RichText::new(format!("{message}, {when}"))
                                .small()
                                .color(self.theme.text_muted),
                        );
                    }
                }
            }
        }
    }

    fn render_repo_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Repository");
        let response = ui.add_enabled(
            !self.ingesting,
            egui::TextEdit::singleline(&mut self.repo_url_input)
                .hint_text("https://github.com/owner/repo")
                .desired_width(f32::INFINITY),
        );
        if response.changed() {
            self.repo_url_edited();
        }
        let submit_via_enter =
            response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        let label = if self.ingesting { "Ingesting..." } else { "Ingest" };
        let clicked = ui
            .add_enabled(!self.ingesting, egui::Button::new(label))
            .clicked();
        if clicked || submit_via_enter {
            self.submit_repo_url();
        }

        if self.ingesting {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label(
                    RichText::new("Ingestion can take several minutes")
                        .small()
                        .color(self.theme.text_muted),
                );
            });
        }

        if let Some(error) = &self.repo_error {
            ui.label(RichText::new(error).color(self.theme.danger));
        }

        if let Some(repo) = self.state.last_repo.clone() {
            self.theme.card_frame().show(ui, |ui| {
                ui.strong(&repo.repo_name);
                ui.label(format!("{} files processed", repo.files_processed));
                ui.label(
                    RichText::new(&repo.repo_summary)
                        .small()
                        .color(self.theme.text_muted),
                );
            });
        }
    }

    fn render_chat_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Chat");
            ui.separator();

            let transcript_height = (ui.available_height() - 160.0).max(120.0);
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .max_height(transcript_height)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    if self.transcript.is_empty() {
                        ui.label(
                            RichText::new("Hello! Ask a question about your ingested documents.")
                                .color(self.theme.text_muted),
                        );
                    }

                    for message in &self.transcript {
                        let label = match message.role {
                            ChatRole::User => format!("[You] {}", message.content),
                            ChatRole::Assistant => format!("[Assistant] {}", message.content),
                        };
                        ui.label(label);
                    }

                    if self.chat_loading {
                        ui.label(RichText::new("Thinking...").color(self.theme.text_muted));
                    }

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
            self.scroll_to_bottom = false;

            ui.separator();
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(entry);
                            }
                        });
                });

            ui.separator();
            let mut send_now = false;
            self.theme.composer_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.chat_input)
                            .desired_width(ui.available_width() - 70.0)
                            .hint_text("Type your question here..."),
                    );
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        send_now = true;
                    }

                    let clicked = ui
                        .add_enabled(
                            !self.chat_loading && !self.chat_input.trim().is_empty(),
                            egui::Button::new("Send"),
                        )
                        .clicked();
                    send_now |= clicked;
                });
            });

            if send_now && !self.chat_loading {
                self.submit_question(ctx);
            }
        });
    }
}

impl eframe::App for RagdeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);

        match self.screen {
            Screen::Login => self.render_login(ctx),
            Screen::Main => {
                self.collect_dropped_files(ctx);
                self.render_top_bar(ctx);
                self.render_side_panel(ctx);
                self.render_chat_panel(ctx);
            }
        }

        // Backend tasks finish while the UI is idle; poll for their events.
        if self.uploading || self.ingesting || self.chat_loading {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

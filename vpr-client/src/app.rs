//! Screen flow: Login → Recording → Completion
//!
//! `Session` holds everything one participant sees. Every operation records
//! its failure as an inline error message and also returns it, so the console
//! loop can keep going after any error.

use std::fmt::Write as _;
use tracing::{info, warn};
use vpr_common::{Language, LanguageProgress, LanguageQuotas, Progress, Quotas, Task};

use crate::api::ApiClient;
use crate::capture::{CaptureBackend, CaptureState, Recorder};
use crate::error::{ClientError, Result, CONNECTIVITY_MESSAGE};

pub const UPLOAD_SUCCESS_NOTICE: &str = "Recording uploaded successfully! Loading next task...";

const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Recording,
    Completion,
}

pub struct Session<B: CaptureBackend> {
    api: ApiClient,
    recorder: Recorder<B>,
    screen: Screen,
    username: Option<String>,
    progress: Progress,
    quotas: Quotas,
    task: Option<Task>,
    error: Option<String>,
    notice: Option<String>,
    completion_message: Option<String>,
}

impl<B: CaptureBackend> Session<B> {
    pub fn new(api: ApiClient, backend: B) -> Self {
        Self {
            api,
            recorder: Recorder::new(backend),
            screen: Screen::Login,
            username: None,
            progress: Progress::default(),
            quotas: Quotas::default(),
            task: None,
            error: None,
            notice: None,
            completion_message: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn quotas(&self) -> &Quotas {
        &self.quotas
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Inline error from the last failed operation
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn completion_message(&self) -> Option<&str> {
        self.completion_message.as_deref()
    }

    pub fn recorder(&self) -> &Recorder<B> {
        &self.recorder
    }

    /// Check connectivity, log in, then load the first task
    ///
    /// Any take in progress belongs to the previous user and is dropped.
    pub async fn login(&mut self, username: &str) -> Result<()> {
        self.recorder.cancel();
        self.notice = None;
        let username = username.trim();
        if username.is_empty() {
            return self.fail(ClientError::Validation("Please enter a username".to_string()));
        }

        if !self.api.test_connection().await {
            warn!("Server at {} is unreachable", self.api.base_url());
            return self.fail(ClientError::Connectivity(CONNECTIVITY_MESSAGE.to_string()));
        }

        let response = match self.api.login(username).await {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        info!("Logged in as {}", response.username);

        match self.api.quotas().await {
            Ok(q) => self.quotas = q.into(),
            Err(e) => warn!("Failed to load quotas, using defaults: {}", e),
        }

        self.username = Some(response.username);
        self.progress = response.progress;
        self.refresh().await
    }

    /// Fetch the next task; a null task moves to the completion screen
    pub async fn refresh(&mut self) -> Result<()> {
        let Some(username) = self.username.clone() else {
            return self.fail(ClientError::Validation("Please enter a username".to_string()));
        };

        let response = match self.api.fetch_next(&username).await {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };

        self.error = None;
        self.progress = response.progress;
        match response.task {
            Some(task) => {
                info!(task = %task.key(), "Next task");
                self.task = Some(task);
                self.completion_message = None;
                self.screen = Screen::Recording;
            }
            None => {
                info!("All tasks complete for {}", username);
                self.task = None;
                self.completion_message = response.message;
                self.screen = Screen::Completion;
            }
        }
        Ok(())
    }

    /// Clear the inline error and re-fetch the current task
    pub async fn retry(&mut self) -> Result<()> {
        self.error = None;
        self.recorder.cancel();
        self.refresh().await
    }

    pub fn start(&mut self) -> Result<()> {
        self.require_task()?;
        self.notice = None;
        let result = self.recorder.start();
        self.track(result)
    }

    pub fn stop(&mut self) -> Result<()> {
        let result = self.recorder.stop();
        self.track(result)
    }

    pub fn play(&mut self) -> Result<()> {
        let result = self.recorder.play();
        self.track(result)
    }

    pub fn discard(&mut self) -> Result<()> {
        let result = self.recorder.discard();
        self.track(result)
    }

    /// Upload the captured take for the current task, then load the next one
    pub async fn submit(&mut self) -> Result<()> {
        let key = self.require_task()?.key();
        let Some(username) = self.username.clone() else {
            return self.fail(ClientError::Validation("Please enter a username".to_string()));
        };

        let payload = match self.recorder.submit() {
            Ok(p) => p,
            Err(e) => return self.fail(e),
        };

        let response = match self.api.upload(&username, &key, payload).await {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        info!("Uploaded {} as {}", key, response.filename);

        self.progress = response.progress;
        self.notice = Some(UPLOAD_SUCCESS_NOTICE.to_string());
        self.refresh().await
    }

    /// Drop all participant state and return to the login screen
    pub fn logout(&mut self) {
        if let Some(username) = &self.username {
            info!("Logged out {}", username);
        }
        self.recorder.cancel();
        self.screen = Screen::Login;
        self.username = None;
        self.progress = Progress::default();
        self.task = None;
        self.error = None;
        self.notice = None;
        self.completion_message = None;
    }

    /// `done / quota` bar for every category with a non-zero quota, then the total
    pub fn progress_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for language in Language::ORDER {
            let quotas = self.quotas.language(language);
            let done = self.progress.language(language);
            for (label, done, quota) in categories(done, quotas) {
                if quota > 0 {
                    lines.push(progress_line(
                        &format!("{} {}", language.display_name(), label),
                        done,
                        quota,
                    ));
                }
            }
        }
        lines.push(progress_line(
            "Total",
            self.progress.total_done(),
            self.quotas.total(),
        ));
        lines
    }

    /// Text rendering of the current screen
    pub fn render(&self) -> String {
        let mut out = String::new();

        match self.screen {
            Screen::Login => {
                let _ = writeln!(out, "== VoxPrivacyRecord ==");
                let _ = writeln!(out, "Enter a username to begin: login <username>");
            }
            Screen::Recording => {
                if let Some(username) = &self.username {
                    let _ = writeln!(out, "== {} ==", username);
                }
                for line in self.progress_lines() {
                    let _ = writeln!(out, "{}", line);
                }
                if let Some(task) = &self.task {
                    let _ = writeln!(out);
                    let _ = writeln!(out, "{}", task.description());
                    let _ = writeln!(out, "Item {}:", task.item_id);
                    let _ = writeln!(out, "  {}", task.text);
                }
                let _ = writeln!(
                    out,
                    "[{}] {}",
                    self.recorder.state(),
                    self.recorder.elapsed_label()
                );
                let _ = writeln!(out, "{}", controls_hint(self.recorder.state()));
            }
            Screen::Completion => {
                let _ = writeln!(out, "== All tasks completed ==");
                if let Some(message) = &self.completion_message {
                    let _ = writeln!(out, "{}", message);
                }
                for line in self.progress_lines() {
                    let _ = writeln!(out, "{}", line);
                }
                let _ = writeln!(out, "Type 'logout' to finish.");
            }
        }

        if let Some(notice) = &self.notice {
            let _ = writeln!(out, "{}", notice);
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "Error: {} (type 'retry' to reload)", error);
        }
        out
    }

    fn require_task(&mut self) -> Result<&Task> {
        if self.screen != Screen::Recording || self.task.is_none() {
            let err = ClientError::Validation("No task loaded".to_string());
            self.error = Some(err.message());
            return Err(err);
        }
        self.task
            .as_ref()
            .ok_or_else(|| ClientError::Validation("No task loaded".to_string()))
    }

    fn track(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&mut self, err: ClientError) -> Result<T> {
        warn!("{}", err);
        self.error = Some(err.message());
        Err(err)
    }
}

fn categories(done: &LanguageProgress, quotas: &LanguageQuotas) -> [(&'static str, u32, u32); 4] {
    [
        ("Warm-up Nobody", done.nobody_done, quotas.nobody),
        ("Warm-up OnlyMe", done.onlyme_done, quotas.onlyme),
        ("Pairs", done.pairs_done, quotas.pairs),
        ("Extra Questions", done.extra_questions_done, quotas.extra_questions),
    ]
}

fn progress_line(label: &str, done: u32, quota: u32) -> String {
    format!("{}: {} / {} {}", label, done, quota, progress_bar(done, quota))
}

fn progress_bar(done: u32, quota: u32) -> String {
    let filled = if quota == 0 {
        0
    } else {
        (done.min(quota) as usize * BAR_WIDTH) / quota as usize
    };
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn controls_hint(state: CaptureState) -> &'static str {
    match state {
        CaptureState::Idle => "Commands: start",
        CaptureState::Recording => "Commands: stop",
        CaptureState::Captured => "Commands: play, submit, discard",
    }
}

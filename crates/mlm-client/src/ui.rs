//! presentation collaborator
//!
//! flows never render anything themselves; they hand computed state to a
//! [`Presenter`] supplied by the host application.

use crate::aggregator::Dashboard;
use crate::registry::ProviderInfo;
use async_trait::async_trait;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// toast-style message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// blocking yes/no question
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
}

impl Prompt {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { title: title.into(), message: message.into() }
    }
}

/// page entry points
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    WalletSelect,
    Session,
    Register,
    Dashboard,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self {
            Page::WalletSelect => "multi_wallet.html",
            Page::Session => "session.html",
            Page::Register => "register.html",
            Page::Dashboard => "dashboard.html",
        };
        f.write_str(path)
    }
}

#[async_trait]
pub trait Presenter: Send + Sync {
    /// ask the user; false on decline
    async fn confirm(&self, prompt: &Prompt) -> bool;
    fn notify(&self, notice: Notice);
    /// disable (true) or re-enable (false) the entry action
    fn set_busy(&self, busy: bool);
    fn redirect(&self, page: Page);

    /// a discovered wallet to list on the selection page
    fn show_wallet(&self, _info: &ProviderInfo, _logo: &str) {}

    fn show_dashboard(&self, _dashboard: &Dashboard) {}
}

//! Email Notification
//!
//! SMTP delivery of session outcomes to recruiters: plain-text rendering of
//! a behavior report plus the transport plumbing around it.

use behavior::BehaviorReport;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// Notification error types
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport failed: {0}")]
    Transport(String),
}

/// SMTP configuration (loaded from settings / environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host
    pub host: String,
    /// SMTP submission port
    pub port: u16,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
    /// Sender address
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "proctor@example.com".to_string(),
        }
    }
}

/// SMTP email notifier
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send a plain-text email. Blocking; callers on an async runtime should
    /// wrap this in a blocking task.
    pub fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let from: Mailbox = self
            .config
            .from
            .parse()
            .map_err(|_| NotifyError::Address(self.config.from.clone()))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|_| NotifyError::Address(to.to_string()))?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        let mailer = SmtpTransport::starttls_relay(&self.config.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        match mailer.send(&message) {
            Ok(_) => {
                info!("Email sent to {}", to);
                Ok(())
            }
            Err(e) => {
                error!("Email delivery to {} failed: {}", to, e);
                Err(NotifyError::Transport(e.to_string()))
            }
        }
    }

    /// Send the final behavior report for a completed session
    pub fn send_report(
        &self,
        to: &str,
        candidate_id: &str,
        report: &BehaviorReport,
    ) -> Result<(), NotifyError> {
        let subject = format!("Interview session completed: {}", candidate_id);
        self.send(to, &subject, &render_report(candidate_id, report))
    }
}

/// Render a report as the plain-text email body
pub fn render_report(candidate_id: &str, report: &BehaviorReport) -> String {
    format!(
        "Behavior summary for candidate {candidate_id}\n\
         \n\
         Duration:             {} s\n\
         Frames analyzed:      {}\n\
         No-face ratio:        {:.3}\n\
         Multiple-faces ratio: {:.3}\n\
         Look-away ratio:      {:.3}\n\
         Head movement score:  {:.2}\n\
         Detector failures:    {}\n\
         Flagged for review:   {}\n",
        report.duration_seconds,
        report.frames_analyzed,
        report.no_face_ratio,
        report.multiple_faces_ratio,
        report.look_away_ratio,
        report.head_movement_score,
        report.detector_failure_frames,
        if report.behavior_flag { "YES" } else { "no" },
    )
}

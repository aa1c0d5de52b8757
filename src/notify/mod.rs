//! Best-effort milestone e-mails. Nothing here may fail a request: events are
//! dispatched on a detached task after the owning transaction has committed.

use std::sync::Arc;

use async_trait::async_trait;

mod error;
pub use error::{NotifyError, NotifyResult};

mod smtp;
pub use smtp::SmtpNotifier;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    CourseCompleted {
        email: String,
        name: String,
        course_title: String,
    },
    CertificateIssued {
        email: String,
        name: String,
        course_title: String,
        verification_code: String,
    },
    SubmissionGraded {
        email: String,
        name: String,
        assignment_title: String,
        grade: f64,
        max_points: i32,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Self::CourseCompleted { email, .. }
            | Self::CertificateIssued { email, .. }
            | Self::SubmissionGraded { email, .. } => email,
        }
    }

    pub fn recipient_name(&self) -> &str {
        match self {
            Self::CourseCompleted { name, .. }
            | Self::CertificateIssued { name, .. }
            | Self::SubmissionGraded { name, .. } => name,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::CourseCompleted { course_title, .. } => {
                format!("You completed \"{course_title}\"")
            }
            Self::CertificateIssued { course_title, .. } => {
                format!("Your certificate for \"{course_title}\"")
            }
            Self::SubmissionGraded {
                assignment_title, ..
            } => format!("\"{assignment_title}\" has been graded"),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::CourseCompleted {
                name, course_title, ..
            } => format!(
                "Hi {name},\n\nYou finished every lesson of \"{course_title}\". \
                 You can now request your certificate.\n\nLearnHub"
            ),
            Self::CertificateIssued {
                name,
                course_title,
                verification_code,
                ..
            } => format!(
                "Hi {name},\n\nYour certificate for \"{course_title}\" is ready.\n\
                 Verification code: {verification_code}\n\nLearnHub"
            ),
            Self::SubmissionGraded {
                name,
                assignment_title,
                grade,
                max_points,
                ..
            } => format!(
                "Hi {name},\n\nYour submission for \"{assignment_title}\" was graded: \
                 {grade}/{max_points}.\n\nLearnHub"
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()>;
}

/// Used when no SMTP relay is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()> {
        tracing::info!(
            recipient = notification.recipient(),
            subject = %notification.subject(),
            "notification"
        );
        Ok(())
    }
}

pub fn notifier_from_config(config: &Config) -> NotifyResult<Arc<dyn Notifier>> {
    match config.smtp() {
        Some(smtp) => Ok(Arc::new(SmtpNotifier::new(smtp)?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Fire and forget. Errors are logged, never returned.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            crate::error::log_error(&e);
        }
    });
}

//! Job delivery: mail every artifact, then mark the job sent.
//!
//! Delivery is all-or-nothing per call: one failed send aborts the call
//! and the job keeps its `processed` status. Re-running resends every
//! artifact (at-least-once delivery).

use tracing::{info, instrument};

use crate::adapters::{MailSender, OutgoingMail, SmtpCredentials};
use crate::config::JobConfig;
use crate::domain::{Job, JobStatus};
use crate::store::StateStore;

use super::JobError;

/// Resolved delivery addresses and SMTP credentials.
///
/// Values come from the job config first, then the environment. The
/// password only ever comes from an environment variable so secrets
/// never land in the persisted state document.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub to: String,
    pub from: String,
    pub credentials: SmtpCredentials,
}

impl DeliverySettings {
    pub fn resolve(config: &JobConfig) -> Result<Self, JobError> {
        let to = config
            .kindle
            .to_email
            .clone()
            .or_else(|| std::env::var("KINDLE_TO_EMAIL").ok());
        let from = config
            .kindle
            .from_email
            .clone()
            .or_else(|| std::env::var("KINDLE_FROM_EMAIL").ok());

        let (Some(to), Some(from)) = (to, from) else {
            return Err(JobError::Precondition(
                "Missing Kindle to/from email. Set kindle.to_email/from_email in the config \
                 or the KINDLE_TO_EMAIL/KINDLE_FROM_EMAIL environment variables"
                    .to_string(),
            ));
        };

        let host = config
            .smtp
            .host
            .clone()
            .or_else(|| std::env::var("SMTP_HOST").ok());
        let port = config.smtp.port.or_else(|| {
            std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
        });
        let user = config
            .smtp
            .user
            .clone()
            .or_else(|| std::env::var("SMTP_USER").ok());

        let pass_env = config.smtp.pass_env.as_deref().unwrap_or("SMTP_PASS");
        let password = std::env::var(pass_env).ok();

        let (Some(host), Some(user), Some(password)) = (host, user, password) else {
            return Err(JobError::Precondition(format!(
                "SMTP credentials missing. Provide SMTP_HOST, SMTP_USER and {} \
                 environment variables (or smtp config values)",
                pass_env
            )));
        };

        Ok(Self {
            to,
            from,
            credentials: SmtpCredentials {
                host,
                port: port.unwrap_or(587),
                user,
                password,
            },
        })
    }
}

/// Mails a job's artifacts and advances it to `sent`.
pub struct DeliveryCoordinator {
    mailer: Box<dyn MailSender>,
}

impl DeliveryCoordinator {
    pub fn new(mailer: Box<dyn MailSender>) -> Self {
        Self { mailer }
    }

    /// Send every artifact of the job. The `sent` status is persisted
    /// only after all sends succeed.
    #[instrument(skip(self, store))]
    pub async fn send_job(&self, store: &mut StateStore, job_id: &str) -> Result<Job, JobError> {
        let mut job = store
            .get_job(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if job.artifacts.is_empty() {
            return Err(JobError::Precondition(
                "No artifacts to send. Run process first".to_string(),
            ));
        }

        let settings = DeliverySettings::resolve(&job.config)?;

        for artifact in &job.artifacts {
            let subject = artifact
                .output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());

            let mail = OutgoingMail {
                from: settings.from.clone(),
                to: settings.to.clone(),
                subject,
                body: "Sent via podscribe".to_string(),
                attachment: artifact.output.clone(),
            };

            self.mailer
                .send(&settings.credentials, &mail)
                .await
                .map_err(|e| {
                    JobError::collaborator(
                        format!("Failed to send {}", artifact.output.display()),
                        e,
                    )
                })?;
        }

        job.status = JobStatus::Sent;
        store.save_job(job.clone()).await?;
        info!(artifacts = job.artifacts.len(), "job delivered");

        Ok(job)
    }
}

//! Best-effort owner and customer notifications.
//!
//! Every channel is attempted independently. Failures are collected and
//! logged, never returned to the request that triggered them.

pub mod templates;

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinSet;

use crate::config::AppConfig;
use crate::services::email::{EmailMessage, EmailProvider};
use crate::services::messaging::MessagingProvider;

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub business_name: String,
    pub business_phone: String,
    pub owner_phone: String,
    pub owner_email: String,
    pub monitor_email: String,
    pub email_from: String,
}

impl NotificationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            business_name: config.business_name.clone(),
            business_phone: config.business_phone.clone(),
            owner_phone: config.owner_phone.clone(),
            owner_email: config.owner_email.clone(),
            monitor_email: config.monitor_email.clone(),
            email_from: config.email_from.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NoticeAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// What the messages say about a booking. Built from the request, so it is
/// available even when the insert failed.
#[derive(Debug, Clone)]
pub struct BookingNotice {
    pub service_name: String,
    pub price: i64,
    /// `None` for bookings the owner still has to schedule.
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub address: NoticeAddress,
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Notification {
    Sms {
        label: &'static str,
        to: String,
        body: String,
    },
    Email {
        label: &'static str,
        message: EmailMessage,
    },
}

impl Notification {
    pub fn label(&self) -> &'static str {
        match self {
            Notification::Sms { label, .. } | Notification::Email { label, .. } => *label,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub failed: Vec<&'static str>,
}

pub struct Notifier {
    messaging: Arc<dyn MessagingProvider>,
    email: Arc<dyn EmailProvider>,
    settings: NotificationSettings,
}

impl Notifier {
    pub fn new(
        messaging: Arc<dyn MessagingProvider>,
        email: Arc<dyn EmailProvider>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            messaging,
            email,
            settings,
        }
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// Owner SMS and email, customer SMS, and customer email when an address
    /// was given. Channels without a configured recipient are left out.
    pub fn booking_created(&self, notice: &BookingNotice) -> Vec<Notification> {
        let s = &self.settings;
        let mut jobs = vec![];

        if !s.owner_phone.is_empty() {
            jobs.push(Notification::Sms {
                label: "owner_sms",
                to: s.owner_phone.clone(),
                body: templates::owner_sms(notice),
            });
        }
        jobs.push(Notification::Sms {
            label: "customer_sms",
            to: notice.phone.clone(),
            body: templates::customer_sms(s, notice),
        });
        if let Some(owner_email) = self.owner_email(notice) {
            jobs.push(owner_email);
        }
        if let Some(email) = notice.email.as_deref().filter(|e| !e.is_empty()) {
            let (subject, html) = templates::customer_email(s, notice);
            jobs.push(Notification::Email {
                label: "customer_email",
                message: EmailMessage::new(&s.email_from, email, subject, html)
                    .with_cc([s.owner_email.as_str(), s.monitor_email.as_str()]),
            });
        }
        jobs
    }

    /// Owner email plus the customer's promo confirmation.
    pub fn promo_booking_created(
        &self,
        notice: &BookingNotice,
        promo_name: &str,
        promo_code: &str,
    ) -> Vec<Notification> {
        let s = &self.settings;
        let mut jobs = vec![];

        if let Some(owner_email) = self.owner_email(notice) {
            jobs.push(owner_email);
        }
        if let Some(email) = notice.email.as_deref().filter(|e| !e.is_empty()) {
            let (subject, html) = templates::promo_confirmation_email(
                s,
                &notice.customer_name,
                promo_name,
                promo_code,
            );
            jobs.push(Notification::Email {
                label: "promo_confirmation",
                message: EmailMessage::new(&s.email_from, email, subject, html)
                    .with_cc([s.owner_email.as_str(), s.monitor_email.as_str()]),
            });
        }
        jobs
    }

    fn owner_email(&self, notice: &BookingNotice) -> Option<Notification> {
        let s = &self.settings;
        if s.owner_email.is_empty() {
            return None;
        }
        let (subject, html) = templates::owner_email(notice);
        Some(Notification::Email {
            label: "owner_email",
            message: EmailMessage::new(&s.email_from, &s.owner_email, subject, html)
                .with_cc([s.monitor_email.as_str()]),
        })
    }

    /// Runs every job concurrently and waits for all of them to settle.
    pub async fn dispatch(&self, jobs: Vec<Notification>) -> DispatchReport {
        let mut set = JoinSet::new();
        let attempted = jobs.len();

        for job in jobs {
            let messaging = Arc::clone(&self.messaging);
            let email = Arc::clone(&self.email);
            set.spawn(async move {
                let label = job.label();
                let result = match &job {
                    Notification::Sms { to, body, .. } => messaging.send_message(to, body).await,
                    Notification::Email { message, .. } => email.send_email(message).await,
                };
                (label, result)
            });
        }

        let mut report = DispatchReport {
            attempted,
            failed: vec![],
        };
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((label, Err(e))) => {
                    tracing::warn!(channel = label, error = %e, "notification failed");
                    report.failed.push(label);
                }
                Err(e) => {
                    tracing::error!(error = %e, "notification task panicked");
                    report.failed.push("unknown");
                }
            }
        }
        report
    }

    /// Fire-and-forget wrapper around `dispatch`.
    pub fn spawn_dispatch(self: &Arc<Self>, jobs: Vec<Notification>) {
        if jobs.is_empty() {
            return;
        }
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            let report = notifier.dispatch(jobs).await;
            tracing::debug!(
                attempted = report.attempted,
                failed = report.failed.len(),
                "notifications settled"
            );
        });
    }
}

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::mailer::{Mailer, SmtpMailer};

/// Handles shared by every request. The pool itself is owned by `main`,
/// which closes it once the server has drained.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn init(config: &AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let users = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?) as Arc<dyn Mailer>;
        Ok(Self::from_parts(users, mailer))
    }

    pub fn from_parts(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { users, mailer }
    }
}

use std::sync::Arc;

use chrono::Duration;
use eyre::eyre;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Rejection, ServiceError};
use crate::models::user::SubscriptionPlan;
use crate::policy::window::PAYMENT;
use crate::service::email_service::Mailer;
use crate::store::UserDirectory;

const INVOICE_TEMPLATE: &str = "./templates/subscription_invoice.html";
const PLAN_DAYS: i64 = 30;

/// Activates a purchased plan. The checkout itself (Stripe) happens outside
/// this crate; this applies the plan change inside the payment window and
/// mails the invoice.
pub struct SubscriptionService {
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    pub fn new(users: Arc<dyn UserDirectory>, mailer: Arc<dyn Mailer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            mailer,
            clock,
        }
    }

    #[instrument(skip(self))]
    pub fn activate(&self, user_id: Uuid, plan: SubscriptionPlan) -> Result<(), ServiceError> {
        let now = self.clock.now();
        if !PAYMENT.contains(now) {
            return Err(Rejection::WindowClosed { window: PAYMENT }.into());
        }

        let user = self
            .users
            .get(user_id)?
            .ok_or_else(|| eyre!("user not found"))?;

        let expires_at = now + Duration::days(PLAN_DAYS);
        self.users.set_plan(user_id, plan, expires_at)?;
        info!(user = %user_id, plan = plan.to_str(), "subscription activated");

        // Invoice mail never invalidates the committed plan change.
        let template_data = serde_json::json!({
            "name": user.name,
            "plan": plan.to_str(),
            "amount": plan.price_inr(),
            "expiresAt": expires_at.to_rfc3339(),
        });
        if let Err(err) = self.mailer.send(
            &user.email,
            "Subscription invoice",
            INVOICE_TEMPLATE,
            &template_data,
        ) {
            warn!(email = %user.email, error = %err, "failed to send invoice email");
        }

        Ok(())
    }
}

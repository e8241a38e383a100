//! OFAC screening workflow
//!
//! A customer is screened by display name and, when present, by nick name.
//! The higher scoring match is kept as a snapshot; ties go to the display
//! name.

use crate::context::ServiceContext;
use crate::error::{with_timeout, ServiceError, ServiceResult};
use customers_core::{Customer, CustomerStatus, OfacSearch, SdnMatch};
use customers_persistence::CustomerRepo;

/// Comment recorded when a refresh rejects a customer
pub const REFRESH_COMMENT: &str = "manual OFAC refresh";

/// Sanctions screening service
pub struct OfacService<'a> {
    ctx: &'a ServiceContext,
}

/// Keep the better of two matches, preferring `primary` on a tie.
fn best_match(primary: Option<SdnMatch>, alternate: Option<SdnMatch>) -> Option<SdnMatch> {
    match (primary, alternate) {
        (Some(p), Some(a)) if a.match_score > p.match_score => Some(a),
        (Some(p), _) => Some(p),
        (None, a) => a,
    }
}

impl<'a> OfacService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Screen `customer` and store the snapshot.
    ///
    /// Returns `None` when the list has no entry for either name.
    pub async fn screen(&self, customer: &Customer) -> ServiceResult<Option<OfacSearch>> {
        let client = self
            .ctx
            .sanctions()
            .ok_or_else(|| ServiceError::internal("sanctions", "no sanctions endpoint configured"))?;
        let timeout = self.ctx.config().sanctions_timeout();

        let display_name = customer.display_name();
        let mut found = with_timeout("sanctions.search", timeout, client.search(&display_name)).await?;
        if let Some(nick_name) = customer.nick_name() {
            let by_nick = with_timeout("sanctions.search", timeout, client.search(nick_name)).await?;
            found = best_match(found, by_nick);
        }

        let Some(sdn) = found else {
            tracing::debug!(customer_id = %customer.customer_id, "no sanctions match");
            return Ok(None);
        };

        let blocked = sdn.match_score >= self.ctx.config().ofac_match_threshold;
        let snapshot = OfacSearch::from_match(&sdn, blocked);
        CustomerRepo::save_ofac_search(self.ctx.pool(), &customer.customer_id, &snapshot).await?;

        tracing::info!(
            customer_id = %customer.customer_id,
            entity_id = %snapshot.entity_id,
            match_score = snapshot.match_score,
            blocked,
            "sanctions snapshot stored"
        );
        Ok(Some(snapshot))
    }

    /// Re-screen a customer. A match above the threshold rejects them.
    ///
    /// Unlike screening on create, client failures are returned.
    pub async fn refresh(&self, organization: &str, customer_id: &str) -> ServiceResult<Option<OfacSearch>> {
        let customer = CustomerRepo::get(self.ctx.pool(), customer_id, organization).await?;
        let snapshot = self.screen(&customer).await?;

        if let Some(search) = &snapshot {
            if search.match_score > self.ctx.config().ofac_match_threshold {
                CustomerRepo::update_status(
                    self.ctx.pool(),
                    customer_id,
                    organization,
                    CustomerStatus::Rejected,
                    REFRESH_COMMENT,
                )
                .await?;
                tracing::warn!(
                    customer_id,
                    entity_id = %search.entity_id,
                    match_score = search.match_score,
                    "customer rejected after sanctions refresh"
                );
            }
        }
        Ok(snapshot)
    }

    /// Most recent snapshot, `None` if the customer was never matched.
    pub async fn latest(&self, organization: &str, customer_id: &str) -> ServiceResult<Option<OfacSearch>> {
        CustomerRepo::get_row(self.ctx.pool(), customer_id, organization).await?;
        Ok(CustomerRepo::latest_ofac_search(self.ctx.pool(), customer_id, organization).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sdn(id: &str, score: f64) -> Option<SdnMatch> {
        Some(SdnMatch::new(id, "NAME", "individual", score))
    }

    #[test]
    fn test_best_match() {
        assert_eq!(best_match(sdn("a", 0.8), sdn("b", 0.9)).unwrap().entity_id, "b");
        assert_eq!(best_match(sdn("a", 0.9), sdn("b", 0.9)).unwrap().entity_id, "a");
        assert_eq!(best_match(None, sdn("b", 0.1)).unwrap().entity_id, "b");
        assert_eq!(best_match(sdn("a", 0.1), None).unwrap().entity_id, "a");
        assert!(best_match(None, None).is_none());
    }
}

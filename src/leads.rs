use crate::client::CoachApi;
use crate::error::{AppError, AppResult};
use crate::models::{Lead, LeadStatus};
use log::{info, warn};
use std::sync::Arc;

/// Local copy of the lead pipeline with optimistic status changes.
pub struct LeadBoard<A: ?Sized> {
    api: Arc<A>,
    leads: Vec<Lead>,
}

impl<A: CoachApi + ?Sized> LeadBoard<A> {
    pub fn new(api: Arc<A>, leads: Vec<Lead>) -> Self {
        Self { api, leads }
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, id: &str) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.id == id)
    }

    pub fn count_by_status(&self, status: &LeadStatus) -> usize {
        self.leads.iter().filter(|lead| &lead.status == status).count()
    }

    /// Applies `status` locally, then persists it. On failure the previous
    /// status is restored and the error returned.
    pub async fn update_status(&mut self, id: &str, status: LeadStatus) -> AppResult<&Lead> {
        let index = self
            .leads
            .iter()
            .position(|lead| lead.id == id)
            .ok_or_else(|| AppError::not_found(format!("lead {}", id)))?;

        let previous = std::mem::replace(&mut self.leads[index].status, status.clone());

        match self.api.update_lead_status(id, &status).await {
            Ok(Some(updated)) if updated.id == id => {
                self.leads[index] = updated;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Rolling back lead {} to '{}': {}", id, previous, e);
                self.leads[index].status = previous;
                return Err(e);
            }
        }

        info!("Lead {} moved to '{}'", id, self.leads[index].status);
        Ok(&self.leads[index])
    }
}

//! Reports from members and the moderation panel's decisions.

use std::sync::Arc;

use super::{new_id, now_rfc3339, App};
use crate::models::{
    ClaimStatus, Event, Listing, Place, PlaceClaim, PublicationStatus, Report, ReportDraft,
    ReportStatus, Trail,
};

impl App {
    /// File a report on the target of the open report dialog, then close it.
    pub fn submit_report(&self, draft: &ReportDraft) -> Option<Arc<Report>> {
        let user = self.require_user("submit_report")?;
        let target = self.modals().report_target?;
        if draft.reason.trim().is_empty() {
            return None;
        }

        let report = self.mirror.reports.append(Report {
            id: new_id(),
            reporter_id: user.id,
            target,
            reason: draft.reason.trim().to_string(),
            details: draft.details.clone(),
            status: ReportStatus::Pending,
            created_at: now_rfc3339(),
        });
        self.close_report();

        tracing::info!(report_id = %report.id, kind = ?report.target.kind, "Report filed");
        Some(report)
    }

    // ==================== CLAIMS ====================

    /// Approve a claim; the claimant becomes the place's owner.
    pub fn approve_claim(&self, claim_id: &str) -> Option<Arc<PlaceClaim>> {
        self.require_moderator("approve_claim")?;
        let claim = self.review_claim(claim_id, ClaimStatus::Approved)?;

        let owner = claim.user_id.clone();
        self.mirror.places.update(&claim.place_id, move |place| Place {
            owner_id: Some(owner),
            ..place.clone()
        });
        tracing::info!(claim_id, place_id = %claim.place_id, "Claim approved");
        Some(claim)
    }

    pub fn reject_claim(&self, claim_id: &str) -> Option<Arc<PlaceClaim>> {
        self.require_moderator("reject_claim")?;
        self.review_claim(claim_id, ClaimStatus::Rejected)
    }

    fn review_claim(&self, claim_id: &str, status: ClaimStatus) -> Option<Arc<PlaceClaim>> {
        let claim = self.mirror.claims.get_by_id(claim_id)?;
        if claim.status != ClaimStatus::Pending {
            return None;
        }
        let reviewed_at = now_rfc3339();
        self.mirror.claims.update(claim_id, move |claim| PlaceClaim {
            status,
            reviewed_at: Some(reviewed_at),
            ..claim.clone()
        })
    }

    // ==================== REPORTS ====================

    pub fn resolve_report(&self, report_id: &str) -> Option<Arc<Report>> {
        self.require_moderator("resolve_report")?;
        self.close_report_as(report_id, ReportStatus::Resolved)
    }

    pub fn dismiss_report(&self, report_id: &str) -> Option<Arc<Report>> {
        self.require_moderator("dismiss_report")?;
        self.close_report_as(report_id, ReportStatus::Dismissed)
    }

    fn close_report_as(&self, report_id: &str, status: ReportStatus) -> Option<Arc<Report>> {
        self.mirror.reports.update(report_id, |report| Report {
            status,
            ..report.clone()
        })
    }

    // ==================== PUBLICATION ====================

    pub fn set_place_status(&self, id: &str, status: PublicationStatus) -> Option<Arc<Place>> {
        self.require_moderator("set_place_status")?;
        self.mirror.places.update(id, |place| Place {
            status,
            ..place.clone()
        })
    }

    pub fn set_event_status(&self, id: &str, status: PublicationStatus) -> Option<Arc<Event>> {
        self.require_moderator("set_event_status")?;
        self.mirror.events.update(id, |event| Event {
            status,
            ..event.clone()
        })
    }

    pub fn set_trail_status(&self, id: &str, status: PublicationStatus) -> Option<Arc<Trail>> {
        self.require_moderator("set_trail_status")?;
        self.mirror.trails.update(id, |trail| Trail {
            status,
            ..trail.clone()
        })
    }

    pub fn set_listing_status(&self, id: &str, status: PublicationStatus) -> Option<Arc<Listing>> {
        self.require_moderator("set_listing_status")?;
        self.mirror.listings.update(id, |listing| Listing {
            status,
            ..listing.clone()
        })
    }
}

use crate::models::{EntityKind, SourceDocument};
use crate::upsert::{UpsertOutcome, UpsertPlan};

use super::MigrationSummary;

pub trait MigrationReporter {
    fn stage_started(&mut self, _kind: EntityKind, _dry_run: bool) {}

    fn document_prepared(&mut self, _source: &SourceDocument, _plan: &UpsertPlan) {}

    fn document_finished(&mut self, _kind: EntityKind, _outcome: &UpsertOutcome) {}

    fn finished(&mut self, _summary: &MigrationSummary, _dry_run: bool) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl MigrationReporter for TracingReporter {
    fn stage_started(&mut self, kind: EntityKind, dry_run: bool) {
        tracing::info!(
            collection = kind.source_collection(),
            dry_run,
            "starting {} migration",
            kind.as_str()
        );
    }

    fn document_prepared(&mut self, source: &SourceDocument, plan: &UpsertPlan) {
        tracing::debug!(
            path = %source.path,
            collection = plan.collection,
            key = %plan.key,
            fields = ?plan.document.field_names(),
            "prepared document"
        );
    }

    fn document_finished(&mut self, kind: EntityKind, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Planned(plan) => tracing::debug!(
                kind = kind.as_str(),
                collection = plan.collection,
                key = %plan.key,
                "planned upsert"
            ),
            UpsertOutcome::Written(ack) => tracing::debug!(
                kind = kind.as_str(),
                collection = ack.collection,
                key = %ack.id,
                disposition = ack.disposition.as_str(),
                "upserted document"
            ),
        }
    }

    fn finished(&mut self, summary: &MigrationSummary, dry_run: bool) {
        tracing::info!(
            users = summary.users,
            digital_twins = summary.digital_twins,
            conversations = summary.conversations,
            messages = summary.messages,
            dry_run,
            "migration finished"
        );
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanRecorder {
    plans: Vec<UpsertPlan>,
}

impl PlanRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn plans(&self) -> &[UpsertPlan] {
        &self.plans
    }

    #[must_use]
    pub fn into_plans(self) -> Vec<UpsertPlan> {
        self.plans
    }
}

impl MigrationReporter for PlanRecorder {
    fn document_finished(&mut self, _kind: EntityKind, outcome: &UpsertOutcome) {
        if let UpsertOutcome::Planned(plan) = outcome {
            self.plans.push(plan.clone());
        }
    }
}

impl<A, B> MigrationReporter for (A, B)
where
    A: MigrationReporter,
    B: MigrationReporter,
{
    fn stage_started(&mut self, kind: EntityKind, dry_run: bool) {
        self.0.stage_started(kind, dry_run);
        self.1.stage_started(kind, dry_run);
    }

    fn document_prepared(&mut self, source: &SourceDocument, plan: &UpsertPlan) {
        self.0.document_prepared(source, plan);
        self.1.document_prepared(source, plan);
    }

    fn document_finished(&mut self, kind: EntityKind, outcome: &UpsertOutcome) {
        self.0.document_finished(kind, outcome);
        self.1.document_finished(kind, outcome);
    }

    fn finished(&mut self, summary: &MigrationSummary, dry_run: bool) {
        self.0.finished(summary, dry_run);
        self.1.finished(summary, dry_run);
    }
}

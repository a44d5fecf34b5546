pub mod report;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{EntityKind, SourceDocument};
use crate::projection::{
    Projection, project_conversation, project_digital_twin, project_message, project_user,
};
use crate::store::DocumentSource;
use crate::upsert::{Destination, plan_upsert};

pub use report::{MigrationReporter, PlanRecorder, TracingReporter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub users: usize,
    pub digital_twins: usize,
    pub conversations: usize,
    pub messages: usize,
}

impl MigrationSummary {
    #[must_use]
    pub const fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::User => self.users,
            EntityKind::DigitalTwin => self.digital_twins,
            EntityKind::Conversation => self.conversations,
            EntityKind::Message => self.messages,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.users + self.digital_twins + self.conversations + self.messages
    }

    #[must_use]
    pub fn as_map(&self) -> BTreeMap<&'static str, usize> {
        crate::models::all_entity_kinds()
            .into_iter()
            .map(|kind| (kind.as_str(), self.count(kind)))
            .collect()
    }

    fn record(&mut self, kind: EntityKind) {
        let counter = match kind {
            EntityKind::User => &mut self.users,
            EntityKind::DigitalTwin => &mut self.digital_twins,
            EntityKind::Conversation => &mut self.conversations,
            EntityKind::Message => &mut self.messages,
        };
        *counter += 1;
    }
}

impl Display for MigrationSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "users={} digital_twins={} conversations={} messages={}",
            self.users, self.digital_twins, self.conversations, self.messages
        )
    }
}

// Parent ids come from the walk, never from the child's own fields.
pub struct Migrator<'a, 'r> {
    source: &'a dyn DocumentSource,
    destination: Destination<'a>,
    reporter: &'r mut dyn MigrationReporter,
    summary: MigrationSummary,
}

impl<'a, 'r> Migrator<'a, 'r> {
    pub fn new(
        source: &'a dyn DocumentSource,
        destination: Destination<'a>,
        reporter: &'r mut dyn MigrationReporter,
    ) -> Self {
        Self {
            source,
            destination,
            reporter,
            summary: MigrationSummary::default(),
        }
    }

    pub fn run(mut self) -> Result<MigrationSummary> {
        let dry_run = self.destination.is_dry_run();

        self.reporter.stage_started(EntityKind::User, dry_run);
        for user in self.list_root(EntityKind::User)? {
            self.process(&user, project_user(&user))?;
        }

        self.reporter.stage_started(EntityKind::DigitalTwin, dry_run);
        for twin in self.list_root(EntityKind::DigitalTwin)? {
            self.process(&twin, project_digital_twin(&twin))?;

            for conversation in self.list_children(&twin, EntityKind::Conversation)? {
                self.process(
                    &conversation,
                    project_conversation(&conversation, &twin.id),
                )?;

                for message in self.list_children(&conversation, EntityKind::Message)? {
                    self.process(
                        &message,
                        project_message(&message, &twin.id, &conversation.id),
                    )?;
                }
            }
        }

        self.reporter.finished(&self.summary, dry_run);
        Ok(self.summary)
    }

    fn list_root(&self, kind: EntityKind) -> Result<Vec<SourceDocument>> {
        self.source
            .list_collection(kind.source_collection())
            .with_context(|| {
                format!(
                    "failed to list source collection {}",
                    kind.source_collection()
                )
            })
    }

    fn list_children(
        &self,
        parent: &SourceDocument,
        kind: EntityKind,
    ) -> Result<Vec<SourceDocument>> {
        self.source
            .list_subcollection(&parent.path, kind.source_collection())
            .with_context(|| {
                format!(
                    "failed to list source collection {}/{}",
                    parent.path,
                    kind.source_collection()
                )
            })
    }

    fn process(&mut self, source: &SourceDocument, projection: Projection) -> Result<()> {
        let kind = projection.kind;
        let plan = plan_upsert(projection);
        self.reporter.document_prepared(source, &plan);

        let outcome = self.destination.submit(plan)?;
        self.reporter.document_finished(kind, &outcome);

        self.summary.record(kind);
        Ok(())
    }
}

pub fn migrate<'a>(
    source: &'a dyn DocumentSource,
    destination: Destination<'a>,
    reporter: &mut dyn MigrationReporter,
) -> Result<MigrationSummary> {
    Migrator::new(source, destination, reporter).run()
}

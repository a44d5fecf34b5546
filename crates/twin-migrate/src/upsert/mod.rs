use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::models::{EntityKind, TargetDocument};
use crate::projection::Projection;
use crate::store::{DocumentSink, WriteDisposition};

pub const UPSERT_ACTION: &str = "upsert";

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertPlan {
    pub kind: EntityKind,
    pub collection: &'static str,
    pub key_field: &'static str,
    pub key: String,
    pub document: TargetDocument,
}

impl UpsertPlan {
    pub fn to_json(&self) -> Result<Value> {
        let mut filter = Map::new();
        filter.insert(self.key_field.to_string(), Value::String(self.key.clone()));

        let mut plan = Map::new();
        plan.insert("action".to_string(), Value::from(UPSERT_ACTION));
        plan.insert("collection".to_string(), Value::from(self.collection));
        plan.insert("filter".to_string(), Value::Object(filter));
        plan.insert(
            "doc".to_string(),
            Value::Object(
                self.document
                    .to_json()
                    .with_context(|| format!("failed to encode plan for key={}", self.key))?,
            ),
        );
        Ok(Value::Object(plan))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertAck {
    pub collection: &'static str,
    pub id: String,
    pub disposition: WriteDisposition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Planned(UpsertPlan),
    Written(UpsertAck),
}

impl UpsertOutcome {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Planned(plan) => &plan.key,
            Self::Written(ack) => &ack.id,
        }
    }
}

#[must_use]
pub fn plan_upsert(projection: Projection) -> UpsertPlan {
    let Projection {
        kind,
        key,
        document,
    } = projection;
    UpsertPlan {
        kind,
        collection: kind.target_collection(),
        key_field: kind.key_field(),
        key,
        document,
    }
}

pub fn write_plans_artifact(path: &Path, plans: &[UpsertPlan]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("failed to create plans artifact directory")?;
    }

    let file = std::fs::File::create(path).context("failed to create plans artifact")?;
    let mut writer = BufWriter::new(file);
    for plan in plans {
        serde_json::to_writer(&mut writer, &plan.to_json()?)
            .context("failed to encode plans jsonl row")?;
        writer
            .write_all(b"\n")
            .context("failed to write plans newline")?;
    }
    writer
        .flush()
        .context("failed to flush plans artifact writer")
}

pub enum Destination<'a> {
    DryRun,
    Live(&'a mut dyn DocumentSink),
}

impl Destination<'_> {
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }

    #[must_use]
    pub const fn mode_str(&self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Live(_) => "live",
        }
    }

    pub fn submit(&mut self, plan: UpsertPlan) -> Result<UpsertOutcome> {
        match self {
            Self::DryRun => Ok(UpsertOutcome::Planned(plan)),
            Self::Live(sink) => {
                let disposition = sink
                    .upsert(plan.collection, plan.key_field, &plan.key, &plan.document)
                    .with_context(|| {
                        format!(
                            "failed to upsert {}={} into {}",
                            plan.key_field, plan.key, plan.collection
                        )
                    })?;
                Ok(UpsertOutcome::Written(UpsertAck {
                    collection: plan.collection,
                    id: plan.key,
                    disposition,
                }))
            }
        }
    }
}

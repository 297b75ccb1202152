use std::slice;
use tracing::{info, warn};

use crate::database::{Member, MemberStore};
use super::{Leg, LegReport, RowFailure, SyncDirection, SyncError, SyncReport};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Copies the members table between the primary and secondary stores.
///
/// The job only ever upserts: rows missing from the source are left alone
/// in the destination. Each store's statement is atomic on its own; there
/// is no transaction spanning rows or stores.
pub struct DirectorySyncJob<'a> {
    primary: &'a dyn MemberStore,
    secondary: &'a dyn MemberStore,
    batch_size: usize,
}

impl<'a> DirectorySyncJob<'a> {
    pub fn new(primary: &'a dyn MemberStore, secondary: &'a dyn MemberStore) -> Self {
        Self {
            primary,
            secondary,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn run(&self, direction: SyncDirection) -> Result<SyncReport, SyncError> {
        info!("Starting directory sync ({})", direction);

        for store in [self.primary, self.secondary] {
            store.ping().await.map_err(|source| SyncError::Unavailable {
                store: store.label().to_string(),
                source,
            })?;
        }

        let mut report = SyncReport {
            direction,
            legs: Vec::with_capacity(direction.legs().len()),
        };
        for leg in direction.legs() {
            let (source, destination) = match leg {
                Leg::PrimaryToSecondary => (self.primary, self.secondary),
                Leg::SecondaryToPrimary => (self.secondary, self.primary),
            };
            report.legs.push(self.copy(*leg, source, destination).await?);
        }

        if report.failed() > 0 {
            warn!("{} ({} rows failed)", report.message(), report.failed());
        } else {
            info!("{}", report.message());
        }
        Ok(report)
    }

    async fn copy(
        &self,
        leg: Leg,
        source: &dyn MemberStore,
        destination: &dyn MemberStore,
    ) -> Result<LegReport, SyncError> {
        destination
            .ensure_schema()
            .await
            .map_err(|source| SyncError::Schema {
                store: destination.label().to_string(),
                source,
            })?;

        let snapshot = source.fetch_all().await.map_err(|err| SyncError::Read {
            store: source.label().to_string(),
            source: err,
        })?;

        let mut report = LegReport {
            leg,
            source: source.label().to_string(),
            destination: destination.label().to_string(),
            read: snapshot.len(),
            written: 0,
            failed: snapshot
                .rejected
                .iter()
                .map(|row| RowFailure {
                    id: row.id.clone(),
                    reason: row.reason.clone(),
                })
                .collect(),
        };

        for batch in snapshot.members.chunks(self.batch_size) {
            match destination.upsert_batch(batch).await {
                Ok(()) => report.written += batch.len(),
                Err(err) if err.is_connectivity() => {
                    return Err(SyncError::Unavailable {
                        store: destination.label().to_string(),
                        source: err,
                    });
                }
                Err(err) if batch.len() == 1 => {
                    self.record_failure(&mut report, &batch[0], err.to_string());
                }
                Err(err) => {
                    // A failed statement wrote nothing, so isolate the offending rows
                    warn!(
                        "Batch of {} rows into {} store failed ({}); retrying row by row",
                        batch.len(),
                        destination.label(),
                        err
                    );
                    for member in batch {
                        self.upsert_one(destination, member, &mut report).await?;
                    }
                }
            }
        }

        Ok(report)
    }

    async fn upsert_one(
        &self,
        destination: &dyn MemberStore,
        member: &Member,
        report: &mut LegReport,
    ) -> Result<(), SyncError> {
        match destination.upsert_batch(slice::from_ref(member)).await {
            Ok(()) => {
                report.written += 1;
                Ok(())
            }
            Err(err) if err.is_connectivity() => Err(SyncError::Unavailable {
                store: destination.label().to_string(),
                source: err,
            }),
            Err(err) => {
                self.record_failure(report, member, err.to_string());
                Ok(())
            }
        }
    }

    fn record_failure(&self, report: &mut LegReport, member: &Member, reason: String) {
        warn!(
            "Failed to upsert member {} into {} store: {}",
            member.id, report.destination, reason
        );
        report.failed.push(RowFailure {
            id: member.id.clone(),
            reason,
        });
    }
}

use std::collections::BTreeSet;

use serde_json::json;
use tracing::{info, instrument};

use crate::moodle::tools::client::{MoodleClient, Transport};
use crate::moodle::tools::error::Result;
use crate::moodle::tools::model::Cohort;

/// Column of the preprocessed teachers/courses file holding the cohort name.
pub const COHORT_COLUMN: &str = "cohort";
/// Upper bound on cohorts fetched when listing a course category.
pub const SEARCH_LIMIT: usize = 10_000;
/// Cohorts handled per prefix deletion run.
pub const DELETE_BATCH_SIZE: usize = 500;
/// Moodle's system context. Some documentation says 10; the API wants 1.
pub const SYSTEM_CONTEXT_ID: i64 = 1;

/// Difference between the cohorts a roster wants and those Moodle has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortPlan {
    pub wanted: BTreeSet<String>,
    pub existing: BTreeSet<String>,
    /// Wanted but not yet in Moodle.
    pub missing: Vec<String>,
    /// In Moodle but not wanted. Reported only, never removed.
    pub extra: Vec<String>,
}

impl CohortPlan {
    pub fn new(wanted: BTreeSet<String>, existing: BTreeSet<String>) -> Self {
        let missing = wanted.difference(&existing).cloned().collect();
        let extra = existing.difference(&wanted).cloned().collect();
        Self {
            wanted,
            existing,
            missing,
            extra,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compares `wanted` cohort names with the cohorts of a course category.
#[instrument(level = "info", skip(client, wanted), fields(wanted_count = wanted.len()))]
pub fn plan_cohorts<T: Transport>(
    client: &MoodleClient<T>,
    category_id: &str,
    wanted: BTreeSet<String>,
) -> Result<CohortPlan> {
    let response = client.call(
        "core_cohort_search_cohorts",
        &json!({
            "query": "",
            "context": {"contextlevel": "coursecat", "instanceid": category_id},
            "includes": "self",
            "limitfrom": 0,
            "limitnum": SEARCH_LIMIT,
        }),
    )?;
    let cohorts: Vec<Cohort> = response.deserialize("cohorts")?;
    let existing: BTreeSet<String> = cohorts.into_iter().map(|cohort| cohort.name).collect();
    info!(found = existing.len(), "fetched existing cohorts from Moodle");

    let plan = CohortPlan::new(wanted, existing);
    info!(extra = ?plan.extra, "extra cohorts");
    info!(missing = ?plan.missing, "missing cohorts");
    Ok(plan)
}

/// Creates one cohort per name in the given course category.
///
/// Both the name and the idnumber of each cohort are set to `name`.
#[instrument(level = "info", skip(client, names), fields(count = names.len()))]
pub fn create_cohorts<T: Transport>(
    client: &MoodleClient<T>,
    category_id: &str,
    names: &[String],
) -> Result<()> {
    if names.is_empty() {
        info!("no cohorts to create");
        return Ok(());
    }

    let cohorts: Vec<_> = names
        .iter()
        .map(|name| {
            json!({
                "categorytype": {"type": "id", "value": category_id},
                "name": name,
                "idnumber": name,
            })
        })
        .collect();

    client.call("core_cohort_create_cohorts", &json!({ "cohorts": cohorts }))?;
    info!("cohorts created");
    Ok(())
}

/// Lists at most [`DELETE_BATCH_SIZE`] system cohorts matching `prefix`.
///
/// Moodle's search matches anywhere in the name, so callers wanting a strict
/// prefix should filter with [`starts_with_prefix`].
#[instrument(level = "info", skip(client))]
pub fn search_cohorts_with_prefix<T: Transport>(
    client: &MoodleClient<T>,
    prefix: &str,
) -> Result<Vec<Cohort>> {
    let response = client.call(
        "core_cohort_search_cohorts",
        &json!({
            "query": prefix,
            "context": {"contextid": SYSTEM_CONTEXT_ID},
            "limitfrom": 0,
            "limitnum": DELETE_BATCH_SIZE,
        }),
    )?;
    let cohorts: Vec<Cohort> = response.deserialize("cohorts")?;
    info!(found = cohorts.len(), "fetched cohorts from Moodle");
    Ok(cohorts)
}

/// Keeps only the cohorts whose name starts with `prefix`.
pub fn starts_with_prefix(cohorts: Vec<Cohort>, prefix: &str) -> Vec<Cohort> {
    cohorts
        .into_iter()
        .filter(|cohort| cohort.name.starts_with(prefix))
        .collect()
}

/// Deletes the given cohorts in a single call.
#[instrument(level = "info", skip_all, fields(count = cohorts.len()))]
pub fn delete_cohorts<T: Transport>(client: &MoodleClient<T>, cohorts: &[Cohort]) -> Result<()> {
    if cohorts.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = cohorts.iter().map(|cohort| cohort.id).collect();
    client.call("core_cohort_delete_cohorts", &json!({ "cohortids": ids }))?;
    info!("cohorts deleted");
    Ok(())
}

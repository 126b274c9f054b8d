use serde_json::json;
use tracing::{info, instrument, warn};

use crate::moodle::tools::client::{MoodleClient, Transport};
use crate::moodle::tools::error::Result;
use crate::moodle::tools::model::{Category, Course, Warning};

/// Collects the courses of the category `category_id`.
#[instrument(level = "info", skip(client))]
pub fn collect_courses<T: Transport>(
    client: &MoodleClient<T>,
    category_id: &str,
) -> Result<Vec<Course>> {
    let categories: Vec<Category> = client
        .call(
            "core_course_get_categories",
            &json!({"criteria": [{"key": "id", "value": category_id}]}),
        )?
        .deserialize("")?;

    let mut courses = Vec::new();
    for category in categories {
        info!(
            category = %category.name,
            course_count = category.coursecount,
            "collecting courses"
        );
        let found: Vec<Course> = client
            .call(
                "core_course_get_courses_by_field",
                &json!({"field": "category", "value": category.id}),
            )?
            .deserialize("courses")?;
        courses.extend(found);
    }

    Ok(courses)
}

/// Deletes `courses` one call at a time and returns how many were deleted.
///
/// Moodle can delete many courses per call, but large batches hit the PHP
/// script time limit. Course backups are deleted along with the courses.
/// The first failing call aborts the run.
#[instrument(level = "info", skip_all, fields(count = courses.len()))]
pub fn delete_courses<T: Transport>(
    client: &MoodleClient<T>,
    courses: &[Course],
) -> Result<usize> {
    for (index, course) in courses.iter().enumerate() {
        info!(
            position = index + 1,
            total = courses.len(),
            course = %course.shortname,
            "deleting course"
        );
        let response =
            client.call("core_course_delete_courses", &json!({"courseids": [course.id]}))?;

        let warnings: Option<Vec<Warning>> = match response.get("warnings") {
            Some(_) => response.deserialize("warnings")?,
            None => None,
        };
        for warning in warnings.unwrap_or_default() {
            warn!(
                course = %course.shortname,
                code = warning.warningcode.as_deref().unwrap_or(""),
                message = %warning.message,
                "Moodle reported a warning"
            );
        }
    }

    info!("courses deleted");
    Ok(courses.len())
}

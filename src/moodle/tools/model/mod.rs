use serde::{Deserialize, Serialize};

/// Identifier Moodle assigns to cohorts, courses and categories.
pub type MoodleId = i64;

/// A cohort as returned by `core_cohort_search_cohorts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub id: MoodleId,
    pub name: String,
    /// Free-form identifier; the tools set it to the cohort name.
    #[serde(default)]
    pub idnumber: Option<String>,
}

/// A course category as returned by `core_course_get_categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: MoodleId,
    pub name: String,
    #[serde(default)]
    pub coursecount: u64,
}

/// A course as returned by `core_course_get_courses_by_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: MoodleId,
    pub shortname: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub categoryname: Option<String>,
}

/// Warning entry attached to several write operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub itemid: Option<MoodleId>,
    #[serde(default)]
    pub warningcode: Option<String>,
    pub message: String,
}

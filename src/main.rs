use std::path::PathBuf;

use clap::{Parser, Subcommand};
use moodle_tools::client::{DEFAULT_URL, MoodleClient};
use moodle_tools::cohorts::{self, COHORT_COLUMN};
use moodle_tools::courses;
use moodle_tools::env;
use moodle_tools::io::table;
use moodle_tools::{Result, ToolError};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    // A missing .env file is fine; the variables may come from the shell.
    if let Err(error) = env::load_dotenv() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let token = cli.token.ok_or(ToolError::MissingToken)?;
    info!(url = %cli.url, "connecting");
    let moodle = MoodleClient::new(cli.url, token);

    match cli.command {
        Command::Call(args) => execute_call(&moodle, args),
        Command::AddCohorts(args) => execute_add_cohorts(&moodle, args),
        Command::DeleteCohorts(args) => execute_delete_cohorts(&moodle, args),
        Command::DeleteCourses(args) => execute_delete_courses(&moodle, args),
    }
}

fn execute_call(moodle: &MoodleClient, args: CallArgs) -> Result<()> {
    let arguments: Value = match &args.args {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };
    let response = moodle.call(&args.function, &arguments)?;
    println!("{}", serde_json::to_string_pretty(response.value())?);
    Ok(())
}

fn execute_add_cohorts(moodle: &MoodleClient, args: AddCohortsArgs) -> Result<()> {
    let roster = table::read_table(&args.preprocessed)?;
    let wanted = roster.distinct_values(COHORT_COLUMN)?;
    info!(count = wanted.len(), "wanted cohorts");

    let plan = cohorts::plan_cohorts(moodle, &args.category_id, wanted)?;
    if plan.is_up_to_date() {
        info!("no missing cohorts, nothing to do");
        return Ok(());
    }
    if !args.yes {
        info!(count = plan.missing.len(), "dry run, pass --yes to create the missing cohorts");
        return Ok(());
    }

    cohorts::create_cohorts(moodle, &args.category_id, &plan.missing)
}

fn execute_delete_cohorts(moodle: &MoodleClient, args: DeleteCohortsArgs) -> Result<()> {
    let found = cohorts::search_cohorts_with_prefix(moodle, &args.prefix)?;
    let doomed = cohorts::starts_with_prefix(found, &args.prefix);
    if doomed.is_empty() {
        info!("no cohorts found, nothing to do");
        return Ok(());
    }

    for (index, cohort) in doomed.iter().enumerate() {
        info!(index, id = cohort.id, name = %cohort.name, "cohort");
    }
    if !args.yes {
        info!(count = doomed.len(), "dry run, pass --yes to delete these cohorts");
        return Ok(());
    }

    cohorts::delete_cohorts(moodle, &doomed)
}

fn execute_delete_courses(moodle: &MoodleClient, args: DeleteCoursesArgs) -> Result<()> {
    let found = courses::collect_courses(moodle, &args.category_id)?;
    if found.is_empty() {
        info!("no courses found, nothing to do");
        return Ok(());
    }

    for (index, course) in found.iter().enumerate() {
        info!(
            index,
            shortname = %course.shortname,
            categoryname = course.categoryname.as_deref().unwrap_or(""),
            "course"
        );
    }
    if !args.yes {
        info!(count = found.len(), "dry run, pass --yes to delete these courses");
        return Ok(());
    }

    let deleted = courses::delete_courses(moodle, &found)?;
    info!(deleted, "done");
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Administrative helpers for a Moodle site, using its REST web services."
)]
struct Cli {
    /// REST endpoint of the Moodle site.
    #[arg(long, env = "MOODLE_URL", default_value = DEFAULT_URL, global = true)]
    url: String,

    /// Web service token.
    #[arg(long, env = "TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Call any web service function and print the decoded response.
    Call(CallArgs),
    /// Create the cohorts listed in a preprocessed teachers/courses file.
    AddCohorts(AddCohortsArgs),
    /// Delete up to 500 system cohorts whose name starts with a prefix.
    DeleteCohorts(DeleteCohortsArgs),
    /// Delete every course of a category. Course backups go with them.
    DeleteCourses(DeleteCoursesArgs),
}

#[derive(clap::Args)]
struct CallArgs {
    /// Web service function name, e.g. core_webservice_get_site_info.
    function: String,

    /// Named arguments as a JSON object.
    #[arg(long)]
    args: Option<String>,
}

#[derive(clap::Args)]
struct AddCohortsArgs {
    /// Id of the yearly course category owning the cohorts.
    category_id: String,

    /// Preprocessed teachers/courses file (CSV or XLSX) with a `cohort` column.
    preprocessed: PathBuf,

    /// Create the missing cohorts instead of only listing them.
    #[arg(long)]
    yes: bool,
}

#[derive(clap::Args)]
struct DeleteCohortsArgs {
    /// Name prefix, e.g. 2324_.
    prefix: String,

    /// Delete the listed cohorts instead of only listing them.
    #[arg(long)]
    yes: bool,
}

#[derive(clap::Args)]
struct DeleteCoursesArgs {
    /// Category containing the courses to delete.
    category_id: String,

    /// Delete the listed courses instead of only listing them.
    #[arg(long)]
    yes: bool,
}

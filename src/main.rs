use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use course_planner::catalog::time_utils::parse_date;
use course_planner::display::{exam_schedule_text, write_catalog_view, write_week};
use course_planner::services::{NicknameService, NoNicknames};
use course_planner::settings::parse_time_zone;
use course_planner::{
    AsyncTaskQueue, CsvCatalogSource, IcsExporter, JsonScheduleSource, NicknameTable, PlannerConfig, PlannerState,
    Settings, TaskOutput,
};

#[derive(Parser, Debug)]
#[clap(name = "course-planner", about = "Plan a semester timetable from a course catalog", version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Course catalog CSV
    #[clap(long, default_value = "data/courses.csv", global = true)]
    catalog: PathBuf,

    /// Settings file (selected courses, semester dates)
    #[clap(long, default_value = "course-planner.json", global = true)]
    settings: PathBuf,

    /// Two-column CSV of course name -> display name
    #[clap(long, global = true)]
    nicknames: Option<PathBuf>,

    /// Time zone used for calendar instants
    #[clap(long, env = "COURSE_PLANNER_TZ", default_value = "Asia/Jerusalem", global = true)]
    timezone: String,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List catalog courses matching a query
    Courses {
        /// Course number prefix, or a name pattern
        #[clap(long, default_value = "")]
        query: String,

        /// Print details of one course
        #[clap(long)]
        info: Option<String>,
    },

    /// Add courses to the selection
    Select { numbers: Vec<String> },

    /// Remove courses from the selection
    Drop { numbers: Vec<String> },

    /// Set the semester dates (DD/MM/YY)
    Semester {
        #[clap(long, value_parser = parse_cli_date)]
        start: NaiveDate,

        #[clap(long, value_parser = parse_cli_date)]
        end: NaiveDate,
    },

    /// Exam dates of the selected courses
    Exams,

    /// Print one candidate schedule
    Show {
        /// JSON file of candidate schedules
        #[clap(long)]
        schedules: PathBuf,

        /// 1-based schedule number
        #[clap(long, default_value_t = 1)]
        index: usize,

        /// Exclude a group from the search, as COURSE:GROUP
        #[clap(long, value_parser = parse_group_ref)]
        disallow: Vec<(String, u32)>,

        /// Weight of one rater's score, as RATER=WEIGHT
        #[clap(long, value_parser = parse_rating_weight)]
        weight: Vec<(String, f64)>,

        /// Show every group of this course instead of the schedule
        #[clap(long)]
        alternatives: Option<String>,

        /// With --alternatives, only groups of this type
        #[clap(long)]
        group_type: Option<String>,
    },

    /// Export one candidate schedule and the exams to iCalendar
    Export {
        #[clap(long)]
        schedules: PathBuf,

        #[clap(long, default_value_t = 1)]
        index: usize,

        #[clap(long, value_parser = parse_group_ref)]
        disallow: Vec<(String, u32)>,

        #[clap(long, value_parser = parse_rating_weight)]
        weight: Vec<(String, f64)>,

        /// Output .ics file
        #[clap(long, short)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn parse_cli_date(text: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(text).map_err(|e| e.to_string())
}

fn parse_group_ref(text: &str) -> std::result::Result<(String, u32), String> {
    let (course, group) = text
        .split_once(':')
        .ok_or_else(|| format!("expected COURSE:GROUP, got \"{}\"", text))?;
    let group = group
        .parse()
        .map_err(|_| format!("invalid group number \"{}\"", group))?;
    Ok((course.to_string(), group))
}

fn parse_rating_weight(text: &str) -> std::result::Result<(String, f64), String> {
    let (rater, weight) = text
        .rsplit_once('=')
        .ok_or_else(|| format!("expected RATER=WEIGHT, got \"{}\"", text))?;
    let weight = weight
        .parse()
        .map_err(|_| format!("invalid weight \"{}\"", weight))?;
    Ok((rater.to_string(), weight))
}

fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Applies queue effects until no task is left running
async fn drain_tasks(state: &mut PlannerState, queue: &mut AsyncTaskQueue<TaskOutput>) -> Result<()> {
    while let Some(effect) = queue.next_effect().await {
        for warning in state.apply_effect(effect)? {
            warn!("{}", warning);
        }
        if let Some(progress) = state.progress() {
            info!(target_task = %progress.target, "{:>3.0}% {}", progress.fraction * 100.0, progress.text);
        }
    }
    Ok(())
}

async fn search(
    state: &mut PlannerState,
    queue: &mut AsyncTaskQueue<TaskOutput>,
    schedules: PathBuf,
    disallow: &[(String, u32)],
    weights: &[(String, f64)],
    index: usize,
) -> Result<()> {
    for (course, group) in disallow {
        state.disallow_group(course, *group)?;
    }
    for (rater, weight) in weights {
        state.set_rating_weight(rater, *weight);
    }
    let scheduler = Arc::new(JsonScheduleSource::new(schedules, Arc::clone(state.catalog())));
    state.start_search(queue, scheduler)?;
    drain_tasks(state, queue).await?;
    state.cursor_mut().set(index.saturating_sub(1))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    let mut settings = Settings::load(&cli.settings)
        .with_context(|| format!("Failed to read settings: {}", cli.settings.display()))?;
    let time_zone = parse_time_zone(&cli.timezone)?;
    let nicknames: Arc<dyn NicknameService> = match &cli.nicknames {
        Some(path) => Arc::new(
            NicknameTable::load_csv(path).with_context(|| format!("Failed to read nicknames: {}", path.display()))?,
        ),
        None => Arc::new(NoNicknames),
    };

    let mut state = PlannerState::new(PlannerConfig::from_settings(&settings, time_zone), nicknames);
    let mut queue = AsyncTaskQueue::new();
    PlannerState::start_catalog_load(&mut queue, Arc::new(CsvCatalogSource::new(&cli.catalog)), false)?;
    drain_tasks(&mut state, &mut queue)
        .await
        .with_context(|| format!("Failed to load catalog: {}", cli.catalog.display()))?;

    for warning in state.apply_settings(&settings) {
        warn!("Dropping saved course: {}", warning);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Courses { query, info } => {
            state.set_query(&query);
            write_catalog_view(&mut out, state.view())?;
            if info.is_some() || state.selection().collisions().any_collision {
                writeln!(out, "\n{}", state.course_info(info.as_deref())?)?;
            }
        }
        Command::Select { numbers } => {
            for number in &numbers {
                if state.add_course(number)? {
                    writeln!(out, "Selected {}", number)?;
                }
            }
            state.store_settings(&mut settings);
            settings.save(&cli.settings)?;
            write!(out, "{}", state.course_info(None)?)?;
        }
        Command::Drop { numbers } => {
            for number in &numbers {
                match state.remove_course(number) {
                    Some(course) => writeln!(out, "Dropped {}", course)?,
                    None => warn!(course = %number, "Course is not selected"),
                }
            }
            state.store_settings(&mut settings);
            settings.save(&cli.settings)?;
        }
        Command::Semester { start, end } => {
            state.set_semester(Some(start), Some(end));
            state.store_settings(&mut settings);
            settings.save(&cli.settings)?;
        }
        Command::Exams => {
            write!(out, "{}", exam_schedule_text(&state.exam_schedule()))?;
        }
        Command::Show {
            schedules,
            index,
            disallow,
            weight,
            alternatives,
            group_type,
        } => {
            if let Some(course) = alternatives {
                let items = state.show_alternatives(&course, group_type.as_deref())?;
                write_week(&mut out, &format!("Groups of {}", course), &items, state.config().visible_days())?;
                return Ok(());
            }

            search(&mut state, &mut queue, schedules, &disallow, &weight, index).await?;
            let current = state.cursor().current()?;
            let title = format!("Schedule {} of {}", current + 1, state.cursor().total());
            write_week(&mut out, &title, &state.current_render_items()?, state.config().visible_days())?;
            writeln!(out, "\n{}", state.rating_details()?)?;
        }
        Command::Export {
            schedules,
            index,
            disallow,
            weight,
            output,
        } => {
            search(&mut state, &mut queue, schedules, &disallow, &weight, index).await?;
            let file = File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
            let mut exporter = IcsExporter::new(BufWriter::new(file));
            let count = state.export(&mut exporter)?;
            info!(path = %output.display(), events = count, "Calendar written");
        }
    }

    Ok(())
}

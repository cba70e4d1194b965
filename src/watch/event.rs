use std::fmt;
use std::io::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;

use crate::model::{Job, Run, Status, Step};

const ABSENT: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RunQueued,
    RunCompleted,
    JobStarted,
    JobCompleted,
    StepStarted,
    StepCompleted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RunQueued => "RUN_QUEUED",
            Self::RunCompleted => "RUN_COMPLETED",
            Self::JobStarted => "JOB_STARTED",
            Self::JobCompleted => "JOB_COMPLETED",
            Self::StepStarted => "STEP_STARTED",
            Self::StepCompleted => "STEP_COMPLETED",
        }
    }

    pub fn is_completion(self) -> bool {
        matches!(
            self,
            Self::RunCompleted | Self::JobCompleted | Self::StepCompleted
        )
    }

    fn has_job(self) -> bool {
        !matches!(self, Self::RunQueued | Self::RunCompleted)
    }

    fn has_step(self) -> bool {
        matches!(self, Self::StepStarted | Self::StepCompleted)
    }

    fn has_started_at(self) -> bool {
        self != Self::RunCompleted
    }
}

/// One detected transition, borrowing the entities it describes.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub kind: EventKind,
    pub run: &'a Run,
    pub job: Option<&'a Job>,
    pub step: Option<&'a Step>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl<'a> Event<'a> {
    /// The run's creation time is reported as `started_at`.
    pub fn run_queued(run: &'a Run) -> Self {
        Self {
            kind: EventKind::RunQueued,
            run,
            job: None,
            step: None,
            started_at: Some(run.created_at),
            completed_at: None,
        }
    }

    /// The run's last update time is reported as `completed_at`.
    pub fn run_completed(run: &'a Run) -> Self {
        Self {
            kind: EventKind::RunCompleted,
            run,
            job: None,
            step: None,
            started_at: None,
            completed_at: Some(run.updated_at),
        }
    }

    pub fn job_started(run: &'a Run, job: &'a Job, started_at: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::JobStarted,
            run,
            job: Some(job),
            step: None,
            started_at: Some(started_at),
            completed_at: None,
        }
    }

    pub fn job_completed(run: &'a Run, job: &'a Job, completed_at: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::JobCompleted,
            run,
            job: Some(job),
            step: None,
            started_at: job.started_at,
            completed_at: Some(completed_at),
        }
    }

    pub fn step_started(
        run: &'a Run,
        job: &'a Job,
        step: &'a Step,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::StepStarted,
            run,
            job: Some(job),
            step: Some(step),
            started_at: Some(started_at),
            completed_at: None,
        }
    }

    pub fn step_completed(
        run: &'a Run,
        job: &'a Job,
        step: &'a Step,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::StepCompleted,
            run,
            job: Some(job),
            step: Some(step),
            started_at: step.started_at,
            completed_at: Some(completed_at),
        }
    }

    fn status(&self) -> Option<&Status> {
        match (self.step, self.job) {
            (Some(step), _) => step.status.as_ref(),
            (None, Some(job)) => job.status.as_ref(),
            (None, None) => self.run.status.as_ref(),
        }
    }

    fn conclusion(&self) -> Option<&str> {
        match (self.step, self.job) {
            (Some(step), _) => step.conclusion.as_deref(),
            (None, Some(job)) => job.conclusion.as_deref(),
            (None, None) => self.run.conclusion.as_deref(),
        }
    }

    /// Renders the event line stamped with the current wall-clock time.
    pub fn line(&self, repo: &str) -> String {
        self.render(repo, Utc::now())
    }

    /// Renders the event line with an explicit observation time.
    ///
    /// The field set depends only on the kind: absent values print as `null`
    /// and double quotes inside free text become single quotes.
    pub fn render(&self, repo: &str, observed: DateTime<Utc>) -> String {
        Line {
            event: self,
            repo,
            observed,
        }
        .to_string()
    }
}

/// One event bound to its repository and observation time, ready to print.
struct Line<'e, 'a> {
    event: &'e Event<'a>,
    repo: &'e str,
    observed: DateTime<Utc>,
}

impl fmt::Display for Line<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let event = self.event;
        let kind = event.kind;

        write!(
            f,
            "{} event={} repo={} workflow=\"{}\" run_id={} run_number={} branch={} sha={}",
            timestamp(self.observed),
            kind.as_str(),
            self.repo,
            safe(event.run.name.as_deref()),
            event.run.id,
            event.run.run_number,
            safe(event.run.head_branch.as_deref()),
            safe(event.run.head_sha.as_deref()),
        )?;

        if kind.has_job() {
            let job = event.job;
            write!(
                f,
                " job_id={} job=\"{}\"",
                job.map_or_else(|| ABSENT.to_string(), |job| job.id.to_string()),
                safe(job.and_then(|job| job.name.as_deref())),
            )?;
        }

        if kind.has_step() {
            write!(
                f,
                " step=\"{}\"",
                safe(event.step.and_then(|step| step.name.as_deref()))
            )?;
        }

        write!(f, " status={}", safe(event.status().map(Status::as_str)))?;

        if kind.is_completion() {
            write!(f, " conclusion={}", safe(event.conclusion()))?;
        }

        if kind.has_started_at() {
            write!(f, " started_at={}", optional_timestamp(event.started_at))?;
        }

        if kind.is_completion() {
            write!(f, " completed_at={}", optional_timestamp(event.completed_at))?;
        }

        Ok(())
    }
}

fn safe(value: Option<&str>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |value| value.replace('"', "'"))
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn optional_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| ABSENT.to_string(), timestamp)
}

/// Destination for rendered event lines.
pub trait EventSink: Send {
    fn emit(&mut self, line: &str);
}

/// Writes each event line to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&mut self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
            warn!("Failed to write event line: {e}");
        }
    }
}

impl EventSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    fn run() -> Run {
        Run {
            id: 101,
            name: Some("CI \"nightly\"".to_string()),
            run_number: 12,
            head_branch: Some("main".to_string()),
            head_sha: Some("abc123".to_string()),
            status: Some(Status::Completed),
            conclusion: Some("success".to_string()),
            created_at: at(0),
            updated_at: at(5),
        }
    }

    fn job() -> Job {
        Job {
            id: 555,
            name: Some("test".to_string()),
            status: Some(Status::Completed),
            conclusion: Some("failure".to_string()),
            started_at: None,
            completed_at: Some(at(4)),
            steps: Vec::new(),
        }
    }

    fn step() -> Step {
        Step {
            name: Some("say \"hi\"".to_string()),
            number: 2,
            status: Some(Status::InProgress),
            conclusion: None,
            started_at: Some(at(2)),
            completed_at: None,
        }
    }

    #[test]
    fn test_run_completed_line() {
        let run = run();
        let line = Event::run_completed(&run).render("octo/widgets", at(6));

        assert_eq!(
            line,
            "2024-05-01T10:06:00Z event=RUN_COMPLETED repo=octo/widgets workflow=\"CI 'nightly'\" \
             run_id=101 run_number=12 branch=main sha=abc123 status=completed conclusion=success \
             completed_at=2024-05-01T10:05:00Z"
        );
    }

    #[test]
    fn test_run_queued_line_reports_creation_time() {
        let mut run = run();
        run.status = Some(Status::Queued);
        run.head_branch = None;
        let line = Event::run_queued(&run).render("octo/widgets", at(6));

        assert!(line.contains(" event=RUN_QUEUED "));
        assert!(line.contains(" branch=null "));
        assert!(line.contains(" status=queued "));
        assert!(line.ends_with(" started_at=2024-05-01T10:00:00Z"));
        assert!(!line.contains("conclusion="));
    }

    #[test]
    fn test_job_completed_renders_missing_start_as_null() {
        let run = run();
        let job = job();
        let line = Event::job_completed(&run, &job, at(4)).render("octo/widgets", at(6));

        assert!(line.contains(" job_id=555 job=\"test\" status=completed conclusion=failure "));
        assert!(line.ends_with(" started_at=null completed_at=2024-05-01T10:04:00Z"));
    }

    #[test]
    fn test_step_started_line() {
        let run = run();
        let job = job();
        let step = step();
        let line = Event::step_started(&run, &job, &step, at(2)).render("octo/widgets", at(6));

        assert!(line.contains(" job_id=555 job=\"test\" step=\"say 'hi'\" status=in_progress "));
        assert!(line.ends_with(" started_at=2024-05-01T10:02:00Z"));
    }

    #[test]
    fn test_field_count_is_constant_per_kind() {
        let full_run = Run {
            name: Some("CI".to_string()),
            ..run()
        };
        let bare_run = Run {
            name: None,
            head_branch: None,
            head_sha: None,
            status: None,
            conclusion: None,
            ..run()
        };
        let full_job = job();
        let bare_job = Job {
            name: None,
            status: None,
            conclusion: None,
            ..job()
        };
        let full_step = Step {
            name: Some("lint".to_string()),
            conclusion: Some("success".to_string()),
            ..step()
        };
        let bare_step = Step {
            name: None,
            status: None,
            started_at: None,
            ..step()
        };

        let full = Event::step_completed(&full_run, &full_job, &full_step, at(3))
            .render("octo/widgets", at(6));
        let bare = Event::step_completed(&bare_run, &bare_job, &bare_step, at(3))
            .render("octo/widgets", at(6));

        assert_eq!(
            full.split(' ').count(),
            bare.split(' ').count(),
            "{full}\n{bare}"
        );
        assert!(bare.contains(" workflow=\"null\" "));
        assert!(bare.contains(" conclusion=null started_at=null "));
    }

    #[test]
    fn test_vec_sink_collects_lines() {
        let mut sink: Vec<String> = Vec::new();
        sink.emit("first");
        sink.emit("second");
        assert_eq!(sink, vec!["first".to_string(), "second".to_string()]);
    }
}

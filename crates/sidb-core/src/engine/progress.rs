/// Events emitted while a workflow runs. Front ends map them onto progress
/// bars or log lines.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Starts a counted task that reports `TaskFinish` when the returned
    /// scope is dropped, including on early returns through `?`.
    pub fn task(&self, total_steps: u64) -> TaskScope<'_, 'a> {
        self.report(Progress::TaskStart { total_steps });
        TaskScope { reporter: self }
    }
}

pub struct TaskScope<'r, 'a> {
    reporter: &'r ProgressReporter<'a>,
}

impl TaskScope<'_, '_> {
    #[inline]
    pub fn increment(&self) {
        self.reporter.report(Progress::TaskIncrement);
    }
}

impl Drop for TaskScope<'_, '_> {
    fn drop(&mut self) {
        self.reporter.report(Progress::TaskFinish);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_is_silent() {
        let reporter = ProgressReporter::new();
        reporter.report(Progress::Message("ignored".to_string()));
        let task = reporter.task(3);
        task.increment();
    }

    #[test]
    fn task_scope_reports_start_increments_and_finish() {
        let events = Mutex::new(Vec::new());
        {
            let reporter = ProgressReporter::with_callback(Box::new(|e| {
                events.lock().unwrap().push(e);
            }));
            let task = reporter.task(2);
            task.increment();
            task.increment();
        }
        let events = events.into_inner().unwrap();
        assert_eq!(
            events,
            vec![
                Progress::TaskStart { total_steps: 2 },
                Progress::TaskIncrement,
                Progress::TaskIncrement,
                Progress::TaskFinish,
            ]
        );
    }
}

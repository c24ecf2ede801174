use crate::backend::BacktraceGenerator;
use crate::types::{BacktraceEvent, TaskOutcome, TaskState};
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// A backtrace generation attempt that has not been started yet.
///
/// Starting consumes the task, so a failed attempt can only be retried with a
/// fresh task from the session.
pub struct BacktraceTask {
    generator: Box<dyn BacktraceGenerator>,
}

impl BacktraceTask {
    pub fn new(generator: Box<dyn BacktraceGenerator>) -> Self {
        Self { generator }
    }

    pub fn start(self) -> BacktraceRun {
        let (tx, rx) = mpsc::unbounded_channel();
        self.generator.spawn(tx);
        BacktraceRun {
            events: rx,
            state: TaskState::Running,
            lines: 0,
        }
    }
}

/// Event stream of a started task.
///
/// Yields every output line in order, then exactly one
/// [`BacktraceEvent::Finished`], then ends. Anything the generator sends after
/// its first terminal event is discarded.
pub struct BacktraceRun {
    events: mpsc::UnboundedReceiver<BacktraceEvent>,
    state: TaskState,
    lines: usize,
}

impl BacktraceRun {
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state != TaskState::Running
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Drive the run to completion, concatenating all output.
    pub async fn collect_output(mut self) -> (String, TaskOutcome) {
        let mut output = String::new();
        while let Some(event) = self.next().await {
            match event {
                BacktraceEvent::Line(line) => output.push_str(&line),
                BacktraceEvent::Finished(outcome) => return (output, outcome),
            }
        }
        (output, TaskOutcome::Abandoned)
    }

    fn finish(&mut self, outcome: TaskOutcome) -> BacktraceEvent {
        self.state = TaskState::from(&outcome);
        self.events.close();
        debug!(
            "Backtrace task finished with {:?} after {} lines",
            outcome, self.lines
        );
        BacktraceEvent::Finished(outcome)
    }
}

impl Stream for BacktraceRun {
    type Item = BacktraceEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.is_finished() {
            return Poll::Ready(None);
        }

        let event = match ready!(this.events.poll_recv(cx)) {
            Some(BacktraceEvent::Line(line)) => {
                this.lines += 1;
                BacktraceEvent::Line(line)
            }
            Some(BacktraceEvent::Finished(outcome)) => this.finish(outcome),
            None => this.finish(TaskOutcome::Abandoned),
        };
        Poll::Ready(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedGenerator;

    fn line(s: &str) -> BacktraceEvent {
        BacktraceEvent::Line(s.to_string())
    }

    fn task(events: Vec<BacktraceEvent>) -> BacktraceTask {
        BacktraceTask::new(Box::new(ScriptedGenerator(events)))
    }

    #[tokio::test]
    async fn test_lines_then_done() {
        let task = task(vec![
            line("frame0"),
            line("frame1"),
            BacktraceEvent::Finished(TaskOutcome::Done),
        ]);

        let mut run = task.start();
        assert_eq!(run.state(), TaskState::Running);

        let events: Vec<_> = (&mut run).collect().await;
        assert_eq!(
            events,
            vec![
                line("frame0"),
                line("frame1"),
                BacktraceEvent::Finished(TaskOutcome::Done)
            ]
        );
        assert_eq!(run.state(), TaskState::Done);
        assert_eq!(run.line_count(), 2);
    }

    #[tokio::test]
    async fn test_late_terminal_events_are_dropped() {
        let run = task(vec![
            line("frame0"),
            BacktraceEvent::Finished(TaskOutcome::Done),
            line("late"),
            BacktraceEvent::Finished(TaskOutcome::Error("late".to_string())),
        ])
        .start();

        let events: Vec<_> = run.collect().await;
        assert_eq!(
            events,
            vec![line("frame0"), BacktraceEvent::Finished(TaskOutcome::Done)]
        );
    }

    #[tokio::test]
    async fn test_failed_to_start() {
        let mut run = task(vec![BacktraceEvent::Finished(TaskOutcome::FailedToStart(
            "gdb".to_string(),
        ))])
        .start();

        assert!(matches!(
            run.next().await,
            Some(BacktraceEvent::Finished(TaskOutcome::FailedToStart(_)))
        ));
        assert_eq!(run.state(), TaskState::Failed);
        assert!(run.next().await.is_none());
    }

    #[tokio::test]
    async fn test_vanished_generator_is_abandoned() {
        let mut run = task(vec![line("frame0")]).start();
        assert_eq!(run.next().await, Some(line("frame0")));
        assert_eq!(
            run.next().await,
            Some(BacktraceEvent::Finished(TaskOutcome::Abandoned))
        );
        assert_eq!(run.state(), TaskState::AbandonedAtShutdown);
    }

    #[tokio::test]
    async fn test_collect_output_concatenates_literally() {
        let (output, outcome) = task(vec![
            line("frame0"),
            line("frame1"),
            BacktraceEvent::Finished(TaskOutcome::Error("gdb crashed".to_string())),
        ])
        .start()
        .collect_output()
        .await;
        assert_eq!(output, "frame0frame1");
        assert_eq!(outcome, TaskOutcome::Error("gdb crashed".to_string()));
    }
}

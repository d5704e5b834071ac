use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::output::status_icon;
use super::types::{Task, TaskId, TaskStatus};

const OVERALL_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks ({percent}%) {msg}";
const SPINNER_TICKS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Terminal progress for one run: an overall bar counting terminal tasks
/// and a spinner per running task. A disabled monitor draws nothing.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    task_bars: HashMap<TaskId, ProgressBar>,
    batch: Option<(usize, usize)>,
    failed: usize,
    skipped: usize,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_tasks: usize, enabled: bool) -> Self {
        let multi = MultiProgress::new();
        let overall = if enabled {
            let bar = multi.add(ProgressBar::new(total_tasks as u64));
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(OVERALL_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░  "),
            );
            bar.set_message("Starting...");
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            batch: None,
            failed: 0,
            skipped: 0,
            enabled,
        }
    }

    fn refresh_message(&self) {
        let mut msg = match self.batch {
            Some((batch_id, total)) => format!("Batch {}/{}", batch_id + 1, total),
            None => String::new(),
        };
        if self.failed > 0 {
            msg.push_str(&format!(" · {} failed", self.failed));
        }
        if self.skipped > 0 {
            msg.push_str(&format!(" · {} skipped", self.skipped));
        }
        self.overall.set_message(msg);
    }

    pub fn start_task(&mut self, task: &Task) {
        if !self.enabled {
            return;
        }

        let bar = self.multi.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("  {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&SPINNER_TICKS);
        bar.set_style(style);
        bar.set_message(format!("⏳ {} [{}]", task.id, task.capability));
        bar.enable_steady_tick(Duration::from_millis(100));

        self.task_bars.insert(task.id, bar);
    }

    /// Mark a task as terminal (completed, failed or skipped)
    pub fn finish_task(&mut self, task: &Task) {
        if !self.enabled {
            return;
        }

        let icon = status_icon(task.status);
        let msg = match task.status {
            TaskStatus::Skipped => {
                self.skipped += 1;
                format!("{} {} skipped", icon, task.id)
            }
            TaskStatus::Failed => {
                self.failed += 1;
                format!("{} {} ({}ms)", icon, task.id, task.duration_ms)
            }
            _ => format!("{} {} ({}ms)", icon, task.id, task.duration_ms),
        };

        match self.task_bars.remove(&task.id) {
            Some(bar) => bar.finish_with_message(msg),
            None => {
                let _ = self.multi.println(msg);
            }
        }

        self.overall.inc(1);
        self.refresh_message();
    }

    pub fn update_batch(&mut self, batch_id: usize, total_batches: usize) {
        if self.enabled {
            self.batch = Some((batch_id, total_batches));
            self.refresh_message();
        }
    }

    pub fn finish(&self, success: bool) {
        if !self.enabled {
            return;
        }

        let msg = if success {
            "✅ All tasks completed"
        } else {
            "❌ Execution finished with failures"
        };

        self.overall.finish_with_message(msg.to_string());
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::{TaskError, TaskErrorKind, TaskSpec};
    use serde_json::json;

    fn task(id: TaskId) -> Task {
        Task::from_spec(&TaskSpec::new(id, "echo"))
    }

    #[test]
    fn test_progress_monitor_disabled() {
        let mut monitor = ProgressMonitor::new(3, false);

        // Should not panic when disabled
        let t = task(1);
        monitor.start_task(&t);
        monitor.finish_task(&t);
        monitor.finish(true);
    }

    #[test]
    fn test_progress_monitor_enabled() {
        let mut monitor = ProgressMonitor::new(3, true);

        let mut ok = task(1);
        let mut bad = task(2);
        let mut skipped = task(3);
        monitor.start_task(&ok);
        monitor.start_task(&bad);

        ok.mark_completed(json!(1), 100);
        bad.mark_failed(TaskError::new(TaskErrorKind::Capability, "x"), 200);
        skipped.mark_skipped(TaskError::dependency_failed(3, &[2]));

        monitor.finish_task(&ok);
        monitor.finish_task(&bad);
        monitor.finish_task(&skipped);
        monitor.update_batch(0, 2);
        assert_eq!(monitor.failed, 1);
        assert_eq!(monitor.skipped, 1);
        assert!(monitor.task_bars.is_empty());
        monitor.finish(false);
    }
}

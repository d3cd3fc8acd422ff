// Due-date reminders: fire a notification half an hour before a task is due
use super::Task;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const REMINDER_TITLE: &str = "Task Due Soon";
pub const REMINDER_ICON: &str = "/icon-192x192.png";

fn reminder_lead() -> Duration {
    Duration::minutes(30)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub task_id: String,
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl Notification {
    fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: REMINDER_TITLE.to_string(),
            body: format!("Your task \"{}\" is due soon!", task.title),
            icon: REMINDER_ICON.to_string(),
        }
    }
}

/// How long to wait before reminding. `None` for undated or already-due tasks;
/// zero when the reminder moment has passed but the task is still ahead.
pub fn reminder_delay(task: &Task, now: DateTime<Utc>) -> Option<std::time::Duration> {
    let due = task.due_date?;
    if due <= now {
        return None;
    }
    let fire_at = due - reminder_lead();
    Some((fire_at - now).to_std().unwrap_or(std::time::Duration::ZERO))
}

pub struct ReminderScheduler {
    tx: mpsc::UnboundedSender<Notification>,
    pending: HashMap<String, JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                pending: HashMap::new(),
            },
            rx,
        )
    }

    pub fn schedule(&mut self, task: &Task) -> bool {
        self.schedule_at(task, Utc::now())
    }

    /// Replaces any reminder already pending for the same task.
    pub fn schedule_at(&mut self, task: &Task, now: DateTime<Utc>) -> bool {
        self.cancel(&task.id);
        self.pending.retain(|_, handle| !handle.is_finished());
        if task.completed {
            return false;
        }
        let Some(delay) = reminder_delay(task, now) else {
            return false;
        };

        let notification = Notification::for_task(task);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(notification).is_err() {
                tracing::debug!("Reminder receiver dropped before delivery");
            }
        });
        tracing::debug!("Scheduled reminder for task {} in {:?}", task.id, delay);
        self.pending.insert(task.id.clone(), handle);
        true
    }

    pub fn cancel(&mut self, task_id: &str) {
        if let Some(handle) = self.pending.remove(task_id) {
            handle.abort();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.values().filter(|handle| !handle.is_finished()).count()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn due_in(now: DateTime<Utc>, minutes: i64) -> Task {
        Task::new("Submit form", Some(now + Duration::minutes(minutes)), now)
    }

    #[test]
    fn test_delay_is_thirty_minutes_early() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let delay = reminder_delay(&due_in(now, 90), now).unwrap();
        assert_eq!(delay, std::time::Duration::from_secs(60 * 60));
    }

    #[test]
    fn test_delay_clamps_to_zero_inside_lead_window() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(reminder_delay(&due_in(now, 10), now), Some(std::time::Duration::ZERO));
    }

    #[test]
    fn test_no_delay_for_past_or_undated() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(reminder_delay(&due_in(now, -5), now), None);
        assert_eq!(reminder_delay(&Task::new("whenever", None, now), now), None);
    }

    #[tokio::test]
    async fn test_imminent_task_notifies_right_away() {
        let (mut scheduler, mut rx) = ReminderScheduler::new();
        let now = Utc::now();
        let task = due_in(now, 5);

        assert!(scheduler.schedule_at(&task, now));
        let notification = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(notification.task_id, task.id);
        assert_eq!(notification.title, REMINDER_TITLE);
        assert!(notification.body.contains("Submit form"));
    }

    #[tokio::test]
    async fn test_cancel_and_completed_tasks() {
        let (mut scheduler, _rx) = ReminderScheduler::new();
        let now = Utc::now();
        let task = due_in(now, 24 * 60);

        assert!(scheduler.schedule_at(&task, now));
        assert_eq!(scheduler.pending(), 1);
        scheduler.cancel(&task.id);
        assert_eq!(scheduler.pending(), 0);

        let mut done = due_in(now, 24 * 60);
        done.completed = true;
        assert!(!scheduler.schedule_at(&done, now));
    }

    #[tokio::test]
    async fn test_delivered_reminders_are_forgotten() {
        let (mut scheduler, mut rx) = ReminderScheduler::new();
        let now = Utc::now();

        for _ in 0..3 {
            assert!(scheduler.schedule_at(&due_in(now, 5), now));
            rx.recv().await.unwrap();
        }
        // let the last timer task finish after its send
        while scheduler.pending() > 0 {
            tokio::task::yield_now().await;
        }

        assert!(scheduler.schedule_at(&due_in(now, 24 * 60), now));
        assert_eq!(scheduler.pending.len(), 1);
    }
}

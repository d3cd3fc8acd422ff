// Advisory message shown above the task tabs
use crate::tasks::{views, Task};
use chrono::{DateTime, Duration, TimeZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestion<'a> {
    NoTasks,
    DueSoon(&'a Task),
    Completed,
}

impl Suggestion<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Suggestion::NoTasks => "no-tasks",
            Suggestion::DueSoon(_) => "due-soon",
            Suggestion::Completed => "completed",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Suggestion::NoTasks => "No tasks for today",
            Suggestion::DueSoon(_) => "Task due soon",
            Suggestion::Completed => "Great progress!",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Suggestion::NoTasks => {
                "You haven't added any tasks for today. Need help planning your day?".to_string()
            }
            Suggestion::DueSoon(task) => {
                format!("Your task \"{}\" is due soon. Want to reschedule?", task.title)
            }
            Suggestion::Completed => {
                "You've completed several tasks recently. Keep up the good work!".to_string()
            }
        }
    }
}

/// First matching rule wins:
/// nothing due today, then the earliest task due in the next 24 hours,
/// then anything completed that was created in the last week.
pub fn suggest<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Option<Suggestion<'a>> {
    if views::today(tasks, now).is_empty() {
        return Some(Suggestion::NoTasks);
    }

    let horizon = now.clone() + Duration::hours(24);
    let due_soon = tasks
        .iter()
        .filter(|task| !task.completed)
        .filter_map(|task| task.due_date.map(|due| (due, task)))
        .filter(|(due, _)| *due > *now && *due < horizon)
        .min_by_key(|(due, _)| *due)
        .map(|(_, task)| task);
    if let Some(task) = due_soon {
        return Some(Suggestion::DueSoon(task));
    }

    let week_ago = now.clone() - Duration::days(7);
    if tasks.iter().any(|task| task.completed && task.created_at > week_ago) {
        return Some(Suggestion::Completed);
    }

    None
}

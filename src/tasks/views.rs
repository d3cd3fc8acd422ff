// Filtered views shown as the Today / Upcoming / Completed tabs
use super::Task;
use chrono::{DateTime, TimeZone};

/// True when `due` falls on the same calendar date as `now`, in `now`'s time zone.
fn same_day<Tz: TimeZone>(due: &DateTime<chrono::Utc>, now: &DateTime<Tz>) -> bool {
    due.with_timezone(&now.timezone()).date_naive() == now.date_naive()
}

pub fn today<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| !task.completed)
        .filter(|task| task.due_date.as_ref().is_some_and(|due| same_day(due, now)))
        .collect()
}

pub fn upcoming<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| !task.completed)
        .filter(|task| {
            task.due_date
                .as_ref()
                .is_some_and(|due| *due > *now && !same_day(due, now))
        })
        .collect()
}

pub fn completed(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| task.completed).collect()
}

/// "Today (3)"; the count is left off when there is nothing in the tab.
pub fn tab_label(name: &str, count: usize) -> String {
    if count > 0 {
        format!("{} ({})", name, count)
    } else {
        name.to_string()
    }
}

#[derive(Debug)]
pub struct TaskViews<'a> {
    pub today: Vec<&'a Task>,
    pub upcoming: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}

impl<'a> TaskViews<'a> {
    pub fn build<Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Self {
        Self {
            today: today(tasks, now),
            upcoming: upcoming(tasks, now),
            completed: completed(tasks),
        }
    }

    pub fn labels(&self) -> [String; 3] {
        [
            tab_label("Today", self.today.len()),
            tab_label("Upcoming", self.upcoming.len()),
            tab_label("Completed", self.completed.len()),
        ]
    }
}
